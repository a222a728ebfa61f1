//! slotshm Core Library
//!
//! Single-slot shared-memory message transport between two processes.
//! Provides the writer and reader endpoints, the POSIX shared memory and
//! named semaphore wrappers beneath them, configuration parsing and
//! per-endpoint statistics.

pub mod config;
pub mod error;
pub mod shm;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use config::{ChannelConfig, Config, ConfigLoader, ReaderConfig};
pub use error::{
    HardValidationError, SlotshmError, SlotshmResult, TransportError, TransportInitError,
};
pub use shm::{Publish, Reader, Writer};
pub use stats::StatsSnapshot;
pub use types::{ChannelName, PayloadSize, SemaphoreRole};
