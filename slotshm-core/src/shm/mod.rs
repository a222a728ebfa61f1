// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared Memory IPC module.
//!
//! Single-slot, latest-value transport over POSIX shared memory. One
//! `Writer` publishes fixed-size messages; one `Reader` polls for them.
//! Three named semaphores coordinate the two:
//!
//! - `<name>_mutex` guards the copy into and out of the region.
//! - `<name>_empty` is a one-permit latch: a write that takes it raises the
//!   pending signal, and the reader hands it back on consume.
//! - `<name>_full` is the pending signal the reader polls.
//!
//! A write that finds the latch already taken still overwrites the bytes
//! but does not signal again, so unread writes collapse into the latest one.

mod reader;
mod region;
mod semaphore;
#[cfg(test)]
mod testing;
mod writer;

pub use reader::Reader;
pub use region::{Access, SharedRegion};
pub use semaphore::{NamedSemaphore, Semaphore, SemaphoreSet};
pub use writer::{Publish, Writer};

use nix::errno::Errno;

use crate::types::{ChannelName, SemaphoreRole};

/// Unlink the shared memory object and semaphores of `name`, e.g. after a
/// writer crashed without cleaning up.
///
/// Missing objects are skipped. Returns the OS names actually removed;
/// other failures are logged.
pub fn unlink_channel(name: &ChannelName) -> Vec<String> {
    let mut removed = Vec::with_capacity(4);

    match SharedRegion::unlink(name) {
        Ok(()) => removed.push(name.shm_name().to_string()),
        Err(Errno::ENOENT) => {}
        Err(e) => tracing::warn!(object = %name.shm_name(), error = %e, "Failed to unlink"),
    }

    for role in SemaphoreRole::ALL {
        let object = name.semaphore_name(role);
        match NamedSemaphore::unlink(&object) {
            Ok(()) => removed.push(object),
            Err(Errno::ENOENT) => {}
            Err(e) => tracing::warn!(object = %object, error = %e, "Failed to unlink"),
        }
    }

    removed
}
