// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum channel name length in bytes, excluding the leading slash.
/// Leaves room for the semaphore suffix and the `sem.` prefix glibc adds
/// under `/dev/shm` within NAME_MAX.
pub const MAX_CHANNEL_NAME_LEN: usize = 200;

/// Minimum payload size: 1 byte
pub const MIN_PAYLOAD_SIZE: usize = 1;
/// Maximum payload size: 1 GB
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024 * 1024;

/// Validated channel name shared by a Writer and its Reader.
///
/// Accepts `frames` or `/frames`; both address the same OS objects.
/// The stored form always carries exactly one leading slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    /// Create a new ChannelName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();
        let bare = name.strip_prefix('/').unwrap_or(&name);

        if bare.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "channel_name",
                value: name,
                reason: "Channel name cannot be empty".to_string(),
            });
        }

        if bare.len() > MAX_CHANNEL_NAME_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "channel_name",
                value: name.clone(),
                reason: format!(
                    "Channel name too long: {} bytes (max {})",
                    bare.len(),
                    MAX_CHANNEL_NAME_LEN
                ),
            });
        }

        if bare.contains('/') || bare.contains('\0') {
            return Err(HardValidationError::InvalidFieldValue {
                field: "channel_name",
                value: name.clone(),
                reason: "Channel name must not contain '/' or NUL after the leading slash"
                    .to_string(),
            });
        }

        Ok(Self(format!("/{}", bare)))
    }

    /// Name without the leading slash.
    pub fn as_str(&self) -> &str {
        &self.0[1..]
    }

    /// OS identifier of the shared memory object.
    pub fn shm_name(&self) -> &str {
        &self.0
    }

    /// OS identifier of one of the three named semaphores.
    pub fn semaphore_name(&self, role: SemaphoreRole) -> String {
        format!("{}_{}", self.0, role.suffix())
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ChannelName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelName> for String {
    fn from(name: ChannelName) -> Self {
        name.as_str().to_string()
    }
}

/// Validated payload size in bytes.
/// Must be between MIN_PAYLOAD_SIZE and MAX_PAYLOAD_SIZE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PayloadSize(usize);

impl PayloadSize {
    /// Create a new PayloadSize with bounds validation.
    pub fn new(bytes: usize) -> Result<Self, HardValidationError> {
        if !(MIN_PAYLOAD_SIZE..=MAX_PAYLOAD_SIZE).contains(&bytes) {
            return Err(HardValidationError::PayloadSizeOutOfBounds {
                size: bytes,
                min: MIN_PAYLOAD_SIZE,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self(bytes))
    }

    /// Get the size in bytes.
    pub fn bytes(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PayloadSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

impl TryFrom<usize> for PayloadSize {
    type Error = HardValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PayloadSize> for usize {
    fn from(size: PayloadSize) -> Self {
        size.0
    }
}

/// The three semaphores coordinating a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemaphoreRole {
    /// Binary lock around the copy into or out of the region.
    Mutex,
    /// Single-permit "slot consumed" latch. Held by a signaled write until
    /// the reader consumes it.
    Empty,
    /// "Message pending" signal posted by the writer, taken by the reader.
    Full,
}

impl SemaphoreRole {
    pub const ALL: [SemaphoreRole; 3] = [
        SemaphoreRole::Mutex,
        SemaphoreRole::Empty,
        SemaphoreRole::Full,
    ];

    /// Suffix appended to the channel name to form the OS object name.
    pub fn suffix(&self) -> &'static str {
        match self {
            SemaphoreRole::Mutex => "mutex",
            SemaphoreRole::Empty => "empty",
            SemaphoreRole::Full => "full",
        }
    }

    /// Value the writer creates the semaphore with.
    pub fn initial_value(&self) -> u32 {
        match self {
            SemaphoreRole::Mutex => 1,
            SemaphoreRole::Empty => 1,
            SemaphoreRole::Full => 0,
        }
    }
}

impl fmt::Display for SemaphoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
