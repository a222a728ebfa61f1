// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for slotshm.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.
//! Nothing in the library aborts the process; the caller decides.

use std::fmt;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::types::SemaphoreRole;

/// Top-level error type for slotshm.
#[derive(Debug, Error)]
pub enum SlotshmError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Transport initialization error: {0}")]
    Init(#[from] TransportInitError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors reject a value before any OS object is touched.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Payload size out of bounds: {size} bytes (min: {min}, max: {max})")]
    PayloadSizeOutOfBounds { size: usize, min: usize, max: usize },
}

/// OS call that failed while setting up a Writer or Reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOperation {
    ShmOpen,
    Ftruncate,
    Fstat,
    Mmap,
    SemOpen,
    /// The existing object is smaller than the requested payload size.
    SizeCheck,
}

impl InitOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitOperation::ShmOpen => "shm_open",
            InitOperation::Ftruncate => "ftruncate",
            InitOperation::Fstat => "fstat",
            InitOperation::Mmap => "mmap",
            InitOperation::SemOpen => "sem_open",
            InitOperation::SizeCheck => "size check",
        }
    }
}

impl fmt::Display for InitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction failure carrying the offending operation and OS error code.
#[derive(Debug, Error)]
#[error("{operation} failed for {object}: {source}")]
pub struct TransportInitError {
    pub operation: InitOperation,
    /// OS object name the operation targeted.
    pub object: String,
    #[source]
    pub source: Errno,
}

impl TransportInitError {
    pub fn new(operation: InitOperation, object: impl Into<String>, source: Errno) -> Self {
        Self {
            operation,
            object: object.into(),
            source,
        }
    }

    /// True when the object does not exist yet, i.e. the Writer has not
    /// created the channel. Callers polling for a writer retry on this.
    pub fn is_not_found(&self) -> bool {
        self.source == Errno::ENOENT
    }

    /// True when the channel may still be mid-creation: either missing, or
    /// the region exists but has not been sized yet.
    pub fn is_not_ready(&self) -> bool {
        self.is_not_found() || self.operation == InitOperation::SizeCheck
    }
}

/// Semaphore operation reported by [`TransportError::Semaphore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemaphoreOp {
    Wait,
    TryWait,
    Post,
}

impl fmt::Display for SemaphoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SemaphoreOp::Wait => "sem_wait",
            SemaphoreOp::TryWait => "sem_trywait",
            SemaphoreOp::Post => "sem_post",
        })
    }
}

/// Errors raised by `write`, `read` and explicit cleanup.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{operation} on {role} semaphore failed: {source}")]
    Semaphore {
        role: SemaphoreRole,
        operation: SemaphoreOp,
        #[source]
        source: Errno,
    },

    #[error("Payload size mismatch: expected {expected} bytes, got {actual}")]
    PayloadSizeMismatch { expected: usize, actual: usize },

    #[error("Read buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("Failed to unlink {object}: {source}")]
    Unlink {
        object: String,
        #[source]
        source: Errno,
    },
}

impl TransportError {
    pub(crate) fn semaphore(role: SemaphoreRole, operation: SemaphoreOp, source: Errno) -> Self {
        TransportError::Semaphore {
            role,
            operation,
            source,
        }
    }
}

/// Result type alias using SlotshmError.
pub type SlotshmResult<T> = Result<T, SlotshmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_error_display() {
        let err = TransportInitError::new(InitOperation::ShmOpen, "/frames", Errno::EACCES);
        let msg = err.to_string();
        assert!(msg.contains("shm_open"));
        assert!(msg.contains("/frames"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_init_error_not_found() {
        let err = TransportInitError::new(InitOperation::SemOpen, "/frames_full", Errno::ENOENT);
        assert!(err.is_not_found());
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_unsized_region_is_not_ready() {
        let err = TransportInitError::new(InitOperation::SizeCheck, "/frames", Errno::EINVAL);
        assert!(!err.is_not_found());
        assert!(err.is_not_ready());

        let err = TransportInitError::new(InitOperation::Mmap, "/frames", Errno::ENOMEM);
        assert!(!err.is_not_ready());
    }

    #[test]
    fn test_semaphore_error_display() {
        let err = TransportError::semaphore(SemaphoreRole::Full, SemaphoreOp::Post, Errno::EOVERFLOW);
        let msg = err.to_string();
        assert!(msg.contains("sem_post"));
        assert!(msg.contains("full"));
    }

    #[test]
    fn test_error_chain() {
        let validation_err = HardValidationError::PayloadSizeOutOfBounds {
            size: 0,
            min: 1,
            max: 16,
        };
        let err: SlotshmError = validation_err.into();
        assert!(matches!(err, SlotshmError::HardValidation(_)));

        let init_err = TransportInitError::new(InitOperation::Mmap, "/frames", Errno::ENOMEM);
        let err: SlotshmError = init_err.into();
        assert!(matches!(err, SlotshmError::Init(_)));
    }
}
