// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! POSIX named semaphores.
//!
//! `NamedSemaphore` wraps `sem_open`/`sem_close` with RAII. The `Semaphore`
//! trait is the seam Writer and Reader are generic over, so a test can
//! substitute a semaphore the OS would refuse.

use std::ffi::CString;
use std::ptr::NonNull;

use nix::errno::Errno;

use crate::error::{InitOperation, TransportInitError};
use crate::types::{ChannelName, SemaphoreRole};

/// Counting semaphore operations used by the transport.
pub trait Semaphore: Send + Sync {
    /// Decrement, blocking until the value is positive.
    fn wait(&self) -> Result<(), Errno>;

    /// Decrement without blocking. `Ok(false)` if the value was zero.
    fn try_wait(&self) -> Result<bool, Errno>;

    /// Increment, waking one waiter.
    fn post(&self) -> Result<(), Errno>;
}

/// Handle to an OS named semaphore, closed (not unlinked) on drop.
#[derive(Debug)]
pub struct NamedSemaphore {
    name: String,
    sem: NonNull<libc::sem_t>,
    created: bool,
}

// SAFETY: POSIX semaphore operations are thread-safe and the handle stays
// valid until sem_close in Drop.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Open the semaphore, creating it with `initial` if it does not exist.
    /// An existing semaphore keeps its current value.
    pub fn create(name: &str, initial: u32) -> Result<Self, TransportInitError> {
        let c_name = c_name(name)?;
        let mode = libc::S_IRWXU as libc::c_uint;
        // SAFETY: c_name is a valid CString; O_CREAT takes mode and value
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                mode,
                initial as libc::c_uint,
            )
        };
        if sem != libc::SEM_FAILED || Errno::last() != Errno::EEXIST {
            return Self::from_raw(name, sem, true);
        }

        // SAFETY: as above; without O_EXCL an existing semaphore is reused
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR,
                mode,
                initial as libc::c_uint,
            )
        };
        Self::from_raw(name, sem, false)
    }

    /// Open an existing semaphore. Fails with `ENOENT` if it was never created.
    pub fn open(name: &str) -> Result<Self, TransportInitError> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid CString
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        Self::from_raw(name, sem, false)
    }

    fn from_raw(
        name: &str,
        sem: *mut libc::sem_t,
        created: bool,
    ) -> Result<Self, TransportInitError> {
        if sem == libc::SEM_FAILED {
            return Err(TransportInitError::new(
                InitOperation::SemOpen,
                name,
                Errno::last(),
            ));
        }
        let sem = NonNull::new(sem).ok_or_else(|| {
            TransportInitError::new(InitOperation::SemOpen, name, Errno::EFAULT)
        })?;
        Ok(Self {
            name: name.to_string(),
            sem,
            created,
        })
    }

    /// Remove a semaphore name from the OS namespace.
    pub fn unlink(name: &str) -> Result<(), Errno> {
        let c_name = CString::new(name).map_err(|_| Errno::EINVAL)?;
        // SAFETY: c_name is a valid CString
        let result = unsafe { libc::sem_unlink(c_name.as_ptr()) };
        if result < 0 {
            return Err(Errno::last());
        }
        Ok(())
    }

    pub(crate) fn created(&self) -> bool {
        self.created
    }

    /// Current value. Diagnostic only; it may change before the caller looks.
    pub fn value(&self) -> Result<i32, Errno> {
        let mut value: libc::c_int = 0;
        // SAFETY: sem is valid until drop
        let result = unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) };
        if result < 0 {
            return Err(Errno::last());
        }
        Ok(value)
    }
}

fn c_name(name: &str) -> Result<CString, TransportInitError> {
    CString::new(name)
        .map_err(|_| TransportInitError::new(InitOperation::SemOpen, name, Errno::EINVAL))
}

impl Semaphore for NamedSemaphore {
    fn wait(&self) -> Result<(), Errno> {
        loop {
            // SAFETY: sem is valid until drop
            let result = unsafe { libc::sem_wait(self.sem.as_ptr()) };
            if result == 0 {
                return Ok(());
            }
            match Errno::last() {
                Errno::EINTR => continue,
                errno => return Err(errno),
            }
        }
    }

    fn try_wait(&self) -> Result<bool, Errno> {
        loop {
            // SAFETY: sem is valid until drop
            let result = unsafe { libc::sem_trywait(self.sem.as_ptr()) };
            if result == 0 {
                return Ok(true);
            }
            match Errno::last() {
                Errno::EAGAIN => return Ok(false),
                Errno::EINTR => continue,
                errno => return Err(errno),
            }
        }
    }

    fn post(&self) -> Result<(), Errno> {
        // SAFETY: sem is valid until drop
        let result = unsafe { libc::sem_post(self.sem.as_ptr()) };
        if result < 0 {
            return Err(Errno::last());
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: sem was returned by sem_open and is closed exactly once
        let result = unsafe { libc::sem_close(self.sem.as_ptr()) };
        if result < 0 {
            tracing::warn!(
                name = %self.name,
                error = %Errno::last(),
                "Failed to close semaphore"
            );
        }
    }
}

/// The mutex / empty / full semaphores of one channel.
pub struct SemaphoreSet<S> {
    pub(crate) mutex: S,
    pub(crate) empty: S,
    pub(crate) full: S,
}

impl<S: Semaphore> SemaphoreSet<S> {
    pub fn new(mutex: S, empty: S, full: S) -> Self {
        Self { mutex, empty, full }
    }
}

impl SemaphoreSet<NamedSemaphore> {
    /// Create (or reuse) the channel's semaphores with their initial values.
    ///
    /// On failure, semaphores this call created are unlinked again; reused
    /// ones are only closed.
    pub fn create(name: &ChannelName) -> Result<Self, TransportInitError> {
        let open = |role: SemaphoreRole| {
            NamedSemaphore::create(&name.semaphore_name(role), role.initial_value())
        };
        let mutex = open(SemaphoreRole::Mutex)?;
        let empty = open(SemaphoreRole::Empty).map_err(|e| {
            discard_created(&[&mutex]);
            e
        })?;
        let full = open(SemaphoreRole::Full).map_err(|e| {
            discard_created(&[&mutex, &empty]);
            e
        })?;
        Ok(Self { mutex, empty, full })
    }

    /// Open the channel's existing semaphores.
    pub fn open(name: &ChannelName) -> Result<Self, TransportInitError> {
        let open = |role: SemaphoreRole| NamedSemaphore::open(&name.semaphore_name(role));
        Ok(Self {
            mutex: open(SemaphoreRole::Mutex)?,
            empty: open(SemaphoreRole::Empty)?,
            full: open(SemaphoreRole::Full)?,
        })
    }
}

fn discard_created(sems: &[&NamedSemaphore]) {
    for sem in sems.iter().filter(|sem| sem.created()) {
        if let Err(e) = NamedSemaphore::unlink(&sem.name) {
            tracing::warn!(name = %sem.name, error = %e, "Failed to remove semaphore");
        }
    }
}
