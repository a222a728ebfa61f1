//! Test doubles shared by the writer and reader unit tests.

use std::sync::Mutex;

use nix::errno::Errno;

use crate::shm::semaphore::Semaphore;
use crate::types::ChannelName;

pub(crate) fn channel(tag: &str) -> ChannelName {
    ChannelName::new(format!("slotshm_unit_{}_{}", tag, std::process::id())).unwrap()
}

struct State {
    value: u32,
    cap: u32,
    wait_error: Option<Errno>,
}

/// In-process semaphore whose value cannot exceed `cap`; posting past it
/// fails with `EOVERFLOW` the way `sem_post` does at `SEM_VALUE_MAX`.
pub(crate) struct CappedSemaphore {
    state: Mutex<State>,
}

impl CappedSemaphore {
    pub(crate) fn new(value: u32, cap: u32) -> Self {
        Self {
            state: Mutex::new(State {
                value,
                cap,
                wait_error: None,
            }),
        }
    }

    pub(crate) fn current(&self) -> u32 {
        self.state.lock().unwrap().value
    }

    pub(crate) fn set_cap(&self, cap: u32) {
        self.state.lock().unwrap().cap = cap;
    }

    /// Make every subsequent `wait` and `try_wait` fail with `errno`.
    pub(crate) fn fail_wait(&self, errno: Errno) {
        self.state.lock().unwrap().wait_error = Some(errno);
    }

    pub(crate) fn clear_failure(&self) {
        self.state.lock().unwrap().wait_error = None;
    }
}

impl Semaphore for CappedSemaphore {
    fn wait(&self) -> Result<(), Errno> {
        let mut state = self.state.lock().unwrap();
        if let Some(errno) = state.wait_error {
            return Err(errno);
        }
        // Single-threaded tests never wait on an empty double
        assert!(state.value > 0, "wait would block forever");
        state.value -= 1;
        Ok(())
    }

    fn try_wait(&self) -> Result<bool, Errno> {
        let mut state = self.state.lock().unwrap();
        if let Some(errno) = state.wait_error {
            return Err(errno);
        }
        if state.value == 0 {
            return Ok(false);
        }
        state.value -= 1;
        Ok(true)
    }

    fn post(&self) -> Result<(), Errno> {
        let mut state = self.state.lock().unwrap();
        if state.value >= state.cap {
            return Err(Errno::EOVERFLOW);
        }
        state.value += 1;
        Ok(())
    }
}
