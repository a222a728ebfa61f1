// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Reader - non-blocking consumer of a single-slot channel.

use crate::config::ChannelConfig;
use crate::error::{SemaphoreOp, TransportError, TransportInitError};
use crate::shm::region::SharedRegion;
use crate::shm::semaphore::{NamedSemaphore, Semaphore, SemaphoreSet};
use crate::stats::{StatsSnapshot, TransportStats};
use crate::types::{ChannelName, PayloadSize, SemaphoreRole};

/// Consuming end of a channel. Never creates or removes OS objects.
pub struct Reader<S: Semaphore = NamedSemaphore> {
    region: SharedRegion,
    sems: SemaphoreSet<S>,
    stats: TransportStats,
}

impl Reader<NamedSemaphore> {
    /// Attach to a channel the writer has already created.
    ///
    /// Fails fast when the writer has not created it yet; check
    /// [`TransportInitError::is_not_ready`] to decide whether to retry.
    pub fn open(name: &ChannelName, size: PayloadSize) -> Result<Self, TransportInitError> {
        let region = SharedRegion::open_read_only(name, size)?;
        let sems = SemaphoreSet::open(name)?;

        tracing::debug!(name = %name, size = size.bytes(), "Reader attached");
        Ok(Self::from_parts(region, sems))
    }

    pub fn from_config(config: &ChannelConfig) -> Result<Self, TransportInitError> {
        Self::open(&config.name, config.payload_size)
    }
}

impl<S: Semaphore> Reader<S> {
    pub(crate) fn from_parts(region: SharedRegion, sems: SemaphoreSet<S>) -> Self {
        Self {
            region,
            sems,
            stats: TransportStats::default(),
        }
    }

    pub fn name(&self) -> &ChannelName {
        self.region.name()
    }

    pub fn size(&self) -> usize {
        self.region.size()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Take the pending message, if any, without blocking.
    ///
    /// Returns `Ok(false)` and leaves `buf` untouched when nothing is
    /// pending. Otherwise copies [`size`](Self::size) bytes into the front
    /// of `buf` and returns `Ok(true)`.
    ///
    /// If the lock cannot be taken the message stays pending for the next
    /// call. If the lock cannot be released after the copy, `buf` holds the
    /// message and the slot is still marked consumed, but the error is
    /// returned.
    pub fn read(&self, buf: &mut [u8]) -> Result<bool, TransportError> {
        let size = self.region.size();
        if buf.len() < size {
            return Err(TransportError::BufferTooSmall {
                required: size,
                actual: buf.len(),
            });
        }

        let pending = self.sems.full.try_wait().map_err(|e| {
            TransportError::semaphore(SemaphoreRole::Full, SemaphoreOp::TryWait, e)
        })?;
        if !pending {
            self.stats.record_read(false);
            return Ok(false);
        }

        if let Err(e) = self.sems.mutex.wait() {
            // Nothing was copied; put the signal back so the message stays pending
            if let Err(restore) = self.sems.full.post() {
                tracing::error!(
                    name = %self.name(),
                    error = %restore,
                    "Failed to restore pending signal after failed lock"
                );
            }
            return Err(TransportError::semaphore(
                SemaphoreRole::Mutex,
                SemaphoreOp::Wait,
                e,
            ));
        }
        // SAFETY: mutex held and the slice is exactly the region size
        unsafe { self.region.copy_out(&mut buf[..size]) };
        let unlocked = self
            .sems
            .mutex
            .post()
            .map_err(|e| TransportError::semaphore(SemaphoreRole::Mutex, SemaphoreOp::Post, e));

        // The message is consumed either way; the writer must be able to
        // signal the next one.
        self.release()?;
        self.stats.record_read(true);
        unlocked?;

        tracing::trace!(name = %self.name(), "Consumed message");
        Ok(true)
    }

    /// Mark the slot consumed so the next write raises a new signal.
    fn release(&self) -> Result<(), TransportError> {
        self.sems
            .empty
            .post()
            .map_err(|e| TransportError::semaphore(SemaphoreRole::Empty, SemaphoreOp::Post, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::testing::{channel, CappedSemaphore};
    use nix::errno::Errno;

    struct Pair {
        writer_region: SharedRegion,
        reader: Reader<CappedSemaphore>,
    }

    impl Drop for Pair {
        fn drop(&mut self) {
            let _ = SharedRegion::unlink(self.writer_region.name());
        }
    }

    fn pair(tag: &str, size: usize, full: u32) -> Pair {
        let name = channel(tag);
        let size = PayloadSize::new(size).unwrap();
        let writer_region = SharedRegion::create(&name, size).unwrap();
        let region = SharedRegion::open_read_only(&name, size).unwrap();
        let sems = SemaphoreSet::new(
            CappedSemaphore::new(1, 1),
            CappedSemaphore::new(0, 1),
            CappedSemaphore::new(full, 1),
        );
        Pair {
            writer_region,
            reader: Reader::from_parts(region, sems),
        }
    }

    #[test]
    fn test_nothing_pending_leaves_buffer() {
        let p = pair("idle", 8, 0);
        let mut buf = [0xEEu8; 8];
        assert!(!p.reader.read(&mut buf).unwrap());
        assert_eq!(buf, [0xEEu8; 8]);
        assert_eq!(p.reader.stats().empty_polls, 1);
    }

    #[test]
    fn test_larger_buffer_only_front_is_written() {
        let p = pair("large_buf", 4, 1);
        unsafe { p.writer_region.copy_in(&[1, 2, 3, 4]) };

        let mut buf = [0u8; 6];
        assert!(p.reader.read(&mut buf).unwrap());
        assert_eq!(buf, [1, 2, 3, 4, 0, 0]);
        assert_eq!(p.reader.sems.empty.current(), 1);
    }

    #[test]
    fn test_small_buffer_keeps_signal() {
        let p = pair("small_buf", 8, 1);
        let mut buf = [0u8; 4];
        let err = p.reader.read(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::BufferTooSmall {
                required: 8,
                actual: 4
            }
        ));
        assert_eq!(p.reader.sems.full.current(), 1);
    }

    #[test]
    fn test_refused_release_is_reported() {
        let p = pair("release_refused", 4, 1);
        // empty already at its cap: the consume signal overflows
        p.reader.sems.empty.post().unwrap();

        let mut buf = [0u8; 4];
        let err = p.reader.read(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Semaphore {
                role: SemaphoreRole::Empty,
                operation: SemaphoreOp::Post,
                source: Errno::EOVERFLOW,
            }
        ));
    }

    #[test]
    fn test_refused_poll_is_reported() {
        let p = pair("poll_refused", 4, 1);
        p.reader.sems.full.fail_wait(Errno::EINVAL);

        let mut buf = [0u8; 4];
        assert!(matches!(
            p.reader.read(&mut buf),
            Err(TransportError::Semaphore {
                role: SemaphoreRole::Full,
                operation: SemaphoreOp::TryWait,
                ..
            })
        ));
    }

    #[test]
    fn test_refused_lock_keeps_message_pending() {
        let p = pair("lock_refused", 4, 1);
        unsafe { p.writer_region.copy_in(&[4, 3, 2, 1]) };
        p.reader.sems.mutex.fail_wait(Errno::EINVAL);

        let mut buf = [0u8; 4];
        let err = p.reader.read(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Semaphore {
                role: SemaphoreRole::Mutex,
                operation: SemaphoreOp::Wait,
                source: Errno::EINVAL,
            }
        ));
        assert_eq!(buf, [0u8; 4]);
        assert_eq!(p.reader.sems.full.current(), 1);
        assert_eq!(p.reader.sems.empty.current(), 0);

        // Lock works again: the same message is delivered and the slot released
        p.reader.sems.mutex.clear_failure();
        assert!(p.reader.read(&mut buf).unwrap());
        assert_eq!(buf, [4, 3, 2, 1]);
        assert_eq!(p.reader.sems.full.current(), 0);
        assert_eq!(p.reader.sems.empty.current(), 1);
    }

    #[test]
    fn test_refused_unlock_still_releases_slot() {
        let p = pair("unlock_refused", 4, 1);
        unsafe { p.writer_region.copy_in(&[5, 6, 7, 8]) };
        // wait takes the mutex to zero, then the post overflows
        p.reader.sems.mutex.set_cap(0);

        let mut buf = [0u8; 4];
        let err = p.reader.read(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Semaphore {
                role: SemaphoreRole::Mutex,
                operation: SemaphoreOp::Post,
                source: Errno::EOVERFLOW,
            }
        ));
        assert_eq!(buf, [5, 6, 7, 8]);
        assert_eq!(p.reader.sems.empty.current(), 1);
        assert_eq!(p.reader.stats().delivered, 1);
    }
}
