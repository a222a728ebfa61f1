// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Writer - owner and publisher of a single-slot channel.
//!
//! The writer creates the region and the semaphore triple, overwrites the
//! slot on every `write`, and unlinks every OS object when it goes away.

use crate::config::ChannelConfig;
use crate::error::{SemaphoreOp, TransportError, TransportInitError};
use crate::shm::region::{discard_object, SharedRegion};
use crate::shm::semaphore::{NamedSemaphore, Semaphore, SemaphoreSet};
use crate::shm::unlink_channel;
use crate::stats::{StatsSnapshot, TransportStats};
use crate::types::{ChannelName, PayloadSize, SemaphoreRole};

/// Outcome of a successful [`Writer::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The reader was notified of a new message.
    Signaled,
    /// No new signal was raised because the previous one had not been
    /// released. Usually the previous message was still pending and the
    /// reader will see these bytes in its place. If the reader had already
    /// taken the signal but not yet released the slot, these bytes are not
    /// signaled at all; the next write that finds the slot released will
    /// signal instead.
    Coalesced,
}

/// Publishing end of a channel.
pub struct Writer<S: Semaphore = NamedSemaphore> {
    region: SharedRegion,
    sems: SemaphoreSet<S>,
    stats: TransportStats,
    /// Set once cleanup has run so Drop does not unlink twice.
    closed: bool,
}

impl Writer<NamedSemaphore> {
    /// Create the channel objects and map the region read-write.
    ///
    /// Existing objects with the same name are reused as they are,
    /// semaphore values included. On failure, objects created by this call
    /// are unlinked and reused ones are left alone.
    pub fn create(name: &ChannelName, size: PayloadSize) -> Result<Self, TransportInitError> {
        let region = SharedRegion::create(name, size)?;
        let sems = match SemaphoreSet::create(name) {
            Ok(sems) => sems,
            Err(e) => {
                // Only remove what this call made; a reused region may
                // belong to a live writer.
                if region.created() {
                    discard_object(name);
                }
                return Err(e);
            }
        };

        tracing::debug!(name = %name, size = size.bytes(), "Writer ready");
        Ok(Self::from_parts(region, sems))
    }

    /// Create the writer described by `config`, reclaiming stale objects first
    /// if requested.
    pub fn from_config(config: &ChannelConfig) -> Result<Self, TransportInitError> {
        if config.reclaim_stale {
            let removed = unlink_channel(&config.name);
            if !removed.is_empty() {
                tracing::info!(
                    name = %config.name,
                    objects = ?removed,
                    "Reclaimed stale channel objects"
                );
            }
        }
        Self::create(&config.name, config.payload_size)
    }
}

impl<S: Semaphore> Writer<S> {
    pub(crate) fn from_parts(region: SharedRegion, sems: SemaphoreSet<S>) -> Self {
        Self {
            region,
            sems,
            stats: TransportStats::default(),
            closed: false,
        }
    }

    pub fn name(&self) -> &ChannelName {
        self.region.name()
    }

    /// Payload size agreed with the reader.
    pub fn size(&self) -> usize {
        self.region.size()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Overwrite the slot with `data` and notify the reader if the previous
    /// message was consumed.
    ///
    /// `data` must be exactly [`size`](Self::size) bytes. The bytes always
    /// land; whether a new signal is raised is reported by [`Publish`].
    pub fn write(&self, data: &[u8]) -> Result<Publish, TransportError> {
        if data.len() != self.region.size() {
            return Err(TransportError::PayloadSizeMismatch {
                expected: self.region.size(),
                actual: data.len(),
            });
        }

        self.sems
            .mutex
            .wait()
            .map_err(|e| TransportError::semaphore(SemaphoreRole::Mutex, SemaphoreOp::Wait, e))?;
        // SAFETY: mutex held, region is read-write and data.len() == size
        unsafe { self.region.copy_in(data) };
        self.sems
            .mutex
            .post()
            .map_err(|e| TransportError::semaphore(SemaphoreRole::Mutex, SemaphoreOp::Post, e))?;

        let latched = self.sems.empty.try_wait().map_err(|e| {
            TransportError::semaphore(SemaphoreRole::Empty, SemaphoreOp::TryWait, e)
        })?;

        if !latched {
            self.stats.record_write(false);
            tracing::trace!(name = %self.name(), "Overwrote pending message");
            return Ok(Publish::Coalesced);
        }

        if let Err(e) = self.sems.full.post() {
            // Hand the latch back so the next write can signal
            if let Err(restore) = self.sems.empty.post() {
                tracing::error!(
                    name = %self.name(),
                    error = %restore,
                    "Failed to restore empty latch after failed signal"
                );
            }
            return Err(TransportError::semaphore(
                SemaphoreRole::Full,
                SemaphoreOp::Post,
                e,
            ));
        }

        self.stats.record_write(true);
        tracing::trace!(name = %self.name(), "Published message");
        Ok(Publish::Signaled)
    }

    /// Unlink the channel and release the mapping, reporting the first
    /// unlink failure. Dropping the writer does the same but only logs.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.closed = true;
        self.unlink_all()
    }

    fn unlink_all(&self) -> Result<(), TransportError> {
        let name = self.region.name();
        let mut first_error = None;

        if let Err(e) = SharedRegion::unlink(name) {
            first_error.get_or_insert(TransportError::Unlink {
                object: name.shm_name().to_string(),
                source: e,
            });
        }
        for role in SemaphoreRole::ALL {
            let object = name.semaphore_name(role);
            if let Err(e) = NamedSemaphore::unlink(&object) {
                first_error.get_or_insert(TransportError::Unlink { object, source: e });
            }
        }

        tracing::debug!(name = %name, "Unlinked channel");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<S: Semaphore> Drop for Writer<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.unlink_all() {
            tracing::warn!(name = %self.region.name(), error = %e, "Channel cleanup incomplete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InitOperation;
    use crate::shm::testing::{channel, CappedSemaphore};
    use nix::errno::Errno;

    fn capped_writer(tag: &str, size: usize, full_cap: u32) -> Writer<CappedSemaphore> {
        let name = channel(tag);
        let region = SharedRegion::create(&name, PayloadSize::new(size).unwrap()).unwrap();
        let sems = SemaphoreSet::new(
            CappedSemaphore::new(1, 1),
            CappedSemaphore::new(1, 1),
            CappedSemaphore::new(0, full_cap),
        );
        Writer::from_parts(region, sems)
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let writer = capped_writer("wrong_len", 16, 1);
        let err = writer.write(&[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::PayloadSizeMismatch {
                expected: 16,
                actual: 15
            }
        ));
        assert_eq!(writer.stats().writes, 0);
    }

    #[test]
    fn test_second_write_coalesces() {
        let writer = capped_writer("coalesce", 8, 1);
        assert_eq!(writer.write(&[1u8; 8]).unwrap(), Publish::Signaled);
        assert_eq!(writer.write(&[2u8; 8]).unwrap(), Publish::Coalesced);
        assert_eq!(writer.write(&[3u8; 8]).unwrap(), Publish::Coalesced);

        let stats = writer.stats();
        assert_eq!(stats.writes, 3);
        assert_eq!(stats.signaled, 1);
        assert_eq!(stats.coalesced, 2);
    }

    #[test]
    fn test_refused_signal_is_reported_and_latch_restored() {
        // full cannot go above zero: every post overflows
        let writer = capped_writer("overflow", 8, 0);

        let err = writer.write(&[7u8; 8]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Semaphore {
                role: SemaphoreRole::Full,
                operation: SemaphoreOp::Post,
                source: Errno::EOVERFLOW,
            }
        ));
        assert_eq!(writer.sems.empty.current(), 1);

        // Capacity returns; the next write signals normally
        writer.sems.full.set_cap(1);
        assert_eq!(writer.write(&[8u8; 8]).unwrap(), Publish::Signaled);
        assert_eq!(writer.sems.full.current(), 1);
    }

    #[test]
    fn test_refused_mutex_leaves_region_untouched() {
        let writer = capped_writer("mutex_refused", 4, 1);
        writer.write(&[1u8; 4]).unwrap();
        writer.sems.mutex.fail_wait(Errno::EINVAL);

        let err = writer.write(&[9u8; 4]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Semaphore {
                role: SemaphoreRole::Mutex,
                operation: SemaphoreOp::Wait,
                ..
            }
        ));

        let mut out = [0u8; 4];
        unsafe { writer.region.copy_out(&mut out) };
        assert_eq!(out, [1u8; 4]);
    }

    // glibc keeps named semaphores at /dev/shm/sem.<name>; a directory in
    // that spot makes sem_open fail for one role.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_failed_create_leaves_reused_region() {
        let name = channel("keep_live");
        let size = PayloadSize::new(8).unwrap();
        let live = SharedRegion::create(&name, size).unwrap();
        let full = name.semaphore_name(SemaphoreRole::Full);
        let blocker = format!("/dev/shm/sem.{}", full.trim_start_matches('/'));
        std::fs::create_dir(&blocker).unwrap();

        let result = Writer::create(&name, size);
        std::fs::remove_dir(&blocker).unwrap();

        let err = result.err().expect("create should fail");
        assert_eq!(err.operation, InitOperation::SemOpen);
        assert!(SharedRegion::open_read_only(&name, size).is_ok());
        for role in [SemaphoreRole::Mutex, SemaphoreRole::Empty] {
            let err = NamedSemaphore::open(&name.semaphore_name(role)).unwrap_err();
            assert!(err.is_not_found());
        }

        drop(live);
        SharedRegion::unlink(&name).unwrap();
    }
}
