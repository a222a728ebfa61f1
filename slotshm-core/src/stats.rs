// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Per-endpoint counters. Local to the process, never placed in the region.
#[derive(Debug, Default)]
pub struct TransportStats {
    writes: AtomicU64,
    signaled: AtomicU64,
    coalesced: AtomicU64,
    delivered: AtomicU64,
    empty_polls: AtomicU64,
}

impl TransportStats {
    pub(crate) fn record_write(&self, signaled: bool) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if signaled {
            self.signaled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_read(&self, delivered: bool) {
        if delivered {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.empty_polls.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            signaled: self.signaled.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TransportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Messages copied into the region.
    pub writes: u64,
    /// Writes that raised the pending signal.
    pub signaled: u64,
    /// Writes that overwrote an unconsumed message without a new signal.
    pub coalesced: u64,
    /// Reads that returned a message.
    pub delivered: u64,
    /// Reads that found nothing pending.
    pub empty_polls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = TransportStats::default();
        stats.record_write(true);
        stats.record_write(false);
        stats.record_write(false);
        stats.record_read(true);
        stats.record_read(false);

        let snap = stats.snapshot();
        assert_eq!(snap.writes, 3);
        assert_eq!(snap.signaled, 1);
        assert_eq!(snap.coalesced, 2);
        assert_eq!(snap.delivered, 1);
        assert_eq!(snap.empty_polls, 1);
    }
}
