// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! slotshm Benchmarks
//!
//! Shared setup for the criterion benches: payload sizes and a writer /
//! reader pair on a per-process channel name.

use slotshm_core::{ChannelName, PayloadSize, Reader, Writer};

/// Payload sizes to benchmark (in bytes).
pub const PAYLOAD_SIZES: &[usize] = &[64, 256, 1024, 4096, 16384, 65536];

/// Create a channel unique to this process and attach a reader to it.
///
/// Panics on failure; benches have no way to recover.
pub fn channel_pair(tag: &str, size: usize) -> (Writer, Reader) {
    let name = ChannelName::new(format!(
        "slotshm_bench_{}_{}_{}",
        tag,
        size,
        std::process::id()
    ))
    .expect("Invalid channel name");
    let size = PayloadSize::new(size).expect("Invalid payload size");
    let writer = Writer::create(&name, size).expect("Failed to create writer");
    let reader = Reader::open(&name, size).expect("Failed to open reader");
    (writer, reader)
}
