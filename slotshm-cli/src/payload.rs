// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Text framing for the CLI.
//!
//! The transport carries opaque fixed-size blobs. The CLI puts UTF-8 text at
//! the front and zero-fills the rest; the poller strips the padding again.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Message is {len} bytes but the channel payload size is {size}")]
    TooLong { len: usize, size: usize },
}

/// Encode `text` followed by `#<seq>` into a zero-padded buffer of `size` bytes.
pub fn encode(text: &str, seq: u64, size: usize) -> Result<Vec<u8>, PayloadError> {
    let framed = format!("{} #{}", text, seq);
    if framed.len() > size {
        return Err(PayloadError::TooLong {
            len: framed.len(),
            size,
        });
    }

    let mut buf = vec![0u8; size];
    buf[..framed.len()].copy_from_slice(framed.as_bytes());
    Ok(buf)
}

/// Decode a received buffer, dropping the zero padding.
pub fn decode(buf: &[u8]) -> String {
    let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
