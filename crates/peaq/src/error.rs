//! Configuration error taxonomy (§7): the only fallible operations in the
//! core are the three setters below. `process_block` and `flush` cannot
//! fail.

use std::fmt;

/// An error from one of [`crate::Algo`]'s configuration setters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// `set_playback_level` was called with a value outside `0..=130` dB.
    InvalidPlaybackLevel { db: f64 },
    /// `set_channels` was called with zero channels.
    InvalidChannelCount { channels: u32 },
    /// `process_block` was called with reference and test buffers implying
    /// different channel counts.
    ChannelCountMismatch { reference: usize, test: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPlaybackLevel { db } => {
                write!(f, "playback level {db} dB is outside the valid 0..=130 dB range")
            }
            Error::InvalidChannelCount { channels } => {
                write!(f, "channel count {channels} must be at least 1")
            }
            Error::ChannelCountMismatch { reference, test } => write!(
                f,
                "reference has {reference} channels but test has {test}"
            ),
        }
    }
}

impl std::error::Error for Error {}
