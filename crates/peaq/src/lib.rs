//! Objective Difference Grade (ITU-R BS.1387-1 / PEAQ) perceptual audio
//! quality measurement.
//!
//! [`Algo`] is the only surface most callers need: construct it with
//! [`Algo::new_basic`] or [`Algo::new_advanced`], feed it 48 kHz interleaved
//! PCM through [`Algo::process_block`], [`Algo::flush`] at end of stream, and
//! read [`Algo::calculate_odg`].

#![deny(unsafe_code)]

mod algo;
mod channel_state;
mod error;
mod movset;
mod orchestrator;
mod toggles;

pub use algo::Algo;
pub use error::Error;
pub use toggles::Toggles;
