//! Shared DSP primitives used by both PEAQ ear models and the level/pattern
//! adapter.
//!
//! None of this is specific to the FFT-based or filterbank-based ear model;
//! it is the small set of closed-form formulas that ITU-R BS.1387-1
//! prescribes identically for both.

#![deny(unsafe_code)]

pub mod ear_weighting;
pub mod sampling;
pub mod time_constant;
pub mod window;

/// The sampling rate PEAQ is defined at. Every formula in the standard is
/// only valid at 48 kHz; there is no resampling path.
pub const SAMPLING_RATE: f64 = 48_000.0;
