//! The FFT-based ear model (ITU-R BS.1387-1 §2.1/§3.1): Hann-windowed FFT,
//! critical-band grouping, frequency and time spreading.
//!
//! Used directly by basic-mode analysis (109 bands) and alongside the
//! filterbank model in advanced-mode analysis (55 bands).

#![deny(unsafe_code)]

pub mod model;
pub mod params;
pub mod spreading;

pub use model::{FftEarModel, State};
pub use params::{BandEdge, Params, FRAME_SIZE, STEP_SIZE};
