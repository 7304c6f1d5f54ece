//! The filterbank-based ear model (ITU-R BS.1387-1 §2.2/§3.2): DC
//! rejection, 40-band complex FIR filterbank, frequency- and time-domain
//! spreading.
//!
//! Used alongside the FFT ear model in advanced-mode analysis.

#![deny(unsafe_code)]

pub mod model;
pub mod params;

pub use model::{FilterbankEarModel, State};
pub use params::{Params, BAND_COUNT, BUFFER_LENGTH, FILTER_LENGTH, FRAME_SIZE};
