//! Model output variable accumulation and extraction (ITU-R BS.1387-1 §4):
//! turns per-frame ear-model and adapter output into the small set of
//! scalars the neural-network stage maps to a distortion index.

#![deny(unsafe_code)]

pub mod accum;
pub mod ehs;
pub mod extractors;

pub use accum::{Mode, MovAccum};
pub use ehs::ehs;
pub use extractors::{
    bandwidth, lin_dist, modulation_difference, nmr, noise_loud_asym, noise_loudness, prob_detect,
};
