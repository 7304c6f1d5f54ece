//! Real-valued FFT wrapper sized for PEAQ's two fixed transform lengths: the
//! 2048-point analysis window used by the FFT ear model, and the smaller
//! transform the error-harmonic-structure extractor runs over its
//! autocorrelation buffer.
//!
//! Wraps `realfft`/`rustfft` rather than hand-rolling a radix-2 transform;
//! PEAQ's internal state is double precision throughout; so is this.

#![deny(unsafe_code)]

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

/// A real-to-complex forward FFT of a fixed length.
#[derive(Debug)]
pub struct RealFft {
    len: usize,
    fft: Arc<dyn RealToComplex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl RealFft {
    /// Builds a forward real FFT for frames of length `len`.
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(len);
        let scratch = fft.make_scratch_vec();
        Self { len, fft, scratch }
    }

    /// Length of the time-domain input this transform expects.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Length of the complex output: `len / 2 + 1`.
    pub fn output_len(&self) -> usize {
        self.len / 2 + 1
    }

    /// Transforms `input` (consumed, length must equal [`RealFft::len`]) into
    /// `output` (length must equal [`RealFft::output_len`]).
    pub fn process(&mut self, input: &mut [f64], output: &mut [Complex<f64>]) {
        debug_assert_eq!(input.len(), self.len);
        debug_assert_eq!(output.len(), self.output_len());
        self.fft
            .process_with_scratch(input, output, &mut self.scratch)
            .expect("fixed-size buffers always match the planned transform");
    }
}

/// A complex-to-real inverse FFT of a fixed length, used when a spectrum must
/// be carried back to the time domain (the EHS extractor's correlation
/// window).
#[derive(Debug)]
pub struct RealIfft {
    len: usize,
    fft: Arc<dyn ComplexToReal<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl RealIfft {
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_inverse(len);
        let scratch = fft.make_scratch_vec();
        Self { len, fft, scratch }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn input_len(&self) -> usize {
        self.len / 2 + 1
    }

    pub fn process(&mut self, input: &mut [Complex<f64>], output: &mut [f64]) {
        debug_assert_eq!(input.len(), self.input_len());
        debug_assert_eq!(output.len(), self.len);
        self.fft
            .process_with_scratch(input, output, &mut self.scratch)
            .expect("fixed-size buffers always match the planned transform");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_input_produces_dc_only_spectrum() {
        let mut fft = RealFft::new(8);
        let mut input = vec![1.0; 8];
        let mut output = vec![Complex::new(0.0, 0.0); fft.output_len()];
        fft.process(&mut input, &mut output);
        assert!((output[0].re - 8.0).abs() < 1e-9);
        for bin in &output[1..] {
            assert!(bin.norm() < 1e-9);
        }
    }

    #[test]
    fn output_len_matches_real_fft_convention() {
        let fft = RealFft::new(2048);
        assert_eq!(fft.output_len(), 1025);
    }
}
