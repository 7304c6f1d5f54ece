//! The FFT-based ear model: Hann window, FFT, power spectrum, critical-band
//! grouping, frequency and time spreading.
//!
//! Ported from `peaq_fftearmodel_process_block` in `fftearmodel.c`.

use peaq_fft::RealFft;
use rustfft::num_complex::Complex;

use crate::params::{Params, FRAME_SIZE};
use crate::spreading;

/// `gamma` in the playback-level calibration formula (`8/3 * (gamma/4 *
/// (FRAME_SIZE - 1))^2`), fixed by the standard.
const GAMMA: f64 = 0.84971762641205;

/// Per-channel mutable state owned by a single consumer.
#[derive(Debug, Clone)]
pub struct State {
    filtered_excitation: Vec<f64>,
    pub excitation: Vec<f64>,
    pub unsmeared_excitation: Vec<f64>,
    pub power_spectrum: Vec<f64>,
    pub weighted_power_spectrum: Vec<f64>,
    pub energy_threshold_reached: bool,
}

impl State {
    pub fn new(band_count: usize) -> Self {
        Self {
            filtered_excitation: vec![0.0; band_count],
            excitation: vec![0.0; band_count],
            unsmeared_excitation: vec![0.0; band_count],
            power_spectrum: vec![0.0; FRAME_SIZE / 2 + 1],
            weighted_power_spectrum: vec![0.0; FRAME_SIZE / 2 + 1],
            energy_threshold_reached: false,
        }
    }
}

/// The FFT ear model: one instance is shared (read-only, after construction)
/// by every channel's [`State`].
#[derive(Debug)]
pub struct FftEarModel {
    params: Params,
    level_factor: f64,
}

impl FftEarModel {
    pub fn new(band_count: usize) -> Self {
        Self {
            params: Params::new(band_count),
            level_factor: Self::level_factor_for_db(92.0),
        }
    }

    pub fn band_count(&self) -> usize {
        self.params.band_count
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    fn level_factor_for_db(playback_level_db: f64) -> f64 {
        let scale = 8.0 / 3.0 * (GAMMA / 4.0 * (FRAME_SIZE as f64 - 1.0)).powi(2);
        10f64.powf(playback_level_db / 10.0) / scale
    }

    pub fn set_playback_level(&mut self, playback_level_db: f64) {
        self.level_factor = Self::level_factor_for_db(playback_level_db);
    }

    /// Computes total loudness for a frame's excitation vector, used by the
    /// orchestrator's loudness-reached bookkeeping.
    pub fn calc_loudness(&self, excitation: &[f64]) -> f64 {
        let n = self.params.band_count as f64;
        (24.0 / n)
            * (0..self.params.band_count)
                .map(|b| {
                    let threshold = self.params.threshold[b];
                    let ratio = excitation[b] / self.params.excitation_threshold[b];
                    let term = (1.0 - threshold + threshold * ratio).powf(0.23) - 1.0;
                    self.params.loudness_factor[b] * term.max(0.0)
                })
                .sum::<f64>()
    }

    /// Processes one [`FRAME_SIZE`]-sample frame, updating `state` in place.
    pub fn process_block(&self, state: &mut State, samples: &[f32], fft: &mut RealFft) {
        debug_assert_eq!(samples.len(), FRAME_SIZE);

        let mut windowed: Vec<f64> = samples
            .iter()
            .zip(&self.params.window)
            .map(|(&s, &w)| s as f64 * w)
            .collect();

        let mut spectrum = vec![Complex::new(0.0, 0.0); fft.output_len()];
        fft.process(&mut windowed, &mut spectrum);

        for (k, bin) in spectrum.iter().enumerate() {
            let power = (bin.norm_sqr() * self.level_factor).max(1e-12);
            state.power_spectrum[k] = power;
            state.weighted_power_spectrum[k] = power * self.params.ear_weight[k];
        }

        let band_count = self.params.band_count;
        let mut band_power = self.params.group_into_bands(&state.weighted_power_spectrum);
        for b in &mut band_power {
            *b = b.max(1e-12);
        }

        for b in 0..band_count {
            band_power[b] += self.params.internal_noise[b];
        }

        state.unsmeared_excitation = spreading::spread(&self.params, &band_power);

        for b in 0..band_count {
            let a = self.params.time_smoothing[b];
            state.filtered_excitation[b] =
                a * state.filtered_excitation[b] + (1.0 - a) * state.unsmeared_excitation[b];
            state.excitation[b] = state.filtered_excitation[b].max(state.unsmeared_excitation[b]);
        }

        let tail_energy: f64 = samples[FRAME_SIZE / 2..]
            .iter()
            .map(|&s| (s as f64).powi(2))
            .sum();
        state.energy_threshold_reached = tail_energy >= 8000.0 / 32768.0f64.powi(2);

        tracing::trace!(
            energy_threshold_reached = state.energy_threshold_reached,
            "fft ear model frame processed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_frame_leaves_no_residual_excitation() {
        let model = FftEarModel::new(109);
        let mut state = State::new(model.band_count());
        let mut fft = RealFft::new(FRAME_SIZE);
        let samples = vec![0.0f32; FRAME_SIZE];
        model.process_block(&mut state, &samples, &mut fft);
        assert!(!state.energy_threshold_reached);
        for &e in &state.excitation {
            assert!(e.is_finite());
            assert!(e >= 0.0);
        }
    }

    #[test]
    fn unsmeared_excitation_never_exceeds_excitation() {
        let model = FftEarModel::new(55);
        let mut state = State::new(model.band_count());
        let mut fft = RealFft::new(FRAME_SIZE);
        let mut samples = vec![0.0f32; FRAME_SIZE];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = 0.3 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 48_000.0).sin();
        }
        model.process_block(&mut state, &samples, &mut fft);
        for b in 0..state.excitation.len() {
            assert!(state.unsmeared_excitation[b] <= state.excitation[b] + 1e-9);
        }
    }
}
