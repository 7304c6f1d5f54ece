//! Modulation pattern processing (ITU-R BS.1387-1 §3.2): per-band
//! 0.3-power loudness and its smoothed absolute derivative.
//!
//! Ported from `peaq_modulationprocessor_process` in `modpatt.c`.

use peaq_common_audio::{time_constant::calc_time_constant, SAMPLING_RATE};

const TAU_MIN: f64 = 0.008;
const TAU_100: f64 = 0.05;

/// Immutable, shared parameters for one modulation processor instance.
#[derive(Debug)]
pub struct ModulationProcessor {
    band_count: usize,
    step_size: f64,
    ear_time_constants: Vec<f64>,
}

impl ModulationProcessor {
    /// `band_center_freq` and `step_size` come from the ear model this
    /// processor is attached to.
    pub fn new(band_center_freq: &[f64], step_size: f64) -> Self {
        let ear_time_constants = band_center_freq
            .iter()
            .map(|&fc| calc_time_constant(fc, step_size, TAU_MIN, TAU_100))
            .collect();
        Self {
            band_count: band_center_freq.len(),
            step_size,
            ear_time_constants,
        }
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn new_state(&self) -> State {
        State::new(self.band_count)
    }

    /// Processes one frame's unsmeared excitation pattern, updating `state`
    /// in place. `state.average_loudness()` and `state.modulation()` hold
    /// the results afterwards.
    pub fn process(&self, state: &mut State, unsmeared_excitation: &[f64]) {
        debug_assert_eq!(unsmeared_excitation.len(), self.band_count);

        for k in 0..self.band_count {
            let loudness = unsmeared_excitation[k].powf(0.3);
            let loudness_derivative =
                SAMPLING_RATE / self.step_size * (loudness - state.previous_loudness[k]).abs();
            let a = self.ear_time_constants[k];
            state.filtered_loudness_derivative[k] = a * state.filtered_loudness_derivative[k]
                + (1.0 - a) * loudness_derivative;
            state.filtered_loudness[k] = a * state.filtered_loudness[k] + (1.0 - a) * loudness;
            state.modulation[k] =
                state.filtered_loudness_derivative[k] / (1.0 + state.filtered_loudness[k] / 0.3);
            state.previous_loudness[k] = loudness;
        }
    }
}

/// Per-channel mutable state owned by a single consumer.
#[derive(Debug, Clone)]
pub struct State {
    previous_loudness: Vec<f64>,
    filtered_loudness: Vec<f64>,
    filtered_loudness_derivative: Vec<f64>,
    modulation: Vec<f64>,
}

impl State {
    pub fn new(band_count: usize) -> Self {
        Self {
            previous_loudness: vec![0.0; band_count],
            filtered_loudness: vec![0.0; band_count],
            filtered_loudness_derivative: vec![0.0; band_count],
            modulation: vec![0.0; band_count],
        }
    }

    pub fn average_loudness(&self) -> &[f64] {
        &self.filtered_loudness
    }

    pub fn modulation(&self) -> &[f64] {
        &self.modulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_excitation_drives_modulation_to_zero() {
        let centers: Vec<f64> = (0..10).map(|i| 100.0 * (i as f64 + 1.0)).collect();
        let proc = ModulationProcessor::new(&centers, 1024.0);
        let mut state = proc.new_state();
        let excitation = vec![2.0; 10];
        for _ in 0..200 {
            proc.process(&mut state, &excitation);
        }
        for &m in state.modulation() {
            assert!(m < 1e-6);
        }
    }

    #[test]
    fn outputs_stay_finite_and_nonnegative() {
        let centers: Vec<f64> = (0..8).map(|i| 100.0 * (i as f64 + 1.0)).collect();
        let proc = ModulationProcessor::new(&centers, 1024.0);
        let mut state = proc.new_state();
        let excitation: Vec<f64> = (0..8).map(|i| 1.0 + i as f64).collect();
        proc.process(&mut state, &excitation);
        for &v in state.average_loudness().iter().chain(state.modulation()) {
            assert!(v.is_finite());
            assert!(v >= 0.0);
        }
    }
}
