//! Level and pattern adaptation (ITU-R BS.1387-1 §3.3): aligns reference and
//! test excitation patterns in overall level, then lets the two patterns
//! slowly adapt towards each other band by band.
//!
//! Ported from `peaq_leveladapter_process` in `leveladapter.c`.

use peaq_common_audio::time_constant::calc_time_constant;

const TAU_MIN: f64 = 0.008;
const TAU_100: f64 = 0.05;

/// One frame's worth of level- and pattern-adapted excitation patterns.
#[derive(Debug, Clone)]
pub struct LevelAdapterOutput {
    pub spectrally_adapted_ref_patterns: Vec<f64>,
    pub spectrally_adapted_test_patterns: Vec<f64>,
}

/// Immutable, shared parameters for one level adapter instance.
#[derive(Debug)]
pub struct LevelAdapter {
    band_count: usize,
    ear_time_constants: Vec<f64>,
}

impl LevelAdapter {
    /// `band_center_freq` and `step_size` come from the ear model this
    /// adapter is attached to.
    pub fn new(band_center_freq: &[f64], step_size: f64) -> Self {
        let ear_time_constants = band_center_freq
            .iter()
            .map(|&fc| calc_time_constant(fc, step_size, TAU_MIN, TAU_100))
            .collect();
        Self {
            band_count: band_center_freq.len(),
            ear_time_constants,
        }
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn new_state(&self) -> State {
        State::new(self.band_count)
    }

    pub fn process(
        &self,
        state: &mut State,
        ref_excitation: &[f64],
        test_excitation: &[f64],
    ) -> LevelAdapterOutput {
        let band_count = self.band_count;
        debug_assert_eq!(ref_excitation.len(), band_count);
        debug_assert_eq!(test_excitation.len(), band_count);

        let mut num = 0.0;
        let mut den = 0.0;
        for k in 0..band_count {
            let a = self.ear_time_constants[k];
            state.ref_filtered_excitation[k] =
                a * state.ref_filtered_excitation[k] + (1.0 - a) * ref_excitation[k];
            state.test_filtered_excitation[k] =
                a * state.test_filtered_excitation[k] + (1.0 - a) * test_excitation[k];
            num += (state.ref_filtered_excitation[k] * state.test_filtered_excitation[k]).sqrt();
            den += state.test_filtered_excitation[k];
        }
        let lev_corr = num * num / (den * den);

        let mut levcorr_ref_excitation = vec![0.0; band_count];
        let mut levcorr_test_excitation = vec![0.0; band_count];
        if lev_corr > 1.0 {
            levcorr_test_excitation.copy_from_slice(test_excitation);
            for k in 0..band_count {
                levcorr_ref_excitation[k] = ref_excitation[k] / lev_corr;
            }
        } else {
            levcorr_ref_excitation.copy_from_slice(ref_excitation);
            for k in 0..band_count {
                levcorr_test_excitation[k] = test_excitation[k] * lev_corr;
            }
        }

        let mut pattadapt_ref = vec![0.0; band_count];
        let mut pattadapt_test = vec![0.0; band_count];
        for k in 0..band_count {
            let a = self.ear_time_constants[k];
            state.filtered_num[k] =
                a * state.filtered_num[k] + levcorr_test_excitation[k] * levcorr_ref_excitation[k];
            state.filtered_den[k] =
                a * state.filtered_den[k] + levcorr_ref_excitation[k] * levcorr_ref_excitation[k];
            if state.filtered_num[k] >= state.filtered_den[k] {
                pattadapt_ref[k] = 1.0;
                pattadapt_test[k] = state.filtered_den[k] / state.filtered_num[k];
            } else {
                pattadapt_ref[k] = state.filtered_num[k] / state.filtered_den[k];
                pattadapt_test[k] = 1.0;
            }
        }

        // Neighborhood smoothing span, scaled with the total band count:
        // 109 bands -> (3, 4), 55 bands -> (1, 2), 40 bands -> (1, 1).
        let m1_span = band_count / 36;
        let m2_span = band_count / 25;

        let mut output = LevelAdapterOutput {
            spectrally_adapted_ref_patterns: vec![0.0; band_count],
            spectrally_adapted_test_patterns: vec![0.0; band_count],
        };
        for k in 0..band_count {
            let m1 = m1_span.min(k);
            let m2 = m2_span.min(band_count - k - 1);
            let mut ra_ref = 0.0;
            let mut ra_test = 0.0;
            for l in (k - m1)..=(k + m2) {
                ra_ref += pattadapt_ref[l];
                ra_test += pattadapt_test[l];
            }
            let span = (m1 + m2 + 1) as f64;
            ra_ref /= span;
            ra_test /= span;

            let a = self.ear_time_constants[k];
            state.pattcorr_ref[k] = a * state.pattcorr_ref[k] + (1.0 - a) * ra_ref;
            state.pattcorr_test[k] = a * state.pattcorr_test[k] + (1.0 - a) * ra_test;
            output.spectrally_adapted_ref_patterns[k] =
                levcorr_ref_excitation[k] * state.pattcorr_ref[k];
            output.spectrally_adapted_test_patterns[k] =
                levcorr_test_excitation[k] * state.pattcorr_test[k];
        }
        output
    }
}

/// Per-channel-pair mutable state owned by a single consumer.
#[derive(Debug, Clone)]
pub struct State {
    ref_filtered_excitation: Vec<f64>,
    test_filtered_excitation: Vec<f64>,
    filtered_num: Vec<f64>,
    filtered_den: Vec<f64>,
    pattcorr_ref: Vec<f64>,
    pattcorr_test: Vec<f64>,
}

impl State {
    pub fn new(band_count: usize) -> Self {
        Self {
            ref_filtered_excitation: vec![0.0; band_count],
            test_filtered_excitation: vec![0.0; band_count],
            filtered_num: vec![0.0; band_count],
            filtered_den: vec![0.0; band_count],
            pattcorr_ref: vec![0.0; band_count],
            pattcorr_test: vec![0.0; band_count],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band_centers(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 * (i as f64 + 1.0)).collect()
    }

    #[test]
    fn identical_patterns_stay_level_corrected_to_one() {
        let centers = band_centers(10);
        let adapter = LevelAdapter::new(&centers, 1024.0);
        let mut state = adapter.new_state();
        let excitation = vec![1.0; 10];
        let mut output = adapter.process(&mut state, &excitation, &excitation);
        for _ in 0..50 {
            output = adapter.process(&mut state, &excitation, &excitation);
        }
        for k in 0..10 {
            assert!((output.spectrally_adapted_ref_patterns[k] - 1.0).abs() < 1e-6);
            assert!((output.spectrally_adapted_test_patterns[k] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn outputs_stay_finite_and_nonnegative() {
        let centers = band_centers(12);
        let adapter = LevelAdapter::new(&centers, 1024.0);
        let mut state = adapter.new_state();
        let r: Vec<f64> = (0..12).map(|i| 1.0 + i as f64 * 0.3).collect();
        let t: Vec<f64> = (0..12).map(|i| 2.0 + i as f64 * 0.1).collect();
        let output = adapter.process(&mut state, &r, &t);
        for &v in output
            .spectrally_adapted_ref_patterns
            .iter()
            .chain(&output.spectrally_adapted_test_patterns)
        {
            assert!(v.is_finite());
            assert!(v >= 0.0);
        }
    }
}
