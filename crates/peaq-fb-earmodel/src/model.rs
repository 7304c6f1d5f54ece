//! The filterbank-based ear model: DC rejection, 40-band complex FIR
//! filterbank, frequency-domain and time-domain spreading.
//!
//! Ported from `process_block` and `apply_filter_bank` in `fbearmodel.c`.

use crate::params::{Params, BAND_COUNT, BUFFER_LENGTH, FILTER_LENGTH, FRAME_SIZE};

const SLOPE_FILTER_A: f64 = 0.993355506255034;
const DIST: f64 = 0.921851456499719;
const CL: f64 = 0.0802581846102741;

/// Per-channel mutable state owned by a single consumer.
#[derive(Debug, Clone)]
pub struct State {
    hpfilter1_x1: f64,
    hpfilter1_x2: f64,
    hpfilter1_y1: f64,
    hpfilter1_y2: f64,
    hpfilter2_y1: f64,
    hpfilter2_y2: f64,
    fb_buf: Vec<f64>,
    fb_buf_offset: usize,
    cu: [f64; BAND_COUNT],
    e0_buf: [[f64; 11]; BAND_COUNT],
    pub excitation: [f64; BAND_COUNT],
    pub unsmeared_excitation: [f64; BAND_COUNT],
}

impl State {
    pub fn new() -> Self {
        Self {
            hpfilter1_x1: 0.0,
            hpfilter1_x2: 0.0,
            hpfilter1_y1: 0.0,
            hpfilter1_y2: 0.0,
            hpfilter2_y1: 0.0,
            hpfilter2_y2: 0.0,
            fb_buf: vec![0.0; 2 * BUFFER_LENGTH],
            fb_buf_offset: 0,
            cu: [0.0; BAND_COUNT],
            e0_buf: [[0.0; 11]; BAND_COUNT],
            excitation: [0.0; BAND_COUNT],
            unsmeared_excitation: [0.0; BAND_COUNT],
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The filterbank ear model: one instance is shared (read-only, after
/// construction) by every channel's [`State`].
#[derive(Debug)]
pub struct FilterbankEarModel {
    params: Params,
    level_factor: f64,
    /// `SWAP_SLOPE_FILTER_COEFFICIENTS` (§9): the reference source and the
    /// Kabal-2003 reformulation disagree on which of the two constants below
    /// is the slope filter's own smoothing coefficient and which is the
    /// fixed backward-leak coefficient applied across bands. Default (the
    /// source's choice) uses `SLOPE_FILTER_A` to smooth `cu` and `CL` as the
    /// leak; the swapped variant exchanges their roles.
    swap_slope_filter_coefficients: bool,
}

impl FilterbankEarModel {
    pub fn new() -> Self {
        Self::with_toggle(false)
    }

    /// Builds a filterbank ear model with the `SWAP_SLOPE_FILTER_COEFFICIENTS`
    /// toggle (§9) set explicitly.
    pub fn with_toggle(swap_slope_filter_coefficients: bool) -> Self {
        Self {
            params: Params::new(),
            level_factor: Self::level_factor_for_db(92.0),
            swap_slope_filter_coefficients,
        }
    }

    pub fn band_count(&self) -> usize {
        BAND_COUNT
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    fn level_factor_for_db(playback_level_db: f64) -> f64 {
        10f64.powf(playback_level_db / 20.0)
    }

    pub fn set_playback_level(&mut self, playback_level_db: f64) {
        self.level_factor = Self::level_factor_for_db(playback_level_db);
    }

    /// Processes one [`FRAME_SIZE`]-sample frame, updating `state` in place.
    pub fn process_block(&self, state: &mut State, samples: &[f32]) {
        debug_assert_eq!(samples.len(), FRAME_SIZE);

        for (k, &sample) in samples.iter().enumerate() {
            let scaled_input = sample as f64 * self.level_factor;

            let hpfilter1_out = scaled_input - 2.0 * state.hpfilter1_x1 + state.hpfilter1_x2
                + 1.99517 * state.hpfilter1_y1
                - 0.995174 * state.hpfilter1_y2;
            let hpfilter2_out = hpfilter1_out - 2.0 * state.hpfilter1_y1 + state.hpfilter1_y2
                + 1.99799 * state.hpfilter2_y1
                - 0.997998 * state.hpfilter2_y2;
            state.hpfilter1_x2 = state.hpfilter1_x1;
            state.hpfilter1_x1 = scaled_input;
            state.hpfilter1_y2 = state.hpfilter1_y1;
            state.hpfilter1_y1 = hpfilter1_out;
            state.hpfilter2_y2 = state.hpfilter2_y1;
            state.hpfilter2_y1 = hpfilter2_out;

            if state.fb_buf_offset == 0 {
                state.fb_buf_offset = BUFFER_LENGTH;
            }
            state.fb_buf_offset -= 1;
            state.fb_buf[state.fb_buf_offset] = hpfilter2_out;
            state.fb_buf[state.fb_buf_offset + BUFFER_LENGTH] = hpfilter2_out;

            if k % 32 == 0 {
                self.apply_filter_bank_and_spread(state);
            }
        }

        let back_mask_h = &self.params.back_mask_h;
        for band in 0..BAND_COUNT {
            let mut e1 = 0.0;
            for i in 0..5 {
                e1 += (state.e0_buf[band][i] + state.e0_buf[band][10 - i]) * back_mask_h[i];
            }
            e1 += state.e0_buf[band][5] * back_mask_h[5];

            let e_thres = self.params.internal_noise[band];
            state.unsmeared_excitation[band] = e1 + e_thres;

            let a = self.params.time_smoothing[band];
            state.excitation[band] =
                a * state.excitation[band] + (1.0 - a) * state.unsmeared_excitation[band];
        }

        tracing::trace!("filterbank ear model frame processed");
    }

    fn apply_filter_bank_and_spread(&self, state: &mut State) {
        let mut fb_out_re = [0.0; BAND_COUNT];
        let mut fb_out_im = [0.0; BAND_COUNT];
        for band in 0..BAND_COUNT {
            let n = FILTER_LENGTH[band];
            let d = 1 + (FILTER_LENGTH[0] - n) / 2;
            let n_2 = n / 2;
            let h_re = &self.params.fbh_re[band];
            let h_im = &self.params.fbh_im[band];

            let base1 = d + state.fb_buf_offset;
            let base2 = d + n + state.fb_buf_offset;
            let mut re_out = 0.0;
            let mut im_out = 0.0;
            // coefficient index 0 is always zero, skip it
            for j in 1..n_2 {
                let in1 = state.fb_buf[base1 + j];
                let in2 = state.fb_buf[base2 - j];
                re_out += (in1 + in2) * h_re[j];
                im_out += (in1 - in2) * h_im[j];
            }
            let in1 = state.fb_buf[base1 + n_2];
            re_out += in1 * h_re[n_2];
            im_out += in1 * h_im[n_2];
            fb_out_re[band] = re_out;
            fb_out_im[band] = im_out;
        }

        let mut a_re = fb_out_re;
        let mut a_im = fb_out_im;

        for band in 0..BAND_COUNT {
            let fc = self.params.band_center_freq[band];
            let l = 10.0
                * (fb_out_re[band] * fb_out_re[band] + fb_out_im[band] * fb_out_im[band])
                    .log10();
            let s = (4.0f64).max(24.0 + 230.0 / fc - 0.2 * l);
            let dist_s = DIST.powf(s);
            let smoothing = if self.swap_slope_filter_coefficients { CL } else { SLOPE_FILTER_A };
            state.cu[band] = state.cu[band] + smoothing * (dist_s - state.cu[band]);

            let mut d1 = fb_out_re[band];
            let mut d2 = fb_out_im[band];
            for j in (band + 1)..BAND_COUNT {
                d1 *= state.cu[band];
                d2 *= state.cu[band];
                a_re[j] += d1;
                a_im[j] += d2;
            }
        }

        let leak = if self.swap_slope_filter_coefficients { SLOPE_FILTER_A } else { CL };
        for band in (1..BAND_COUNT).rev() {
            a_re[band - 1] += leak * a_re[band];
            a_im[band - 1] += leak * a_im[band];
        }

        let mut e0 = [0.0; BAND_COUNT];
        for band in 0..BAND_COUNT {
            e0[band] = a_re[band] * a_re[band] + a_im[band] * a_im[band];
        }

        for band in 0..BAND_COUNT {
            state.e0_buf[band].copy_within(0..10, 1);
            state.e0_buf[band][0] = e0[band];
        }
    }
}

impl Default for FilterbankEarModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_input_leaves_no_residual_excitation() {
        let model = FilterbankEarModel::new();
        let mut state = State::new();
        let samples = vec![0.0f32; FRAME_SIZE];
        for _ in 0..20 {
            model.process_block(&mut state, &samples);
        }
        for &e in &state.excitation {
            assert!(e.is_finite());
            assert!(e >= 0.0);
        }
    }

    #[test]
    fn unsmeared_excitation_is_finite_for_tone() {
        let model = FilterbankEarModel::new();
        let mut state = State::new();
        let mut samples = vec![0.0f32; FRAME_SIZE];
        for i in 0..600 {
            for (n, s) in samples.iter_mut().enumerate() {
                let t = (i * FRAME_SIZE + n) as f32;
                *s = 0.3 * (2.0 * std::f32::consts::PI * 1000.0 * t / 48_000.0).sin();
            }
            model.process_block(&mut state, &samples);
        }
        for b in 0..BAND_COUNT {
            assert!(state.unsmeared_excitation[b].is_finite());
            assert!(state.excitation[b].is_finite());
        }
    }
}
