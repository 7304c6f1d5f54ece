//! Precomputed, construction-time-only parameters for the filterbank ear
//! model: per-band FIR filter coefficients, center frequencies, internal
//! noise, and time constants.
//!
//! Ported from the model-parameter precomputation in `fbearmodel.c`
//! (`init` and `class_init`).

use peaq_common_audio::{ear_weighting, time_constant::calc_time_constant};

/// Number of critical bands the filterbank decomposes the signal into.
pub const BAND_COUNT: usize = 40;
/// Number of samples consumed per call to [`crate::model::FilterbankEarModel::process_block`].
pub const FRAME_SIZE: usize = 192;

const TAU_MIN: f64 = 0.004;
const TAU_100: f64 = 0.020;

/// Per-band FIR filter tap count, taken from Table 8 of the standard.
pub const FILTER_LENGTH: [usize; BAND_COUNT] = [
    1456, 1438, 1406, 1362, 1308, 1244, 1176, 1104, 1030, 956, 884, 814, 748, 686, 626, 570, 520,
    472, 430, 390, 354, 320, 290, 262, 238, 214, 194, 176, 158, 144, 130, 118, 106, 96, 86, 78,
    70, 64, 58, 52,
];

/// The longest filter in the bank; also the filterbank's internal ring
/// buffer length.
pub const BUFFER_LENGTH: usize = FILTER_LENGTH[0];

/// Immutable, shared parameters for one filterbank ear model instance.
#[derive(Debug)]
pub struct Params {
    pub band_center_freq: [f64; BAND_COUNT],
    pub internal_noise: [f64; BAND_COUNT],
    pub time_smoothing: [f64; BAND_COUNT],
    /// First half (including the center tap) of each band's complex impulse
    /// response, exploiting the even/odd symmetry used by the filterbank.
    pub fbh_re: [Vec<f64>; BAND_COUNT],
    pub fbh_im: [Vec<f64>; BAND_COUNT],
    /// Backward-masking filter coefficients (first six; symmetric around
    /// the eleven-tap window).
    pub back_mask_h: [f64; 6],
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

impl Params {
    pub fn new() -> Self {
        let z = |f: f64| (f / 650.0).asinh();
        let z_lo = z(50.0);
        let z_hi = z(18_000.0);

        let mut band_center_freq = [0.0; BAND_COUNT];
        for (band, fc) in band_center_freq.iter_mut().enumerate() {
            *fc = 650.0 * (z_lo + band as f64 * (z_hi - z_lo) / 39.0).sinh();
        }

        let internal_noise = band_center_freq
            .map(|fc| 10f64.powf(0.4 * 0.364 * (fc / 1000.0).powf(-0.8)));
        let time_smoothing =
            band_center_freq.map(|fc| calc_time_constant(fc, FRAME_SIZE as f64, TAU_MIN, TAU_100));

        let fbh_re: [Vec<f64>; BAND_COUNT] = std::array::from_fn(|_| Vec::new());
        let fbh_im: [Vec<f64>; BAND_COUNT] = std::array::from_fn(|_| Vec::new());
        let mut params = Self {
            band_center_freq,
            internal_noise,
            time_smoothing,
            fbh_re,
            fbh_im,
            back_mask_h: [0.0; 6],
        };

        for band in 0..BAND_COUNT {
            let fc = params.band_center_freq[band];
            let n = FILTER_LENGTH[band];
            let wt = ear_weighting::amplitude(fc);
            let half = n / 2 + 1;
            let mut re = Vec::with_capacity(half);
            let mut im = Vec::with_capacity(half);
            for k in 0..half {
                let n_f = n as f64;
                let win = 4.0 / n_f
                    * (std::f64::consts::PI * k as f64 / n_f).sin().powi(2)
                    * wt;
                let phase = 2.0 * std::f64::consts::PI * fc * (k as f64 - n_f / 2.0) / 48_000.0;
                re.push(win * phase.cos());
                im.push(win * phase.sin());
            }
            params.fbh_re[band] = re;
            params.fbh_im[band] = im;
        }

        for (i, h) in params.back_mask_h.iter_mut().enumerate() {
            let c = (std::f64::consts::PI * (i as f64 - 5.0) / 12.0).cos();
            *h = c * c * 0.9761 / 6.0;
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_centers_are_increasing_and_in_range() {
        let p = Params::new();
        for w in p.band_center_freq.windows(2) {
            assert!(w[1] > w[0]);
        }
        assert!(p.band_center_freq[0] > 50.0);
        assert!(*p.band_center_freq.last().unwrap() < 18_000.0);
    }

    #[test]
    fn filter_coefficients_are_finite() {
        let p = Params::new();
        for band in 0..BAND_COUNT {
            assert_eq!(p.fbh_re[band].len(), FILTER_LENGTH[band] / 2 + 1);
            for (&re, &im) in p.fbh_re[band].iter().zip(&p.fbh_im[band]) {
                assert!(re.is_finite());
                assert!(im.is_finite());
            }
        }
    }
}
