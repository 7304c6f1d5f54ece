//! Precomputed, construction-time-only parameters for the FFT ear model:
//! window, band layout, ear weighting, internal noise, and the frequency
//! spreading coefficients.
//!
//! Ported from the model-parameter precomputation in `fftearmodel.c`
//! (`peaq_fftearmodel_init`).

use peaq_common_audio::{ear_weighting, time_constant::calc_time_constant, window};

/// Number of samples in one analysis frame.
pub const FRAME_SIZE: usize = 2048;
/// Samples advanced between successive analysis frames (50% overlap).
pub const STEP_SIZE: usize = FRAME_SIZE / 2;

const TAU_MIN: f64 = 0.008;
const TAU_100: f64 = 0.030;

/// One band's fractional-bin grouping: the band's power is
/// `weight_lo * bin[lower] + weight_hi * bin[upper] + (full bins strictly
/// between lower and upper)`.
#[derive(Debug, Clone, Copy)]
pub struct BandEdge {
    pub lower: usize,
    pub upper: usize,
    pub weight_lo: f64,
    pub weight_hi: f64,
}

/// Immutable, shared parameters for one FFT ear model configuration (basic:
/// 109 bands, advanced: 55 bands).
#[derive(Debug)]
pub struct Params {
    pub band_count: usize,
    pub window: Vec<f64>,
    pub ear_weight: Vec<f64>,
    pub band_edges: Vec<BandEdge>,
    pub band_center_freq: Vec<f64>,
    pub internal_noise: Vec<f64>,
    pub excitation_threshold: Vec<f64>,
    pub threshold: Vec<f64>,
    pub loudness_factor: Vec<f64>,
    pub time_smoothing: Vec<f64>,
    /// Lower-slope spreading factor, constant across bands.
    pub a_l: f64,
    /// Per-band upper-slope base factor `aUC[i]`.
    pub a_uc: Vec<f64>,
    /// Per-band steady-state lower-spreading gain `gIL[i]`.
    pub g_il: Vec<f64>,
    /// Per-band masking difference, in linear power ratio, used by the NMR
    /// extractor.
    pub masking_difference: Vec<f64>,
    pub delta_z: f64,
    /// Normalization applied after spreading, computed by spreading an
    /// all-ones excitation vector through the same operator.
    pub spreading_normalization: Vec<f64>,
}

impl Params {
    pub fn new(band_count: usize) -> Self {
        let window = window::hann_scaled(FRAME_SIZE);
        let bin_width = 48_000.0 / FRAME_SIZE as f64;
        let ear_weight = (0..FRAME_SIZE / 2 + 1)
            .map(|k| ear_weighting::weight(k as f64 * bin_width))
            .collect::<Vec<_>>();

        // Band layout: equally spaced on the Bark-like scale
        // `z(f) = 7*asinh(f/650)` from 80 Hz to 18 kHz, `deltaZ` fixed at
        // `27/(band_count-1)` rather than derived from the 80 Hz/18 kHz
        // span, matching `fftearmodel.c`'s `set_property`.
        let inv_z = |z: f64| 650.0 * (z / 7.0).sinh();
        let z_lo = 7.0 * (80.0_f64 / 650.0).asinh();
        let z_hi = 7.0 * (18_000.0_f64 / 650.0).asinh();
        let delta_z = 27.0 / (band_count as f64 - 1.0);

        let mut band_edges = Vec::with_capacity(band_count);
        let mut band_center_freq = Vec::with_capacity(band_count);
        for b in 0..band_count {
            let zl = z_lo + b as f64 * delta_z;
            let zu = (z_lo + (b + 1) as f64 * delta_z).min(z_hi);
            let zc = (zl + zu) / 2.0;
            let fc = inv_z(zc);
            band_center_freq.push(fc);

            let fl = inv_z(zl);
            let fu = inv_z(zu);
            let lower = (fl / bin_width).round() as usize;
            let upper = (fu / bin_width).round() as usize;
            // Fraction of the lower/upper edge bins that fall inside the
            // band: the lower bin contributes from `fl` up to its own
            // upper half-bin edge (clamped to `fu`); the upper bin
            // contributes from its own lower half-bin edge up to `fu`,
            // unless the band is narrow enough that both ends round to the
            // same bin, in which case the whole band is already covered by
            // `weight_lo` and the upper contribution is zero.
            let lower_freq_of_bin = lower as f64 * bin_width;
            let upper_freq_of_bin = upper as f64 * bin_width;
            let weight_lo = ((lower_freq_of_bin + bin_width / 2.0).min(fu) - fl) / bin_width;
            let weight_hi = if lower == upper {
                0.0
            } else {
                (fu - (upper_freq_of_bin - bin_width / 2.0)) / bin_width
            };
            band_edges.push(BandEdge {
                lower,
                upper,
                weight_lo,
                weight_hi,
            });
        }

        let internal_noise = band_center_freq
            .iter()
            .map(|fc| 10f64.powf(0.4 * 0.364 * (fc / 1000.0).powf(-0.8)))
            .collect::<Vec<_>>();
        let excitation_threshold = band_center_freq
            .iter()
            .map(|fc| 10f64.powf(0.364 * (fc / 1000.0).powf(-0.8)))
            .collect::<Vec<_>>();
        let threshold = band_center_freq
            .iter()
            .map(|fc| {
                10f64.powf(
                    0.1 * (-2.0 - 2.05 * (fc / 4000.0).atan()
                        - 0.75 * (fc / 1600.0).powi(2).atan()),
                )
            })
            .collect::<Vec<_>>();
        const LOUDNESS_SCALE: f64 = 1.07664;
        let loudness_factor = excitation_threshold
            .iter()
            .zip(threshold.iter())
            .map(|(exc_th, th)| LOUDNESS_SCALE * (exc_th / (1.0e4 * th)).powf(0.23))
            .collect::<Vec<_>>();

        let time_smoothing = band_center_freq
            .iter()
            .map(|fc| calc_time_constant(*fc, STEP_SIZE as f64, TAU_MIN, TAU_100))
            .collect::<Vec<_>>();

        let a_l = 10f64.powf(-2.7 * delta_z);
        let a_uc = band_center_freq
            .iter()
            .map(|fc| 10f64.powf((-2.4 - 23.0 / fc) * delta_z))
            .collect::<Vec<_>>();
        let g_il = (0..band_count)
            .map(|i| (1.0 - a_l.powi(i as i32 + 1)) / (1.0 - a_l))
            .collect::<Vec<_>>();
        let masking_difference = (0..band_count)
            .map(|i| {
                let bark = i as f64 * delta_z;
                let db = if bark <= 12.0 { 3.0 } else { 0.25 * bark };
                10f64.powf(db / 10.0)
            })
            .collect::<Vec<_>>();

        let mut params = Self {
            band_count,
            window,
            ear_weight,
            band_edges,
            band_center_freq,
            internal_noise,
            excitation_threshold,
            threshold,
            loudness_factor,
            time_smoothing,
            a_l,
            a_uc,
            g_il,
            masking_difference,
            delta_z,
            spreading_normalization: vec![1.0; band_count],
        };
        let ones = vec![1.0; band_count];
        params.spreading_normalization = crate::spreading::spread(&params, &ones);
        params
    }

    /// Groups a `FRAME_SIZE/2+1`-bin power spectrum into per-band sums,
    /// following the same fractional-bin weighting as the excitation
    /// computation in `process_block`.
    pub fn group_into_bands(&self, spectrum: &[f64]) -> Vec<f64> {
        self.band_edges
            .iter()
            .map(|edge| {
                let mut sum =
                    edge.weight_lo * spectrum[edge.lower] + edge.weight_hi * spectrum[edge.upper];
                for k in (edge.lower + 1)..edge.upper {
                    sum += spectrum[k];
                }
                sum
            })
            .collect()
    }
}
