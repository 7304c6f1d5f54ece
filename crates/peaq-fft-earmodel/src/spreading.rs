//! Frequency-domain excitation spreading across critical bands.
//!
//! Ported from the spreading step of `peaq_fftearmodel_process_block` in
//! `fftearmodel.c` (itself a transcription of Kabal's 2003 reformulation of
//! the BS.1387 spreading formula).

use crate::params::Params;

/// Spreads per-band power `p` across neighboring bands and returns the
/// unsmeared excitation, normalized by `params.spreading_normalization`
/// (pass `vec![1.0; band_count]` as the identity when precomputing that
/// normalization itself).
pub fn spread(params: &Params, p: &[f64]) -> Vec<f64> {
    let n = params.band_count;
    debug_assert_eq!(p.len(), n);

    // Per-band upper-slope steady-state gain and normalized energy,
    // following `do_spreading` in fftearmodel.c.
    let a_uce: Vec<f64> = (0..n)
        .map(|i| params.a_uc[i] * p[i].powf(0.2 * params.delta_z))
        .collect();
    let g_iu: Vec<f64> = (0..n)
        .map(|i| {
            let base = a_uce[i];
            (1.0 - base.powi((n - i) as i32)) / (1.0 - base)
        })
        .collect();
    let en: Vec<f64> = (0..n)
        .map(|i| p[i] / (params.g_il[i] + g_iu[i] - 1.0))
        .collect();
    let a_uce_e: Vec<f64> = a_uce.iter().map(|a| a.powf(0.4)).collect();
    let en_e: Vec<f64> = en.iter().map(|e| e.powf(0.4)).collect();

    // Downward slope contribution via back-recursion.
    let a_le = params.a_l.powf(0.4);
    let mut e2 = vec![0.0; n];
    e2[n - 1] = en_e[n - 1];
    for i in (1..n).rev() {
        e2[i - 1] = a_le * e2[i] + en_e[i - 1];
    }

    // Upward slope contribution.
    for i in 0..(n - 1) {
        let mut contribution = en_e[i];
        for j in (i + 1)..n {
            contribution *= a_uce_e[i];
            e2[j] += contribution;
        }
    }

    (0..n)
        .map(|i| e2[i].powf(1.0 / 0.4) / params.spreading_normalization[i].max(f64::MIN_POSITIVE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_positive_everywhere() {
        let params = Params::new(109);
        for &n in &params.spreading_normalization {
            assert!(n > 0.0);
        }
    }

    #[test]
    fn spreading_an_already_normalized_input_is_bounded() {
        let params = Params::new(55);
        let input = vec![1.0; params.band_count];
        let out = spread(&params, &input);
        for v in out {
            assert!(v.is_finite());
            assert!(v > 0.0);
        }
    }
}
