//! Outer and middle ear frequency weighting.
//!
//! Ported from `peaq_earmodel_calc_ear_weight` in `earmodel.c`.

/// Squared-magnitude outer/middle-ear weighting at frequency `freq` (Hz),
/// expressed as a linear power ratio (not dB).
///
/// `W_t(f) [dB] = -0.6 * 3.64 * (f/1000)^-0.8
///              + 6.5 * exp(-0.6 * (f/1000 - 3.3)^2)
///              - 1e-3 * (f/1000)^3.6`
pub fn weight(freq: f64) -> f64 {
    10f64.powf(weight_db(freq) / 10.0)
}

/// Outer/middle-ear weighting at frequency `freq` (Hz), expressed as a
/// linear *amplitude* ratio. Used by the filterbank ear model, which applies
/// the weighting to FIR coefficients (amplitude domain) rather than to a
/// power spectrum directly; squaring the filter output then yields the same
/// power-domain weighting [`weight`] applies.
pub fn amplitude(freq: f64) -> f64 {
    10f64.powf(weight_db(freq) / 20.0)
}

fn weight_db(freq: f64) -> f64 {
    let f_khz = freq / 1000.0;
    -0.6 * 3.64 * f_khz.powf(-0.8) + 6.5 * (-0.6 * (f_khz - 3.3).powi(2)).exp()
        - 1e-3 * f_khz.powf(3.6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_is_positive_across_audible_range() {
        for hz in [50.0, 100.0, 1000.0, 4000.0, 18000.0] {
            assert!(weight(hz) > 0.0, "weight({hz}) should be positive");
        }
    }

    #[test]
    fn weight_peaks_near_3_3_khz() {
        let near_peak = weight(3300.0);
        let low = weight(200.0);
        let high = weight(15000.0);
        assert!(near_peak > low);
        assert!(near_peak > high);
    }

    #[test]
    fn amplitude_is_sqrt_of_power_weight() {
        for hz in [50.0, 1000.0, 10000.0] {
            assert!((amplitude(hz).powi(2) - weight(hz)).abs() < 1e-12);
        }
    }
}
