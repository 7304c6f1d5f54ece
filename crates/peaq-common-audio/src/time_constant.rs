//! Per-band one-pole filter time constants.
//!
//! Both ear models, the level/pattern adapter, and the modulation processor
//! all smooth per-band signals with a one-pole filter whose time constant
//! depends on the band's center frequency. Ported from
//! `peaq_earmodel_calc_time_constant` in `earmodel.c`.

use crate::SAMPLING_RATE;

/// Computes the per-band smoothing coefficient `a = exp(-step_size / (fs *
/// tau))`, where `tau = tau_min + 100/fc * (tau_100 - tau_min)`.
///
/// `step_size` is in samples at the model's own frame rate; `fc` is the
/// band's center frequency in Hz.
pub fn calc_time_constant(fc: f64, step_size: f64, tau_min: f64, tau_100: f64) -> f64 {
    let tau = tau_min + (100.0 / fc) * (tau_100 - tau_min);
    (-step_size / (SAMPLING_RATE * tau)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_is_in_unit_interval() {
        for fc in [50.0, 1000.0, 18000.0] {
            let a = calc_time_constant(fc, 1024.0, 0.008, 0.030);
            assert!((0.0..1.0).contains(&a));
        }
    }

    #[test]
    fn larger_step_size_smooths_less() {
        let a_small = calc_time_constant(1000.0, 192.0, 0.008, 0.030);
        let a_large = calc_time_constant(1000.0, 1024.0, 0.008, 0.030);
        assert!(a_large < a_small);
    }
}
