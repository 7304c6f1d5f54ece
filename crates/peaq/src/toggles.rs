//! Conformance toggles (§9): five points where the standard's text and
//! independent interpretations (Kabal 2003) disagree. Defaults match the
//! source's own compile-time defaults.

/// Construction-time configuration for the handful of places where
/// ITU-R BS.1387-1's prose and the Kabal-2003 reformulation disagree.
///
/// The source exposes these as compile-time flags; here they are runtime
/// fields set once at [`crate::Algo`] construction and threaded down into
/// the relevant extractor/network calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    /// `RmsNoiseLoudAsymA`'s "missing components" term also swaps the
    /// reference/test modulation patterns, not just the excitations.
    pub swap_mod_patts_for_noise_loudness_movs: bool,
    /// EHS's correlation window is centered on the lag range rather than
    /// starting its phase at lag zero.
    pub center_ehs_correlation_window: bool,
    /// EHS subtracts the autocorrelation sequence's mean before windowing
    /// rather than after.
    pub ehs_subtract_dc_before_window: bool,
    /// Detection-probability step counts truncate towards negative infinity
    /// (floor) rather than towards zero (trunc).
    pub use_floor_for_steps_above_threshold: bool,
    /// Neural-network inputs are clamped to `[0, 1]` after normalization.
    pub clamp_movs: bool,
    /// The filterbank ear model's slope-filter smoothing coefficient and its
    /// fixed backward-leak coefficient trade places.
    pub swap_slope_filter_coefficients: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            swap_mod_patts_for_noise_loudness_movs: true,
            center_ehs_correlation_window: false,
            ehs_subtract_dc_before_window: true,
            use_floor_for_steps_above_threshold: false,
            clamp_movs: false,
            swap_slope_filter_coefficients: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_source_defaults() {
        let t = Toggles::default();
        assert!(t.swap_mod_patts_for_noise_loudness_movs);
        assert!(!t.center_ehs_correlation_window);
        assert!(t.ehs_subtract_dc_before_window);
        assert!(!t.use_floor_for_steps_above_threshold);
        assert!(!t.clamp_movs);
        assert!(!t.swap_slope_filter_coefficients);
    }
}
