//! Analysis windows.

/// Hann window of length `len`, scaled by `sqrt(8/3)` so that the windowed
/// frame's power spectral density estimate is unbiased (the scaling the FFT
/// ear model applies before transforming).
///
/// Ported from the window precomputation in `fftearmodel.c`.
pub fn hann_scaled(len: usize) -> Vec<f64> {
    let scale = (8.0_f64 / 3.0).sqrt();
    (0..len)
        .map(|k| {
            let phase = 2.0 * std::f64::consts::PI * k as f64 / (len as f64 - 1.0);
            scale * 0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Plain Hann window of length `len`, used by the EHS correlation analysis.
pub fn hann(len: usize) -> Vec<f64> {
    (0..len)
        .map(|k| {
            let phase = 2.0 * std::f64::consts::PI * k as f64 / (len as f64 - 1.0);
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_scaled_endpoints_are_near_zero() {
        let w = hann_scaled(2048);
        assert!(w[0].abs() < 1e-9);
        assert!(w[2047].abs() < 1e-9);
    }

    #[test]
    fn hann_peaks_at_center() {
        let w = hann(256);
        let center = w[128];
        assert!(center > w[0]);
        assert!(center > w[255]);
    }
}
