//! Error harmonic structure MOV (§4.8): the autocorrelation of the
//! log-ratio of reference and test power spectra is windowed and
//! Fourier-transformed; the height of the first peak after the first
//! valley in that cepstrum-like spectrum is the EHSB value.
//!
//! Ported from `mov_ehs`/`detail::do_xcorr` in `movs.h`.

use peaq_fft::{RealFft, RealIfft};
use peaq_fft_earmodel::State as FftEarModelState;
use rustfft::num_complex::Complex;

use crate::accum::MovAccum;

const MAXLAG: usize = 256;

/// `CENTER_EHS_CORRELATION_WINDOW` (§9): the source's raised-cosine window
/// runs its phase from `0` at lag `0`; the centered variant shifts the phase
/// origin to the middle of the lag range instead.
fn correlation_window(centered: bool) -> [f64; MAXLAG] {
    let mut win = [0.0; MAXLAG];
    for (i, w) in win.iter_mut().enumerate() {
        let phase = if centered {
            2.0 * std::f64::consts::PI * (i as f64 - (MAXLAG as f64 - 1.0) / 2.0)
                / (MAXLAG as f64 - 1.0)
        } else {
            2.0 * std::f64::consts::PI * i as f64 / (MAXLAG as f64 - 1.0)
        };
        *w = 0.81649658092773 * (1.0 - phase.cos()) / MAXLAG as f64;
    }
    win
}

/// Computes the length-`MAXLAG` correlation-like sequence
/// `c[i] = sum_{k=0}^{MAXLAG-1} d[k] * d[k+i]` via a zero-padded FFT
/// product, avoiding the circular-correlation wraparound a direct
/// `2*MAXLAG`-point autocorrelation would introduce.
fn do_xcorr(d: &[f64; 2 * MAXLAG]) -> [f64; MAXLAG] {
    let mut fft = RealFft::new(2 * MAXLAG);
    let mut ifft = RealIfft::new(2 * MAXLAG);

    let mut timedata = d.to_vec();
    let mut freqdata1 = vec![Complex::new(0.0, 0.0); fft.output_len()];
    fft.process(&mut timedata, &mut freqdata1);

    let mut timedata = d.to_vec();
    for v in &mut timedata[MAXLAG..] {
        *v = 0.0;
    }
    let mut freqdata2 = vec![Complex::new(0.0, 0.0); fft.output_len()];
    fft.process(&mut timedata, &mut freqdata2);

    for (x1, x2) in freqdata1.iter_mut().zip(&freqdata2) {
        *x1 = *x1 * x2.conj() / (2.0 * MAXLAG as f64);
    }

    let mut timedata = vec![0.0; 2 * MAXLAG];
    ifft.process(&mut freqdata1, &mut timedata);

    let mut c = [0.0; MAXLAG];
    c.copy_from_slice(&timedata[..MAXLAG]);
    c
}

/// Computes the EHSB MOV for one frame, accumulating into `accum` unless no
/// channel of either signal has reached its energy threshold this frame.
///
/// `center_window` and `subtract_dc_before_window` are the
/// `CENTER_EHS_CORRELATION_WINDOW` and `EHS_SUBTRACT_DC_BEFORE_WINDOW`
/// toggles (§9).
pub fn ehs(
    ref_state: &[&FftEarModelState],
    test_state: &[&FftEarModelState],
    center_window: bool,
    subtract_dc_before_window: bool,
    accum: &mut MovAccum,
) {
    if !ref_state.iter().any(|s| s.energy_threshold_reached)
        && !test_state.iter().any(|s| s.energy_threshold_reached)
    {
        return;
    }

    let window = correlation_window(center_window);
    let mut correlation_fft = RealFft::new(MAXLAG);

    for chan in 0..accum.channels() {
        let ref_power_spectrum = &ref_state[chan].weighted_power_spectrum;
        let test_power_spectrum = &test_state[chan].weighted_power_spectrum;

        let mut d = [0.0; 2 * MAXLAG];
        for i in 0..2 * MAXLAG {
            let fref = ref_power_spectrum[i];
            let ftest = test_power_spectrum[i];
            d[i] = if fref == 0.0 && ftest == 0.0 {
                0.0
            } else {
                (ftest / fref).ln()
            };
        }

        let mut c = do_xcorr(&d);

        if subtract_dc_before_window {
            let dc = c.iter().sum::<f64>() / MAXLAG as f64;
            for v in c.iter_mut() {
                *v -= dc;
            }
        }

        let d0 = c[0];
        let mut dk = d0;
        for i in 0..MAXLAG {
            c[i] *= window[i] / (d0 * dk).sqrt();
            dk += d[i + MAXLAG] * d[i + MAXLAG] - d[i] * d[i];
        }

        let mut c_fft = vec![Complex::new(0.0, 0.0); correlation_fft.output_len()];
        correlation_fft.process(&mut c, &mut c_fft);
        c_fft[0] = Complex::new(0.0, 0.0);

        let mut ehs = 0.0f64;
        let mut s = c_fft[0].norm_sqr();
        for bin in &c_fft {
            let new_s = bin.norm_sqr();
            if new_s > s && new_s > ehs {
                ehs = new_s;
            }
            s = new_s;
        }

        accum.accumulate(chan, 1000.0 * ehs, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accum::Mode;

    fn state_with_spectrum(values: Vec<f64>) -> FftEarModelState {
        let mut state = FftEarModelState::new(1);
        state.weighted_power_spectrum = values;
        state.energy_threshold_reached = true;
        state
    }

    #[test]
    fn identical_spectra_yield_zero_ehs() {
        let spectrum = vec![1.0; 2 * MAXLAG];
        let ref_state = vec![state_with_spectrum(spectrum.clone())];
        let test_state = vec![state_with_spectrum(spectrum)];
        let mut accum = MovAccum::new(Mode::Avg, 1);
        accum.set_tentative(false);
        ehs(&[&ref_state[0]], &[&test_state[0]], false, true, &mut accum);
        assert!(accum.value().abs() < 1e-9);
    }

    #[test]
    fn below_energy_threshold_skips_accumulation() {
        let mut ref_state_single = state_with_spectrum(vec![1.0; 2 * MAXLAG]);
        ref_state_single.energy_threshold_reached = false;
        let mut test_state_single = state_with_spectrum(vec![2.0; 2 * MAXLAG]);
        test_state_single.energy_threshold_reached = false;
        let mut accum = MovAccum::new(Mode::Avg, 1);
        accum.set_tentative(false);
        ehs(&[&ref_state_single], &[&test_state_single], false, true, &mut accum);
        assert!(accum.value().is_nan());
    }
}
