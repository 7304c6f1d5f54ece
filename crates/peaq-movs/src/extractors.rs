//! Model output variable extractors (ITU-R BS.1387-1 §4): turn per-frame
//! excitation, modulation, and power-spectrum data into the scalar values
//! fed to [`crate::accum::MovAccum`].
//!
//! Ported from `movs.c`.

use crate::accum::{Mode, MovAccum};

/// Modulation difference MOVs (§4.2): `AvgModDiff1`/`RmsModDiff`,
/// `AvgModDiff2` (basic mode only), and `WinModDiff1` (basic mode only).
///
/// `accum2` and `accum_win` are `None` in advanced mode, where only a single
/// RMS-accumulated modulation difference MOV is computed.
#[allow(clippy::too_many_arguments)]
pub fn modulation_difference(
    ref_modulation: &[&[f64]],
    test_modulation: &[&[f64]],
    ref_avg_loudness: &[&[f64]],
    internal_noise: &[f64],
    accum1: &mut MovAccum,
    mut accum2: Option<&mut MovAccum>,
    mut accum_win: Option<&mut MovAccum>,
) {
    let band_count = internal_noise.len();
    let lev_wt = if accum2.is_some() { 100.0 } else { 1.0 };
    // `RmsModDiffA` (advanced mode) is the only RMS-accumulated modulation
    // difference MOV; it normalizes by the band count's square root instead
    // of the band count itself.
    let mod_diff_1_scale = if accum1.mode() == Mode::Rms {
        100.0 / (band_count as f64).sqrt()
    } else {
        100.0 / band_count as f64
    };

    for c in 0..accum1.channels() {
        let mod_ref = ref_modulation[c];
        let mod_test = test_modulation[c];
        let avg_loudness_ref = ref_avg_loudness[c];

        let mut mod_diff_1b = 0.0;
        let mut mod_diff_2b = 0.0;
        let mut temp_wt = 0.0;
        for i in 0..band_count {
            let diff = (mod_ref[i] - mod_test[i]).abs();
            mod_diff_1b += diff / (1.0 + mod_ref[i]);
            let w = if mod_test[i] >= mod_ref[i] { 1.0 } else { 0.1 };
            mod_diff_2b += w * diff / (0.01 + mod_ref[i]);
            temp_wt += avg_loudness_ref[i]
                / (avg_loudness_ref[i] + lev_wt * internal_noise[i].powf(0.3));
        }
        mod_diff_1b *= mod_diff_1_scale;
        mod_diff_2b *= 100.0 / band_count as f64;

        accum1.accumulate(c, mod_diff_1b, temp_wt);
        if let Some(accum2) = accum2.as_deref_mut() {
            accum2.accumulate(c, mod_diff_2b, temp_wt);
        }
        if let Some(accum_win) = accum_win.as_deref_mut() {
            accum_win.accumulate(c, mod_diff_1b, 1.0);
        }
    }
}

/// Per-band noise loudness (§4.5/§4.6/§4.7), shared by `RmsNoiseLoudB`,
/// `RmsNoiseLoudAsymA`, and `AvgLinDistA`.
#[allow(clippy::too_many_arguments)]
fn calc_noise_loudness(
    alpha: f64,
    thres_fac: f64,
    s0: f64,
    nl_min: f64,
    mod_ref: &[f64],
    mod_test: &[f64],
    exc_ref: &[f64],
    exc_test: &[f64],
    internal_noise: &[f64],
) -> f64 {
    let band_count = internal_noise.len();
    let mut noise_loudness = 0.0;
    for i in 0..band_count {
        let sref = thres_fac * mod_ref[i] + s0;
        let stest = thres_fac * mod_test[i] + s0;
        let ethres = internal_noise[i];
        let ep_ref = exc_ref[i];
        let ep_test = exc_test[i];
        let beta = (-alpha * (ep_test - ep_ref) / ep_ref).exp();
        noise_loudness += (1.0 / stest * ethres).powf(0.23)
            * ((1.0
                + (stest * ep_test - sref * ep_ref).max(0.0) / (ethres + sref * ep_ref * beta))
                .powf(0.23)
                - 1.0);
    }
    noise_loudness *= 24.0 / band_count as f64;
    if noise_loudness < nl_min {
        noise_loudness = 0.0;
    }
    noise_loudness
}

/// `RmsNoiseLoudB`: basic-mode noise loudness MOV.
pub fn noise_loudness(
    ref_modulation: &[&[f64]],
    test_modulation: &[&[f64]],
    ref_excitation: &[&[f64]],
    test_excitation: &[&[f64]],
    internal_noise: &[f64],
    accum: &mut MovAccum,
) {
    for c in 0..accum.channels() {
        let nl = calc_noise_loudness(
            1.5,
            0.15,
            0.5,
            0.0,
            ref_modulation[c],
            test_modulation[c],
            ref_excitation[c],
            test_excitation[c],
            internal_noise,
        );
        accum.accumulate(c, nl, 1.0);
    }
}

/// `RmsNoiseLoudAsymA`: advanced-mode asymmetric noise loudness MOV.
///
/// `swap_mod_patts` is the `SWAP_MOD_PATTS_FOR_NOISE_LOUDNESS_MOVS` toggle
/// (§9): when set, the "missing components" term also swaps the reference
/// and test modulation patterns to match the swapped excitations, rather
/// than swapping only the excitations.
pub fn noise_loud_asym(
    ref_modulation: &[&[f64]],
    test_modulation: &[&[f64]],
    ref_excitation: &[&[f64]],
    test_excitation: &[&[f64]],
    internal_noise: &[f64],
    swap_mod_patts: bool,
    accum: &mut MovAccum,
) {
    for c in 0..accum.channels() {
        let noise_loudness = calc_noise_loudness(
            2.5,
            0.3,
            1.0,
            0.1,
            ref_modulation[c],
            test_modulation[c],
            ref_excitation[c],
            test_excitation[c],
            internal_noise,
        );
        let (mc_mod_ref, mc_mod_test) = if swap_mod_patts {
            (test_modulation[c], ref_modulation[c])
        } else {
            (ref_modulation[c], test_modulation[c])
        };
        let missing_components = calc_noise_loudness(
            1.5,
            0.15,
            1.0,
            0.0,
            mc_mod_ref,
            mc_mod_test,
            test_excitation[c],
            ref_excitation[c],
            internal_noise,
        );
        accum.accumulate(c, noise_loudness, missing_components);
    }
}

/// `AvgLinDistA`: advanced-mode linear distortion MOV, comparing the
/// reference's level/pattern-adapted excitation against its raw (unadapted)
/// excitation from the ear model.
pub fn lin_dist(
    ref_modulation: &[&[f64]],
    test_modulation: &[&[f64]],
    ref_adapted_excitation: &[&[f64]],
    ref_raw_excitation: &[&[f64]],
    internal_noise: &[f64],
    accum: &mut MovAccum,
) {
    for c in 0..accum.channels() {
        let nl = calc_noise_loudness(
            1.5,
            0.15,
            1.0,
            0.0,
            ref_modulation[c],
            test_modulation[c],
            ref_adapted_excitation[c],
            ref_raw_excitation[c],
            internal_noise,
        );
        accum.accumulate(c, nl, 1.0);
    }
}

const FIVE_DB_POWER_FACTOR: f64 = 3.16227766016838;

/// `BandwidthRefB`/`BandwidthTestB` (§4.4): highest FFT bin still 10/5 dB
/// above a noise floor estimated from the top of the test spectrum.
pub fn bandwidth(
    ref_power_spectrum: &[&[f64]],
    test_power_spectrum: &[&[f64]],
    accum_ref: &mut MovAccum,
    accum_test: &mut MovAccum,
) {
    for c in 0..accum_ref.channels() {
        let ref_spectrum = ref_power_spectrum[c];
        let test_spectrum = test_power_spectrum[c];

        let mut zero_threshold = test_spectrum[921];
        for &v in &test_spectrum[922..1024] {
            if v >= zero_threshold {
                zero_threshold = v;
            }
        }

        let mut bw_ref = 0;
        for i in (1..=921).rev() {
            if ref_spectrum[i - 1] > 10.0 * zero_threshold {
                bw_ref = i;
                break;
            }
        }

        if bw_ref > 346 {
            let mut bw_test = 0;
            for i in (1..=bw_ref).rev() {
                if test_spectrum[i - 1] >= FIVE_DB_POWER_FACTOR * zero_threshold {
                    bw_test = i;
                    break;
                }
            }
            accum_ref.accumulate(c, bw_ref as f64, 1.0);
            accum_test.accumulate(c, bw_test as f64, 1.0);
        }
    }
}

/// `TotalNMRB`/`SegmentalNMRB` and `RelDistFramesB` (§4.6): noise-to-mask
/// ratio, summed across bands and converted to dB.
pub fn nmr(
    ref_excitation: &[&[f64]],
    ref_weighted_power_spectrum: &[&[f64]],
    test_weighted_power_spectrum: &[&[f64]],
    masking_difference: &[f64],
    group_into_bands: impl Fn(&[f64]) -> Vec<f64>,
    accum_nmr: &mut MovAccum,
    mut accum_rel_dist_frames: Option<&mut MovAccum>,
) {
    let band_count = masking_difference.len();

    for c in 0..accum_nmr.channels() {
        let ref_exc = ref_excitation[c];
        let ref_wps = ref_weighted_power_spectrum[c];
        let test_wps = test_weighted_power_spectrum[c];

        let noise_spectrum: Vec<f64> = ref_wps
            .iter()
            .zip(test_wps)
            .map(|(&r, &t)| r - 2.0 * (r * t).sqrt() + t)
            .collect();
        let noise_in_bands = group_into_bands(&noise_spectrum);

        let mut nmr = 0.0;
        let mut nmr_max = 0.0f64;
        for i in 0..band_count {
            let mask = ref_exc[i] / masking_difference[i];
            let curr_nmr = noise_in_bands[i] / mask;
            nmr += curr_nmr;
            nmr_max = nmr_max.max(curr_nmr);
        }
        nmr /= band_count as f64;

        // An avg-log accumulator takes the log of the averaged linear ratio
        // on retrieval, so it must receive the linear `nmr`; any other mode
        // expects the value already converted to dB.
        let nmr_value = if accum_nmr.mode() == Mode::AvgLog {
            nmr
        } else {
            10.0 * nmr.log10()
        };
        accum_nmr.accumulate(c, nmr_value, 1.0);
        if let Some(accum) = accum_rel_dist_frames.as_deref_mut() {
            accum.accumulate(c, if nmr_max > 1.41253754462275 { 1.0 } else { 0.0 }, 1.0);
        }
    }
}

/// `ADBB`/`MFPDB` (§4.7): binaural masked-threshold detection probability
/// and count of detection-threshold steps.
///
/// `use_floor` is the `USE_FLOOR_FOR_STEPS_ABOVE_THRESHOLD` toggle (§9):
/// when set, the per-band step count truncates towards negative infinity
/// instead of towards zero.
pub fn prob_detect(
    ref_excitation: &[&[f64]],
    test_excitation: &[&[f64]],
    use_floor: bool,
    accum_adb: &mut MovAccum,
    accum_mfpd: &mut MovAccum,
) {
    let channels = ref_excitation.len();
    let band_count = ref_excitation[0].len();

    let mut binaural_detection_probability = 1.0;
    let mut binaural_detection_steps = 0.0;
    for i in 0..band_count {
        let mut detection_probability = 0.0f64;
        let mut detection_steps = 0.0;
        for c in 0..channels {
            let eref_db = 10.0 * ref_excitation[c][i].log10();
            let etest_db = 10.0 * test_excitation[c][i].log10();
            let l = 0.3 * eref_db.max(etest_db) + 0.7 * etest_db;
            let s = if l > 0.0 {
                5.95072 * (6.39468 / l).powf(1.71332) + 9.01033e-11 * l.powi(4)
                    + 5.05622e-6 * l.powi(3)
                    - 0.00102438 * l * l
                    + 0.0550197 * l
                    - 0.198719
            } else {
                1e30
            };
            let e = eref_db - etest_db;
            let b = if eref_db > etest_db { 4.0 } else { 6.0 };
            let pc = 1.0 - 0.5f64.powf((e / s).powf(b));
            let e_steps = if use_floor { e.floor() } else { e.trunc() };
            let qc = e_steps.abs() / s;
            if pc > detection_probability {
                detection_probability = pc;
            }
            if c == 0 || qc > detection_steps {
                detection_steps = qc;
            }
        }
        binaural_detection_probability *= 1.0 - detection_probability;
        binaural_detection_steps += detection_steps;
    }
    binaural_detection_probability = 1.0 - binaural_detection_probability;

    if binaural_detection_probability > 0.5 {
        accum_adb.accumulate(0, binaural_detection_steps, 1.0);
    }
    accum_mfpd.accumulate(0, binaural_detection_probability, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_modulation_yields_zero_difference() {
        let modulation = vec![0.2, 0.4, 0.1];
        let avg_loudness = vec![1.0, 2.0, 1.5];
        let internal_noise = vec![0.01, 0.02, 0.01];
        let mut accum1 = MovAccum::new(Mode::Avg, 1);
        accum1.set_tentative(false);
        modulation_difference(
            &[&modulation],
            &[&modulation],
            &[&avg_loudness],
            &internal_noise,
            &mut accum1,
            None,
            None,
        );
        assert!(accum1.value().abs() < 1e-12);
    }

    #[test]
    fn rms_mode_scales_by_sqrt_band_count() {
        let ref_mod = vec![0.0, 0.0];
        let test_mod = vec![1.0, 1.0];
        let avg_loudness = vec![1.0, 1.0];
        let internal_noise = vec![0.01, 0.01];

        let mut rms_accum = MovAccum::new(Mode::Rms, 1);
        rms_accum.set_tentative(false);
        modulation_difference(
            &[&ref_mod],
            &[&test_mod],
            &[&avg_loudness],
            &internal_noise,
            &mut rms_accum,
            None,
            None,
        );

        let mut avg_accum = MovAccum::new(Mode::Avg, 1);
        avg_accum.set_tentative(false);
        modulation_difference(
            &[&ref_mod],
            &[&test_mod],
            &[&avg_loudness],
            &internal_noise,
            &mut avg_accum,
            None,
            None,
        );

        // Same weight (temp_wt) in both calls, so the ratio of accumulated
        // values equals the ratio of the two scale factors: sqrt(2).
        assert!((rms_accum.value() / avg_accum.value() - (2.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn bandwidth_skips_narrowband_reference() {
        let ref_spectrum = vec![1e-6; 1025];
        let test_spectrum = vec![1e-6; 1025];
        let mut accum_ref = MovAccum::new(Mode::Avg, 1);
        let mut accum_test = MovAccum::new(Mode::Avg, 1);
        accum_ref.set_tentative(false);
        accum_test.set_tentative(false);
        bandwidth(
            &[&ref_spectrum],
            &[&test_spectrum],
            &mut accum_ref,
            &mut accum_test,
        );
        // No band exceeds the 10x-zero-threshold criterion, so nothing
        // should have been accumulated; `value()` divides 0/0.
        assert!(accum_ref.value().is_nan());
    }

    #[test]
    fn bandwidth_detects_wideband_reference_and_narrower_test() {
        let mut ref_spectrum = vec![1e-9; 1025];
        let mut test_spectrum = vec![1e-9; 1025];
        for k in 0..900 {
            ref_spectrum[k] = 1.0;
            test_spectrum[k] = 1.0;
        }
        for k in 900..1025 {
            ref_spectrum[k] = 1e-9;
            test_spectrum[k] = 1e-9;
        }
        let mut accum_ref = MovAccum::new(Mode::Avg, 1);
        let mut accum_test = MovAccum::new(Mode::Avg, 1);
        accum_ref.set_tentative(false);
        accum_test.set_tentative(false);
        bandwidth(
            &[&ref_spectrum],
            &[&test_spectrum],
            &mut accum_ref,
            &mut accum_test,
        );
        assert!((accum_ref.value() - 900.0).abs() < 1.0);
    }

    #[test]
    fn nmr_of_identical_spectra_is_very_negative() {
        let excitation = vec![1.0; 10];
        let weighted = vec![0.5; 10];
        let masking_difference = vec![2.0; 10];
        let mut accum = MovAccum::new(Mode::AvgLog, 1);
        accum.set_tentative(false);
        nmr(
            &[&excitation],
            &[&weighted],
            &[&weighted],
            &masking_difference,
            |spectrum| spectrum.to_vec(),
            &mut accum,
            None,
        );
        // Identical ref/test power spectra produce zero noise power, so the
        // NMR in dB should be a very large negative number (log of ~0).
        assert!(accum.value() < -100.0);
    }

    #[test]
    fn prob_detect_is_zero_for_identical_excitations() {
        let excitation = vec![1.0; 10];
        let mut accum_adb = MovAccum::new(Mode::Adb, 1);
        let mut accum_mfpd = MovAccum::new(Mode::FilteredMax, 1);
        accum_adb.set_tentative(false);
        accum_mfpd.set_tentative(false);
        prob_detect(
            &[&excitation],
            &[&excitation],
            false,
            &mut accum_adb,
            &mut accum_mfpd,
        );
        assert!(accum_mfpd.value().abs() < 1e-9);
    }
}
