//! End-to-end scenarios, synthesizing reference/test signals in-process and
//! asserting the qualitative relationships a correct PEAQ implementation
//! must satisfy between them.

use peaq::Algo;

const SAMPLE_RATE: usize = 48_000;

fn sine(frames: usize, freq_hz: f32, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// A cheap deterministic pseudo-noise generator (LCG), used only to add a
/// small, reproducible perturbation, not for cryptographic or statistical
/// quality.
fn pseudo_noise(frames: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..frames)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let v = ((state >> 33) as i32 as f32) / (i32::MAX as f32);
            v * amplitude
        })
        .collect()
}

fn one_pole_lowpass(signal: &[f32], cutoff_hz: f32) -> Vec<f32> {
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / SAMPLE_RATE as f32;
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(signal.len());
    let mut prev = 0.0f32;
    for &x in signal {
        prev += alpha * (x - prev);
        out.push(prev);
    }
    out
}

fn run_odg(reference: &[f32], test: &[f32], advanced: bool) -> f64 {
    let mut algo = if advanced { Algo::new_advanced() } else { Algo::new_basic() };
    algo.process_block(reference, test, reference.len()).unwrap();
    algo.flush();
    algo.calculate_odg(false)
}

#[test]
fn identical_signals_score_near_perfect() {
    for advanced in [false, true] {
        let signal = sine(SAMPLE_RATE, 1000.0, 0.5);
        let odg = run_odg(&signal, &signal, advanced);
        assert!(odg >= -0.5, "advanced={advanced}: odg={odg}");
    }
}

#[test]
fn additive_noise_degrades_the_score() {
    for advanced in [false, true] {
        let reference = sine(SAMPLE_RATE, 1000.0, 0.5);
        let noisy: Vec<f32> = reference
            .iter()
            .zip(pseudo_noise(reference.len(), 0.005, 42))
            .map(|(&r, n)| r + n)
            .collect();

        let odg_identical = run_odg(&reference, &reference, advanced);
        let odg_noisy = run_odg(&reference, &noisy, advanced);
        assert!(
            odg_noisy <= odg_identical,
            "advanced={advanced}: noisy={odg_noisy} identical={odg_identical}"
        );
    }
}

#[test]
fn bandwidth_limited_test_scores_worse_than_identical() {
    for advanced in [false, true] {
        let reference = sine(SAMPLE_RATE, 6000.0, 0.5);
        let filtered = one_pole_lowpass(&reference, 4000.0);

        let odg_identical = run_odg(&reference, &reference, advanced);
        let odg_filtered = run_odg(&reference, &filtered, advanced);
        assert!(
            odg_filtered <= odg_identical,
            "advanced={advanced}: filtered={odg_filtered} identical={odg_identical}"
        );
    }
}

#[test]
fn level_amplified_test_stays_close_to_identical() {
    for advanced in [false, true] {
        let reference = sine(SAMPLE_RATE, 1000.0, 0.3);
        let amplified: Vec<f32> = reference.iter().map(|&x| x * 1.1).collect();

        let odg_identical = run_odg(&reference, &reference, advanced);
        let odg_amplified = run_odg(&reference, &amplified, advanced);
        // The level/pattern adapter compensates for overall gain changes, so
        // a modest amplification should not tank the score the way additive
        // noise or bandwidth loss does.
        assert!(
            odg_amplified > odg_identical - 1.0,
            "advanced={advanced}: amplified={odg_amplified} identical={odg_identical}"
        );
    }
}

#[test]
fn delayed_test_degrades_the_score() {
    for advanced in [false, true] {
        let reference = sine(10 * SAMPLE_RATE, 1000.0, 0.4);
        let mut delayed = vec![0.0f32; reference.len()];
        delayed[1..].copy_from_slice(&reference[..reference.len() - 1]);

        let odg_identical = run_odg(&reference, &reference, advanced);
        let odg_delayed = run_odg(&reference, &delayed, advanced);
        assert!(
            odg_delayed <= odg_identical,
            "advanced={advanced}: delayed={odg_delayed} identical={odg_identical}"
        );
    }
}

#[test]
fn trailing_silence_does_not_change_the_score() {
    for advanced in [false, true] {
        let tone = sine(2 * SAMPLE_RATE, 1000.0, 0.4);
        let silence = vec![0.0f32; 3 * SAMPLE_RATE];

        let mut with_tail_ref = tone.clone();
        with_tail_ref.extend_from_slice(&silence);
        let mut with_tail_test = tone.clone();
        with_tail_test.extend_from_slice(&silence);

        let odg_without_tail = run_odg(&tone, &tone, advanced);
        let odg_with_tail = run_odg(&with_tail_ref, &with_tail_test, advanced);

        assert!(
            (odg_without_tail - odg_with_tail).abs() < 1e-6,
            "advanced={advanced}: without_tail={odg_without_tail} with_tail={odg_with_tail}"
        );
    }
}

#[test]
fn zero_length_input_does_not_crash() {
    for advanced in [false, true] {
        let mut algo = if advanced { Algo::new_advanced() } else { Algo::new_basic() };
        algo.flush();
        let odg = algo.calculate_odg(false);
        assert!(odg.is_finite());
    }
}

#[test]
fn input_shorter_than_one_frame_pads_and_scores() {
    for advanced in [false, true] {
        let mut algo = if advanced { Algo::new_advanced() } else { Algo::new_basic() };
        let short = sine(100, 1000.0, 0.3);
        algo.process_block(&short, &short, 100).unwrap();
        algo.flush();
        let odg = algo.calculate_odg(false);
        assert!(odg.is_finite());
    }
}
