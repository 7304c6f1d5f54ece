//! Benchmarks for the PEAQ analysis pipeline and its hottest per-frame
//! components.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use peaq::Algo;
use peaq_fb_earmodel::FilterbankEarModel;
use peaq_fft::RealFft;
use peaq_fft_earmodel::{FftEarModel, FRAME_SIZE};

fn sine_block(frames: usize, freq_hz: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| 0.25 * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / 48_000.0).sin())
        .collect()
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("algo");

    group.bench_function("basic_one_second", |b| {
        b.iter(|| {
            let mut algo = Algo::new_basic();
            let reference = sine_block(48_000, 1000.0);
            let test = sine_block(48_000, 1000.0);
            algo.process_block(black_box(&reference), black_box(&test), 48_000)
                .unwrap();
            algo.flush();
            black_box(algo.calculate_odg(false));
        });
    });

    group.bench_function("advanced_one_second", |b| {
        b.iter(|| {
            let mut algo = Algo::new_advanced();
            let reference = sine_block(48_000, 1000.0);
            let test = sine_block(48_000, 1000.0);
            algo.process_block(black_box(&reference), black_box(&test), 48_000)
                .unwrap();
            algo.flush();
            black_box(algo.calculate_odg(false));
        });
    });

    group.finish();
}

fn bench_fft_ear_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft_ear_model");
    let model = FftEarModel::new(109);
    let mut fft = RealFft::new(FRAME_SIZE);
    let frame = sine_block(FRAME_SIZE, 1000.0);
    let mut state = peaq_fft_earmodel::State::new(109);

    // Warm up the time-smoothed state.
    for _ in 0..10 {
        model.process_block(&mut state, &frame, &mut fft);
    }

    group.bench_function("process_block_109_bands", |b| {
        b.iter(|| {
            model.process_block(&mut state, black_box(&frame), &mut fft);
        });
    });

    group.finish();
}

fn bench_filterbank_ear_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("filterbank_ear_model");
    let model = FilterbankEarModel::new();
    let frame = sine_block(peaq_fb_earmodel::FRAME_SIZE, 1000.0);
    let mut state = peaq_fb_earmodel::State::new();

    for _ in 0..10 {
        model.process_block(&mut state, &frame);
    }

    group.bench_function("process_block_40_bands", |b| {
        b.iter(|| {
            model.process_block(&mut state, black_box(&frame));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_full_pipeline,
    bench_fft_ear_model,
    bench_filterbank_ear_model,
);
criterion_main!(benches);
