//! Frame buffering and per-frame dispatch (§4.8): turns a caller's arbitrary-
//! length PCM chunks into fixed-size analysis windows, runs the full
//! per-channel pipeline on each window, and manages the silent-tail
//! tentative/commit and loudness-reached gating that decide when each MOV
//! starts contributing.

use std::collections::VecDeque;

use peaq_adapt::{LevelAdapter, LevelAdapterOutput, ModulationProcessor};
use peaq_fb_earmodel::{FilterbankEarModel, FRAME_SIZE as FB_FRAME_SIZE};
use peaq_fft::RealFft;
use peaq_fft_earmodel::{FftEarModel, FRAME_SIZE as FFT_FRAME_SIZE, STEP_SIZE as FFT_STEP_SIZE};
use peaq_movs::{
    bandwidth, ehs, lin_dist, modulation_difference, nmr, noise_loud_asym, noise_loudness, prob_detect,
};

use crate::channel_state::{AdvancedChannelState, BasicChannelState};
use crate::movset::{AdvancedMovSet, BasicMovSet};
use crate::toggles::Toggles;

/// A reference frame is "above threshold" iff a 5-sample sliding sum of
/// absolute sample values exceeds this anywhere in the frame.
const SILENCE_THRESHOLD: f64 = 200.0 / 32768.0;
/// Small floor the reference total loudness must exceed before the
/// loudness-reached frame index is latched. The standard only requires "a
/// small floor"; this value sits well below any audible program material's
/// total loudness and well above the numerical noise floor of silence.
const LOUDNESS_REACHED_FLOOR: f64 = 0.1;

const BASIC_NOISE_LOUDNESS_DELAY: u64 = 3;
const BASIC_MOD_DIFF_DELAY: u64 = 24;
const ADVANCED_NOISE_LOUDNESS_DELAY: u64 = 13;
const ADVANCED_MOD_DIFF_DELAY: u64 = 125;

fn above_threshold(frame: &[f32]) -> bool {
    if frame.len() < 5 {
        let sum: f64 = frame.iter().map(|&x| (x as f64).abs()).sum();
        return sum >= SILENCE_THRESHOLD;
    }
    let mut window_sum: f64 = frame[..5].iter().map(|&x| (x as f64).abs()).sum();
    if window_sum >= SILENCE_THRESHOLD {
        return true;
    }
    for i in 5..frame.len() {
        window_sum += (frame[i] as f64).abs() - (frame[i - 5] as f64).abs();
        if window_sum >= SILENCE_THRESHOLD {
            return true;
        }
    }
    false
}

fn push_interleaved(queues: &mut [VecDeque<f32>], samples: &[f32], channels: usize, frames: usize) {
    debug_assert_eq!(samples.len(), channels * frames);
    for frame in 0..frames {
        for (c, queue) in queues.iter_mut().enumerate() {
            queue.push_back(samples[frame * channels + c]);
        }
    }
}

fn take_frame(queue: &VecDeque<f32>, len: usize) -> Vec<f32> {
    queue.iter().take(len).copied().collect()
}

fn pad_to(queue: &mut VecDeque<f32>, len: usize) {
    while queue.len() < len {
        queue.push_back(0.0);
    }
}

/// Drives basic-mode analysis: a single FFT ear model (109 bands) per
/// channel, 50%-overlapped 2048-sample windows.
pub(crate) struct BasicOrchestrator {
    fft_model: FftEarModel,
    fft: RealFft,
    level_adapter: LevelAdapter,
    mod_proc: ModulationProcessor,
    channels: Vec<BasicChannelState>,
    ref_queues: Vec<VecDeque<f32>>,
    test_queues: Vec<VecDeque<f32>>,
    movs: BasicMovSet,
    frame_index: u64,
    loudness_reached_frame: Option<u64>,
    toggles: Toggles,
}

impl BasicOrchestrator {
    pub(crate) fn new(channel_count: usize, toggles: Toggles) -> Self {
        let fft_model = FftEarModel::new(109);
        let level_adapter = LevelAdapter::new(&fft_model.params().band_center_freq, FFT_STEP_SIZE as f64);
        let mod_proc = ModulationProcessor::new(&fft_model.params().band_center_freq, FFT_STEP_SIZE as f64);
        let channels = (0..channel_count)
            .map(|_| BasicChannelState::new(109, &level_adapter, &mod_proc))
            .collect();
        Self {
            fft: RealFft::new(FFT_FRAME_SIZE),
            fft_model,
            level_adapter,
            mod_proc,
            channels,
            ref_queues: (0..channel_count).map(|_| VecDeque::new()).collect(),
            test_queues: (0..channel_count).map(|_| VecDeque::new()).collect(),
            movs: BasicMovSet::new(channel_count),
            frame_index: 0,
            loudness_reached_frame: None,
            toggles,
        }
    }

    pub(crate) fn set_playback_level(&mut self, db: f64) {
        self.fft_model.set_playback_level(db);
    }

    pub(crate) fn process_block(&mut self, reference: &[f32], test: &[f32], channel_count: usize, frames: usize) {
        push_interleaved(&mut self.ref_queues, reference, channel_count, frames);
        push_interleaved(&mut self.test_queues, test, channel_count, frames);
        while self.ref_queues[0].len() >= FFT_FRAME_SIZE && self.test_queues[0].len() >= FFT_FRAME_SIZE {
            self.process_one_frame();
            for q in self.ref_queues.iter_mut().chain(self.test_queues.iter_mut()) {
                q.drain(..FFT_STEP_SIZE);
            }
        }
    }

    /// Zero-pads any residual partial frame and processes it once.
    pub(crate) fn flush(&mut self) {
        if self.ref_queues[0].is_empty() {
            return;
        }
        for q in self.ref_queues.iter_mut().chain(self.test_queues.iter_mut()) {
            pad_to(q, FFT_FRAME_SIZE);
        }
        self.process_one_frame();
    }

    fn process_one_frame(&mut self) {
        let channel_count = self.channels.len();

        let ref_frame_0 = take_frame(&self.ref_queues[0], FFT_FRAME_SIZE);
        let tentative = !above_threshold(&ref_frame_0);
        self.movs.set_tentative(tentative);

        let mut level_outputs: Vec<LevelAdapterOutput> = Vec::with_capacity(channel_count);
        for c in 0..channel_count {
            let ref_frame = take_frame(&self.ref_queues[c], FFT_FRAME_SIZE);
            let test_frame = take_frame(&self.test_queues[c], FFT_FRAME_SIZE);
            self.fft_model
                .process_block(&mut self.channels[c].fft_ref, &ref_frame, &mut self.fft);
            self.fft_model
                .process_block(&mut self.channels[c].fft_test, &test_frame, &mut self.fft);

            let chan = &mut self.channels[c];
            let output = self.level_adapter.process(
                &mut chan.level_adapter,
                &chan.fft_ref.excitation,
                &chan.fft_test.excitation,
            );
            self.mod_proc
                .process(&mut chan.mod_proc_ref, &chan.fft_ref.unsmeared_excitation);
            self.mod_proc
                .process(&mut chan.mod_proc_test, &chan.fft_test.unsmeared_excitation);
            level_outputs.push(output);
        }

        let ref_loudness = self
            .fft_model
            .calc_loudness(&self.channels[0].fft_ref.excitation);
        if self.loudness_reached_frame.is_none() && ref_loudness > LOUDNESS_REACHED_FLOOR {
            self.loudness_reached_frame = Some(self.frame_index);
        }
        let noise_loudness_active = self
            .loudness_reached_frame
            .is_some_and(|lr| self.frame_index > lr + BASIC_NOISE_LOUDNESS_DELAY);
        let mod_diff_active = self
            .loudness_reached_frame
            .is_some_and(|lr| self.frame_index > lr + BASIC_MOD_DIFF_DELAY);

        let ref_mod: Vec<&[f64]> = self.channels.iter().map(|c| c.mod_proc_ref.modulation()).collect();
        let test_mod: Vec<&[f64]> = self.channels.iter().map(|c| c.mod_proc_test.modulation()).collect();
        let ref_avg_loudness: Vec<&[f64]> = self
            .channels
            .iter()
            .map(|c| c.mod_proc_ref.average_loudness())
            .collect();
        let ref_excitation: Vec<&[f64]> = self.channels.iter().map(|c| c.fft_ref.excitation.as_slice()).collect();
        let test_excitation: Vec<&[f64]> = self.channels.iter().map(|c| c.fft_test.excitation.as_slice()).collect();
        let ref_power: Vec<&[f64]> = self.channels.iter().map(|c| c.fft_ref.power_spectrum.as_slice()).collect();
        let test_power: Vec<&[f64]> = self.channels.iter().map(|c| c.fft_test.power_spectrum.as_slice()).collect();
        let ref_weighted: Vec<&[f64]> = self
            .channels
            .iter()
            .map(|c| c.fft_ref.weighted_power_spectrum.as_slice())
            .collect();
        let test_weighted: Vec<&[f64]> = self
            .channels
            .iter()
            .map(|c| c.fft_test.weighted_power_spectrum.as_slice())
            .collect();
        let ref_adapted: Vec<&[f64]> = level_outputs
            .iter()
            .map(|o| o.spectrally_adapted_ref_patterns.as_slice())
            .collect();
        let test_adapted: Vec<&[f64]> = level_outputs
            .iter()
            .map(|o| o.spectrally_adapted_test_patterns.as_slice())
            .collect();
        let ref_states: Vec<&peaq_fft_earmodel::State> = self.channels.iter().map(|c| &c.fft_ref).collect();
        let test_states: Vec<&peaq_fft_earmodel::State> = self.channels.iter().map(|c| &c.fft_test).collect();

        bandwidth(&ref_power, &test_power, &mut self.movs.bandwidth_ref, &mut self.movs.bandwidth_test);

        nmr(
            &ref_excitation,
            &ref_weighted,
            &test_weighted,
            &self.fft_model.params().masking_difference,
            |spectrum| self.fft_model.params().group_into_bands(spectrum),
            &mut self.movs.total_nmr,
            Some(&mut self.movs.rel_dist_frames),
        );

        if mod_diff_active {
            modulation_difference(
                &ref_mod,
                &test_mod,
                &ref_avg_loudness,
                &self.fft_model.params().internal_noise,
                &mut self.movs.avg_mod_diff1,
                Some(&mut self.movs.avg_mod_diff2),
                Some(&mut self.movs.win_mod_diff1),
            );
        }

        if noise_loudness_active {
            noise_loudness(
                &ref_mod,
                &test_mod,
                &ref_adapted,
                &test_adapted,
                &self.fft_model.params().internal_noise,
                &mut self.movs.rms_noise_loud,
            );
        }

        prob_detect(
            &ref_excitation,
            &test_excitation,
            self.toggles.use_floor_for_steps_above_threshold,
            &mut self.movs.adb,
            &mut self.movs.mfpd,
        );

        ehs(
            &ref_states,
            &test_states,
            self.toggles.center_ehs_correlation_window,
            self.toggles.ehs_subtract_dc_before_window,
            &mut self.movs.ehs,
        );

        self.frame_index += 1;
    }

    pub(crate) fn movs(&self) -> &BasicMovSet {
        &self.movs
    }
}

/// Drives advanced-mode analysis: an FFT ear model (55 bands, used for
/// bandwidth, NMR, and EHS) running alongside a 40-band filterbank model
/// (used for level/pattern adaptation and modulation) per channel.
///
/// The two models consume the same incoming samples through independent
/// queues at their own native frame sizes (2048/1024 for the FFT model,
/// 192/192 for the filterbank model). MOV extraction and gating happen at
/// filterbank-frame granularity, the finer of the two, matching the
/// standard's delay counts ("13 filterbank frames", "125 filterbank
/// frames").
pub(crate) struct AdvancedOrchestrator {
    fft_model: FftEarModel,
    fft: RealFft,
    fb_model: FilterbankEarModel,
    level_adapter: LevelAdapter,
    mod_proc: ModulationProcessor,
    channels: Vec<AdvancedChannelState>,
    fft_ref_queues: Vec<VecDeque<f32>>,
    fft_test_queues: Vec<VecDeque<f32>>,
    fb_ref_queues: Vec<VecDeque<f32>>,
    fb_test_queues: Vec<VecDeque<f32>>,
    movs: AdvancedMovSet,
    fb_frame_index: u64,
    loudness_reached_frame: Option<u64>,
    toggles: Toggles,
}

impl AdvancedOrchestrator {
    pub(crate) fn new(channel_count: usize, toggles: Toggles) -> Self {
        let fft_model = FftEarModel::new(55);
        let fb_model = FilterbankEarModel::with_toggle(toggles.swap_slope_filter_coefficients);
        let level_adapter = LevelAdapter::new(&fb_model.params().band_center_freq, FB_FRAME_SIZE as f64);
        let mod_proc = ModulationProcessor::new(&fb_model.params().band_center_freq, FB_FRAME_SIZE as f64);
        let channels = (0..channel_count)
            .map(|_| AdvancedChannelState::new(55, &level_adapter, &mod_proc))
            .collect();
        Self {
            fft: RealFft::new(FFT_FRAME_SIZE),
            fft_model,
            fb_model,
            level_adapter,
            mod_proc,
            channels,
            fft_ref_queues: (0..channel_count).map(|_| VecDeque::new()).collect(),
            fft_test_queues: (0..channel_count).map(|_| VecDeque::new()).collect(),
            fb_ref_queues: (0..channel_count).map(|_| VecDeque::new()).collect(),
            fb_test_queues: (0..channel_count).map(|_| VecDeque::new()).collect(),
            movs: AdvancedMovSet::new(channel_count),
            fb_frame_index: 0,
            loudness_reached_frame: None,
            toggles,
        }
    }

    pub(crate) fn set_playback_level(&mut self, db: f64) {
        self.fft_model.set_playback_level(db);
        self.fb_model.set_playback_level(db);
    }

    pub(crate) fn process_block(&mut self, reference: &[f32], test: &[f32], channel_count: usize, frames: usize) {
        push_interleaved(&mut self.fft_ref_queues, reference, channel_count, frames);
        push_interleaved(&mut self.fft_test_queues, test, channel_count, frames);
        push_interleaved(&mut self.fb_ref_queues, reference, channel_count, frames);
        push_interleaved(&mut self.fb_test_queues, test, channel_count, frames);

        while self.fft_ref_queues[0].len() >= FFT_FRAME_SIZE {
            self.process_fft_frame();
            for q in self.fft_ref_queues.iter_mut().chain(self.fft_test_queues.iter_mut()) {
                q.drain(..FFT_STEP_SIZE);
            }
        }
        while self.fb_ref_queues[0].len() >= FB_FRAME_SIZE {
            self.process_fb_frame();
            for q in self.fb_ref_queues.iter_mut().chain(self.fb_test_queues.iter_mut()) {
                q.drain(..FB_FRAME_SIZE);
            }
        }
    }

    pub(crate) fn flush(&mut self) {
        if !self.fft_ref_queues[0].is_empty() {
            for q in self.fft_ref_queues.iter_mut().chain(self.fft_test_queues.iter_mut()) {
                pad_to(q, FFT_FRAME_SIZE);
            }
            self.process_fft_frame();
        }
        if !self.fb_ref_queues[0].is_empty() {
            for q in self.fb_ref_queues.iter_mut().chain(self.fb_test_queues.iter_mut()) {
                pad_to(q, FB_FRAME_SIZE);
            }
            self.process_fb_frame();
        }
    }

    fn process_fft_frame(&mut self) {
        for c in 0..self.channels.len() {
            let ref_frame = take_frame(&self.fft_ref_queues[c], FFT_FRAME_SIZE);
            let test_frame = take_frame(&self.fft_test_queues[c], FFT_FRAME_SIZE);
            self.fft_model
                .process_block(&mut self.channels[c].fft_ref, &ref_frame, &mut self.fft);
            self.fft_model
                .process_block(&mut self.channels[c].fft_test, &test_frame, &mut self.fft);
        }
    }

    fn process_fb_frame(&mut self) {
        let channel_count = self.channels.len();
        let ref_frame_0 = take_frame(&self.fb_ref_queues[0], FB_FRAME_SIZE);
        let tentative = !above_threshold(&ref_frame_0);
        self.movs.set_tentative(tentative);

        let mut level_outputs: Vec<LevelAdapterOutput> = Vec::with_capacity(channel_count);
        for c in 0..channel_count {
            let ref_frame = take_frame(&self.fb_ref_queues[c], FB_FRAME_SIZE);
            let test_frame = take_frame(&self.fb_test_queues[c], FB_FRAME_SIZE);
            self.fb_model
                .process_block(&mut self.channels[c].fb_ref, &ref_frame);
            self.fb_model
                .process_block(&mut self.channels[c].fb_test, &test_frame);

            let chan = &mut self.channels[c];
            let output = self.level_adapter.process(
                &mut chan.level_adapter,
                &chan.fb_ref.excitation,
                &chan.fb_test.excitation,
            );
            self.mod_proc
                .process(&mut chan.mod_proc_ref, &chan.fb_ref.unsmeared_excitation);
            self.mod_proc
                .process(&mut chan.mod_proc_test, &chan.fb_test.unsmeared_excitation);
            level_outputs.push(output);
        }

        let ref_loudness = self
            .fft_model
            .calc_loudness(&self.channels[0].fft_ref.excitation);
        if self.loudness_reached_frame.is_none() && ref_loudness > LOUDNESS_REACHED_FLOOR {
            self.loudness_reached_frame = Some(self.fb_frame_index);
        }
        let noise_loudness_active = self
            .loudness_reached_frame
            .is_some_and(|lr| self.fb_frame_index > lr + ADVANCED_NOISE_LOUDNESS_DELAY);
        let mod_diff_active = self
            .loudness_reached_frame
            .is_some_and(|lr| self.fb_frame_index > lr + ADVANCED_MOD_DIFF_DELAY);

        let ref_mod: Vec<&[f64]> = self.channels.iter().map(|c| c.mod_proc_ref.modulation()).collect();
        let test_mod: Vec<&[f64]> = self.channels.iter().map(|c| c.mod_proc_test.modulation()).collect();
        let ref_avg_loudness: Vec<&[f64]> = self
            .channels
            .iter()
            .map(|c| c.mod_proc_ref.average_loudness())
            .collect();
        let fb_ref_excitation: Vec<&[f64]> = self.channels.iter().map(|c| c.fb_ref.excitation.as_slice()).collect();
        let fb_test_excitation: Vec<&[f64]> = self.channels.iter().map(|c| c.fb_test.excitation.as_slice()).collect();
        let fft_ref_excitation: Vec<&[f64]> =
            self.channels.iter().map(|c| c.fft_ref.excitation.as_slice()).collect();
        let ref_weighted: Vec<&[f64]> = self
            .channels
            .iter()
            .map(|c| c.fft_ref.weighted_power_spectrum.as_slice())
            .collect();
        let test_weighted: Vec<&[f64]> = self
            .channels
            .iter()
            .map(|c| c.fft_test.weighted_power_spectrum.as_slice())
            .collect();
        let ref_adapted: Vec<&[f64]> = level_outputs
            .iter()
            .map(|o| o.spectrally_adapted_ref_patterns.as_slice())
            .collect();
        let test_adapted: Vec<&[f64]> = level_outputs
            .iter()
            .map(|o| o.spectrally_adapted_test_patterns.as_slice())
            .collect();
        let fft_ref_states: Vec<&peaq_fft_earmodel::State> = self.channels.iter().map(|c| &c.fft_ref).collect();
        let fft_test_states: Vec<&peaq_fft_earmodel::State> = self.channels.iter().map(|c| &c.fft_test).collect();

        nmr(
            &fft_ref_excitation,
            &ref_weighted,
            &test_weighted,
            &self.fft_model.params().masking_difference,
            |spectrum| self.fft_model.params().group_into_bands(spectrum),
            &mut self.movs.segmental_nmr,
            None,
        );

        if mod_diff_active {
            modulation_difference(
                &ref_mod,
                &test_mod,
                &ref_avg_loudness,
                &self.fb_model.params().internal_noise,
                &mut self.movs.rms_mod_diff,
                None,
                None,
            );
        }

        if noise_loudness_active {
            noise_loud_asym(
                &ref_mod,
                &test_mod,
                &fb_ref_excitation,
                &fb_test_excitation,
                &self.fb_model.params().internal_noise,
                self.toggles.swap_mod_patts_for_noise_loudness_movs,
                &mut self.movs.rms_noise_loud_asym,
            );
            lin_dist(
                &ref_mod,
                &test_mod,
                &ref_adapted,
                &fb_ref_excitation,
                &self.fb_model.params().internal_noise,
                &mut self.movs.avg_lin_dist,
            );
        }

        ehs(
            &fft_ref_states,
            &fft_test_states,
            self.toggles.center_ehs_correlation_window,
            self.toggles.ehs_subtract_dc_before_window,
            &mut self.movs.ehs,
        );

        self.fb_frame_index += 1;
    }

    pub(crate) fn movs(&self) -> &AdvancedMovSet {
        &self.movs
    }
}
