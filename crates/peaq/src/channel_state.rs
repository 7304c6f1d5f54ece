//! Per-channel mutable state bundles: one ear-model state pair, one
//! level-adapter state, and two modulation-processor states (reference and
//! test) per channel, for each of the two analysis modes.

use peaq_adapt::{level_adapter, modulation_processor};
use peaq_fb_earmodel::State as FbState;
use peaq_fft_earmodel::State as FftState;

/// One channel's state for basic-mode analysis (FFT ear model only).
pub(crate) struct BasicChannelState {
    pub fft_ref: FftState,
    pub fft_test: FftState,
    pub level_adapter: level_adapter::State,
    pub mod_proc_ref: modulation_processor::State,
    pub mod_proc_test: modulation_processor::State,
}

impl BasicChannelState {
    pub(crate) fn new(
        fft_band_count: usize,
        level_adapter: &peaq_adapt::LevelAdapter,
        mod_proc: &peaq_adapt::ModulationProcessor,
    ) -> Self {
        Self {
            fft_ref: FftState::new(fft_band_count),
            fft_test: FftState::new(fft_band_count),
            level_adapter: level_adapter.new_state(),
            mod_proc_ref: mod_proc.new_state(),
            mod_proc_test: mod_proc.new_state(),
        }
    }
}

/// One channel's state for advanced-mode analysis (FFT ear model at 55
/// bands, run alongside the 40-band filterbank model; the level adapter and
/// modulation processor operate on the filterbank's excitations).
pub(crate) struct AdvancedChannelState {
    pub fft_ref: FftState,
    pub fft_test: FftState,
    pub fb_ref: FbState,
    pub fb_test: FbState,
    pub level_adapter: level_adapter::State,
    pub mod_proc_ref: modulation_processor::State,
    pub mod_proc_test: modulation_processor::State,
}

impl AdvancedChannelState {
    pub(crate) fn new(
        fft_band_count: usize,
        level_adapter: &peaq_adapt::LevelAdapter,
        mod_proc: &peaq_adapt::ModulationProcessor,
    ) -> Self {
        Self {
            fft_ref: FftState::new(fft_band_count),
            fft_test: FftState::new(fft_band_count),
            fb_ref: FbState::new(),
            fb_test: FbState::new(),
            level_adapter: level_adapter.new_state(),
            mod_proc_ref: mod_proc.new_state(),
            mod_proc_test: mod_proc.new_state(),
        }
    }
}
