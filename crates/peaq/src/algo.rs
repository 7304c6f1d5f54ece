//! The external façade (§6): the only surface the rest of a program needs to
//! compute an Objective Difference Grade.

use tracing::info;

use crate::error::Error;
use crate::orchestrator::{AdvancedOrchestrator, BasicOrchestrator};
use crate::toggles::Toggles;

const MIN_PLAYBACK_LEVEL_DB: f64 = 0.0;
const MAX_PLAYBACK_LEVEL_DB: f64 = 130.0;
const DEFAULT_PLAYBACK_LEVEL_DB: f64 = 92.0;

enum Mode {
    Basic(BasicOrchestrator),
    Advanced(AdvancedOrchestrator),
}

/// The PEAQ analysis algorithm: either basic (11 MOVs, 109-band FFT ear
/// model) or advanced (5 MOVs, 55-band FFT model alongside a 40-band
/// filterbank model).
pub struct Algo {
    mode: Mode,
    channels: u32,
    toggles: Toggles,
}

impl Algo {
    /// Basic-mode analysis with a single channel and the default 92 dB
    /// playback level.
    pub fn new_basic() -> Self {
        Self::new_basic_with_toggles(Toggles::default())
    }

    pub fn new_basic_with_toggles(toggles: Toggles) -> Self {
        Self {
            mode: Mode::Basic(BasicOrchestrator::new(1, toggles)),
            channels: 1,
            toggles,
        }
    }

    /// Advanced-mode analysis with a single channel and the default 92 dB
    /// playback level.
    pub fn new_advanced() -> Self {
        Self::new_advanced_with_toggles(Toggles::default())
    }

    pub fn new_advanced_with_toggles(toggles: Toggles) -> Self {
        Self {
            mode: Mode::Advanced(AdvancedOrchestrator::new(1, toggles)),
            channels: 1,
            toggles,
        }
    }

    /// Reconfigures the channel count (1 or 2), discarding any buffered or
    /// accumulated state.
    pub fn set_channels(&mut self, channels: u32) -> Result<(), Error> {
        if channels == 0 {
            return Err(Error::InvalidChannelCount { channels });
        }
        self.channels = channels;
        self.mode = match &self.mode {
            Mode::Basic(_) => Mode::Basic(BasicOrchestrator::new(channels as usize, self.toggles)),
            Mode::Advanced(_) => Mode::Advanced(AdvancedOrchestrator::new(channels as usize, self.toggles)),
        };
        Ok(())
    }

    /// Sets the calibrated playback level in dB SPL corresponding to a
    /// full-scale sine wave. Valid range `0..=130`, default `92`.
    pub fn set_playback_level(&mut self, db: f64) -> Result<(), Error> {
        if !(MIN_PLAYBACK_LEVEL_DB..=MAX_PLAYBACK_LEVEL_DB).contains(&db) {
            return Err(Error::InvalidPlaybackLevel { db });
        }
        match &mut self.mode {
            Mode::Basic(o) => o.set_playback_level(db),
            Mode::Advanced(o) => o.set_playback_level(db),
        }
        Ok(())
    }

    /// Feeds `frames` interleaved samples per channel from `reference` and
    /// `test` through the pipeline, updating accumulated MOVs as whole
    /// analysis frames become available.
    pub fn process_block(&mut self, reference: &[f32], test: &[f32], frames: usize) -> Result<(), Error> {
        let channels = self.channels as usize;
        if reference.len() != channels * frames || test.len() != channels * frames {
            return Err(Error::ChannelCountMismatch {
                reference: reference.len() / frames.max(1),
                test: test.len() / frames.max(1),
            });
        }
        match &mut self.mode {
            Mode::Basic(o) => o.process_block(reference, test, channels, frames),
            Mode::Advanced(o) => o.process_block(reference, test, channels, frames),
        }
        Ok(())
    }

    /// Zero-pads and processes any residual partial frame still buffered.
    pub fn flush(&mut self) {
        match &mut self.mode {
            Mode::Basic(o) => o.flush(),
            Mode::Advanced(o) => o.flush(),
        }
    }

    /// Computes the distortion index from the MOVs accumulated so far.
    ///
    /// With `verbose`, logs the per-MOV breakdown feeding the network at
    /// `info` level, mirroring the diagnostic printout the reference
    /// implementation writes to its console.
    pub fn calculate_di(&self, verbose: bool) -> f64 {
        match &self.mode {
            Mode::Basic(o) => {
                let movs = o.movs().finish();
                if verbose {
                    info!(?movs, "basic-mode MOVs");
                }
                peaq_nn::calculate_di_basic(&movs, self.toggles.clamp_movs)
            }
            Mode::Advanced(o) => {
                let movs = o.movs().finish();
                if verbose {
                    info!(?movs, "advanced-mode MOVs");
                }
                peaq_nn::calculate_di_advanced(&movs, self.toggles.clamp_movs)
            }
        }
    }

    /// Computes the Objective Difference Grade, `-3.98 + 4.2 * sigmoid(DI)`.
    pub fn calculate_odg(&self, verbose: bool) -> f64 {
        let di = self.calculate_di(verbose);
        let odg = peaq_nn::calculate_odg(di);
        if verbose {
            info!(di, odg, "computed objective difference grade");
        }
        odg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_playback_level() {
        let mut algo = Algo::new_basic();
        assert!(algo.set_playback_level(-1.0).is_err());
        assert!(algo.set_playback_level(131.0).is_err());
        assert!(algo.set_playback_level(92.0).is_ok());
    }

    #[test]
    fn rejects_zero_channels() {
        let mut algo = Algo::new_basic();
        assert!(matches!(
            algo.set_channels(0),
            Err(Error::InvalidChannelCount { channels: 0 })
        ));
    }

    #[test]
    fn rejects_mismatched_block_lengths() {
        let mut algo = Algo::new_basic();
        let reference = vec![0.0f32; 10];
        let test = vec![0.0f32; 5];
        assert!(algo.process_block(&reference, &test, 10).is_err());
    }

    #[test]
    fn silence_yields_near_zero_odg() {
        let mut algo = Algo::new_basic();
        let reference = vec![0.0f32; 48_000];
        let test = vec![0.0f32; 48_000];
        algo.process_block(&reference, &test, 48_000).unwrap();
        algo.flush();
        let odg = algo.calculate_odg(false);
        assert!(odg.is_finite());
    }

    #[test]
    fn default_playback_level_matches_documented_default() {
        assert!((DEFAULT_PLAYBACK_LEVEL_DB - 92.0).abs() < f64::EPSILON);
    }
}
