//! Assembles the full set of [`MovAccum`]s for one analysis mode and turns
//! their final values into the MOV vector the neural-network stage expects.

use peaq_movs::{Mode, MovAccum};
use peaq_nn::{AdvancedMovs, BasicMovs};

/// The eleven basic-mode accumulators (§4.7's MOV ordering).
pub(crate) struct BasicMovSet {
    pub(crate) bandwidth_ref: MovAccum,
    pub(crate) bandwidth_test: MovAccum,
    pub total_nmr: MovAccum,
    pub win_mod_diff1: MovAccum,
    pub adb: MovAccum,
    pub ehs: MovAccum,
    pub avg_mod_diff1: MovAccum,
    pub avg_mod_diff2: MovAccum,
    pub rms_noise_loud: MovAccum,
    pub mfpd: MovAccum,
    pub rel_dist_frames: MovAccum,
}

impl BasicMovSet {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            bandwidth_ref: MovAccum::new(Mode::Avg, channels),
            bandwidth_test: MovAccum::new(Mode::Avg, channels),
            total_nmr: MovAccum::new(Mode::AvgLog, channels),
            win_mod_diff1: MovAccum::new(Mode::AvgWindow, channels),
            adb: MovAccum::new(Mode::Adb, 1),
            ehs: MovAccum::new(Mode::Avg, channels),
            avg_mod_diff1: MovAccum::new(Mode::Avg, channels),
            avg_mod_diff2: MovAccum::new(Mode::Avg, channels),
            rms_noise_loud: MovAccum::new(Mode::Rms, channels),
            mfpd: MovAccum::new(Mode::FilteredMax, 1),
            rel_dist_frames: MovAccum::new(Mode::Avg, channels),
        }
    }

    /// Sets every accumulator's tentative status for the upcoming frame.
    pub(crate) fn set_tentative(&mut self, tentative: bool) {
        for acc in self.iter_mut() {
            acc.set_tentative(tentative);
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut MovAccum> {
        [
            &mut self.bandwidth_ref,
            &mut self.bandwidth_test,
            &mut self.total_nmr,
            &mut self.win_mod_diff1,
            &mut self.adb,
            &mut self.ehs,
            &mut self.avg_mod_diff1,
            &mut self.avg_mod_diff2,
            &mut self.rms_noise_loud,
            &mut self.mfpd,
            &mut self.rel_dist_frames,
        ]
        .into_iter()
    }

    /// Converts the accumulated values into the MOV vector the basic-mode
    /// distortion-index network expects.
    pub(crate) fn finish(&self) -> BasicMovs {
        BasicMovs {
            bandwidth_ref: self.bandwidth_ref.value(),
            bandwidth_test: self.bandwidth_test.value(),
            total_nmr: self.total_nmr.value(),
            win_mod_diff1: self.win_mod_diff1.value(),
            adb: self.adb.value(),
            ehs: self.ehs.value(),
            avg_mod_diff1: self.avg_mod_diff1.value(),
            avg_mod_diff2: self.avg_mod_diff2.value(),
            rms_noise_loud: self.rms_noise_loud.value(),
            mfpd: self.mfpd.value(),
            rel_dist_frames: self.rel_dist_frames.value(),
        }
    }
}

/// The five advanced-mode accumulators (§4.7's MOV ordering).
pub(crate) struct AdvancedMovSet {
    pub rms_mod_diff: MovAccum,
    pub rms_noise_loud_asym: MovAccum,
    pub segmental_nmr: MovAccum,
    pub ehs: MovAccum,
    pub avg_lin_dist: MovAccum,
}

impl AdvancedMovSet {
    pub(crate) fn new(channels: usize) -> Self {
        Self {
            rms_mod_diff: MovAccum::new(Mode::Rms, channels),
            rms_noise_loud_asym: MovAccum::new(Mode::RmsAsym, channels),
            segmental_nmr: MovAccum::new(Mode::AvgLog, channels),
            ehs: MovAccum::new(Mode::Avg, channels),
            avg_lin_dist: MovAccum::new(Mode::Avg, channels),
        }
    }

    pub(crate) fn set_tentative(&mut self, tentative: bool) {
        for acc in self.iter_mut() {
            acc.set_tentative(tentative);
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut MovAccum> {
        [
            &mut self.rms_mod_diff,
            &mut self.rms_noise_loud_asym,
            &mut self.segmental_nmr,
            &mut self.ehs,
            &mut self.avg_lin_dist,
        ]
        .into_iter()
    }

    pub(crate) fn finish(&self) -> AdvancedMovs {
        AdvancedMovs {
            rms_mod_diff: self.rms_mod_diff.value(),
            rms_noise_loud_asym: self.rms_noise_loud_asym.value(),
            segmental_nmr: self.segmental_nmr.value(),
            ehs: self.ehs.value(),
            avg_lin_dist: self.avg_lin_dist.value(),
        }
    }
}
