//! Model output variable accumulation (ITU-R BS.1387-1 §4): combines
//! per-frame, per-channel values into a single scalar MOV, with support for
//! discarding a trailing "tentative" run of frames (the silent tail of a
//! clip) by snapshotting and restoring accumulator state.
//!
//! Ported from `movaccum.c`.

#[derive(Debug, Clone, Copy, Default)]
struct Fraction {
    num: f64,
    den: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct TwinFraction {
    num1: f64,
    num2: f64,
    den: f64,
}

#[derive(Debug, Clone, Copy)]
struct WinAvgData {
    frac: Fraction,
    past_sqrts: [f64; 3],
}

impl Default for WinAvgData {
    fn default() -> Self {
        Self {
            frac: Fraction::default(),
            past_sqrts: [f64::NAN; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FiltMaxData {
    max: f64,
    filt_state: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Init,
    Normal,
    Tentative,
}

#[derive(Debug)]
enum Data {
    Avg(Vec<Fraction>),
    AvgLog(Vec<Fraction>),
    Rms(Vec<Fraction>),
    RmsAsym(Vec<TwinFraction>),
    AvgWindow(Vec<WinAvgData>),
    FilteredMax(Vec<FiltMaxData>),
    Adb(Vec<Fraction>),
}

/// A reducer for a per-frame, per-channel value into a single model output
/// variable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Avg,
    AvgLog,
    Rms,
    RmsAsym,
    AvgWindow,
    FilteredMax,
    Adb,
}

impl Data {
    fn new(mode: Mode, channels: usize) -> Self {
        match mode {
            Mode::Avg => Data::Avg(vec![Fraction::default(); channels]),
            Mode::AvgLog => Data::AvgLog(vec![Fraction::default(); channels]),
            Mode::Rms => Data::Rms(vec![Fraction::default(); channels]),
            Mode::RmsAsym => Data::RmsAsym(vec![TwinFraction::default(); channels]),
            Mode::AvgWindow => Data::AvgWindow(vec![WinAvgData::default(); channels]),
            Mode::FilteredMax => Data::FilteredMax(vec![FiltMaxData::default(); channels]),
            Mode::Adb => Data::Adb(vec![Fraction::default(); channels]),
        }
    }
}

/// Accumulates one model output variable across frames and channels.
#[derive(Debug)]
pub struct MovAccum {
    mode: Mode,
    channels: usize,
    status: Status,
    data: Data,
    saved: Data,
}

impl MovAccum {
    pub fn new(mode: Mode, channels: usize) -> Self {
        Self {
            mode,
            channels,
            status: Status::Init,
            data: Data::new(mode, channels),
            saved: Data::new(mode, channels),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Marks the current frame as belonging (or not) to a trailing silent
    /// run. On the transition into a tentative run, snapshots the current
    /// accumulator contents so they can be restored if the run never ends
    /// (i.e. the clip really did trail off into silence).
    pub fn set_tentative(&mut self, tentative: bool) {
        if tentative {
            if self.status == Status::Normal {
                self.saved = match &self.data {
                    Data::Avg(v) => Data::Avg(v.clone()),
                    Data::AvgLog(v) => Data::AvgLog(v.clone()),
                    Data::Rms(v) => Data::Rms(v.clone()),
                    Data::RmsAsym(v) => Data::RmsAsym(v.clone()),
                    Data::AvgWindow(v) => Data::AvgWindow(v.clone()),
                    Data::FilteredMax(v) => Data::FilteredMax(v.clone()),
                    Data::Adb(v) => Data::Adb(v.clone()),
                };
                self.status = Status::Tentative;
            }
        } else {
            self.status = Status::Normal;
        }
    }

    pub fn accumulate(&mut self, channel: usize, val: f64, weight: f64) {
        if self.status == Status::Init {
            return;
        }
        match &mut self.data {
            Data::Rms(v) => {
                let w = weight * weight;
                v[channel].num += w * val * val;
                v[channel].den += w;
            }
            Data::RmsAsym(v) => {
                // `weight` doubles as the second accumulated input.
                v[channel].num1 += val * val;
                v[channel].num2 += weight * weight;
                v[channel].den += 1.0;
            }
            Data::Avg(v) | Data::AvgLog(v) | Data::Adb(v) => {
                v[channel].num += weight * val;
                v[channel].den += weight;
            }
            Data::AvgWindow(v) => {
                let val_sqrt = val.sqrt();
                let past = v[channel].past_sqrts;
                if !past[0].is_nan() {
                    let mut winsum = val_sqrt + past[0] + past[1] + past[2];
                    winsum /= 4.0;
                    winsum *= winsum;
                    winsum *= winsum;
                    v[channel].frac.num += winsum;
                    v[channel].frac.den += 1.0;
                }
                v[channel].past_sqrts[0] = past[1];
                v[channel].past_sqrts[1] = past[2];
                v[channel].past_sqrts[2] = val_sqrt;
            }
            Data::FilteredMax(v) => {
                let d = &mut v[channel];
                d.filt_state = 0.9 * d.filt_state + 0.1 * val;
                if d.filt_state > d.max {
                    d.max = d.filt_state;
                }
            }
        }
    }

    pub fn value(&self) -> f64 {
        let data = if self.status == Status::Tentative {
            &self.saved
        } else {
            &self.data
        };
        let mut value = 0.0;
        match data {
            Data::Avg(v) => {
                for f in v {
                    value += f.num / f.den;
                }
            }
            Data::AvgLog(v) => {
                for f in v {
                    value += 10.0 * (f.num / f.den).log10();
                }
            }
            Data::Rms(v) => {
                for f in v {
                    value += (f.num / f.den).sqrt();
                }
            }
            Data::AvgWindow(v) => {
                for w in v {
                    value += (w.frac.num / w.frac.den).sqrt();
                }
            }
            Data::RmsAsym(v) => {
                for f in v {
                    value += (f.num1 / f.den).sqrt() + 0.5 * (f.num2 / f.den).sqrt();
                }
            }
            Data::FilteredMax(v) => {
                for f in v {
                    value += f.max;
                }
            }
            Data::Adb(v) => {
                for f in v {
                    if f.den > 0.0 {
                        value += if f.num == 0.0 { -0.5 } else { (f.num / f.den).log10() };
                    }
                }
            }
        }
        value / self.channels as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_accumulates_weighted_mean() {
        let mut acc = MovAccum::new(Mode::Avg, 1);
        acc.set_tentative(false);
        acc.accumulate(0, 2.0, 1.0);
        acc.accumulate(0, 4.0, 1.0);
        assert!((acc.value() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn tentative_run_that_never_commits_is_discarded() {
        let mut acc = MovAccum::new(Mode::Avg, 1);
        acc.set_tentative(false);
        acc.accumulate(0, 2.0, 1.0);
        let committed = acc.value();
        acc.set_tentative(true);
        acc.accumulate(0, 100.0, 1.0);
        assert!((acc.value() - committed).abs() < 1e-12);
    }

    #[test]
    fn tentative_run_that_commits_keeps_new_data() {
        let mut acc = MovAccum::new(Mode::Avg, 1);
        acc.set_tentative(false);
        acc.accumulate(0, 2.0, 1.0);
        acc.set_tentative(true);
        acc.accumulate(0, 4.0, 1.0);
        acc.set_tentative(false);
        assert!((acc.value() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn adb_with_zero_numerator_reports_negative_half() {
        let mut acc = MovAccum::new(Mode::Adb, 1);
        acc.set_tentative(false);
        acc.accumulate(0, 0.0, 1.0);
        assert!((acc.value() - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn filtered_max_tracks_running_maximum() {
        let mut acc = MovAccum::new(Mode::FilteredMax, 1);
        acc.set_tentative(false);
        for _ in 0..50 {
            acc.accumulate(0, 1.0, 1.0);
        }
        acc.accumulate(0, 0.0, 1.0);
        assert!(acc.value() > 0.9);
    }
}
