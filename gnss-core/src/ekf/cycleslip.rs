//! Cycle-slip detection: LLI flags plus geometry-free (GF) and
//! Melbourne-Wubbena (MW) combination jumps, and the half-cycle ambiguity
//! bookkeeping a slip invalidates.
//!
//! Per-satellite tracking state lives in a flat arena indexed by a small
//! integer handed out on first sight of a satellite, rather than a linked
//! list of per-epoch records: lookups are `O(1)` and there is nothing to
//! walk or leak when a satellite sets.
use crate::constants::{GAP_RESION, THRESHOLD_SLIP_GF, THRESHOLD_SLIP_MW};
use crate::observation::Lli;
use gnss::prelude::SV;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct Track {
    last_gf: Option<f64>,
    last_epoch_index: Option<u64>,
    mw_mean: f64,
    mw_count: u32,
    half_cycle_known: bool,
}

/// Arena of per-satellite cycle-slip tracking state.
#[derive(Debug, Clone, Default)]
pub struct CycleSlipArena {
    slots: Vec<Track>,
    index_of: HashMap<SV, usize>,
    epoch_counter: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipCause {
    Lli,
    GeometryFree,
    MelbourneWubbena,
    EpochGap,
}

impl CycleSlipArena {
    fn slot(&mut self, sv: SV) -> usize {
        *self.index_of.entry(sv).or_insert_with(|| {
            self.slots.push(Track::default());
            self.slots.len() - 1
        })
    }

    pub fn advance_epoch(&mut self) {
        self.epoch_counter += 1;
    }

    /// Evaluates the LLI flag and, when two carrier observations are
    /// available, the GF combination jump against the previous epoch's
    /// value. Returns every cause detected this call (several can fire
    /// together); an empty vec means "no slip".
    pub fn check_lli_and_gf(
        &mut self,
        sv: SV,
        lli: Lli,
        gf_combination_m: Option<f64>,
    ) -> Vec<SlipCause> {
        let epoch = self.epoch_counter;
        let idx = self.slot(sv);
        let mut causes = Vec::new();

        if lli.slip() {
            causes.push(SlipCause::Lli);
        }
        if lli.half_cycle_unknown() {
            self.slots[idx].half_cycle_known = false;
        }

        let track = &mut self.slots[idx];
        if let Some(last_epoch) = track.last_epoch_index {
            if epoch.saturating_sub(last_epoch) > GAP_RESION as u64 {
                causes.push(SlipCause::EpochGap);
            }
        }

        if let (Some(gf), Some(last)) = (gf_combination_m, track.last_gf) {
            if (gf - last).abs() > THRESHOLD_SLIP_GF {
                causes.push(SlipCause::GeometryFree);
            }
        }

        track.last_gf = gf_combination_m.or(track.last_gf);
        track.last_epoch_index = Some(epoch);
        if !causes.is_empty() {
            track.half_cycle_known = false;
        }
        causes
    }

    /// Melbourne-Wubbena wide-lane combination, cycles, tracked as a
    /// running mean; a fresh observation more than
    /// [THRESHOLD_SLIP_MW] cycles from the mean flags a slip and resets it.
    pub fn check_mw(&mut self, sv: SV, mw_wide_lane_cycles: f64) -> bool {
        let idx = self.slot(sv);
        let track = &mut self.slots[idx];
        if track.mw_count == 0 {
            track.mw_mean = mw_wide_lane_cycles;
            track.mw_count = 1;
            return false;
        }
        let slipped = (mw_wide_lane_cycles - track.mw_mean).abs() > THRESHOLD_SLIP_MW;
        if slipped {
            track.mw_mean = mw_wide_lane_cycles;
            track.mw_count = 1;
        } else {
            track.mw_count += 1;
            let n = track.mw_count as f64;
            track.mw_mean += (mw_wide_lane_cycles - track.mw_mean) / n;
        }
        slipped
    }

    pub fn half_cycle_known(&mut self, sv: SV) -> bool {
        let idx = self.slot(sv);
        self.slots[idx].half_cycle_known
    }
    pub fn set_half_cycle_known(&mut self, sv: SV, known: bool) {
        let idx = self.slot(sv);
        self.slots[idx].half_cycle_known = known;
    }

    pub fn reset(&mut self, sv: SV) {
        let idx = self.slot(sv);
        self.slots[idx] = Track::default();
    }
}

/// Geometry-free combination of two pseudorange-equivalent phase
/// measurements (meters), `phase_1 - phase_2`.
pub fn geometry_free(phase1_m: f64, phase2_m: f64) -> f64 {
    phase1_m - phase2_m
}

/// Melbourne-Wubbena wide-lane combination, cycles: the narrow-lane code
/// combination subtracted from the wide-lane phase combination.
pub fn melbourne_wubbena(
    phase1_cycles: f64,
    phase2_cycles: f64,
    code1_cycles: f64,
    code2_cycles: f64,
    f1_hz: f64,
    f2_hz: f64,
) -> f64 {
    let wide_lane = phase1_cycles - phase2_cycles;
    let narrow_lane = (f1_hz * code1_cycles + f2_hz * code2_cycles) / (f1_hz + f2_hz);
    wide_lane - narrow_lane
}
