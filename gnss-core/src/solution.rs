//! Output of the positioning engine.
use gnss::prelude::{Constellation, GnssTime, SV};
use std::collections::HashMap;

/// Solution fidelity / fix status. Any validation failure drops the
/// status one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SolutionStatus {
    #[default]
    None,
    Single,
    PppFloat,
    Float,
    Fix,
    Hold,
}

impl SolutionStatus {
    /// One step down the `none -> single -> float -> fix -> hold` ladder.
    pub fn degrade(self) -> Self {
        match self {
            Self::Hold => Self::Fix,
            Self::Fix => Self::Float,
            Self::Float | Self::PppFloat => Self::Single,
            Self::Single => Self::None,
            Self::None => Self::None,
        }
    }
}

/// Upper-triangle-encoded 3x3 symmetric covariance: `[xx, xy, xz, yy, yz, zz]`.
pub type Covariance3 = [f64; 6];

/// A position/velocity/clock solution for one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub t: GnssTime,
    /// Position, ECEF meters.
    pub position: [f64; 3],
    /// Velocity, ECEF m/s.
    pub velocity: [f64; 3],
    /// Per-constellation receiver clock offset, seconds (GPS is the
    /// reference; other systems carry the GPS-relative inter-system bias).
    pub clock_offsets: HashMap<Constellation, f64>,
    pub status: SolutionStatus,
    pub num_satellites: usize,
    /// LAMBDA ratio test value for the accepted integer fix, if any.
    pub ratio: Option<f64>,
    pub position_covariance: Covariance3,
    pub velocity_covariance: Covariance3,
    /// Diagnostics: satellites RAIM excluded this epoch, and why.
    pub excluded_satellites: Vec<(SV, String)>,
}

impl Solution {
    pub fn none(t: GnssTime) -> Self {
        Self {
            t,
            position: [0.0; 3],
            velocity: [0.0; 3],
            clock_offsets: HashMap::new(),
            status: SolutionStatus::None,
            num_satellites: 0,
            ratio: None,
            position_covariance: [0.0; 6],
            velocity_covariance: [0.0; 6],
            excluded_satellites: Vec::new(),
        }
    }
}

/// Per-satellite-pair fix bookkeeping for fix-and-hold. The float
/// mean/variance themselves live embedded in the filter state; this
/// tracks only the hold strategy.
#[derive(Debug, Clone, Default)]
pub struct AmbiguityControlBlock {
    fixed: HashMap<(SV, usize), bool>,
    continuous_fix_count: HashMap<(SV, usize), u32>,
}

impl AmbiguityControlBlock {
    pub fn record(&mut self, sat: SV, freq: usize, fixed: bool) {
        self.fixed.insert((sat, freq), fixed);
        let counter = self.continuous_fix_count.entry((sat, freq)).or_insert(0);
        if fixed {
            *counter += 1;
        } else {
            *counter = 0;
        }
    }
    pub fn is_fixed(&self, sat: SV, freq: usize) -> bool {
        self.fixed.get(&(sat, freq)).copied().unwrap_or(false)
    }
    pub fn continuous_fix_count(&self, sat: SV, freq: usize) -> u32 {
        self.continuous_fix_count
            .get(&(sat, freq))
            .copied()
            .unwrap_or(0)
    }
    pub fn reset(&mut self, sat: SV, freq: usize) {
        self.fixed.remove(&(sat, freq));
        self.continuous_fix_count.remove(&(sat, freq));
    }
}

/// Receiver/antenna metadata for a station.
#[derive(Debug, Clone, Default)]
pub struct StationInfo {
    pub marker: String,
    pub receiver_type: String,
    pub receiver_serial: String,
    pub antenna_type: String,
    pub antenna_serial: String,
    /// Approximate ECEF position, meters.
    pub approx_position: [f64; 3],
    /// Antenna delta (ENU), meters: east, north, up.
    pub antenna_delta_enu: [f64; 3],
    pub antenna_height: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_degrades_one_level() {
        assert_eq!(SolutionStatus::Hold.degrade(), SolutionStatus::Fix);
        assert_eq!(SolutionStatus::Fix.degrade(), SolutionStatus::Float);
        assert_eq!(SolutionStatus::Float.degrade(), SolutionStatus::Single);
        assert_eq!(SolutionStatus::Single.degrade(), SolutionStatus::None);
        assert_eq!(SolutionStatus::None.degrade(), SolutionStatus::None);
    }
}
