//! One satellite, one epoch.
use crate::observable::Observable;
use gnss::prelude::{GnssTime, SV};

/// Number of addressable frequency slots per satellite: the constellation
/// frequency bands plus a couple of extra slots for rarely-tracked
/// signals (e.g. a third BeiDou/Galileo band alongside L1/L5-equivalent).
pub const N_FREQ: usize = 3;
pub const N_EXTRA: usize = 2;
pub const N_SLOTS: usize = N_FREQ + N_EXTRA;

/// Loss-of-lock indicator bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lli(pub u8);

impl Lli {
    pub const SLIP: u8 = 0b0001;
    pub const HALF_CYCLE_UNKNOWN: u8 = 0b0010;
    pub const ADDED: u8 = 0b0100;
    pub const SUBTRACTED: u8 = 0b1000;

    pub fn slip(&self) -> bool {
        self.0 & Self::SLIP != 0
    }
    pub fn half_cycle_unknown(&self) -> bool {
        self.0 & Self::HALF_CYCLE_UNKNOWN != 0
    }
    pub fn added(&self) -> bool {
        self.0 & Self::ADDED != 0
    }
    pub fn subtracted(&self) -> bool {
        self.0 & Self::SUBTRACTED != 0
    }
}

/// Signal-level measurements for a single frequency slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotData {
    /// Pseudorange, meters.
    pub pseudorange: Option<f64>,
    /// Carrier phase, cycles.
    pub phase: Option<f64>,
    /// Doppler, Hz.
    pub doppler: Option<f64>,
    /// Signal-to-noise ratio, scaled integer (RINEX dBHz 0-9 scale or raw).
    pub snr: Option<u8>,
    pub lli: Lli,
    /// The exact tracked signal, if known (e.g. `L1C`, `L2W`).
    pub code: Option<Observable>,
}

impl SlotData {
    pub fn is_empty(&self) -> bool {
        self.pseudorange.is_none() && self.phase.is_none() && self.doppler.is_none()
    }
}

/// One satellite's measurements at one epoch, across all tracked frequency
/// slots. Observations flow by copy through the pipeline: no component
/// holds a mutable reference to one once it has been enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub t: GnssTime,
    pub sv: SV,
    slots: [SlotData; N_SLOTS],
}

impl Observation {
    pub fn new(t: GnssTime, sv: SV) -> Self {
        Self {
            t,
            sv,
            slots: Default::default(),
        }
    }
    pub fn slot(&self, idx: usize) -> &SlotData {
        &self.slots[idx]
    }
    pub fn slot_mut(&mut self, idx: usize) -> &mut SlotData {
        &mut self.slots[idx]
    }
    pub fn set_slot(&mut self, idx: usize, data: SlotData) {
        self.slots[idx] = data;
    }
    pub fn slots(&self) -> impl Iterator<Item = (usize, &SlotData)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.is_empty())
    }
    /// First non-empty pseudorange slot, used by single-frequency SPP
    /// fallbacks. Prefer [crate::spp] combination logic for anything
    /// beyond a quick "is there code data at all" check.
    pub fn first_pseudorange(&self) -> Option<(usize, f64)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.pseudorange.map(|pr| (i, pr)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gnss::prelude::Constellation;

    #[test]
    fn lli_bits() {
        let lli = Lli(0b0011);
        assert!(lli.slip());
        assert!(lli.half_cycle_unknown());
        assert!(!lli.added());
    }

    #[test]
    fn slot_round_trip() {
        let t = GnssTime::new(100, 0.0);
        let sv = SV::new(Constellation::GPS, 5);
        let mut obs = Observation::new(t, sv);
        obs.set_slot(
            0,
            SlotData {
                pseudorange: Some(2.1e7),
                ..Default::default()
            },
        );
        assert_eq!(obs.first_pseudorange(), Some((0, 2.1e7)));
        assert_eq!(obs.slots().count(), 1);
    }
}
