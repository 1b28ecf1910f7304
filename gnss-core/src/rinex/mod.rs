//! RINEX observation translation core: discovers per-system observation
//! types over a scan pass, then re-renders epochs against that fixed type
//! list on a write pass. Produces in-memory records only — serializing
//! them to a `.rnx`/`.obs` file is outside this crate's scope.
pub mod obstype;

use crate::config::RinexTranslatorConfig;
use crate::constants::MAXOBS;
use crate::observable::Observable;
use crate::observation::Observation;
use crate::solution::StationInfo;
use gnss::prelude::{Constellation, GnssTime, SV};
use obstype::ObsTypeTable;
use std::collections::HashMap;

/// RINEX epoch event flag (header field 2 of the `>` epoch record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpochFlag {
    #[default]
    Ok,
    PowerFailure,
    AntennaMoved,
    NewSiteOccupation,
    HeaderFollows,
    ExternalEvent,
    CycleSlipRecord,
}

impl EpochFlag {
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::PowerFailure => 1,
            Self::AntennaMoved => 2,
            Self::NewSiteOccupation => 3,
            Self::HeaderFollows => 4,
            Self::ExternalEvent => 5,
            Self::CycleSlipRecord => 6,
        }
    }
}

/// One epoch, re-rendered against the finalized observation-type list:
/// for every satellite, one slot value (or `None`) per type in
/// [obstype::ObsTypeTable::finalize] order.
#[derive(Debug, Clone)]
pub struct TranslatedEpoch {
    pub t: GnssTime,
    pub flag: EpochFlag,
    pub satellites: Vec<(SV, Vec<Option<f64>>)>,
}

/// Per-(system, observable) phase-shift correction, RINEX-3 header field
/// `SYS / PHASE SHIFT`, applied to carrier-phase observations at output.
#[derive(Debug, Clone, Default)]
pub struct PhaseShiftTable {
    shifts: HashMap<(Constellation, String), f64>,
}

impl PhaseShiftTable {
    pub fn set(&mut self, sys: Constellation, obs: &Observable, cycles: f64) {
        self.shifts.insert((sys, obs.as_str().to_string()), cycles);
    }
    pub fn get(&self, sys: Constellation, obs: &Observable) -> f64 {
        self.shifts
            .get(&(sys, obs.as_str().to_string()))
            .copied()
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RinexTranslator {
    pub config: RinexTranslatorConfig,
    pub station: StationInfo,
    pub phase_shifts: PhaseShiftTable,
    obs_types: ObsTypeTable,
}

impl RinexTranslator {
    pub fn new(config: RinexTranslatorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Scan pass: records every observable present on `observations` into
    /// the per-system type table. Call once per epoch before any
    /// [Self::translate_epoch] call for that epoch.
    pub fn scan_epoch(&mut self, observations: &[Observation]) {
        for obs in observations {
            let sys = obs.sv.constellation();
            for (_, slot) in obs.slots() {
                if let Some(code) = &slot.code {
                    self.obs_types.record(sys, code.clone());
                }
            }
        }
    }

    pub fn finalized_types(&self, sys: Constellation) -> Vec<Observable> {
        self.obs_types.finalize(sys, self.config.output_version)
    }

    /// Write pass: re-renders one epoch's observations against the
    /// already-finalized type list, applying the sampling-interval filter
    /// and the [MAXOBS] keep-first-seen cap. Returns `None` when `t` does
    /// not land on the configured sampling grid.
    pub fn translate_epoch(
        &self,
        t: GnssTime,
        flag: EpochFlag,
        observations: &[Observation],
    ) -> Option<TranslatedEpoch> {
        if let Some(interval) = self.config.sampling_interval_s {
            let (sec, frac) = t.gpst_seconds();
            if frac.abs() > 1e-6 || (sec as f64) % interval != 0.0 {
                return None;
            }
        }

        let mut satellites = Vec::new();
        for obs in observations.iter().take(MAXOBS) {
            let sys = obs.sv.constellation();
            let types = self.obs_types.finalize(sys, self.config.output_version);
            let mut row = vec![None; types.len()];
            for (_, slot) in obs.slots() {
                let Some(code) = &slot.code else { continue };
                if let Some(pos) = types.iter().position(|t| t == code) {
                    row[pos] = match code.kind() {
                        crate::observable::ObservationKind::PseudoRange => slot.pseudorange,
                        crate::observable::ObservationKind::Phase => slot
                            .phase
                            .map(|p| p + self.phase_shifts.get(sys, code)),
                        crate::observable::ObservationKind::Doppler => slot.doppler,
                        crate::observable::ObservationKind::Ssi => slot.snr.map(|s| s as f64),
                    };
                }
            }
            satellites.push((obs.sv, row));
        }

        Some(TranslatedEpoch { t, flag, satellites })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::observation::SlotData;
    use std::str::FromStr;

    fn obs_with(sv: SV, code: &str, pr: f64) -> Observation {
        let mut o = Observation::new(GnssTime::new(1_000_000_000, 0.0), sv);
        o.set_slot(
            0,
            SlotData {
                pseudorange: Some(pr),
                code: Some(Observable::from_str(code).unwrap()),
                ..Default::default()
            },
        );
        o
    }

    #[test]
    fn scan_then_translate_round_trips_pseudorange() {
        let mut translator = RinexTranslator::new(RinexTranslatorConfig::default());
        let sv = SV::new(Constellation::GPS, 5);
        let obs = vec![obs_with(sv, "C1C", 2.1e7)];
        translator.scan_epoch(&obs);
        let epoch = translator
            .translate_epoch(GnssTime::new(1_000_000_000, 0.0), EpochFlag::Ok, &obs)
            .unwrap();
        assert_eq!(epoch.satellites.len(), 1);
        assert_eq!(epoch.satellites[0].1[0], Some(2.1e7));
    }

    #[test]
    fn sampling_interval_rejects_misaligned_epochs() {
        let mut translator = RinexTranslator::new(RinexTranslatorConfig {
            output_version: 3.04,
            sampling_interval_s: Some(30.0),
        });
        let sv = SV::new(Constellation::GPS, 5);
        let obs = vec![obs_with(sv, "C1C", 2.1e7)];
        translator.scan_epoch(&obs);
        assert!(translator
            .translate_epoch(GnssTime::new(1_000_000_015, 0.0), EpochFlag::Ok, &obs)
            .is_some()
            == false);
        assert!(translator
            .translate_epoch(GnssTime::new(1_000_000_020, 0.0), EpochFlag::Ok, &obs)
            .is_some());
    }

    #[test]
    fn maxobs_caps_satellites_per_epoch() {
        let mut translator = RinexTranslator::new(RinexTranslatorConfig::default());
        let obs: Vec<Observation> = (0..(MAXOBS + 10))
            .map(|i| obs_with(SV::new(Constellation::GPS, (i % 32 + 1) as u8), "C1C", 2.0e7))
            .collect();
        translator.scan_epoch(&obs);
        let epoch = translator
            .translate_epoch(GnssTime::new(1_000_000_000, 0.0), EpochFlag::Ok, &obs)
            .unwrap();
        assert_eq!(epoch.satellites.len(), MAXOBS);
    }
}
