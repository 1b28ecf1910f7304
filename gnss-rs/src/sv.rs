//! Space vehicle identity
use crate::constellation::Constellation;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `SV` identifies a single space vehicle by its flat satellite id
/// (1..=[crate::constellation::N_SAT]), partitioned by constellation per
/// fixed PRN offsets. The flat id is the canonical identity; `constellation`
/// and `prn` are cheap derived views over it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SV {
    id: u16,
}

/// SV construction / parsing related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("constellation parsing error")]
    Constellation(#[from] crate::constellation::ParsingError),
    #[error("sv prn# parsing error")]
    Prn(#[from] std::num::ParseIntError),
    #[error("prn {0} out of range for {1}")]
    PrnOutOfRange(u8, Constellation),
    #[error("satellite id {0} outside the 1..=N_SAT partition")]
    IdOutOfRange(u16),
}

impl SV {
    /// Builds an `SV` from a constellation and a 1-based PRN within it.
    ///
    /// # Panics
    /// Panics if `prn` is outside the constellation's reserved range; use
    /// [SV::try_new] at data-ingestion boundaries where the PRN is untrusted.
    pub fn new(constellation: Constellation, prn: u8) -> Self {
        Self::try_new(constellation, prn)
            .unwrap_or_else(|e| panic!("invalid SV: {:?}", e))
    }
    /// Fallible constructor: validates the PRN falls within the
    /// constellation's reserved slice of the flat id space.
    pub fn try_new(constellation: Constellation, prn: u8) -> Result<Self, ParsingError> {
        constellation
            .to_sat_id(prn)
            .map(|id| Self { id })
            .ok_or(ParsingError::PrnOutOfRange(prn, constellation))
    }
    /// Builds an `SV` directly from its flat satellite id.
    pub fn from_sat_id(id: u16) -> Result<Self, ParsingError> {
        if Constellation::from_sat_id(id).is_some() {
            Ok(Self { id })
        } else {
            Err(ParsingError::IdOutOfRange(id))
        }
    }
    /// The flat satellite id, unique across all constellations.
    pub fn sat_id(&self) -> u16 {
        self.id
    }
    /// Constellation this vehicle belongs to.
    pub fn constellation(&self) -> Constellation {
        Constellation::from_sat_id(self.id)
            .map(|(sys, _)| sys)
            .expect("SV always holds a valid id")
    }
    /// 1-based PRN within [SV::constellation].
    pub fn prn(&self) -> u8 {
        Constellation::from_sat_id(self.id)
            .map(|(_, prn)| prn)
            .expect("SV always holds a valid id")
    }
}

impl std::str::FromStr for SV {
    type Err = ParsingError;
    /// Parses the standard RINEX "Xnn" vehicle descriptor, e.g. "G01", "R 9".
    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let constellation = Constellation::from_str(&string[0..1])?;
        let prn = u8::from_str_radix(string[1..].trim(), 10)?;
        SV::try_new(constellation, prn)
    }
}

impl std::fmt::LowerHex for SV {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:x}{:02}", self.constellation(), self.prn())
    }
}

impl std::fmt::Display for SV {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:x}{:02}", self.constellation(), self.prn())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn from_str() {
        for (descriptor, sys, prn) in [
            ("G01", Constellation::GPS, 1),
            ("G 1", Constellation::GPS, 1),
            ("R01", Constellation::Glonass, 1),
            ("E36", Constellation::Galileo, 36),
            ("J10", Constellation::QZSS, 10),
            ("C63", Constellation::BeiDou, 63),
            ("I14", Constellation::IRNSS, 14),
            ("S39", Constellation::SBAS, 39),
        ] {
            let sv = SV::from_str(descriptor).unwrap();
            assert_eq!(sv, SV::new(sys, prn));
            assert_eq!(sv.constellation(), sys);
            assert_eq!(sv.prn(), prn);
        }
    }

    #[test]
    fn prn_out_of_range_rejected() {
        assert!(SV::try_new(Constellation::GPS, 33).is_err());
        assert!(SV::try_new(Constellation::QZSS, 11).is_err());
    }

    #[test]
    fn distinct_ids_across_systems() {
        let gps = SV::new(Constellation::GPS, 32);
        let glo = SV::new(Constellation::Glonass, 1);
        assert_ne!(gps.sat_id(), glo.sat_id());
        assert_eq!(gps.sat_id() + 1, glo.sat_id());
    }
}
