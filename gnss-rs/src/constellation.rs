//! GNSS constellations
use hifitime::TimeScale;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Constellation parsing related errors
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ParsingError {
    #[error("unknown constellation \"{0}\"")]
    Unknown(String),
}

/// Describes all constellations the engine can resolve ephemerides and
/// observations for. `SBAS` is intentionally a single flat system here:
/// per-region SBAS identity (WAAS, EGNOS, ...) is a concern of the decoder
/// layer, not the positioning core.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Constellation {
    /// `GPS` american constellation
    #[default]
    GPS,
    /// `GLONASS` russian constellation
    Glonass,
    /// `Galileo` european constellation
    Galileo,
    /// `QZSS` japanese constellation
    QZSS,
    /// `BeiDou` chinese constellation
    BeiDou,
    /// `IRNSS` indian constellation, a.k.a "NavIC"
    IRNSS,
    /// Geostationary augmentation systems, handled as one system
    SBAS,
}

/// One row of the satellite numbering table: constellation, PRN range and
/// the offset added to a 1-based PRN to obtain the flat satellite id.
struct SysRange {
    sys: Constellation,
    min_prn: u16,
    max_prn: u16,
    offset: u16,
}

// Fixed PRN partition of the flat 1..N_SAT satellite id space.
const RANGES: [SysRange; 7] = [
    SysRange { sys: Constellation::GPS, min_prn: 1, max_prn: 32, offset: 0 },
    SysRange { sys: Constellation::Glonass, min_prn: 1, max_prn: 27, offset: 32 },
    SysRange { sys: Constellation::Galileo, min_prn: 1, max_prn: 36, offset: 59 },
    SysRange { sys: Constellation::QZSS, min_prn: 1, max_prn: 10, offset: 95 },
    SysRange { sys: Constellation::BeiDou, min_prn: 1, max_prn: 63, offset: 105 },
    SysRange { sys: Constellation::IRNSS, min_prn: 1, max_prn: 14, offset: 168 },
    SysRange { sys: Constellation::SBAS, min_prn: 1, max_prn: 39, offset: 182 },
];

/// Total number of satellite identifiers in the flat numbering space.
pub const N_SAT: u16 = 221;

/// Number of distinct constellations supported by the core.
pub const N_SYS: usize = 7;

impl Constellation {
    pub(crate) fn range(&self) -> &'static SysRange {
        RANGES
            .iter()
            .find(|r| r.sys == *self)
            .expect("Constellation::range: RANGES must cover every variant")
    }
    /// Lowest and highest flat satellite id assigned to this constellation.
    pub fn sat_id_range(&self) -> (u16, u16) {
        let r = self.range();
        (r.offset + r.min_prn, r.offset + r.max_prn)
    }
    /// Number of PRN slots reserved for this constellation.
    pub fn num_sats(&self) -> u16 {
        let r = self.range();
        r.max_prn - r.min_prn + 1
    }
    /// Resolves the constellation owning a given flat satellite id, and the
    /// PRN within it. Returns `None` outside `1..=N_SAT`: the map is total
    /// over that range and partial outside it.
    pub fn from_sat_id(id: u16) -> Option<(Constellation, u8)> {
        RANGES.iter().find_map(|r| {
            let (lo, hi) = (r.offset + r.min_prn, r.offset + r.max_prn);
            if id >= lo && id <= hi {
                Some((r.sys, (id - r.offset) as u8))
            } else {
                None
            }
        })
    }
    /// Flat satellite id for a PRN within this constellation, or `None` if
    /// the PRN is out of the constellation's reserved range.
    pub fn to_sat_id(&self, prn: u8) -> Option<u16> {
        let r = self.range();
        if (prn as u16) < r.min_prn || (prn as u16) > r.max_prn {
            None
        } else {
            Some(r.offset + prn as u16)
        }
    }
    /// Returns the native time scale satellites of this constellation
    /// broadcast their ephemeris and clock against.
    pub fn timescale(&self) -> TimeScale {
        match self {
            Self::GPS | Self::QZSS => TimeScale::GPST,
            Self::Galileo => TimeScale::GST,
            Self::BeiDou => TimeScale::BDT,
            Self::Glonass => TimeScale::UTC,
            // IRNSS and SBAS are referenced to GPST by convention.
            Self::IRNSS | Self::SBAS => TimeScale::GPST,
        }
    }
    pub fn is_sbas(&self) -> bool {
        matches!(self, Self::SBAS)
    }
}

impl std::fmt::Display for Constellation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::GPS => write!(f, "GPS"),
            Self::Glonass => write!(f, "GLO"),
            Self::Galileo => write!(f, "GAL"),
            Self::QZSS => write!(f, "QZS"),
            Self::BeiDou => write!(f, "BDS"),
            Self::IRNSS => write!(f, "IRN"),
            Self::SBAS => write!(f, "SBS"),
        }
    }
}

impl std::fmt::LowerHex for Constellation {
    /// Single letter RINEX system code: G/R/E/J/C/I/S
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let c = match self {
            Self::GPS => 'G',
            Self::Glonass => 'R',
            Self::Galileo => 'E',
            Self::QZSS => 'J',
            Self::BeiDou => 'C',
            Self::IRNSS => 'I',
            Self::SBAS => 'S',
        };
        write!(f, "{}", c)
    }
}

impl std::str::FromStr for Constellation {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "G" | "GPS" => Ok(Self::GPS),
            "R" | "GLO" | "GLONASS" => Ok(Self::Glonass),
            "E" | "GAL" | "GALILEO" => Ok(Self::Galileo),
            "J" | "QZS" | "QZSS" => Ok(Self::QZSS),
            "C" | "BDS" | "BEIDOU" => Ok(Self::BeiDou),
            "I" | "IRN" | "IRNSS" | "NAVIC" => Ok(Self::IRNSS),
            "S" | "SBS" | "SBAS" => Ok(Self::SBAS),
            _ => Err(ParsingError::Unknown(s.to_string())),
        }
    }
}
