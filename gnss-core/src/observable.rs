//! Signal identifiers (RINEX-3 style `tna` observation codes: type,
//! frequency band, attribute) and the frequency-slot / priority ordering
//! the RINEX translator core and the estimator both need.
use gnss::prelude::Constellation;
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What kind of quantity an [Observable] measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObservationKind {
    PseudoRange,
    Phase,
    Doppler,
    Ssi,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("observable code too short: \"{0}\"")]
    TooShort(String),
    #[error("unknown observation type letter '{0}'")]
    UnknownKind(char),
    #[error("unknown frequency band digit '{0}'")]
    UnknownBand(char),
}

/// A RINEX-3 style three-character observation code, e.g. `C1C`, `L2W`,
/// `D5Q`, `S1C`. First letter is the [ObservationKind], second character
/// the frequency band, remaining character(s) the tracking attribute used
/// for code-priority ranking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observable {
    code: String,
}

impl Observable {
    pub fn new(code: impl Into<String>) -> Result<Self, ParsingError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self { code })
    }
    fn validate(code: &str) -> Result<(), ParsingError> {
        if code.len() < 2 {
            return Err(ParsingError::TooShort(code.to_string()));
        }
        let mut chars = code.chars();
        let kind = chars.next().unwrap();
        if !matches!(kind, 'C' | 'L' | 'D' | 'S') {
            return Err(ParsingError::UnknownKind(kind));
        }
        let band = chars.next().unwrap();
        if !band.is_ascii_digit() {
            return Err(ParsingError::UnknownBand(band));
        }
        Ok(())
    }
    pub fn kind(&self) -> ObservationKind {
        match self.code.chars().next().unwrap() {
            'C' => ObservationKind::PseudoRange,
            'L' => ObservationKind::Phase,
            'D' => ObservationKind::Doppler,
            'S' => ObservationKind::Ssi,
            _ => unreachable!("validated at construction"),
        }
    }
    /// The RINEX frequency band digit, e.g. `1`, `2`, `5`.
    pub fn band(&self) -> char {
        self.code.chars().nth(1).unwrap()
    }
    /// The tracking attribute letters after type+band, e.g. `"C"`, `"W"`, `"Q"`.
    pub fn attribute(&self) -> &str {
        &self.code[2..]
    }
    pub fn as_str(&self) -> &str {
        &self.code
    }
    /// Frequency-slot index: 0 is always the constellation's L1-equivalent
    /// band, higher slots follow ascending band number.
    pub fn frequency_slot(&self, sys: Constellation) -> usize {
        frequency_slot_for_band(sys, self.band())
    }
    /// Relative priority among codes sharing a frequency slot: lower is
    /// preferred. Used by the RINEX translator's sort-and-filter pass
    /// so the best tracked signal for a slot is written
    /// first when several were observed.
    pub fn code_priority(&self) -> u8 {
        // Preference mirrors common receiver tracking quality: pilot/data
        // combined (X) and P/Y-code tracking (W, P) rank ahead of the
        // coarse/legacy C/A-only attribute.
        match self.attribute() {
            "Q" | "X" => 0,
            "P" | "W" | "I" => 1,
            "C" => 2,
            "S" | "L" | "M" => 3,
            _ => 9,
        }
    }
}

fn frequency_slot_for_band(sys: Constellation, band: char) -> usize {
    use Constellation::*;
    let order: &[char] = match sys {
        GPS | QZSS | SBAS => &['1', '2', '5'],
        Glonass => &['1', '2', '3'],
        Galileo => &['1', '5', '7', '8', '6'],
        BeiDou => &['2', '1', '7', '6', '5', '8'],
        IRNSS => &['5', '9'],
    };
    order.iter().position(|b| *b == band).unwrap_or(order.len())
}

impl FromStr for Observable {
    type Err = ParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl std::fmt::Display for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_kind_and_band() {
        let obs = Observable::from_str("L2W").unwrap();
        assert_eq!(obs.kind(), ObservationKind::Phase);
        assert_eq!(obs.band(), '2');
        assert_eq!(obs.attribute(), "W");
    }

    #[test]
    fn slot_zero_is_l1_equivalent() {
        let obs = Observable::from_str("C1C").unwrap();
        assert_eq!(obs.frequency_slot(Constellation::GPS), 0);
        let obs = Observable::from_str("C5Q").unwrap();
        assert_eq!(obs.frequency_slot(Constellation::GPS), 2);
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(Observable::from_str("X").is_err());
        assert!(Observable::from_str("Z1C").is_err());
        assert!(Observable::from_str("C_C").is_err());
    }
}
