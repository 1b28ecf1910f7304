//! Core-wide error kinds.
use gnss::prelude::{GnssTime, SV};
use thiserror::Error;

/// Every fallible operation exposed by this crate returns one of these.
/// Propagation policy (local vs. surfaced vs. fatal) lives with the caller:
/// most variants here are recovered from by the caller (excluding a
/// satellite, degrading solution status) rather than aborting a pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("{1}: no ephemeris available at {0}")]
    EphemerisUnavailable(GnssTime, SV),

    #[error("{1}: orbit/clock SSR IOD mismatch at {0}")]
    EphemerisInconsistent(GnssTime, SV),

    #[error("{0}: receiver clock outage")]
    ClockOutage(GnssTime),

    #[error("{1}: Kepler/GLONASS integrator failed to converge at {0}")]
    IntegratorDiverged(GnssTime, SV),

    #[error("{0}: filter diverged, rolling back to prior state")]
    FilterDiverged(GnssTime),

    #[error("{0}: normal equations are rank deficient")]
    RankDeficient(GnssTime),

    #[error("{0}: geometry too poor to solve (GDOP {1:.1} exceeds ceiling)")]
    GeometryPoor(GnssTime, f64),

    #[error("{1}: cycle slip detected at {0}")]
    CycleSlip(GnssTime, SV),

    #[error("{1}: ambiguity could not be fixed at {0}")]
    AmbiguityUnfixed(GnssTime, SV),

    #[error("stream timeout on {0}")]
    StreamTimeout(String),

    #[error("invalid format: {0}")]
    FormatInvalid(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("not enough satellites: {0} elected, {1} required")]
    NotEnoughSatellites(usize, usize),

    #[error("configuration error: {0}")]
    Configuration(String),
}
