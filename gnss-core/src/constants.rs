//! Physical and protocol constants shared across the engine.
//!
//! Named `const`s collected here rather than scattered near point of
//! use, since most of them are shared by more than one component
//! (ephemeris engine, SPP, EKF).
use gnss::prelude::Constellation;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// WGS84 Earth rotation rate, rad/s.
pub const OMEGA_E: f64 = 7.2921151467e-5;

/// Earth gravitational constant, per-system (m^3/s^2). GLONASS and SBAS use
/// their own state-vector propagation and do not need it.
pub fn earth_mu(sys: Constellation) -> f64 {
    match sys {
        Constellation::Galileo => 3.986004418e14,
        Constellation::BeiDou => 3.986004418e14,
        _ => 3.9860050e14,
    }
}

/// WGS84/PZ-90 J2 harmonic coefficient, used by the GLONASS ODE.
pub const J2_GLO: f64 = 1.0826257e-3;

/// GLONASS/PZ-90 equatorial Earth radius, m.
pub const EARTH_RADIUS_GLO: f64 = 6_378_136.0;

/// Newton iteration tolerance for the Kepler equation, rad.
pub const KEPLER_TOLERANCE: f64 = 1e-13;

/// Hard cap on Kepler Newton iterations before declaring divergence.
pub const KEPLER_MAX_ITER: u32 = 30;

/// Fixed BDS GEO frame tilt applied after standard Kepler propagation, rad.
pub const BDS_GEO_TILT_RAD: f64 = -5.0_f64.to_radians();

/// Broadcast-ephemeris clock variance fallback when SVA/URA cannot be
/// resolved to a meaningful sigma, or the Kepler solver diverges, m.
pub const STD_BRDCCLK: f64 = 30.0;

/// Precise-orbit extrapolation variance growth rate, (m/s)^2 equivalent
/// applied as `EXTERR_EPH * dt^2 / 2`.
pub const EXTERR_EPH: f64 = 5e-7;

/// Precise-clock extrapolation variance growth rate, applied as
/// `EXTERR_CLK * |dt|`.
pub const EXTERR_CLK: f64 = 5e-7;

/// Neville interpolation window half-width (samples) for SP3 evaluation.
pub const SP3_INTERP_HALF_WINDOW: usize = 5;

/// Maximum age of an SSR correction before it is rejected, seconds.
pub const MAX_AGE_SSR: f64 = 90.0;

/// Maximum age of an SSR high-rate clock delta before it is ignored.
pub const MAX_AGE_SSR_HRCLK: f64 = 10.0;

/// Maximum age of a paired base-station observation, seconds.
pub const MAX_AGE: f64 = 30.0;

/// Ambiguity reset variance after a detected cycle slip, m^2 (equivalently
/// cycles^2 once scaled by wavelength, per state convention).
pub const VAR_BIAS: f64 = 3600.0;

/// Epoch gap after which a slant ionosphere state is reset to a fresh
/// geometry-free estimate rather than propagated.
pub const GAP_RESION: u32 = 120;

/// Epoch outage after which a float ambiguity is reset even without an
/// explicit slip flag.
pub const MAXOUT: u32 = 5;

/// Minimum LAMBDA ratio (best/second-best) to accept an integer fix.
pub const MIN_RATIO: f64 = 3.0;

/// Maximum post-fix 3-sigma position uncertainty for acceptance, m.
pub const MAX_STD_FIX: f64 = 0.15;

/// Consecutive accepted epochs required before fix-and-hold retains a
/// fixed ambiguity as a pseudo-measurement.
pub const MIN_FIX: u32 = 20;

/// Variance of a fix-and-hold pseudo-measurement, cycles^2.
pub const VAR_HOLD: f64 = 1e-4;

/// Day-boundary GPS clock jump detection threshold, seconds.
pub const DAY_BOUNDARY_JUMP_S: f64 = 0.5e-3;

/// Geometry-free cycle-slip detection threshold, m.
pub const THRESHOLD_SLIP_GF: f64 = 0.05;

/// Melbourne-Wubbena cycle-slip detection threshold, wide-lane cycles.
pub const THRESHOLD_SLIP_MW: f64 = 10.0;

/// Pre-fit innovation gate for EKF measurement updates, m.
pub const MAX_INNOVATION: f64 = 30.0;

/// Post-fit normalized-residual gate for EKF measurement updates.
pub const POST_FIT_SIGMA_GATE: f64 = 4.0;

/// Hard cap on EKF measurement-update iterations.
pub const EKF_MAX_ITER: u32 = 8;

/// Maximum number of satellites retained per epoch by the RINEX
/// translator / observation assembler; overflow keeps the first-seen
/// satellites.
pub const MAXOBS: usize = 96;

/// Time-of-ephemeris tolerance per constellation, seconds.
pub fn max_dtoe(sys: Constellation) -> f64 {
    match sys {
        Constellation::Glonass => 15.0 * 60.0,
        Constellation::SBAS => 360.0,
        Constellation::Galileo => 2.0 * 3600.0,
        _ => 4.0 * 3600.0,
    }
}

/// Pseudorange variance elevation model: `a^2 + b^2 / sin(el)^2`.
pub const PR_VAR_A: f64 = 0.3;
pub const PR_VAR_B: f64 = 0.3;

/// Multiplicative pseudorange variance factor per constellation: SBAS 3x,
/// GLONASS 1.5x, everything else nominal.
pub fn constellation_variance_factor(sys: Constellation) -> f64 {
    match sys {
        Constellation::SBAS => 3.0,
        Constellation::Glonass => 1.5,
        _ => 1.0,
    }
}

/// Variance multiplier applied to an iono-free combination relative to a
/// single-frequency observation (combining two noisy measurements).
pub const IONO_FREE_VAR_FACTOR: f64 = 3.0;

/// Nominal carrier frequency, Hz, for a constellation's RINEX frequency
/// band digit. `None` for a band the constellation doesn't broadcast.
pub fn carrier_frequency_hz(sys: Constellation, band: char) -> Option<f64> {
    use Constellation::*;
    Some(match (sys, band) {
        (GPS, '1') | (QZSS, '1') | (SBAS, '1') => 1_575.42e6,
        (GPS, '2') | (QZSS, '2') => 1_227.60e6,
        (GPS, '5') | (QZSS, '5') | (SBAS, '5') => 1_176.45e6,
        (Galileo, '1') => 1_575.42e6,
        (Galileo, '5') => 1_176.45e6,
        (Galileo, '7') => 1_207.14e6,
        (Galileo, '8') => 1_191.795e6,
        (Galileo, '6') => 1_278.75e6,
        (BeiDou, '2') => 1_561.098e6,
        (BeiDou, '1') => 1_575.42e6,
        (BeiDou, '7') => 1_207.14e6,
        (BeiDou, '6') => 1_268.52e6,
        (BeiDou, '5') => 1_176.45e6,
        (BeiDou, '8') => 1_191.795e6,
        (Glonass, _) => return None,
        (IRNSS, '5') => 1_176.45e6,
        (IRNSS, '9') => 2_492.028e6,
        _ => return None,
    })
}

/// Iono-free combination ratio `gamma = (f1/f2)^2` for two signals of the
/// same constellation. `None` when either band's nominal frequency isn't
/// known, leaving the caller to fall back to a representative constant.
pub fn iono_free_gamma(sys: Constellation, band1: char, band2: char) -> Option<f64> {
    let f1 = carrier_frequency_hz(sys, band1)?;
    let f2 = carrier_frequency_hz(sys, band2)?;
    Some((f1 / f2).powi(2))
}

/// Weight assigned to rank-deficiency-avoidance pseudo-measurements in
/// the SPP normal equations.
pub const PSEUDO_MEAS_WEIGHT: f64 = 0.01;
