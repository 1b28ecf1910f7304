//! GNSS time representation
//!
//! A [GnssTime] is the ordered pair (integer seconds since the GPST epoch,
//! fractional seconds in `[0, 1)`) mandated by the core's data model. Leap
//! second bookkeeping for UTC conversions, and the fixed 14 s BDT offset,
//! are both derived from [hifitime::Epoch] rather than reimplemented here.
use hifitime::{Duration, Epoch, TimeScale};

/// BDT was defined as GPST - 14s at its 2006-01-01 epoch and has tracked
/// GPST (no further leap seconds) ever since.
const BDT_GPST_OFFSET_S: f64 = 14.0;

/// A GNSS timestamp: (whole seconds since GPST epoch, fractional seconds).
/// The fractional part always satisfies `0.0 <= frac < 1.0`; construction
/// normalizes accordingly.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct GnssTime {
    epoch: Epoch,
}

impl GnssTime {
    /// Builds a `GnssTime` from (integer, fractional) seconds since the
    /// GPST epoch, normalizing so the fractional part lands in `[0, 1)`.
    pub fn new(sec: i64, frac: f64) -> Self {
        let carry = frac.floor();
        let sec = sec + carry as i64;
        let frac = frac - carry;
        let epoch = Epoch::from_gpst_seconds(sec as f64 + frac);
        Self { epoch }
    }
    /// Wraps an existing [Epoch], preserving its time scale.
    pub fn from_epoch(epoch: Epoch) -> Self {
        Self { epoch }
    }
    /// The underlying [Epoch], for interop with the rest of the pack.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }
    /// Decomposes into the (integer, fractional) GPST-seconds pair.
    pub fn gpst_seconds(&self) -> (i64, f64) {
        let total = self.epoch.to_gpst_seconds();
        let sec = total.floor();
        (sec as i64, total - sec)
    }
    /// GPST -> UTC, applying the current leap second count.
    pub fn to_utc(&self) -> Self {
        Self {
            epoch: self.epoch.to_time_scale(TimeScale::UTC),
        }
    }
    /// UTC (or any scale) -> GPST.
    pub fn to_gpst(&self) -> Self {
        Self {
            epoch: self.epoch.to_time_scale(TimeScale::GPST),
        }
    }
    /// GPST -> BDT, a fixed 14 s offset with no further leap second drift.
    pub fn to_bdt(&self) -> Self {
        let gpst = self.to_gpst();
        Self {
            epoch: gpst.epoch - Duration::from_seconds(BDT_GPST_OFFSET_S),
        }
    }
    /// BDT -> GPST, the inverse fixed 14 s offset.
    pub fn from_bdt(bdt_epoch: Epoch) -> Self {
        Self {
            epoch: bdt_epoch + Duration::from_seconds(BDT_GPST_OFFSET_S),
        }
    }
    /// Elapsed time `self - other`, in seconds (positive if `self` is later).
    pub fn seconds_since(&self, other: &GnssTime) -> f64 {
        (self.epoch - other.epoch).to_seconds()
    }
}

impl std::ops::Add<Duration> for GnssTime {
    type Output = GnssTime;
    fn add(self, rhs: Duration) -> GnssTime {
        GnssTime {
            epoch: self.epoch + rhs,
        }
    }
}

impl std::ops::Sub<Duration> for GnssTime {
    type Output = GnssTime;
    fn sub(self, rhs: Duration) -> GnssTime {
        GnssTime {
            epoch: self.epoch - rhs,
        }
    }
}

impl std::ops::Sub<GnssTime> for GnssTime {
    type Output = Duration;
    fn sub(self, rhs: GnssTime) -> Duration {
        self.epoch - rhs.epoch
    }
}

impl std::fmt::Display for GnssTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.epoch)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fractional_part_is_normalized() {
        let t = GnssTime::new(100, 1.25);
        let (sec, frac) = t.gpst_seconds();
        assert_eq!(sec, 101);
        assert!((frac - 0.25).abs() < 1e-9);
    }

    #[test]
    fn gpst_utc_gpst_roundtrip() {
        // any epoch at/after the GPST origin must survive a UTC round-trip
        let t = GnssTime::new(1_000_000_000, 0.0);
        let back = t.to_utc().to_gpst();
        assert!((t.seconds_since(&back)).abs() < 1e-6);
    }

    #[test]
    fn bdt_gpst_roundtrip() {
        let t = GnssTime::new(800_000_000, 0.5);
        let bdt = t.to_bdt();
        let back = GnssTime::from_bdt(bdt.epoch());
        assert!((t.seconds_since(&back)).abs() < 1e-9);
    }

    #[test]
    fn bdt_offset_is_fixed_14s() {
        let t = GnssTime::new(900_000_000, 0.0);
        let bdt = t.to_bdt();
        assert!((t.seconds_since(&GnssTime { epoch: bdt.epoch() }) - BDT_GPST_OFFSET_S).abs() < 1e-9);
    }
}
