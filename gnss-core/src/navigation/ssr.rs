//! State-space representation (SSR) corrections: orbit/clock deltas keyed
//! to a broadcast ephemeris by issue-of-data, applied on top of a base
//! satellite state when present and fresh enough.
use crate::constants::{MAX_AGE_SSR, MAX_AGE_SSR_HRCLK};
use crate::navigation::SatelliteState;
use gnss::prelude::{GnssTime, SV};
use std::collections::HashMap;

/// Orbit correction in the along-track/cross-track/radial frame, plus a
/// polynomial clock correction (c0 + c1*dt + c2*dt^2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsrCorrection {
    pub t: GnssTime,
    pub iode: u16,
    pub radial: f64,
    pub along: f64,
    pub cross: f64,
    pub clock_c0: f64,
    pub clock_c1: f64,
    pub clock_c2: f64,
    /// Set when a high-rate clock-only update has refreshed just the
    /// clock terms more recently than the orbit terms.
    pub hrclock_t: Option<GnssTime>,
}

#[derive(Debug, Clone, Default)]
pub struct SsrTable {
    slots: HashMap<SV, SsrCorrection>,
}

impl SsrTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, sv: SV, correction: SsrCorrection) {
        self.slots.insert(sv, correction);
    }

    /// Applies a matching, unexpired SSR correction to `base`, returning
    /// `None` (caller keeps the uncorrected state) if no correction is on
    /// file, the IODE does not match the base ephemeris, or it has aged
    /// out.
    pub fn apply(
        &self,
        sv: SV,
        base_iode: u16,
        t: GnssTime,
        base: &SatelliteState,
    ) -> Option<SatelliteState> {
        let corr = self.slots.get(&sv)?;
        if corr.iode != base_iode {
            return None;
        }
        let orbit_age = t.seconds_since(&corr.t);
        if orbit_age.abs() > MAX_AGE_SSR {
            return None;
        }
        let clock_ref = corr.hrclock_t.unwrap_or(corr.t);
        let clock_age = t.seconds_since(&clock_ref);
        let clock_limit = if corr.hrclock_t.is_some() {
            MAX_AGE_SSR_HRCLK
        } else {
            MAX_AGE_SSR
        };
        if clock_age.abs() > clock_limit {
            return None;
        }

        let r = base.position;
        let v = base.velocity;
        let r_norm = (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt();
        let radial_unit = [r[0] / r_norm, r[1] / r_norm, r[2] / r_norm];
        let cross_raw = cross(r, v);
        let cross_norm = (cross_raw[0].powi(2) + cross_raw[1].powi(2) + cross_raw[2].powi(2)).sqrt();
        let cross_unit = [
            cross_raw[0] / cross_norm,
            cross_raw[1] / cross_norm,
            cross_raw[2] / cross_norm,
        ];
        let along_unit = cross(cross_unit, radial_unit);

        let mut position = r;
        for i in 0..3 {
            position[i] -= corr.radial * radial_unit[i]
                + corr.along * along_unit[i]
                + corr.cross * cross_unit[i];
        }

        let clock = base.clock - (corr.clock_c0 + corr.clock_c1 * clock_age + corr.clock_c2 * clock_age * clock_age)
            / crate::constants::SPEED_OF_LIGHT;

        Some(SatelliteState {
            position,
            velocity: base.velocity,
            clock,
            clock_rate: base.clock_rate,
            variance: base.variance,
            health: base.health,
        })
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use gnss::prelude::Constellation;

    fn base_state() -> SatelliteState {
        SatelliteState {
            position: [2.0e7, 1.0e7, 5.0e6],
            velocity: [100.0, -200.0, 300.0],
            clock: 1e-5,
            clock_rate: 1e-12,
            variance: 1.0,
            health: 0,
        }
    }

    #[test]
    fn mismatched_iode_is_ignored() {
        let mut table = SsrTable::new();
        let sv = SV::new(Constellation::GPS, 3);
        let t0 = GnssTime::new(1_000_000_000, 0.0);
        table.update(
            sv,
            SsrCorrection {
                t: t0,
                iode: 1,
                radial: 1.0,
                along: 0.0,
                cross: 0.0,
                clock_c0: 0.0,
                clock_c1: 0.0,
                clock_c2: 0.0,
                hrclock_t: None,
            },
        );
        assert!(table.apply(sv, 2, t0, &base_state()).is_none());
    }

    #[test]
    fn fresh_matching_correction_shifts_radial_position() {
        let mut table = SsrTable::new();
        let sv = SV::new(Constellation::GPS, 3);
        let t0 = GnssTime::new(1_000_000_000, 0.0);
        table.update(
            sv,
            SsrCorrection {
                t: t0,
                iode: 5,
                radial: 2.0,
                along: 0.0,
                cross: 0.0,
                clock_c0: 0.0,
                clock_c1: 0.0,
                clock_c2: 0.0,
                hrclock_t: None,
            },
        );
        let corrected = table.apply(sv, 5, t0, &base_state()).unwrap();
        assert_ne!(corrected.position, base_state().position);
    }

    #[test]
    fn stale_correction_is_rejected() {
        let mut table = SsrTable::new();
        let sv = SV::new(Constellation::GPS, 3);
        let t0 = GnssTime::new(1_000_000_000, 0.0);
        table.update(
            sv,
            SsrCorrection {
                t: t0,
                iode: 5,
                radial: 2.0,
                along: 0.0,
                cross: 0.0,
                clock_c0: 0.0,
                clock_c1: 0.0,
                clock_c2: 0.0,
                hrclock_t: None,
            },
        );
        let t = GnssTime::new(1_000_000_200, 0.0);
        assert!(table.apply(sv, 5, t, &base_state()).is_none());
    }
}
