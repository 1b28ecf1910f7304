//! Precise orbit/clock products (SP3-style): a sparse, evenly-sampled
//! table per satellite, interpolated with a Neville polynomial for
//! position and linearly for clock.
use crate::constants::{EXTERR_CLK, EXTERR_EPH, OMEGA_E, SP3_INTERP_HALF_WINDOW};
use crate::error::Error;
use gnss::prelude::{GnssTime, SV};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreciseSample {
    pub t: GnssTime,
    pub position: [f64; 3],
    pub clock: f64,
}

/// Per-satellite, time-ordered precise-orbit samples. Callers insert in
/// increasing `t` order (matches how an SP3 file is read top to bottom);
/// [PreciseTable::nearest_window] binary-searches on that invariant.
#[derive(Debug, Clone, Default)]
pub struct PreciseTable {
    samples: HashMap<SV, Vec<PreciseSample>>,
    sample_interval_s: f64,
}

impl PreciseTable {
    pub fn new(sample_interval_s: f64) -> Self {
        Self {
            samples: HashMap::new(),
            sample_interval_s,
        }
    }

    pub fn insert(&mut self, sv: SV, sample: PreciseSample) {
        self.samples.entry(sv).or_default().push(sample);
    }

    fn nearest_window(&self, sv: SV, t: GnssTime) -> Option<&[PreciseSample]> {
        let series = self.samples.get(&sv)?;
        if series.is_empty() {
            return None;
        }
        let idx = series.partition_point(|s| s.t.seconds_since(&t) < 0.0);
        let half = SP3_INTERP_HALF_WINDOW;
        let lo = idx.saturating_sub(half);
        let hi = (idx + half).min(series.len());
        if hi <= lo {
            return None;
        }
        Some(&series[lo..hi])
    }

    /// Interpolates position at `t` with a Neville polynomial over the
    /// nearest window, correcting each sample's ECEF frame for Earth
    /// rotation during the light-travel time implied by its offset from
    /// `t` (the standard SP3 Sagnac correction), and linearly interpolates
    /// clock. Variance grows with distance outside the sampled span.
    pub fn interpolate(&self, sv: SV, t: GnssTime) -> Result<(PreciseSample, f64, f64), Error> {
        let window = self
            .nearest_window(sv, t)
            .ok_or(Error::EphemerisUnavailable(t, sv))?;
        if window.len() < 2 {
            return Err(Error::EphemerisUnavailable(t, sv));
        }

        let xs: Vec<f64> = window.iter().map(|s| s.t.seconds_since(&t)).collect();
        let mut pos = [0.0; 3];
        for axis in 0..3 {
            let ys: Vec<f64> = window
                .iter()
                .zip(xs.iter())
                .map(|(s, dt)| earth_rotation_correct(s.position, *dt)[axis])
                .collect();
            pos[axis] = neville(&xs, &ys, 0.0);
        }

        // linear clock interpolation between the two bracketing samples
        let (a, b) = bracket(window, &xs);
        let clock = if (b.t.seconds_since(&a.t)).abs() < 1e-9 {
            a.clock
        } else {
            let frac = a.t.seconds_since(&t).abs() / a.t.seconds_since(&b.t).abs();
            a.clock + frac * (b.clock - a.clock)
        };

        let max_gap = xs.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let pos_var = EXTERR_EPH * max_gap * max_gap / 2.0;
        let clk_var = EXTERR_CLK * max_gap;

        Ok((
            PreciseSample {
                t,
                position: pos,
                clock,
            },
            pos_var,
            clk_var,
        ))
    }
}

fn bracket<'a>(window: &'a [PreciseSample], xs: &[f64]) -> (&'a PreciseSample, &'a PreciseSample) {
    let idx = xs.partition_point(|x| *x < 0.0);
    if idx == 0 {
        (&window[0], &window[window.len().min(2) - 1])
    } else if idx >= window.len() {
        (&window[window.len() - 2], &window[window.len() - 1])
    } else {
        (&window[idx - 1], &window[idx])
    }
}

/// Rotates a precise-ephemeris ECEF sample from its own epoch into the
/// evaluation epoch's Earth-fixed frame, correcting for the planet's
/// rotation over the time offset `dt` between the two (positive `dt`
/// means the sample is in the future relative to `t`).
fn earth_rotation_correct(p: [f64; 3], dt: f64) -> [f64; 3] {
    let theta = -OMEGA_E * dt;
    let (s, c) = theta.sin_cos();
    [c * p[0] - s * p[1], s * p[0] + c * p[1], p[2]]
}

/// Neville's algorithm: evaluates the unique degree-(n-1) polynomial
/// through `(xs[i], ys[i])` at `x`.
fn neville(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    let mut p = ys.to_vec();
    for k in 1..n {
        for i in 0..(n - k) {
            p[i] = ((x - xs[i + k]) * p[i] + (xs[i] - x) * p[i + 1]) / (xs[i] - xs[i + k]);
        }
    }
    p[0]
}

#[cfg(test)]
mod test {
    use super::*;
    use gnss::prelude::Constellation;

    fn sv() -> SV {
        SV::new(Constellation::GPS, 12)
    }

    fn build_table() -> PreciseTable {
        let mut table = PreciseTable::new(900.0);
        let sat = sv();
        for i in 0..15 {
            let t = GnssTime::new(1_000_000_000 + i * 900, 0.0);
            table.insert(
                sat,
                PreciseSample {
                    t,
                    position: [2.0e7 + i as f64 * 100.0, 1.0e7, 5.0e6],
                    clock: 1e-6 + i as f64 * 1e-9,
                },
            );
        }
        table
    }

    #[test]
    fn interpolates_between_samples() {
        let table = build_table();
        let t = GnssTime::new(1_000_000_450, 0.0);
        let (sample, pos_var, _clk_var) = table.interpolate(sv(), t).unwrap();
        assert!((sample.position[0] - 2.0e7 - 50.0).abs() < 1.0);
        assert!(pos_var >= 0.0);
    }

    #[test]
    fn missing_satellite_is_unavailable() {
        let table = build_table();
        let other = SV::new(Constellation::Galileo, 1);
        let t = GnssTime::new(1_000_000_450, 0.0);
        assert!(table.interpolate(other, t).is_err());
    }

    #[test]
    fn neville_reproduces_linear_data_exactly() {
        let xs = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let ys = [-4.0, -2.0, 0.0, 2.0, 4.0];
        assert!((neville(&xs, &ys, 0.3) - 0.6).abs() < 1e-9);
    }
}
