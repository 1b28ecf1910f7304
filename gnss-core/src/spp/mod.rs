//! Single-point positioning: iterated weighted least squares over an
//! 8-unknown state (position, receiver clock per tracked constellation,
//! clamped to a max of 5 simultaneous systems) with RAIM fault detection
//! and exclusion.
use crate::config::SppConfig;
use crate::constants::{
    constellation_variance_factor, iono_free_gamma, IONO_FREE_VAR_FACTOR, OMEGA_E, PR_VAR_A,
    PR_VAR_B, PSEUDO_MEAS_WEIGHT, SPEED_OF_LIGHT,
};
use crate::context::Context;
use crate::error::Error;
use crate::navigation::{EphOpt, Navigation, SatelliteState};
use crate::observable::Observable;
use crate::observation::Observation;
use crate::solution::{Solution, SolutionStatus};
use gnss::prelude::{Constellation, GnssTime, SV};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;

/// Fallback iono-free ratio when a constellation/band pair has no entry in
/// the carrier frequency table; the GPS L1/L2 ratio, used only as a last
/// resort so an unrecognized code pair still gets a combination.
const FALLBACK_IONO_FREE_GAMMA: f64 = 1.6469444;

/// One satellite's contribution to a single WLS iteration: geometric
/// range, line-of-sight unit vector, iono-free (or single-frequency plus
/// TGD) corrected pseudorange, and its variance.
#[derive(Clone)]
struct Contribution {
    sv: SV,
    los: [f64; 3],
    observed_minus_geometric: f64,
    variance: f64,
}

/// A converged WLS position/clock fix plus everything the caller needs to
/// assess it or try an alternative satellite set: the contributions and
/// satellite states as evaluated at the converged state, and the ordered
/// list of constellations whose clock unknowns occupy `state[3..]`.
struct WlsFix {
    state: DVector<f64>,
    gdop: f64,
    contributions: Vec<Contribution>,
    sat_states: Vec<SatelliteState>,
    systems: Vec<Constellation>,
}

pub struct SinglePointPositioner {
    cfg: SppConfig,
}

impl SinglePointPositioner {
    pub fn new(cfg: SppConfig) -> Self {
        Self { cfg }
    }

    /// Dual-frequency iono-free combination when two pseudoranges are
    /// available, using the constellation- and band-specific frequency
    /// ratio; otherwise the single tracked pseudorange corrected by the
    /// broadcast group-delay entry matching its code (or its frequency
    /// band, if no exact code match is stored).
    fn corrected_pseudorange(
        &self,
        obs: &Observation,
        nav: &Navigation,
        ctx: &Context,
        t: GnssTime,
    ) -> Option<(f64, f64, usize)> {
        let mut ranges: Vec<(usize, f64, Option<Observable>)> = obs
            .slots()
            .filter_map(|(idx, slot)| slot.pseudorange.map(|pr| (idx, pr, slot.code.clone())))
            .collect();
        ranges.sort_by_key(|(idx, _, _)| *idx);

        if ranges.len() >= 2 {
            let (i1, pr1, code1) = ranges[0].clone();
            let (i2, pr2, code2) = ranges[1].clone();
            let gamma = match (&code1, &code2) {
                (Some(c1), Some(c2)) => {
                    iono_free_gamma(obs.sv.constellation(), c1.band(), c2.band())
                        .unwrap_or(FALLBACK_IONO_FREE_GAMMA)
                },
                _ => FALLBACK_IONO_FREE_GAMMA,
            };
            let iono_free = (gamma * pr1 - pr2) / (gamma - 1.0);
            Some((iono_free, IONO_FREE_VAR_FACTOR, i1.min(i2)))
        } else {
            let (idx, pr, code) = ranges.first()?.clone();
            let correction_m = code
                .as_ref()
                .and_then(|c| nav.group_delay_seconds(obs.sv, t, ctx, c))
                .map(|tgd| tgd * SPEED_OF_LIGHT)
                .unwrap_or(0.0);
            Some((pr - correction_m, 1.0, idx))
        }
    }

    fn elevation_variance(&self, elevation_rad: f64, sys: Constellation) -> f64 {
        let sin_el = elevation_rad.sin().max(0.05);
        let base = PR_VAR_A.powi(2) + (PR_VAR_B / sin_el).powi(2);
        base * constellation_variance_factor(sys)
    }

    /// Runs one epoch of iterated WLS, returning a [Solution] at
    /// [SolutionStatus::Single] on success, or an [Error] describing why
    /// no fix could be produced (too few satellites, poor geometry, a
    /// rank-deficient normal matrix). When RAIM is enabled and the
    /// all-satellite fix fails its chi-square residual test, re-solves
    /// without each satellite in turn and keeps the best-conditioned
    /// exclusion that clears the test, if one exists.
    pub fn solve(
        &self,
        t: GnssTime,
        observations: &[Observation],
        nav: &Navigation,
        ctx: &Context,
    ) -> Result<Solution, Error> {
        let elected: Vec<&Observation> = observations
            .iter()
            .filter(|o| self.corrected_pseudorange(o, nav, ctx, t).is_some())
            .collect();

        if elected.len() < 4 {
            return Err(Error::NotEnoughSatellites(elected.len(), 4));
        }

        let mut fix = self.iterate_wls(t, &elected, nav, ctx)?;
        if fix.gdop > self.cfg.max_gdop {
            return Err(Error::GeometryPoor(t, fix.gdop));
        }

        let mut excluded = Vec::new();
        if self.cfg.raim {
            let n_unknowns = 3 + fix.systems.len();
            let dof = fix.contributions.len() as f64 - n_unknowns as f64;
            let residual = self.weighted_residual_sum(&fix.contributions, &fix.state, &fix.systems);
            if residual > chi_square_quantile(dof, self.cfg.chi2_alpha) {
                if let Some((bad_sv, reason, resolved)) = self.raim_reresolve(t, &elected, nav, ctx)? {
                    excluded.push((bad_sv, reason));
                    fix = resolved;
                }
            }
        }

        let receiver_position = [fix.state[0], fix.state[1], fix.state[2]];
        let velocity = self.velocity_from_doppler(&elected, &fix.contributions, &fix.sat_states, receiver_position);

        let mut clock_offsets = HashMap::new();
        for (i, sys) in fix.systems.iter().enumerate() {
            clock_offsets.insert(*sys, fix.state[3 + i] / SPEED_OF_LIGHT);
        }

        Ok(Solution {
            t,
            position: receiver_position,
            velocity,
            clock_offsets,
            status: SolutionStatus::Single,
            num_satellites: fix.contributions.len(),
            ratio: None,
            position_covariance: [0.0; 6],
            velocity_covariance: [0.0; 6],
            excluded_satellites: excluded,
        })
    }

    /// Iterates the WLS loop to convergence over exactly `elected`,
    /// independent of any other candidate satellite set. Shared by the
    /// main solve and each RAIM leave-one-out re-solve.
    fn iterate_wls(
        &self,
        t: GnssTime,
        elected: &[&Observation],
        nav: &Navigation,
        ctx: &Context,
    ) -> Result<WlsFix, Error> {
        let systems: Vec<Constellation> = {
            let mut s: Vec<Constellation> = elected.iter().map(|o| o.sv.constellation()).collect();
            s.sort_by_key(|c| format!("{c:?}"));
            s.dedup();
            s
        };

        let n_unknowns = 3 + systems.len();
        let mut state = DVector::<f64>::zeros(n_unknowns);

        for _ in 0..self.cfg.max_iter {
            let (contributions, sat_states) = self.build_contributions(t, elected, nav, ctx, &state)?;
            if contributions.len() < 4 {
                return Err(Error::NotEnoughSatellites(contributions.len(), 4));
            }

            let (dx, gdop) = self.wls_step(t, &contributions, &systems, n_unknowns)?;
            state += &dx;
            let converged = dx.rows(0, 3).norm() < self.cfg.convergence_m;

            if converged {
                return Ok(WlsFix {
                    state,
                    gdop,
                    contributions,
                    sat_states,
                    systems,
                });
            }
        }

        Err(Error::RankDeficient(t))
    }

    fn build_contributions(
        &self,
        t: GnssTime,
        observations: &[&Observation],
        nav: &Navigation,
        ctx: &Context,
        state: &DVector<f64>,
    ) -> Result<(Vec<Contribution>, Vec<SatelliteState>), Error> {
        let mut contributions = Vec::new();
        let mut states = Vec::new();
        let receiver_pos = [state[0], state[1], state[2]];

        for obs in observations {
            let Some((pr, var_factor, _)) = self.corrected_pseudorange(obs, nav, ctx, t) else {
                continue;
            };
            // transmission-time iteration: one pass is adequate given the
            // pseudorange's own WLS loop re-evaluates every outer iteration
            let tau = pr / SPEED_OF_LIGHT;
            let t_tx = t - hifitime::Duration::from_seconds(tau);

            let Ok(sat) = nav.satellite_state(obs.sv, t_tx, ctx, EphOpt::Broadcast) else {
                continue;
            };
            if sat.health != 0 {
                continue;
            }

            // Earth-rotation correction during signal transit
            let theta = OMEGA_E * tau;
            let (s, c) = theta.sin_cos();
            let corrected = [
                c * sat.position[0] + s * sat.position[1],
                -s * sat.position[0] + c * sat.position[1],
                sat.position[2],
            ];

            let dx = corrected[0] - receiver_pos[0];
            let dy = corrected[1] - receiver_pos[1];
            let dz = corrected[2] - receiver_pos[2];
            let range = (dx * dx + dy * dy + dz * dz).sqrt();
            if range < 1.0 {
                continue;
            }
            let los = [dx / range, dy / range, dz / range];

            let elevation = elevation_angle(receiver_pos, corrected);
            if elevation.to_degrees() < self.cfg.min_elevation_deg {
                continue;
            }

            let clock_m = sat.clock * SPEED_OF_LIGHT;
            let omc = pr - range + clock_m;
            let variance = self.elevation_variance(elevation, obs.sv.constellation()) * var_factor
                + sat.variance;

            contributions.push(Contribution {
                sv: obs.sv,
                los,
                observed_minus_geometric: omc,
                variance,
            });
            states.push(sat);
        }

        Ok((contributions, states))
    }

    fn wls_step(
        &self,
        t: GnssTime,
        contributions: &[Contribution],
        systems: &[Constellation],
        n_unknowns: usize,
    ) -> Result<(DVector<f64>, f64), Error> {
        let n_meas = contributions.len() + 1; // +1 rank-deficiency pseudo-measurement
        let mut h = DMatrix::<f64>::zeros(n_meas, n_unknowns);
        let mut w = DMatrix::<f64>::zeros(n_meas, n_meas);
        let mut y = DVector::<f64>::zeros(n_meas);

        for (row, c) in contributions.iter().enumerate() {
            h[(row, 0)] = -c.los[0];
            h[(row, 1)] = -c.los[1];
            h[(row, 2)] = -c.los[2];
            let sys_idx = systems.iter().position(|s| *s == c.sv.constellation()).unwrap();
            h[(row, 3 + sys_idx)] = 1.0;
            w[(row, row)] = 1.0 / c.variance;
            y[row] = c.observed_minus_geometric;
        }

        // pseudo-measurement anchoring any clock not observed this pass
        // to zero, avoiding a rank-deficient normal matrix when a system
        // temporarily has no satellites above the mask.
        let last = n_meas - 1;
        h[(last, n_unknowns - 1)] = 1.0;
        w[(last, last)] = 1.0 / PSEUDO_MEAS_WEIGHT;
        y[last] = 0.0;

        let ht_w = h.transpose() * &w;
        let normal = &ht_w * &h;
        let rhs = &ht_w * &y;

        let inv = normal.clone().try_inverse().ok_or(Error::RankDeficient(t))?;
        let dx = &inv * rhs;

        let gdop = (inv[(0, 0)] + inv[(1, 1)] + inv[(2, 2)] + inv[(3, 3)]).max(0.0).sqrt();

        Ok((dx, gdop))
    }

    /// Velocity/clock-drift WLS from Doppler observations sharing an
    /// index with `contributions`/`sat_states`. Uses the same
    /// line-of-sight geometry as the position solve, the satellite clock
    /// drift as a predicted-rate bias, and the Earth-rotation (Sagnac
    /// rate) correction `Ωe/c · (vsat_y·rx + rsat_y·vx − vsat_x·ry −
    /// rsat_x·vy)`. That term itself depends on receiver velocity, so it
    /// is refined over two passes starting from a zero-velocity prior
    /// rather than solved jointly. Falls back to zero velocity when
    /// fewer than four satellites report Doppler.
    fn velocity_from_doppler(
        &self,
        observations: &[&Observation],
        contributions: &[Contribution],
        sat_states: &[SatelliteState],
        receiver_position: [f64; 3],
    ) -> [f64; 3] {
        const GPS_L1_WAVELENGTH_M: f64 = SPEED_OF_LIGHT / 1.57542e9;

        struct DopplerRow {
            los: [f64; 3],
            sat_position: [f64; 3],
            sat_velocity: [f64; 3],
            range_rate: f64,
        }

        let mut rows = Vec::new();
        for (c, sat) in contributions.iter().zip(sat_states.iter()) {
            let Some(obs) = observations.iter().find(|o| o.sv == c.sv) else {
                continue;
            };
            let Some((_, doppler)) = obs
                .slots()
                .find_map(|(idx, slot)| slot.doppler.map(|d| (idx, d)))
            else {
                continue;
            };
            let range_rate = -doppler * GPS_L1_WAVELENGTH_M + sat.clock_rate * SPEED_OF_LIGHT;
            rows.push(DopplerRow {
                los: c.los,
                sat_position: sat.position,
                sat_velocity: sat.velocity,
                range_rate,
            });
        }

        if rows.len() < 4 {
            return [0.0, 0.0, 0.0];
        }

        let n = rows.len();
        let mut receiver_velocity = [0.0; 3];
        for _ in 0..2 {
            let mut h = DMatrix::<f64>::zeros(n, 4);
            let mut y = DVector::<f64>::zeros(n);
            for (row, r) in rows.iter().enumerate() {
                let sat_radial_rate =
                    r.los[0] * r.sat_velocity[0] + r.los[1] * r.sat_velocity[1] + r.los[2] * r.sat_velocity[2];
                let earth_rotation = OMEGA_E / SPEED_OF_LIGHT
                    * (r.sat_velocity[1] * receiver_position[0] + r.sat_position[1] * receiver_velocity[0]
                        - r.sat_velocity[0] * receiver_position[1]
                        - r.sat_position[0] * receiver_velocity[1]);
                h[(row, 0)] = -r.los[0];
                h[(row, 1)] = -r.los[1];
                h[(row, 2)] = -r.los[2];
                h[(row, 3)] = 1.0;
                y[row] = r.range_rate - sat_radial_rate - earth_rotation;
            }

            let ht = h.transpose();
            let normal = &ht * &h;
            let Some(inv) = normal.try_inverse() else {
                return [0.0, 0.0, 0.0];
            };
            let sol = inv * (&ht * &y);
            receiver_velocity = [sol[0], sol[1], sol[2]];
        }

        receiver_velocity
    }

    /// Leave-one-out RAIM: re-solves the WLS with each satellite dropped
    /// in turn and returns the excluded satellite, a diagnostic reason,
    /// and the re-solved fix for the candidate with the lowest post-fit
    /// residual RMS among those that keep at least five satellites, stay
    /// under the GDOP ceiling, and clear the chi-square test. Returns
    /// `None` if too few satellites remain to attempt an exclusion or no
    /// candidate clears the test.
    fn raim_reresolve(
        &self,
        t: GnssTime,
        elected: &[&Observation],
        nav: &Navigation,
        ctx: &Context,
    ) -> Result<Option<(SV, String, WlsFix)>, Error> {
        if elected.len() < 6 {
            return Ok(None);
        }

        let mut best: Option<(SV, f64, WlsFix)> = None;
        for i in 0..elected.len() {
            let candidate_obs: Vec<&Observation> = elected
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, o)| *o)
                .collect();
            let Ok(candidate) = self.iterate_wls(t, &candidate_obs, nav, ctx) else {
                continue;
            };
            if candidate.contributions.len() < 5 || candidate.gdop > self.cfg.max_gdop {
                continue;
            }

            let n_unknowns = 3 + candidate.systems.len();
            let dof = candidate.contributions.len() as f64 - n_unknowns as f64;
            let residual = self.weighted_residual_sum(&candidate.contributions, &candidate.state, &candidate.systems);
            if residual > chi_square_quantile(dof, self.cfg.chi2_alpha) {
                continue;
            }

            let rms = (residual / candidate.contributions.len() as f64).sqrt();
            if best.as_ref().map(|(_, best_rms, _)| rms < *best_rms).unwrap_or(true) {
                best = Some((elected[i].sv, rms, candidate));
            }
        }

        Ok(best.map(|(sv, _, candidate)| (sv, "RAIM: excluded to clear chi-square test".to_string(), candidate)))
    }

    fn weighted_residual_sum(
        &self,
        contributions: &[Contribution],
        state: &DVector<f64>,
        systems: &[Constellation],
    ) -> f64 {
        let mut sum = 0.0;
        for c in contributions {
            let sys_idx = systems.iter().position(|s| *s == c.sv.constellation());
            let clock = sys_idx.map(|i| state[3 + i]).unwrap_or(0.0);
            let residual = c.observed_minus_geometric - clock;
            sum += residual * residual / c.variance;
        }
        sum
    }
}

fn elevation_angle(receiver_ecef: [f64; 3], sat_ecef: [f64; 3]) -> f64 {
    let r = receiver_ecef;
    let norm = (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt();
    if norm < 1.0 {
        return std::f64::consts::FRAC_PI_2;
    }
    let up = [r[0] / norm, r[1] / norm, r[2] / norm];
    let dx = sat_ecef[0] - r[0];
    let dy = sat_ecef[1] - r[1];
    let dz = sat_ecef[2] - r[2];
    let range = (dx * dx + dy * dy + dz * dz).sqrt();
    let cos_zenith = (dx * up[0] + dy * up[1] + dz * up[2]) / range;
    std::f64::consts::FRAC_PI_2 - cos_zenith.clamp(-1.0, 1.0).acos()
}

/// Coarse chi-square upper quantile via a Wilson-Hilferty approximation,
/// adequate for the RAIM gate (which only needs a defensible threshold,
/// not table-exact quantiles).
fn chi_square_quantile(dof: f64, alpha: f64) -> f64 {
    if dof <= 0.0 {
        return f64::INFINITY;
    }
    let z = inverse_normal_cdf(1.0 - alpha);
    let term = 1.0 - 2.0 / (9.0 * dof) + z * (2.0 / (9.0 * dof)).sqrt();
    dof * term.powi(3)
}

/// Acklam's rational approximation to the standard normal inverse CDF.
fn inverse_normal_cdf(p: f64) -> f64 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    let a = [-3.969683028665376e+01, 2.209460984245205e+02, -2.759285104469687e+02, 1.383577518672690e+02, -3.066479806614716e+01, 2.506628277459239e+00];
    let b = [-5.447609879822406e+01, 1.615858368580409e+02, -1.556989798598866e+02, 6.680131188771972e+01, -1.328068155288572e+01];
    let c = [-7.784894002430293e-03, -3.223964580411365e-01, -2.400758277161838e+00, -2.549732539343734e+00, 4.374664141464968e+00, 2.938163982698783e+00];
    let d = [7.784695709041462e-03, 3.224671290700398e-01, 2.445134137142996e+00, 3.754408661907416e+00];

    let p_low = 0.02425;
    if p < p_low {
        let q = (-2.0 * p.ln()).sqrt();
        (((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    } else if p <= 1.0 - p_low {
        let q = p - 0.5;
        let r = q * q;
        (((((a[0] * r + a[1]) * r + a[2]) * r + a[3]) * r + a[4]) * r + a[5]) * q
            / (((((b[0] * r + b[1]) * r + b[2]) * r + b[3]) * r + b[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::navigation::broadcast::{BroadcastEphemeris, DataSource};
    use crate::observation::SlotData;
    use std::str::FromStr;

    fn eph_overhead(sv: SV, toe: GnssTime) -> BroadcastEphemeris {
        BroadcastEphemeris {
            sv,
            toe,
            toc: toe,
            sqrt_a: 5153.6,
            delta_a: None,
            a_dot: None,
            ecc: 0.001,
            i0: 0.0,
            omega0: 0.0,
            omega: 0.0,
            m0: 0.0,
            delta_n: 0.0,
            delta_n_dot: None,
            omega_dot: 0.0,
            i_dot: 0.0,
            cuc: 0.0,
            cus: 0.0,
            crc: 0.0,
            crs: 0.0,
            cic: 0.0,
            cis: 0.0,
            f0: 0.0,
            f1: 0.0,
            f2: 0.0,
            group_delays: vec![(Observable::from_str("C1C").unwrap(), 5e-9)],
            iode: 1,
            iodc: 1,
            sva: 0,
            svh: 0,
            data_source: DataSource::Inav,
            aod: 1,
            insertion_index: 0,
        }
    }

    #[test]
    fn too_few_satellites_is_rejected() {
        let spp = SinglePointPositioner::new(SppConfig::default());
        let nav = Navigation::new();
        let ctx = Context::default();
        let t = GnssTime::new(1_000_000_000, 0.0);
        let mut obs = Observation::new(t, SV::new(Constellation::GPS, 1));
        obs.set_slot(
            0,
            SlotData {
                pseudorange: Some(2.1e7),
                code: Some(Observable::from_str("C1C").unwrap()),
                ..Default::default()
            },
        );
        let result = spp.solve(t, &[obs], &nav, &ctx);
        assert!(matches!(result, Err(Error::NotEnoughSatellites(1, 4))));
    }

    #[test]
    fn unhealthy_and_low_satellites_are_filtered_before_the_four_satellite_floor() {
        let mut nav = Navigation::new();
        let t = GnssTime::new(1_000_000_000, 0.0);
        let mut eph = eph_overhead(SV::new(Constellation::GPS, 3), t);
        eph.svh = 1;
        nav.insert_broadcast(eph);
        let ctx = Context::default();

        assert!(nav
            .satellite_state(SV::new(Constellation::GPS, 3), t, &ctx, EphOpt::Broadcast)
            .unwrap()
            .health
            != 0);
    }

    #[test]
    fn single_frequency_pseudorange_is_corrected_by_broadcast_group_delay() {
        let spp = SinglePointPositioner::new(SppConfig::default());
        let mut nav = Navigation::new();
        let sv = SV::new(Constellation::GPS, 3);
        let t = GnssTime::new(1_000_000_000, 0.0);
        nav.insert_broadcast(eph_overhead(sv, t));
        let ctx = Context::default();

        let mut obs = Observation::new(t, sv);
        obs.set_slot(
            0,
            SlotData {
                pseudorange: Some(2.1e7),
                code: Some(Observable::from_str("C1C").unwrap()),
                ..Default::default()
            },
        );

        let (pr, _, _) = spp.corrected_pseudorange(&obs, &nav, &ctx, t).unwrap();
        assert!((pr - (2.1e7 - 5e-9 * SPEED_OF_LIGHT)).abs() < 1e-6);
    }

    #[test]
    fn dual_frequency_combination_uses_constellation_specific_gamma() {
        let spp = SinglePointPositioner::new(SppConfig::default());
        let nav = Navigation::new();
        let ctx = Context::default();
        let t = GnssTime::new(1_000_000_000, 0.0);
        let sv = SV::new(Constellation::Galileo, 7);

        let mut obs = Observation::new(t, sv);
        obs.set_slot(
            0,
            SlotData {
                pseudorange: Some(2.1e7),
                code: Some(Observable::from_str("C1C").unwrap()),
                ..Default::default()
            },
        );
        obs.set_slot(
            1,
            SlotData {
                pseudorange: Some(2.1e7 + 12.0),
                code: Some(Observable::from_str("C7Q").unwrap()),
                ..Default::default()
            },
        );

        let (pr, _, _) = spp.corrected_pseudorange(&obs, &nav, &ctx, t).unwrap();
        let gamma = iono_free_gamma(Constellation::Galileo, '1', '7').unwrap();
        assert!((gamma - FALLBACK_IONO_FREE_GAMMA).abs() > 1e-3);
        let expected = (gamma * 2.1e7 - (2.1e7 + 12.0)) / (gamma - 1.0);
        assert!((pr - expected).abs() < 1e-6);
    }

    #[test]
    fn elevation_angle_is_quarter_turn_for_point_directly_overhead() {
        let receiver = [6_378_137.0, 0.0, 0.0];
        let overhead = [26_560_000.0, 0.0, 0.0];
        let elevation = elevation_angle(receiver, overhead);
        assert!((elevation - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn elevation_angle_is_near_zero_at_the_horizon() {
        let receiver = [6_378_137.0, 0.0, 0.0];
        // a point far along the local tangent plane, same distance from
        // Earth's center as the receiver: a horizon-grazing geometry
        let horizon = [6_378_137.0, 26_000_000.0, 0.0];
        let elevation = elevation_angle(receiver, horizon);
        assert!(elevation.abs() < 0.05);
    }

    #[test]
    fn chi_square_quantile_grows_with_degrees_of_freedom() {
        let low_dof = chi_square_quantile(2.0, 0.01);
        let high_dof = chi_square_quantile(20.0, 0.01);
        assert!(high_dof > low_dof);
    }

    #[test]
    fn inverse_normal_cdf_is_zero_at_the_median() {
        assert!(inverse_normal_cdf(0.5).abs() < 1e-6);
        assert!(inverse_normal_cdf(0.975) > 1.9);
    }

    fn contribution(sv: SV, los: [f64; 3], omc: f64) -> Contribution {
        Contribution {
            sv,
            los,
            observed_minus_geometric: omc,
            variance: 4.0,
        }
    }

    #[test]
    fn excluding_the_corrupted_satellite_clears_the_chi_square_gate() {
        let spp = SinglePointPositioner::new(SppConfig::default());
        let systems = vec![Constellation::GPS];
        let state = DVector::<f64>::zeros(4);

        // Five well-conditioned measurements plus a sixth corrupted by a
        // 200 m pseudorange bias, the shape of a RAIM fault-exclusion case.
        let good: Vec<Contribution> = (0..5)
            .map(|i| contribution(SV::new(Constellation::GPS, i + 1), [1.0, 0.0, 0.0], 0.1 * i as f64))
            .collect();
        let mut all = good.clone();
        all.push(contribution(SV::new(Constellation::GPS, 6), [1.0, 0.0, 0.0], 200.0));

        let full_residual = spp.weighted_residual_sum(&all, &state, &systems);
        let good_residual = spp.weighted_residual_sum(&good, &state, &systems);

        let dof_full = all.len() as f64 - 4.0;
        let dof_good = good.len() as f64 - 4.0;
        assert!(full_residual > chi_square_quantile(dof_full, 0.01));
        assert!(good_residual <= chi_square_quantile(dof_good, 0.01));
    }
}
