//! Satellite ephemeris and correction storage, and the single entry point
//! ([Navigation::satellite_state]) the rest of the engine uses to turn a
//! transmission time into an ECEF position/velocity/clock.
pub mod broadcast;
pub mod glonass;
pub mod sbas;
pub mod precise;
pub mod selector;
pub mod ssr;

use crate::context::{Context, EphemerisPreference};
use crate::error::Error;
use crate::observable::Observable;
use broadcast::{BroadcastEphemeris, DataSource};
use glonass::GlonassEphemeris;
use gnss::prelude::{Constellation, GnssTime, SV};
use precise::PreciseTable;
use sbas::{LongTermCorrection, SbasEphemeris};
use selector::select;
use ssr::SsrTable;
use std::collections::HashMap;

/// Position, velocity, clock and health at one instant, the common output
/// shape of every propagation model in this module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteState {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub clock: f64,
    pub clock_rate: f64,
    pub variance: f64,
    /// 0 = healthy, negative = unhealthy/do-not-use.
    pub health: i8,
}

/// Which ephemeris source to evaluate against, from least to most precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EphOpt {
    #[default]
    Broadcast,
    SbasCorrected,
    SsrApc,
    SsrCom,
    Precise,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KlobucharCoefficients {
    pub alpha: [f64; 4],
    pub beta: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtcParameters {
    pub a0: f64,
    pub a1: f64,
    pub t_ref: f64,
    pub week_ref: u16,
    pub leap_seconds: i32,
}

/// Differential code bias between two signals of the same satellite,
/// applied when an SPP/EKF combination mixes codes the broadcast TGD/BGD
/// bank does not already account for.
#[derive(Debug, Clone, Default)]
pub struct DcbTable {
    sat: HashMap<(SV, String, String), f64>,
    /// Receiver-side DCB, applied identically to every satellite of a
    /// constellation tracked with a given code pair.
    receiver: HashMap<(Constellation, String, String), f64>,
}

impl DcbTable {
    pub fn set_satellite(&mut self, sv: SV, a: &Observable, b: &Observable, value_m: f64) {
        self.sat
            .insert((sv, a.as_str().to_string(), b.as_str().to_string()), value_m);
    }
    pub fn satellite(&self, sv: SV, a: &Observable, b: &Observable) -> Option<f64> {
        self.sat
            .get(&(sv, a.as_str().to_string(), b.as_str().to_string()))
            .copied()
    }
    pub fn set_receiver(&mut self, sys: Constellation, a: &Observable, b: &Observable, value_m: f64) {
        self.receiver
            .insert((sys, a.as_str().to_string(), b.as_str().to_string()), value_m);
    }
    pub fn receiver(&self, sys: Constellation, a: &Observable, b: &Observable) -> Option<f64> {
        self.receiver
            .get(&(sys, a.as_str().to_string(), b.as_str().to_string()))
            .copied()
    }
}

/// Phase-center variation, elevation-dependent, one curve per satellite
/// and frequency slot. Stored as a coarse table sampled every 5 degrees
/// from zenith (nadir angle 0) to the edge of Earth visibility; callers
/// interpolate linearly between entries.
#[derive(Debug, Clone, Default)]
pub struct PcvTable {
    curves: HashMap<(SV, usize), Vec<f64>>,
}

impl PcvTable {
    pub fn set_curve(&mut self, sv: SV, freq_slot: usize, samples_5deg: Vec<f64>) {
        self.curves.insert((sv, freq_slot), samples_5deg);
    }
    /// Linear lookup, `nadir_deg` clamped to the stored table's span.
    pub fn correction_m(&self, sv: SV, freq_slot: usize, nadir_deg: f64) -> f64 {
        let Some(curve) = self.curves.get(&(sv, freq_slot)) else {
            return 0.0;
        };
        if curve.is_empty() {
            return 0.0;
        }
        let step = 5.0_f64;
        let idx = (nadir_deg / step).clamp(0.0, (curve.len() - 1) as f64);
        let lo = idx.floor() as usize;
        let hi = (lo + 1).min(curve.len() - 1);
        let frac = idx - lo as f64;
        curve[lo] + frac * (curve[hi] - curve[lo])
    }
}

/// Earth-orientation parameters for a single day: polar motion (x, y)
/// arcseconds and UT1-UTC, seconds. Needed only by the precise branch
/// (broadcast/SSR use the fixed WGS84 rotation rate).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EarthRotationParameters {
    pub x_pole_arcsec: f64,
    pub y_pole_arcsec: f64,
    pub ut1_minus_utc_s: f64,
}

/// All ephemeris/correction state the positioning engine draws from.
/// Callers insert records as they arrive from a RINEX nav file, a
/// real-time correction stream, or an SP3/CLK product; the aggregate does
/// not know or care which.
#[derive(Debug, Clone, Default)]
pub struct Navigation {
    broadcast: HashMap<SV, Vec<BroadcastEphemeris>>,
    glonass: HashMap<SV, Vec<GlonassEphemeris>>,
    sbas: HashMap<SV, Vec<SbasEphemeris>>,
    sbas_corrections: HashMap<SV, LongTermCorrection>,
    precise: PreciseTable,
    ssr: SsrTable,
    klobuchar: HashMap<Constellation, KlobucharCoefficients>,
    utc: HashMap<Constellation, UtcParameters>,
    pub dcb: DcbTable,
    pub pcv: PcvTable,
    pub erp: EarthRotationParameters,
    insertion_counter: u64,
}

impl Navigation {
    pub fn new() -> Self {
        Self {
            precise: PreciseTable::new(900.0),
            ..Default::default()
        }
    }

    fn next_insertion_index(&mut self) -> u64 {
        self.insertion_counter += 1;
        self.insertion_counter
    }

    pub fn insert_broadcast(&mut self, mut eph: BroadcastEphemeris) {
        eph.insertion_index = self.next_insertion_index();
        self.broadcast.entry(eph.sv).or_default().push(eph);
    }

    pub fn insert_glonass(&mut self, mut eph: GlonassEphemeris) {
        eph.insertion_index = self.next_insertion_index();
        self.glonass.entry(eph.sv).or_default().push(eph);
    }

    pub fn insert_sbas(&mut self, mut eph: SbasEphemeris) {
        eph.insertion_index = self.next_insertion_index();
        self.sbas.entry(eph.sv).or_default().push(eph);
    }

    pub fn insert_sbas_correction(&mut self, sv: SV, correction: LongTermCorrection) {
        self.sbas_corrections.insert(sv, correction);
    }

    pub fn precise_mut(&mut self) -> &mut PreciseTable {
        &mut self.precise
    }

    pub fn ssr_mut(&mut self) -> &mut SsrTable {
        &mut self.ssr
    }

    pub fn set_klobuchar(&mut self, sys: Constellation, coeffs: KlobucharCoefficients) {
        self.klobuchar.insert(sys, coeffs);
    }

    pub fn klobuchar(&self, sys: Constellation) -> Option<&KlobucharCoefficients> {
        self.klobuchar.get(&sys)
    }

    pub fn set_utc_parameters(&mut self, sys: Constellation, utc: UtcParameters) {
        self.utc.insert(sys, utc);
    }

    pub fn utc_parameters(&self, sys: Constellation) -> Option<&UtcParameters> {
        self.utc.get(&sys)
    }

    fn select_broadcast(&self, sv: SV, t: GnssTime, ctx: &Context) -> Option<&BroadcastEphemeris> {
        let records = self.broadcast.get(&sv)?;
        let tolerance = crate::constants::max_dtoe(sv.constellation());
        let preference = ctx.preference(sv.constellation());
        select(records.iter(), t, tolerance, None, |r| {
            if sv.constellation() == Constellation::Galileo {
                let wants_fnav = preference == EphemerisPreference::Modernized;
                let is_fnav = r.data_source == DataSource::Fnav;
                if wants_fnav != is_fnav {
                    return false;
                }
            }
            r.aod > 0
        })
    }

    fn select_glonass(&self, sv: SV, t: GnssTime) -> Option<&GlonassEphemeris> {
        let records = self.glonass.get(&sv)?;
        let tolerance = crate::constants::max_dtoe(Constellation::Glonass);
        select(records.iter(), t, tolerance, None, |_| true)
    }

    fn select_sbas(&self, sv: SV, t: GnssTime) -> Option<&SbasEphemeris> {
        let records = self.sbas.get(&sv)?;
        let tolerance = crate::constants::max_dtoe(Constellation::SBAS);
        select(records.iter(), t, tolerance, None, |_| true)
    }

    /// Broadcast group delay (TGD/BGD) for `code`, seconds, drawn from the
    /// ephemeris record [Self::satellite_state] would select for `sv` at
    /// `t`. Falls back to any entry sharing `code`'s frequency band if no
    /// exact match is stored, and to `None` if no ephemeris covers `t` or
    /// it carries no matching entry.
    pub fn group_delay_seconds(&self, sv: SV, t: GnssTime, ctx: &Context, code: &Observable) -> Option<f64> {
        let eph = self.select_broadcast(sv, t, ctx)?;
        eph.group_delays
            .iter()
            .find(|(c, _)| c == code)
            .or_else(|| eph.group_delays.iter().find(|(c, _)| c.band() == code.band()))
            .map(|(_, v)| *v)
    }

    /// Evaluates the best available ephemeris for `sv` at transmission
    /// time `t` under the requested [EphOpt], falling back to
    /// [Error::EphemerisUnavailable] when nothing covers `t`.
    pub fn satellite_state(
        &self,
        sv: SV,
        t: GnssTime,
        ctx: &Context,
        opt: EphOpt,
    ) -> Result<SatelliteState, Error> {
        match opt {
            EphOpt::Precise => {
                let (sample, pos_var, clk_var) = self.precise.interpolate(sv, t)?;
                let velocity = self.precise_velocity(sv, t);
                Ok(SatelliteState {
                    position: sample.position,
                    velocity,
                    clock: sample.clock,
                    clock_rate: 0.0,
                    variance: pos_var.max(clk_var),
                    health: 0,
                })
            },
            _ => self.satellite_state_broadcast_family(sv, t, ctx, opt),
        }
    }

    fn precise_velocity(&self, sv: SV, t: GnssTime) -> [f64; 3] {
        let dt = hifitime::Duration::from_seconds(1.0);
        let after = self.precise.interpolate(sv, t + dt);
        let before = self.precise.interpolate(sv, t - dt);
        match (before, after) {
            (Ok((b, ..)), Ok((a, ..))) => {
                let mut v = [0.0; 3];
                for i in 0..3 {
                    v[i] = (a.position[i] - b.position[i]) / 2.0;
                }
                v
            },
            _ => [0.0; 3],
        }
    }

    fn satellite_state_broadcast_family(
        &self,
        sv: SV,
        t: GnssTime,
        ctx: &Context,
        opt: EphOpt,
    ) -> Result<SatelliteState, Error> {
        let base = match sv.constellation() {
            Constellation::Glonass => {
                let eph = self
                    .select_glonass(sv, t)
                    .ok_or(Error::EphemerisUnavailable(t, sv))?;
                glonass::satellite_state(eph, t)?
            },
            Constellation::SBAS => {
                let eph = self
                    .select_sbas(sv, t)
                    .ok_or(Error::EphemerisUnavailable(t, sv))?;
                let correction = if opt == EphOpt::SbasCorrected {
                    self.sbas_corrections.get(&sv)
                } else {
                    None
                };
                sbas::satellite_state(eph, t, correction)?
            },
            _ => {
                let eph = self
                    .select_broadcast(sv, t, ctx)
                    .ok_or(Error::EphemerisUnavailable(t, sv))?;
                let base = broadcast::satellite_state(eph, t)?;
                if matches!(opt, EphOpt::SsrApc | EphOpt::SsrCom) {
                    return Ok(self.ssr.apply(sv, eph.iode, t, &base).unwrap_or(base));
                }
                base
            },
        };
        Ok(base)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::observable::Observable;
    use std::str::FromStr;

    fn sample_gps_eph(iode: u16, toe_s: i64) -> BroadcastEphemeris {
        BroadcastEphemeris {
            sv: SV::new(Constellation::GPS, 5),
            toe: GnssTime::new(toe_s, 0.0),
            toc: GnssTime::new(toe_s, 0.0),
            sqrt_a: 5153.6,
            delta_a: None,
            a_dot: None,
            ecc: 0.005,
            i0: 0.95,
            omega0: 1.1,
            omega: 0.8,
            m0: 0.2,
            delta_n: 4.3e-9,
            delta_n_dot: None,
            omega_dot: -8.0e-9,
            i_dot: 1.0e-10,
            cuc: 1e-6,
            cus: 1e-6,
            crc: 200.0,
            crs: 5.0,
            cic: 1e-7,
            cis: 1e-7,
            f0: 1e-5,
            f1: 1e-12,
            f2: 0.0,
            group_delays: vec![(Observable::from_str("C1C").unwrap(), 1e-9)],
            iode,
            iodc: iode,
            sva: 0,
            svh: 0,
            data_source: DataSource::Inav,
            aod: 1,
            insertion_index: 0,
        }
    }

    #[test]
    fn unknown_satellite_is_unavailable() {
        let nav = Navigation::new();
        let ctx = Context::default();
        let sv = SV::new(Constellation::GPS, 1);
        let t = GnssTime::new(1_000_000_000, 0.0);
        assert!(matches!(
            nav.satellite_state(sv, t, &ctx, EphOpt::Broadcast),
            Err(Error::EphemerisUnavailable(_, _))
        ));
    }

    #[test]
    fn selects_closest_broadcast_record_on_handover() {
        let mut nav = Navigation::new();
        let ctx = Context::default();
        let t0 = 1_280_880_000_i64;
        nav.insert_broadcast(sample_gps_eph(1, t0));
        nav.insert_broadcast(sample_gps_eph(2, t0 + 7200));
        let sv = SV::new(Constellation::GPS, 5);

        let t = GnssTime::new(t0 + 3000, 0.0);
        let st = nav.satellite_state(sv, t, &ctx, EphOpt::Broadcast);
        assert!(st.is_ok());
    }

    #[test]
    fn ssr_opt_without_correction_falls_back_to_broadcast() {
        let mut nav = Navigation::new();
        let ctx = Context::default();
        let t0 = 1_280_880_000_i64;
        nav.insert_broadcast(sample_gps_eph(7, t0));
        let sv = SV::new(Constellation::GPS, 5);
        let t = GnssTime::new(t0, 0.0);
        let st = nav.satellite_state(sv, t, &ctx, EphOpt::SsrApc).unwrap();
        let plain = nav.satellite_state(sv, t, &ctx, EphOpt::Broadcast).unwrap();
        assert_eq!(st.position, plain.position);
    }
}
