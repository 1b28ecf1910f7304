//! Broadcast (Kepler) ephemeris and propagation.
use crate::constants::*;
use crate::error::Error;
use crate::navigation::selector::Selectable;
use crate::navigation::SatelliteState;
use gnss::prelude::{Constellation, GnssTime, SV};
use log::{trace, warn};

/// Galileo broadcasts two independent navigation messages; a record is
/// tagged with which one it came from so the selector can honor the
/// operating [crate::context::EphemerisPreference].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Inav,
    Fnav,
}

/// Parametrized Kepler broadcast ephemeris, spanning GPS/QZSS/Galileo/
/// BeiDou/IRNSS (GLONASS and SBAS use the state-vector form, see
/// [crate::navigation::glonass] / [crate::navigation::sbas]).
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEphemeris {
    pub sv: SV,
    pub toe: GnssTime,
    pub toc: GnssTime,
    pub sqrt_a: f64,
    /// BDS-3 B1C/B2a reference semi-major axis delta, applied as
    /// `a_ref + delta_a + a_dot * tk` when `Some`.
    pub delta_a: Option<f64>,
    pub a_dot: Option<f64>,
    pub ecc: f64,
    pub i0: f64,
    pub omega0: f64,
    pub omega: f64,
    pub m0: f64,
    pub delta_n: f64,
    /// BDS-3 mean-motion rate correction: `delta_n + 0.5 * delta_n_dot * tk`.
    pub delta_n_dot: Option<f64>,
    pub omega_dot: f64,
    pub i_dot: f64,
    pub cuc: f64,
    pub cus: f64,
    pub crc: f64,
    pub crs: f64,
    pub cic: f64,
    pub cis: f64,
    /// Clock polynomial: bias (s), drift (s/s), drift-rate (s/s^2).
    pub f0: f64,
    pub f1: f64,
    pub f2: f64,
    /// Per-signal group delay terms (TGD/BGD bank, one entry per signal).
    pub group_delays: Vec<(crate::observable::Observable, f64)>,
    pub iode: u16,
    pub iodc: u16,
    /// SV accuracy index (URA); mapped to a variance by [sva_to_variance].
    pub sva: u8,
    pub svh: u8,
    pub data_source: DataSource,
    /// Galileo age-of-data; records with `aod <= 0` are ephemerides "from
    /// the future" and are rejected by the selector.
    pub aod: i32,
    pub insertion_index: u64,
}

impl Selectable for BroadcastEphemeris {
    fn toe(&self) -> GnssTime {
        self.toe
    }
    fn iode(&self) -> Option<u16> {
        Some(self.iode)
    }
    fn insertion_index(&self) -> u64 {
        self.insertion_index
    }
}

/// Maps the broadcast SV-accuracy index to a 1-sigma-squared variance, m^2.
/// The RTCM/RINEX URA table is a short lookup; unlisted/invalid indices
/// fall back to [STD_BRDCCLK] squared, matching the conservative failure
/// mode for an ephemeris that cannot otherwise be trusted.
pub fn sva_to_variance(sva: u8) -> f64 {
    const URA_M: [f64; 16] = [
        2.4, 3.4, 4.85, 6.85, 9.65, 13.65, 24.0, 48.0, 96.0, 192.0, 384.0, 768.0, 1536.0, 3072.0,
        6144.0, STD_BRDCCLK,
    ];
    let m = URA_M.get(sva as usize).copied().unwrap_or(STD_BRDCCLK);
    m * m
}

/// Solves Kepler's equation `E - e*sin(E) = M` by Newton iteration.
/// Returns `None` on non-convergence (the caller treats this as "fail silently,
/// return zero state"); the caller maps that to [Error::IntegratorDiverged].
fn eccentric_anomaly(m: f64, ecc: f64) -> Option<f64> {
    let mut e = m;
    for _ in 0..KEPLER_MAX_ITER {
        let d = (e - ecc * e.sin() - m) / (1.0 - ecc * e.cos());
        e -= d;
        if d.abs() < KEPLER_TOLERANCE {
            return Some(e);
        }
    }
    None
}

fn is_bds_geo(prn: u8) -> bool {
    prn <= 5 || prn >= 59
}

/// Propagates a broadcast ephemeris to transmission time `t_tx`, returning
/// ECEF position/velocity, clock bias+rate (including relativity
/// correction), the published variance, and SV health.
pub fn satellite_state(
    eph: &BroadcastEphemeris,
    t_tx: GnssTime,
) -> Result<SatelliteState, Error> {
    let sys = eph.sv.constellation();
    let mu = earth_mu(sys);

    let mut tk = t_tx.seconds_since(&eph.toe);
    // half-week wrap, standard for GPS/GAL/BDS/QZS/IRN Kepler ephemeris
    let half_week = 302_400.0;
    if tk > half_week {
        tk -= 2.0 * half_week;
    } else if tk < -half_week {
        tk += 2.0 * half_week;
    }

    let a = match (eph.delta_a, eph.a_dot) {
        (Some(delta_a), Some(a_dot)) => {
            let a_ref = eph.sqrt_a * eph.sqrt_a;
            a_ref + delta_a + a_dot * tk
        },
        _ => eph.sqrt_a * eph.sqrt_a,
    };
    let n0 = (mu / a.powi(3)).sqrt();
    let n = match eph.delta_n_dot {
        Some(dn_dot) => n0 + eph.delta_n + 0.5 * dn_dot * tk,
        None => n0 + eph.delta_n,
    };
    let m = eph.m0 + n * tk;

    let e = match eccentric_anomaly(m, eph.ecc) {
        Some(e) => e,
        None => {
            warn!("{}: Kepler solver diverged @ {:?}", eph.sv, t_tx);
            return Err(Error::IntegratorDiverged(t_tx, eph.sv));
        },
    };

    let v = ((1.0 - eph.ecc * eph.ecc).sqrt() * e.sin()).atan2(e.cos() - eph.ecc);
    let phi = v + eph.omega;
    let two_phi = 2.0 * phi;
    let du = eph.cus * two_phi.sin() + eph.cuc * two_phi.cos();
    let dr = eph.crs * two_phi.sin() + eph.crc * two_phi.cos();
    let di = eph.cis * two_phi.sin() + eph.cic * two_phi.cos();

    let u = phi + du;
    let r = a * (1.0 - eph.ecc * e.cos()) + dr;
    let i = eph.i0 + eph.i_dot * tk + di;

    let xp = r * u.cos();
    let yp = r * u.sin();

    let omega = eph.omega0 + (eph.omega_dot - OMEGA_E) * tk - OMEGA_E * tow_of(eph.toe);

    let (sin_o, cos_o) = omega.sin_cos();
    let (sin_i, cos_i) = i.sin_cos();

    let mut x = xp * cos_o - yp * cos_i * sin_o;
    let mut y = xp * sin_o + yp * cos_i * cos_o;
    let mut z = yp * sin_i;

    if sys == Constellation::BeiDou && is_bds_geo(eph.sv.prn()) {
        let (x_r, y_r, z_r) = bds_geo_frame_rotation(x, y, z, tk);
        x = x_r;
        y = y_r;
        z = z_r;
    }

    // velocity via numeric differentiation is avoided; use analytic rates
    let e_dot = n / (1.0 - eph.ecc * e.cos());
    let v_dot = e_dot * (1.0 + eph.ecc * v.cos()) * (1.0 - eph.ecc * e.cos()).recip()
        * (1.0 - eph.ecc * eph.ecc).sqrt();
    let u_dot = v_dot
        + 2.0 * v_dot * (eph.cus * two_phi.cos() - eph.cuc * two_phi.sin());
    let r_dot = a * eph.ecc * e.sin() * e_dot
        + 2.0 * v_dot * (eph.crs * two_phi.cos() - eph.crc * two_phi.sin());
    let i_dot_total = eph.i_dot + 2.0 * v_dot * (eph.cis * two_phi.cos() - eph.cic * two_phi.sin());
    let omega_dot_total = eph.omega_dot - OMEGA_E;

    let xp_dot = r_dot * u.cos() - r * u_dot * u.sin();
    let yp_dot = r_dot * u.sin() + r * u_dot * u.cos();

    let vx = xp_dot * cos_o - yp_dot * cos_i * sin_o + yp * sin_i * sin_o * i_dot_total
        - (xp * sin_o + yp * cos_i * cos_o) * omega_dot_total;
    let vy = xp_dot * sin_o + yp_dot * cos_i * cos_o - yp * sin_i * cos_o * i_dot_total
        + (xp * cos_o - yp * cos_i * sin_o) * omega_dot_total;
    let vz = yp_dot * sin_i + yp * cos_i * i_dot_total;

    // clock: polynomial plus relativity correction
    let dtc = t_tx.seconds_since(&eph.toc);
    let clock_poly = eph.f0 + eph.f1 * dtc + eph.f2 * dtc * dtc;
    let relativity = -2.0 * (mu * a).sqrt() * eph.ecc * e.sin() / (SPEED_OF_LIGHT * SPEED_OF_LIGHT);
    let clock = clock_poly + relativity;
    let clock_rate = eph.f1 + 2.0 * eph.f2 * dtc;

    trace!(
        "{}: kepler state @ {:?}: r=({:.1},{:.1},{:.1}) clk={:.3e}",
        eph.sv,
        t_tx,
        x,
        y,
        z,
        clock
    );

    Ok(SatelliteState {
        position: [x, y, z],
        velocity: [vx, vy, vz],
        clock,
        clock_rate,
        variance: sva_to_variance(eph.sva),
        health: if eph.svh == 0 { 0 } else { -1 },
    })
}

/// Tilts a BDS GEO position by -5 degrees about X, then by `Omega_e * tk`
/// about Z, applied after standard Kepler propagation.
fn bds_geo_frame_rotation(x: f64, y: f64, z: f64, tk: f64) -> (f64, f64, f64) {
    let (sx, cx) = BDS_GEO_TILT_RAD.sin_cos();
    // rotate -5 deg about X
    let x1 = x;
    let y1 = cx * y + sx * z;
    let z1 = -sx * y + cx * z;

    // rotate Omega_e * tk about Z
    let theta = OMEGA_E * tk;
    let (st, ct) = theta.sin_cos();
    let x2 = ct * x1 + st * y1;
    let y2 = -st * x1 + ct * y1;
    let z2 = z1;
    (x2, y2, z2)
}

/// Seconds-of-week component of a GPST-like time, used in the Sagnac
/// (Earth-rotation) correction term of the orbital-plane->ECEF rotation.
fn tow_of(t: GnssTime) -> f64 {
    let (sec, frac) = t.gpst_seconds();
    ((sec % 604_800) as f64) + frac
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::observable::Observable;
    use gnss::prelude::Constellation;
    use std::str::FromStr;

    fn sample_gps_eph() -> BroadcastEphemeris {
        // Representative GPS L1 C/A broadcast ephemeris, roughly matching
        // a mid-altitude MEO orbit (a ~ 26560 km).
        BroadcastEphemeris {
            sv: SV::new(Constellation::GPS, 5),
            toe: GnssTime::new(1_280_880_000, 0.0),
            toc: GnssTime::new(1_280_880_000, 0.0),
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
            iode: 42,
            iodc: 42,
            sva: 0,
            svh: 0,
            data_source: DataSource::Inav,
            aod: 1,
            insertion_index: 0,
        }
    }

    #[test]
    fn propagation_near_toe_returns_mid_orbit_radius() {
        let eph = sample_gps_eph();
        let t = eph.toe;
        let st = satellite_state(&eph, t).unwrap();
        let r = (st.position[0].powi(2) + st.position[1].powi(2) + st.position[2].powi(2)).sqrt();
        // GPS MEO orbital radius is approximately 26,560 km.
        assert!((r - 2.656e7).abs() < 5e4, "r={r}");
        assert_eq!(st.health, 0);
    }

    #[test]
    fn unhealthy_sv_is_flagged() {
        let mut eph = sample_gps_eph();
        eph.svh = 1;
        let st = satellite_state(&eph, eph.toe).unwrap();
        assert_eq!(st.health, -1);
    }

    #[test]
    fn kepler_converges_for_low_eccentricity_corpus() {
        for e in [0.0, 0.001, 0.01, 0.02, 0.03] {
            let mut eph = sample_gps_eph();
            eph.ecc = e;
            assert!(satellite_state(&eph, eph.toe).is_ok(), "e={e}");
        }
    }
}
