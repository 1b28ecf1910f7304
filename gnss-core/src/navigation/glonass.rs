//! GLONASS state-vector ephemeris: position, velocity and luni-solar
//! acceleration at a reference epoch, propagated by numeric integration
//! rather than a Kepler closed form.
use crate::constants::{EARTH_RADIUS_GLO, J2_GLO, OMEGA_E};
use crate::error::Error;
use crate::navigation::selector::Selectable;
use crate::navigation::SatelliteState;
use gnss::prelude::{GnssTime, SV};
use log::warn;

/// Integration step, seconds. Matches the granularity GLONASS broadcast
/// messages are issued at (30s) divided down for stability.
const RK4_STEP_S: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub acceleration: [f64; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlonassEphemeris {
    pub sv: SV,
    pub toe: GnssTime,
    pub state: StateVector,
    /// Clock bias (tau_n) and relative frequency offset (gamma_n).
    pub tau_n: f64,
    pub gamma_n: f64,
    pub health: u8,
    /// Frequency channel number, -7..=13.
    pub freq_channel: i8,
    pub insertion_index: u64,
}

impl Selectable for GlonassEphemeris {
    fn toe(&self) -> GnssTime {
        self.toe
    }
    fn iode(&self) -> Option<u16> {
        None
    }
    fn insertion_index(&self) -> u64 {
        self.insertion_index
    }
}

/// Right-hand side of the PZ-90 equation of motion: central gravity plus
/// J2 oblateness plus the given luni-solar perturbation, in the
/// Earth-fixed rotating frame (Coriolis/centripetal terms included).
fn accel(pos: [f64; 3], vel: [f64; 3], luni_solar: [f64; 3]) -> [f64; 3] {
    let mu = 3.9860044e14;
    let [x, y, z] = pos;
    let r2 = x * x + y * y + z * z;
    let r = r2.sqrt();
    let r5 = r2 * r2 * r;

    let re_r2 = (EARTH_RADIUS_GLO / r).powi(2);
    let common = 1.5 * J2_GLO * re_r2;
    let z2_r2 = z * z / r2;

    let mu_r3 = mu / (r2 * r);
    let ax = -mu_r3 * x * (1.0 - common * (5.0 * z2_r2 - 1.0)) + OMEGA_E * OMEGA_E * x
        + 2.0 * OMEGA_E * vel[1]
        + luni_solar[0];
    let ay = -mu_r3 * y * (1.0 - common * (5.0 * z2_r2 - 1.0)) + OMEGA_E * OMEGA_E * y
        - 2.0 * OMEGA_E * vel[0]
        + luni_solar[1];
    let az = -mu_r3 * z * (1.0 - common * (5.0 * z2_r2 - 3.0)) + luni_solar[2];

    let _ = r5;
    [ax, ay, az]
}

fn derivative(y: &[f64; 6], luni_solar: [f64; 3]) -> [f64; 6] {
    let pos = [y[0], y[1], y[2]];
    let vel = [y[3], y[4], y[5]];
    let a = accel(pos, vel, luni_solar);
    [vel[0], vel[1], vel[2], a[0], a[1], a[2]]
}

fn rk4_step(y: &[f64; 6], h: f64, luni_solar: [f64; 3]) -> [f64; 6] {
    let k1 = derivative(y, luni_solar);
    let mut y2 = *y;
    for i in 0..6 {
        y2[i] += 0.5 * h * k1[i];
    }
    let k2 = derivative(&y2, luni_solar);
    let mut y3 = *y;
    for i in 0..6 {
        y3[i] += 0.5 * h * k2[i];
    }
    let k3 = derivative(&y3, luni_solar);
    let mut y4 = *y;
    for i in 0..6 {
        y4[i] += h * k3[i];
    }
    let k4 = derivative(&y4, luni_solar);
    let mut out = *y;
    for i in 0..6 {
        out[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
    out
}

/// Integrates a GLONASS state vector from its reference epoch to `t`,
/// returning ECEF position/velocity and a clock correction linear in the
/// propagation time.
pub fn satellite_state(eph: &GlonassEphemeris, t: GnssTime) -> Result<SatelliteState, Error> {
    let dt = t.seconds_since(&eph.toe);
    if dt.abs() > 1800.0 {
        warn!("{}: GLONASS propagation {}s beyond reference epoch", eph.sv, dt);
    }

    let mut y = [
        eph.state.position[0],
        eph.state.position[1],
        eph.state.position[2],
        eph.state.velocity[0],
        eph.state.velocity[1],
        eph.state.velocity[2],
    ];

    const MAX_STEPS: u32 = 240;
    let n_steps = if dt == 0.0 {
        0
    } else {
        (dt.abs() / RK4_STEP_S).ceil().max(1.0) as u32
    };
    if n_steps > MAX_STEPS {
        return Err(Error::IntegratorDiverged(t, eph.sv));
    }
    let h = if n_steps == 0 { 0.0 } else { dt / n_steps as f64 };
    for _ in 0..n_steps {
        y = rk4_step(&y, h, eph.state.acceleration);
    }

    let clock = -eph.tau_n + eph.gamma_n * dt;

    Ok(SatelliteState {
        position: [y[0], y[1], y[2]],
        velocity: [y[3], y[4], y[5]],
        clock,
        clock_rate: eph.gamma_n,
        variance: crate::constants::STD_BRDCCLK * crate::constants::STD_BRDCCLK,
        health: if eph.health == 0 { 0 } else { -1 },
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use gnss::prelude::Constellation;

    fn sample() -> GlonassEphemeris {
        GlonassEphemeris {
            sv: SV::new(Constellation::Glonass, 3),
            toe: GnssTime::new(1_280_880_000, 0.0),
            state: StateVector {
                position: [1.0e7, 1.8e7, 1.2e7],
                velocity: [-1500.0, 1200.0, -2200.0],
                acceleration: [1e-7, -2e-7, 3e-7],
            },
            tau_n: 1e-5,
            gamma_n: 1e-12,
            health: 0,
            freq_channel: 3,
            insertion_index: 0,
        }
    }

    #[test]
    fn zero_dt_returns_reference_state_unperturbed() {
        let eph = sample();
        let st = satellite_state(&eph, eph.toe).unwrap();
        assert_eq!(st.position, eph.state.position);
        assert_eq!(st.velocity, eph.state.velocity);
    }

    #[test]
    fn short_propagation_stays_near_reference_orbit() {
        let eph = sample();
        let t = eph.toe + hifitime::Duration::from_seconds(300.0);
        let st = satellite_state(&eph, t).unwrap();
        let r0 = (eph.state.position[0].powi(2)
            + eph.state.position[1].powi(2)
            + eph.state.position[2].powi(2))
        .sqrt();
        let r1 = (st.position[0].powi(2) + st.position[1].powi(2) + st.position[2].powi(2)).sqrt();
        assert!((r1 - r0).abs() < 5.0e4, "r0={r0} r1={r1}");
    }
}
