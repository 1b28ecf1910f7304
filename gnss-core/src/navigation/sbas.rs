//! SBAS broadcast ephemeris: a state vector plus velocity and acceleration
//! like GLONASS, but propagated with a simple constant-acceleration model
//! (SBAS geostationary orbits are far more stable than GLONASS's) and
//! carrying a long-term correction applied on top of the base estimate.
use crate::error::Error;
use crate::navigation::selector::Selectable;
use crate::navigation::SatelliteState;
use gnss::prelude::{GnssTime, SV};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub acceleration: [f64; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct SbasEphemeris {
    pub sv: SV,
    pub toe: GnssTime,
    pub state: StateVector,
    pub clock_bias: f64,
    pub clock_drift: f64,
    pub ura: f64,
    pub health: u8,
    pub insertion_index: u64,
}

impl Selectable for SbasEphemeris {
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

/// Long-term correction broadcast in MT 25: a position/velocity/clock
/// delta referenced to an issue-of-data, additive to the base state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongTermCorrection {
    pub iode: u8,
    pub delta_position: [f64; 3],
    pub delta_velocity: [f64; 3],
    pub delta_clock: f64,
    pub delta_clock_rate: f64,
}

fn propagate(state: &StateVector, dt: f64) -> ([f64; 3], [f64; 3]) {
    let mut pos = [0.0; 3];
    let mut vel = [0.0; 3];
    for i in 0..3 {
        pos[i] = state.position[i] + state.velocity[i] * dt + 0.5 * state.acceleration[i] * dt * dt;
        vel[i] = state.velocity[i] + state.acceleration[i] * dt;
    }
    (pos, vel)
}

/// Propagates an SBAS state vector to `t`, applying a long-term correction
/// if its IODE matches and it is not stale.
pub fn satellite_state(
    eph: &SbasEphemeris,
    t: GnssTime,
    correction: Option<&LongTermCorrection>,
) -> Result<SatelliteState, Error> {
    let dt = t.seconds_since(&eph.toe);
    if dt.abs() > 1800.0 {
        return Err(Error::IntegratorDiverged(t, eph.sv));
    }

    let (mut pos, mut vel) = propagate(&eph.state, dt);
    let mut clock = eph.clock_bias + eph.clock_drift * dt;
    let mut clock_rate = eph.clock_drift;

    if let Some(c) = correction {
        for i in 0..3 {
            pos[i] += c.delta_position[i] + c.delta_velocity[i] * dt;
            vel[i] += c.delta_velocity[i];
        }
        clock += c.delta_clock + c.delta_clock_rate * dt;
        clock_rate += c.delta_clock_rate;
    }

    Ok(SatelliteState {
        position: pos,
        velocity: vel,
        clock,
        clock_rate,
        variance: eph.ura * eph.ura,
        health: if eph.health == 0 { 0 } else { -1 },
    })
}
