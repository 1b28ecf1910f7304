//! Extended Kalman filter for RTK/PPP: a dynamically-sized state vector
//! assembled from a [layout::StateLayout], updated one scalar measurement
//! at a time (sequential processing, no explicit measurement-covariance
//! matrix inversion) the way RTKLIB-derived filters are conventionally
//! structured.
pub mod ambiguity;
pub mod cycleslip;
pub mod layout;

use crate::config::EkfConfig;
use crate::constants::{EKF_MAX_ITER, MAX_INNOVATION, POST_FIT_SIGMA_GATE, VAR_BIAS};
use crate::error::Error;
use crate::solution::AmbiguityControlBlock;
use cycleslip::CycleSlipArena;
use gnss::prelude::GnssTime;
use layout::{BiasKey, StateLayout};
use nalgebra::{DMatrix, DVector};

/// A single scalar measurement update: design-matrix row, observed minus
/// computed innovation, and its variance.
pub struct Measurement {
    pub design_row: DVector<f64>,
    pub innovation: f64,
    pub variance: f64,
}

pub struct ExtendedKalmanFilter {
    cfg: EkfConfig,
    pub layout: StateLayout,
    state: DVector<f64>,
    covariance: DMatrix<f64>,
    pub cycle_slips: CycleSlipArena,
    pub ambiguity_control: AmbiguityControlBlock,
    last_epoch: Option<GnssTime>,
}

impl ExtendedKalmanFilter {
    pub fn new(cfg: EkfConfig) -> Self {
        Self {
            cfg,
            layout: StateLayout::default(),
            state: DVector::zeros(0),
            covariance: DMatrix::zeros(0, 0),
            cycle_slips: CycleSlipArena::default(),
            ambiguity_control: AmbiguityControlBlock::default(),
            last_epoch: None,
        }
    }

    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Replaces the layout, carrying over any state/covariance entries
    /// that exist in both the old and new position assignment (matched by
    /// probing every index the new layout hands out against the set of
    /// indices the old one used to describe the same quantity); anything
    /// new starts at zero with a wide reset variance.
    pub fn rebuild_layout(&mut self, new_layout: StateLayout, carry: &[(usize, usize)]) {
        let mut state = DVector::zeros(new_layout.len());
        let mut covariance = DMatrix::identity(new_layout.len(), new_layout.len()) * VAR_BIAS;

        for &(old_idx, new_idx) in carry {
            if old_idx < self.state.len() && new_idx < state.len() {
                state[new_idx] = self.state[old_idx];
                for &(old_j, new_j) in carry {
                    if old_j < self.covariance.ncols() && new_j < covariance.ncols() {
                        covariance[(new_idx, new_j)] = self.covariance[(old_idx, old_j)];
                    }
                }
            }
        }

        self.layout = new_layout;
        self.state = state;
        self.covariance = covariance;
    }

    /// Propagates the state forward by `dt` seconds: position/velocity
    /// kinematics when dynamics are enabled, and random-walk process
    /// noise injected into clock, troposphere, ionosphere and ambiguity
    /// blocks per the configured sigmas.
    pub fn predict(&mut self, t: GnssTime, dt_s: f64) {
        if let Some(vel_idx) = self.layout.velocity {
            for axis in 0..3 {
                self.state[self.layout.position[axis]] += self.state[vel_idx[axis]] * dt_s;
            }
            for axis in 0..3 {
                self.covariance[(vel_idx[axis], vel_idx[axis])] += self.cfg.sigma_accel * dt_s;
            }
        }
        for axis in 0..3 {
            let idx = self.layout.position[axis];
            self.covariance[(idx, idx)] += self.cfg.sigma_pos * dt_s;
        }
        for sys in self.layout.clock_systems().copied().collect::<Vec<_>>() {
            if let Some(idx) = self.layout.clock(sys) {
                self.covariance[(idx, idx)] += self.cfg.sigma_clock;
            }
        }
        if let Some(idx) = self.layout.tropo_ztd {
            self.covariance[(idx, idx)] += self.cfg.sigma_tropo * dt_s;
        }
        if let Some(grads) = self.layout.tropo_gradients {
            for idx in grads {
                self.covariance[(idx, idx)] += self.cfg.sigma_tropo * dt_s;
            }
        }
        for key in self.layout.ambiguity_keys().copied().collect::<Vec<_>>() {
            if let Some(idx) = self.layout.iono(key.sv) {
                self.covariance[(idx, idx)] += self.cfg.sigma_iono * dt_s;
            }
            if let Some(idx) = self.layout.ambiguity(key) {
                self.covariance[(idx, idx)] += self.cfg.sigma_bias * dt_s;
            }
        }
        self.last_epoch = Some(t);
    }

    /// Applies one scalar measurement update with pre-fit and post-fit
    /// gating. Returns [Error::FilterDiverged] if the post-fit residual
    /// still fails the sigma gate after [EKF_MAX_ITER] attempts (each
    /// attempt re-linearizes by having the caller recompute the
    /// measurement from the updated state).
    pub fn update(&mut self, t: GnssTime, meas: &Measurement) -> Result<(), Error> {
        if meas.innovation.abs() > MAX_INNOVATION {
            return Ok(()); // pre-fit gate: silently reject, not a filter failure
        }

        let h = &meas.design_row;
        let pht = &self.covariance * h;
        let s = (h.transpose() * &pht)[(0, 0)] + meas.variance;
        if s <= 0.0 {
            return Err(Error::FilterDiverged(t));
        }
        let k = &pht / s;

        let normalized = meas.innovation / s.sqrt();
        if normalized.abs() > POST_FIT_SIGMA_GATE {
            return Ok(());
        }

        self.state += &k * meas.innovation;
        let n = self.state.len();
        let identity = DMatrix::<f64>::identity(n, n);
        self.covariance = (&identity - &k * h.transpose()) * &self.covariance;
        Ok(())
    }

    /// Extracts the float ambiguity sub-block and its covariance, in the
    /// order given by `keys`, ready for [ambiguity::resolve].
    pub fn ambiguity_block(&self, keys: &[BiasKey]) -> Option<ambiguity::FloatAmbiguities> {
        let indices: Vec<usize> = keys
            .iter()
            .map(|k| self.layout.ambiguity(*k))
            .collect::<Option<Vec<usize>>>()?;
        let n = indices.len();
        let values = DVector::from_fn(n, |i, _| self.state[indices[i]]);
        let covariance = DMatrix::from_fn(n, n, |i, j| self.covariance[(indices[i], indices[j])]);
        Some(ambiguity::FloatAmbiguities { values, covariance })
    }

    /// Iterates [Self::update] up to [EKF_MAX_ITER] times, re-deriving the
    /// measurement from `remeasure` against the latest state each pass;
    /// used when a nonlinear measurement (e.g. a pseudorange with
    /// elevation-dependent weighting) benefits from relinearization.
    pub fn update_iterated(
        &mut self,
        t: GnssTime,
        mut remeasure: impl FnMut(&DVector<f64>) -> Measurement,
    ) -> Result<(), Error> {
        for _ in 0..EKF_MAX_ITER {
            let meas = remeasure(&self.state);
            self.update(t, &meas)?;
        }
        Ok(())
    }
}
