//! Engine configuration, grouped by component into a single struct per
//! concern with per-field defaults.
use hifitime::TimeScale;

#[cfg(feature = "serde")]
use serde::Deserialize;

fn default_timescale() -> TimeScale {
    TimeScale::GPST
}

/// Single-point positioner knobs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct SppConfig {
    /// Minimum elevation angle, degrees, below which a satellite is
    /// excluded before the WLS loop runs.
    pub min_elevation_deg: f64,
    /// Maximum WLS iterations before giving up.
    pub max_iter: usize,
    /// Convergence threshold on `|dx|`, meters.
    pub convergence_m: f64,
    /// GDOP ceiling; solutions above it fail validation.
    pub max_gdop: f64,
    /// Chi-square significance level used for residual validation.
    pub chi2_alpha: f64,
    /// Enable RAIM fault detection & exclusion.
    pub raim: bool,
}

impl Default for SppConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: 10.0,
            max_iter: 10,
            convergence_m: 1e-4,
            max_gdop: 30.0,
            chi2_alpha: 0.001,
            raim: true,
        }
    }
}

/// Operating mode for the Kalman estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum EstimatorMode {
    #[default]
    Spp,
    RtkStatic,
    RtkKinematic,
    PppStatic,
    PppKinematic,
}

impl EstimatorMode {
    pub fn is_rtk(&self) -> bool {
        matches!(self, Self::RtkStatic | Self::RtkKinematic)
    }
    pub fn is_ppp(&self) -> bool {
        matches!(self, Self::PppStatic | Self::PppKinematic)
    }
    pub fn is_kinematic(&self) -> bool {
        matches!(self, Self::RtkKinematic | Self::PppKinematic)
    }
}

/// Tropospheric estimation block width: model-only, ZTD, or ZTD+gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum TropoModel {
    #[default]
    ModelOnly,
    Ztd,
    ZtdAndGradients,
}

/// Extended Kalman filter knobs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct EkfConfig {
    pub mode: EstimatorMode,
    pub dynamics: bool,
    pub tropo: TropoModel,
    pub estimate_iono: bool,
    pub triple_freq_dcb: bool,
    /// Process noise, position, m^2/s (static modes).
    pub sigma_pos: f64,
    /// Process noise, acceleration, m^2/s (kinematic-with-dynamics).
    pub sigma_accel: f64,
    /// Process noise, receiver clock, m^2 reset variance each epoch.
    pub sigma_clock: f64,
    /// Process noise, ZTD random walk, m^2/s.
    pub sigma_tropo: f64,
    /// Process noise, slant ionosphere random walk, m^2/s at zenith.
    pub sigma_iono: f64,
    /// Process noise, ambiguity random walk, m^2/s.
    pub sigma_bias: f64,
    pub min_ratio: f64,
    pub max_std_fix: f64,
    pub min_fix_epochs: u32,
    pub fix_and_hold: bool,
    pub max_innovation_m: f64,
    pub post_fit_sigma_gate: f64,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            mode: EstimatorMode::default(),
            dynamics: false,
            tropo: TropoModel::Ztd,
            estimate_iono: true,
            triple_freq_dcb: false,
            sigma_pos: 1e-4,
            sigma_accel: 1e-2,
            sigma_clock: 1e2,
            sigma_tropo: 1e-8,
            sigma_iono: 1e-3,
            sigma_bias: 1e-6,
            min_ratio: crate::constants::MIN_RATIO,
            max_std_fix: crate::constants::MAX_STD_FIX,
            min_fix_epochs: crate::constants::MIN_FIX,
            fix_and_hold: true,
            max_innovation_m: crate::constants::MAX_INNOVATION,
            post_fit_sigma_gate: crate::constants::POST_FIT_SIGMA_GATE,
        }
    }
}

/// Stream-server scheduling knobs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct ServerConfig {
    pub cycle_ms: u64,
    pub nmea_cycle_ms: u64,
    pub max_base_age_s: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cycle_ms: 10,
            nmea_cycle_ms: 1000,
            max_base_age_s: crate::constants::MAX_AGE,
        }
    }
}

/// RINEX translator knobs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct RinexTranslatorConfig {
    /// Target output RINEX minor version, e.g. 3.04.
    pub output_version: f32,
    /// Sampling interval `ti`, seconds; epochs not aligned to it modulo
    /// are skipped in the write pass.
    pub sampling_interval_s: Option<f64>,
}

impl Default for RinexTranslatorConfig {
    fn default() -> Self {
        Self {
            output_version: 3.04,
            sampling_interval_s: None,
        }
    }
}

/// Top-level engine configuration aggregate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    #[cfg_attr(feature = "serde", serde(default = "default_timescale"))]
    pub timescale: TimeScale,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spp: SppConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ekf: EkfConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub server: ServerConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rinex: RinexTranslatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timescale: default_timescale(),
            spp: SppConfig::default(),
            ekf: EkfConfig::default(),
            server: ServerConfig::default(),
            rinex: RinexTranslatorConfig::default(),
        }
    }
}
