#![doc = include_str!("../README.md")]

extern crate gnss_rs as gnss;

pub mod atmosphere;
pub mod config;
pub mod constants;
pub mod context;
pub mod ekf;
pub mod error;
pub mod navigation;
pub mod observable;
pub mod observation;
pub mod rinex;
pub mod server;
pub mod solution;
pub mod spp;

pub mod prelude {
    pub use crate::config::{Config, EkfConfig, RinexTranslatorConfig, ServerConfig, SppConfig};
    pub use crate::context::Context;
    pub use crate::error::Error;
    pub use crate::navigation::Navigation;
    pub use crate::observable::Observable;
    pub use crate::observation::{Lli, Observation};
    pub use crate::solution::{Solution, SolutionStatus};
    pub use crate::spp::SinglePointPositioner;
    pub use gnss::prelude::{Constellation, GnssTime, SV};
}
