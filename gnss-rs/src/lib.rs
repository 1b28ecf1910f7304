#![doc = include_str!("../README.md")]

#[macro_use]
mod macros;

pub mod constellation;
pub mod sv;
pub mod time;

pub mod prelude {
    pub use crate::constellation::Constellation;
    pub use crate::sv::SV;
    pub use crate::time::GnssTime;
}
