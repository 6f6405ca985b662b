//! Kamodo Units - Unit Resolver
//!
//! Normalizes unit annotations to a canonical form (dimension vector plus
//! exact scale factor to SI), combines units under arithmetic operators,
//! and computes conversion factors between compatible units.
//!
//! Categories:
//! - Length (m, km, cm, R_E, au, etc.)
//! - Mass (kg, g, amu, etc.)
//! - Time (s, min, h, d, etc.)
//! - Volume (L, mL, cc)
//! - Mechanical (N, J, eV, W, Pa, Hz)
//! - Electromagnetic (C, V, ohm, T, nT, G)
//! - Angle (rad, deg)

mod dimension;
mod unit;
mod parse;
mod units;

pub use dimension::Dimension;
pub use unit::{combine, conversion_factor, ConversionError, Unit, UnitOp};
pub use units::{UnitTable, UNITS};
pub use parse::{normalize, parse_unit};
