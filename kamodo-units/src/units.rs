//! Unit definitions
//!
//! SI base and prefixed units plus the units that show up in
//! space-physics models (Earth radii, nanotesla, electron-volts, amu).
//! Each row is `(symbol, name, dimension, mantissa, exp10, aliases)`; the
//! scale to SI is `mantissa * 10^exp10` and the long name is always an alias.

use std::collections::HashMap;
use std::sync::LazyLock;
use kamodo_core::Number;
use crate::{Unit, Dimension};

type UnitRow = (&'static str, &'static str, Dimension, i64, i32, &'static [&'static str]);

#[rustfmt::skip]
const UNIT_ROWS: &[UnitRow] = &[
    // length
    ("m", "meter", Dimension::LENGTH, 1, 0, &["meters", "metre"]),
    ("km", "kilometer", Dimension::LENGTH, 1, 3, &["kilometers"]),
    ("cm", "centimeter", Dimension::LENGTH, 1, -2, &["centimeters"]),
    ("mm", "millimeter", Dimension::LENGTH, 1, -3, &[]),
    ("um", "micrometer", Dimension::LENGTH, 1, -6, &["μm", "micron"]),
    ("nm", "nanometer", Dimension::LENGTH, 1, -9, &[]),
    ("in", "inch", Dimension::LENGTH, 254, -4, &[]),
    ("ft", "foot", Dimension::LENGTH, 3048, -4, &["feet"]),
    ("mi", "mile", Dimension::LENGTH, 1_609_344, -3, &["miles"]),
    ("au", "astronomical unit", Dimension::LENGTH, 149_597_870_700, 0, &["AU"]),
    ("R_E", "earth radius", Dimension::LENGTH, 6_371_200, 0, &["R_e", "Re", "r_E"]),
    // mass
    ("kg", "kilogram", Dimension::MASS, 1, 0, &["kilograms"]),
    ("g", "gram", Dimension::MASS, 1, -3, &["grams"]),
    ("mg", "milligram", Dimension::MASS, 1, -6, &[]),
    ("ug", "microgram", Dimension::MASS, 1, -9, &["μg"]),
    ("t", "tonne", Dimension::MASS, 1, 3, &[]),
    ("lb", "pound", Dimension::MASS, 45_359_237, -8, &["lbs"]),
    ("amu", "atomic mass unit", Dimension::MASS, 166_053_906_660, -38, &["u", "Da"]),
    // time
    ("s", "second", Dimension::TIME, 1, 0, &["seconds", "sec"]),
    ("ms", "millisecond", Dimension::TIME, 1, -3, &[]),
    ("us", "microsecond", Dimension::TIME, 1, -6, &["μs"]),
    ("ns", "nanosecond", Dimension::TIME, 1, -9, &[]),
    ("min", "minute", Dimension::TIME, 60, 0, &["minutes"]),
    ("h", "hour", Dimension::TIME, 3600, 0, &["hours", "hr"]),
    ("d", "day", Dimension::TIME, 86_400, 0, &["days"]),
    ("yr", "year", Dimension::TIME, 31_556_952, 0, &["years"]),
    // base quantities
    ("A", "ampere", Dimension::CURRENT, 1, 0, &["amp"]),
    ("mA", "milliampere", Dimension::CURRENT, 1, -3, &[]),
    ("K", "kelvin", Dimension::TEMPERATURE, 1, 0, &[]),
    ("mol", "mole", Dimension::AMOUNT, 1, 0, &[]),
    ("cd", "candela", Dimension::LUMINOSITY, 1, 0, &[]),
    // volume
    ("L", "liter", Dimension::VOLUME, 1, -3, &["liters", "litre", "l"]),
    ("mL", "milliliter", Dimension::VOLUME, 1, -6, &["ml"]),
    ("cc", "cubic centimeter", Dimension::VOLUME, 1, -6, &[]),
    // mechanics
    ("N", "newton", Dimension::FORCE, 1, 0, &[]),
    ("dyn", "dyne", Dimension::FORCE, 1, -5, &[]),
    ("J", "joule", Dimension::ENERGY, 1, 0, &[]),
    ("erg", "erg", Dimension::ENERGY, 1, -7, &[]),
    ("eV", "electronvolt", Dimension::ENERGY, 1_602_176_634, -28, &[]),
    ("keV", "kiloelectronvolt", Dimension::ENERGY, 1_602_176_634, -25, &[]),
    ("MeV", "megaelectronvolt", Dimension::ENERGY, 1_602_176_634, -22, &[]),
    ("W", "watt", Dimension::POWER, 1, 0, &[]),
    ("Pa", "pascal", Dimension::PRESSURE, 1, 0, &[]),
    ("nPa", "nanopascal", Dimension::PRESSURE, 1, -9, &[]),
    ("bar", "bar", Dimension::PRESSURE, 1, 5, &[]),
    ("Hz", "hertz", Dimension::FREQUENCY, 1, 0, &[]),
    ("kHz", "kilohertz", Dimension::FREQUENCY, 1, 3, &[]),
    // electromagnetism
    ("C", "coulomb", Dimension::CHARGE, 1, 0, &[]),
    ("V", "volt", Dimension::VOLTAGE, 1, 0, &[]),
    ("mV", "millivolt", Dimension::VOLTAGE, 1, -3, &[]),
    ("ohm", "ohm", Dimension::RESISTANCE, 1, 0, &["Ω"]),
    ("T", "tesla", Dimension::MAGNETIC_FIELD, 1, 0, &[]),
    ("nT", "nanotesla", Dimension::MAGNETIC_FIELD, 1, -9, &[]),
    ("G", "gauss", Dimension::MAGNETIC_FIELD, 1, -4, &[]),
    // angles, degrees carry a decimal approximation of pi/180
    ("rad", "radian", Dimension::DIMENSIONLESS, 1, 0, &["radians"]),
    ("deg", "degree", Dimension::DIMENSIONLESS, 17_453_292_519_943_295, -18, &["degrees", "°"]),
];

/// Global unit table
pub static UNITS: LazyLock<UnitTable> = LazyLock::new(UnitTable::new);

/// Known units keyed by symbol, with a lookup index for aliases
pub struct UnitTable {
    by_symbol: HashMap<&'static str, Unit>,
    alias_of: HashMap<&'static str, &'static str>,
}

impl UnitTable {
    pub fn new() -> Self {
        let mut by_symbol = HashMap::with_capacity(UNIT_ROWS.len());
        let mut alias_of = HashMap::new();
        for &(symbol, name, dimension, mantissa, exp10, aliases) in UNIT_ROWS {
            let scale = Number::from_scientific(mantissa, exp10);
            by_symbol.insert(symbol, Unit::new(symbol, name, dimension, scale));
            for alias in std::iter::once(&name).chain(aliases) {
                if *alias != symbol {
                    alias_of.insert(*alias, symbol);
                }
            }
        }
        UnitTable { by_symbol, alias_of }
    }

    /// Symbol first, then alias
    pub fn get(&self, symbol: &str) -> Option<&Unit> {
        self.by_symbol
            .get(symbol)
            .or_else(|| self.alias_of.get(symbol).and_then(|s| self.by_symbol.get(s)))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    /// All unit symbols, sorted
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.by_symbol.keys().copied().collect();
        symbols.sort_unstable();
        symbols
    }
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::new()
    }
}
