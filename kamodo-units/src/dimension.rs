//! Dimension vectors
//!
//! A dimension is a vector of integer exponents over the SI base
//! quantities, in the order length, mass, time, current, temperature,
//! amount, luminosity.

use std::fmt;
use serde::{Serialize, Deserialize};

const BASE_SYMBOLS: [&str; 7] = ["L", "M", "T", "I", "Θ", "N", "J"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub exponents: [i32; 7],
}

/// Shorthand for the mechanical and electrical quantities used below
const fn mlti(l: i32, m: i32, t: i32, i: i32) -> Dimension {
    Dimension { exponents: [l, m, t, i, 0, 0, 0] }
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = mlti(0, 0, 0, 0);
    pub const LENGTH: Dimension = mlti(1, 0, 0, 0);
    pub const MASS: Dimension = mlti(0, 1, 0, 0);
    pub const TIME: Dimension = mlti(0, 0, 1, 0);
    pub const CURRENT: Dimension = mlti(0, 0, 0, 1);
    pub const TEMPERATURE: Dimension = Dimension { exponents: [0, 0, 0, 0, 1, 0, 0] };
    pub const AMOUNT: Dimension = Dimension { exponents: [0, 0, 0, 0, 0, 1, 0] };
    pub const LUMINOSITY: Dimension = Dimension { exponents: [0, 0, 0, 0, 0, 0, 1] };

    pub const AREA: Dimension = mlti(2, 0, 0, 0);
    pub const VOLUME: Dimension = mlti(3, 0, 0, 0);
    pub const FREQUENCY: Dimension = mlti(0, 0, -1, 0);
    pub const VELOCITY: Dimension = mlti(1, 0, -1, 0);
    pub const FORCE: Dimension = mlti(1, 1, -2, 0);
    pub const ENERGY: Dimension = mlti(2, 1, -2, 0);
    pub const POWER: Dimension = mlti(2, 1, -3, 0);
    pub const PRESSURE: Dimension = mlti(-1, 1, -2, 0);
    /// Mass per volume, e.g. kg/m^3
    pub const DENSITY: Dimension = mlti(-3, 1, 0, 0);
    /// Particles per volume, e.g. 1/cm^3
    pub const NUMBER_DENSITY: Dimension = mlti(-3, 0, 0, 0);
    pub const CHARGE: Dimension = mlti(0, 0, 1, 1);
    pub const VOLTAGE: Dimension = mlti(2, 1, -3, -1);
    pub const RESISTANCE: Dimension = mlti(2, 1, -3, -2);
    /// Magnetic flux density (tesla)
    pub const MAGNETIC_FIELD: Dimension = mlti(0, 1, -2, -1);

    pub fn new(exponents: [i32; 7]) -> Self {
        Dimension { exponents }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents == [0; 7]
    }

    fn zip(&self, other: &Dimension, f: impl Fn(i32, i32) -> Option<i32>) -> Option<Dimension> {
        let mut exponents = [0; 7];
        for (i, slot) in exponents.iter_mut().enumerate() {
            *slot = f(self.exponents[i], other.exponents[i])?;
        }
        Some(Dimension { exponents })
    }

    fn map(&self, f: impl Fn(i32) -> Option<i32>) -> Option<Dimension> {
        self.zip(&Dimension::DIMENSIONLESS, |e, _| f(e))
    }

    /// `None` when an exponent leaves the `i32` range
    pub fn multiply(&self, other: &Dimension) -> Option<Dimension> {
        self.zip(other, i32::checked_add)
    }

    pub fn divide(&self, other: &Dimension) -> Option<Dimension> {
        self.zip(other, i32::checked_sub)
    }

    pub fn power(&self, exp: i32) -> Option<Dimension> {
        self.map(|e| e.checked_mul(exp))
    }

    /// Exact n-th root: `None` unless every exponent divides evenly,
    /// so `(m^2)^(1/2)` is a length but `m^(1/2)` has no dimension.
    pub fn root(&self, n: u32) -> Option<Dimension> {
        let n = i32::try_from(n).ok().filter(|&n| n > 0)?;
        self.map(|e| (e % n == 0).then_some(e / n))
    }

    /// `num/den` power, through an exact root
    pub fn power_ratio(&self, num: i32, den: u32) -> Option<Dimension> {
        self.root(den)?.power(num)
    }

    pub fn invert(&self) -> Option<Dimension> {
        self.power(-1)
    }

    /// Common name, when there is one
    pub fn name(&self) -> Option<&'static str> {
        NAMED.iter().find(|(d, _)| d == self).map(|(_, name)| *name)
    }
}

const NAMED: &[(Dimension, &str)] = &[
    (Dimension::DIMENSIONLESS, "dimensionless"),
    (Dimension::LENGTH, "length"),
    (Dimension::MASS, "mass"),
    (Dimension::TIME, "time"),
    (Dimension::CURRENT, "current"),
    (Dimension::TEMPERATURE, "temperature"),
    (Dimension::AMOUNT, "amount"),
    (Dimension::LUMINOSITY, "luminosity"),
    (Dimension::AREA, "area"),
    (Dimension::VOLUME, "volume"),
    (Dimension::FREQUENCY, "frequency"),
    (Dimension::VELOCITY, "velocity"),
    (Dimension::FORCE, "force"),
    (Dimension::ENERGY, "energy"),
    (Dimension::POWER, "power"),
    (Dimension::PRESSURE, "pressure"),
    (Dimension::DENSITY, "density"),
    (Dimension::NUMBER_DENSITY, "number density"),
    (Dimension::MAGNETIC_FIELD, "magnetic field"),
];

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = BASE_SYMBOLS
            .iter()
            .zip(self.exponents)
            .filter(|(_, exp)| *exp != 0)
            .map(|(sym, exp)| if exp == 1 { sym.to_string() } else { format!("{}^{}", sym, exp) })
            .collect();

        if parts.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}
