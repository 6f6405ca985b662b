//! Canonical units: a dimension plus an exact scale factor to SI

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use kamodo_core::{KamodoError, Number, NumberError};
use crate::Dimension;

/// A physical unit in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// The unit symbol as written (e.g., "kg/m^3", "cm^3")
    pub symbol: String,
    /// The unit name (e.g., "meter", "kilogram", "second")
    pub name: String,
    /// The dimensional signature
    pub dimension: Dimension,
    /// Exact factor to convert to SI base units (value_si = value * scale)
    pub scale: Number,
}

/// Arithmetic operator a unit combination is performed under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOp {
    Mul,
    Div,
    Add,
    Sub,
}

impl Unit {
    pub fn new(symbol: &str, name: &str, dimension: Dimension, scale: Number) -> Self {
        Unit {
            symbol: symbol.to_string(),
            name: name.to_string(),
            dimension,
            scale,
        }
    }

    /// The pure number unit
    pub fn dimensionless() -> Self {
        Unit::new("", "dimensionless", Dimension::DIMENSIONLESS, Number::one())
    }

    /// Dimensionless with unit scale
    pub fn is_unity(&self) -> bool {
        self.dimension.is_dimensionless() && self.scale.is_one()
    }

    /// Check if two units are dimensionally compatible (can be converted)
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Factor `f` such that `value_in_self * f == value_in_target`
    pub fn factor_to(&self, target: &Unit) -> Result<Number, ConversionError> {
        if !self.is_compatible(target) {
            return Err(ConversionError::IncompatibleDimensions {
                from: self.symbol.clone(),
                to: target.symbol.clone(),
                from_dim: self.dimension,
                to_dim: target.dimension,
            });
        }
        Ok(self.scale.checked_div(&target.scale)?)
    }

    /// Multiply two units (e.g., m * m -> m^2)
    pub fn multiply(&self, other: &Unit) -> Result<Unit, ConversionError> {
        let dimension = self.dimension.multiply(&other.dimension)
            .ok_or_else(|| self.overflow(&format!("*{}", other.display_symbol())))?;

        let symbol = match (self.symbol_is_empty(), other.symbol_is_empty()) {
            (true, _) => other.symbol.clone(),
            (_, true) => self.symbol.clone(),
            _ => format!("{}*{}", self.symbol, other.symbol),
        };

        Ok(Unit {
            symbol,
            name: format!("{} {}", self.name, other.name).trim().to_string(),
            dimension,
            scale: self.scale.mul(&other.scale),
        })
    }

    /// Divide two units (e.g., m / s -> m/s)
    pub fn divide(&self, other: &Unit) -> Result<Unit, ConversionError> {
        let scale = self.scale.checked_div(&other.scale)?;
        let dimension = self.dimension.divide(&other.dimension)
            .ok_or_else(|| self.overflow(&format!("/{}", other.display_symbol())))?;

        let numerator = if self.symbol_is_empty() { "1".to_string() } else { self.symbol.clone() };
        let symbol = if other.symbol_is_empty() {
            self.symbol.clone()
        } else if other.symbol.contains(['*', '/']) {
            format!("{}/({})", numerator, other.symbol)
        } else {
            format!("{}/{}", numerator, other.symbol)
        };

        Ok(Unit {
            symbol,
            name: format!("{} per {}", self.name, other.name),
            dimension,
            scale,
        })
    }

    /// Raise unit to an integer power (e.g., m^2, m^3)
    pub fn power(&self, exp: i32) -> Result<Unit, ConversionError> {
        let dimension = self.dimension.power(exp)
            .ok_or_else(|| self.overflow(&format!("^{}", exp)))?;
        let scale = self.scale.pow(exp)?;

        let symbol = if exp == 1 || self.symbol_is_empty() {
            self.symbol.clone()
        } else if self.is_compound() {
            format!("({})^{}", self.symbol, exp)
        } else {
            format!("{}^{}", self.symbol, exp)
        };

        Ok(Unit {
            symbol,
            name: format!("{} to the {}", self.name, exp),
            dimension,
            scale,
        })
    }

    /// Raise unit to the rational power `num/den`.
    ///
    /// Fails unless both the dimension and the scale have an exact root.
    pub fn power_ratio(&self, num: i32, den: u32) -> Result<Unit, ConversionError> {
        if den == 1 {
            return self.power(num);
        }
        let invalid = || ConversionError::InvalidExponent(format!(
            "{} has no exact root of degree {}", self.display_symbol(), den
        ));

        let dimension = self.dimension.power_ratio(num, den).ok_or_else(invalid)?;
        let scale = self.scale.root(den).ok_or_else(invalid)?.pow(num)?;

        let symbol = if self.symbol_is_empty() {
            String::new()
        } else if self.is_compound() {
            format!("({})^({}/{})", self.symbol, num, den)
        } else {
            format!("{}^({}/{})", self.symbol, num, den)
        };

        Ok(Unit {
            symbol,
            name: format!("{} to the {}/{}", self.name, num, den),
            dimension,
            scale,
        })
    }

    /// Same dimension and scale, different spelling allowed
    pub fn equivalent(&self, other: &Unit) -> bool {
        self.dimension == other.dimension && self.scale == other.scale
    }

    fn symbol_is_empty(&self) -> bool {
        self.symbol.is_empty() || self.symbol == "1"
    }

    fn is_compound(&self) -> bool {
        self.symbol.contains(['*', '/', '^'])
    }

    fn overflow(&self, applied: &str) -> ConversionError {
        ConversionError::InvalidExponent(format!(
            "dimension of ({}){} is out of range", self.display_symbol(), applied
        ))
    }

    fn display_symbol(&self) -> &str {
        if self.symbol.is_empty() { "1" } else { &self.symbol }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Combine two units under an arithmetic operator.
///
/// `Mul` and `Div` always combine. `Add` and `Sub` need identical
/// dimensions and keep the left operand's unit.
pub fn combine(op: UnitOp, a: &Unit, b: &Unit) -> Result<Unit, ConversionError> {
    match op {
        UnitOp::Mul => a.multiply(b),
        UnitOp::Div => a.divide(b),
        UnitOp::Add | UnitOp::Sub => {
            if a.is_compatible(b) {
                Ok(a.clone())
            } else {
                Err(ConversionError::IncompatibleDimensions {
                    from: b.symbol.clone(),
                    to: a.symbol.clone(),
                    from_dim: b.dimension,
                    to_dim: a.dimension,
                })
            }
        }
    }
}

/// Exact factor converting values in `from` into values in `to`
pub fn conversion_factor(from: &Unit, to: &Unit) -> Result<Number, ConversionError> {
    from.factor_to(to)
}

/// Errors that can occur while resolving or combining units
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Units have incompatible dimensions
    #[error("cannot convert {from} ({from_dim}) to {to} ({to_dim}): incompatible dimensions")]
    IncompatibleDimensions {
        from: String,
        to: String,
        from_dim: Dimension,
        to_dim: Dimension,
    },

    /// Unknown unit symbol
    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    /// Exponent that cannot be applied to a unit
    #[error("invalid exponent: {0}")]
    InvalidExponent(String),

    /// Numeric error during conversion
    #[error("numeric error: {0}")]
    NumberError(#[from] NumberError),
}

impl From<ConversionError> for KamodoError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::IncompatibleDimensions { .. } => {
                KamodoError::incompatible_units(err.to_string())
            }
            ConversionError::UnknownUnit(_) | ConversionError::InvalidExponent(_) => {
                KamodoError::incompatible_units(err.to_string())
                    .with_suggestion("Check the unit annotation against the unit table")
            }
            ConversionError::NumberError(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_unit;

    #[test]
    fn test_combine_mul_div() {
        let kg = parse_unit("kg").unwrap();
        let m3 = parse_unit("m^3").unwrap();
        let density = combine(UnitOp::Div, &kg, &m3).unwrap();
        assert_eq!(density.dimension, Dimension::DENSITY);
        assert_eq!(density.symbol, "kg/m^3");

        let mass = combine(UnitOp::Mul, &density, &m3).unwrap();
        assert_eq!(mass.dimension, Dimension::MASS);
        assert!(mass.scale.is_one());
    }

    #[test]
    fn test_combine_add_requires_dimension() {
        let m = parse_unit("m").unwrap();
        let km = parse_unit("km").unwrap();
        let s = parse_unit("s").unwrap();
        assert_eq!(combine(UnitOp::Add, &m, &km).unwrap(), m);
        assert!(matches!(
            combine(UnitOp::Sub, &m, &s),
            Err(ConversionError::IncompatibleDimensions { .. })
        ));
    }

    #[test]
    fn test_mul_associative() {
        let a = parse_unit("kg").unwrap();
        let b = parse_unit("cm").unwrap();
        let c = parse_unit("s^-1").unwrap();
        let left = combine(UnitOp::Mul, &combine(UnitOp::Mul, &a, &b).unwrap(), &c).unwrap();
        let right = combine(UnitOp::Mul, &a, &combine(UnitOp::Mul, &b, &c).unwrap()).unwrap();
        assert!(left.equivalent(&right));
    }

    #[test]
    fn test_conversion_factor_kg_to_g() {
        let kg = parse_unit("kg").unwrap();
        let g = parse_unit("g").unwrap();
        assert_eq!(conversion_factor(&kg, &g).unwrap(), Number::from_i64(1000));
        assert_eq!(conversion_factor(&g, &kg).unwrap(), Number::from_ratio(1, 1000).unwrap());
    }

    #[test]
    fn test_conversion_factor_incompatible() {
        let kg = parse_unit("kg").unwrap();
        let s = parse_unit("s").unwrap();
        let err: KamodoError = conversion_factor(&kg, &s).unwrap_err().into();
        assert_eq!(err.code, kamodo_core::codes::INCOMPATIBLE_UNITS);
    }

    #[test]
    fn test_power_ratio() {
        let cm2 = parse_unit("cm^2").unwrap();
        let cm = cm2.power_ratio(1, 2).unwrap();
        assert_eq!(cm.dimension, Dimension::LENGTH);
        assert_eq!(cm.scale, Number::from_ratio(1, 100).unwrap());
        assert!(parse_unit("m").unwrap().power_ratio(1, 2).is_err());
    }

    #[test]
    fn test_divide_symbols() {
        let one = Unit::dimensionless();
        let cm3 = parse_unit("cm^3").unwrap();
        assert_eq!(one.divide(&cm3).unwrap().symbol, "1/cm^3");
        let kg = parse_unit("kg").unwrap();
        let ms = parse_unit("m*s").unwrap();
        assert_eq!(kg.divide(&ms).unwrap().symbol, "kg/(m*s)");
        let m2 = parse_unit("m^2").unwrap();
        assert_eq!(m2.power(3).unwrap().symbol, "(m^2)^3");
    }

    #[test]
    fn test_power_out_of_range() {
        let m = parse_unit("m").unwrap();
        let big = m.power(4000).unwrap();
        let err = big.power(1_000_000).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidExponent(_)));
        let err: KamodoError = err.into();
        assert_eq!(err.code, kamodo_core::codes::INCOMPATIBLE_UNITS);
    }
}
