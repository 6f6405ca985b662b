//! Exact rational numbers using dashu
//!
//! Literals in expressions and unit scale factors are kept exact so that
//! `4/3` prints as `4/3` and `cm^3` relates to `m^3` by exactly `1/1000000`.
//! Numeric evaluation happens in `f64` via [`Number::to_f64`].

use dashu_int::{IBig, UBig};
use dashu_ratio::RBig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    DomainError(String),
}

/// Largest decimal exponent accepted by the parser
const MAX_EXPONENT: u64 = 4096;

/// Arbitrary precision rational number
///
/// All operations return Results or new Numbers - never panic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Number {
    inner: RBig,
}

impl Number {
    // ========== Construction ==========

    /// Create from string representation
    /// Supports: "123", "3.14", "1/3", "1.5e10", "-42"
    pub fn from_str(s: &str) -> Result<Self, NumberError> {
        let s = s.trim();

        if let Some((num, den)) = s.split_once('/') {
            let num = Self::parse_decimal(num.trim())?;
            let den = Self::parse_decimal(den.trim())?;
            return Self { inner: num }.checked_div(&Self { inner: den });
        }

        Ok(Self { inner: Self::parse_decimal(s)? })
    }

    /// Parse "123", "-3.14", "6.02e23" into an exact rational
    fn parse_decimal(s: &str) -> Result<RBig, NumberError> {
        let err = || NumberError::ParseError(s.to_string());

        let (mantissa, exp) = match s.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = s[pos + 1..].parse().map_err(|_| err())?;
                (&s[..pos], exp)
            }
            None => (s, 0),
        };

        let (negative, mantissa) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }

        let digits: UBig = format!("{}{}", int_part, frac_part).parse().map_err(|_| err())?;
        let scale = exp - frac_part.len() as i64;
        if scale.unsigned_abs() > MAX_EXPONENT {
            return Err(NumberError::DomainError(format!("exponent out of range in {}", s)));
        }

        let ten_pow = UBig::from(10u8).pow(scale.unsigned_abs() as usize);
        let value = if scale >= 0 {
            RBig::from_parts(IBig::from(digits * ten_pow), UBig::ONE)
        } else {
            RBig::from_parts(IBig::from(digits), ten_pow)
        };

        Ok(if negative { -value } else { value })
    }

    /// Create from i64
    pub fn from_i64(n: i64) -> Self {
        Self { inner: RBig::from_parts(IBig::from(n), UBig::ONE) }
    }

    /// Create from ratio (exact division)
    pub fn from_ratio(num: i64, den: i64) -> Result<Self, NumberError> {
        Self::from_i64(num).checked_div(&Self::from_i64(den))
    }

    /// `mantissa * 10^exp10`, exact
    pub fn from_scientific(mantissa: i64, exp10: i32) -> Self {
        let ten_pow = UBig::from(10u8).pow(exp10.unsigned_abs() as usize);
        let inner = if exp10 >= 0 {
            RBig::from_parts(IBig::from(mantissa) * IBig::from(ten_pow), UBig::ONE)
        } else {
            RBig::from_parts(IBig::from(mantissa), ten_pow)
        };
        Self { inner }
    }

    pub fn zero() -> Self {
        Self { inner: RBig::ZERO }
    }

    pub fn one() -> Self {
        Self { inner: RBig::ONE }
    }

    // ========== Predicates ==========

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.inner == RBig::ZERO
    }

    pub fn is_one(&self) -> bool {
        self.inner == RBig::ONE
    }

    /// Check if negative
    pub fn is_negative(&self) -> bool {
        self.inner < RBig::ZERO
    }

    /// Check if value is an integer
    pub fn is_integer(&self) -> bool {
        self.inner.denominator() == &UBig::ONE
    }

    // ========== Basic Arithmetic ==========

    pub fn add(&self, other: &Self) -> Self {
        Self { inner: &self.inner + &other.inner }
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self { inner: &self.inner - &other.inner }
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self { inner: &self.inner * &other.inner }
    }

    /// Safe division (returns Result, never panics)
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            Err(NumberError::DivisionByZero)
        } else {
            Ok(Self { inner: &self.inner / &other.inner })
        }
    }

    pub fn neg(&self) -> Self {
        Self { inner: -self.inner.clone() }
    }

    pub fn abs(&self) -> Self {
        if self.is_negative() { self.neg() } else { self.clone() }
    }

    pub fn recip(&self) -> Result<Self, NumberError> {
        Self::one().checked_div(self)
    }

    /// Integer power (exact), by square-and-multiply on the parts.
    ///
    /// Exponents beyond `MAX_EXPONENT` are refused unless the base is
    /// 0, 1 or -1, so callers can keep such powers symbolic.
    pub fn pow(&self, exp: i32) -> Result<Self, NumberError> {
        let n = exp.unsigned_abs();
        let trivial = self.is_zero() || self.abs().is_one();
        if u64::from(n) > MAX_EXPONENT && !trivial {
            return Err(NumberError::DomainError(format!("exponent {} is too large to expand exactly", exp)));
        }

        let n = n as usize;
        let result = Self {
            inner: RBig::from_parts(self.inner.numerator().pow(n), self.inner.denominator().pow(n)),
        };

        if exp < 0 {
            result.recip()
        } else {
            Ok(result)
        }
    }

    /// Exact n-th root, if the numerator and denominator are both perfect powers
    pub fn root(&self, n: u32) -> Option<Self> {
        if n == 0 {
            return None;
        }
        if n == 1 {
            return Some(self.clone());
        }
        if self.is_negative() && n % 2 == 0 {
            return None;
        }

        let num = Self::integer_root(&self.numerator().abs(), n)?;
        let den = Self::integer_root(&self.denominator(), n)?;
        let root = num.checked_div(&den).ok()?;
        Some(if self.is_negative() { root.neg() } else { root })
    }

    /// Root of a non-negative integer, verified exactly
    fn integer_root(value: &Self, n: u32) -> Option<Self> {
        let approx = value.to_f64().powf(1.0 / n as f64).round();
        if !approx.is_finite() {
            return None;
        }
        let candidate = Self::from_str(&format!("{:.0}", approx)).ok()?;
        match candidate.pow(n as i32) {
            Ok(p) if &p == value => Some(candidate),
            _ => None,
        }
    }

    // ========== Parts ==========

    /// Numerator as an integer Number (carries the sign)
    pub fn numerator(&self) -> Self {
        Self { inner: RBig::from_parts(self.inner.numerator().clone(), UBig::ONE) }
    }

    /// Denominator as a positive integer Number
    pub fn denominator(&self) -> Self {
        Self { inner: RBig::from_parts(IBig::from(self.inner.denominator().clone()), UBig::ONE) }
    }

    /// Convert to i32 when the value is a small integer
    pub fn to_i32(&self) -> Option<i32> {
        if !self.is_integer() {
            return None;
        }
        self.inner.numerator().to_string().parse().ok()
    }

    /// Nearest f64
    pub fn to_f64(&self) -> f64 {
        self.inner.to_f64().value()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.numerator())?;
        if !self.is_integer() {
            write!(f, "/{}", self.inner.denominator())?;
        }
        Ok(())
    }
}

impl Default for Number {
    fn default() -> Self {
        Self::zero()
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Number::from_str(&s).map_err(serde::de::Error::custom)
    }
}
