//! Unit string parsing - parse expressions like "kg/m^3" or "1/cm^3"

use kamodo_core::Number;
use crate::Unit;
use crate::unit::ConversionError;
use crate::units::UNITS;

/// Parse a unit string into its canonical unit
///
/// Supported formats:
/// - Simple: "m", "kg", "s", aliases like "gram"
/// - Powers: "m^2", "m**2", "s^-1", "m²", "cm^(3/2)"
/// - Products: "m*s", "kg m"
/// - Quotients: "m/s", "kg/m^3", "1/cm^3", "kg/(m*s)"
/// - Combined: "kg*m/s^2"
pub fn parse_unit(s: &str) -> Result<Unit, ConversionError> {
    let s = s.trim();

    if s.is_empty() || s == "1" {
        return Ok(Unit::dimensionless());
    }

    // Try simple lookup first
    if let Some(unit) = UNITS.get(s) {
        return Ok(unit.clone());
    }

    let normalized = s.replace("**", "^");
    let mut unit = parse_quotient(&normalized)?;
    unit.symbol = s.to_string();
    Ok(unit)
}

/// Resolve a unit annotation to its canonical unit. Alias of [`parse_unit`].
pub fn normalize(s: &str) -> Result<Unit, ConversionError> {
    parse_unit(s)
}

/// Parse "a/b/c", splitting on '/' outside parentheses
fn parse_quotient(s: &str) -> Result<Unit, ConversionError> {
    let parts = split_top_level(s, &['/']);
    let mut parts = parts.into_iter();

    let mut result = match parts.next() {
        Some(first) => parse_product(first)?,
        None => return Err(ConversionError::UnknownUnit(s.to_string())),
    };

    for part in parts {
        if part.trim().is_empty() {
            return Err(ConversionError::UnknownUnit(s.to_string()));
        }
        let denominator = parse_product(part)?;
        result = result.divide(&denominator)?;
    }

    Ok(result)
}

/// Parse a product of units like "kg*m" or "m^2 s"
fn parse_product(s: &str) -> Result<Unit, ConversionError> {
    let s = s.trim();

    if s.is_empty() || s == "1" {
        return Ok(Unit::dimensionless());
    }

    let factors: Vec<&str> = split_top_level(s, &['*', '·', ' '])
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();

    let mut result = Unit::dimensionless();
    for factor in factors {
        let unit = parse_power(factor)?;
        result = result.multiply(&unit)?;
    }

    Ok(result)
}

/// Parse a unit with optional power like "m^2", "s^-1" or "(m/s)^2"
fn parse_power(s: &str) -> Result<Unit, ConversionError> {
    let s = s.trim();

    if let Some(caret_pos) = find_top_level(s, '^') {
        let base = parse_group(&s[..caret_pos])?;
        let (num, den) = parse_exponent(&s[caret_pos + 1..])?;
        return base.power_ratio(num, den);
    }

    // Check for superscript notation (², ³, ⁻¹, etc.)
    if let Some((base, exp)) = parse_superscript(s) {
        return lookup_base_unit(base)?.power(exp);
    }

    parse_group(s)
}

/// A parenthesised sub-expression or a table lookup
fn parse_group(s: &str) -> Result<Unit, ConversionError> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        return parse_quotient(inner);
    }
    lookup_base_unit(s)
}

/// Exponents are integers or parenthesised rationals like "(3/2)"
fn parse_exponent(s: &str) -> Result<(i32, u32), ConversionError> {
    let s = s.trim();
    let inner = s
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(s);

    let invalid = || ConversionError::InvalidExponent(s.to_string());
    let value = Number::from_str(inner.trim()).map_err(|_| invalid())?;
    let num = value.numerator().to_i32().ok_or_else(invalid)?;
    let den = value
        .denominator()
        .to_i32()
        .and_then(|d| u32::try_from(d).ok())
        .ok_or_else(invalid)?;
    Ok((num, den))
}

/// Parse superscript exponents like m², m³, s⁻¹
fn parse_superscript(s: &str) -> Option<(&str, i32)> {
    const DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

    let start = s
        .char_indices()
        .find(|(_, c)| *c == '⁻' || DIGITS.contains(c))
        .map(|(i, _)| i)?;
    let (base, sup) = s.split_at(start);

    let mut sign = 1;
    let mut value = 0i32;
    let mut seen_digit = false;
    for (i, c) in sup.chars().enumerate() {
        if c == '⁻' && i == 0 {
            sign = -1;
        } else if let Some(d) = DIGITS.iter().position(|&x| x == c) {
            value = value * 10 + d as i32;
            seen_digit = true;
        } else {
            return None;
        }
    }

    if !seen_digit || base.is_empty() {
        return None;
    }
    Some((base, sign * value))
}

/// Look up a base unit by symbol or alias
fn lookup_base_unit(s: &str) -> Result<Unit, ConversionError> {
    let s = s.trim();

    if s == "1" || s.is_empty() {
        return Ok(Unit::dimensionless());
    }

    UNITS.get(s)
        .cloned()
        .ok_or_else(|| ConversionError::UnknownUnit(s.to_string()))
}

/// Split on any of `seps` at parenthesis depth zero
fn split_top_level<'a>(s: &'a str, seps: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if depth == 0 && seps.contains(&c) => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn find_top_level(s: &str, target: char) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dimension;

    #[test]
    fn test_parse_simple() {
        let m = parse_unit("m").unwrap();
        assert_eq!(m.dimension, Dimension::LENGTH);
        assert!(m.scale.is_one());

        let gram = parse_unit("gram").unwrap();
        assert_eq!(gram.symbol, "g");
    }

    #[test]
    fn test_parse_density() {
        let u = parse_unit("kg/m^3").unwrap();
        assert_eq!(u.dimension, Dimension::DENSITY);
        assert!(u.scale.is_one());
        assert_eq!(u.symbol, "kg/m^3");
    }

    #[test]
    fn test_parse_cm3() {
        let u = parse_unit("cm^3").unwrap();
        assert_eq!(u.dimension, Dimension::VOLUME);
        assert_eq!(u.scale, Number::from_str("0.000001").unwrap());
        assert!(u.equivalent(&parse_unit("cm**3").unwrap()));
        assert!(u.equivalent(&parse_unit("cm³").unwrap()));
    }

    #[test]
    fn test_parse_inverse() {
        let u = parse_unit("1/cm^3").unwrap();
        assert_eq!(u.dimension, Dimension::NUMBER_DENSITY);
        assert_eq!(u.scale, Number::from_i64(1_000_000));
        assert!(u.equivalent(&parse_unit("cm^-3").unwrap()));
        assert!(u.equivalent(&parse_unit("cm⁻³").unwrap()));
    }

    #[test]
    fn test_parse_compound() {
        let u = parse_unit("kg*m/s^2").unwrap();
        assert_eq!(u.dimension, Dimension::FORCE);
        let v = parse_unit("kg/(m*s)").unwrap();
        assert!(v.equivalent(&parse_unit("kg/m/s").unwrap()));
        let w = parse_unit("(m/s)^2").unwrap();
        assert_eq!(Some(w.dimension), Dimension::VELOCITY.power(2));
    }

    #[test]
    fn test_parse_rational_exponent() {
        let u = parse_unit("m^(1/2)");
        assert!(matches!(u, Err(ConversionError::InvalidExponent(_))));
        let v = parse_unit("m^(4/2)").unwrap();
        assert_eq!(v.dimension, Dimension::AREA);
    }

    #[test]
    fn test_parse_space_physics() {
        assert_eq!(parse_unit("nT").unwrap().dimension, Dimension::MAGNETIC_FIELD);
        assert_eq!(parse_unit("R_E").unwrap().dimension, Dimension::LENGTH);
        assert_eq!(parse_unit("eV").unwrap().dimension, Dimension::ENERGY);
        assert_eq!(parse_unit("amu").unwrap().dimension, Dimension::MASS);
    }

    #[test]
    fn test_parse_dimensionless() {
        assert!(parse_unit("").unwrap().is_unity());
        assert!(parse_unit("1").unwrap().is_unity());
    }

    #[test]
    fn test_unknown_unit() {
        assert!(matches!(parse_unit("furlongs"), Err(ConversionError::UnknownUnit(_))));
        assert!(parse_unit("kg/").is_err());
    }
}
