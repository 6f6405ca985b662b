//! Registration key parsing
//!
//! Grammar: `name`, `name [unit]`, `name(a, b)`, `name(a, b) [unit]`.

use std::sync::LazyLock;

use kamodo_core::KamodoError;
use kamodo_units::{parse_unit, Unit};
use regex::Regex;
use serde::Serialize;

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s()\[\]]+)\s*(?:\(([^()]*)\))?\s*(?:\[([^\[\]]*)\])?\s*$")
        .expect("key pattern is valid")
});

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Parsed registration key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySpec {
    pub name: String,
    /// Explicit argument list, `None` when the key has no parentheses
    pub args: Option<Vec<String>>,
    /// Unit annotation as written
    pub units: Option<String>,
    /// Canonical form of `units`
    #[serde(skip)]
    pub unit: Option<Unit>,
}

impl KeySpec {
    /// Whitespace-free `name(a,b)` form, used as the signature alias
    pub fn signature_key(&self) -> Option<String> {
        self.args.as_ref().map(|args| format!("{}({})", self.name, args.join(",")))
    }
}

/// Parse a registration key
pub fn parse_key(key: &str) -> Result<KeySpec, KamodoError> {
    check_balanced(key)?;

    let caps = KEY_RE
        .captures(key)
        .ok_or_else(|| KamodoError::malformed_key(key, "expected name, name(args) and an optional [unit]"))?;

    let name = caps[1].to_string();
    if !is_identifier(&name) {
        return Err(KamodoError::malformed_key(key, format!("'{}' is not a valid name", name)));
    }

    let args = match caps.get(2) {
        Some(m) => Some(parse_arg_list(key, m.as_str())?),
        None => None,
    };

    let (units, unit) = match caps.get(3) {
        Some(m) => {
            let text = m.as_str().trim();
            if text.is_empty() {
                return Err(KamodoError::malformed_key(key, "empty unit annotation"));
            }
            let unit = parse_unit(text)
                .map_err(|e| KamodoError::malformed_key(key, e.to_string()))?;
            (Some(text.to_string()), Some(unit))
        }
        None => (None, None),
    };

    Ok(KeySpec { name, args, units, unit })
}

pub(crate) fn is_identifier(s: &str) -> bool {
    IDENT_RE.is_match(s)
}

fn parse_arg_list(key: &str, text: &str) -> Result<Vec<String>, KamodoError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args: Vec<String> = Vec::new();
    for arg in text.split(',').map(str::trim) {
        if !is_identifier(arg) {
            return Err(KamodoError::malformed_key(key, format!("'{}' is not a valid argument name", arg)));
        }
        if args.iter().any(|a| a == arg) {
            return Err(KamodoError::malformed_key(key, format!("duplicate argument '{}'", arg)));
        }
        args.push(arg.to_string());
    }
    Ok(args)
}

fn check_balanced(key: &str) -> Result<(), KamodoError> {
    let mut paren = 0i32;
    let mut bracket = 0i32;
    for c in key.chars() {
        match c {
            '(' => paren += 1,
            ')' => paren -= 1,
            '[' => bracket += 1,
            ']' => bracket -= 1,
            _ => {}
        }
        if paren < 0 || bracket < 0 {
            break;
        }
    }
    if paren != 0 {
        return Err(KamodoError::malformed_key(key, "unbalanced parentheses"));
    }
    if bracket != 0 {
        return Err(KamodoError::malformed_key(key, "unbalanced brackets"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kamodo_core::codes;

    #[test]
    fn test_bare_name() {
        let spec = parse_key("rho").unwrap();
        assert_eq!(spec.name, "rho");
        assert_eq!(spec.args, None);
        assert_eq!(spec.units, None);
        assert_eq!(spec.signature_key(), None);
    }

    #[test]
    fn test_name_with_units() {
        let spec = parse_key("vol [cm^3]").unwrap();
        assert_eq!(spec.name, "vol");
        assert_eq!(spec.units.as_deref(), Some("cm^3"));
        assert!(spec.unit.is_some());
    }

    #[test]
    fn test_full_key() {
        let spec = parse_key("rho(x, y, z)[kg/m^3]").unwrap();
        assert_eq!(spec.name, "rho");
        assert_eq!(spec.args, Some(vec!["x".to_string(), "y".to_string(), "z".to_string()]));
        assert_eq!(spec.units.as_deref(), Some("kg/m^3"));
        assert_eq!(spec.signature_key().as_deref(), Some("rho(x,y,z)"));
    }

    #[test]
    fn test_empty_args() {
        let spec = parse_key("c()").unwrap();
        assert_eq!(spec.args, Some(vec![]));
    }

    #[test]
    fn test_unbalanced() {
        assert!(parse_key("rho(x, y").unwrap_err().is(codes::MALFORMED_KEY));
        assert!(parse_key("rho [kg").unwrap_err().is(codes::MALFORMED_KEY));
        assert!(parse_key("rho)x(").unwrap_err().is(codes::MALFORMED_KEY));
    }

    #[test]
    fn test_bad_identifiers() {
        assert!(parse_key("2rho").unwrap_err().is(codes::MALFORMED_KEY));
        assert!(parse_key("rho(x, 1y)").unwrap_err().is(codes::MALFORMED_KEY));
        assert!(parse_key("rho(x, x)").unwrap_err().is(codes::MALFORMED_KEY));
        assert!(parse_key("").unwrap_err().is(codes::MALFORMED_KEY));
    }

    #[test]
    fn test_bad_units() {
        let err = parse_key("rho [furlongs]").unwrap_err();
        assert!(err.is(codes::MALFORMED_KEY));
        assert!(parse_key("rho []").unwrap_err().is(codes::MALFORMED_KEY));
    }
}
