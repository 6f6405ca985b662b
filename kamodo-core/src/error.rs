//! Structured errors
//!
//! Every failure carries a machine-readable code, a message and, where it
//! helps, a suggestion plus context about the key and expression involved.

use crate::{ArrayError, NumberError};
use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const MALFORMED_KEY: &str = "MALFORMED_KEY";
    pub const UNKNOWN_SYMBOL: &str = "UNKNOWN_SYMBOL";
    pub const INCOMPATIBLE_UNITS: &str = "INCOMPATIBLE_UNITS";
    pub const CYCLIC_DEPENDENCY: &str = "CYCLIC_DEPENDENCY";
    pub const SHAPE_MISMATCH: &str = "SHAPE_MISMATCH";
    pub const DEPENDENT_ENTRY_EXISTS: &str = "DEPENDENT_ENTRY_EXISTS";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Context about where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Registration key being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Right-hand side expression that caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Propagation notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error returned by every fallible operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KamodoError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl KamodoError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set key context
    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.key = Some(key.into());
        self
    }

    /// Builder: set expression context
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.expression = Some(expression.into());
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    // ========== Common Error Constructors ==========

    pub fn malformed_key(key: &str, details: impl Into<String>) -> Self {
        Self::new(codes::MALFORMED_KEY, format!("Malformed key '{}': {}", key, details.into()))
            .with_suggestion("Use name, name [unit], name(a, b) or name(a, b) [unit]")
    }

    pub fn unknown_symbol(name: &str) -> Self {
        Self::new(codes::UNKNOWN_SYMBOL, format!("Unknown symbol: {}", name))
            .with_suggestion(format!("Register '{}' first or check spelling", name))
    }

    pub fn incompatible_units(details: impl Into<String>) -> Self {
        Self::new(codes::INCOMPATIBLE_UNITS, format!("Incompatible units: {}", details.into()))
    }

    pub fn cyclic_dependency(names: &[String]) -> Self {
        Self::new(codes::CYCLIC_DEPENDENCY,
            format!("Cyclic dependency: {}", names.join(" → ")))
            .with_suggestion("Remove circular dependency")
    }

    pub fn shape_mismatch(details: impl Into<String>) -> Self {
        Self::new(codes::SHAPE_MISMATCH, format!("Shape mismatch: {}", details.into()))
            .with_suggestion("Pass arrays whose shapes broadcast together")
    }

    pub fn dependent_entry_exists(name: &str, dependents: &[String]) -> Self {
        Self::new(codes::DEPENDENT_ENTRY_EXISTS,
            format!("Cannot delete '{}': referenced by {}", name, dependents.join(", ")))
            .with_suggestion("Delete the dependents first or use a forced delete")
    }

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details.into()))
            .with_suggestion("Check expression syntax")
    }

    pub fn arg_count(func: &str, expected: usize, got: usize) -> Self {
        Self::new(codes::ARG_COUNT,
            format!("{}() expects {} arguments, got {}", func, expected, got))
    }

    pub fn missing_arg(func: &str, arg: &str) -> Self {
        Self::new(codes::ARG_COUNT,
            format!("{}() argument '{}' has no value and no default", func, arg))
    }

    pub fn domain_error(details: impl Into<String>) -> Self {
        Self::new(codes::DOMAIN_ERROR, format!("Domain error: {}", details.into()))
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
    }
}

impl std::fmt::Display for KamodoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for KamodoError {}

impl From<NumberError> for KamodoError {
    fn from(err: NumberError) -> Self {
        match err {
            NumberError::ParseError(s) => Self::parse_error(s),
            NumberError::DivisionByZero => Self::domain_error("division by zero"),
            NumberError::DomainError(s) => Self::domain_error(s),
        }
    }
}

impl From<ArrayError> for KamodoError {
    fn from(err: ArrayError) -> Self {
        match err {
            ArrayError::ShapeMismatch { .. } => Self::shape_mismatch(err.to_string()),
            ArrayError::DataLength { .. } => Self::shape_mismatch(err.to_string())
                .with_suggestion("Array data length must equal the product of its shape"),
        }
    }
}
