//! Evaluation Context

/// Evaluation context passed to numeric functions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalContext {
    /// Value substituted for missing or out-of-domain results
    pub fill_value: f64,
}

impl EvalContext {
    pub fn new() -> Self {
        Self { fill_value: f64::NAN }
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}
