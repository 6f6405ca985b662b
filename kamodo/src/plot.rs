//! Plot contract: evaluated traces, ready for an external plotting backend

use indexmap::IndexMap;
use kamodo_core::{Array, KamodoError};
use kamodo_plugin::bind_named;
use serde::Serialize;

use crate::registry::{Kamodo, Registry};
use crate::render::entry_latex;

/// One evaluated function
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub name: String,
    pub signature: String,
    pub units: Option<String>,
    /// LaTeX equation, for titles
    pub title: String,
    /// Argument arrays actually used, overrides merged with defaults
    pub args: IndexMap<String, Array>,
    pub result: Array,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Figure {
    pub traces: Vec<Trace>,
}

impl Kamodo {
    /// Evaluate each named function with its defaults overridden by the
    /// given arrays
    pub fn figure(&self, requests: &IndexMap<String, IndexMap<String, Array>>) -> Result<Figure, KamodoError> {
        let mut figure = Figure::default();
        for (key, overrides) in requests {
            let entry = self.get(key)?;
            let bound = bind_named(entry.name(), entry.params(), entry.defaults(), overrides)?;
            let result = entry.call(&bound)?;
            let args = entry.params().iter().cloned().zip(bound).collect();

            figure.traces.push(Trace {
                name: entry.name().to_string(),
                signature: entry.symbol().visible_signature(&entry.meta().hidden_args),
                units: entry.units().map(str::to_string),
                title: entry_latex(&entry),
                args,
                result,
            });
        }
        tracing::debug!(traces = figure.traces.len(), "built figure");
        Ok(figure)
    }
}
