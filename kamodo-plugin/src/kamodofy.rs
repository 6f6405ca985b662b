//! Metadata carrier
//!
//! `kamodofy(f)` wraps a numeric callable with units, citation, equation
//! and hidden arguments. The wrapper is built once and read-only after
//! that; nothing is patched onto the callable itself.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use kamodo_core::{Array, KamodoError};
use serde::{Deserialize, Serialize};

use crate::{bind_named, bind_positional, EvalContext, NumericFn};

/// Introspection metadata attached to a function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Unit annotation as written, e.g. "kg/m^3"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,

    /// LaTeX right-hand side shown instead of the generic placeholder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equation: Option<String>,

    /// Arguments omitted from displayed signatures
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub hidden_args: BTreeSet<String>,
}

impl Meta {
    pub fn is_hidden(&self, arg: &str) -> bool {
        self.hidden_args.contains(arg)
    }
}

type ArrayFn = dyn Fn(&[Array]) -> Result<Array, KamodoError> + Send + Sync;

/// Adapts a closure over arrays to [`NumericFn`]
pub struct FnPlugin {
    params: Vec<String>,
    defaults: IndexMap<String, Array>,
    f: Box<ArrayFn>,
}

impl FnPlugin {
    pub fn new<S, F>(params: &[S], f: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&[Array]) -> Result<Array, KamodoError> + Send + Sync + 'static,
    {
        Self {
            params: params.iter().map(|p| p.as_ref().to_string()).collect(),
            defaults: IndexMap::new(),
            f: Box::new(f),
        }
    }

    /// Builder: default value for one parameter
    pub fn with_default(mut self, name: &str, value: impl Into<Array>) -> Self {
        self.defaults.insert(name.to_string(), value.into());
        self
    }
}

impl NumericFn for FnPlugin {
    fn params(&self) -> &[String] {
        &self.params
    }

    fn defaults(&self) -> &IndexMap<String, Array> {
        &self.defaults
    }

    fn call(&self, args: &[Array], _ctx: &EvalContext) -> Result<Array, KamodoError> {
        if args.len() != self.params.len() {
            return Err(KamodoError::arg_count("function", self.params.len(), args.len()));
        }
        (self.f)(args)
    }
}

impl fmt::Debug for FnPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPlugin")
            .field("params", &self.params)
            .field("defaults", &self.defaults.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Start wrapping `f` with metadata
pub fn kamodofy(f: impl NumericFn + 'static) -> KamodofyBuilder {
    KamodofyBuilder {
        callable: Arc::new(f),
        meta: Meta::default(),
    }
}

/// Builder returned by [`kamodofy`]
pub struct KamodofyBuilder {
    callable: Arc<dyn NumericFn>,
    meta: Meta,
}

impl KamodofyBuilder {
    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.meta.units = Some(units.into());
        self
    }

    pub fn citation(mut self, citation: impl Into<String>) -> Self {
        self.meta.citation = Some(citation.into());
        self
    }

    pub fn equation(mut self, equation: impl Into<String>) -> Self {
        self.meta.equation = Some(equation.into());
        self
    }

    pub fn hidden_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.hidden_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Finish the wrapper. When every parameter has a default the function
    /// is evaluated once here and the result kept as `data`.
    pub fn build(self) -> Kamodofied {
        let data = snapshot(self.callable.as_ref(), &EvalContext::default());
        Kamodofied {
            callable: self.callable,
            meta: self.meta,
            data,
        }
    }
}

/// Evaluate `f` at its defaults, if it has one for every parameter
pub fn snapshot(f: &dyn NumericFn, ctx: &EvalContext) -> Option<Array> {
    let params = f.params();
    if !params.iter().all(|p| f.defaults().contains_key(p)) {
        return None;
    }
    match bind_positional("function", params, f.defaults(), &[]).and_then(|args| f.call(&args, ctx)) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(error = %e, "evaluation at defaults failed, no data snapshot");
            None
        }
    }
}

/// A numeric function plus its read-only metadata and data snapshot
#[derive(Clone)]
pub struct Kamodofied {
    callable: Arc<dyn NumericFn>,
    meta: Meta,
    data: Option<Array>,
}

impl Kamodofied {
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn params(&self) -> &[String] {
        self.callable.params()
    }

    pub fn defaults(&self) -> &IndexMap<String, Array> {
        self.callable.defaults()
    }

    /// Result of evaluating at the defaults, computed at build time
    pub fn data(&self) -> Option<&Array> {
        self.data.as_ref()
    }

    pub fn callable(&self) -> Arc<dyn NumericFn> {
        Arc::clone(&self.callable)
    }

    /// Call with positional args; missing trailing args come from defaults
    pub fn call(&self, args: &[Array], ctx: &EvalContext) -> Result<Array, KamodoError> {
        let bound = bind_positional("function", self.params(), self.defaults(), args)?;
        self.callable.call(&bound, ctx)
    }

    pub fn call_named(&self, overrides: &IndexMap<String, Array>, ctx: &EvalContext) -> Result<Array, KamodoError> {
        let bound = bind_named("function", self.params(), self.defaults(), overrides)?;
        self.callable.call(&bound, ctx)
    }

    /// Call with every argument defaulted
    pub fn call_default(&self, ctx: &EvalContext) -> Result<Array, KamodoError> {
        self.call(&[], ctx)
    }
}

impl NumericFn for Kamodofied {
    fn params(&self) -> &[String] {
        self.callable.params()
    }

    fn defaults(&self) -> &IndexMap<String, Array> {
        self.callable.defaults()
    }

    fn call(&self, args: &[Array], ctx: &EvalContext) -> Result<Array, KamodoError> {
        self.callable.call(args, ctx)
    }
}

impl fmt::Debug for Kamodofied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kamodofied")
            .field("params", &self.params())
            .field("meta", &self.meta)
            .field("data", &self.data.as_ref().map(|d| d.shape().to_vec()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kamodo_core::codes;

    fn density() -> FnPlugin {
        FnPlugin::new(&["x"], |args| Ok(args[0].map(|x| 10.0 * x)))
            .with_default("x", Array::linspace(-5.0, 5.0, 11))
    }

    #[test]
    fn test_builder_meta() {
        let f = kamodofy(density())
            .units("kg/m^3")
            .citation("Pembroke et al 2019")
            .equation(r"\rho_0 x")
            .hidden_args(["t"])
            .build();

        assert_eq!(f.meta().units.as_deref(), Some("kg/m^3"));
        assert_eq!(f.meta().citation.as_deref(), Some("Pembroke et al 2019"));
        assert!(f.meta().is_hidden("t"));
        assert!(!f.meta().is_hidden("x"));
    }

    #[test]
    fn test_data_snapshot() {
        let f = kamodofy(density()).build();
        let data = f.data().unwrap();
        assert_eq!(data.shape(), &[11]);
        assert_eq!(data.data()[0], -50.0);
        assert_eq!(f.call_default(&EvalContext::default()).unwrap(), data.clone());
    }

    #[test]
    fn test_no_snapshot_without_defaults() {
        let f = kamodofy(FnPlugin::new(&["x"], |args| Ok(args[0].clone()))).build();
        assert!(f.data().is_none());
        let err = f.call_default(&EvalContext::default()).unwrap_err();
        assert_eq!(err.code, codes::ARG_COUNT);
    }

    #[test]
    fn test_failed_snapshot_is_none() {
        let f = FnPlugin::new(&["x", "y"], |args| Ok(args[0].zip_with(&args[1], |a, b| a + b)?))
            .with_default("x", Array::linspace(0.0, 1.0, 11))
            .with_default("y", Array::linspace(0.0, 1.0, 22));
        assert!(kamodofy(f).build().data().is_none());
    }

    #[test]
    fn test_call_broadcasts() {
        let f = kamodofy(FnPlugin::new(&["x", "y"], |args| {
            Ok(args[0].zip_with(&args[1], |a, b| a * b)?)
        }))
        .build();
        let col = Array::from_vec(vec![1.0, 2.0]).reshape(vec![2, 1]).unwrap();
        let row = Array::from_vec(vec![1.0, 10.0, 100.0]);
        let out = f.call(&[col, row], &EvalContext::default()).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.data(), &[1.0, 10.0, 100.0, 2.0, 20.0, 200.0]);
    }

    #[test]
    fn test_call_named() {
        let f = kamodofy(density()).build();
        let mut overrides = IndexMap::new();
        overrides.insert("x".to_string(), Array::scalar(2.0));
        let out = f.call_named(&overrides, &EvalContext::default()).unwrap();
        assert_eq!(out, Array::scalar(20.0));
    }
}
