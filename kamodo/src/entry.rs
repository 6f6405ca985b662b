//! Registry entries

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use kamodo_core::{Array, KamodoError};
use kamodo_plugin::{bind_named, bind_positional, EvalContext, Kamodofied, Meta, NumericFn};
use kamodo_units::Unit;
use serde::Serialize;

use crate::key::KeySpec;
use crate::symbolic::Sym;

/// Function symbol: bare name plus ordered parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub params: Vec<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Self { name: name.into(), params }
    }

    /// `rho(x, y, z)`
    pub fn signature(&self) -> String {
        self.to_string()
    }

    /// `rho(x,y,z)`, the whitespace-free lookup alias
    pub fn signature_key(&self) -> String {
        format!("{}({})", self.name, self.params.join(","))
    }

    /// Signature with hidden arguments left out
    pub fn visible_signature(&self, hidden: &BTreeSet<String>) -> String {
        format!("{}({})", self.name, self.visible_params(hidden).join(", "))
    }

    pub fn visible_params<'a>(&'a self, hidden: &BTreeSet<String>) -> Vec<&'a str> {
        self.params
            .iter()
            .filter(|p| !hidden.contains(*p))
            .map(String::as_str)
            .collect()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Backed directly by a numeric callable
    Primitive,
    /// Defined by an expression over other entries
    Derived,
}

/// Value side of a registration
#[derive(Clone, Debug)]
pub enum RegistryValue {
    Expression(String),
    Function(Kamodofied),
}

impl From<&str> for RegistryValue {
    fn from(rhs: &str) -> Self {
        RegistryValue::Expression(rhs.to_string())
    }
}

impl From<String> for RegistryValue {
    fn from(rhs: String) -> Self {
        RegistryValue::Expression(rhs)
    }
}

impl From<Kamodofied> for RegistryValue {
    fn from(f: Kamodofied) -> Self {
        RegistryValue::Function(f)
    }
}

/// One registered function's full record
pub struct Entry {
    pub(crate) symbol: Symbol,
    pub(crate) kind: EntryKind,
    pub(crate) expression: Option<Sym>,
    pub(crate) callable: Arc<dyn NumericFn>,
    pub(crate) meta: Meta,
    pub(crate) data: Option<Array>,
    pub(crate) fill_value: f64,
    pub(crate) unit: Option<Unit>,
    pub(crate) dependencies: Vec<String>,
    pub(crate) key: KeySpec,
    pub(crate) value: RegistryValue,
    pub(crate) retired: AtomicBool,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.symbol.name
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn params(&self) -> &[String] {
        &self.symbol.params
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_derived(&self) -> bool {
        self.kind == EntryKind::Derived
    }

    /// Canonical expression, for derived entries
    pub fn expression(&self) -> Option<&Sym> {
        self.expression.as_ref()
    }

    /// Canonical expression text, e.g. `4*pi*(x**2 + y**2)**(3/2)/3`
    pub fn rhs(&self) -> Option<String> {
        self.expression.as_ref().map(|e| e.to_string())
    }

    pub fn callable(&self) -> Arc<dyn NumericFn> {
        Arc::clone(&self.callable)
    }

    pub fn defaults(&self) -> &IndexMap<String, Array> {
        self.callable.defaults()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Units as displayed: the declared annotation, or the inferred unit
    pub fn units(&self) -> Option<&str> {
        self.meta.units.as_deref()
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    /// Result at the defaults, computed at registration (or last refresh)
    pub fn data(&self) -> Option<&Array> {
        self.data.as_ref()
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    /// Bare names of referenced entries
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn value(&self) -> &RegistryValue {
        &self.value
    }

    /// Removed from its registry by a forced delete
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    fn context(&self) -> EvalContext {
        EvalContext::default().with_fill_value(self.fill_value)
    }

    fn check_live(&self) -> Result<(), KamodoError> {
        if self.is_retired() {
            return Err(KamodoError::unknown_symbol(self.name())
                .with_note(format!("'{}' was deleted from the registry", self.name())));
        }
        Ok(())
    }

    /// Call with positional arguments; missing trailing ones come from defaults
    pub fn call(&self, args: &[Array]) -> Result<Array, KamodoError> {
        self.check_live()?;
        let bound = bind_positional(self.name(), self.params(), self.defaults(), args)?;
        let out = self.callable.call(&bound, &self.context())?;
        Ok(out.fill_nan(self.fill_value))
    }

    /// Call with arguments by name; the rest come from defaults
    pub fn call_named(&self, overrides: &IndexMap<String, Array>) -> Result<Array, KamodoError> {
        self.check_live()?;
        let bound = bind_named(self.name(), self.params(), self.defaults(), overrides)?;
        let out = self.callable.call(&bound, &self.context())?;
        Ok(out.fill_nan(self.fill_value))
    }

    /// Evaluate at the defaults when every parameter has one. A failure is
    /// logged and gives `None`.
    pub(crate) fn evaluate_defaults(&self) -> Option<Array> {
        if !self.params().iter().all(|p| self.defaults().contains_key(p)) {
            return None;
        }
        match self.call(&[]) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(entry = %self.name(), error = %e, "no data snapshot");
                None
            }
        }
    }

    /// Copy with a freshly computed data snapshot
    pub(crate) fn with_fresh_data(&self) -> Entry {
        let mut entry = Entry {
            symbol: self.symbol.clone(),
            kind: self.kind,
            expression: self.expression.clone(),
            callable: Arc::clone(&self.callable),
            meta: self.meta.clone(),
            data: None,
            fill_value: self.fill_value,
            unit: self.unit.clone(),
            dependencies: self.dependencies.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            retired: AtomicBool::new(false),
        };
        entry.data = entry.evaluate_defaults();
        entry
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("symbol", &self.symbol.to_string())
            .field("kind", &self.kind)
            .field("rhs", &self.rhs())
            .field("units", &self.units())
            .field("dependencies", &self.dependencies)
            .field("data", &self.data.as_ref().map(|d| d.shape().to_vec()))
            .field("retired", &self.is_retired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        let s = Symbol::new("rho", vec!["x".into(), "y".into(), "t".into()]);
        assert_eq!(s.signature(), "rho(x, y, t)");
        assert_eq!(s.signature_key(), "rho(x,y,t)");
        let hidden: BTreeSet<String> = ["t".to_string()].into_iter().collect();
        assert_eq!(s.visible_signature(&hidden), "rho(x, y)");
    }
}
