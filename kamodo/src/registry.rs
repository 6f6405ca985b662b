//! The function registry
//!
//! [`Kamodo`] maps bare names to shared [`Entry`] handles, with a secondary
//! alias from the whitespace-free signature (`rho(x,y,z)`) to the bare
//! name. Every mutation is staged on a copy of the index and committed only
//! once the dependency graph has been checked, so a failed `set` leaves the
//! registry exactly as it was.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use kamodo_core::{Array, KamodoError};
use tracing::{debug, warn};

use crate::compile::{compile, compile_primitive};
use crate::config::{KamodoConfig, RefreshPolicy};
use crate::entry::{Entry, RegistryValue};
use crate::graph::{self, Entries};
use crate::key::{parse_key, KeySpec};
use crate::similar::{find_similar, suggestion};

/// How `delete` treats entries that still reference the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Refuse while live dependents exist
    #[default]
    Guarded,
    /// Remove and retire the entry; dependents fail on their next call
    Force,
}

/// Mapping interface over registered functions
pub trait Registry {
    /// Register or replace a function
    fn set(&mut self, key: &str, value: impl Into<RegistryValue>) -> Result<Arc<Entry>, KamodoError>;

    /// Look up by bare name or full signature
    fn get(&self, key: &str) -> Result<Arc<Entry>, KamodoError>;

    /// Remove by bare name or full signature
    fn delete(&mut self, key: &str, mode: DeleteMode) -> Result<Arc<Entry>, KamodoError>;

    /// Entries by bare name, in insertion order
    fn iterate(&self) -> Iter<'_>;
}

/// Iterator over `(bare_name, entry)` pairs
pub struct Iter<'a> {
    inner: indexmap::map::Iter<'a, String, Arc<Entry>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Arc<Entry>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(name, entry)| (name.as_str(), entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Registry of composable, unit-aware functions
#[derive(Default)]
pub struct Kamodo {
    entries: Entries,
    aliases: HashMap<String, String>,
    config: KamodoConfig,
}

impl Kamodo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KamodoConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Build a registry from `(key, value)` pairs, registered in order
    pub fn from_entries<I, K, V>(pairs: I) -> Result<Self, KamodoError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RegistryValue>,
    {
        let mut kamodo = Self::new();
        for (key, value) in pairs {
            kamodo.set(key.as_ref(), value)?;
        }
        Ok(kamodo)
    }

    pub fn config(&self) -> &KamodoConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resolve_name(key).is_some()
    }

    /// Every key form: bare names and, for entries with parameters, signatures
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.entries.len() * 2);
        for (name, entry) in &self.entries {
            keys.push(name.clone());
            if !entry.params().is_empty() {
                keys.push(entry.symbol().signature_key());
            }
        }
        keys
    }

    /// Live entries that reference `key` directly
    pub fn dependents(&self, key: &str) -> Result<Vec<String>, KamodoError> {
        let name = self.require_name(key)?;
        Ok(graph::direct_dependents(&self.entries, &name))
    }

    /// Call a registered function with positional arguments
    pub fn evaluate(&self, key: &str, args: &[Array]) -> Result<Array, KamodoError> {
        self.get(key)?.call(args)
    }

    /// Call a registered function with arguments by name
    pub fn evaluate_named(&self, key: &str, overrides: &IndexMap<String, Array>) -> Result<Array, KamodoError> {
        self.get(key)?.call_named(overrides)
    }

    /// Change the fill value of one entry, rebuilding it in place
    pub fn set_fill_value(&mut self, key: &str, fill_value: f64) -> Result<Arc<Entry>, KamodoError> {
        let name = self.require_name(key)?;
        let current = Arc::clone(&self.entries[&name]);
        let rebuilt = self.build(current.key(), current.value(), &self.entries, fill_value)?;
        self.stage_and_commit(name, rebuilt)
    }

    /// Recompile `key` from its stored source against the current registry
    /// and recompute its data
    pub fn refresh(&mut self, key: &str) -> Result<Arc<Entry>, KamodoError> {
        let name = self.require_name(key)?;
        let current = Arc::clone(&self.entries[&name]);
        let rebuilt = self.rebuild(&current, &self.entries)?;
        let entry = self.stage_and_commit(name, rebuilt)?;
        debug!(name = %entry.name(), "refreshed entry");
        Ok(entry)
    }

    /// Refresh every entry, dependencies before dependents
    pub fn refresh_all(&mut self) -> Result<(), KamodoError> {
        let order = graph::topological_sort(&graph::dependency_map(&self.entries))
            .map_err(|cycle| KamodoError::cyclic_dependency(&cycle))?;

        let mut staged = self.entries.clone();
        for name in order {
            let current = Arc::clone(&staged[&name]);
            let rebuilt = self
                .rebuild(&current, &staged)
                .map_err(|e| e.with_note(format!("while refreshing {}", name)))?;
            staged.insert(name, Arc::new(rebuilt));
        }
        self.commit(staged);
        debug!(entries = self.entries.len(), "refreshed registry");
        Ok(())
    }

    // ========== Internals ==========

    fn build(
        &self,
        spec: &KeySpec,
        value: &RegistryValue,
        entries: &Entries,
        fill_value: f64,
    ) -> Result<Entry, KamodoError> {
        match value {
            RegistryValue::Expression(rhs) => compile(spec, rhs, entries, &self.config, fill_value),
            RegistryValue::Function(f) => compile_primitive(spec, f, fill_value),
        }
    }

    /// Recompile from the stored source; primitives recompute their data
    fn rebuild(&self, entry: &Entry, entries: &Entries) -> Result<Entry, KamodoError> {
        let rebuilt = self.build(entry.key(), entry.value(), entries, entry.fill_value())?;
        Ok(if rebuilt.is_derived() { rebuilt } else { rebuilt.with_fresh_data() })
    }

    /// Insert `entry` under `name` on a copy, validate, refresh dependents
    /// when eager, then swap the copy in
    fn stage_and_commit(&mut self, name: String, entry: Entry) -> Result<Arc<Entry>, KamodoError> {
        let mut staged = self.entries.clone();
        staged.insert(name.clone(), Arc::new(entry));

        graph::topological_sort(&graph::dependency_map(&staged)).map_err(|mut cycle| {
            cycle.sort();
            KamodoError::cyclic_dependency(&cycle)
        })?;

        if self.config.refresh == RefreshPolicy::Eager {
            let order = graph::transitive_dependents(&staged, &name)
                .map_err(|cycle| KamodoError::cyclic_dependency(&cycle))?;
            for dependent in order {
                let current = Arc::clone(&staged[&dependent]);
                let rebuilt = self
                    .build(current.key(), current.value(), &staged, current.fill_value())
                    .map_err(|e| e.with_note(format!("while refreshing dependent {}", dependent)))?;
                debug!(name = %dependent, changed = %name, "recompiled dependent");
                staged.insert(dependent, Arc::new(rebuilt));
            }
        }

        self.commit(staged);
        self.entries
            .get(&name)
            .cloned()
            .ok_or_else(|| KamodoError::internal(format!("'{}' missing after commit", name)))
    }

    fn commit(&mut self, staged: Entries) {
        self.aliases = staged
            .iter()
            .map(|(name, entry)| (entry.symbol().signature_key(), name.clone()))
            .filter(|(signature, name)| signature != name)
            .collect();
        self.entries = staged;
    }

    fn resolve_name(&self, key: &str) -> Option<String> {
        let key = normalize_key(key);
        if self.entries.contains_key(&key) {
            return Some(key);
        }
        self.aliases.get(&key).cloned()
    }

    fn require_name(&self, key: &str) -> Result<String, KamodoError> {
        self.resolve_name(key).ok_or_else(|| self.unknown(key))
    }

    fn unknown(&self, key: &str) -> KamodoError {
        let key = normalize_key(key);
        let similar = find_similar(&key, self.entries.keys().map(String::as_str));
        let err = KamodoError::unknown_symbol(&key);
        match suggestion(&key, &similar) {
            Some(text) => err.with_suggestion(text),
            None => err,
        }
    }
}

/// Drop whitespace and any trailing unit annotation
fn normalize_key(key: &str) -> String {
    let key = key.split('[').next().unwrap_or(key);
    key.chars().filter(|c| !c.is_whitespace()).collect()
}

impl Registry for Kamodo {
    fn set(&mut self, key: &str, value: impl Into<RegistryValue>) -> Result<Arc<Entry>, KamodoError> {
        let value = value.into();
        let spec = parse_key(key)?;
        let entry = self
            .build(&spec, &value, &self.entries, self.config.fill_value)
            .map_err(|e| e.for_key(key))?;

        let replaced = self.entries.contains_key(&spec.name);
        let entry = self.stage_and_commit(spec.name.clone(), entry).map_err(|e| e.for_key(key))?;
        debug!(
            key = %key,
            signature = %entry.symbol(),
            units = ?entry.units(),
            replaced,
            "registered"
        );
        Ok(entry)
    }

    fn get(&self, key: &str) -> Result<Arc<Entry>, KamodoError> {
        self.resolve_name(key)
            .and_then(|name| self.entries.get(&name).cloned())
            .ok_or_else(|| self.unknown(key))
    }

    fn delete(&mut self, key: &str, mode: DeleteMode) -> Result<Arc<Entry>, KamodoError> {
        let name = self.require_name(key)?;
        let dependents = graph::direct_dependents(&self.entries, &name);
        if mode == DeleteMode::Guarded && !dependents.is_empty() {
            return Err(KamodoError::dependent_entry_exists(&name, &dependents));
        }

        let mut staged = self.entries.clone();
        let removed = staged
            .shift_remove(&name)
            .ok_or_else(|| KamodoError::internal(format!("'{}' vanished during delete", name)))?;
        self.commit(staged);

        if mode == DeleteMode::Force {
            removed.retire();
            if !dependents.is_empty() {
                warn!(name = %name, ?dependents, "forced delete; dependents will fail until refreshed");
            }
        }
        debug!(name = %name, ?mode, "deleted");
        Ok(removed)
    }

    fn iterate(&self) -> Iter<'_> {
        Iter { inner: self.entries.iter() }
    }
}

impl<'a> IntoIterator for &'a Kamodo {
    type Item = (&'a str, &'a Arc<Entry>);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iterate()
    }
}

impl fmt::Debug for Kamodo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, entry)| (name, entry.symbol().to_string())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kamodo_core::codes;

    #[test]
    fn test_set_and_get_both_forms() {
        let mut k = Kamodo::new();
        k.set("f(x, y)", "x + y").unwrap();
        let a = k.get("f").unwrap();
        let b = k.get("f(x, y)").unwrap();
        let c = k.get("f( x,y )").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(k.keys(), vec!["f".to_string(), "f(x,y)".to_string()]);
    }

    #[test]
    fn test_zero_param_entry_has_no_alias() {
        let mut k = Kamodo::new();
        k.set("c", "3*pi").unwrap();
        assert_eq!(k.keys(), vec!["c".to_string()]);
        assert!(k.contains("c()"));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut k = Kamodo::new();
        k.set("f(x)", "x").unwrap();
        k.set("g(x)", "2*x").unwrap();
        k.set("f(t)", "t**2").unwrap();
        let names: Vec<&str> = k.iterate().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["f", "g"]);
        assert!(!k.contains("f(x)"));
        assert!(k.contains("f(t)"));
    }

    #[test]
    fn test_reregister_after_delete_appends() {
        let mut k = Kamodo::new();
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "2*x").unwrap();
        k.delete("a", DeleteMode::Guarded).unwrap();
        k.set("a(x)", "3*x").unwrap();
        let names: Vec<&str> = k.iterate().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(k.contains("a(x)"));
    }

    #[test]
    fn test_unit_exponent_overflow_is_an_error() {
        let mut k = Kamodo::new();
        let err = k.set("f [(m^100000)^100000]", "1").unwrap_err();
        assert_eq!(err.code, codes::MALFORMED_KEY);
        assert!(k.is_empty());

        k.set("a(t) [m]", "t").unwrap();
        let err = k.set("b", "(a**100000)**100000").unwrap_err();
        assert_eq!(err.code, codes::INCOMPATIBLE_UNITS);
        assert_eq!(k.len(), 1);
    }

    #[test]
    fn test_large_constant_power_stays_symbolic() {
        let mut k = Kamodo::new();
        let f = k.set("f(x)", "x*3**300000").unwrap();
        assert!(f.rhs().is_some_and(|rhs| rhs.contains("300000")));
    }

    #[test]
    fn test_failed_set_leaves_registry_unchanged() {
        let mut k = Kamodo::new();
        k.set("f(x)", "x").unwrap();
        let before = k.get("f").unwrap();
        let err = k.set("f(x)", "x + nope(x)").unwrap_err();
        assert_eq!(err.code, codes::UNKNOWN_SYMBOL);
        assert!(Arc::ptr_eq(&before, &k.get("f").unwrap()));
        assert_eq!(k.len(), 1);
    }

    #[test]
    fn test_cycle_rejected_atomically() {
        let mut k = Kamodo::new();
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "a(x) + 1").unwrap();
        let err = k.set("a(x)", "b(x)").unwrap_err();
        assert_eq!(err.code, codes::CYCLIC_DEPENDENCY);
        assert_eq!(k.get("a").unwrap().rhs().unwrap(), "x");
    }

    #[test]
    fn test_guarded_delete() {
        let mut k = Kamodo::new();
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "2*a(x)").unwrap();
        let err = k.delete("a", DeleteMode::Guarded).unwrap_err();
        assert_eq!(err.code, codes::DEPENDENT_ENTRY_EXISTS);
        assert!(k.contains("a"));

        k.delete("b(x)", DeleteMode::Guarded).unwrap();
        k.delete("a", DeleteMode::Guarded).unwrap();
        assert!(k.is_empty());
        assert!(!k.contains("a(x)"));
    }

    #[test]
    fn test_forced_delete_retires() {
        let mut k = Kamodo::new();
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "2*a(x)").unwrap();
        let removed = k.delete("a", DeleteMode::Force).unwrap();
        assert!(removed.is_retired());
        let err = k.evaluate("b", &[Array::scalar(1.0)]).unwrap_err();
        assert_eq!(err.code, codes::UNKNOWN_SYMBOL);
    }

    #[test]
    fn test_get_unknown_suggests() {
        let mut k = Kamodo::new();
        k.set("density(x)", "x").unwrap();
        let err = k.get("densty").unwrap_err();
        assert_eq!(err.code, codes::UNKNOWN_SYMBOL);
        assert!(err.suggestion.unwrap().contains("density"));
    }

    #[test]
    fn test_stale_then_refresh() {
        let mut k = Kamodo::new();
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "a(x) + 1").unwrap();
        k.set("a(x)", "10*x").unwrap();
        let x = [Array::scalar(1.0)];
        assert_eq!(k.evaluate("b", &x).unwrap().data(), &[2.0]);
        k.refresh("b").unwrap();
        assert_eq!(k.evaluate("b", &x).unwrap().data(), &[11.0]);
    }

    #[test]
    fn test_eager_refresh() {
        let config = KamodoConfig::default().with_refresh(RefreshPolicy::Eager);
        let mut k = Kamodo::with_config(config);
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "a(x) + 1").unwrap();
        k.set("c(x)", "2*b(x)").unwrap();
        k.set("a(x)", "10*x").unwrap();
        assert_eq!(k.evaluate("c", &[Array::scalar(1.0)]).unwrap().data(), &[22.0]);
    }

    #[test]
    fn test_eager_refresh_failure_is_atomic() {
        let config = KamodoConfig::default().with_refresh(RefreshPolicy::Eager);
        let mut k = Kamodo::with_config(config);
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "a(x) + 1").unwrap();
        let err = k.set("a(x, y)", "x*y").unwrap_err();
        assert_eq!(err.code, codes::ARG_COUNT);
        assert_eq!(k.get("a").unwrap().params(), &["x".to_string()]);
    }

    #[test]
    fn test_refresh_all() {
        let mut k = Kamodo::new();
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "a(x) + 1").unwrap();
        k.set("c(x)", "b(x)*2").unwrap();
        k.set("a(x)", "x - 1").unwrap();
        k.refresh_all().unwrap();
        assert_eq!(k.evaluate("c", &[Array::scalar(3.0)]).unwrap().data(), &[6.0]);
    }

    #[test]
    fn test_fill_value() {
        let mut k = Kamodo::with_config(KamodoConfig::default().with_fill_value(0.0));
        k.set("r(x)", "sqrt(x)").unwrap();
        let out = k.evaluate("r", &[Array::from_vec(vec![4.0, -1.0])]).unwrap();
        assert_eq!(out.data(), &[2.0, 0.0]);

        k.set_fill_value("r", -99.0).unwrap();
        let out = k.evaluate("r", &[Array::from_vec(vec![-1.0])]).unwrap();
        assert_eq!(out.data(), &[-99.0]);
    }

    #[test]
    fn test_dependents() {
        let mut k = Kamodo::new();
        k.set("a(x)", "x").unwrap();
        k.set("b(x)", "a(x)").unwrap();
        k.set("c(x)", "a(x) + b(x)").unwrap();
        assert_eq!(k.dependents("a").unwrap(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_from_entries() {
        let k = Kamodo::from_entries([("f(x)", "x**2"), ("g(x)", "f(x) + 1")]).unwrap();
        assert_eq!(k.evaluate("g", &[Array::scalar(3.0)]).unwrap().data(), &[10.0]);
    }
}
