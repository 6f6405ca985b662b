//! Function compiler
//!
//! Turns a parsed right-hand side into a canonical [`Sym`] tree while
//! classifying every symbol, collecting parameters and defaults, and
//! inferring units bottom-up. The result is wrapped in a [`CompiledFn`]
//! that evaluates the same tree over arrays, so the printed expression and
//! the numbers it produces never disagree.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use indexmap::IndexMap;
use kamodo_core::{Array, KamodoError, Number};
use kamodo_plugin::{EvalContext, Kamodofied, Meta, NumericFn};
use kamodo_units::{combine, conversion_factor, parse_unit, Unit, UnitOp};

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::config::KamodoConfig;
use crate::entry::{Entry, EntryKind, RegistryValue, Symbol};
use crate::graph::Entries;
use crate::key::KeySpec;
use crate::parser::parse_expr;
use crate::similar::{find_similar, suggestion};
use crate::symbolic::{Builtin, Constant, Sym, BUILTIN_NAMES};

/// Compile an expression registration
pub fn compile(
    spec: &KeySpec,
    rhs: &str,
    entries: &Entries,
    config: &KamodoConfig,
    fill_value: f64,
) -> Result<Entry, KamodoError> {
    check_reserved(spec)?;
    let expr = parse_expr(rhs)?;

    let mut resolver = Resolver {
        name: &spec.name,
        declared: spec.args.as_deref(),
        entries,
        free_parameters: config.free_parameters,
        params: Vec::new(),
        deps: IndexMap::new(),
        defaults: IndexMap::new(),
    };
    let (sym, inferred) = resolver
        .resolve(&expr)
        .map_err(|e| e.with_expression(rhs))?;

    let params = match spec.args.as_ref() {
        Some(args) => args.clone(),
        None => resolver.params.clone(),
    };

    let (expression, unit, units) = apply_declared_unit(spec, sym, inferred)?;

    let defaults: IndexMap<String, Array> = params
        .iter()
        .filter_map(|p| resolver.defaults.get(p).map(|d| (p.clone(), d.clone())))
        .collect();

    let dependencies: Vec<String> = resolver.deps.keys().cloned().collect();
    let callable = CompiledFn {
        name: spec.name.clone(),
        expression: expression.clone(),
        params: params.clone(),
        defaults,
        deps: resolver.deps,
    };

    let mut entry = Entry {
        symbol: Symbol::new(spec.name.clone(), params),
        kind: EntryKind::Derived,
        expression: Some(expression),
        callable: Arc::new(callable),
        meta: Meta { units, ..Meta::default() },
        data: None,
        fill_value,
        unit,
        dependencies,
        key: spec.clone(),
        value: RegistryValue::Expression(rhs.to_string()),
        retired: AtomicBool::new(false),
    };
    entry.data = entry.evaluate_defaults();

    tracing::debug!(
        name = %entry.name(),
        rhs = %entry.rhs().unwrap_or_default(),
        units = ?entry.units(),
        "compiled expression"
    );
    Ok(entry)
}

/// Wrap a metadata-carrying callable as a primitive entry
pub fn compile_primitive(spec: &KeySpec, f: &Kamodofied, fill_value: f64) -> Result<Entry, KamodoError> {
    check_reserved(spec)?;
    let key = spec_display(spec);
    let params = f.params().to_vec();

    if let Some(args) = &spec.args {
        if args != &params {
            return Err(KamodoError::malformed_key(
                &key,
                format!(
                    "arguments ({}) do not match the function's parameters ({})",
                    args.join(", "),
                    params.join(", ")
                ),
            ));
        }
    }

    let meta = f.meta();
    if let Some(hidden) = meta.hidden_args.iter().find(|h| !params.contains(h)) {
        return Err(KamodoError::malformed_key(
            &key,
            format!("hidden argument '{}' is not a parameter", hidden),
        ));
    }

    let wrapper_unit = match meta.units.as_deref() {
        Some(text) => Some(parse_unit(text).map_err(KamodoError::from)?),
        None => None,
    };

    let mut callable = f.callable();
    let mut data = f.data().cloned();
    let (unit, units) = match (&spec.unit, wrapper_unit) {
        (Some(declared), Some(native)) => {
            let factor = conversion_factor(&native, declared)?;
            if !factor.is_one() {
                let factor = factor.to_f64();
                callable = Arc::new(ScaledFn { inner: callable, factor });
                data = data.map(|d| d.map(|x| x * factor));
            }
            (Some(declared.clone()), spec.units.clone())
        }
        (Some(declared), None) => (Some(declared.clone()), spec.units.clone()),
        (None, Some(native)) => (Some(native), meta.units.clone()),
        (None, None) => (None, None),
    };

    Ok(Entry {
        symbol: Symbol::new(spec.name.clone(), params),
        kind: EntryKind::Primitive,
        expression: None,
        callable,
        meta: Meta { units, ..meta.clone() },
        data: data.map(|d| d.fill_nan(fill_value)),
        fill_value,
        unit,
        dependencies: Vec::new(),
        key: spec.clone(),
        value: RegistryValue::Function(f.clone()),
        retired: AtomicBool::new(false),
    })
}

fn spec_display(spec: &KeySpec) -> String {
    let mut key = spec.name.clone();
    if let Some(args) = &spec.args {
        key.push_str(&format!("({})", args.join(", ")));
    }
    if let Some(units) = &spec.units {
        key.push_str(&format!(" [{}]", units));
    }
    key
}

fn check_reserved(spec: &KeySpec) -> Result<(), KamodoError> {
    if Constant::from_name(&spec.name).is_some() || BUILTIN_NAMES.contains(&spec.name.as_str()) {
        return Err(KamodoError::malformed_key(
            &spec_display(spec),
            format!("'{}' is a built-in name", spec.name),
        ));
    }
    Ok(())
}

/// Reconcile the inferred unit with the key's annotation. Returns the final
/// expression, the canonical unit and its display string.
fn apply_declared_unit(
    spec: &KeySpec,
    sym: Sym,
    inferred: Option<Unit>,
) -> Result<(Sym, Option<Unit>, Option<String>), KamodoError> {
    match (&spec.unit, inferred) {
        (Some(declared), Some(inferred)) => {
            let factor = conversion_factor(&inferred, declared).map_err(|e| {
                KamodoError::from(e).with_note(format!(
                    "expression has units {}, key declares {}",
                    display_unit(&inferred),
                    declared.symbol
                ))
            })?;
            let sym = if factor.is_one() { sym } else { Sym::mul(vec![Sym::num(factor), sym]) };
            Ok((sym, Some(declared.clone()), spec.units.clone()))
        }
        (Some(declared), None) => Ok((sym, Some(declared.clone()), spec.units.clone())),
        (None, Some(inferred)) => {
            let units = (!inferred.symbol.is_empty()).then(|| inferred.symbol.clone());
            Ok((sym, Some(inferred), units))
        }
        (None, None) => Ok((sym, None, None)),
    }
}

fn display_unit(unit: &Unit) -> String {
    if unit.symbol.is_empty() { "1".to_string() } else { unit.symbol.clone() }
}

/// Symbol classification state for one right-hand side
struct Resolver<'a> {
    name: &'a str,
    declared: Option<&'a [String]>,
    entries: &'a Entries,
    free_parameters: bool,
    /// Parameters in first-seen order
    params: Vec<String>,
    deps: IndexMap<String, Arc<Entry>>,
    /// First default found per parameter, in reference order
    defaults: IndexMap<String, Array>,
}

type Resolved = (Sym, Option<Unit>);

impl Resolver<'_> {
    fn resolve(&mut self, expr: &Expr) -> Result<Resolved, KamodoError> {
        match expr {
            Expr::Number(n) => Ok((Sym::num(n.clone()), None)),
            Expr::Symbol(name) => self.resolve_symbol(name),
            Expr::UnaryOp(UnaryOp::Neg, inner) => {
                let (s, u) = self.resolve(inner)?;
                Ok((Sym::neg(s), u))
            }
            Expr::BinaryOp(lhs, op, rhs) => {
                let left = self.resolve(lhs)?;
                let right = self.resolve(rhs)?;
                binary(*op, left, right)
            }
            Expr::Call(name, args) => self.resolve_call(name, args),
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.declared.is_some_and(|args| args.iter().any(|a| a == name))
    }

    fn note_param(&mut self, name: &str) {
        if !self.params.iter().any(|p| p == name) {
            self.params.push(name.to_string());
        }
    }

    fn resolve_symbol(&mut self, name: &str) -> Result<Resolved, KamodoError> {
        if self.is_declared(name) {
            self.note_param(name);
            return Ok((Sym::Var(name.to_string()), None));
        }
        if name == self.name {
            return Err(self.self_reference());
        }
        if let Some(entry) = self.entries.get(name).cloned() {
            // bare reference expands to a call with the entry's own parameters
            let mut args = Vec::with_capacity(entry.params().len());
            for p in entry.params() {
                if self.declared.is_some() && !self.is_declared(p) {
                    return Err(KamodoError::unknown_symbol(p).with_note(format!(
                        "'{}' takes parameter '{}', which is not an argument of '{}'",
                        entry.symbol(),
                        p,
                        self.name
                    )));
                }
                self.note_param(p);
                args.push(Sym::Var(p.clone()));
            }
            return Ok(self.apply(&entry, args));
        }
        if let Some(c) = Constant::from_name(name) {
            return Ok((Sym::Const(c), None));
        }
        if self.declared.is_none() && self.free_parameters {
            self.note_param(name);
            return Ok((Sym::Var(name.to_string()), None));
        }
        Err(self.unknown(name, false))
    }

    fn resolve_call(&mut self, name: &str, args: &[Expr]) -> Result<Resolved, KamodoError> {
        if name == self.name {
            return Err(self.self_reference());
        }
        if !self.is_declared(name) {
            if let Some(entry) = self.entries.get(name).cloned() {
                return self.resolve_entry_call(&entry, args);
            }
        }
        if name == "sqrt" {
            let [arg] = args else {
                return Err(KamodoError::arg_count("sqrt", 1, args.len()));
            };
            let (s, u) = self.resolve(arg)?;
            let half = Sym::num(Number::from_ratio(1, 2)?);
            return binary(BinOp::Pow, (s, u), (half, None));
        }
        match Builtin::from_name(name) {
            Some(func) => self.resolve_builtin(func, args),
            None => Err(self.unknown(name, true)),
        }
    }

    fn resolve_entry_call(&mut self, entry: &Arc<Entry>, args: &[Expr]) -> Result<Resolved, KamodoError> {
        let params = entry.params();
        if args.len() > params.len() {
            return Err(KamodoError::arg_count(entry.name(), params.len(), args.len()));
        }
        if let Some(missing) = params[args.len()..].iter().find(|p| !entry.defaults().contains_key(*p)) {
            return Err(KamodoError::missing_arg(entry.name(), missing));
        }

        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            let (s, _) = self.resolve(arg)?;
            resolved.push(s);
        }
        Ok(self.apply(entry, resolved))
    }

    /// Record an application of `entry` and the defaults it contributes
    fn apply(&mut self, entry: &Arc<Entry>, args: Vec<Sym>) -> Resolved {
        for (arg, param) in args.iter().zip(entry.params()) {
            if let (Sym::Var(p), Some(default)) = (arg, entry.defaults().get(param)) {
                if !self.defaults.contains_key(p) {
                    self.defaults.insert(p.clone(), default.clone());
                }
            }
        }
        self.deps.entry(entry.name().to_string()).or_insert_with(|| Arc::clone(entry));
        (Sym::Apply(entry.name().to_string(), args), entry.unit().cloned())
    }

    fn resolve_builtin(&mut self, func: Builtin, args: &[Expr]) -> Result<Resolved, KamodoError> {
        if args.len() != func.arity() {
            return Err(KamodoError::arg_count(func.name(), func.arity(), args.len()));
        }
        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            resolved.push(self.resolve(arg)?);
        }

        match func {
            Builtin::Abs => {
                let (s, u) = resolved.remove(0);
                Ok((Sym::Func(func, vec![s]), u))
            }
            Builtin::Atan2 => {
                let (y, x) = (resolved.remove(0), resolved.remove(0));
                let (y, x, _) = unify(UnitOp::Sub, y, x)?;
                Ok((Sym::Func(func, vec![y, x]), None))
            }
            _ => {
                let (s, u) = resolved.remove(0);
                let s = to_plain_number(func.name(), s, u)?;
                Ok((Sym::Func(func, vec![s]), None))
            }
        }
    }

    fn self_reference(&self) -> KamodoError {
        KamodoError::cyclic_dependency(&[self.name.to_string(), self.name.to_string()])
            .with_note(format!("'{}' refers to itself", self.name))
    }

    fn unknown(&self, name: &str, call: bool) -> KamodoError {
        let mut candidates: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        if call {
            candidates.extend(BUILTIN_NAMES.iter().copied());
        } else {
            candidates.extend(["pi", "E"]);
            candidates.extend(self.declared.into_iter().flatten().map(String::as_str));
        }
        let similar = find_similar(name, candidates);

        let mut err = KamodoError::unknown_symbol(name);
        if let Some(text) = suggestion(name, &similar) {
            err = err.with_suggestion(text);
        }
        if self.declared.is_some() && !call {
            err = err.with_note(format!("'{}' is not among the declared arguments", name));
        } else if !self.free_parameters && !call {
            err = err.with_note("free parameters are disabled");
        }
        err
    }
}

/// Transcendental arguments must be dimensionless. Dimensionless units
/// with a scale (degrees) are converted to plain numbers.
fn to_plain_number(func: &str, s: Sym, u: Option<Unit>) -> Result<Sym, KamodoError> {
    match u {
        None => Ok(s),
        Some(u) if u.dimension.is_dimensionless() => {
            if u.scale.is_one() {
                Ok(s)
            } else {
                Ok(Sym::mul(vec![Sym::num(u.scale), s]))
            }
        }
        Some(u) => Err(KamodoError::incompatible_units(format!(
            "{}() needs a dimensionless argument, got {}",
            func,
            display_unit(&u)
        ))),
    }
}

/// Unit bookkeeping for `+`/`-`: unit-less operands adopt the other side's
/// unit, and a right operand in a different scale is converted to the left's.
fn unify(op: UnitOp, left: Resolved, right: Resolved) -> Result<(Sym, Sym, Option<Unit>), KamodoError> {
    let (ls, lu) = left;
    let (rs, ru) = right;
    match (lu, ru) {
        (None, None) => Ok((ls, rs, None)),
        (Some(u), None) | (None, Some(u)) => Ok((ls, rs, Some(u))),
        (Some(a), Some(b)) => {
            let unit = combine(op, &a, &b)?;
            let factor = conversion_factor(&b, &a)?;
            let rs = if factor.is_one() { rs } else { Sym::mul(vec![Sym::num(factor), rs]) };
            Ok((ls, rs, Some(unit)))
        }
    }
}

fn binary(op: BinOp, left: Resolved, right: Resolved) -> Result<Resolved, KamodoError> {
    match op {
        BinOp::Add => {
            let (l, r, u) = unify(UnitOp::Add, left, right)?;
            Ok((Sym::add(vec![l, r]), u))
        }
        BinOp::Sub => {
            let (l, r, u) = unify(UnitOp::Sub, left, right)?;
            Ok((Sym::sub(l, r), u))
        }
        BinOp::Mul => {
            let unit = match (left.1, right.1) {
                (Some(a), Some(b)) => Some(combine(UnitOp::Mul, &a, &b)?),
                (a, b) => a.or(b),
            };
            Ok((Sym::mul(vec![left.0, right.0]), unit))
        }
        BinOp::Div => {
            let unit = match (left.1, right.1) {
                (Some(a), Some(b)) => Some(combine(UnitOp::Div, &a, &b)?),
                (None, Some(b)) => Some(Unit::dimensionless().divide(&b)?),
                (a, None) => a,
            };
            Ok((Sym::div(left.0, right.0), unit))
        }
        BinOp::Pow => {
            let (base, base_unit) = left;
            let (exp, exp_unit) = right;
            let exp = to_plain_number("pow", exp, exp_unit)?;
            let unit = match base_unit {
                Some(u) if !u.is_unity() => Some(unit_power(&u, &exp)?),
                other => other,
            };
            Ok((Sym::pow(base, exp), unit))
        }
    }
}

fn unit_power(unit: &Unit, exp: &Sym) -> Result<Unit, KamodoError> {
    let n = exp.as_num().ok_or_else(|| {
        KamodoError::incompatible_units(format!(
            "{} can only be raised to a constant power",
            display_unit(unit)
        ))
    })?;
    let num = n.numerator().to_i32();
    let den = n.denominator().to_i32().and_then(|d| u32::try_from(d).ok());
    match (num, den) {
        (Some(num), Some(den)) => Ok(unit.power_ratio(num, den)?),
        _ => Err(KamodoError::incompatible_units(format!(
            "exponent {} is too large for {}",
            n,
            display_unit(unit)
        ))),
    }
}

/// Callable produced for a derived entry
pub struct CompiledFn {
    name: String,
    expression: Sym,
    params: Vec<String>,
    defaults: IndexMap<String, Array>,
    deps: IndexMap<String, Arc<Entry>>,
}

impl CompiledFn {
    pub fn expression(&self) -> &Sym {
        &self.expression
    }

    fn eval(&self, sym: &Sym, args: &[Array]) -> Result<Array, KamodoError> {
        match sym {
            Sym::Num(n) => Ok(Array::scalar(n.to_f64())),
            Sym::Const(c) => Ok(Array::scalar(c.value())),
            Sym::Var(name) => self
                .params
                .iter()
                .position(|p| p == name)
                .and_then(|i| args.get(i))
                .cloned()
                .ok_or_else(|| KamodoError::internal(format!("unbound parameter '{}' in {}", name, self.name))),
            Sym::Func(Builtin::Atan2, a) => match a.as_slice() {
                [y, x] => Ok(self.eval(y, args)?.zip_with(&self.eval(x, args)?, f64::atan2)?),
                _ => Err(KamodoError::arg_count("atan2", 2, a.len())),
            },
            Sym::Func(func, a) => match a.as_slice() {
                [x] => Ok(self.eval(x, args)?.map(|v| func.apply1(v))),
                _ => Err(KamodoError::arg_count(func.name(), 1, a.len())),
            },
            Sym::Apply(name, a) => {
                let dep = self
                    .deps
                    .get(name)
                    .ok_or_else(|| KamodoError::internal(format!("{} has no handle to '{}'", self.name, name)))?;
                let values = a
                    .iter()
                    .map(|s| self.eval(s, args))
                    .collect::<Result<Vec<_>, _>>()?;
                dep.call(&values)
                    .map_err(|e| e.with_note(format!("while evaluating {} in {}", name, self.name)))
            }
            Sym::Add(terms) => self.fold(terms, args, None, |a, b| a + b),
            Sym::Mul(coef, factors) => {
                let init = (!coef.is_one()).then(|| Array::scalar(coef.to_f64()));
                self.fold(factors, args, init, |a, b| a * b)
            }
            Sym::Pow(base, exp) => {
                let base = self.eval(base, args)?;
                let exp = self.eval(exp, args)?;
                Ok(base.zip_with(&exp, f64::powf)?)
            }
        }
    }

    fn fold(
        &self,
        items: &[Sym],
        args: &[Array],
        init: Option<Array>,
        f: impl Fn(f64, f64) -> f64 + Copy,
    ) -> Result<Array, KamodoError> {
        let mut acc = init;
        for item in items {
            let value = self.eval(item, args)?;
            acc = Some(match acc {
                Some(a) => a.zip_with(&value, f)?,
                None => value,
            });
        }
        acc.ok_or_else(|| KamodoError::internal(format!("empty operand list in {}", self.name)))
    }
}

impl NumericFn for CompiledFn {
    fn params(&self) -> &[String] {
        &self.params
    }

    fn defaults(&self) -> &IndexMap<String, Array> {
        &self.defaults
    }

    fn call(&self, args: &[Array], _ctx: &EvalContext) -> Result<Array, KamodoError> {
        if args.len() != self.params.len() {
            return Err(KamodoError::arg_count(&self.name, self.params.len(), args.len()));
        }
        self.eval(&self.expression, args)
    }
}

/// Primitive callable rescaled into the key's declared unit
struct ScaledFn {
    inner: Arc<dyn NumericFn>,
    factor: f64,
}

impl NumericFn for ScaledFn {
    fn params(&self) -> &[String] {
        self.inner.params()
    }

    fn defaults(&self) -> &IndexMap<String, Array> {
        self.inner.defaults()
    }

    fn call(&self, args: &[Array], ctx: &EvalContext) -> Result<Array, KamodoError> {
        let factor = self.factor;
        Ok(self.inner.call(args, ctx)?.map(|x| x * factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::parse_key;
    use kamodo_core::codes;
    use kamodo_plugin::{kamodofy, FnPlugin};

    fn compile_into(entries: &mut Entries, key: &str, rhs: &str) -> Result<Arc<Entry>, KamodoError> {
        let spec = parse_key(key)?;
        let entry = Arc::new(compile(&spec, rhs, entries, &KamodoConfig::default(), f64::NAN)?);
        entries.insert(spec.name.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    fn rho() -> Kamodofied {
        kamodofy(
            FnPlugin::new(&["x", "y", "z"], |a: &[Array]| {
                let xy = a[0].zip_with(&a[1], |x, y| x + y)?;
                Ok(xy.zip_with(&a[2], |s, z| s + z)?)
            })
            .with_default("x", 1.0)
            .with_default("y", 2.0)
            .with_default("z", 3.0),
        )
        .units("kg/m^3")
        .build()
    }

    #[test]
    fn test_inferred_params_first_seen() {
        let mut entries = Entries::new();
        let f = compile_into(&mut entries, "f", "y*x + y").unwrap();
        assert_eq!(f.params(), &["y".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_declared_order_wins() {
        let mut entries = Entries::new();
        let f = compile_into(&mut entries, "f(x, y)", "y*x").unwrap();
        assert_eq!(f.params(), &["x".to_string(), "y".to_string()]);
        let out = f.call(&[Array::scalar(2.0), Array::scalar(5.0)]).unwrap();
        assert_eq!(out.data(), &[10.0]);
    }

    #[test]
    fn test_undeclared_symbol_rejected() {
        let mut entries = Entries::new();
        let err = compile_into(&mut entries, "f(x)", "x + y").unwrap_err();
        assert_eq!(err.code, codes::UNKNOWN_SYMBOL);
    }

    #[test]
    fn test_free_parameters_disabled() {
        let entries = Entries::new();
        let spec = parse_key("f").unwrap();
        let config = KamodoConfig::default().with_free_parameters(false);
        let err = compile(&spec, "x + 1", &entries, &config, f64::NAN).unwrap_err();
        assert_eq!(err.code, codes::UNKNOWN_SYMBOL);
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut entries = Entries::new();
        let err = compile_into(&mut entries, "f(x)", "f(x) + 1").unwrap_err();
        assert_eq!(err.code, codes::CYCLIC_DEPENDENCY);
    }

    #[test]
    fn test_unknown_call_suggests() {
        let mut entries = Entries::new();
        compile_into(&mut entries, "speed(t)", "2*t").unwrap();
        let err = compile_into(&mut entries, "g(t)", "sped(t)").unwrap_err();
        assert_eq!(err.code, codes::UNKNOWN_SYMBOL);
        assert!(err.suggestion.unwrap().contains("speed"));
    }

    #[test]
    fn test_reserved_name() {
        let mut entries = Entries::new();
        let err = compile_into(&mut entries, "sin(x)", "x").unwrap_err();
        assert_eq!(err.code, codes::MALFORMED_KEY);
    }

    #[test]
    fn test_incompatible_addition() {
        let mut entries = Entries::new();
        compile_into(&mut entries, "a(t) [m]", "t").unwrap();
        compile_into(&mut entries, "b(t) [s]", "t").unwrap();
        let err = compile_into(&mut entries, "c", "a + b").unwrap_err();
        assert_eq!(err.code, codes::INCOMPATIBLE_UNITS);
    }

    #[test]
    fn test_addition_converts_scale() {
        let mut entries = Entries::new();
        compile_into(&mut entries, "a(t) [m]", "t").unwrap();
        compile_into(&mut entries, "b(t) [cm]", "t").unwrap();
        let c = compile_into(&mut entries, "c", "a + b").unwrap();
        assert_eq!(c.units(), Some("m"));
        assert_eq!(c.rhs().unwrap(), "a(t) + b(t)/100");
        let out = c.call(&[Array::scalar(100.0)]).unwrap();
        assert!((out.data()[0] - 101.0).abs() < 1e-12);
    }

    #[test]
    fn test_transcendental_needs_dimensionless() {
        let mut entries = Entries::new();
        compile_into(&mut entries, "a(t) [m]", "t").unwrap();
        let err = compile_into(&mut entries, "s", "sin(a)").unwrap_err();
        assert_eq!(err.code, codes::INCOMPATIBLE_UNITS);
    }

    #[test]
    fn test_sqrt_takes_root_of_unit() {
        let mut entries = Entries::new();
        compile_into(&mut entries, "area(t) [m^2]", "t").unwrap();
        let side = compile_into(&mut entries, "side", "sqrt(area)").unwrap();
        assert_eq!(side.unit().unwrap().dimension, kamodo_units::Dimension::LENGTH);
        let out = side.call(&[Array::scalar(9.0)]).unwrap();
        assert_eq!(out.data(), &[3.0]);
    }

    #[test]
    fn test_unit_power_needs_constant_exponent() {
        let mut entries = Entries::new();
        compile_into(&mut entries, "a(t) [m]", "t").unwrap();
        let err = compile_into(&mut entries, "p", "a**t").unwrap_err();
        assert_eq!(err.code, codes::INCOMPATIBLE_UNITS);
    }

    #[test]
    fn test_defaults_from_references() {
        let mut entries = Entries::new();
        let spec = parse_key("rho").unwrap();
        entries.insert("rho".into(), Arc::new(compile_primitive(&spec, &rho(), f64::NAN).unwrap()));
        let twice = compile_into(&mut entries, "twice", "2*rho").unwrap();
        assert_eq!(twice.params(), &["x".to_string(), "y".to_string(), "z".to_string()]);
        assert_eq!(twice.defaults().len(), 3);
        assert_eq!(twice.data().unwrap().data(), &[12.0]);
        assert_eq!(twice.units(), Some("kg/m^3"));
    }

    #[test]
    fn test_call_fills_trailing_defaults() {
        let mut entries = Entries::new();
        let spec = parse_key("rho").unwrap();
        entries.insert("rho".into(), Arc::new(compile_primitive(&spec, &rho(), f64::NAN).unwrap()));
        let g = compile_into(&mut entries, "g(a)", "rho(a)").unwrap();
        assert_eq!(g.call(&[Array::scalar(10.0)]).unwrap().data(), &[15.0]);
    }

    #[test]
    fn test_primitive_key_units_rescale() {
        let spec = parse_key("rho [g/cm^3]").unwrap();
        let entry = compile_primitive(&spec, &rho(), f64::NAN).unwrap();
        assert_eq!(entry.units(), Some("g/cm^3"));
        let out = entry.call(&[]).unwrap();
        assert!((out.data()[0] - 0.006).abs() < 1e-12);
    }

    #[test]
    fn test_primitive_key_units_incompatible() {
        let spec = parse_key("rho [m]").unwrap();
        let err = compile_primitive(&spec, &rho(), f64::NAN).unwrap_err();
        assert_eq!(err.code, codes::INCOMPATIBLE_UNITS);
    }

    #[test]
    fn test_primitive_args_must_match() {
        let spec = parse_key("rho(x, y)").unwrap();
        let err = compile_primitive(&spec, &rho(), f64::NAN).unwrap_err();
        assert_eq!(err.code, codes::MALFORMED_KEY);
    }
}
