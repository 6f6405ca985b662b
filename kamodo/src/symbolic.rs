//! Canonical symbolic expressions
//!
//! `Sym` is the resolved form of a right-hand side: symbols are classified
//! as parameters, constants, built-in functions or registry applications,
//! and sums and products are kept flattened with an exact rational
//! coefficient. The constructors below canonicalise as they build, so two
//! spellings of the same expression print the same text.
//!
//! Text printing follows the usual computer-algebra conventions:
//! constants lead a product, negative powers move to a denominator,
//! powers are written `**` and rational exponents are parenthesised.

use std::fmt;

use kamodo_core::Number;
use serde::Serialize;

/// Named mathematical constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pi" => Some(Constant::Pi),
            "E" => Some(Constant::E),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "E",
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
            Constant::E => std::f64::consts::E,
        }
    }
}

/// Built-in elementwise functions. `sqrt` is not listed: it becomes a
/// power of one half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Log,
    Log10,
    Abs,
    Atan2,
}

/// Names accepted in call position besides registry entries
pub const BUILTIN_NAMES: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh",
    "exp", "log", "ln", "log10", "sqrt", "abs", "atan2",
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Builtin::Sin,
            "cos" => Builtin::Cos,
            "tan" => Builtin::Tan,
            "asin" => Builtin::Asin,
            "acos" => Builtin::Acos,
            "atan" => Builtin::Atan,
            "sinh" => Builtin::Sinh,
            "cosh" => Builtin::Cosh,
            "tanh" => Builtin::Tanh,
            "exp" => Builtin::Exp,
            "log" | "ln" => Builtin::Log,
            "log10" => Builtin::Log10,
            "abs" => Builtin::Abs,
            "atan2" => Builtin::Atan2,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Asin => "asin",
            Builtin::Acos => "acos",
            Builtin::Atan => "atan",
            Builtin::Sinh => "sinh",
            Builtin::Cosh => "cosh",
            Builtin::Tanh => "tanh",
            Builtin::Exp => "exp",
            Builtin::Log => "log",
            Builtin::Log10 => "log10",
            Builtin::Abs => "abs",
            Builtin::Atan2 => "atan2",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Builtin::Atan2 => 2,
            _ => 1,
        }
    }

    pub fn apply1(&self, x: f64) -> f64 {
        match self {
            Builtin::Sin => x.sin(),
            Builtin::Cos => x.cos(),
            Builtin::Tan => x.tan(),
            Builtin::Asin => x.asin(),
            Builtin::Acos => x.acos(),
            Builtin::Atan => x.atan(),
            Builtin::Sinh => x.sinh(),
            Builtin::Cosh => x.cosh(),
            Builtin::Tanh => x.tanh(),
            Builtin::Exp => x.exp(),
            Builtin::Log => x.ln(),
            Builtin::Log10 => x.log10(),
            Builtin::Abs => x.abs(),
            Builtin::Atan2 => f64::NAN,
        }
    }
}

/// Resolved, canonical expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Sym {
    Num(Number),
    Const(Constant),
    /// Parameter of the entry being defined
    Var(String),
    Func(Builtin, Vec<Sym>),
    /// Application of a registry entry
    Apply(String, Vec<Sym>),
    Add(Vec<Sym>),
    /// Coefficient times factors; the coefficient is never 0 and the
    /// factors are never numbers
    Mul(Number, Vec<Sym>),
    Pow(Box<Sym>, Box<Sym>),
}

impl Sym {
    pub fn num(n: Number) -> Sym {
        Sym::Num(n)
    }

    pub fn int(n: i64) -> Sym {
        Sym::Num(Number::from_i64(n))
    }

    pub fn as_num(&self) -> Option<&Number> {
        match self {
            Sym::Num(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_num(&self) -> bool {
        matches!(self, Sym::Num(_))
    }

    // ========== Canonicalising constructors ==========

    pub fn add(terms: Vec<Sym>) -> Sym {
        let mut constant = Number::zero();
        let mut collected: Vec<(Number, Sym)> = Vec::new();

        for term in flatten_add(terms) {
            if let Sym::Num(n) = term {
                constant = constant.add(&n);
                continue;
            }
            let (coef, rest) = split_coefficient(term);
            match collected.iter_mut().find(|(_, r)| *r == rest) {
                Some(slot) => slot.0 = slot.0.add(&coef),
                None => collected.push((coef, rest)),
            }
        }

        let mut out: Vec<Sym> = collected
            .into_iter()
            .filter(|(c, _)| !c.is_zero())
            .map(|(c, rest)| scale(c, rest))
            .collect();
        if !constant.is_zero() {
            out.push(Sym::Num(constant));
        }

        match out.len() {
            0 => Sym::int(0),
            1 => out.remove(0),
            _ => Sym::Add(out),
        }
    }

    pub fn mul(factors: Vec<Sym>) -> Sym {
        let mut coef = Number::one();
        let mut powers: Vec<(Sym, Sym)> = Vec::new();

        for factor in flatten_mul(factors, &mut coef) {
            let (base, exp) = match factor {
                Sym::Pow(b, e) => (*b, *e),
                other => (other, Sym::int(1)),
            };
            let merged = powers.iter_mut().find(|(b, e)| *b == base && e.is_num() && exp.is_num());
            match merged {
                Some(slot) => {
                    if let (Some(a), Some(b)) = (slot.1.as_num(), exp.as_num()) {
                        slot.1 = Sym::Num(a.add(b));
                    }
                }
                None => powers.push((base, exp)),
            }
        }

        if coef.is_zero() {
            return Sym::int(0);
        }

        let mut out = Vec::with_capacity(powers.len());
        for (base, exp) in powers {
            match Sym::pow(base, exp) {
                Sym::Num(n) => coef = coef.mul(&n),
                Sym::Mul(c, fs) => {
                    coef = coef.mul(&c);
                    out.extend(fs);
                }
                other => out.push(other),
            }
        }

        if coef.is_zero() {
            return Sym::int(0);
        }
        if out.is_empty() {
            return Sym::Num(coef);
        }
        if coef.is_one() && out.len() == 1 {
            return out.remove(0);
        }
        Sym::Mul(coef, out)
    }

    pub fn pow(base: Sym, exp: Sym) -> Sym {
        if let Some(e) = exp.as_num() {
            if e.is_zero() {
                return Sym::int(1);
            }
            if e.is_one() {
                return base;
            }
        }

        match (base, exp) {
            (Sym::Num(a), Sym::Num(e)) => match numeric_pow(&a, &e) {
                Some(n) => Sym::Num(n),
                None => Sym::Pow(Box::new(Sym::Num(a)), Box::new(Sym::Num(e))),
            },
            (Sym::Pow(b, inner), Sym::Num(e)) if e.is_integer() && inner.is_num() => {
                let combined = inner.as_num().map(|i| i.mul(&e)).unwrap_or_else(Number::one);
                Sym::pow(*b, Sym::Num(combined))
            }
            (Sym::Mul(c, fs), Sym::Num(e)) if e.is_integer() => {
                let exp_i = e.to_i32();
                let mut factors = Vec::with_capacity(fs.len() + 1);
                match exp_i.and_then(|n| c.pow(n).ok()) {
                    Some(cn) => factors.push(Sym::Num(cn)),
                    None => factors.push(Sym::Pow(Box::new(Sym::Num(c)), Box::new(Sym::Num(e.clone())))),
                }
                factors.extend(fs.into_iter().map(|f| Sym::pow(f, Sym::Num(e.clone()))));
                Sym::mul(factors)
            }
            (base, exp) => Sym::Pow(Box::new(base), Box::new(exp)),
        }
    }

    pub fn neg(x: Sym) -> Sym {
        Sym::mul(vec![Sym::int(-1), x])
    }

    pub fn sub(a: Sym, b: Sym) -> Sym {
        Sym::add(vec![a, Sym::neg(b)])
    }

    pub fn div(a: Sym, b: Sym) -> Sym {
        Sym::mul(vec![a, Sym::pow(b, Sym::int(-1))])
    }

    // ========== Queries ==========

    /// Parameters referenced, in first-seen order
    pub fn vars(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.walk(&mut |s| {
            if let Sym::Var(name) = s {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
        });
        out
    }

    /// Registry entries applied, in first-seen order
    pub fn applications(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.walk(&mut |s| {
            if let Sym::Apply(name, _) = s {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
        });
        out
    }

    pub fn walk(&self, f: &mut impl FnMut(&Sym)) {
        f(self);
        match self {
            Sym::Num(_) | Sym::Const(_) | Sym::Var(_) => {}
            Sym::Func(_, args) | Sym::Apply(_, args) | Sym::Add(args) | Sym::Mul(_, args) => {
                for arg in args {
                    arg.walk(f);
                }
            }
            Sym::Pow(b, e) => {
                b.walk(f);
                e.walk(f);
            }
        }
    }

    /// Binding strength when printed: higher binds tighter
    fn precedence(&self) -> u8 {
        match self {
            Sym::Add(_) => PREC_ADD,
            Sym::Mul(..) => PREC_MUL,
            Sym::Num(n) if n.is_negative() || !n.is_integer() => PREC_MUL,
            Sym::Pow(_, e) if is_half(e) => PREC_ATOM,
            Sym::Pow(_, e) if e.as_num().is_some_and(Number::is_negative) => PREC_MUL,
            Sym::Pow(..) => PREC_POW,
            _ => PREC_ATOM,
        }
    }

    /// `-x` style terms print with a leading minus
    pub(crate) fn is_negative_term(&self) -> bool {
        match self {
            Sym::Num(n) | Sym::Mul(n, _) => n.is_negative(),
            _ => false,
        }
    }
}

pub(crate) const PREC_ADD: u8 = 10;
pub(crate) const PREC_MUL: u8 = 20;
pub(crate) const PREC_POW: u8 = 30;
pub(crate) const PREC_ATOM: u8 = 40;

pub(crate) fn is_half(e: &Sym) -> bool {
    e.as_num().is_some_and(|n| n.numerator().is_one() && n.denominator().to_i32() == Some(2))
}

fn flatten_add(terms: Vec<Sym>) -> Vec<Sym> {
    let mut out = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Sym::Add(inner) => out.extend(flatten_add(inner)),
            other => out.push(other),
        }
    }
    out
}

fn flatten_mul(factors: Vec<Sym>, coef: &mut Number) -> Vec<Sym> {
    let mut out = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor {
            Sym::Num(n) => *coef = coef.mul(&n),
            Sym::Mul(c, inner) => {
                *coef = coef.mul(&c);
                out.extend(flatten_mul(inner, coef));
            }
            other => out.push(other),
        }
    }
    out
}

fn split_coefficient(term: Sym) -> (Number, Sym) {
    match term {
        Sym::Mul(c, mut fs) if fs.len() == 1 => (c, fs.remove(0)),
        Sym::Mul(c, fs) => (c, Sym::Mul(Number::one(), fs)),
        other => (Number::one(), other),
    }
}

fn scale(c: Number, rest: Sym) -> Sym {
    if c.is_one() {
        return rest;
    }
    match rest {
        Sym::Mul(_, fs) => Sym::Mul(c, fs),
        other => Sym::Mul(c, vec![other]),
    }
}

/// Exact power of two numbers, when the result is rational
fn numeric_pow(base: &Number, exp: &Number) -> Option<Number> {
    if base.is_zero() && exp.is_negative() {
        return None;
    }
    let num = exp.numerator().to_i32()?;
    let den = u32::try_from(exp.denominator().to_i32()?).ok()?;
    base.root(den)?.pow(num).ok()
}

// ========== Text printing ==========

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sym::Num(n) => write!(f, "{}", n),
            Sym::Const(c) => write!(f, "{}", c.name()),
            Sym::Var(name) => write!(f, "{}", name),
            Sym::Func(func, args) => write!(f, "{}({})", func.name(), join(args, ", ")),
            Sym::Apply(name, args) => write!(f, "{}({})", name, join(args, ", ")),
            Sym::Add(terms) => write_add(f, terms),
            Sym::Mul(coef, factors) => write_mul(f, coef, factors),
            Sym::Pow(base, exp) => write_pow(f, base, exp),
        }
    }
}

fn join(args: &[Sym], sep: &str) -> String {
    args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(sep)
}

/// Wrap in parentheses when `s` binds looser than `min`
fn wrap(s: &Sym, min: u8) -> String {
    if s.precedence() < min {
        format!("({})", s)
    } else {
        s.to_string()
    }
}

/// Non-numeric terms first, in order, then the numeric term
pub(crate) fn ordered_terms(terms: &[Sym]) -> Vec<&Sym> {
    let (nums, rest): (Vec<&Sym>, Vec<&Sym>) = terms.iter().partition(|t| t.is_num());
    rest.into_iter().chain(nums).collect()
}

fn write_add(f: &mut fmt::Formatter<'_>, terms: &[Sym]) -> fmt::Result {
    for (i, term) in ordered_terms(terms).into_iter().enumerate() {
        if i == 0 {
            write!(f, "{}", term)?;
        } else if term.is_negative_term() {
            write!(f, " - {}", Sym::neg(term.clone()))?;
        } else {
            write!(f, " + {}", term)?;
        }
    }
    Ok(())
}

/// Split factors into numerator and denominator; constants lead
pub(crate) fn split_fraction(factors: &[Sym]) -> (Vec<Sym>, Vec<Sym>) {
    let mut numer = Vec::new();
    let mut denom = Vec::new();
    for factor in factors {
        match factor {
            Sym::Pow(base, exp) if exp.as_num().is_some_and(Number::is_negative) => {
                let positive = exp.as_num().map(Number::neg).unwrap_or_else(Number::one);
                denom.push(Sym::pow((**base).clone(), Sym::Num(positive)));
            }
            other => numer.push(other.clone()),
        }
    }
    numer.sort_by_key(|s| !matches!(s, Sym::Const(_)));
    (numer, denom)
}

fn write_mul(f: &mut fmt::Formatter<'_>, coef: &Number, factors: &[Sym]) -> fmt::Result {
    let (numer, denom) = split_fraction(factors);
    if coef.is_negative() {
        write!(f, "-")?;
    }
    let coef = coef.abs();
    let (c_num, c_den) = (coef.numerator(), coef.denominator());

    let mut top: Vec<String> = Vec::new();
    if !c_num.is_one() || numer.is_empty() {
        top.push(c_num.to_string());
    }
    top.extend(numer.iter().map(|s| wrap(s, PREC_MUL)));
    write!(f, "{}", top.join("*"))?;

    let mut bottom: Vec<String> = Vec::new();
    if !c_den.is_one() {
        bottom.push(c_den.to_string());
    }
    bottom.extend(denom.iter().map(|s| wrap(s, PREC_POW)));
    match bottom.len() {
        0 => Ok(()),
        1 => write!(f, "/{}", bottom[0]),
        _ => write!(f, "/({})", bottom.join("*")),
    }
}

fn write_pow(f: &mut fmt::Formatter<'_>, base: &Sym, exp: &Sym) -> fmt::Result {
    if is_half(exp) {
        return write!(f, "sqrt({})", base);
    }
    if let Some(e) = exp.as_num() {
        if e.is_negative() {
            let positive = Sym::pow(base.clone(), Sym::Num(e.neg()));
            return write!(f, "1/{}", wrap(&positive, PREC_POW));
        }
    }

    let base_str = wrap(base, PREC_ATOM);
    let exp_str = match exp {
        Sym::Num(n) if n.is_integer() && !n.is_negative() => n.to_string(),
        Sym::Num(n) => format!("({})", n),
        other => wrap(other, PREC_ATOM),
    };
    write!(f, "{}**{}", base_str, exp_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(s: &str) -> Sym {
        Sym::Var(s.to_string())
    }

    fn rat(n: i64, d: i64) -> Sym {
        Sym::Num(Number::from_ratio(n, d).unwrap())
    }

    fn apply(name: &str, args: &[&str]) -> Sym {
        Sym::Apply(name.to_string(), args.iter().map(|a| var(a)).collect())
    }

    #[test]
    fn test_sphere_volume() {
        // 4/3 * pi * (x**2 + y**2)**(3/2)
        let r2 = Sym::add(vec![
            Sym::pow(var("x"), Sym::int(2)),
            Sym::pow(var("y"), Sym::int(2)),
        ]);
        let e = Sym::mul(vec![
            Sym::mul(vec![Sym::int(4), Sym::pow(Sym::int(3), Sym::int(-1))]),
            Sym::Const(Constant::Pi),
            Sym::pow(r2, rat(3, 2)),
        ]);
        assert_eq!(e.to_string(), "4*pi*(x**2 + y**2)**(3/2)/3");
    }

    #[test]
    fn test_scaled_product() {
        let e = Sym::mul(vec![
            rat(1, 1000),
            Sym::mul(vec![apply("rho", &["x", "y", "z"]), apply("vol", &["x", "y"])]),
        ]);
        assert_eq!(e.to_string(), "rho(x, y, z)*vol(x, y)/1000");
    }

    #[test]
    fn test_constants_lead() {
        let e = Sym::mul(vec![var("x"), Sym::Const(Constant::Pi), Sym::int(2)]);
        assert_eq!(e.to_string(), "2*pi*x");
    }

    #[test]
    fn test_denominator_grouping() {
        let e = Sym::div(var("x"), Sym::mul(vec![Sym::int(3), var("y")]));
        assert_eq!(e.to_string(), "x/(3*y)");
        let e = Sym::div(Sym::int(1), Sym::add(vec![var("x"), var("y")]));
        assert_eq!(e.to_string(), "1/(x + y)");
    }

    #[test]
    fn test_subtraction() {
        let e = Sym::sub(var("x"), Sym::mul(vec![Sym::int(2), var("y")]));
        assert_eq!(e.to_string(), "x - 2*y");
        let e = Sym::sub(Sym::int(1), var("x"));
        assert_eq!(e.to_string(), "-x + 1");
        assert_eq!(Sym::neg(var("x")).to_string(), "-x");
    }

    #[test]
    fn test_like_terms_and_powers_merge() {
        let e = Sym::add(vec![var("x"), var("x")]);
        assert_eq!(e.to_string(), "2*x");
        let e = Sym::mul(vec![var("x"), var("x")]);
        assert_eq!(e.to_string(), "x**2");
        assert_eq!(Sym::sub(var("x"), var("x")), Sym::int(0));
    }

    #[test]
    fn test_numeric_folding() {
        assert_eq!(Sym::pow(Sym::int(4), rat(1, 2)), Sym::int(2));
        assert_eq!(Sym::pow(Sym::int(2), Sym::int(-2)), rat(1, 4));
        assert_eq!(
            Sym::pow(Sym::int(2), rat(1, 2)).to_string(),
            "sqrt(2)"
        );
        assert_eq!(Sym::pow(Sym::pow(var("x"), Sym::int(2)), Sym::int(3)).to_string(), "x**6");
    }

    #[test]
    fn test_sqrt_and_functions() {
        let e = Sym::pow(Sym::add(vec![var("x"), Sym::int(1)]), rat(1, 2));
        assert_eq!(e.to_string(), "sqrt(x + 1)");
        let e = Sym::Func(Builtin::Sin, vec![Sym::mul(vec![Sym::int(2), var("t")])]);
        assert_eq!(e.to_string(), "sin(2*t)");
    }

    #[test]
    fn test_vars_and_applications() {
        let e = Sym::mul(vec![apply("rho", &["x", "y", "z"]), apply("vol", &["x", "y"])]);
        assert_eq!(e.vars(), vec!["x".to_string(), "y".to_string(), "z".to_string()]);
        assert_eq!(e.applications(), vec!["rho".to_string(), "vol".to_string()]);
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(Builtin::from_name("ln"), Some(Builtin::Log));
        assert_eq!(Builtin::from_name("sqrt"), None);
        assert!(BUILTIN_NAMES.contains(&"sqrt"));
        assert_eq!(Builtin::Atan2.arity(), 2);
    }
}
