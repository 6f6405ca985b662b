//! LaTeX printing of symbolic expressions and names

use kamodo_core::Number;

use crate::symbolic::{
    is_half, ordered_terms, split_fraction, Builtin, Constant, Sym, PREC_ADD, PREC_ATOM, PREC_MUL,
    PREC_POW,
};

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta",
    "vartheta", "iota", "kappa", "lambda", "mu", "nu", "xi", "pi", "varpi", "rho", "varrho",
    "sigma", "varsigma", "tau", "upsilon", "phi", "varphi", "chi", "psi", "omega",
    "Gamma", "Delta", "Theta", "Lambda", "Xi", "Pi", "Sigma", "Upsilon", "Phi", "Psi", "Omega",
];

/// LaTeX for a symbol name: greek letters become commands and a trailing
/// `_sub` becomes a subscript, e.g. `rho_0` is `\rho_{0}`
pub fn latex_name(name: &str) -> String {
    let (head, sub) = match name.split_once('_') {
        Some((h, s)) if !h.is_empty() && !s.is_empty() => (h, Some(s)),
        _ => (name, None),
    };
    let head = if GREEK.contains(&head) {
        format!("\\{}", head)
    } else {
        head.to_string()
    };
    match sub {
        Some(s) => format!("{}_{{{}}}", head, latex_name(s)),
        None => head,
    }
}

/// LaTeX for a function name in call position
fn latex_function_name(name: &str) -> String {
    let base = name.split('_').next().unwrap_or(name);
    if base.chars().count() > 1 && !GREEK.contains(&base) {
        format!("\\operatorname{{{}}}", latex_name(name))
    } else {
        latex_name(name)
    }
}

/// `f{\left(x,y \right)}`
pub fn latex_call(name: &str, args: &[String]) -> String {
    format!("{}{{\\left({} \\right)}}", latex_function_name(name), args.join(","))
}

pub fn to_latex(sym: &Sym) -> String {
    match sym {
        Sym::Num(n) => latex_number(n),
        Sym::Const(Constant::Pi) => "\\pi".to_string(),
        Sym::Const(Constant::E) => "e".to_string(),
        Sym::Var(name) => latex_name(name),
        Sym::Apply(name, args) => latex_call(name, &args.iter().map(to_latex).collect::<Vec<_>>()),
        Sym::Func(func, args) => latex_builtin(*func, args),
        Sym::Add(terms) => latex_add(terms),
        Sym::Mul(coef, factors) => latex_mul(coef, factors),
        Sym::Pow(base, exp) => latex_pow(base, exp),
    }
}

fn latex_number(n: &Number) -> String {
    if n.is_integer() {
        return n.to_string();
    }
    let sign = if n.is_negative() { "- " } else { "" };
    let n = n.abs();
    format!("{}\\frac{{{}}}{{{}}}", sign, n.numerator(), n.denominator())
}

fn latex_builtin(func: Builtin, args: &[Sym]) -> String {
    let arg_strs: Vec<String> = args.iter().map(to_latex).collect();
    let joined = arg_strs.join(",");
    match func {
        Builtin::Exp => format!("e^{{{}}}", joined),
        Builtin::Abs => format!("\\left|{}\\right|", joined),
        Builtin::Log10 => format!("\\log_{{10}}{{\\left({} \\right)}}", joined),
        Builtin::Atan2 => format!("\\operatorname{{atan_{{2}}}}{{\\left({} \\right)}}", joined),
        Builtin::Asin | Builtin::Acos | Builtin::Atan => {
            format!("\\operatorname{{{}}}{{\\left({} \\right)}}", func.name(), joined)
        }
        _ => format!("\\{}{{\\left({} \\right)}}", func.name(), joined),
    }
}

fn wrap(sym: &Sym, min: u8) -> String {
    if precedence(sym) < min {
        format!("\\left({}\\right)", to_latex(sym))
    } else {
        to_latex(sym)
    }
}

fn precedence(sym: &Sym) -> u8 {
    match sym {
        Sym::Add(_) => PREC_ADD,
        Sym::Mul(..) => PREC_MUL,
        Sym::Num(n) if n.is_negative() || !n.is_integer() => PREC_MUL,
        Sym::Pow(..) => PREC_POW,
        // calls carry their own delimiters but read badly under a power
        Sym::Apply(..) | Sym::Func(..) => PREC_POW,
        _ => PREC_ATOM,
    }
}

fn latex_add(terms: &[Sym]) -> String {
    let mut out = String::new();
    for (i, term) in ordered_terms(terms).into_iter().enumerate() {
        if i == 0 {
            out.push_str(&to_latex(term));
        } else if term.is_negative_term() {
            out.push_str(" - ");
            out.push_str(&to_latex(&Sym::neg(term.clone())));
        } else {
            out.push_str(" + ");
            out.push_str(&to_latex(term));
        }
    }
    out
}

fn latex_mul(coef: &Number, factors: &[Sym]) -> String {
    let (numer, denom) = split_fraction(factors);
    let sign = if coef.is_negative() { "- " } else { "" };
    let coef = coef.abs();
    let (c_num, c_den) = (coef.numerator(), coef.denominator());

    let mut top: Vec<String> = Vec::new();
    if !c_num.is_one() || numer.is_empty() {
        top.push(c_num.to_string());
    }
    top.extend(numer.iter().map(|s| wrap(s, PREC_MUL)));

    let mut bottom: Vec<String> = Vec::new();
    if !c_den.is_one() {
        bottom.push(c_den.to_string());
    }
    bottom.extend(denom.iter().map(|s| wrap(s, PREC_MUL)));

    if bottom.is_empty() {
        format!("{}{}", sign, top.join(" "))
    } else {
        format!("{}\\frac{{{}}}{{{}}}", sign, top.join(" "), bottom.join(" "))
    }
}

fn latex_pow(base: &Sym, exp: &Sym) -> String {
    if is_half(exp) {
        return format!("\\sqrt{{{}}}", to_latex(base));
    }
    if let Some(e) = exp.as_num() {
        if e.is_negative() {
            let positive = Sym::pow(base.clone(), Sym::Num(e.neg()));
            return format!("\\frac{{1}}{{{}}}", to_latex(&positive));
        }
    }
    let exp_str = match exp {
        Sym::Num(n) if !n.is_integer() => {
            format!("\\frac{{{}}}{{{}}}", n.numerator(), n.denominator())
        }
        other => to_latex(other),
    };
    format!("{}^{{{}}}", wrap(base, PREC_ATOM), exp_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(s: &str) -> Sym {
        Sym::Var(s.to_string())
    }

    #[test]
    fn test_names() {
        assert_eq!(latex_name("rho"), "\\rho");
        assert_eq!(latex_name("x"), "x");
        assert_eq!(latex_name("rho_0"), "\\rho_{0}");
        assert_eq!(latex_name("B_x"), "B_{x}");
        assert_eq!(latex_name("_x"), "_x");
    }

    #[test]
    fn test_calls() {
        let args = vec!["x".to_string(), "y".to_string()];
        assert_eq!(latex_call("f", &args), "f{\\left(x,y \\right)}");
        assert_eq!(latex_call("rho", &args), "\\rho{\\left(x,y \\right)}");
        assert_eq!(latex_call("vol", &args), "\\operatorname{vol}{\\left(x,y \\right)}");
    }

    #[test]
    fn test_sphere_volume() {
        let r2 = Sym::add(vec![Sym::pow(var("x"), Sym::int(2)), Sym::pow(var("y"), Sym::int(2))]);
        let e = Sym::mul(vec![
            Sym::Num(Number::from_ratio(4, 3).unwrap()),
            Sym::Const(Constant::Pi),
            Sym::pow(r2, Sym::Num(Number::from_ratio(3, 2).unwrap())),
        ]);
        assert_eq!(
            to_latex(&e),
            "\\frac{4 \\pi \\left(x^{2} + y^{2}\\right)^{\\frac{3}{2}}}{3}"
        );
    }

    #[test]
    fn test_negative_and_sqrt() {
        let e = Sym::sub(var("a"), Sym::pow(var("b"), Sym::Num(Number::from_ratio(1, 2).unwrap())));
        assert_eq!(to_latex(&e), "a - \\sqrt{b}");
        let e = Sym::div(var("x"), var("y"));
        assert_eq!(to_latex(&e), "\\frac{x}{y}");
    }

    #[test]
    fn test_builtins() {
        let e = Sym::Func(Builtin::Sin, vec![var("theta")]);
        assert_eq!(to_latex(&e), "\\sin{\\left(\\theta \\right)}");
        let e = Sym::Func(Builtin::Exp, vec![var("x")]);
        assert_eq!(to_latex(&e), "e^{x}");
    }
}
