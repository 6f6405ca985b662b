//! Abstract Syntax Tree for right-hand-side expressions

use kamodo_core::Number;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Exact numeric literal
    Number(Number),
    Symbol(String),
    BinaryOp(Box<Expr>, BinOp, Box<Expr>),
    UnaryOp(UnaryOp, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp { Add, Sub, Mul, Div, Pow }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp { Neg }

impl Expr {
    /// Names referenced as bare symbols, in first-seen order
    pub fn symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Symbol(name) = e {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
        });
        out
    }

    /// Names used in call position, in first-seen order
    pub fn calls(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Call(name, _) = e {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
        });
        out
    }

    /// Pre-order traversal
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Number(_) | Expr::Symbol(_) => {}
            Expr::BinaryOp(left, _, right) => {
                left.walk(f);
                right.walk(f);
            }
            Expr::UnaryOp(_, inner) => inner.walk(f),
            Expr::Call(_, args) => {
                for arg in args {
                    arg.walk(f);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_first_seen() {
        let e = Expr::BinaryOp(
            Box::new(Expr::Call("f".into(), vec![Expr::Symbol("y".into())])),
            BinOp::Add,
            Box::new(Expr::BinaryOp(
                Box::new(Expr::Symbol("x".into())),
                BinOp::Mul,
                Box::new(Expr::Symbol("y".into())),
            )),
        );
        assert_eq!(e.symbols(), vec!["y".to_string(), "x".to_string()]);
        assert_eq!(e.calls(), vec!["f".to_string()]);
    }
}
