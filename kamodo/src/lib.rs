//! Kamodo - composable, unit-aware function registry
//!
//! Functions are registered under keys such as `rho(x, y, z) [kg/m^3]`,
//! either as numeric callables wrapped with [`kamodofy`] or as expressions
//! over other registered functions. Expressions are compiled into a
//! canonical symbolic form that drives both evaluation and display, with
//! units inferred and converted along the way.

mod ast;
mod compile;
mod config;
mod entry;
mod graph;
mod key;
mod latex;
mod parser;
mod plot;
mod registry;
mod render;
mod similar;
pub mod symbolic;

pub use ast::{BinOp, Expr, UnaryOp};
pub use compile::CompiledFn;
pub use config::{KamodoConfig, RefreshPolicy};
pub use entry::{Entry, EntryKind, RegistryValue, Symbol};
pub use key::{parse_key, KeySpec};
pub use latex::{latex_call, latex_name, to_latex};
pub use parser::parse_expr;
pub use plot::{Figure, Trace};
pub use registry::{DeleteMode, Iter, Kamodo, Registry};
pub use render::{detail, detail_markdown, entry_latex, help, render_latex, DetailRow, HelpInfo};

pub use kamodo_core::{codes, Array, KamodoError, Number};
pub use kamodo_plugin::{kamodofy, EvalContext, FnPlugin, Interpolated, Interpolator, Kamodofied, Meta, NumericFn};
pub use kamodo_units::{normalize, parse_unit, Dimension, Unit};

pub mod prelude {
    pub use crate::{kamodofy, Array, DeleteMode, FnPlugin, Kamodo, KamodoConfig, KamodoError, Registry};
}
