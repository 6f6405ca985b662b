//! Introspection: LaTeX, the detail table and per-entry help

use indexmap::IndexMap;
use kamodo_core::KamodoError;
use serde::Serialize;

use crate::entry::{Entry, EntryKind};
use crate::latex::{latex_call, latex_name, to_latex};
use crate::registry::{Kamodo, Registry};

/// One row of the four-column summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    /// Bare name
    pub lhs: String,
    /// Canonical expression, `None` for primitives
    pub rhs: Option<String>,
    /// Signature without hidden arguments
    pub symbol: String,
    pub units: Option<String>,
}

/// Serializable summary of one entry
#[derive(Debug, Clone, Serialize)]
pub struct HelpInfo {
    pub name: String,
    pub signature: String,
    pub kind: EntryKind,
    pub rhs: Option<String>,
    pub units: Option<String>,
    pub citation: Option<String>,
    pub equation: Option<String>,
    pub latex: String,
    /// Shape of each default argument
    pub defaults: IndexMap<String, Vec<usize>>,
    pub data_shape: Option<Vec<usize>>,
    pub dependencies: Vec<String>,
    pub fill_value: f64,
}

fn visible_args(entry: &Entry) -> Vec<String> {
    entry
        .symbol()
        .visible_params(&entry.meta().hidden_args)
        .into_iter()
        .map(latex_name)
        .collect()
}

/// `\begin{equation}lhs [units] = rhs\end{equation}` for one entry
pub fn entry_latex(entry: &Entry) -> String {
    let args = visible_args(entry);
    let mut lhs = if entry.params().is_empty() {
        latex_name(entry.name())
    } else {
        latex_call(entry.name(), &args)
    };
    if let Some(units) = entry.units() {
        lhs.push_str(&format!(" [{}]", units));
    }

    let rhs = match (entry.expression(), &entry.meta().equation) {
        (Some(expr), _) => to_latex(expr),
        (None, Some(equation)) => equation.clone(),
        (None, None) => latex_call("lambda", &args),
    };

    format!("\\begin{{equation}}{} = {}\\end{{equation}}", lhs, rhs)
}

pub fn render_latex(registry: &Kamodo) -> Vec<String> {
    registry.iterate().map(|(_, entry)| entry_latex(entry)).collect()
}

pub fn detail(registry: &Kamodo) -> Vec<DetailRow> {
    registry
        .iterate()
        .map(|(name, entry)| DetailRow {
            lhs: name.to_string(),
            rhs: entry.rhs(),
            symbol: entry.symbol().visible_signature(&entry.meta().hidden_args),
            units: entry.units().map(str::to_string),
        })
        .collect()
}

pub fn detail_markdown(rows: &[DetailRow]) -> String {
    let mut output = String::new();
    output.push_str("| lhs | rhs | symbol | units |\n");
    output.push_str("|-----|-----|--------|-------|\n");
    for row in rows {
        output.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.lhs,
            row.rhs.as_deref().unwrap_or(""),
            row.symbol,
            row.units.as_deref().unwrap_or("")
        ));
    }
    output
}

pub fn help(entry: &Entry) -> HelpInfo {
    let meta = entry.meta();
    HelpInfo {
        name: entry.name().to_string(),
        signature: entry.symbol().visible_signature(&meta.hidden_args),
        kind: entry.kind(),
        rhs: entry.rhs(),
        units: entry.units().map(str::to_string),
        citation: meta.citation.clone(),
        equation: meta.equation.clone(),
        latex: entry_latex(entry),
        defaults: entry
            .defaults()
            .iter()
            .map(|(name, value)| (name.clone(), value.shape().to_vec()))
            .collect(),
        data_shape: entry.data().map(|d| d.shape().to_vec()),
        dependencies: entry.dependencies().to_vec(),
        fill_value: entry.fill_value(),
    }
}

impl Kamodo {
    pub fn render_latex(&self) -> Vec<String> {
        render_latex(self)
    }

    /// All equations, one per line
    pub fn to_latex(&self) -> String {
        render_latex(self).join("\n")
    }

    pub fn detail(&self) -> Vec<DetailRow> {
        detail(self)
    }

    pub fn detail_markdown(&self) -> String {
        detail_markdown(&detail(self))
    }

    pub fn help(&self, key: &str) -> Result<HelpInfo, KamodoError> {
        Ok(help(self.get(key)?.as_ref()))
    }
}

impl std::fmt::Display for Kamodo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_latex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kamodo_core::Array;
    use kamodo_plugin::{kamodofy, FnPlugin};

    #[test]
    fn test_derived_latex() {
        let mut k = Kamodo::new();
        k.set("f(x, y) [m]", "x**2 + y").unwrap();
        assert_eq!(
            k.render_latex(),
            vec!["\\begin{equation}f{\\left(x,y \\right)} [m] = x^{2} + y\\end{equation}".to_string()]
        );
    }

    #[test]
    fn test_primitive_placeholder_and_hidden_args() {
        let f = kamodofy(FnPlugin::new(&["x", "t"], |a: &[Array]| Ok(a[0].clone())))
            .hidden_args(["t"])
            .build();
        let mut k = Kamodo::new();
        k.set("g", f).unwrap();
        assert_eq!(
            k.to_latex(),
            "\\begin{equation}g{\\left(x \\right)} = \\lambda{\\left(x \\right)}\\end{equation}"
        );
        let rows = k.detail();
        assert_eq!(rows[0].symbol, "g(x)");
        assert_eq!(rows[0].rhs, None);
    }

    #[test]
    fn test_primitive_equation() {
        let f = kamodofy(FnPlugin::new(&["x"], |a: &[Array]| Ok(a[0].map(|v| v * v))))
            .equation("x^{2}")
            .citation("Pembroke et al. 2019")
            .build();
        let mut k = Kamodo::new();
        k.set("sq", f).unwrap();
        assert!(k.to_latex().ends_with("= x^{2}\\end{equation}"));
        let info = k.help("sq").unwrap();
        assert_eq!(info.citation.as_deref(), Some("Pembroke et al. 2019"));
        assert_eq!(info.kind, EntryKind::Primitive);
    }

    #[test]
    fn test_detail_markdown() {
        let mut k = Kamodo::new();
        k.set("f(x)", "2*x").unwrap();
        let md = k.detail_markdown();
        assert!(md.starts_with("| lhs | rhs | symbol | units |\n"));
        assert!(md.contains("| f | 2*x | f(x) |  |\n"));
    }

    #[test]
    fn test_help_defaults_shapes() {
        let f = kamodofy(FnPlugin::new(&["x"], |a: &[Array]| Ok(a[0].clone())).with_default("x", Array::linspace(0.0, 1.0, 5)))
            .units("m")
            .build();
        let mut k = Kamodo::new();
        k.set("p", f).unwrap();
        k.set("q", "2*p").unwrap();
        let info = k.help("q(x)").unwrap();
        assert_eq!(info.defaults.get("x"), Some(&vec![5]));
        assert_eq!(info.data_shape, Some(vec![5]));
        assert_eq!(info.dependencies, vec!["p".to_string()]);
        assert_eq!(info.units.as_deref(), Some("m"));
    }
}
