//! Numeric function trait and argument binding

use indexmap::IndexMap;
use kamodo_core::{Array, KamodoError, codes};
use crate::EvalContext;

/// A numeric callable over arrays with named, ordered parameters.
///
/// `call` receives exactly one array per parameter, in `params()` order.
/// Binding of missing trailing arguments from defaults happens before the
/// call, see [`bind_positional`] and [`bind_named`].
pub trait NumericFn: Send + Sync {
    fn params(&self) -> &[String];

    fn defaults(&self) -> &IndexMap<String, Array>;

    fn call(&self, args: &[Array], ctx: &EvalContext) -> Result<Array, KamodoError>;
}

/// Bind positional arguments, filling missing trailing ones from defaults
pub fn bind_positional(
    func: &str,
    params: &[String],
    defaults: &IndexMap<String, Array>,
    args: &[Array],
) -> Result<Vec<Array>, KamodoError> {
    if args.len() > params.len() {
        return Err(KamodoError::arg_count(func, params.len(), args.len()));
    }

    let mut bound = args.to_vec();
    for param in &params[args.len()..] {
        match defaults.get(param) {
            Some(value) => bound.push(value.clone()),
            None => return Err(KamodoError::missing_arg(func, param)),
        }
    }
    Ok(bound)
}

/// Bind arguments by name, falling back to defaults
pub fn bind_named(
    func: &str,
    params: &[String],
    defaults: &IndexMap<String, Array>,
    overrides: &IndexMap<String, Array>,
) -> Result<Vec<Array>, KamodoError> {
    if let Some(extra) = overrides.keys().find(|k| !params.iter().any(|p| p == *k)) {
        return Err(KamodoError::new(
            codes::ARG_COUNT,
            format!("{}() got an unexpected argument '{}'", func, extra),
        )
        .with_suggestion(format!("Parameters are: {}", params.join(", "))));
    }

    params
        .iter()
        .map(|param| {
            overrides
                .get(param)
                .or_else(|| defaults.get(param))
                .cloned()
                .ok_or_else(|| KamodoError::missing_arg(func, param))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }

    #[test]
    fn test_bind_positional_fills_defaults() {
        let mut defaults = IndexMap::new();
        defaults.insert("y".to_string(), Array::scalar(2.0));
        let bound = bind_positional("f", &params(), &defaults, &[Array::scalar(1.0)]).unwrap();
        assert_eq!(bound, vec![Array::scalar(1.0), Array::scalar(2.0)]);
    }

    #[test]
    fn test_bind_positional_missing() {
        let err = bind_positional("f", &params(), &IndexMap::new(), &[Array::scalar(1.0)])
            .unwrap_err();
        assert_eq!(err.code, codes::ARG_COUNT);
        assert!(err.message.contains("'y'"));
    }

    #[test]
    fn test_bind_positional_too_many() {
        let args = vec![Array::scalar(1.0); 3];
        let err = bind_positional("f", &params(), &IndexMap::new(), &args).unwrap_err();
        assert_eq!(err.code, codes::ARG_COUNT);
    }

    #[test]
    fn test_bind_named() {
        let mut defaults = IndexMap::new();
        defaults.insert("x".to_string(), Array::scalar(1.0));
        defaults.insert("y".to_string(), Array::scalar(2.0));
        let mut overrides = IndexMap::new();
        overrides.insert("y".to_string(), Array::scalar(5.0));
        let bound = bind_named("f", &params(), &defaults, &overrides).unwrap();
        assert_eq!(bound, vec![Array::scalar(1.0), Array::scalar(5.0)]);

        overrides.insert("z".to_string(), Array::scalar(0.0));
        assert!(bind_named("f", &params(), &defaults, &overrides).is_err());
    }
}
