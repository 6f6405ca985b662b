//! Registry configuration

use serde::Deserialize;

/// What happens to dependents when an entry they reference is replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// Dependents keep their compiled snapshot until `refresh` is called
    #[default]
    Stale,
    /// Dependents are recompiled, and their data recomputed, in the same `set`
    Eager,
}

impl RefreshPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stale" => Some(RefreshPolicy::Stale),
            "eager" => Some(RefreshPolicy::Eager),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KamodoConfig {
    /// Fill value given to new entries
    pub fill_value: f64,
    pub refresh: RefreshPolicy,
    /// Allow unregistered symbols to become parameters when a key has no
    /// explicit argument list
    pub free_parameters: bool,
}

impl Default for KamodoConfig {
    fn default() -> Self {
        Self {
            fill_value: f64::NAN,
            refresh: RefreshPolicy::Stale,
            free_parameters: true,
        }
    }
}

impl KamodoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `KAMODO_FILL_VALUE`, `KAMODO_REFRESH` and
    /// `KAMODO_FREE_PARAMETERS`. Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("KAMODO_FILL_VALUE") {
            match raw.trim().parse::<f64>() {
                Ok(v) => config.fill_value = v,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid KAMODO_FILL_VALUE"),
            }
        }
        if let Some(raw) = lookup("KAMODO_REFRESH") {
            match RefreshPolicy::parse(&raw) {
                Some(policy) => config.refresh = policy,
                None => tracing::warn!(value = %raw, "ignoring invalid KAMODO_REFRESH"),
            }
        }
        if let Some(raw) = lookup("KAMODO_FREE_PARAMETERS") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.free_parameters = true,
                "0" | "false" | "no" => config.free_parameters = false,
                _ => tracing::warn!(value = %raw, "ignoring invalid KAMODO_FREE_PARAMETERS"),
            }
        }
        config
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_free_parameters(mut self, allow: bool) -> Self {
        self.free_parameters = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = KamodoConfig::default();
        assert!(config.fill_value.is_nan());
        assert_eq!(config.refresh, RefreshPolicy::Stale);
        assert!(config.free_parameters);
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("KAMODO_FILL_VALUE", "-999"),
            ("KAMODO_REFRESH", "Eager"),
            ("KAMODO_FREE_PARAMETERS", "no"),
        ]
        .into_iter()
        .collect();
        let config = KamodoConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.fill_value, -999.0);
        assert_eq!(config.refresh, RefreshPolicy::Eager);
        assert!(!config.free_parameters);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let config = KamodoConfig::from_lookup(|k| match k {
            "KAMODO_REFRESH" => Some("sometimes".to_string()),
            _ => None,
        });
        assert_eq!(config.refresh, RefreshPolicy::Stale);
    }

    #[test]
    fn test_deserialize() {
        let config: KamodoConfig = serde_json::from_str(r#"{"refresh": "eager"}"#).unwrap();
        assert_eq!(config.refresh, RefreshPolicy::Eager);
        assert!(config.free_parameters);
    }
}
