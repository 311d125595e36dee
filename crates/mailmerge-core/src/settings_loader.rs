//! Settings loading from configuration files.
//!
//! This module provides functions to load [`Settings`] from TOML files, JSON
//! files, and to apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `MAILMERGE_DEBUG` | `debug` |
//! | `MAILMERGE_LOG_LEVEL` | `log_level` |
//! | `MAILMERGE_PARALLEL_EXPANSION` | `render.parallel_expansion` |
//! | `MAILMERGE_STRICT_PARSING` | `render.strict_parsing` |
//! | `MAILMERGE_BASE_URL_VARIABLE` | `render.base_url_variable` |
//! | `MAILMERGE_MAX_TEMPLATE_BYTES` | `render.max_template_bytes` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use mailmerge_core::settings_loader;
//!
//! // Load from TOML
//! let settings = settings_loader::from_toml_file("mailmerge.toml").unwrap();
//!
//! // Load from TOML with environment overrides
//! let settings = settings_loader::from_toml_file_with_env("mailmerge.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::MergeError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, MergeError> {
    // Deserialize into a generic value first and merge it over the defaults,
    // so partial files only override what they mention.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| MergeError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, MergeError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        MergeError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, MergeError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, MergeError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| MergeError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, MergeError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        MergeError::ConfigurationError(format!(
            "Failed to read JSON file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Boolean variables accept "true"/"1"/"yes" as true and anything else as
/// false. Numeric variables that fail to parse are ignored.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("MAILMERGE_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("MAILMERGE_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("MAILMERGE_PARALLEL_EXPANSION") {
        settings.render.parallel_expansion = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("MAILMERGE_STRICT_PARSING") {
        settings.render.strict_parsing = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("MAILMERGE_BASE_URL_VARIABLE") {
        settings.render.base_url_variable = val;
    }

    if let Ok(val) = std::env::var("MAILMERGE_MAX_TEMPLATE_BYTES") {
        if let Ok(limit) = val.parse::<usize>() {
            settings.render.max_template_bytes = limit;
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn merge_over_defaults(value: serde_json::Value, format: &str) -> Result<Settings, MergeError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        MergeError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        MergeError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = true
            log_level = "debug"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "debug");
        // Defaults preserved
        assert_eq!(settings.render.repeater_tag, "repeater");
    }

    #[test]
    fn test_from_toml_str_render_section() {
        let toml = r#"
            [render]
            repeater_tag = "loop"
            parallel_expansion = false
            max_template_bytes = 1024
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.render.repeater_tag, "loop");
        assert!(!settings.render.parallel_expansion);
        assert_eq!(settings.render.max_template_bytes, 1024);
        // Siblings in the same table keep their defaults
        assert_eq!(settings.render.repeater_item_tag, "repeateritem");
        assert_eq!(settings.render.image_tag, "img");
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("[[invalid toml content");
        assert!(matches!(result, Err(MergeError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let result = from_toml_str("debug = \"sometimes\"");
        assert!(result.is_err());
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{
            "log_level": "trace",
            "render": { "strict_parsing": true, "base_url_variable": "cdn" }
        }"#;

        let settings = from_json_str(json).unwrap();
        assert_eq!(settings.log_level, "trace");
        assert!(settings.render.strict_parsing);
        assert_eq!(settings.render.base_url_variable, "cdn");
        assert_eq!(settings.render.variables_selection, "variables");
    }

    #[test]
    fn test_from_json_str_empty_object() {
        let settings = from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    // ── Environment overrides ───────────────────────────────────────

    #[test]
    fn test_apply_env_overrides_base_url_variable() {
        let mut settings = Settings::default();
        std::env::set_var("MAILMERGE_BASE_URL_VARIABLE", "assets");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.render.base_url_variable, "assets");
        std::env::remove_var("MAILMERGE_BASE_URL_VARIABLE");
    }

    #[test]
    fn test_apply_env_overrides_invalid_limit() {
        let mut settings = Settings::default();
        std::env::set_var("MAILMERGE_MAX_TEMPLATE_BYTES", "lots");
        apply_env_overrides(&mut settings);
        assert_eq!(
            settings.render.max_template_bytes,
            crate::settings::DEFAULT_MAX_TEMPLATE_BYTES
        );
        std::env::remove_var("MAILMERGE_MAX_TEMPLATE_BYTES");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("YES"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }

    // ── Files ───────────────────────────────────────────────────────

    #[test]
    fn test_from_toml_file() {
        let dir = std::env::temp_dir().join("mailmerge_test_toml_file");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(&path, "[render]\nimage_tag = \"picture\"\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert_eq!(settings.render.image_tag, "picture");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/nonexistent/mailmerge.toml");
        match result {
            Err(MergeError::ConfigurationError(msg)) => {
                assert!(msg.contains("/nonexistent/mailmerge.toml"));
            }
            other => panic!("expected ConfigurationError, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3});
        let over = serde_json::json!({"a": {"c": 20}});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"b": 1, "c": 20}, "d": 3}));
    }
}
