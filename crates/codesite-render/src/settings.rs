//! Site-wide settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{lenient, lenient_enum};

lenient_enum! {
    /// How accumulated CSS is written into the page head.
    pub enum OutputMode {
        /// One `<style>` element per contributing source.
        Inline => "inline",
        /// A single merged stylesheet.
        File => "file",
    }
    default = Inline, fallback = Inline;
}

/// Typed site settings.
///
/// Keys this crate does not know about are kept in `extra` and remain
/// reachable through [`Settings::get`].
///
/// # Example
///
/// ```
/// use codesite_render::Settings;
///
/// let settings = Settings::from_yaml("theme_override: true\ndefault_header: 3\n").unwrap();
/// assert!(settings.enabled);
/// assert_eq!(settings.default_header, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch. When off nothing renders.
    pub enabled: bool,
    /// Replace the host theme on every request, falling back to the default
    /// layouts when no template applies.
    pub theme_override: bool,
    pub output_mode: OutputMode,
    /// Minify merged CSS in [`OutputMode::File`].
    pub minify_output: bool,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub default_header: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub default_footer: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub default_main_layout: Option<u64>,
    /// Emitted ahead of every per-source stylesheet, never scoped.
    pub global_css: String,
    /// Emitted ahead of every collected script.
    pub global_js: String,
    /// Install the template-logic transformer.
    pub template_logic: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enabled: true,
            theme_override: false,
            output_mode: OutputMode::Inline,
            minify_output: false,
            default_header: None,
            default_footer: None,
            default_main_layout: None,
            global_css: String::new(),
            global_js: String::new(),
            template_logic: true,
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Parses settings from YAML (JSON is accepted too).
    pub fn from_yaml(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_yaml::from_str(source)?)
    }

    /// Looks up a setting by its stored name.
    ///
    /// Returns `default` when the key is unknown or its value is null.
    pub fn get(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        if let Some(value) = self.extra.get(key) {
            return if value.is_null() { default } else { value.clone() };
        }
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => match map.remove(key) {
                Some(serde_json::Value::Null) | None => default,
                Some(value) => value,
            },
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert!(!settings.theme_override);
        assert_eq!(settings.output_mode, OutputMode::Inline);
        assert!(!settings.minify_output);
        assert!(settings.template_logic);
        assert_eq!(settings.default_header, None);
    }

    #[test]
    fn empty_source_is_default() {
        assert_eq!(Settings::from_yaml("  ").unwrap(), Settings::default());
    }

    #[test]
    fn extra_keys_are_kept() {
        let settings =
            Settings::from_yaml("output_mode: file\ntangible_support: false\nbrand: acme\n")
                .unwrap();
        assert_eq!(settings.output_mode, OutputMode::File);
        assert_eq!(settings.get("tangible_support", json!(true)), json!(false));
        assert_eq!(settings.get("brand", json!("")), json!("acme"));
    }

    #[test]
    fn get_known_and_missing_keys() {
        let settings = Settings::from_yaml("default_footer: \"8\"\nglobal_css: \"body{margin:0}\"\n")
            .unwrap();
        assert_eq!(settings.get("default_footer", json!(null)), json!(8));
        assert_eq!(settings.get("default_header", json!(0)), json!(0));
        assert_eq!(settings.get("global_css", json!("")), json!("body{margin:0}"));
        assert_eq!(settings.get("no_such_key", json!("fallback")), json!("fallback"));
    }

    #[test]
    fn unknown_output_mode_is_inline() {
        let settings = Settings::from_yaml("output_mode: cdn\n").unwrap();
        assert_eq!(settings.output_mode, OutputMode::Inline);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(Settings::from_yaml("enabled: [").is_err());
    }
}
