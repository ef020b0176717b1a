//! Configuration loading traits and types.
//!
//! Two layers:
//!
//! - [`ConfigLoader`] deserializes a whole TOML file into any serde type.
//! - [`ConfigProvider`] answers typed per-instance key lookups
//!   (`section.instance.key`) with caller-supplied defaults. Actuators only
//!   ever see this trait, never the file.
//!
//! # Usage
//!
//! ```rust
//! use toolhead_common::config::{ConfigProvider, TomlConfig};
//!
//! let cfg = TomlConfig::from_toml(r#"
//! [switch.fan]
//! output_pin = "2.4"
//! max_pwm = 128
//! "#).unwrap();
//!
//! assert_eq!(cfg.number_or("switch", Some("fan"), "max_pwm", 255.0), 128.0);
//! assert_eq!(cfg.string_or("switch", Some("fan"), "output_type", "pwm"), "pwm");
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across toolhead applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "toolhead-01"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: "toolhead".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Typed Key Lookup ───────────────────────────────────────────────

/// A raw configuration value before coercion.
///
/// Coercions are lenient the same way a line-oriented config file is:
/// `"true"` reads as a bool, `"128"` reads as a number, and a number
/// reads as a bool when non-zero.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ConfigValue {
    /// Coerce to `bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::Text(s) => match s.trim() {
                "true" | "on" | "yes" | "1" => Some(true),
                "false" | "off" | "no" | "0" => Some(false),
                _ => None,
            },
        }
    }

    /// Coerce to a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Coerce to a string.
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Convert a scalar TOML value. Arrays, tables and datetimes are not
    /// configuration scalars.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Boolean(b) => Some(Self::Bool(*b)),
            toml::Value::Integer(i) => Some(Self::Number(*i as f64)),
            toml::Value::Float(f) => Some(Self::Number(*f)),
            toml::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

/// Typed key lookup used by actuators at load time.
///
/// `instance` is `None` for singleton sections such as `[spindle]`.
/// Missing keys and values that cannot be coerced fall back to the
/// supplied default.
pub trait ConfigProvider {
    /// Raw lookup of `section.instance.key`.
    fn value(&self, section: &str, instance: Option<&str>, key: &str) -> Option<ConfigValue>;

    /// Names of the instances configured under `section`.
    fn instances(&self, section: &str) -> Vec<String>;

    /// Whether `section` exists at all.
    fn has_section(&self, section: &str) -> bool;

    fn bool_or(&self, section: &str, instance: Option<&str>, key: &str, default: bool) -> bool {
        self.value(section, instance, key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    fn number_or(&self, section: &str, instance: Option<&str>, key: &str, default: f64) -> f64 {
        self.value(section, instance, key)
            .and_then(|v| v.as_number())
            .unwrap_or(default)
    }

    fn string_or(&self, section: &str, instance: Option<&str>, key: &str, default: &str) -> String {
        self.value(section, instance, key)
            .map(|v| v.as_string())
            .unwrap_or_else(|| default.to_string())
    }
}

/// [`ConfigProvider`] over a parsed TOML document.
///
/// Instance sections are nested tables: `[switch.fan]` is section
/// `"switch"`, instance `"fan"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TomlConfig {
    table: toml::Table,
}

impl TomlConfig {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Deserialize one top-level table into a typed struct.
    ///
    /// Returns `Ok(None)` when the table is absent.
    pub fn section<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, ConfigError> {
        match self.table.get(name) {
            Some(value) => value
                .clone()
                .try_into::<T>()
                .map(Some)
                .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("[{name}]: {e}"))),
            None => Ok(None),
        }
    }

    fn instance_table(&self, section: &str, instance: Option<&str>) -> Option<&toml::Table> {
        let section = self.table.get(section)?.as_table()?;
        match instance {
            Some(name) => section.get(name)?.as_table(),
            None => Some(section),
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn value(&self, section: &str, instance: Option<&str>, key: &str) -> Option<ConfigValue> {
        self.instance_table(section, instance)?
            .get(key)
            .and_then(ConfigValue::from_toml)
    }

    fn instances(&self, section: &str) -> Vec<String> {
        self.table
            .get(section)
            .and_then(|v| v.as_table())
            .map(|t| {
                t.iter()
                    .filter(|(_, v)| v.is_table())
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn has_section(&self, section: &str) -> bool {
        self.table.get(section).is_some_and(|v| v.is_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"warn\"")
                .unwrap()
                .level,
            LogLevel::Warn
        );
        assert_eq!(LogLevel::Debug.as_directive(), "debug");
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = TomlConfig::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = TomlConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_toml_config_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[switch.fan]
output_pin = "2.4"
startup_state = true

[spindle]
startup_time = 500
"#
        )
        .unwrap();
        file.flush().unwrap();

        let cfg = TomlConfig::load(file.path()).unwrap();
        assert!(cfg.bool_or("switch", Some("fan"), "startup_state", false));
        assert_eq!(cfg.number_or("spindle", None, "startup_time", 2000.0), 500.0);
    }

    #[test]
    fn lookup_falls_back_to_default() {
        let cfg = TomlConfig::from_toml("[switch.fan]\nmax_pwm = 128\n").unwrap();
        assert_eq!(cfg.number_or("switch", Some("fan"), "max_pwm", 255.0), 128.0);
        assert_eq!(cfg.number_or("switch", Some("bed"), "max_pwm", 255.0), 255.0);
        assert!(!cfg.bool_or("switch", Some("fan"), "ignore_on_halt", false));
        assert_eq!(cfg.string_or("switch", Some("fan"), "input_pin", "nc"), "nc");
    }

    #[test]
    fn lenient_coercions() {
        let cfg = TomlConfig::from_toml(
            r#"
[switch.a]
startup_state = "true"
max_pwm = "128"
failsafe_set_to = 1
"#,
        )
        .unwrap();
        assert!(cfg.bool_or("switch", Some("a"), "startup_state", false));
        assert_eq!(cfg.number_or("switch", Some("a"), "max_pwm", 0.0), 128.0);
        assert!(cfg.bool_or("switch", Some("a"), "failsafe_set_to", false));
        assert_eq!(ConfigValue::Text("maybe".into()).as_bool(), None);
    }

    #[test]
    fn instances_lists_only_tables() {
        let cfg = TomlConfig::from_toml(
            r#"
[switch]
enable = true

[switch.fan]
output_pin = "2.4"

[switch.laser]
output_pin = "2.5"
"#,
        )
        .unwrap();
        let mut names = cfg.instances("switch");
        names.sort();
        assert_eq!(names, vec!["fan".to_string(), "laser".to_string()]);
        assert!(cfg.instances("spindle").is_empty());
        assert!(cfg.has_section("switch"));
        assert!(!cfg.has_section("spindle"));
    }

    #[test]
    fn typed_section_deserialization() {
        #[derive(Debug, Deserialize)]
        struct Shared {
            shared: SharedConfig,
        }

        let cfg = TomlConfig::from_toml(
            r#"
[shared]
log_level = "debug"
service_name = "toolhead"
"#,
        )
        .unwrap();
        let shared: SharedConfig = cfg.section("shared").unwrap().unwrap();
        assert_eq!(shared.log_level, LogLevel::Debug);
        assert!(cfg.section::<Shared>("missing").unwrap().is_none());
    }
}
