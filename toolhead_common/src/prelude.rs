//! Prelude module for common re-exports.
//!
//! ```rust
//! use toolhead_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ConfigProvider, ConfigValue, LogLevel, SharedConfig, TomlConfig,
};

// ─── Commands ───────────────────────────────────────────────────────
pub use crate::command::{Command, CommandLetter, CommandParseError, TriggerCode};

// ─── Pins ───────────────────────────────────────────────────────────
pub use crate::pin::{PinParseError, PinPull, PinSpec};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_TICK_PERIOD_MS, LONGPUSH_THRESHOLD_TICKS};
