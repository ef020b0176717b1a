//! Machine configuration loading.
//!
//! One TOML file carries everything:
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "toolhead"
//!
//! [runtime]
//! main_loop_period_ms = 10
//! tick_period_ms = 100
//!
//! [switch.fan]
//! output_pin = "2.4"
//! input_on_command = "M106"
//! input_off_command = "M107"
//!
//! [spindle]
//! output_pin = "2.5"
//! ```

use std::path::Path;

use tracing::info;
use toolhead_common::config::{ConfigLoader, ConfigProvider, SharedConfig, TomlConfig};
use toolhead_common::consts::{
    DEFAULT_MAIN_LOOP_PERIOD_MS, DEFAULT_TICK_PERIOD_MS, MAX_SWITCHES, RUNTIME_SECTION,
};

use crate::error::RuntimeError;
use crate::spindle::SpindleConfig;
use crate::switch::SwitchConfig;

/// Default simulated duration of one queued move.
pub const DEFAULT_QUEUE_DRAIN_MS: u64 = 50;

/// `[runtime]` pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub main_loop_period_ms: u64,
    /// Input sampling period.
    pub tick_period_ms: u64,
    /// Duration of one simulated move.
    pub queue_drain_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            main_loop_period_ms: DEFAULT_MAIN_LOOP_PERIOD_MS,
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            queue_drain_ms: DEFAULT_QUEUE_DRAIN_MS,
        }
    }
}

impl RuntimeConfig {
    pub fn load(provider: &dyn ConfigProvider) -> Self {
        let d = Self::default();
        let ms = |key: &str, default: u64| {
            provider
                .number_or(RUNTIME_SECTION, None, key, default as f64)
                .max(1.0) as u64
        };
        Self {
            main_loop_period_ms: ms("main_loop_period_ms", d.main_loop_period_ms),
            tick_period_ms: ms("tick_period_ms", d.tick_period_ms),
            queue_drain_ms: ms("queue_drain_ms", d.queue_drain_ms),
        }
    }
}

/// Every actuator plus pacing, resolved from one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineConfig {
    pub shared: SharedConfig,
    pub runtime: RuntimeConfig,
    pub switches: Vec<SwitchConfig>,
    pub spindle: Option<SpindleConfig>,
}

impl MachineConfig {
    /// Load and validate a machine file.
    pub fn load(path: &Path) -> Result<(Self, TomlConfig), RuntimeError> {
        let toml = TomlConfig::load(path)?;
        let machine = Self::from_toml(&toml)?;
        info!(
            "Loaded {} switches{} from {}",
            machine.switches.len(),
            if machine.spindle.is_some() { " and a spindle" } else { "" },
            path.display()
        );
        Ok((machine, toml))
    }

    pub fn from_toml(toml: &TomlConfig) -> Result<Self, RuntimeError> {
        let shared: SharedConfig = toml.section("shared")?.unwrap_or_default();
        shared.validate()?;
        Self::from_provider(toml, shared)
    }

    /// Resolve actuators from any provider.
    pub fn from_provider(provider: &dyn ConfigProvider, shared: SharedConfig) -> Result<Self, RuntimeError> {
        let names = SwitchConfig::names(provider);
        if names.len() > MAX_SWITCHES {
            return Err(RuntimeError::TooManySwitches {
                count: names.len(),
                max: MAX_SWITCHES,
            });
        }
        Ok(Self {
            shared,
            runtime: RuntimeConfig::load(provider),
            switches: names
                .iter()
                .map(|name| SwitchConfig::load(provider, name))
                .collect(),
            spindle: SpindleConfig::load(provider),
        })
    }
}

