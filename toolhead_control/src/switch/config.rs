//! Switch instance configuration.
//!
//! Loaded once per `[switch.<name>]` table through a [`ConfigProvider`];
//! immutable afterwards. Missing keys take the defaults below, unparsable
//! pins degrade to not-connected and unparsable triggers to unset.
//!
//! | key | default |
//! |---|---|
//! | `startup_state` | `false` |
//! | `startup_value` | `max_pwm` (pwm) / `0` |
//! | `input_pin` | `nc` |
//! | `input_pin_behavior` | `momentary` |
//! | `subcode` | `0` |
//! | `input_on_command` / `input_off_command` | empty |
//! | `output_pin` | `nc` |
//! | `output_type` | `pwm` |
//! | `max_pwm` | `255` |
//! | `output_on_command` / `output_off_command` | empty |
//! | `pwm_period_ms` | `20` |
//! | `failsafe_set_to` | `0` |
//! | `ignore_on_halt` | `false` |
//! | `protected` | `false` |

use core::fmt;

use heapless::String as FixedString;
use tracing::warn;
use toolhead_common::command::TriggerCode;
use toolhead_common::config::ConfigProvider;
use toolhead_common::consts::{
    DEFAULT_MAX_PWM, DEFAULT_PWM_PERIOD_MS, MAX_COMMAND_LEN, SWITCH_SECTION,
};
use toolhead_common::pin::PinSpec;

/// Side-effect command line, spaces restored.
pub type CommandLine = FixedString<MAX_COMMAND_LEN>;

/// Configuration keys of a switch section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchKey {
    StartupState,
    StartupValue,
    InputPin,
    InputPinBehavior,
    Subcode,
    InputOnCommand,
    InputOffCommand,
    OutputPin,
    OutputType,
    MaxPwm,
    OutputOnCommand,
    OutputOffCommand,
    PwmPeriodMs,
    FailsafeSetTo,
    IgnoreOnHalt,
    Protected,
}

impl SwitchKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartupState => "startup_state",
            Self::StartupValue => "startup_value",
            Self::InputPin => "input_pin",
            Self::InputPinBehavior => "input_pin_behavior",
            Self::Subcode => "subcode",
            Self::InputOnCommand => "input_on_command",
            Self::InputOffCommand => "input_off_command",
            Self::OutputPin => "output_pin",
            Self::OutputType => "output_type",
            Self::MaxPwm => "max_pwm",
            Self::OutputOnCommand => "output_on_command",
            Self::OutputOffCommand => "output_off_command",
            Self::PwmPeriodMs => "pwm_period_ms",
            Self::FailsafeSetTo => "failsafe_set_to",
            Self::IgnoreOnHalt => "ignore_on_halt",
            Self::Protected => "protected",
        }
    }
}

impl fmt::Display for SwitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output variant selected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputKind {
    /// No physical effect.
    None,
    /// Binary pin.
    Digital,
    /// Sigma-delta modulated pin, duty `0..=max_pwm`.
    #[default]
    SoftPwm,
    /// Hardware PWM channel, duty percentage `0..=100`.
    HardwarePwm,
}

impl OutputKind {
    /// Parse an `output_type` value. Unknown names select [`OutputKind::None`].
    pub fn from_config(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "pwm" => Self::SoftPwm,
            "digital" => Self::Digital,
            "hwpwm" => Self::HardwarePwm,
            "none" => Self::None,
            other => {
                warn!("unknown output_type {other:?}; output disabled");
                Self::None
            }
        }
    }

    #[inline]
    pub const fn is_analog(self) -> bool {
        matches!(self, Self::SoftPwm | Self::HardwarePwm)
    }
}

/// How input edges map to logical actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputBehavior {
    /// Level follows the input.
    #[default]
    Momentary,
    /// Each press flips the state.
    Toggle,
    /// Short press turns on, a long hold turns off.
    LongPush,
}

impl InputBehavior {
    /// Parse an `input_pin_behavior` value. Unknown names fall back to
    /// momentary.
    pub fn from_config(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "toggle" => Self::Toggle,
            "longpush" => Self::LongPush,
            _ => Self::Momentary,
        }
    }
}

/// Immutable configuration of one switch instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchConfig {
    pub name: String,
    pub output_kind: OutputKind,
    pub input_pin: PinSpec,
    pub output_pin: PinSpec,
    pub input_behavior: InputBehavior,
    pub on_trigger: Option<TriggerCode>,
    pub off_trigger: Option<TriggerCode>,
    pub subcode: u8,
    pub output_on_command: CommandLine,
    pub output_off_command: CommandLine,
    /// Level forced on halt.
    pub failsafe: bool,
    pub max_pwm: u32,
    pub pwm_period_ms: f32,
    pub startup_state: bool,
    /// Initial analog value in the variant's units.
    pub startup_value: f32,
    pub ignore_on_halt: bool,
    pub protected: bool,
}

impl SwitchConfig {
    /// Configured switch instance names.
    pub fn names(provider: &dyn ConfigProvider) -> Vec<String> {
        provider.instances(SWITCH_SECTION)
    }

    /// Build the configuration of switch `name`.
    pub fn load(provider: &dyn ConfigProvider, name: &str) -> Self {
        let key = |k: SwitchKey| k.as_str();
        let bool_of = |k: SwitchKey, d: bool| provider.bool_or(SWITCH_SECTION, Some(name), key(k), d);
        let number_of =
            |k: SwitchKey, d: f64| provider.number_or(SWITCH_SECTION, Some(name), key(k), d);
        let string_of =
            |k: SwitchKey, d: &str| provider.string_or(SWITCH_SECTION, Some(name), key(k), d);

        let output_pin = PinSpec::parse_or_nc(&string_of(SwitchKey::OutputPin, "nc"));
        let output_kind = OutputKind::from_config(&string_of(SwitchKey::OutputType, "pwm"));
        let max_pwm = number_of(SwitchKey::MaxPwm, DEFAULT_MAX_PWM as f64).max(1.0) as u32;

        let default_value = match output_kind {
            OutputKind::SoftPwm => max_pwm as f64,
            _ => 0.0,
        };

        Self {
            name: name.to_string(),
            output_kind,
            input_pin: PinSpec::parse_or_nc(&string_of(SwitchKey::InputPin, "nc")),
            output_pin,
            input_behavior: InputBehavior::from_config(&string_of(
                SwitchKey::InputPinBehavior,
                "momentary",
            )),
            on_trigger: TriggerCode::from_config(&string_of(SwitchKey::InputOnCommand, "")),
            off_trigger: TriggerCode::from_config(&string_of(SwitchKey::InputOffCommand, "")),
            subcode: number_of(SwitchKey::Subcode, 0.0).clamp(0.0, u8::MAX as f64) as u8,
            output_on_command: command_line(name, &string_of(SwitchKey::OutputOnCommand, "")),
            output_off_command: command_line(name, &string_of(SwitchKey::OutputOffCommand, "")),
            failsafe: number_of(SwitchKey::FailsafeSetTo, 0.0) != 0.0,
            max_pwm,
            pwm_period_ms: number_of(SwitchKey::PwmPeriodMs, DEFAULT_PWM_PERIOD_MS as f64) as f32,
            startup_state: bool_of(SwitchKey::StartupState, false),
            startup_value: number_of(SwitchKey::StartupValue, default_value) as f32,
            ignore_on_halt: bool_of(SwitchKey::IgnoreOnHalt, false),
            protected: bool_of(SwitchKey::Protected, false),
        }
    }

    /// Whether any side-effect command is configured.
    #[inline]
    pub fn has_side_effects(&self) -> bool {
        !self.output_on_command.is_empty() || !self.output_off_command.is_empty()
    }

    /// Hardware PWM period in microseconds.
    #[inline]
    pub fn pwm_period_us(&self) -> u32 {
        (self.pwm_period_ms.max(0.0) * 1000.0).round() as u32
    }
}

/// Stored command strings use `_` for spaces.
fn command_line(name: &str, raw: &str) -> CommandLine {
    let mut line = CommandLine::new();
    for c in raw.chars() {
        if line.push(if c == '_' { ' ' } else { c }).is_err() {
            warn!("switch {name}: side-effect command {raw:?} longer than {MAX_COMMAND_LEN} bytes; ignored");
            return CommandLine::new();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolhead_common::command::CommandLetter;
    use toolhead_common::config::TomlConfig;

    fn provider(body: &str) -> TomlConfig {
        TomlConfig::from_toml(body).unwrap()
    }

    #[test]
    fn defaults_for_empty_section() {
        let cfg = provider("[switch.fan]\n");
        let sw = SwitchConfig::load(&cfg, "fan");
        assert_eq!(sw.output_kind, OutputKind::SoftPwm);
        assert_eq!(sw.input_pin, PinSpec::NotConnected);
        assert_eq!(sw.output_pin, PinSpec::NotConnected);
        assert_eq!(sw.input_behavior, InputBehavior::Momentary);
        assert_eq!(sw.on_trigger, None);
        assert_eq!(sw.max_pwm, 255);
        assert_eq!(sw.startup_value, 255.0);
        assert_eq!(sw.pwm_period_us(), 20_000);
        assert!(!sw.failsafe && !sw.ignore_on_halt && !sw.protected);
        assert!(!sw.has_side_effects());
    }

    #[test]
    fn full_section() {
        let cfg = provider(
            r#"
[switch.laser]
output_type = "hwpwm"
output_pin = "2.5"
input_on_command = "M3"
input_off_command = "M5"
subcode = 2
output_on_command = "M117_Laser_On"
failsafe_set_to = 1
ignore_on_halt = true
protected = true
input_pin = "1.30^"
input_pin_behavior = "longpush"
"#,
        );
        let sw = SwitchConfig::load(&cfg, "laser");
        assert_eq!(sw.output_kind, OutputKind::HardwarePwm);
        assert_eq!(sw.startup_value, 0.0);
        assert_eq!(sw.on_trigger, Some(TriggerCode::new(CommandLetter::M, 3)));
        assert_eq!(sw.off_trigger, Some(TriggerCode::new(CommandLetter::M, 5)));
        assert_eq!(sw.subcode, 2);
        assert_eq!(sw.output_on_command.as_str(), "M117 Laser On");
        assert!(sw.has_side_effects());
        assert!(sw.failsafe && sw.ignore_on_halt && sw.protected);
        assert_eq!(sw.input_behavior, InputBehavior::LongPush);
        assert_eq!(sw.input_pin.address(), Some((1, 30)));
    }

    #[test]
    fn unknown_names_degrade() {
        assert_eq!(OutputKind::from_config("servo"), OutputKind::None);
        assert_eq!(OutputKind::from_config("Digital"), OutputKind::Digital);
        assert_eq!(InputBehavior::from_config("hold"), InputBehavior::Momentary);
        assert_eq!(InputBehavior::from_config("toggle"), InputBehavior::Toggle);
    }

    #[test]
    fn oversized_side_effect_is_dropped() {
        let long = "M117_".to_string() + &"x".repeat(MAX_COMMAND_LEN);
        assert!(command_line("fan", &long).is_empty());
        assert_eq!(command_line("fan", "M280_S5").as_str(), "M280 S5");
    }

    #[test]
    fn key_names() {
        assert_eq!(SwitchKey::FailsafeSetTo.as_str(), "failsafe_set_to");
        assert_eq!(SwitchKey::InputPinBehavior.to_string(), "input_pin_behavior");
    }
}
