//! Output driver: one closed set of output variants behind one contract.
//!
//! | variant | `set_logical(true)` | `set_logical(false)` | analog range |
//! |---|---|---|---|
//! | `None` | no effect | no effect | - |
//! | `Digital` | pin high | pin low | - |
//! | `SoftPwm` | last analog value | duty 0 | `0..=max_pwm` |
//! | `HardwarePwm` | last analog value | duty 0 | `0..=100` % |
//!
//! Construction fails soft: a pin that does not resolve, or hardware PWM on
//! a pin without a PWM channel, yields [`OutputDriver::None`] and a
//! diagnostic. The actuator stays configured but inert.

use std::sync::Arc;

use tracing::{debug, warn};
use toolhead_common::pin::PinSpec;
use toolhead_hal::{Board, DigitalOutput, PwmOutput, SigmaDelta};

use crate::services::Reporter;
use crate::switch::OutputKind;

/// Tolerance when comparing hardware duty fractions.
const DUTY_EPSILON: f32 = 1.0e-4;

/// Output resolution parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSpec {
    pub kind: OutputKind,
    pub pin: PinSpec,
    /// SoftPWM duty ceiling.
    pub max_pwm: u32,
    /// Hardware PWM period.
    pub period_us: u32,
}

/// Physical output of an actuator.
pub enum OutputDriver {
    None,
    Digital(Box<dyn DigitalOutput>),
    SoftPwm {
        modulator: Arc<SigmaDelta>,
        /// Last analog value written, `0..=max`.
        stored: u32,
    },
    HardwarePwm {
        channel: Box<dyn PwmOutput>,
        /// Last analog value written, percent.
        stored: f32,
    },
}

impl OutputDriver {
    /// Resolve `spec` on `board`, degrading to [`OutputDriver::None`] on
    /// failure. `owner` names the actuator in diagnostics.
    pub fn build(board: &dyn Board, spec: &OutputSpec, owner: &str, reporter: &dyn Reporter) -> Self {
        let resolved = match spec.kind {
            OutputKind::None => return Self::None,
            OutputKind::Digital => board.digital_output(&spec.pin).map(Self::Digital),
            OutputKind::SoftPwm => board.digital_output(&spec.pin).map(|pin| Self::SoftPwm {
                modulator: Arc::new(SigmaDelta::new(pin, spec.max_pwm)),
                stored: 0,
            }),
            OutputKind::HardwarePwm => board.pwm_output(&spec.pin).map(|mut channel| {
                channel.set_period_us(spec.period_us);
                Self::HardwarePwm {
                    channel,
                    stored: 0.0,
                }
            }),
        };

        match resolved {
            Ok(driver) => {
                debug!("{owner}: {:?} output on {} ({})", spec.kind, spec.pin, board.name());
                driver
            }
            Err(e) => {
                let message = format!("{owner}: output pin {} - {e} - disabled", spec.pin);
                warn!("{message}");
                reporter.report(&message);
                Self::None
            }
        }
    }

    /// Variant tag.
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::None => OutputKind::None,
            Self::Digital(_) => OutputKind::Digital,
            Self::SoftPwm { .. } => OutputKind::SoftPwm,
            Self::HardwarePwm { .. } => OutputKind::HardwarePwm,
        }
    }

    /// Binary on/off. Analog variants turn on at the last analog value.
    pub fn set_logical(&mut self, on: bool) {
        match self {
            Self::None => {}
            Self::Digital(pin) => pin.set(on),
            Self::SoftPwm { modulator, stored } => modulator.pwm(if on { *stored } else { 0 }),
            Self::HardwarePwm { channel, stored } => {
                channel.write(if on { *stored / 100.0 } else { 0.0 })
            }
        }
    }

    /// Write an analog value in the variant's units, clamped to its range.
    /// Ignored by `None` and `Digital`.
    pub fn write_analog(&mut self, value: f32) {
        match self {
            Self::SoftPwm { modulator, stored } => {
                *stored = soft_level(value, modulator.max());
                modulator.pwm(*stored);
            }
            Self::HardwarePwm { channel, stored } => {
                *stored = percent(value);
                channel.write(*stored / 100.0);
            }
            Self::None | Self::Digital(_) => {}
        }
    }

    /// Live output in the variant's units: duty for SoftPWM, percent for
    /// hardware PWM, `0`/`1` for digital.
    pub fn analog(&self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Digital(pin) => f32::from(u8::from(pin.get())),
            Self::SoftPwm { modulator, .. } => modulator.duty() as f32,
            Self::HardwarePwm { channel, .. } => channel.read() * 100.0,
        }
    }

    /// Whether writing `value` would leave the live output unchanged.
    pub fn holds(&self, value: f32) -> bool {
        match self {
            Self::SoftPwm { modulator, .. } => soft_level(value, modulator.max()) == modulator.duty(),
            Self::HardwarePwm { channel, .. } => {
                (channel.read() - percent(value) / 100.0).abs() < DUTY_EPSILON
            }
            Self::None | Self::Digital(_) => false,
        }
    }

    /// SoftPWM duty ceiling, if this is a SoftPWM driver.
    pub fn max_pwm(&self) -> Option<u32> {
        match self {
            Self::SoftPwm { modulator, .. } => Some(modulator.max()),
            _ => None,
        }
    }

    /// Modulator to be advanced by the slow ticker.
    pub fn modulator(&self) -> Option<Arc<SigmaDelta>> {
        match self {
            Self::SoftPwm { modulator, .. } => Some(modulator.clone()),
            _ => None,
        }
    }

    /// Drive to the halt level bypassing the stored analog value.
    /// Hardware PWM has no high failsafe and always goes to zero.
    pub fn force_failsafe(&mut self, level: bool) {
        match self {
            Self::None => {}
            Self::Digital(pin) => pin.set(level),
            Self::SoftPwm { modulator, .. } => modulator.set(level),
            Self::HardwarePwm { channel, .. } => channel.write(0.0),
        }
    }
}

impl std::fmt::Debug for OutputDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OutputDriver::{:?}({})", self.kind(), self.analog())
    }
}

fn soft_level(value: f32, max: u32) -> u32 {
    value.round().clamp(0.0, max as f32) as u32
}

fn percent(value: f32) -> f32 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::RecordingReporter;
    use toolhead_hal::SimBoard;

    fn spec(kind: OutputKind, pin: PinSpec) -> OutputSpec {
        OutputSpec {
            kind,
            pin,
            max_pwm: 128,
            period_us: 20_000,
        }
    }

    #[test]
    fn hwpwm_on_plain_pin_degrades_with_report() {
        let board = SimBoard::new();
        let reporter = RecordingReporter::default();
        let driver = OutputDriver::build(
            &board,
            &spec(OutputKind::HardwarePwm, PinSpec::gpio(2, 4)),
            "switch laser",
            &reporter,
        );
        assert_eq!(driver.kind(), OutputKind::None);
        assert!(reporter.contains("not PWM capable"));
        assert!(reporter.contains("switch laser"));
    }

    #[test]
    fn nc_pin_degrades() {
        let reporter = RecordingReporter::default();
        let driver = OutputDriver::build(
            &SimBoard::new(),
            &spec(OutputKind::Digital, PinSpec::NotConnected),
            "switch fan",
            &reporter,
        );
        assert_eq!(driver.kind(), OutputKind::None);
        assert_eq!(reporter.messages().len(), 1);
    }

    #[test]
    fn soft_pwm_clamps_and_remembers() {
        let board = SimBoard::new();
        let reporter = RecordingReporter::default();
        let mut driver =
            OutputDriver::build(&board, &spec(OutputKind::SoftPwm, PinSpec::gpio(1, 1)), "fan", &reporter);
        driver.write_analog(300.0);
        assert_eq!(driver.analog(), 128.0);
        driver.write_analog(-4.0);
        assert_eq!(driver.analog(), 0.0);

        driver.write_analog(64.0);
        driver.set_logical(false);
        assert_eq!(driver.analog(), 0.0);
        driver.set_logical(true);
        assert_eq!(driver.analog(), 64.0);
        assert!(driver.holds(64.2));
        assert!(!driver.holds(65.0));
    }

    #[test]
    fn hardware_pwm_writes_fraction() {
        let board = SimBoard::new().with_pwm_pins(&[(2, 5)]);
        let reporter = RecordingReporter::default();
        let mut driver = OutputDriver::build(
            &board,
            &spec(OutputKind::HardwarePwm, PinSpec::gpio(2, 5)),
            "laser",
            &reporter,
        );
        assert_eq!(board.pin(2, 5).period_us, 20_000);

        driver.write_analog(150.0);
        assert_eq!(board.pin(2, 5).duty, 1.0);
        driver.write_analog(25.0);
        assert!((board.pin(2, 5).duty - 0.25).abs() < 1e-6);
        assert!(driver.holds(25.0));

        driver.force_failsafe(true);
        assert_eq!(board.pin(2, 5).duty, 0.0);
    }

    #[test]
    fn digital_ignores_analog_writes() {
        let board = SimBoard::new();
        let reporter = RecordingReporter::default();
        let mut driver =
            OutputDriver::build(&board, &spec(OutputKind::Digital, PinSpec::gpio(0, 9)), "relay", &reporter);
        driver.write_analog(50.0);
        assert!(!board.pin(0, 9).level);
        driver.set_logical(true);
        assert!(board.pin(0, 9).level);
        assert_eq!(driver.analog(), 1.0);
        driver.force_failsafe(false);
        assert!(!board.pin(0, 9).level);
    }
}
