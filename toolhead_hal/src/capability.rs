//! Pin capability traits and the board resolver.
//!
//! This module defines:
//! - `DigitalOutput` / `DigitalInput` - logical-level pins
//! - `PwmOutput` - hardware PWM channel taking a duty fraction
//! - `Board` - resolves a [`PinSpec`] into one of the above
//! - `HalError` - why a pin could not be resolved
//!
//! All levels at this boundary are *logical*: pin inversion from the
//! descriptor is applied by the board implementation.

use thiserror::Error;
use toolhead_common::pin::PinSpec;

/// Pin resolution failures.
///
/// These are never fatal for an actuator: the control layer degrades the
/// output to inert and reports the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Descriptor is `nc` or otherwise names no physical pin.
    #[error("pin is not connected")]
    NotConnected,

    /// Hardware PWM requested on a pin without a PWM channel.
    #[error("pin {0} is not PWM capable")]
    NotPwmCapable(PinSpec),

    /// Output pin already owned by another actuator.
    #[error("pin {0} is already in use")]
    PinInUse(PinSpec),
}

/// Binary output pin.
pub trait DigitalOutput: Send {
    /// Drive the logical level.
    fn set(&mut self, level: bool);

    /// Last logical level written.
    fn get(&self) -> bool;
}

/// Binary input pin.
pub trait DigitalInput: Send + Sync {
    /// Sample the logical level.
    fn get(&self) -> bool;
}

/// Hardware PWM channel.
pub trait PwmOutput: Send {
    /// Set the PWM period in microseconds.
    fn set_period_us(&mut self, period_us: u32);

    /// Write a duty fraction. Values outside `0.0..=1.0` are clamped.
    fn write(&mut self, duty: f32);

    /// Current duty fraction.
    fn read(&self) -> f32;
}

/// Source of pin capabilities.
///
/// Implementations own the mapping from descriptors to physical
/// resources. Outputs are exclusive: an output pin handed out once must
/// not be handed out again until the first handle is dropped.
pub trait Board: Send + Sync {
    /// Returns the board's identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Claim a digital output.
    fn digital_output(&self, pin: &PinSpec) -> Result<Box<dyn DigitalOutput>, HalError>;

    /// Open a digital input. Inputs may be shared.
    fn digital_input(&self, pin: &PinSpec) -> Result<Box<dyn DigitalInput>, HalError>;

    /// Claim a hardware PWM channel.
    fn pwm_output(&self, pin: &PinSpec) -> Result<Box<dyn PwmOutput>, HalError>;
}
