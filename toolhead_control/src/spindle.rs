//! Spindle actuator.
//!
//! The same command/queue/halt pattern as a switch, specialised for a
//! speed-controlled rotating tool:
//!
//! | command | action |
//! |---|---|
//! | `M3` / `M4` `[S<rpm>]` | drain, turn on, set speed, wait for ramp-up |
//! | `M5` | drain, turn off |
//! | `M957` | report speed |
//! | `M958 [P] [I] [D]` | drain, set PID gains, report them |
//!
//! Direction is not differentiated: `M4` behaves like `M3`.

pub mod config;
pub mod control;
pub mod pwm;

pub use config::SpindleConfig;
pub use control::{Ramp, SpindleControl};
pub use pwm::PwmSpindle;

use core::fmt;

/// PID gains held by a spindle backend.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidGains {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl fmt::Display for PidGains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P: {:.4} I: {:.4} D: {:.4}", self.p, self.i, self.d)
    }
}

/// Spindle hardware backend.
pub trait SpindleDriver: Send {
    fn turn_on(&mut self);
    fn turn_off(&mut self);
    /// Commanded speed in RPM.
    fn set_speed(&mut self, rpm: i32);
    /// One-line speed report for the console.
    fn report_speed(&self) -> String;
    fn set_p_term(&mut self, p: f32);
    fn set_i_term(&mut self, i: f32);
    fn set_d_term(&mut self, d: f32);
    fn pid_settings(&self) -> PidGains;
}
