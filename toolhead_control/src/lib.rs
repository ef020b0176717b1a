//! # Toolhead Control Library
//!
//! Actuator control for a motion-control firmware: switches (fans, relays,
//! buttons, lasers on PWM) and a spindle, driven by command lines, sampled
//! inputs and public state requests, kept in step with the motion queue and
//! forced to failsafe on halt.
//!
//! ## Execution contexts
//!
//! 1. **Main loop** - command handling, reconciliation, state requests.
//!    May block on queue drains and the spindle ramp-up, always pumping the
//!    idle hook and watching the halt flag.
//! 2. **Slow ticker** - samples inputs and advances software PWM. Never
//!    writes an output pin itself except through the sigma-delta modulator
//!    it owns.
//!
//! The two share only the atomic flags in [`switch::SwitchShared`].

pub mod config;
pub mod driver;
pub mod error;
pub mod public;
pub mod runtime;
pub mod services;
pub mod simulation;
pub mod spindle;
pub mod switch;
pub mod sync;
