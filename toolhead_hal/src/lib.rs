//! # Toolhead HAL Library
//!
//! Opaque hardware capabilities consumed by actuator control.
//!
//! # Module Structure
//!
//! - [`capability`] - Pin capability traits and the [`Board`] resolver
//! - [`sigma_delta`] - Software PWM over a digital output
//! - [`simulation`] - In-memory board for the runtime binary and tests
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   toolhead_hal (single crate)                 │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────────┐  │
//! │  │  PinSpec    │───►│  Board       │───►│ DigitalOutput    │  │
//! │  │ (common)    │    │  (trait)     │    │ DigitalInput     │  │
//! │  └─────────────┘    └──────┬───────┘    │ PwmOutput        │  │
//! │                            │            └────────┬─────────┘  │
//! │                            ▼                     ▼            │
//! │                   ┌────────────────┐    ┌──────────────────┐  │
//! │                   │  SimBoard      │    │ SigmaDelta       │  │
//! │                   └────────────────┘    └──────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod capability;
pub mod sigma_delta;
pub mod simulation;

pub use crate::capability::{Board, DigitalInput, DigitalOutput, HalError, PwmOutput};
pub use crate::sigma_delta::SigmaDelta;
pub use crate::simulation::SimBoard;
