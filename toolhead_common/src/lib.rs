//! Toolhead Common Library
//!
//! Shared building blocks for the toolhead workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - TOML configuration loading and typed key lookup
//! - [`consts`] - Timing constants and defaults
//! - [`pin`] - Pin descriptor parsing (`"1.22!"`, `"nc"`)
//! - [`command`] - G/M command word parsing
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use toolhead_common::prelude::*;
//!
//! let pin: PinSpec = "2.5!".parse().unwrap();
//! assert!(pin.is_connected());
//! ```

pub mod command;
pub mod config;
pub mod consts;
pub mod pin;
pub mod prelude;
