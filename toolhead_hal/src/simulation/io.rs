//! Simulated pin table.
//!
//! The `SimIo` table tracks, per `(port, pin)` address:
//! - physical level (shared by outputs and inputs, so an output can be
//!   looped back into an input)
//! - PWM duty and period
//! - write counter
//! - output ownership

use std::collections::{HashMap, HashSet};

use tracing::trace;

/// Snapshot of one simulated pin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimPinState {
    /// Physical level (before descriptor inversion).
    pub level: bool,
    /// Hardware PWM duty fraction.
    pub duty: f32,
    /// Hardware PWM period in microseconds.
    pub period_us: u32,
    /// Number of level or duty writes issued by outputs.
    pub writes: u64,
    /// Whether an output handle currently owns the pin.
    pub claimed: bool,
}

/// Pin table behind the board's mutex.
#[derive(Debug, Default)]
pub(crate) struct SimIo {
    pins: HashMap<(u8, u8), SimPinState>,
    pwm_capable: HashSet<(u8, u8)>,
}

impl SimIo {
    pub(crate) fn mark_pwm_capable(&mut self, addr: (u8, u8)) {
        self.pwm_capable.insert(addr);
    }

    pub(crate) fn is_pwm_capable(&self, addr: (u8, u8)) -> bool {
        self.pwm_capable.contains(&addr)
    }

    pub(crate) fn state(&self, addr: (u8, u8)) -> SimPinState {
        self.pins.get(&addr).copied().unwrap_or_default()
    }

    /// Claim an output; `false` if already owned.
    pub(crate) fn claim(&mut self, addr: (u8, u8)) -> bool {
        let pin = self.pins.entry(addr).or_default();
        if pin.claimed {
            return false;
        }
        pin.claimed = true;
        true
    }

    pub(crate) fn release(&mut self, addr: (u8, u8)) {
        if let Some(pin) = self.pins.get_mut(&addr) {
            pin.claimed = false;
        }
    }

    pub(crate) fn drive(&mut self, addr: (u8, u8), level: bool) {
        let pin = self.pins.entry(addr).or_default();
        pin.level = level;
        pin.writes += 1;
        trace!("sim pin {}.{} -> {}", addr.0, addr.1, level);
    }

    /// Input injection; not counted as an output write.
    pub(crate) fn inject(&mut self, addr: (u8, u8), level: bool) {
        self.pins.entry(addr).or_default().level = level;
    }

    pub(crate) fn write_duty(&mut self, addr: (u8, u8), duty: f32) {
        let pin = self.pins.entry(addr).or_default();
        pin.duty = duty;
        pin.writes += 1;
        trace!("sim pwm {}.{} -> {:.3}", addr.0, addr.1, duty);
    }

    pub(crate) fn set_period(&mut self, addr: (u8, u8), period_us: u32) {
        self.pins.entry(addr).or_default().period_us = period_us;
    }
}
