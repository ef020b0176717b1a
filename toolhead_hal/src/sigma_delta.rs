//! Software PWM over a digital output.
//!
//! A first-order sigma-delta modulator: every tick the duty is added to
//! an accumulator and the pin goes high whenever the accumulator wraps
//! past `max`. Over `max` ticks the pin is high for exactly `duty` of
//! them, spread as evenly as possible.
//!
//! The duty is written from the command/main-loop side through atomics;
//! only [`SigmaDelta::on_tick`] touches the pin, so the digital output
//! keeps a single writer.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use static_assertions::assert_impl_all;

use crate::capability::DigitalOutput;

struct Modulator {
    pin: Box<dyn DigitalOutput>,
    accumulator: u32,
    level: bool,
}

/// Sigma-delta software PWM.
pub struct SigmaDelta {
    max: u32,
    duty: AtomicU32,
    modulator: Mutex<Modulator>,
}

assert_impl_all!(SigmaDelta: Send, Sync);

impl SigmaDelta {
    /// Wrap `pin` with an integer duty ceiling of `max` (at least 1).
    /// The pin is driven low.
    pub fn new(mut pin: Box<dyn DigitalOutput>, max: u32) -> Self {
        pin.set(false);
        Self {
            max: max.max(1),
            duty: AtomicU32::new(0),
            modulator: Mutex::new(Modulator {
                pin,
                accumulator: 0,
                level: false,
            }),
        }
    }

    /// Duty ceiling.
    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Current duty in `0..=max`.
    #[inline]
    pub fn duty(&self) -> u32 {
        self.duty.load(Ordering::Acquire)
    }

    /// Set the duty, truncated to `max`.
    pub fn pwm(&self, duty: u32) {
        self.duty.store(duty.min(self.max), Ordering::Release);
    }

    /// Force fully on or fully off.
    pub fn set(&self, on: bool) {
        self.pwm(if on { self.max } else { 0 });
    }

    /// Advance the modulator one step and drive the pin on level changes.
    pub fn on_tick(&self) {
        let duty = self.duty();
        let mut m = self
            .modulator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let level = if duty == 0 {
            m.accumulator = 0;
            false
        } else if duty >= self.max {
            m.accumulator = 0;
            true
        } else {
            m.accumulator += duty;
            if m.accumulator >= self.max {
                m.accumulator -= self.max;
                true
            } else {
                false
            }
        };

        if level != m.level {
            m.level = level;
            m.pin.set(level);
        }
    }
}

impl std::fmt::Debug for SigmaDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigmaDelta")
            .field("max", &self.max)
            .field("duty", &self.duty())
            .finish()
    }
}
