//! Input sampling: debounce, edges and long push.
//!
//! [`InputPoller`] runs on the slow ticker at a fixed period. It reads the
//! input pin and only ever updates [`SwitchShared`]; the output pin is left
//! to the main loop reconciler, which stays the single writer.
//!
//! ```text
//!          rising edge (longpush)                 falling edge while armed
//!   Idle ─────────────────────────► Armed ─────────────────────────────► Idle  (emit ON)
//!                                     │
//!                                     │ held LONGPUSH_THRESHOLD_TICKS
//!                                     ▼
//!                                   Idle  (emit OFF, later release is silent)
//! ```

use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use bitflags::bitflags;
use static_assertions::assert_impl_all;
use tracing::trace;
use toolhead_common::consts::LONGPUSH_THRESHOLD_TICKS;
use toolhead_hal::DigitalInput;

use super::config::InputBehavior;

bitflags! {
    /// Flags shared between the sampler and the main loop.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SwitchFlags: u8 {
        /// Logical on/off state.
        const STATE          = 0x01;
        /// A logical change awaits reconciliation.
        const PENDING        = 0x02;
        /// Long-push timer running.
        const LONGPUSH_ARMED = 0x04;
        /// Last sampled input level.
        const INPUT_LEVEL    = 0x08;
    }
}

/// Runtime state written by both the sampler and the main loop.
#[derive(Debug, Default)]
pub struct SwitchShared {
    flags: AtomicU8,
    held_ticks: AtomicU32,
}

assert_impl_all!(SwitchShared: Send, Sync);

impl SwitchShared {
    pub fn new(state: bool) -> Self {
        let shared = Self::default();
        shared.set_state(state);
        shared
    }

    /// Snapshot of all flags.
    #[inline]
    pub fn flags(&self) -> SwitchFlags {
        SwitchFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    #[inline]
    pub fn state(&self) -> bool {
        self.flags().contains(SwitchFlags::STATE)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.flags().contains(SwitchFlags::PENDING)
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.flags().contains(SwitchFlags::LONGPUSH_ARMED)
    }

    /// Ticks the input has been held since arming.
    #[inline]
    pub fn held_ticks(&self) -> u32 {
        self.held_ticks.load(Ordering::Acquire)
    }

    /// Set the logical state without flagging a change.
    pub fn set_state(&self, state: bool) {
        self.update(|f| f.set(SwitchFlags::STATE, state));
    }

    /// Set the logical state and flag it for reconciliation.
    pub fn emit(&self, state: bool) {
        self.update(|f| {
            f.set(SwitchFlags::STATE, state);
            f.insert(SwitchFlags::PENDING);
        });
    }

    /// Clear PENDING and return the state it was raised for, atomically.
    pub fn take_pending(&self) -> Option<bool> {
        let prev = SwitchFlags::from_bits_truncate(
            self.flags
                .fetch_and(!SwitchFlags::PENDING.bits(), Ordering::AcqRel),
        );
        prev.contains(SwitchFlags::PENDING)
            .then(|| prev.contains(SwitchFlags::STATE))
    }

    fn update(&self, f: impl Fn(&mut SwitchFlags)) {
        // The closure always yields Some, so this never fails.
        let _ = self
            .flags
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let mut flags = SwitchFlags::from_bits_truncate(bits);
                f(&mut flags);
                Some(flags.bits())
            });
    }
}

/// Periodic input sampler of one switch.
pub struct InputPoller {
    name: String,
    input: Box<dyn DigitalInput>,
    behavior: InputBehavior,
    shared: std::sync::Arc<SwitchShared>,
}

impl InputPoller {
    /// Seeds the last-observed level from the pin, so an input already
    /// active at startup does not register as an edge.
    pub fn new(
        name: &str,
        input: Box<dyn DigitalInput>,
        behavior: InputBehavior,
        shared: std::sync::Arc<SwitchShared>,
    ) -> Self {
        let level = input.get();
        shared.update(|f| f.set(SwitchFlags::INPUT_LEVEL, level));
        Self {
            name: name.to_string(),
            input,
            behavior,
            shared,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One sampling step.
    pub fn tick(&mut self) {
        let level = self.input.get();
        let flags = self.shared.flags();

        if level == flags.contains(SwitchFlags::INPUT_LEVEL) {
            if flags.contains(SwitchFlags::LONGPUSH_ARMED) {
                let held = self.shared.held_ticks.fetch_add(1, Ordering::AcqRel) + 1;
                if held >= LONGPUSH_THRESHOLD_TICKS {
                    trace!("{}: long push", self.name);
                    self.shared.update(|f| {
                        f.remove(SwitchFlags::LONGPUSH_ARMED | SwitchFlags::STATE);
                        f.insert(SwitchFlags::PENDING);
                    });
                }
            }
            return;
        }

        trace!("{}: input {}", self.name, if level { "rising" } else { "falling" });
        match (self.behavior, level) {
            (InputBehavior::Toggle, true) => self.shared.update(|f| {
                f.toggle(SwitchFlags::STATE);
                f.insert(SwitchFlags::PENDING | SwitchFlags::INPUT_LEVEL);
            }),
            (InputBehavior::Toggle, false) => {
                self.shared.update(|f| f.remove(SwitchFlags::INPUT_LEVEL))
            }
            (InputBehavior::LongPush, true) => {
                self.shared.held_ticks.store(0, Ordering::Release);
                self.shared.update(|f| {
                    f.insert(SwitchFlags::LONGPUSH_ARMED | SwitchFlags::INPUT_LEVEL);
                });
            }
            (InputBehavior::LongPush, false) => self.shared.update(|f| {
                f.remove(SwitchFlags::INPUT_LEVEL);
                // Released before the threshold: short push.
                if f.contains(SwitchFlags::LONGPUSH_ARMED) {
                    f.remove(SwitchFlags::LONGPUSH_ARMED);
                    f.insert(SwitchFlags::STATE | SwitchFlags::PENDING);
                }
            }),
            (InputBehavior::Momentary, level) => self.shared.update(|f| {
                f.set(SwitchFlags::INPUT_LEVEL, level);
                f.set(SwitchFlags::STATE, level);
                f.insert(SwitchFlags::PENDING);
            }),
        }
    }
}
