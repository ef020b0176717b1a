//! Switch actuator.
//!
//! A switch is a logical on/off (and, for PWM variants, analog) output
//! bound to one pin. It is driven from three directions:
//!
//! - matched command lines (`on_command`), synchronised with the motion
//!   queue before the output changes;
//! - its input pin, sampled by the [`InputPoller`] on the slow ticker and
//!   applied by the main loop reconciler;
//! - public state writes (`on_set_state`).
//!
//! A global halt overrides all of these (see `reconcile.rs`).

pub mod config;
pub mod input;
pub mod matcher;
mod reconcile;

pub use config::{CommandLine, InputBehavior, OutputKind, SwitchConfig, SwitchKey};
pub use input::{InputPoller, SwitchFlags, SwitchShared};
pub use matcher::{CommandMatcher, Trigger};

use std::sync::Arc;

use tracing::{debug, trace, warn};
use toolhead_common::command::Command;
use toolhead_common::consts::SOFT_PWM_COMMAND_SCALE;
use toolhead_hal::{Board, SigmaDelta};

use crate::driver::{OutputDriver, OutputSpec};
use crate::public::{SwitchReport, SwitchUpdate};
use crate::services::Services;
use crate::sync::{Drain, QueueSync};

/// One configured switch instance.
pub struct Switch {
    config: SwitchConfig,
    matcher: CommandMatcher,
    driver: OutputDriver,
    shared: Arc<SwitchShared>,
    /// Logical analog value in the driver's units.
    value: f32,
    poller: Option<InputPoller>,
    sync: QueueSync,
    services: Services,
}

impl Switch {
    /// Resolve pins on `board` and apply the startup state.
    pub fn new(config: SwitchConfig, board: &dyn Board, services: Services) -> Self {
        let owner = format!("switch {}", config.name);
        let mut driver = OutputDriver::build(
            board,
            &OutputSpec {
                kind: config.output_kind,
                pin: config.output_pin,
                max_pwm: config.max_pwm,
                period_us: config.pwm_period_us(),
            },
            &owner,
            services.reporter.as_ref(),
        );

        let value = config.startup_value;
        match driver.kind() {
            kind if kind.is_analog() && config.startup_state => driver.write_analog(value),
            _ => driver.set_logical(config.startup_state),
        }

        let shared = Arc::new(SwitchShared::new(config.startup_state));

        let poller = if config.input_pin.is_connected() {
            match board.digital_input(&config.input_pin) {
                Ok(input) => Some(InputPoller::new(
                    &owner,
                    input,
                    config.input_behavior,
                    shared.clone(),
                )),
                Err(e) => {
                    let message = format!("{owner}: input pin {} - {e} - ignored", config.input_pin);
                    warn!("{message}");
                    services.reporter.report(&message);
                    None
                }
            }
        } else {
            None
        };

        debug!(
            "{owner}: {:?} output, startup {} / {}",
            driver.kind(),
            config.startup_state,
            value
        );

        Self {
            matcher: CommandMatcher::new(config.on_trigger, config.off_trigger, config.subcode),
            config,
            driver,
            shared,
            value,
            poller,
            sync: QueueSync::new(&services),
            services,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Logical on/off state.
    #[inline]
    pub fn state(&self) -> bool {
        self.shared.state()
    }

    /// Logical analog value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn driver(&self) -> &OutputDriver {
        &self.driver
    }

    pub fn shared(&self) -> &Arc<SwitchShared> {
        &self.shared
    }

    /// Queue drains performed by command handling so far.
    pub fn drain_count(&self) -> u64 {
        self.sync.drains()
    }

    /// Hand the input sampler over to the slow ticker.
    pub fn take_poller(&mut self) -> Option<InputPoller> {
        self.poller.take()
    }

    /// Software PWM modulator to be advanced by the slow ticker.
    pub fn modulator(&self) -> Option<Arc<SigmaDelta>> {
        self.driver.modulator()
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Handle a command line. Returns whether it matched a trigger.
    pub fn on_command(&mut self, cmd: &Command) -> bool {
        let Some(trigger) = self.matcher.classify(cmd) else {
            return false;
        };
        trace!("switch {}: {cmd} -> {trigger:?}", self.config.name);
        match trigger {
            Trigger::On => self.command_on(cmd.arg('S')),
            Trigger::Off => self.command_off(),
        }
        true
    }

    fn command_on(&mut self, arg: Option<f32>) {
        match self.driver.kind() {
            OutputKind::SoftPwm => {
                let value = match arg {
                    Some(s) => {
                        let max = self.driver.max_pwm().unwrap_or(self.config.max_pwm) as f32;
                        let v = (s * max / SOFT_PWM_COMMAND_SCALE).round().clamp(0.0, max);
                        // Senders repeat identical on-commands; skip the drain.
                        if self.driver.holds(v) {
                            trace!("switch {}: duty already {v}", self.config.name);
                            return;
                        }
                        v
                    }
                    None => self.value,
                };
                if self.drain() {
                    self.value = value;
                    self.driver.write_analog(value);
                    self.shared.set_state(value > 0.0);
                }
            }
            OutputKind::HardwarePwm => {
                let value = match arg {
                    Some(s) => {
                        let v = s.clamp(0.0, 100.0);
                        if self.driver.holds(v) {
                            trace!("switch {}: duty already {v}%", self.config.name);
                            return;
                        }
                        v
                    }
                    None => self.value,
                };
                if self.drain() {
                    self.value = value;
                    self.driver.write_analog(value);
                    self.shared.set_state(value != 0.0);
                }
            }
            OutputKind::Digital => {
                if self.drain() {
                    self.driver.set_logical(true);
                    self.shared.set_state(true);
                }
            }
            // Nothing physical to order against the queue.
            OutputKind::None => self.shared.set_state(true),
        }
    }

    fn command_off(&mut self) {
        if self.driver.kind() == OutputKind::None {
            self.shared.set_state(false);
            return;
        }
        if self.drain() {
            self.shared.set_state(false);
            self.driver.set_logical(false);
        }
    }

    /// Drain the motion queue. On halt the pending write is dropped and
    /// the failsafe applied; returns whether the write may proceed.
    fn drain(&mut self) -> bool {
        match self.sync.drain() {
            Drain::Idle => true,
            Drain::Halted => {
                warn!("switch {}: halted while draining, change dropped", self.config.name);
                self.on_halt();
                false
            }
        }
    }

    // ─── Public state ───────────────────────────────────────────────

    /// Read-back for a request naming `name`.
    pub fn on_get_state(&self, name: &str) -> Option<SwitchReport> {
        (name == self.config.name).then(|| self.report())
    }

    /// Apply a public write naming `name`; `None` if not addressed to us.
    ///
    /// A state write without configured side-effect commands is
    /// reconciled immediately, so it takes effect even while the main
    /// loop is blocked.
    pub fn on_set_state(&mut self, name: &str, update: SwitchUpdate) -> Option<SwitchReport> {
        if name != self.config.name {
            return None;
        }
        match update {
            SwitchUpdate::State { state } => {
                self.shared.emit(state);
                if !self.config.has_side_effects() {
                    self.on_main_loop();
                }
            }
            SwitchUpdate::Value { value } => {
                self.value = value;
                self.shared.emit(self.shared.state());
            }
        }
        Some(self.report())
    }

    fn report(&self) -> SwitchReport {
        SwitchReport {
            name: self.config.name.clone(),
            state: self.state(),
            value: self.value,
        }
    }
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("name", &self.config.name)
            .field("driver", &self.driver)
            .field("state", &self.state())
            .field("value", &self.value)
            .finish()
    }
}
