//! Spindle command handling, ramp-up wait and halt.

use std::sync::Arc;

use tracing::{debug, info, warn};
use toolhead_common::command::{Command, CommandLetter};
use toolhead_hal::Board;

use super::{PwmSpindle, SpindleConfig, SpindleDriver};
use crate::public::SpindleReport;
use crate::services::{Clock, HaltFlag, IdleHook, Services};
use crate::sync::{Drain, QueueSync};

const M_SPINDLE_CW: u16 = 3;
const M_SPINDLE_CCW: u16 = 4;
const M_SPINDLE_OFF: u16 = 5;
const M_REPORT_SPEED: u16 = 957;
const M_SET_PID: u16 = 958;

/// Outcome of the ramp-up wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    Reached,
    Halted,
}

/// Spindle controller.
pub struct SpindleControl {
    config: SpindleConfig,
    driver: Box<dyn SpindleDriver>,
    on: bool,
    target_speed: i32,
    sync: QueueSync,
    clock: Arc<dyn Clock>,
    idle: Arc<dyn IdleHook>,
    halt: Arc<dyn HaltFlag>,
    services: Services,
}

impl SpindleControl {
    /// Controller over an explicit backend.
    pub fn new(config: SpindleConfig, driver: Box<dyn SpindleDriver>, services: Services) -> Self {
        Self {
            config,
            driver,
            on: false,
            target_speed: 0,
            sync: QueueSync::new(&services),
            clock: services.clock.clone(),
            idle: services.idle.clone(),
            halt: services.halt.clone(),
            services,
        }
    }

    /// PWM spindle on the configured pin. `None`, with a diagnostic, when
    /// the pin has no PWM channel.
    pub fn build(config: SpindleConfig, board: &dyn Board, services: Services) -> Option<Self> {
        match board.pwm_output(&config.output_pin) {
            Ok(channel) => {
                let driver = PwmSpindle::new(channel, config.pwm_period_us(), config.max_rpm);
                info!(
                    "spindle on {} (max {} rpm, ramp {} ms)",
                    config.output_pin, config.max_rpm, config.startup_time_ms
                );
                Some(Self::new(config, Box::new(driver), services))
            }
            Err(e) => {
                let message = format!("spindle: output pin {} - {e} - disabled", config.output_pin);
                warn!("{message}");
                services.reporter.report(&message);
                None
            }
        }
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.on
    }

    #[inline]
    pub fn target_speed(&self) -> i32 {
        self.target_speed
    }

    pub fn drain_count(&self) -> u64 {
        self.sync.drains()
    }

    /// Handle a command line. Returns whether it was a spindle command.
    pub fn on_command(&mut self, cmd: &Command) -> bool {
        if cmd.letter != CommandLetter::M {
            return false;
        }
        match cmd.code {
            M_REPORT_SPEED => {
                self.services.reporter.report(&self.driver.report_speed());
            }
            M_SET_PID => {
                if self.drain() {
                    if let Some(p) = cmd.arg('P') {
                        self.driver.set_p_term(p);
                    }
                    if let Some(i) = cmd.arg('I') {
                        self.driver.set_i_term(i);
                    }
                    if let Some(d) = cmd.arg('D') {
                        self.driver.set_d_term(d);
                    }
                    let gains = self.driver.pid_settings();
                    self.services.reporter.report(&gains.to_string());
                }
            }
            M_SPINDLE_CW | M_SPINDLE_CCW => {
                let speed = cmd.arg('S').map_or(self.target_speed, |s| s.round() as i32);
                if self.drain() {
                    self.start(speed);
                }
            }
            M_SPINDLE_OFF => {
                if self.drain() {
                    self.stop();
                }
            }
            _ => return false,
        }
        true
    }

    /// Turn on if needed, command `speed` and wait for ramp-up.
    fn start(&mut self, speed: i32) -> Ramp {
        if !self.on {
            self.driver.turn_on();
            self.on = true;
        }
        self.target_speed = speed;
        self.driver.set_speed(speed);
        debug!("spindle on at {speed} rpm");
        self.wait_for_spindle()
    }

    fn stop(&mut self) {
        if self.on {
            self.driver.turn_off();
            self.on = false;
            debug!("spindle off");
        }
    }

    /// Block for the configured ramp-up time, pumping the idle hook.
    /// Returns early, with the spindle off, if the system halts.
    pub fn wait_for_spindle(&mut self) -> Ramp {
        let start = self.clock.now_ms();
        while self.clock.now_ms().saturating_sub(start) < self.config.startup_time_ms {
            self.idle.on_idle();
            if self.halt.is_halted() {
                warn!("spindle: halted during ramp-up");
                self.on_halt();
                return Ramp::Halted;
            }
        }
        Ramp::Reached
    }

    fn drain(&mut self) -> bool {
        match self.sync.drain() {
            Drain::Idle => true,
            Drain::Halted => {
                self.on_halt();
                false
            }
        }
    }

    /// Global halt: spindle off.
    pub fn on_halt(&mut self) {
        self.driver.turn_off();
        self.on = false;
    }

    // ─── Public state ───────────────────────────────────────────────

    pub fn on_get_state(&self) -> SpindleReport {
        SpindleReport {
            on: self.on,
            target_speed: self.target_speed,
        }
    }

    /// Public write: drain, then turn on at `target_speed` (or the held
    /// target) or turn off.
    pub fn on_set_state(&mut self, on: bool, target_speed: Option<i32>) -> SpindleReport {
        if self.drain() {
            if on {
                let speed = target_speed.unwrap_or(self.target_speed);
                self.start(speed);
            } else {
                self.stop();
            }
        }
        self.on_get_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimHandles;
    use toolhead_common::pin::PinSpec;
    use toolhead_hal::SimBoard;

    fn spindle(startup_time_ms: u64) -> (SpindleControl, SimBoard, SimHandles) {
        let board = SimBoard::new().with_pwm_pins(&[(2, 5)]);
        let (services, sim) = Services::simulated();
        let config = SpindleConfig {
            output_pin: PinSpec::gpio(2, 5),
            pwm_period_ms: 20.0,
            max_rpm: 10_000.0,
            startup_time_ms,
        };
        let sp = SpindleControl::build(config, &board, services).unwrap();
        (sp, board, sim)
    }

    fn cmd(s: &str) -> Command {
        s.parse().unwrap()
    }

    #[test]
    fn m3_turns_on_and_waits() {
        let (mut sp, board, sim) = spindle(300);
        assert!(sp.on_command(&cmd("M3 S5000")));
        assert!(sp.is_on());
        assert_eq!(sp.target_speed(), 5000);
        assert_eq!(board.pin(2, 5).duty, 0.5);
        assert!(sim.clock.now_ms() >= 300);
    }

    #[test]
    fn m4_reuses_held_target() {
        let (mut sp, board, _) = spindle(0);
        sp.on_command(&cmd("M3 S2000"));
        sp.on_command(&cmd("M5"));
        assert_eq!(board.pin(2, 5).duty, 0.0);
        sp.on_command(&cmd("M4"));
        assert!(sp.is_on());
        assert_eq!(board.pin(2, 5).duty, 0.2);
    }

    #[test]
    fn m958_sets_each_gain() {
        let (mut sp, _, sim) = spindle(0);
        sp.on_command(&cmd("M958 P0.5 I0.25 D2"));
        assert!(sim.reporter.contains("P: 0.5000 I: 0.2500 D: 2.0000"));
        sp.on_command(&cmd("M958 I1"));
        assert!(sim.reporter.contains("P: 0.5000 I: 1.0000 D: 2.0000"));
        assert_eq!(sp.drain_count(), 2);
    }

    #[test]
    fn m957_reports_without_drain() {
        let (mut sp, _, sim) = spindle(0);
        sim.queue.push_move(1_000);
        sp.on_command(&cmd("M957"));
        assert!(sim.reporter.contains("Target RPM: 0"));
        assert_eq!(sp.drain_count(), 0);
    }

    #[test]
    fn other_commands_pass_through() {
        let (mut sp, _, _) = spindle(0);
        assert!(!sp.on_command(&cmd("G3 X1 Y1")));
        assert!(!sp.on_command(&cmd("M106")));
    }

    #[test]
    fn public_write_stores_new_target() {
        let (mut sp, board, _) = spindle(0);
        let report = sp.on_set_state(true, Some(7500));
        assert_eq!(report, SpindleReport { on: true, target_speed: 7500 });
        assert_eq!(board.pin(2, 5).duty, 0.75);
        let report = sp.on_set_state(false, None);
        assert!(!report.on);
        assert_eq!(report.target_speed, 7500);
    }

    #[test]
    fn missing_pwm_channel_disables_spindle() {
        let board = SimBoard::new();
        let (services, sim) = Services::simulated();
        let config = SpindleConfig {
            output_pin: PinSpec::gpio(1, 1),
            pwm_period_ms: 20.0,
            max_rpm: 10_000.0,
            startup_time_ms: 0,
        };
        assert!(SpindleControl::build(config, &board, services).is_none());
        assert!(sim.reporter.contains("not PWM capable"));
    }
}
