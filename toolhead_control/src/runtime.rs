//! Runtime dispatcher and slow ticker.
//!
//! [`ToolRuntime`] owns every actuator and exposes the plain entry points
//! the surrounding firmware calls: command, main loop, halt and state
//! request. [`SlowTicker`] is the periodic-tick collaborator: a thread that
//! advances the software PWM modulators at 1 kHz and samples inputs at the
//! configured tick period.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use heapless::Vec as FixedVec;
use tracing::{debug, info, trace, warn};
use toolhead_common::command::Command;
use toolhead_common::consts::{MAX_SWITCHES, SIGMA_DELTA_TICK_HZ};
use toolhead_hal::{Board, SigmaDelta};

use crate::config::MachineConfig;
use crate::error::RuntimeError;
use crate::public::{StateReply, StateRequest};
use crate::services::Services;
use crate::spindle::SpindleControl;
use crate::switch::{InputPoller, Switch};

/// All actuators of one machine.
pub struct ToolRuntime {
    switches: FixedVec<Switch, MAX_SWITCHES>,
    spindle: Option<SpindleControl>,
}

impl ToolRuntime {
    /// Build every configured actuator on `board`.
    pub fn new(machine: &MachineConfig, board: &dyn Board, services: Services) -> Result<Self, RuntimeError> {
        let mut switches = FixedVec::new();
        for config in &machine.switches {
            let switch = Switch::new(config.clone(), board, services.clone());
            if switches.push(switch).is_err() {
                return Err(RuntimeError::TooManySwitches {
                    count: machine.switches.len(),
                    max: MAX_SWITCHES,
                });
            }
        }
        let spindle = machine
            .spindle
            .and_then(|config| SpindleControl::build(config, board, services.clone()));

        info!(
            "Runtime ready: {} switches, spindle {}",
            switches.len(),
            if spindle.is_some() { "present" } else { "absent" }
        );
        Ok(Self { switches, spindle })
    }

    /// Detach the periodic work for the slow ticker. Subsequent calls
    /// yield no pollers.
    pub fn tick_tasks(&mut self) -> TickTasks {
        TickTasks {
            pollers: self.switches.iter_mut().filter_map(Switch::take_poller).collect(),
            modulators: self.switches.iter().filter_map(Switch::modulator).collect(),
        }
    }

    pub fn switches(&self) -> &[Switch] {
        &self.switches
    }

    pub fn switch(&self, name: &str) -> Option<&Switch> {
        self.switches.iter().find(|s| s.name() == name)
    }

    pub fn spindle(&self) -> Option<&SpindleControl> {
        self.spindle.as_ref()
    }

    /// Offer a command line to every actuator. Returns whether any took it.
    pub fn on_command(&mut self, cmd: &Command) -> bool {
        let mut taken = false;
        for switch in self.switches.iter_mut() {
            taken |= switch.on_command(cmd);
        }
        if let Some(spindle) = self.spindle.as_mut() {
            taken |= spindle.on_command(cmd);
        }
        taken
    }

    /// One main loop iteration.
    pub fn on_main_loop(&mut self) {
        for switch in self.switches.iter_mut() {
            switch.on_main_loop();
        }
    }

    /// Global halt.
    pub fn on_halt(&mut self) {
        debug!("halt: forcing failsafe");
        for switch in self.switches.iter_mut() {
            switch.on_halt();
        }
        if let Some(spindle) = self.spindle.as_mut() {
            spindle.on_halt();
        }
    }

    /// Route a public state request; `None` when nothing is addressed.
    pub fn on_state_request(&mut self, request: StateRequest) -> Option<StateReply> {
        let reply = match &request {
            StateRequest::GetSwitch { name } => self
                .switches
                .iter()
                .find_map(|s| s.on_get_state(name))
                .map(StateReply::Switch),
            StateRequest::SetSwitch { name, update } => self
                .switches
                .iter_mut()
                .find_map(|s| s.on_set_state(name, *update))
                .map(StateReply::Switch),
            StateRequest::GetSpindle => self
                .spindle
                .as_ref()
                .map(|s| StateReply::Spindle(s.on_get_state())),
            StateRequest::SetSpindle { on, target_speed } => self
                .spindle
                .as_mut()
                .map(|s| StateReply::Spindle(s.on_set_state(*on, *target_speed))),
        };
        if reply.is_none() {
            trace!("state request not addressed to any actuator: {request:?}");
        }
        reply
    }
}

// ─── Slow ticker ────────────────────────────────────────────────────

/// Periodic work detached from the runtime.
#[derive(Default)]
pub struct TickTasks {
    pub pollers: Vec<InputPoller>,
    pub modulators: Vec<Arc<SigmaDelta>>,
}

impl TickTasks {
    /// Sample every input once.
    pub fn tick_inputs(&mut self) {
        for poller in self.pollers.iter_mut() {
            poller.tick();
        }
    }

    /// Advance every software PWM modulator once.
    pub fn tick_modulators(&self) {
        for modulator in &self.modulators {
            modulator.on_tick();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pollers.is_empty() && self.modulators.is_empty()
    }
}

/// Background thread running [`TickTasks`]. Stopped and joined on drop.
pub struct SlowTicker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SlowTicker {
    pub fn spawn(mut tasks: TickTasks, tick_period_ms: u64) -> Result<Self, RuntimeError> {
        let base_us = 1_000_000 / u64::from(SIGMA_DELTA_TICK_HZ);
        let ticks_per_sample = (tick_period_ms * 1000 / base_us).max(1);

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        let handle = thread::Builder::new()
            .name("slow-ticker".into())
            .spawn(move || {
                let mut n: u64 = 0;
                while r.load(Ordering::Relaxed) {
                    tasks.tick_modulators();
                    n += 1;
                    if n % ticks_per_sample == 0 {
                        tasks.tick_inputs();
                    }
                    thread::sleep(Duration::from_micros(base_us));
                }
            })?;

        info!("Slow ticker started: inputs every {tick_period_ms} ms, PWM at {SIGMA_DELTA_TICK_HZ} Hz");
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("slow ticker thread panicked");
            }
            debug!("slow ticker stopped");
        }
    }
}

impl Drop for SlowTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::public::SwitchUpdate;
    use toolhead_common::config::TomlConfig;
    use toolhead_hal::SimBoard;

    const MACHINE: &str = r#"
[switch.fan]
output_pin = "2.4"
input_on_command = "M106"
input_off_command = "M107"

[switch.button]
input_pin = "1.30"
output_pin = "1.18"
output_type = "digital"

[spindle]
output_pin = "2.5"
startup_time = 0
"#;

    fn runtime(board: &SimBoard) -> ToolRuntime {
        let toml = TomlConfig::from_toml(MACHINE).unwrap();
        let machine = MachineConfig::from_toml(&toml).unwrap();
        let (services, _) = Services::simulated();
        ToolRuntime::new(&machine, board, services).unwrap()
    }

    #[test]
    fn builds_all_actuators() {
        let board = SimBoard::new().with_pwm_pins(&[(2, 5)]);
        let mut rt = runtime(&board);
        assert_eq!(rt.switches().len(), 2);
        assert!(rt.spindle().is_some());

        let tasks = rt.tick_tasks();
        assert_eq!(tasks.pollers.len(), 1);
        assert_eq!(tasks.modulators.len(), 1);
        assert!(rt.tick_tasks().pollers.is_empty());
    }

    #[test]
    fn commands_reach_switches_and_spindle() {
        let board = SimBoard::new().with_pwm_pins(&[(2, 5)]);
        let mut rt = runtime(&board);
        assert!(rt.on_command(&"M106 S255".parse().unwrap()));
        assert!(rt.switch("fan").unwrap().state());
        assert!(rt.on_command(&"M3 S1000".parse().unwrap()));
        assert!(rt.spindle().unwrap().is_on());
        assert!(!rt.on_command(&"G1 X10".parse().unwrap()));

        rt.on_halt();
        assert!(!rt.switch("fan").unwrap().state());
        assert!(!rt.spindle().unwrap().is_on());
    }

    #[test]
    fn state_requests_are_routed_by_name() {
        let board = SimBoard::new();
        let mut rt = runtime(&board);
        assert!(rt.spindle().is_none());

        let reply = rt.on_state_request(StateRequest::SetSwitch {
            name: "button".into(),
            update: SwitchUpdate::State { state: true },
        });
        assert!(matches!(reply, Some(StateReply::Switch(ref r)) if r.state));
        assert!(board.pin(1, 18).level);

        assert_eq!(
            rt.on_state_request(StateRequest::GetSwitch { name: "laser".into() }),
            None
        );
        assert_eq!(rt.on_state_request(StateRequest::GetSpindle), None);
    }

    #[test]
    fn ticker_drives_modulators_and_stops() {
        let board = SimBoard::new();
        let mut rt = runtime(&board);
        rt.on_command(&"M106 S255".parse().unwrap());
        let ticker = SlowTicker::spawn(rt.tick_tasks(), 10).unwrap();
        thread::sleep(Duration::from_millis(30));
        ticker.stop();
        assert!(board.pin(2, 4).level);
    }

    #[test]
    fn stopped_ticker_no_longer_modulates() {
        let board = SimBoard::new();
        let mut rt = runtime(&board);
        rt.on_command(&"M106 S128".parse().unwrap());
        let ticker = SlowTicker::spawn(rt.tick_tasks(), 10).unwrap();
        thread::sleep(Duration::from_millis(20));
        ticker.stop();

        let writes = board.pin(2, 4).writes;
        assert!(writes > 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(board.pin(2, 4).writes, writes);
    }
}
