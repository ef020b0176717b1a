//! Main loop reconciliation and halt failsafe.
//!
//! The reconciler is the only writer of a switch output outside command
//! handling. It turns a pending logical change (raised by the sampler or a
//! public write) into the side-effect command and the pin write.

use tracing::{debug, trace};

use super::Switch;

impl Switch {
    /// Apply a pending logical change, once per main loop iteration.
    ///
    /// Protected switches defer while the queue is busy or a program is
    /// playing; the change stays pending and is retried next iteration.
    pub fn on_main_loop(&mut self) {
        if !self.shared.is_pending() {
            return;
        }
        if self.config.protected && !self.may_act() {
            trace!("switch {}: busy, change deferred", self.config.name);
            return;
        }
        if let Some(on) = self.shared.take_pending() {
            self.apply(on);
        }
    }

    fn may_act(&self) -> bool {
        self.services.queue.is_idle() && !self.services.player.is_playing()
    }

    fn apply(&mut self, on: bool) {
        let line = if on {
            &self.config.output_on_command
        } else {
            &self.config.output_off_command
        };
        if !line.is_empty() {
            self.services.commands.send(line);
        }

        if on && self.driver.kind().is_analog() {
            self.driver.write_analog(self.value);
        } else {
            self.driver.set_logical(on);
        }
        debug!("switch {}: {}", self.config.name, if on { "on" } else { "off" });
    }

    /// Global halt: force the failsafe level unless configured to ignore
    /// halts. Pending changes are left untouched.
    pub fn on_halt(&mut self) {
        if self.config.ignore_on_halt {
            return;
        }
        let level = self.config.failsafe;
        self.shared.set_state(level);
        self.driver.force_failsafe(level);
        debug!("switch {}: halt, failsafe {}", self.config.name, level);
    }
}

#[cfg(test)]
mod tests {
    use crate::services::Services;
    use crate::simulation::SimHandles;
    use crate::switch::{Switch, SwitchConfig};
    use toolhead_common::config::TomlConfig;
    use toolhead_hal::SimBoard;

    fn build(body: &str, board: &SimBoard) -> (Switch, SimHandles) {
        let cfg = TomlConfig::from_toml(body).unwrap();
        let name = SwitchConfig::names(&cfg).remove(0);
        let (services, sim) = Services::simulated();
        (Switch::new(SwitchConfig::load(&cfg, &name), board, services), sim)
    }

    #[test]
    fn side_effect_sent_before_write() {
        let board = SimBoard::new();
        let (mut sw, sim) = build(
            r#"
[switch.psu]
output_pin = "0.25"
output_type = "digital"
output_on_command = "M117_PSU_on"
output_off_command = "M117_PSU_off"
"#,
            &board,
        );
        sw.shared().emit(true);
        sw.on_main_loop();
        assert_eq!(sim.commands.take(), vec!["M117 PSU on".to_string()]);
        assert!(board.pin(0, 25).level);

        sw.shared().emit(false);
        sw.on_main_loop();
        assert_eq!(sim.commands.take(), vec!["M117 PSU off".to_string()]);
        assert!(!board.pin(0, 25).level);
    }

    #[test]
    fn nothing_pending_nothing_written() {
        let board = SimBoard::new();
        let (mut sw, _) = build(
            "[switch.led]\noutput_pin = \"1.18\"\noutput_type = \"digital\"\n",
            &board,
        );
        let writes = board.pin(1, 18).writes;
        sw.on_main_loop();
        assert_eq!(board.pin(1, 18).writes, writes);
    }

    #[test]
    fn failsafe_high_on_halt() {
        let board = SimBoard::new();
        let (mut sw, _) = build(
            "[switch.brake]\noutput_pin = \"1.2\"\noutput_type = \"digital\"\nfailsafe_set_to = 1\n",
            &board,
        );
        sw.on_halt();
        assert!(sw.state());
        assert!(board.pin(1, 2).level);
    }

    #[test]
    fn ignore_on_halt_keeps_output() {
        let board = SimBoard::new();
        let (mut sw, _) = build(
            "[switch.light]\noutput_pin = \"1.3\"\noutput_type = \"digital\"\nstartup_state = true\nignore_on_halt = true\n",
            &board,
        );
        sw.on_halt();
        assert!(sw.state());
        assert!(board.pin(1, 3).level);
    }
}
