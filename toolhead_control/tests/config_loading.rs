//! Machine file loading, including the shipped sample configuration.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use toolhead_common::config::ConfigError;
use toolhead_common::pin::PinSpec;
use toolhead_control::config::MachineConfig;
use toolhead_control::error::RuntimeError;
use toolhead_control::runtime::ToolRuntime;
use toolhead_control::services::Services;
use toolhead_control::switch::{InputBehavior, OutputKind};
use toolhead_hal::SimBoard;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn sample_configuration_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/toolhead.toml");
    let (machine, _) = MachineConfig::load(&path).unwrap();

    assert_eq!(machine.shared.service_name, "toolhead");
    assert_eq!(machine.runtime.tick_period_ms, 100);
    assert_eq!(machine.switches.len(), 4);

    let laser = machine.switches.iter().find(|s| s.name == "laser").unwrap();
    assert_eq!(laser.output_kind, OutputKind::HardwarePwm);
    assert_eq!(laser.subcode, 1);
    assert_eq!(laser.pwm_period_us(), 50);

    let psu = machine.switches.iter().find(|s| s.name == "psu").unwrap();
    assert!(psu.protected);
    assert_eq!(psu.input_behavior, InputBehavior::LongPush);
    assert_eq!(psu.output_on_command.as_str(), "M80");

    let spindle = machine.spindle.unwrap();
    assert_eq!(spindle.output_pin, PinSpec::gpio(2, 5));
    assert_eq!(spindle.startup_time_ms, 2000);
}

#[test]
fn sample_configuration_builds_on_simulation_board() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/toolhead.toml");
    let (machine, _) = MachineConfig::load(&path).unwrap();
    let board = SimBoard::new().with_pwm_pins(&[(2, 5), (2, 3)]);
    let (services, sim) = Services::simulated();

    let mut rt = ToolRuntime::new(&machine, &board, services).unwrap();

    assert!(rt.spindle().is_some());
    assert_eq!(rt.switch("laser").unwrap().driver().kind(), OutputKind::HardwarePwm);
    assert_eq!(rt.tick_tasks().pollers.len(), 2);
    assert!(sim.reporter.messages().is_empty());
}

#[test]
fn missing_file_is_reported() {
    let err = MachineConfig::load(Path::new("/nonexistent/toolhead.toml")).unwrap_err();
    assert!(matches!(err, RuntimeError::Config(ConfigError::FileNotFound)));
}

#[test]
fn malformed_toml_is_reported() {
    let file = write_config("[switch.fan\noutput_pin = ");
    let err = MachineConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, RuntimeError::Config(ConfigError::ParseError(_))));
}

#[test]
fn too_many_switches_is_rejected() {
    let body: String = (0..17)
        .map(|i| format!("[switch.s{i}]\noutput_pin = \"0.{i}\"\n"))
        .collect();
    let file = write_config(&body);
    let err = MachineConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, RuntimeError::TooManySwitches { count: 17, max: 16 }));
}

#[test]
fn empty_file_uses_defaults() {
    let file = write_config("");
    let (machine, _) = MachineConfig::load(file.path()).unwrap();
    assert!(machine.switches.is_empty());
    assert!(machine.spindle.is_none());
    assert_eq!(machine.runtime.main_loop_period_ms, 10);
}
