//! `toolhead` binary: console halt while the main loop is blocked.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

const MACHINE: &str = r#"
[runtime]
main_loop_period_ms = 10

[board]
pwm_pins = ["2.5"]

[spindle]
output_pin = "2.5"
startup_time = 4000
"#;

fn spawn(config: &NamedTempFile) -> Child {
    Command::new(env!("CARGO_BIN_EXE_toolhead"))
        .arg(config.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

/// Wait for exit, killing the child after `limit`.
fn wait_with_limit(child: &mut Child, limit: Duration) -> Option<Duration> {
    let start = Instant::now();
    while start.elapsed() < limit {
        if child.try_wait().unwrap().is_some() {
            return Some(start.elapsed());
        }
        thread::sleep(Duration::from_millis(10));
    }
    let _ = child.kill();
    let _ = child.wait();
    None
}

#[test]
fn console_halt_aborts_spindle_ramp() {
    let mut config = NamedTempFile::new().unwrap();
    config.write_all(MACHINE.as_bytes()).unwrap();

    let mut child = spawn(&config);
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "M3 S1000").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(200));

    let sent = Instant::now();
    writeln!(stdin, "!halt").unwrap();
    drop(stdin);

    let exited = wait_with_limit(&mut child, Duration::from_secs(6));
    assert!(exited.is_some(), "binary did not exit");
    let elapsed = sent.elapsed();
    assert!(
        elapsed < Duration::from_secs(2),
        "ramp ran to completion: {elapsed:?}"
    );
}

#[test]
fn closed_stdin_shuts_down() {
    let mut config = NamedTempFile::new().unwrap();
    config.write_all(MACHINE.as_bytes()).unwrap();

    let mut child = spawn(&config);
    drop(child.stdin.take());

    let exited = wait_with_limit(&mut child, Duration::from_secs(5));
    assert!(exited.is_some(), "binary did not exit on EOF");
}
