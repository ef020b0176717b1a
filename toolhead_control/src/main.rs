//! # Toolhead
//!
//! Runs the actuator runtime against a simulation board.
//!
//! Lines on stdin are handled as:
//! - `!halt` / `!clear` - raise or clear the global halt
//! - `{...}` - public state request (JSON), reply printed as JSON
//! - anything else - a command line; `G` words nobody takes are queued as
//!   simulated moves
//!
//! Side-effect commands emitted by switches are fed back through the same
//! path on the next main loop iteration.

use clap::Parser;
use serde::Deserialize;
use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use toolhead_common::command::{Command, CommandLetter};
use toolhead_common::config::TomlConfig;
use toolhead_common::pin::PinSpec;
use toolhead_control::config::MachineConfig;
use toolhead_control::public::StateRequest;
use toolhead_control::runtime::{SlowTicker, ToolRuntime};
use toolhead_control::services::{
    HaltFlag, HaltSignal, MonotonicClock, Reporter, Services, TracingReporter,
};
use toolhead_control::simulation::{RecordingSink, SimPlayer, SimQueue, SleepIdle};
use toolhead_hal::SimBoard;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Toolhead actuator runtime
#[derive(Parser, Debug)]
#[command(name = "toolhead")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Switch and spindle actuator control on a simulation board")]
struct Args {
    /// Path to the machine configuration TOML.
    #[arg(default_value = "config/toolhead.toml")]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

/// `[board]` section: simulated PWM channels.
#[derive(Debug, Default, Deserialize)]
struct BoardSection {
    #[serde(default)]
    pwm_pins: Vec<String>,
}

/// Console line raising the global halt.
const HALT_LINE: &str = "!halt";

/// Reporter printing to the console.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, message: &str) {
        println!("{message}");
    }
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Toolhead v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Toolhead shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let (machine, toml) = MachineConfig::load(&args.config)?;
    info!("Config OK: service={}", machine.shared.service_name);

    let board = build_board(&toml)?;

    let clock = Arc::new(MonotonicClock::new()?);
    let queue = Arc::new(SimQueue::new(clock.clone()));
    let halt = HaltSignal::new();
    let sink = Arc::new(RecordingSink::default());
    // JSON logging keeps reports in the structured stream.
    let reporter: Arc<dyn Reporter> = if args.json {
        Arc::new(TracingReporter)
    } else {
        Arc::new(ConsoleReporter)
    };
    let services = Services {
        queue: queue.clone(),
        player: Arc::new(SimPlayer::default()),
        idle: Arc::new(SleepIdle(Duration::from_millis(1))),
        halt: Arc::new(halt.clone()),
        commands: sink.clone(),
        reporter: reporter.clone(),
        clock,
    };

    let mut runtime = ToolRuntime::new(&machine, &board, services)?;
    let ticker = SlowTicker::spawn(runtime.tick_tasks(), machine.runtime.tick_period_ms)?;

    // Setup signal handler for graceful shutdown. The halt also releases a
    // main loop blocked in a drain or ramp-up wait.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    let h = halt.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        h.raise();
        r.store(false, Ordering::SeqCst);
    })?;

    let lines = spawn_stdin_reader(halt.clone())?;
    let mut console = Console {
        runtime: &mut runtime,
        queue,
        halt,
        reporter,
        move_ms: machine.runtime.queue_drain_ms,
    };
    let period = Duration::from_millis(machine.runtime.main_loop_period_ms);

    info!("Main loop running ({} ms)", machine.runtime.main_loop_period_ms);
    while running.load(Ordering::SeqCst) {
        match lines.recv_timeout(period) {
            Ok(line) => console.handle(&line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("stdin closed");
                break;
            }
        }
        for line in sink.take() {
            debug!("side-effect command: {line}");
            console.handle(&line);
        }
        console.runtime.on_main_loop();
    }

    ticker.stop();
    Ok(())
}

/// Board with the PWM channels listed under `[board]`.
fn build_board(toml: &TomlConfig) -> Result<SimBoard, Box<dyn std::error::Error>> {
    let section: BoardSection = toml.section("board")?.unwrap_or_default();
    let mut pins = Vec::with_capacity(section.pwm_pins.len());
    for text in &section.pwm_pins {
        match text.parse::<PinSpec>()?.address() {
            Some(addr) => pins.push(addr),
            None => warn!("[board] pwm pin {text:?} is not connected; skipped"),
        }
    }
    info!("Simulation board: {} PWM channels", pins.len());
    Ok(SimBoard::new().with_pwm_pins(&pins))
}

/// Forward stdin lines to the main loop.
///
/// `!halt` raises the halt signal here, on the reader thread, since the
/// main loop may be blocked in a wait that only observes the signal. The
/// line is still forwarded so the main loop applies the failsafe.
fn spawn_stdin_reader(halt: HaltSignal) -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim() == HALT_LINE {
                    halt.raise();
                }
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Console line handling.
struct Console<'a> {
    runtime: &'a mut ToolRuntime,
    queue: Arc<SimQueue>,
    halt: HaltSignal,
    reporter: Arc<dyn Reporter>,
    move_ms: u64,
}

impl Console<'_> {
    fn handle(&mut self, line: &str) {
        let line = line.trim();
        match line {
            "" => {}
            HALT_LINE => {
                warn!("halt requested");
                self.halt.raise();
                self.runtime.on_halt();
                self.reporter.report("!! halted, send !clear to resume");
            }
            "!clear" => {
                self.halt.clear();
                self.reporter.report("halt cleared");
            }
            l if l.starts_with('{') => self.handle_request(l),
            l => self.handle_command(l),
        }
    }

    fn handle_request(&mut self, line: &str) {
        let request = match StateRequest::from_json(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("{e}");
                return;
            }
        };
        if let Some(reply) = self.runtime.on_state_request(request) {
            match reply.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("{e}"),
            }
        }
    }

    fn handle_command(&mut self, line: &str) {
        if self.halt.is_halted() {
            self.reporter.report("!! halted, send !clear to resume");
            return;
        }
        let cmd: Command = match line.parse() {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("{e}");
                return;
            }
        };
        if !self.runtime.on_command(&cmd) && cmd.letter == CommandLetter::G {
            self.queue.push_move(self.move_ms);
        }
        self.reporter.report("ok");
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
