//! Collaborator interfaces injected into every actuator.
//!
//! Actuators never reach for globals. Each one receives a [`Services`]
//! bundle at construction holding handles to:
//!
//! | trait | question / action |
//! |---|---|
//! | [`MotionQueue`] | is the motion queue idle? |
//! | [`Player`] | is a program currently playing? |
//! | [`IdleHook`] | pump other cooperative work while blocked |
//! | [`HaltFlag`] | has the system entered halt? |
//! | [`CommandSink`] | inject a side-effect command line |
//! | [`Reporter`] | diagnostic console output |
//! | [`Clock`] | monotonic milliseconds |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use nix::time::{ClockId, clock_gettime};
use tracing::info;

/// Motion queue idle query.
pub trait MotionQueue: Send + Sync {
    fn is_idle(&self) -> bool;
}

/// Program playback query.
pub trait Player: Send + Sync {
    fn is_playing(&self) -> bool;
}

/// Cooperative yield, called on every iteration of a blocking wait.
pub trait IdleHook: Send + Sync {
    fn on_idle(&self);
}

/// Global halt condition.
pub trait HaltFlag: Send + Sync {
    fn is_halted(&self) -> bool;
}

/// Destination for side-effect command lines.
pub trait CommandSink: Send + Sync {
    fn send(&self, line: &str);
}

/// Diagnostic sink (console stream).
pub trait Reporter: Send + Sync {
    fn report(&self, message: &str);
}

/// Monotonic time source in milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Collaborator handles shared by all actuators of a runtime.
#[derive(Clone)]
pub struct Services {
    pub queue: Arc<dyn MotionQueue>,
    pub player: Arc<dyn Player>,
    pub idle: Arc<dyn IdleHook>,
    pub halt: Arc<dyn HaltFlag>,
    pub commands: Arc<dyn CommandSink>,
    pub reporter: Arc<dyn Reporter>,
    pub clock: Arc<dyn Clock>,
}

// ─── HaltSignal ─────────────────────────────────────────────────────

/// Settable halt flag.
///
/// Cloned handles share one flag; the runtime binary raises it on `!halt`
/// and lowers it on `!clear`.
#[derive(Debug, Clone, Default)]
pub struct HaltSignal(Arc<AtomicBool>);

impl HaltSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl HaltFlag for HaltSignal {
    fn is_halted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ─── Clocks ─────────────────────────────────────────────────────────

/// `CLOCK_MONOTONIC` milliseconds since construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin_ms: u64,
    last_ms: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Result<Self, nix::Error> {
        Ok(Self {
            origin_ms: read_monotonic_ms()?,
            last_ms: AtomicU64::new(0),
        })
    }
}

fn read_monotonic_ms() -> Result<u64, nix::Error> {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)?;
    Ok(ts.tv_sec() as u64 * 1000 + ts.tv_nsec() as u64 / 1_000_000)
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        match read_monotonic_ms() {
            Ok(now) => {
                let elapsed = now.saturating_sub(self.origin_ms);
                self.last_ms.store(elapsed, Ordering::Relaxed);
                elapsed
            }
            // Hold the last reading; time never runs backwards.
            Err(_) => self.last_ms.load(Ordering::Relaxed),
        }
    }
}

/// Clock advanced by hand, and by `step_ms` on every idle pump.
///
/// Lets blocking waits complete deterministically in tests and
/// benchmarks.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
    step_ms: u64,
    pumps: AtomicU64,
}

impl ManualClock {
    /// Clock at zero advancing `step_ms` per idle pump.
    pub fn new(step_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(0),
            step_ms,
            pumps: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Number of idle pumps seen so far.
    pub fn pumps(&self) -> u64 {
        self.pumps.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

impl IdleHook for ManualClock {
    fn on_idle(&self) {
        self.pumps.fetch_add(1, Ordering::SeqCst);
        self.advance(self.step_ms);
    }
}

// ─── Reporters ──────────────────────────────────────────────────────

/// Reporter that forwards to `tracing` at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, message: &str) {
        info!(target: "toolhead::console", "{message}");
    }
}
