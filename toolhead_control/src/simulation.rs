//! Simulated collaborators.
//!
//! The runtime binary runs against these, and the tests script them:
//! - `SimQueue` - motion queue that is busy until a deadline on a [`Clock`]
//! - `SimPlayer` - settable playback flag
//! - `SleepIdle` - idle hook that yields the thread for a fixed time
//! - `HaltAfterPumps` - idle hook raising the halt partway through a wait
//! - `RecordingSink` / `RecordingReporter` - collect emitted lines
//! - `Services::simulated` - a complete bundle around a [`ManualClock`]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::trace;

use crate::services::{
    Clock, CommandSink, HaltSignal, IdleHook, ManualClock, MotionQueue, Player, Reporter, Services,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─── SimQueue ───────────────────────────────────────────────────────

/// Motion queue that stays busy until all pushed moves have elapsed.
pub struct SimQueue {
    clock: Arc<dyn Clock>,
    busy_until_ms: AtomicU64,
}

impl SimQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            busy_until_ms: AtomicU64::new(0),
        }
    }

    /// Append a move taking `duration_ms` after everything already queued.
    pub fn push_move(&self, duration_ms: u64) {
        let now = self.clock.now_ms();
        let _ = self
            .busy_until_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |until| {
                Some(until.max(now) + duration_ms)
            });
        trace!("sim queue: move of {duration_ms} ms queued");
    }
}

impl MotionQueue for SimQueue {
    fn is_idle(&self) -> bool {
        self.clock.now_ms() >= self.busy_until_ms.load(Ordering::SeqCst)
    }
}

// ─── SimPlayer ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimPlayer(AtomicBool);

impl SimPlayer {
    pub fn set_playing(&self, playing: bool) {
        self.0.store(playing, Ordering::SeqCst);
    }
}

impl Player for SimPlayer {
    fn is_playing(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ─── SleepIdle ──────────────────────────────────────────────────────

/// Idle hook that sleeps for a fixed period on every pump.
#[derive(Debug, Clone, Copy)]
pub struct SleepIdle(pub Duration);

impl IdleHook for SleepIdle {
    fn on_idle(&self) {
        std::thread::sleep(self.0);
    }
}

/// Idle hook that pumps a [`ManualClock`] and raises the halt once the
/// clock has seen `after` pumps. Models an emergency stop arriving while
/// a wait is in progress.
pub struct HaltAfterPumps {
    clock: Arc<ManualClock>,
    halt: HaltSignal,
    after: u64,
}

impl HaltAfterPumps {
    pub fn new(clock: Arc<ManualClock>, halt: HaltSignal, after: u64) -> Self {
        Self { clock, halt, after }
    }
}

impl IdleHook for HaltAfterPumps {
    fn on_idle(&self) {
        self.clock.on_idle();
        if self.clock.pumps() >= self.after {
            self.halt.raise();
        }
    }
}

// ─── Recorders ──────────────────────────────────────────────────────

/// Command sink that queues lines for later execution.
#[derive(Debug, Default)]
pub struct RecordingSink(Mutex<VecDeque<String>>);

impl RecordingSink {
    /// Remove and return every queued line, oldest first.
    pub fn take(&self) -> Vec<String> {
        lock(&self.0).drain(..).collect()
    }
}

impl CommandSink for RecordingSink {
    fn send(&self, line: &str) {
        lock(&self.0).push_back(line.to_string());
    }
}

/// Reporter that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingReporter(Mutex<Vec<String>>);

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.0).iter().any(|m| m.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, message: &str) {
        lock(&self.0).push(message.to_string());
    }
}

// ─── Simulated bundle ───────────────────────────────────────────────

/// Handles to the concrete collaborators behind a simulated [`Services`].
#[derive(Clone)]
pub struct SimHandles {
    pub clock: Arc<ManualClock>,
    pub queue: Arc<SimQueue>,
    pub player: Arc<SimPlayer>,
    pub halt: HaltSignal,
    pub commands: Arc<RecordingSink>,
    pub reporter: Arc<RecordingReporter>,
}

impl SimHandles {
    /// Idle hook on this bundle's clock that halts after `pumps` pumps.
    pub fn halt_after(&self, pumps: u64) -> Arc<HaltAfterPumps> {
        Arc::new(HaltAfterPumps::new(self.clock.clone(), self.halt.clone(), pumps))
    }
}

impl Services {
    /// Fully simulated services over a [`ManualClock`] stepping 1 ms per
    /// idle pump.
    pub fn simulated() -> (Self, SimHandles) {
        let clock = Arc::new(ManualClock::new(1));
        let handles = SimHandles {
            queue: Arc::new(SimQueue::new(clock.clone())),
            clock,
            player: Arc::new(SimPlayer::default()),
            halt: HaltSignal::new(),
            commands: Arc::new(RecordingSink::default()),
            reporter: Arc::new(RecordingReporter::default()),
        };
        let services = Self {
            queue: handles.queue.clone(),
            player: handles.player.clone(),
            idle: handles.clock.clone(),
            halt: Arc::new(handles.halt.clone()),
            commands: handles.commands.clone(),
            reporter: handles.reporter.clone(),
            clock: handles.clock.clone(),
        };
        (services, handles)
    }
}
