//! Queue synchronisation for command-driven output changes.
//!
//! A matched command must not change an output while earlier motion is
//! still executing. [`QueueSync::drain`] blocks until the motion queue is
//! idle, pumping the idle hook each iteration and giving up as soon as the
//! system halts.

use std::sync::Arc;

use tracing::debug;

use crate::services::{HaltFlag, IdleHook, MotionQueue, Services};

/// Outcome of a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Drain {
    /// Queue reached idle; the change may be applied.
    Idle,
    /// Halt observed; the change must be dropped.
    Halted,
}

/// Wait-for-idle policy.
pub struct QueueSync {
    queue: Arc<dyn MotionQueue>,
    idle: Arc<dyn IdleHook>,
    halt: Arc<dyn HaltFlag>,
    drains: u64,
}

impl QueueSync {
    pub fn new(services: &Services) -> Self {
        Self {
            queue: services.queue.clone(),
            idle: services.idle.clone(),
            halt: services.halt.clone(),
            drains: 0,
        }
    }

    /// Block until the queue is idle or the system halts.
    pub fn drain(&mut self) -> Drain {
        self.drains += 1;
        let mut pumps = 0u64;
        let outcome = loop {
            if self.halt.is_halted() {
                break Drain::Halted;
            }
            if self.queue.is_idle() {
                break Drain::Idle;
            }
            self.idle.on_idle();
            pumps += 1;
        };
        debug!("queue drain: {outcome:?} after {pumps} idle pumps");
        outcome
    }

    /// Number of drains performed.
    #[inline]
    pub fn drains(&self) -> u64 {
        self.drains
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_waits_for_queue() {
        let (services, sim) = Services::simulated();
        let mut sync = QueueSync::new(&services);
        sim.queue.push_move(30);

        assert_eq!(sync.drain(), Drain::Idle);
        assert_eq!(sim.clock.pumps(), 30);
        assert_eq!(sync.drains(), 1);
    }

    #[test]
    fn idle_queue_returns_without_pumping() {
        let (services, sim) = Services::simulated();
        let mut sync = QueueSync::new(&services);
        assert_eq!(sync.drain(), Drain::Idle);
        assert_eq!(sim.clock.pumps(), 0);
    }

    #[test]
    fn halt_aborts_drain() {
        let (services, sim) = Services::simulated();
        let mut sync = QueueSync::new(&services);
        sim.queue.push_move(1_000_000);
        sim.halt.raise();
        assert_eq!(sync.drain(), Drain::Halted);
        assert_eq!(sync.drains(), 1);
    }

    #[test]
    fn halt_arriving_mid_drain_stops_waiting() {
        let (mut services, sim) = Services::simulated();
        services.idle = sim.halt_after(10);
        let mut sync = QueueSync::new(&services);
        sim.queue.push_move(1_000);

        assert_eq!(sync.drain(), Drain::Halted);
        assert_eq!(sim.clock.pumps(), 10);
        assert!(!sim.queue.is_idle());
    }
}
