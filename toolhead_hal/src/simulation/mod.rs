//! Simulation board.
//!
//! Every connected descriptor resolves to an in-memory pin. Hardware PWM
//! is only available on addresses registered with
//! [`SimBoard::with_pwm_pins`], so degradation paths can be exercised.
//!
//! ```rust
//! use toolhead_common::pin::PinSpec;
//! use toolhead_hal::{Board, DigitalOutput, SimBoard};
//!
//! let board = SimBoard::new();
//! let mut led = board.digital_output(&PinSpec::gpio(1, 18)).unwrap();
//! led.set(true);
//! assert!(board.pin(1, 18).level);
//! ```

mod io;

pub use io::SimPinState;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use toolhead_common::pin::PinSpec;

use crate::capability::{Board, DigitalInput, DigitalOutput, HalError, PwmOutput};
use io::SimIo;

/// In-memory board. Clones share the same pin table.
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    io: Arc<Mutex<SimIo>>,
}

impl SimBoard {
    /// Board with no PWM-capable pins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of hardware PWM channels.
    pub fn with_pwm_pins(self, pins: &[(u8, u8)]) -> Self {
        {
            let mut io = self.lock();
            for &addr in pins {
                io.mark_pwm_capable(addr);
            }
        }
        self
    }

    /// Snapshot of a pin.
    pub fn pin(&self, port: u8, pin: u8) -> SimPinState {
        self.lock().state((port, pin))
    }

    /// Drive the physical level seen by inputs on `(port, pin)`.
    pub fn set_input(&self, port: u8, pin: u8, level: bool) {
        self.lock().inject((port, pin), level);
    }

    fn lock(&self) -> MutexGuard<'_, SimIo> {
        lock(&self.io)
    }

    fn claim(&self, pin: &PinSpec) -> Result<(u8, u8), HalError> {
        let addr = pin.address().ok_or(HalError::NotConnected)?;
        if !self.lock().claim(addr) {
            return Err(HalError::PinInUse(*pin));
        }
        Ok(addr)
    }
}

impl Board for SimBoard {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn digital_output(&self, pin: &PinSpec) -> Result<Box<dyn DigitalOutput>, HalError> {
        let addr = self.claim(pin)?;
        debug!("sim: digital output {pin}");
        Ok(Box::new(SimDigitalOut {
            io: self.io.clone(),
            addr,
            inverted: pin.is_inverted(),
            level: false,
        }))
    }

    fn digital_input(&self, pin: &PinSpec) -> Result<Box<dyn DigitalInput>, HalError> {
        let addr = pin.address().ok_or(HalError::NotConnected)?;
        debug!("sim: digital input {pin}");
        Ok(Box::new(SimDigitalIn {
            io: self.io.clone(),
            addr,
            inverted: pin.is_inverted(),
        }))
    }

    fn pwm_output(&self, pin: &PinSpec) -> Result<Box<dyn PwmOutput>, HalError> {
        let addr = pin.address().ok_or(HalError::NotConnected)?;
        if !self.lock().is_pwm_capable(addr) {
            return Err(HalError::NotPwmCapable(*pin));
        }
        let addr = self.claim(pin)?;
        debug!("sim: pwm output {pin}");
        Ok(Box::new(SimPwmOut {
            io: self.io.clone(),
            addr,
            duty: 0.0,
        }))
    }
}

fn lock(io: &Mutex<SimIo>) -> MutexGuard<'_, SimIo> {
    io.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct SimDigitalOut {
    io: Arc<Mutex<SimIo>>,
    addr: (u8, u8),
    inverted: bool,
    level: bool,
}

impl DigitalOutput for SimDigitalOut {
    fn set(&mut self, level: bool) {
        self.level = level;
        lock(&self.io).drive(self.addr, level ^ self.inverted);
    }

    fn get(&self) -> bool {
        self.level
    }
}

impl Drop for SimDigitalOut {
    fn drop(&mut self) {
        lock(&self.io).release(self.addr);
    }
}

struct SimDigitalIn {
    io: Arc<Mutex<SimIo>>,
    addr: (u8, u8),
    inverted: bool,
}

impl DigitalInput for SimDigitalIn {
    fn get(&self) -> bool {
        lock(&self.io).state(self.addr).level ^ self.inverted
    }
}

struct SimPwmOut {
    io: Arc<Mutex<SimIo>>,
    addr: (u8, u8),
    duty: f32,
}

impl PwmOutput for SimPwmOut {
    fn set_period_us(&mut self, period_us: u32) {
        lock(&self.io).set_period(self.addr, period_us);
    }

    fn write(&mut self, duty: f32) {
        self.duty = duty.clamp(0.0, 1.0);
        lock(&self.io).write_duty(self.addr, self.duty);
    }

    fn read(&self) -> f32 {
        self.duty
    }
}

impl Drop for SimPwmOut {
    fn drop(&mut self) {
        lock(&self.io).release(self.addr);
    }
}
