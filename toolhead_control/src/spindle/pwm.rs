//! Open-loop spindle on a hardware PWM channel.
//!
//! Duty is `target_rpm / max_rpm` while on. There is no speed feedback:
//! the reported speed is the commanded one, and the PID gains are only
//! stored for the console.

use toolhead_hal::PwmOutput;
use tracing::trace;

use super::{PidGains, SpindleDriver};

pub struct PwmSpindle {
    channel: Box<dyn PwmOutput>,
    max_rpm: f32,
    on: bool,
    target_rpm: i32,
    gains: PidGains,
}

impl PwmSpindle {
    pub fn new(mut channel: Box<dyn PwmOutput>, period_us: u32, max_rpm: f32) -> Self {
        channel.set_period_us(period_us);
        channel.write(0.0);
        Self {
            channel,
            max_rpm: max_rpm.max(1.0),
            on: false,
            target_rpm: 0,
            gains: PidGains::default(),
        }
    }

    fn duty(&self) -> f32 {
        if self.on {
            (self.target_rpm as f32 / self.max_rpm).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn apply(&mut self) {
        let duty = self.duty();
        trace!("spindle pwm duty {duty:.3}");
        self.channel.write(duty);
    }
}

impl SpindleDriver for PwmSpindle {
    fn turn_on(&mut self) {
        self.on = true;
        self.apply();
    }

    fn turn_off(&mut self) {
        self.on = false;
        self.apply();
    }

    fn set_speed(&mut self, rpm: i32) {
        self.target_rpm = rpm;
        self.apply();
    }

    fn report_speed(&self) -> String {
        let actual = self.channel.read() * self.max_rpm;
        format!(
            "Current RPM: {actual:.0}  Target RPM: {}  PWM value: {:.3}",
            self.target_rpm,
            self.channel.read()
        )
    }

    fn set_p_term(&mut self, p: f32) {
        self.gains.p = p;
    }

    fn set_i_term(&mut self, i: f32) {
        self.gains.i = i;
    }

    fn set_d_term(&mut self, d: f32) {
        self.gains.d = d;
    }

    fn pid_settings(&self) -> PidGains {
        self.gains
    }
}
