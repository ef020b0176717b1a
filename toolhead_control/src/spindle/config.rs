//! `[spindle]` section.

use toolhead_common::config::ConfigProvider;
use toolhead_common::consts::{
    DEFAULT_PWM_PERIOD_MS, DEFAULT_SPINDLE_MAX_RPM, DEFAULT_SPINDLE_STARTUP_MS, SPINDLE_SECTION,
};
use toolhead_common::pin::PinSpec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpindleConfig {
    /// Hardware PWM pin driving the speed controller.
    pub output_pin: PinSpec,
    pub pwm_period_ms: f32,
    /// Speed mapped to full duty.
    pub max_rpm: f32,
    /// Ramp-up wait after turning on or changing speed.
    pub startup_time_ms: u64,
}

impl SpindleConfig {
    /// `None` when the configuration has no spindle section.
    pub fn load(provider: &dyn ConfigProvider) -> Option<Self> {
        if !provider.has_section(SPINDLE_SECTION) {
            return None;
        }
        let number = |key: &str, default: f64| provider.number_or(SPINDLE_SECTION, None, key, default);
        Some(Self {
            output_pin: PinSpec::parse_or_nc(&provider.string_or(
                SPINDLE_SECTION,
                None,
                "output_pin",
                "nc",
            )),
            pwm_period_ms: number("pwm_period_ms", DEFAULT_PWM_PERIOD_MS as f64) as f32,
            max_rpm: number("max_rpm", DEFAULT_SPINDLE_MAX_RPM as f64).max(1.0) as f32,
            startup_time_ms: number("startup_time", DEFAULT_SPINDLE_STARTUP_MS as f64).max(0.0)
                as u64,
        })
    }

    #[inline]
    pub fn pwm_period_us(&self) -> u32 {
        (self.pwm_period_ms.max(0.0) * 1000.0).round() as u32
    }
}
