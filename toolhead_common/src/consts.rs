//! System-wide constants for the toolhead workspace.
//!
//! Single source of truth for timing and default values. All times are in
//! milliseconds unless the name says otherwise.

/// Input sampling period of the slow ticker.
pub const DEFAULT_TICK_PERIOD_MS: u64 = 100;

/// Held-input ticks after which a long push resolves to "off".
pub const LONGPUSH_THRESHOLD_TICKS: u32 = 100;

/// Default main loop pacing of the runtime binary.
pub const DEFAULT_MAIN_LOOP_PERIOD_MS: u64 = 10;

/// Software PWM modulator rate.
pub const SIGMA_DELTA_TICK_HZ: u32 = 1000;

/// Default SoftPWM duty ceiling.
pub const DEFAULT_MAX_PWM: u32 = 255;

/// Reference scale of the `S` argument for SoftPWM outputs.
pub const SOFT_PWM_COMMAND_SCALE: f32 = 255.0;

/// Default hardware PWM period (50 Hz).
pub const DEFAULT_PWM_PERIOD_MS: f32 = 20.0;

/// Default spindle ramp-up wait.
pub const DEFAULT_SPINDLE_STARTUP_MS: u64 = 2000;

/// Default spindle speed mapped to 100 % duty.
pub const DEFAULT_SPINDLE_MAX_RPM: f32 = 10_000.0;

/// Maximum number of switch instances held by one runtime.
pub const MAX_SWITCHES: usize = 16;

/// Maximum length of a side-effect command line.
pub const MAX_COMMAND_LEN: usize = 64;

/// Configuration section holding switch instances.
pub const SWITCH_SECTION: &str = "switch";

/// Configuration section holding the spindle.
pub const SPINDLE_SECTION: &str = "spindle";

/// Configuration section holding runtime pacing.
pub const RUNTIME_SECTION: &str = "runtime";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(DEFAULT_TICK_PERIOD_MS > 0);
        assert!(LONGPUSH_THRESHOLD_TICKS > 0);
        assert!(DEFAULT_MAX_PWM > 0);
        assert!(DEFAULT_PWM_PERIOD_MS > 0.0);
        assert!(MAX_SWITCHES > 0);
    }

    #[test]
    fn sigma_delta_runs_faster_than_input_sampling() {
        let sigma_delta_period_ms = 1000 / SIGMA_DELTA_TICK_HZ as u64;
        assert!(sigma_delta_period_ms < DEFAULT_TICK_PERIOD_MS);
    }
}
