use crate::constants;
use std::time::Duration;

/// Tunables for the control loop, telemetry link and alarm rules
#[derive(Debug, Clone)]
pub struct ComputerConfig {
    pub tick_interval: Duration,
    pub poll_timeout: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub stale_polls: u64,       // Watchdog limit in polling intervals
    pub loss_polls: u32,        // Empty polls before the telemetry loss alarm
    pub low_fuel_fraction: f64, // Fuel fraction that raises the low fuel alarm
    pub key_queue_depth: usize,
    pub lamp_test: Duration,
}

impl ComputerConfig {
    /// Tick interval for a loop rate in Hz, clamped to at least 1 Hz
    pub fn with_rate(mut self, hz: u32) -> Self {
        self.tick_interval = Duration::from_millis(1000 / hz.max(1) as u64);
        self
    }

    /// Number of ticks the lamp test stays lit
    pub fn lamp_test_ticks(&self) -> u32 {
        let tick = self.tick_interval.as_millis().max(1);
        ((self.lamp_test.as_millis() + tick - 1) / tick) as u32
    }
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000 / constants::TICK_RATE_HZ as u64),
            poll_timeout: Duration::from_millis(constants::POLL_TIMEOUT_MS),
            backoff_initial: Duration::from_millis(constants::BACKOFF_INITIAL_MS),
            backoff_max: Duration::from_millis(constants::BACKOFF_MAX_MS),
            stale_polls: constants::STALE_POLL_INTERVALS,
            loss_polls: constants::TELEMETRY_LOSS_POLLS,
            low_fuel_fraction: constants::LOW_FUEL_FRACTION,
            key_queue_depth: constants::KEY_QUEUE_DEPTH,
            lamp_test: Duration::from_millis(constants::LAMP_TEST_MS),
        }
    }
}
