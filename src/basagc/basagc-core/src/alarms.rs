use crate::config::ComputerConfig;
use crate::constants::alarms;
use crate::telemetry::LinkHealth;
use log::{info, warn};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Advisory,
    Caution,
    Abort,
}

/// Every fault the computer can annunciate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmCode {
    TelemetryLoss,
    StaleTelemetry,
    NoBurnData,
    NoPhaseAngle,
    LowFuel,
    InvalidTarget,
    OrbitNotCircular,
    InclinationMismatch,
    IgnitionTooSoon,
    CommandFailure,
}

impl AlarmCode {
    pub fn number(&self) -> u16 {
        match self {
            AlarmCode::TelemetryLoss => alarms::TELEMETRY_LOSS,
            AlarmCode::StaleTelemetry => alarms::STALE_TELEMETRY,
            AlarmCode::NoBurnData => alarms::NO_BURN_DATA,
            AlarmCode::NoPhaseAngle => alarms::NO_PHASE_ANGLE,
            AlarmCode::LowFuel => alarms::LOW_FUEL,
            AlarmCode::InvalidTarget => alarms::INVALID_TARGET,
            AlarmCode::OrbitNotCircular => alarms::ORBIT_NOT_CIRCULAR,
            AlarmCode::InclinationMismatch => alarms::INCLINATION_MISMATCH,
            AlarmCode::IgnitionTooSoon => alarms::IGNITION_TOO_SOON,
            AlarmCode::CommandFailure => alarms::AUTOPILOT_ERROR,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlarmCode::StaleTelemetry => Severity::Advisory,
            AlarmCode::TelemetryLoss | AlarmCode::LowFuel | AlarmCode::CommandFailure => {
                Severity::Caution
            }
            _ => Severity::Abort,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AlarmCode::TelemetryLoss => "telemetry loss",
            AlarmCode::StaleTelemetry => "stale telemetry",
            AlarmCode::NoBurnData => "no burn data loaded",
            AlarmCode::NoPhaseAngle => "transfer geometry unavailable",
            AlarmCode::LowFuel => "fuel below threshold",
            AlarmCode::InvalidTarget => "invalid target",
            AlarmCode::OrbitNotCircular => "orbit not circular",
            AlarmCode::InclinationMismatch => "inclination mismatch with target",
            AlarmCode::IgnitionTooSoon => "time of ignition less than 2 minutes away",
            AlarmCode::CommandFailure => "vessel command failed",
        }
    }

    /// Code as shown on the console: program alarms and aborts carry an offset
    pub fn displayed(&self) -> u16 {
        match self.severity() {
            Severity::Advisory => self.number(),
            Severity::Caution => self.number() + alarms::CAUTION_OFFSET,
            Severity::Abort => self.number() + alarms::ABORT_OFFSET,
        }
    }
}

/// One raised alarm. Records are appended and later marked, never removed.
#[derive(Debug, Clone)]
pub struct AlarmRecord {
    pub code: AlarmCode,
    pub severity: Severity,
    pub raised_at: Instant,
    pub acknowledged: bool,
    pub cleared: bool,
    holding: bool, // Condition held at the last evaluation
}

impl AlarmRecord {
    fn new(code: AlarmCode, raised_at: Instant, holding: bool) -> Self {
        Self {
            code,
            severity: code.severity(),
            raised_at,
            acknowledged: false,
            cleared: false,
            holding,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.cleared
    }
}

/// State the monitor checks every cycle
#[derive(Debug, Clone, Copy)]
pub struct AlarmInputs {
    pub link: LinkHealth,
    pub consecutive_empty: u32,
    pub stale_fields: usize,
    pub fuel_fraction: Option<f64>,
    pub failed_commands: u32,
}

/// Fixed rule set over link health and the register bank, plus the
/// session's alarm history.
///
/// An alarm clears only when its condition has gone away and the operator
/// has acknowledged it, in either order.
pub struct AlarmMonitor {
    history: Vec<AlarmRecord>,
    loss_polls: u32,
    low_fuel_fraction: f64,
}

impl AlarmMonitor {
    pub fn new(config: &ComputerConfig) -> Self {
        Self {
            history: Vec::new(),
            loss_polls: config.loss_polls,
            low_fuel_fraction: config.low_fuel_fraction,
        }
    }

    fn conditions(&self, inputs: &AlarmInputs) -> heapless::Vec<AlarmCode, 4> {
        let mut holding = heapless::Vec::new();
        if inputs.link == LinkHealth::Down && inputs.consecutive_empty >= self.loss_polls {
            let _ = holding.push(AlarmCode::TelemetryLoss);
        }
        if inputs.link == LinkHealth::Up && inputs.stale_fields > 0 {
            let _ = holding.push(AlarmCode::StaleTelemetry);
        }
        if inputs.fuel_fraction.map_or(false, |f| f < self.low_fuel_fraction) {
            let _ = holding.push(AlarmCode::LowFuel);
        }
        if inputs.failed_commands > 0 {
            let _ = holding.push(AlarmCode::CommandFailure);
        }
        holding
    }

    /// Run the rule set once. Returns the alarms raised by this cycle,
    /// highest severity first.
    pub fn evaluate(&mut self, inputs: &AlarmInputs, now: Instant) -> Vec<AlarmCode> {
        let holding = self.conditions(inputs);

        for record in self.history.iter_mut().filter(|r| r.is_open()) {
            record.holding = holding.contains(&record.code);
            if record.acknowledged && !record.holding {
                info!("Alarm {} cleared", record.code.number());
                record.cleared = true;
            }
        }

        let mut raised = Vec::new();
        for code in holding.iter().copied() {
            if self.open_record(code).is_none() {
                warn!("Alarm {}: {}", code.displayed(), code.description());
                self.history.push(AlarmRecord::new(code, now, true));
                raised.push(code);
            }
        }
        raised.sort_by(|a, b| b.severity().cmp(&a.severity()));
        raised
    }

    /// Record a one-shot alarm raised by a program. Returns false when the
    /// same alarm is already open.
    pub fn raise_event(&mut self, code: AlarmCode, now: Instant) -> bool {
        if self.open_record(code).is_some() {
            return false;
        }
        warn!("Alarm {}: {}", code.displayed(), code.description());
        self.history.push(AlarmRecord::new(code, now, false));
        true
    }

    /// Operator acknowledgement; returns how many alarms cleared
    pub fn acknowledge(&mut self) -> usize {
        let mut cleared = 0;
        for record in self.history.iter_mut().filter(|r| r.is_open()) {
            record.acknowledged = true;
            if !record.holding {
                record.cleared = true;
                cleared += 1;
            }
        }
        if cleared > 0 {
            info!("Acknowledged, {} alarms cleared", cleared);
        }
        cleared
    }

    /// Highest-severity open alarm, most recent first on ties
    pub fn current(&self) -> Option<&AlarmRecord> {
        self.history
            .iter()
            .filter(|r| r.is_open())
            .max_by_key(|r| r.severity)
    }

    pub fn history(&self) -> &[AlarmRecord] {
        &self.history
    }

    fn open_record(&self, code: AlarmCode) -> Option<&AlarmRecord> {
        self.history.iter().find(|r| r.code == code && r.is_open())
    }
}
