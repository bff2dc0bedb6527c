mod link;
mod watchdog;

pub use link::{Backoff, CommandStats, TelemetryLink};
pub use watchdog::Watchdog;

use crate::error::LinkError;
use crate::memory::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One telemetry reading translated from the wire
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub field: &'static str, // Register the sample refreshes
    pub value: Value,
    pub timestamp: Instant,
    pub valid: bool, // False samples never overwrite the bank
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    Up,
    Down,
}

/// Raw value as delivered by the simulator
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl WireValue {
    /// Finite numeric reading, accepting numbers sent as text
    pub fn number(&self) -> Option<f64> {
        let n = match self {
            WireValue::Number(n) => *n,
            WireValue::Text(s) => s.trim().parse().ok()?,
            WireValue::Bool(_) | WireValue::Null => return None,
        };
        if n.is_finite() {
            Some(n)
        } else {
            None
        }
    }

    pub fn flag(&self) -> Option<bool> {
        match self {
            WireValue::Bool(b) => Some(*b),
            WireValue::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            WireValue::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => self.number().map(|n| n != 0.0),
        }
    }
}

/// Response to a fetch, keyed by wire field key
pub type WireFrame = HashMap<String, WireValue>;

/// How a register is assembled from wire keys
#[derive(Debug, Clone, Copy)]
pub enum FieldSource {
    Scalar(&'static str),
    Vector([&'static str; 3]),
    Ratio(&'static str, &'static str), // numerator / denominator
    Flag(&'static str),
}

impl FieldSource {
    /// Wire keys this source reads (at most three)
    pub fn keys(&self) -> heapless::Vec<&'static str, 3> {
        let mut keys = heapless::Vec::new();
        match *self {
            FieldSource::Scalar(k) | FieldSource::Flag(k) => {
                let _ = keys.push(k);
            }
            FieldSource::Vector(ks) => {
                for k in ks {
                    let _ = keys.push(k);
                }
            }
            FieldSource::Ratio(n, d) => {
                let _ = keys.push(n);
                let _ = keys.push(d);
            }
        }
        keys
    }
}

/// Mapping of one register to its wire source
#[derive(Debug, Clone, Copy)]
pub struct TelemetryField {
    pub register: &'static str,
    pub source: FieldSource,
}

impl TelemetryField {
    pub const fn new(register: &'static str, source: FieldSource) -> Self {
        Self { register, source }
    }

    /// Build a sample from a frame; any missing or unusable component makes it invalid
    pub fn sample(&self, frame: &WireFrame, timestamp: Instant) -> TelemetrySample {
        let get = |key: &str| frame.get(key);
        let value = match self.source {
            FieldSource::Scalar(k) => get(k).and_then(WireValue::number).map(Value::Scalar),
            FieldSource::Flag(k) => get(k).and_then(WireValue::flag).map(Value::Flag),
            FieldSource::Ratio(n, d) => {
                let num = get(n).and_then(WireValue::number);
                let den = get(d).and_then(WireValue::number);
                match (num, den) {
                    (Some(num), Some(den)) if den > 0.0 => Some(Value::Scalar(num / den)),
                    _ => None,
                }
            }
            FieldSource::Vector([x, y, z]) => {
                let x = get(x).and_then(WireValue::number);
                let y = get(y).and_then(WireValue::number);
                let z = get(z).and_then(WireValue::number);
                match (x, y, z) {
                    (Some(x), Some(y), Some(z)) => Some(Value::Vector([x, y, z])),
                    _ => None,
                }
            }
        };

        match value {
            Some(value) => TelemetrySample {
                field: self.register,
                value,
                timestamp,
                valid: true,
            },
            None => TelemetrySample {
                field: self.register,
                value: self.placeholder(),
                timestamp,
                valid: false,
            },
        }
    }

    fn placeholder(&self) -> Value {
        match self.source {
            FieldSource::Vector(_) => Value::Vector([f64::NAN; 3]),
            FieldSource::Flag(_) => Value::Flag(false),
            _ => Value::Scalar(f64::NAN),
        }
    }
}

/// Named command written to the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct LinkCommand {
    pub name: &'static str,
    pub value: Option<Value>,
}

pub mod commands {
    pub const THROTTLE: &str = "throttle";
    pub const STAGE: &str = "stage";
    pub const SAS: &str = "sas";
    pub const ATTITUDE: &str = "attitude";
    pub const AUTOPILOT_OFF: &str = "autopilot_off";
}

impl LinkCommand {
    pub fn new(name: &'static str, value: Option<Value>) -> Self {
        Self { name, value }
    }

    pub fn throttle(level: f64) -> Self {
        Self::new(commands::THROTTLE, Some(Value::Scalar(level.clamp(0.0, 1.0))))
    }

    pub fn stage() -> Self {
        Self::new(commands::STAGE, None)
    }

    pub fn sas(on: bool) -> Self {
        Self::new(commands::SAS, Some(Value::Flag(on)))
    }

    /// Pitch, heading, roll in degrees
    pub fn attitude(target: [f64; 3]) -> Self {
        Self::new(commands::ATTITUDE, Some(Value::Vector(target)))
    }

    pub fn autopilot_off() -> Self {
        Self::new(commands::AUTOPILOT_OFF, None)
    }
}

/// Acknowledgement of a delivered command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub command: &'static str,
}

/// Wire transport to the vehicle simulator
pub trait TelemetryPort {
    /// Request fresh values for the given keys, bounded by `timeout`
    fn fetch(&mut self, keys: &[&'static str], timeout: Duration) -> Result<WireFrame, LinkError>;

    /// Deliver a command and wait for the simulator's acknowledgement
    fn send(&mut self, command: &LinkCommand, timeout: Duration) -> Result<(), LinkError>;

    /// Cheap connectivity check used while reconnecting
    fn probe(&mut self, timeout: Duration) -> Result<(), LinkError>;
}
