//! In-memory collaborators for unit and scenario tests

use crate::error::LinkError;
use crate::memory::names;
use crate::telemetry::{FieldSource, LinkCommand, TelemetryField, TelemetryPort, WireFrame, WireValue};
use std::collections::HashMap;
use std::time::Duration;

/// Simulator stand-in: serves `values` while `up` is set
#[derive(Default)]
pub struct FakePort {
    pub up: bool,
    pub values: HashMap<String, WireValue>,
    pub sent: Vec<LinkCommand>,
    pub probes: u32,
    pub reject_commands: bool,
}

impl FakePort {
    pub fn connected() -> Self {
        Self {
            up: true,
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.into(), WireValue::Number(value));
    }
}

impl TelemetryPort for FakePort {
    fn fetch(&mut self, keys: &[&'static str], _timeout: Duration) -> Result<WireFrame, LinkError> {
        if !self.up {
            return Err(LinkError::Down("connection refused".into()));
        }
        Ok(keys
            .iter()
            .filter_map(|k| self.values.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn send(&mut self, command: &LinkCommand, _timeout: Duration) -> Result<(), LinkError> {
        if !self.up {
            return Err(LinkError::Down("connection refused".into()));
        }
        if self.reject_commands {
            return Err(LinkError::Rejected(command.name.into()));
        }
        self.sent.push(command.clone());
        Ok(())
    }

    fn probe(&mut self, _timeout: Duration) -> Result<(), LinkError> {
        self.probes += 1;
        if self.up {
            Ok(())
        } else {
            Err(LinkError::Down("connection refused".into()))
        }
    }
}

/// Apoapsis and periapsis only, keyed "apa"/"pea"
pub fn orbit_fields() -> Vec<TelemetryField> {
    vec![
        TelemetryField::new(names::APOAPSIS, FieldSource::Scalar("apa")),
        TelemetryField::new(names::PERIAPSIS, FieldSource::Scalar("pea")),
    ]
}

/// Every register, keyed by its own name
pub fn full_fields() -> Vec<TelemetryField> {
    use names::*;
    let mut fields: Vec<TelemetryField> = [
        ALTITUDE,
        VERTICAL_SPEED,
        SURFACE_SPEED,
        ORBITAL_VELOCITY,
        APOAPSIS,
        PERIAPSIS,
        ECCENTRICITY,
        INCLINATION,
        ORBITAL_PERIOD,
        TIME_TO_APOAPSIS,
        FUEL_FRACTION,
        MISSION_TIME,
        UNIVERSAL_TIME,
        PAUSED,
        MUN_PHASE_ANGLE,
        MINMUS_PHASE_ANGLE,
    ]
    .iter()
    .map(|&name| TelemetryField::new(name, FieldSource::Scalar(name)))
    .collect();
    fields.push(TelemetryField::new(
        ATTITUDE,
        FieldSource::Vector(["pitch", "heading", "roll"]),
    ));
    fields
}
