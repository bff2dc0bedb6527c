mod registers;

pub use registers::{lookup, names, RegisterKind, RegisterSpec, REGISTERS};

use crate::error::AgcError;
use crate::telemetry::TelemetrySample;
use log::{debug, error};
use std::collections::HashMap;

/// Which side of the computer is allowed to write a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Telemetry,
    Program,
}

/// Typed contents of a register slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vector([f64; 3]),
    Flag(bool),
}

impl Value {
    pub fn kind(&self) -> RegisterKind {
        match self {
            Value::Scalar(_) => RegisterKind::Scalar,
            Value::Vector(_) => RegisterKind::Vector,
            Value::Flag(_) => RegisterKind::Flag,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<[f64; 3]> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Flag(v) => Some(*v),
            _ => None,
        }
    }
}

struct Slot {
    spec: &'static RegisterSpec,
    value: Option<Value>,
}

/// Process-wide store of the computer's typed state.
///
/// Every slot has a single owner. Telemetry refreshes its registers through
/// [`RegisterBank::apply`], programs write computed registers with
/// [`Source::Program`]. Values are replaced whole, so a reader never sees half
/// of a vector.
pub struct RegisterBank {
    slots: HashMap<&'static str, Slot>,
}

impl RegisterBank {
    pub fn new() -> Self {
        let slots = REGISTERS
            .iter()
            .map(|spec| (spec.name, Slot { spec, value: None }))
            .collect();
        Self { slots }
    }

    /// Read the current value; unknown and never-written registers are NotFound
    pub fn read(&self, name: &str) -> Result<Value, AgcError> {
        self.slots
            .get(name)
            .and_then(|slot| slot.value)
            .ok_or_else(|| AgcError::NotFound(name.into()))
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.read(name).ok().and_then(|v| v.as_scalar())
    }

    pub fn vector(&self, name: &str) -> Option<[f64; 3]> {
        self.read(name).ok().and_then(|v| v.as_vector())
    }

    /// Replace a register's value, checking owner and kind
    pub fn write(&mut self, name: &str, value: Value, source: Source) -> Result<(), AgcError> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| AgcError::NotFound(name.into()))?;

        if slot.spec.owner != source {
            return Err(AgcError::OwnershipViolation {
                register: slot.spec.name,
                owner: slot.spec.owner,
                writer: source,
            });
        }
        if slot.spec.kind != value.kind() {
            return Err(AgcError::KindMismatch(slot.spec.name));
        }

        slot.value = Some(value);
        Ok(())
    }

    /// Drop a computed value, e.g. when burn data is consumed
    pub fn invalidate(&mut self, name: &str, source: Source) -> Result<(), AgcError> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| AgcError::NotFound(name.into()))?;
        if slot.spec.owner != source {
            return Err(AgcError::OwnershipViolation {
                register: slot.spec.name,
                owner: slot.spec.owner,
                writer: source,
            });
        }
        slot.value = None;
        Ok(())
    }

    /// Apply one telemetry sample. Invalid samples are quarantined: the
    /// previous value is kept and `Ok(false)` is returned.
    pub fn apply(&mut self, sample: &TelemetrySample) -> Result<bool, AgcError> {
        if !sample.valid {
            debug!("Quarantined invalid sample for {}", sample.field);
            return Ok(false);
        }
        self.write(sample.field, sample.value, Source::Telemetry)?;
        Ok(true)
    }

    /// Apply a batch of samples, returning how many changed the bank
    pub fn apply_all(&mut self, samples: &[TelemetrySample]) -> usize {
        let mut applied = 0;
        for sample in samples {
            match self.apply(sample) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e @ AgcError::OwnershipViolation { .. }) => {
                    debug_assert!(false, "{}", e);
                    error!("Dropped telemetry sample: {}", e);
                }
                Err(e) => error!("Dropped telemetry sample: {}", e),
            }
        }
        applied
    }

    /// Point-in-time copy of every populated register
    pub fn snapshot(&self) -> HashMap<&'static str, Value> {
        self.slots
            .iter()
            .filter_map(|(name, slot)| slot.value.map(|v| (*name, v)))
            .collect()
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod bank_tests {
    use super::*;
    use std::time::Instant;

    fn sample(field: &'static str, value: Value, valid: bool) -> TelemetrySample {
        TelemetrySample {
            field,
            value,
            timestamp: Instant::now(),
            valid,
        }
    }

    #[test]
    fn test_read_unwritten_is_not_found() {
        let bank = RegisterBank::new();
        assert_eq!(
            bank.read(names::ALTITUDE),
            Err(AgcError::NotFound(names::ALTITUDE.into()))
        );
        assert!(bank.read("no_such_register").is_err());
    }

    #[test]
    fn test_invalid_sample_keeps_prior_value() {
        let mut bank = RegisterBank::new();
        bank.apply(&sample(names::APOAPSIS, Value::Scalar(120_000.0), true))
            .unwrap();

        for bogus in [0.0, -1.0, 1e9] {
            let changed = bank
                .apply(&sample(names::APOAPSIS, Value::Scalar(bogus), false))
                .unwrap();
            assert!(!changed);
            assert_eq!(bank.scalar(names::APOAPSIS), Some(120_000.0));
        }
    }

    #[test]
    fn test_invalid_sample_on_empty_register() {
        let mut bank = RegisterBank::new();
        bank.apply(&sample(names::PERIAPSIS, Value::Scalar(0.0), false))
            .unwrap();
        assert!(bank.read(names::PERIAPSIS).is_err());
    }

    #[test]
    fn test_ownership_enforced() {
        let mut bank = RegisterBank::new();
        let err = bank
            .write(names::ALTITUDE, Value::Scalar(1.0), Source::Program)
            .unwrap_err();
        assert!(matches!(err, AgcError::OwnershipViolation { .. }));

        let err = bank
            .write(names::BURN_DELTA_V, Value::Scalar(1.0), Source::Telemetry)
            .unwrap_err();
        assert!(matches!(err, AgcError::OwnershipViolation { .. }));

        bank.write(names::BURN_DELTA_V, Value::Scalar(860.0), Source::Program)
            .unwrap();
        assert_eq!(bank.scalar(names::BURN_DELTA_V), Some(860.0));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut bank = RegisterBank::new();
        let err = bank
            .write(names::ATTITUDE, Value::Scalar(1.0), Source::Telemetry)
            .unwrap_err();
        assert_eq!(err, AgcError::KindMismatch(names::ATTITUDE));
    }

    #[test]
    fn test_vector_replaced_whole() {
        let mut bank = RegisterBank::new();
        bank.write(names::ATTITUDE, Value::Vector([1.0, 2.0, 3.0]), Source::Telemetry)
            .unwrap();
        bank.write(names::ATTITUDE, Value::Vector([4.0, 5.0, 6.0]), Source::Telemetry)
            .unwrap();
        assert_eq!(bank.vector(names::ATTITUDE), Some([4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_apply_all_counts_valid() {
        let mut bank = RegisterBank::new();
        let samples = [
            sample(names::APOAPSIS, Value::Scalar(1.0), true),
            sample(names::PERIAPSIS, Value::Scalar(2.0), false),
            sample(names::ALTITUDE, Value::Scalar(3.0), true),
        ];
        assert_eq!(bank.apply_all(&samples), 2);
        assert_eq!(bank.snapshot().len(), 2);
    }

    #[test]
    fn test_invalidate() {
        let mut bank = RegisterBank::new();
        bank.write(names::TIME_OF_IGNITION, Value::Scalar(10.0), Source::Program)
            .unwrap();
        bank.invalidate(names::TIME_OF_IGNITION, Source::Program)
            .unwrap();
        assert!(bank.read(names::TIME_OF_IGNITION).is_err());
        assert!(bank.invalidate(names::ALTITUDE, Source::Program).is_err());
    }
}
