use crate::alarms::AlarmCode;
use crate::constants::DISPLAY_REGISTERS;
use crate::interpreter::CodeField;
use crate::nouns::{register_format, RegisterFormat};
use crate::programs::ProgramId;
use crate::telemetry::LinkHealth;
use crate::utils::RegisterDigits;

/// Indicator lamps on the console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annunciators {
    pub comp_acty: bool,
    pub uplink_acty: bool,
    pub no_att: bool,
    pub stby: bool,
    pub key_rel: bool,
    pub opr_err: bool,
    pub prog: bool,
    pub busy: bool,
}

impl Annunciators {
    pub fn all_lit() -> Self {
        Self {
            comp_acty: true,
            uplink_acty: true,
            no_att: true,
            stby: true,
            key_rel: true,
            opr_err: true,
            prog: true,
            busy: true,
        }
    }
}

/// Everything a console needs to draw one frame. Built once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleSnapshot {
    pub tick: u64,
    pub verb: CodeField,
    pub noun: CodeField,
    pub registers: [Option<f64>; DISPLAY_REGISTERS],
    pub formats: [RegisterFormat; DISPLAY_REGISTERS],
    pub program: Option<ProgramId>,
    pub major_mode: u8,
    pub alarm: Option<AlarmCode>,
    pub link: LinkHealth,
    pub flashing: bool,
    pub lamp_test: bool,
    pub annunciators: Annunciators,
}

impl ConsoleSnapshot {
    /// Register formats for whatever noun the fields show
    pub fn formats_for(noun: &CodeField) -> [RegisterFormat; DISPLAY_REGISTERS] {
        let noun = match noun.as_slice() {
            [tens, units] => tens * 10 + units,
            _ => 0,
        };
        [
            register_format(noun, 0),
            register_format(noun, 1),
            register_format(noun, 2),
        ]
    }

    /// Sign and five digits for register `idx`; blank when there is no value
    pub fn register_digits(&self, idx: usize) -> Option<RegisterDigits> {
        let value = (*self.registers.get(idx)?)?;
        Some(self.formats[idx].digits(value))
    }
}

/// A console that renders snapshots: the DSKY bridge, a terminal, a test probe
pub trait ConsoleSink {
    fn refresh(&mut self, snapshot: &ConsoleSnapshot);
}

#[cfg(test)]
mod console_tests {
    use super::*;
    use crate::interpreter::code_field;

    fn snapshot(noun: u8, registers: [Option<f64>; DISPLAY_REGISTERS]) -> ConsoleSnapshot {
        let noun = code_field(noun);
        ConsoleSnapshot {
            tick: 1,
            verb: code_field(16),
            formats: ConsoleSnapshot::formats_for(&noun),
            noun,
            registers,
            program: None,
            major_mode: 0,
            alarm: None,
            link: LinkHealth::Up,
            flashing: false,
            lamp_test: false,
            annunciators: Annunciators::default(),
        }
    }

    #[test]
    fn test_register_digits_use_noun_scale() {
        let s = snapshot(9, [Some(120_000.0), None, Some(-1.5)]);
        let r1 = s.register_digits(0).unwrap();
        assert_eq!(r1.digits, [0, 1, 2, 0, 0]);
        assert!(s.register_digits(1).is_none());
        let r3 = s.register_digits(2).unwrap();
        assert!(r3.negative);
        assert_eq!(r3.digits, [0, 0, 1, 5, 0]);
        assert!(s.register_digits(3).is_none());
    }

    #[test]
    fn test_partial_noun_uses_whole_units() {
        let mut partial = CodeField::new();
        partial.push(4).unwrap();
        let formats = ConsoleSnapshot::formats_for(&partial);
        assert!(formats.iter().all(|f| f.factor == 1.0));
    }
}
