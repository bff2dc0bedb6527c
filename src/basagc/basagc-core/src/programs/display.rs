use super::{Display, ProgramInput, ProgramResult, Routine};
use crate::constants::{nouns, verbs, DISPLAY_REGISTERS};
use crate::interpreter::VerbNounCommand;
use crate::memory::{names, RegisterBank};

/// Shows a telemetry noun. V06 freezes the first complete reading, V16
/// refreshes it every tick.
pub struct NounDisplay {
    noun: u8,
    monitor: bool,
    frozen: Option<[Option<f64>; DISPLAY_REGISTERS]>,
}

impl NounDisplay {
    pub fn new(noun: u8) -> Self {
        Self {
            noun,
            monitor: false,
            frozen: None,
        }
    }

    fn read(&self, bank: &RegisterBank) -> [Option<f64>; DISPLAY_REGISTERS] {
        let sources = match self.noun {
            nouns::ORBITAL_ELEMENTS => [names::APOAPSIS, names::PERIAPSIS, names::INCLINATION],
            nouns::VELOCITY => [names::SURFACE_SPEED, names::VERTICAL_SPEED, names::ALTITUDE],
            _ => return [None; DISPLAY_REGISTERS],
        };
        sources.map(|name| bank.scalar(name))
    }
}

impl Routine for NounDisplay {
    fn accepts(&self, verb: u8, noun: u8) -> bool {
        matches!(verb, verbs::DISPLAY | verbs::MONITOR) && noun == self.noun
    }

    fn start(&mut self, command: &VerbNounCommand) {
        self.monitor = command.verb() == verbs::MONITOR;
        self.frozen = None;
    }

    fn execute(&mut self, _input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult {
        let registers = match self.frozen {
            Some(values) if !self.monitor => values,
            _ => {
                let values = self.read(bank);
                if !self.monitor && values.iter().any(Option::is_some) {
                    self.frozen = Some(values);
                }
                values
            }
        };
        let verb = if self.monitor { verbs::MONITOR } else { verbs::DISPLAY };
        ProgramResult::running().with_display(Display::new(verb, self.noun, registers))
    }
}

#[cfg(test)]
mod display_tests {
    use super::*;
    use crate::memory::{Source, Value};

    fn bank_with(apoapsis: f64, periapsis: f64) -> RegisterBank {
        let mut bank = RegisterBank::new();
        bank.write(names::APOAPSIS, Value::Scalar(apoapsis), Source::Telemetry)
            .unwrap();
        bank.write(names::PERIAPSIS, Value::Scalar(periapsis), Source::Telemetry)
            .unwrap();
        bank
    }

    #[test]
    fn test_display_freezes_first_reading() {
        let mut p = NounDisplay::new(nouns::ORBITAL_ELEMENTS);
        p.start(&VerbNounCommand::new(6, 9, &[]).unwrap());

        let mut bank = bank_with(120_000.0, 100_000.0);
        let first = p.execute(ProgramInput::Tick, &mut bank).display.unwrap();
        assert_eq!(first.registers, [Some(120_000.0), Some(100_000.0), None]);

        let mut bank = bank_with(130_000.0, 110_000.0);
        let second = p.execute(ProgramInput::Tick, &mut bank).display.unwrap();
        assert_eq!(second.registers, first.registers);
        assert_eq!((second.verb, second.noun), (6, 9));
    }

    #[test]
    fn test_monitor_refreshes() {
        let mut p = NounDisplay::new(nouns::ORBITAL_ELEMENTS);
        p.start(&VerbNounCommand::new(16, 9, &[]).unwrap());

        let mut bank = bank_with(120_000.0, 100_000.0);
        p.execute(ProgramInput::Tick, &mut bank);
        let mut bank = bank_with(130_000.0, 110_000.0);
        let shown = p.execute(ProgramInput::Tick, &mut bank).display.unwrap();
        assert_eq!(shown.registers[0], Some(130_000.0));
    }

    #[test]
    fn test_accepts_only_its_noun() {
        let p = NounDisplay::new(nouns::VELOCITY);
        assert!(p.accepts(6, 62));
        assert!(p.accepts(16, 62));
        assert!(!p.accepts(6, 9));
        assert!(!p.accepts(21, 62));
    }
}
