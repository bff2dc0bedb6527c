use super::{Display, ProgramInput, ProgramResult, Routine};
use crate::constants::{bodies, nouns, programs, verbs};
use crate::interpreter::VerbNounCommand;
use crate::memory::{names, RegisterBank};
use log::info;

/// P11: monitors the climb to orbit on V16 N62 until periapsis clears the
/// atmosphere
pub struct OrbitInsertion {
    ticks: u64,
}

impl OrbitInsertion {
    pub fn new() -> Self {
        Self { ticks: 0 }
    }
}

impl Default for OrbitInsertion {
    fn default() -> Self {
        Self::new()
    }
}

impl Routine for OrbitInsertion {
    fn accepts(&self, verb: u8, noun: u8) -> bool {
        verb == verbs::CHANGE_PROGRAM && noun == programs::ORBIT_INSERTION
    }

    fn start(&mut self, _command: &VerbNounCommand) {
        self.ticks = 0;
    }

    fn execute(&mut self, _input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult {
        self.ticks += 1;
        let display = Display::new(
            verbs::MONITOR,
            nouns::VELOCITY,
            [
                bank.scalar(names::SURFACE_SPEED),
                bank.scalar(names::VERTICAL_SPEED),
                bank.scalar(names::ALTITUDE),
            ],
        );

        match bank.scalar(names::PERIAPSIS) {
            Some(pe) if pe > bodies::KERBIN_ATMOSPHERE_M => {
                info!("Orbit achieved after {} ticks, periapsis {:.0} m", self.ticks, pe);
                ProgramResult::complete().with_display(display)
            }
            _ => ProgramResult::running().with_display(display),
        }
    }
}

#[cfg(test)]
mod insertion_tests {
    use super::*;
    use crate::memory::{Source, Value};
    use crate::programs::ProgramStatus;

    #[test]
    fn test_completes_above_atmosphere() {
        let mut p = OrbitInsertion::new();
        p.start(&VerbNounCommand::new(37, 11, &[]).unwrap());
        let mut bank = RegisterBank::new();

        bank.write(names::PERIAPSIS, Value::Scalar(-400_000.0), Source::Telemetry)
            .unwrap();
        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.status, ProgramStatus::Running);
        assert_eq!(r.display.map(|d| d.noun), Some(nouns::VELOCITY));

        bank.write(names::PERIAPSIS, Value::Scalar(75_000.0), Source::Telemetry)
            .unwrap();
        assert_eq!(p.execute(ProgramInput::Tick, &mut bank).status, ProgramStatus::Complete);
    }
}
