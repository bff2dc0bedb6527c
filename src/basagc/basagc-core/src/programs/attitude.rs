use super::{store, Display, ProgramInput, ProgramResult, Routine};
use crate::constants::{nouns, programs, verbs};
use crate::interpreter::VerbNounCommand;
use crate::memory::{names, RegisterBank, Value};
use crate::telemetry::LinkCommand;
use crate::utils::wrap_degrees;
use log::info;

/// P20: holds an attitude through the vessel autopilot and monitors the
/// error on V16 N20
pub struct AttitudeHold {
    target: Option<[f64; 3]>,
    commanded: bool,
}

impl AttitudeHold {
    pub fn new() -> Self {
        Self {
            target: None,
            commanded: false,
        }
    }
}

impl Default for AttitudeHold {
    fn default() -> Self {
        Self::new()
    }
}

impl Routine for AttitudeHold {
    fn accepts(&self, verb: u8, noun: u8) -> bool {
        matches!(
            (verb, noun),
            (verbs::CHANGE_PROGRAM, programs::ATTITUDE_HOLD) | (verbs::LOAD, nouns::DESIRED_ATTITUDE)
        )
    }

    fn operands(&self, verb: u8, noun: u8) -> usize {
        if (verb, noun) == (verbs::LOAD, nouns::DESIRED_ATTITUDE) {
            3
        } else {
            0
        }
    }

    fn start(&mut self, _command: &VerbNounCommand) {
        self.target = None;
        self.commanded = false;
    }

    fn execute(&mut self, input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult {
        if let ProgramInput::Command(cmd) = &input {
            if let &[pitch, heading, roll] = cmd.data() {
                info!("P20: new attitude {:.2} {:.2} {:.2}", pitch, heading, roll);
                self.target = Some([pitch, heading, roll]);
                self.commanded = false;
            }
        }

        let attitude = bank.vector(names::ATTITUDE);
        if self.target.is_none() {
            self.target = attitude;
        }
        let target = match self.target {
            Some(t) => t,
            None => {
                let blank = Display::new(verbs::MONITOR, nouns::ATTITUDE_ERROR, [None; 3]);
                return ProgramResult::running().with_display(blank);
            }
        };

        let mut result = ProgramResult::running();
        if !self.commanded {
            store(bank, names::TARGET_ATTITUDE, Value::Vector(target));
            result = result.with_command(LinkCommand::attitude(target));
            self.commanded = true;
        }

        let registers = match attitude {
            Some(now) => {
                let error = [
                    wrap_degrees(now[0] - target[0]),
                    wrap_degrees(now[1] - target[1]),
                    wrap_degrees(now[2] - target[2]),
                ];
                store(bank, names::ATTITUDE_ERROR, Value::Vector(error));
                error.map(Some)
            }
            None => [None; 3],
        };

        result.with_display(Display::new(verbs::MONITOR, nouns::ATTITUDE_ERROR, registers))
    }
}
