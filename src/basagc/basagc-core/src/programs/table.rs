use super::{Program, ProgramId};
use crate::constants::{nouns, programs, verbs};
use crate::error::AgcError;
use crate::interpreter::VerbNounCommand;
use std::collections::HashMap;

/// Where a verb/noun pair leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Start(ProgramId),
    Monitor(ProgramId), // Display request, shown alongside a running program
    Forward(ProgramId), // Data or control for the running program
    Proceed,
    Terminate,
    LampTest,
    GoIdle,
}

/// Static registry of programs and the global verb/noun routes.
///
/// Global routes are looked up before anything the running program
/// accepts, so display requests and the control verbs are always
/// available.
pub struct ProgramTable {
    global: HashMap<(u8, u8), Resolution>,
    programs: HashMap<ProgramId, Program>,
}

impl ProgramTable {
    pub fn new() -> Self {
        let mut global = HashMap::new();
        for verb in [verbs::DISPLAY, verbs::MONITOR] {
            global.insert((verb, nouns::ORBITAL_ELEMENTS), Resolution::Monitor(ProgramId::OrbitalDisplay));
            global.insert((verb, nouns::VELOCITY), Resolution::Monitor(ProgramId::VelocityDisplay));
        }
        global.insert((verbs::PROCEED, nouns::NONE), Resolution::Proceed);
        global.insert((verbs::TERMINATE, nouns::NONE), Resolution::Terminate);
        global.insert((verbs::LAMP_TEST, nouns::NONE), Resolution::LampTest);
        global.insert((verbs::CHANGE_PROGRAM, programs::IDLE), Resolution::GoIdle);
        for id in [
            ProgramId::OrbitInsertion,
            ProgramId::TransferPlanner,
            ProgramId::AttitudeHold,
            ProgramId::BurnTimer,
        ] {
            global.insert((verbs::CHANGE_PROGRAM, id.major_mode()), Resolution::Start(id));
        }

        let programs = ProgramId::ALL
            .iter()
            .map(|id| (*id, Program::new(*id)))
            .collect();

        Self { global, programs }
    }

    /// Resolve a pair against the global routes, then the running program
    pub fn lookup(&self, verb: u8, noun: u8, active: Option<ProgramId>) -> Result<Resolution, AgcError> {
        let accepted = |id: ProgramId| self.program(id).map_or(false, |p| p.accepts(verb, noun));

        if let Some(resolution) = self.global.get(&(verb, noun)) {
            return match *resolution {
                Resolution::Start(id) | Resolution::Monitor(id) if !accepted(id) => {
                    Err(AgcError::Unsupported { verb, noun })
                }
                resolution => Ok(resolution),
            };
        }
        match active {
            Some(id) if accepted(id) => Ok(Resolution::Forward(id)),
            _ => Err(AgcError::Unsupported { verb, noun }),
        }
    }

    /// Resolve a complete command and check its operand count against the
    /// program it reaches
    pub fn resolve(&self, command: &VerbNounCommand, active: Option<ProgramId>) -> Result<Resolution, AgcError> {
        let (verb, noun) = (command.verb(), command.noun());
        let resolution = self.lookup(verb, noun, active)?;
        let target = match resolution {
            Resolution::Start(id) | Resolution::Monitor(id) | Resolution::Forward(id) => id,
            _ => return Ok(resolution),
        };

        let expected = self.program(target).map_or(0, |p| p.operands(verb, noun));
        if command.data().len() != expected {
            return Err(AgcError::InvalidCommand(format!(
                "V{:02} N{:02} takes {} operands, got {}",
                verb,
                noun,
                expected,
                command.data().len()
            )));
        }
        Ok(resolution)
    }

    /// Data words the resolved route needs
    pub fn operands(&self, verb: u8, noun: u8, active: Option<ProgramId>) -> usize {
        match self.lookup(verb, noun, active) {
            Ok(Resolution::Forward(id)) => self.program(id).map_or(0, |p| p.operands(verb, noun)),
            _ => 0,
        }
    }

    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(&id)
    }

    pub fn program_mut(&mut self, id: ProgramId) -> Option<&mut Program> {
        self.programs.get_mut(&id)
    }
}

impl Default for ProgramTable {
    fn default() -> Self {
        Self::new()
    }
}
