mod attitude;
mod burn;
mod display;
mod insertion;
pub mod maneuvers;
mod table;
mod transfer;

pub use attitude::AttitudeHold;
pub use burn::BurnTimer;
pub use display::NounDisplay;
pub use insertion::OrbitInsertion;
pub use table::{ProgramTable, Resolution};
pub use transfer::TransferPlanner;

use crate::alarms::AlarmCode;
use crate::constants::{programs, DISPLAY_REGISTERS, MAX_PROGRAM_COMMANDS};
use crate::interpreter::VerbNounCommand;
use crate::memory::{RegisterBank, Source, Value};
use crate::telemetry::LinkCommand;
use log::{error, warn};

/// Identity of every program the computer can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramId {
    OrbitalDisplay,
    VelocityDisplay,
    OrbitInsertion,
    TransferPlanner,
    AttitudeHold,
    BurnTimer,
}

impl ProgramId {
    pub const ALL: [ProgramId; 6] = [
        ProgramId::OrbitalDisplay,
        ProgramId::VelocityDisplay,
        ProgramId::OrbitInsertion,
        ProgramId::TransferPlanner,
        ProgramId::AttitudeHold,
        ProgramId::BurnTimer,
    ];

    /// Number shown in the PROG field; display programs run in P00
    pub fn major_mode(&self) -> u8 {
        match self {
            ProgramId::OrbitalDisplay | ProgramId::VelocityDisplay => programs::IDLE,
            ProgramId::OrbitInsertion => programs::ORBIT_INSERTION,
            ProgramId::TransferPlanner => programs::TRANSFER_PLANNER,
            ProgramId::AttitudeHold => programs::ATTITUDE_HOLD,
            ProgramId::BurnTimer => programs::BURN_TIMER,
        }
    }

    pub fn is_display(&self) -> bool {
        matches!(self, ProgramId::OrbitalDisplay | ProgramId::VelocityDisplay)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProgramId::OrbitalDisplay => "orbital elements display",
            ProgramId::VelocityDisplay => "velocity display",
            ProgramId::OrbitInsertion => "P11 orbit insertion monitor",
            ProgramId::TransferPlanner => "P15 transfer planner",
            ProgramId::AttitudeHold => "P20 attitude hold",
            ProgramId::BurnTimer => "P40 maneuver burn timer",
        }
    }
}

/// What a program is stepped with
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramInput {
    Tick,
    Command(VerbNounCommand),
    Proceed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    Running,
    Complete,
    Alarm(AlarmCode),
}

/// Verb, noun and register contents a program wants on the console
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Display {
    pub verb: u8,
    pub noun: u8,
    pub registers: [Option<f64>; DISPLAY_REGISTERS],
    pub flashing: bool,
}

impl Display {
    pub fn new(verb: u8, noun: u8, registers: [Option<f64>; DISPLAY_REGISTERS]) -> Self {
        Self {
            verb,
            noun,
            registers,
            flashing: false,
        }
    }

    pub fn flashing(mut self) -> Self {
        self.flashing = true;
        self
    }
}

/// A program asking the operator to load data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRequest {
    pub verb: u8,
    pub noun: u8,
    pub operands: usize,
    pub default: Option<f64>, // Taken when the operator presses PRO
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramResult {
    pub status: ProgramStatus,
    pub display: Option<Display>,
    pub request: Option<DataRequest>,
    pub commands: heapless::Vec<LinkCommand, MAX_PROGRAM_COMMANDS>,
}

impl ProgramResult {
    fn with_status(status: ProgramStatus) -> Self {
        Self {
            status,
            display: None,
            request: None,
            commands: heapless::Vec::new(),
        }
    }

    pub fn running() -> Self {
        Self::with_status(ProgramStatus::Running)
    }

    pub fn complete() -> Self {
        Self::with_status(ProgramStatus::Complete)
    }

    pub fn alarm(code: AlarmCode) -> Self {
        Self::with_status(ProgramStatus::Alarm(code))
    }

    /// Same result, marked complete
    pub fn completed(mut self) -> Self {
        self.status = ProgramStatus::Complete;
        self
    }

    pub fn with_display(mut self, display: Display) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_request(mut self, request: DataRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_command(mut self, command: LinkCommand) -> Self {
        if let Err(command) = self.commands.push(command) {
            warn!("Dropped link command {}, step already holds {}", command.name, MAX_PROGRAM_COMMANDS);
        }
        self
    }
}

/// Capabilities every program provides to the table and scheduler
pub trait Routine {
    /// Verb/noun pairs the program handles, including its start route
    fn accepts(&self, verb: u8, noun: u8) -> bool;

    /// Operand count for a verb/noun pair routed to this program
    fn operands(&self, _verb: u8, _noun: u8) -> usize {
        0
    }

    /// Whether another program may replace this one right now
    fn preemptible(&self) -> bool {
        true
    }

    /// Reset progress for a fresh run
    fn start(&mut self, command: &VerbNounCommand);

    fn execute(&mut self, input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult;
}

/// Closed set of programs owned by the table for the process lifetime
pub enum Program {
    OrbitalDisplay(NounDisplay),
    VelocityDisplay(NounDisplay),
    OrbitInsertion(OrbitInsertion),
    TransferPlanner(TransferPlanner),
    AttitudeHold(AttitudeHold),
    BurnTimer(BurnTimer),
}

impl Program {
    pub fn new(id: ProgramId) -> Self {
        match id {
            ProgramId::OrbitalDisplay => {
                Program::OrbitalDisplay(NounDisplay::new(crate::constants::nouns::ORBITAL_ELEMENTS))
            }
            ProgramId::VelocityDisplay => {
                Program::VelocityDisplay(NounDisplay::new(crate::constants::nouns::VELOCITY))
            }
            ProgramId::OrbitInsertion => Program::OrbitInsertion(OrbitInsertion::new()),
            ProgramId::TransferPlanner => Program::TransferPlanner(TransferPlanner::new()),
            ProgramId::AttitudeHold => Program::AttitudeHold(AttitudeHold::new()),
            ProgramId::BurnTimer => Program::BurnTimer(BurnTimer::new()),
        }
    }

    pub fn id(&self) -> ProgramId {
        match self {
            Program::OrbitalDisplay(_) => ProgramId::OrbitalDisplay,
            Program::VelocityDisplay(_) => ProgramId::VelocityDisplay,
            Program::OrbitInsertion(_) => ProgramId::OrbitInsertion,
            Program::TransferPlanner(_) => ProgramId::TransferPlanner,
            Program::AttitudeHold(_) => ProgramId::AttitudeHold,
            Program::BurnTimer(_) => ProgramId::BurnTimer,
        }
    }

    fn routine(&self) -> &dyn Routine {
        match self {
            Program::OrbitalDisplay(p) | Program::VelocityDisplay(p) => p,
            Program::OrbitInsertion(p) => p,
            Program::TransferPlanner(p) => p,
            Program::AttitudeHold(p) => p,
            Program::BurnTimer(p) => p,
        }
    }

    fn routine_mut(&mut self) -> &mut dyn Routine {
        match self {
            Program::OrbitalDisplay(p) | Program::VelocityDisplay(p) => p,
            Program::OrbitInsertion(p) => p,
            Program::TransferPlanner(p) => p,
            Program::AttitudeHold(p) => p,
            Program::BurnTimer(p) => p,
        }
    }

    pub fn accepts(&self, verb: u8, noun: u8) -> bool {
        self.routine().accepts(verb, noun)
    }

    pub fn operands(&self, verb: u8, noun: u8) -> usize {
        self.routine().operands(verb, noun)
    }

    pub fn preemptible(&self) -> bool {
        self.routine().preemptible()
    }

    pub fn start(&mut self, command: &VerbNounCommand) {
        self.routine_mut().start(command)
    }

    pub fn execute(&mut self, input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult {
        self.routine_mut().execute(input, bank)
    }
}

// Program-owned register write. A failure here is a catalogue defect.
pub(crate) fn store(bank: &mut RegisterBank, name: &'static str, value: Value) {
    if let Err(e) = bank.write(name, value, Source::Program) {
        debug_assert!(false, "{}", e);
        error!("Program write dropped: {}", e);
    }
}

pub(crate) fn forget(bank: &mut RegisterBank, name: &'static str) {
    if let Err(e) = bank.invalidate(name, Source::Program) {
        error!("Program invalidate dropped: {}", e);
    }
}

#[cfg(test)]
mod program_tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_program() {
        for id in ProgramId::ALL {
            assert_eq!(Program::new(id).id(), id);
        }
    }

    #[test]
    fn test_result_command_capacity() {
        let mut result = ProgramResult::running();
        for _ in 0..MAX_PROGRAM_COMMANDS + 2 {
            result = result.with_command(LinkCommand::stage());
        }
        assert_eq!(result.commands.len(), MAX_PROGRAM_COMMANDS);
    }
}
