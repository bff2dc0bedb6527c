use thiserror::Error;

use crate::memory::Source;

/// Failures of the wire connection to the vehicle simulator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("link down: {0}")]
    Down(String),
    #[error("link timed out")]
    Timeout,
    #[error("command rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors surfaced by the guidance computer core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgcError {
    /// Malformed verb, noun or operand
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// No program or global handler for the verb/noun pair
    #[error("unsupported verb {verb:02} noun {noun:02}")]
    Unsupported { verb: u8, noun: u8 },

    /// The active program refused to be preempted
    #[error("program {active} is busy")]
    ProgramBusy { active: &'static str },

    /// Register written by a source that does not own it
    #[error("register {register} owned by {owner:?}, written by {writer:?}")]
    OwnershipViolation {
        register: &'static str,
        owner: Source,
        writer: Source,
    },

    #[error("register {0} not found")]
    NotFound(String),

    /// Value shape does not match the register kind
    #[error("register {0} written with the wrong kind of value")]
    KindMismatch(&'static str),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl AgcError {
    /// Errors the operator caused; these light OPR ERR rather than alarms
    pub fn is_operator_error(&self) -> bool {
        matches!(
            self,
            AgcError::InvalidCommand(_) | AgcError::Unsupported { .. } | AgcError::ProgramBusy { .. }
        )
    }
}
