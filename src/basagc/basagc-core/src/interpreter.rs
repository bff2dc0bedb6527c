use crate::constants::{nouns, verbs, MAX_OPERANDS, REGISTER_DIGITS};
use crate::error::AgcError;
use crate::nouns::register_format;
use crate::programs::DataRequest;
use log::debug;

/// Console keys in the order the operator presses them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Verb,
    Noun,
    Plus,
    Minus,
    Enter,
    Clear,
    Proceed,
    KeyRelease,
    Reset,
}

/// Two-digit code field as typed so far
pub type CodeField = heapless::Vec<u8, 2>;

/// A complete operator command. Built once per key sequence and consumed
/// by dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct VerbNounCommand {
    verb: u8,
    noun: u8,
    data: heapless::Vec<f64, MAX_OPERANDS>,
}

impl VerbNounCommand {
    pub fn new(verb: u8, noun: u8, data: &[f64]) -> Result<Self, AgcError> {
        if verb > 99 {
            return Err(AgcError::InvalidCommand(format!("verb {} out of range", verb)));
        }
        if noun > 99 {
            return Err(AgcError::InvalidCommand(format!("noun {} out of range", noun)));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(AgcError::InvalidCommand("operand is not a number".into()));
        }
        let data = heapless::Vec::from_slice(data).map_err(|_| {
            AgcError::InvalidCommand(format!("{} operands, at most {}", data.len(), MAX_OPERANDS))
        })?;
        Ok(Self { verb, noun, data })
    }

    pub fn verb(&self) -> u8 {
        self.verb
    }

    pub fn noun(&self) -> u8 {
        self.noun
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// What a keystroke asks the rest of the computer to do
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Command(VerbNounCommand),
    Proceed,
    Acknowledge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Idle,
    VerbEntry,
    NounEntry,
    DataEntry,
    PendingConfirm,
}

#[derive(Debug, Default)]
struct Operand {
    signed: bool,
    negative: bool,
    digits: heapless::Vec<u8, REGISTER_DIGITS>,
}

impl Operand {
    fn raw(&self) -> Option<i64> {
        if self.digits.is_empty() {
            return None;
        }
        let magnitude = self.digits.iter().fold(0i64, |acc, d| acc * 10 + *d as i64);
        Some(if self.negative { -magnitude } else { magnitude })
    }
}

// Verbs that take no noun and assemble on the verb's ENTER
fn is_nounless(verb: u8) -> bool {
    matches!(verb, verbs::PROCEED | verbs::TERMINATE | verbs::LAMP_TEST)
}

fn code(field: &CodeField) -> Option<u8> {
    match field.as_slice() {
        [tens, units] => Some(tens * 10 + units),
        _ => None,
    }
}

/// Both digits of a two-digit code
pub fn code_field(value: u8) -> CodeField {
    let mut field = CodeField::new();
    let _ = field.push(value / 10 % 10);
    let _ = field.push(value % 10);
    field
}

/// Keystroke state machine turning key presses into verb/noun commands.
///
/// A command is only ever assembled from two complete code fields. Operand
/// data, when the resolved route needs it, is collected in data entry and
/// the finished command then waits in pending-confirm for ENTER or PRO.
pub struct VerbNounInterpreter {
    state: EntryState,
    verb: CodeField,
    noun: CodeField,
    pair: Option<(u8, u8)>, // Verb and noun being loaded in data entry
    operands: heapless::Vec<f64, MAX_OPERANDS>,
    operand: Operand,
    expected: usize,
    pending: Option<VerbNounCommand>,
    request: Option<DataRequest>,
}

impl VerbNounInterpreter {
    pub fn new() -> Self {
        Self {
            state: EntryState::Idle,
            verb: CodeField::new(),
            noun: CodeField::new(),
            pair: None,
            operands: heapless::Vec::new(),
            operand: Operand::default(),
            expected: 0,
            pending: None,
            request: None,
        }
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn verb(&self) -> &[u8] {
        &self.verb
    }

    pub fn noun(&self) -> &[u8] {
        &self.noun
    }

    pub fn operands(&self) -> &[f64] {
        &self.operands
    }

    pub fn is_requested(&self) -> bool {
        self.request.is_some()
    }

    /// Whether the operator has typed something the console should echo
    pub fn has_input(&self) -> bool {
        match self.state {
            EntryState::Idle => false,
            _ if self.request.is_none() => true,
            _ => !self.untouched(),
        }
    }

    /// Value of the operand being typed, in the noun's engineering units
    pub fn operand_in_progress(&self) -> Option<f64> {
        let (_, noun) = self.pair?;
        let raw = self.operand.raw()?;
        Some(raw as f64 / register_format(noun, self.operands.len()).factor)
    }

    /// Feed one key. `operands` reports how many data words the route for a
    /// verb/noun pair needs.
    pub fn press<F>(&mut self, key: Key, operands: F) -> Result<Option<Dispatch>, AgcError>
    where
        F: Fn(u8, u8) -> usize,
    {
        match key {
            Key::Reset => return Ok(Some(Dispatch::Acknowledge)),
            Key::Clear => {
                self.clear();
                return Ok(None);
            }
            Key::KeyRelease => {
                if self.request.is_none() {
                    self.clear();
                }
                return Ok(None);
            }
            Key::Digit(d) if d > 9 => return self.reject(format!("key {} is not a digit", d)),
            _ => {}
        }

        match self.state {
            EntryState::Idle => Ok(self.press_idle(key)),
            EntryState::VerbEntry | EntryState::NounEntry => self.press_code(key, operands),
            EntryState::DataEntry => self.press_data(key),
            EntryState::PendingConfirm => match key {
                Key::Enter | Key::Proceed => Ok(self.confirm()),
                _ => Ok(None),
            },
        }
    }

    /// Arm data entry on behalf of a running program. Ignored while the
    /// operator is busy with their own entry.
    pub fn request_data(&mut self, request: DataRequest) -> bool {
        if self.state != EntryState::Idle {
            return false;
        }
        self.verb = code_field(request.verb);
        self.noun = code_field(request.noun);
        self.pair = Some((request.verb, request.noun));
        self.expected = request.operands.min(MAX_OPERANDS);
        self.request = Some(request);
        self.state = EntryState::DataEntry;
        debug!("Program requests V{:02} N{:02}", request.verb, request.noun);
        true
    }

    /// Keep the armed request in line with what the program currently wants
    pub fn sync_request(&mut self, request: Option<&DataRequest>) {
        match request {
            Some(r) if self.state == EntryState::Idle => {
                self.request_data(*r);
            }
            None if self.request.is_some() => self.clear(),
            _ => {}
        }
    }

    pub fn clear(&mut self) {
        self.state = EntryState::Idle;
        self.verb.clear();
        self.noun.clear();
        self.pair = None;
        self.operands.clear();
        self.operand = Operand::default();
        self.expected = 0;
        self.pending = None;
        self.request = None;
    }

    fn press_idle(&mut self, key: Key) -> Option<Dispatch> {
        match key {
            Key::Digit(d) => {
                self.state = EntryState::VerbEntry;
                let _ = self.verb.push(d);
            }
            Key::Verb => self.state = EntryState::VerbEntry,
            Key::Noun => self.state = EntryState::NounEntry,
            Key::Proceed => return Some(Dispatch::Proceed),
            _ => {}
        }
        None
    }

    fn press_code<F>(&mut self, key: Key, operands: F) -> Result<Option<Dispatch>, AgcError>
    where
        F: Fn(u8, u8) -> usize,
    {
        match key {
            Key::Digit(d) => {
                let field = if self.state == EntryState::VerbEntry {
                    &mut self.verb
                } else {
                    &mut self.noun
                };
                // Third and later digits are dropped
                let _ = field.push(d);
            }
            Key::Verb => {
                self.verb.clear();
                self.state = EntryState::VerbEntry;
            }
            Key::Noun => {
                self.noun.clear();
                self.state = EntryState::NounEntry;
            }
            Key::Enter => return self.commit_code(operands),
            _ => {}
        }
        Ok(None)
    }

    fn commit_code<F>(&mut self, operands: F) -> Result<Option<Dispatch>, AgcError>
    where
        F: Fn(u8, u8) -> usize,
    {
        let verb = match code(&self.verb) {
            Some(v) => v,
            None => return self.reject("verb needs two digits".into()),
        };

        if is_nounless(verb) {
            return self.assemble(verb, nouns::NONE, operands);
        }

        match code(&self.noun) {
            Some(noun) => self.assemble(verb, noun, operands),
            None if self.state == EntryState::VerbEntry => {
                self.noun.clear();
                self.state = EntryState::NounEntry;
                Ok(None)
            }
            None => self.reject("noun needs two digits".into()),
        }
    }

    fn assemble<F>(&mut self, verb: u8, noun: u8, operands: F) -> Result<Option<Dispatch>, AgcError>
    where
        F: Fn(u8, u8) -> usize,
    {
        self.noun = code_field(noun);
        self.expected = operands(verb, noun).min(MAX_OPERANDS);

        if self.expected > 0 {
            debug!("V{:02} N{:02} needs {} operands", verb, noun, self.expected);
            self.pair = Some((verb, noun));
            self.operands.clear();
            self.operand = Operand::default();
            self.state = EntryState::DataEntry;
            return Ok(None);
        }

        match VerbNounCommand::new(verb, noun, &[]) {
            Ok(command) => {
                self.pending = Some(command);
                self.state = EntryState::PendingConfirm;
                Ok(self.confirm())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    fn press_data(&mut self, key: Key) -> Result<Option<Dispatch>, AgcError> {
        match key {
            Key::Plus | Key::Minus => {
                if !self.operand.signed && self.operand.digits.is_empty() {
                    self.operand.signed = true;
                    self.operand.negative = key == Key::Minus;
                }
            }
            // A requested load takes signed data; a bare digit starts a new verb
            Key::Digit(d) if self.request.is_some() && self.untouched() => {
                self.clear();
                self.state = EntryState::VerbEntry;
                let _ = self.verb.push(d);
            }
            Key::Digit(d) => {
                let _ = self.operand.digits.push(d);
            }
            Key::Enter => return self.commit_operand(),
            // PRO over an untouched request hands the program its default,
            // or tells it the crew declined
            Key::Proceed if self.request.is_some() && self.untouched() => {
                self.clear();
                return Ok(Some(Dispatch::Proceed));
            }
            Key::Verb => {
                self.discard_data();
                self.verb.clear();
                self.state = EntryState::VerbEntry;
            }
            Key::Noun => {
                self.discard_data();
                self.noun.clear();
                self.state = EntryState::NounEntry;
            }
            _ => {}
        }
        Ok(None)
    }

    fn commit_operand(&mut self) -> Result<Option<Dispatch>, AgcError> {
        let (verb, noun) = match self.pair {
            Some(pair) => pair,
            None => return self.reject("no command awaiting data".into()),
        };
        let raw = match self.operand.raw() {
            Some(raw) => raw,
            None => return self.reject("operand needs at least one digit".into()),
        };

        let value = raw as f64 / register_format(noun, self.operands.len()).factor;
        let _ = self.operands.push(value);
        self.operand = Operand::default();

        if self.operands.len() < self.expected {
            return Ok(None);
        }

        match VerbNounCommand::new(verb, noun, &self.operands) {
            Ok(command) => {
                self.pending = Some(command);
                self.state = EntryState::PendingConfirm;
                Ok(None)
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    fn untouched(&self) -> bool {
        self.operands.is_empty() && !self.operand.signed && self.operand.digits.is_empty()
    }

    fn discard_data(&mut self) {
        self.pair = None;
        self.operands.clear();
        self.operand = Operand::default();
        self.expected = 0;
        self.request = None;
    }

    fn confirm(&mut self) -> Option<Dispatch> {
        let command = self.pending.take();
        self.clear();
        command.map(Dispatch::Command)
    }

    fn reject(&mut self, reason: String) -> Result<Option<Dispatch>, AgcError> {
        self.clear();
        Err(AgcError::InvalidCommand(reason))
    }
}

impl Default for VerbNounInterpreter {
    fn default() -> Self {
        Self::new()
    }
}
