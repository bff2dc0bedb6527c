use crate::alarms::{AlarmInputs, AlarmMonitor};
use crate::config::ComputerConfig;
use crate::console::{Annunciators, ConsoleSnapshot};
use crate::constants::programs;
use crate::error::AgcError;
use crate::interpreter::{code_field, CodeField, Dispatch, Key, VerbNounCommand, VerbNounInterpreter};
use crate::memory::{names, RegisterBank};
use crate::programs::{Display, ProgramResult, ProgramStatus, ProgramTable, Resolution};
use crate::scheduler::ProgramScheduler;
use crate::telemetry::{LinkHealth, TelemetryField, TelemetryLink, TelemetryPort};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, info, warn};
use std::time::Instant;

/// Cloneable handle for pushing key presses from console threads
#[derive(Clone)]
pub struct Keypad {
    tx: Sender<Key>,
}

impl Keypad {
    /// Queue a key for the next tick. Keys are dropped while the queue is full.
    pub fn press(&self, key: Key) -> bool {
        match self.tx.try_send(key) {
            Ok(()) => true,
            Err(TrySendError::Full(key)) => {
                warn!("Key queue full, dropped {:?}", key);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl From<Sender<Key>> for Keypad {
    fn from(tx: Sender<Key>) -> Self {
        Keypad { tx }
    }
}

/// The guidance computer: owns the register bank, telemetry link, keystroke
/// interpreter, program scheduler and alarm monitor, and advances them one
/// tick at a time.
///
/// Each tick drains queued keys, polls telemetry, evaluates the alarm rules,
/// steps the active program and returns what the console should show.
pub struct Computer<P: TelemetryPort> {
    config: ComputerConfig,
    link: TelemetryLink<P>,
    bank: RegisterBank,
    interpreter: VerbNounInterpreter,
    scheduler: ProgramScheduler,
    monitor: AlarmMonitor,
    keys_tx: Sender<Key>,
    keys_rx: Receiver<Key>,
    display: Option<Display>, // Last program display, kept after completion
    opr_err: bool,
    busy: bool,
    lamp_test_remaining: u32,
    paused: Option<u8>,
    ticks: u64,
}

impl<P: TelemetryPort> Computer<P> {
    pub fn new(port: P, fields: Vec<TelemetryField>, config: ComputerConfig) -> Self {
        let (keys_tx, keys_rx) = bounded(config.key_queue_depth);
        Self {
            link: TelemetryLink::new(port, fields, &config),
            monitor: AlarmMonitor::new(&config),
            bank: RegisterBank::new(),
            interpreter: VerbNounInterpreter::new(),
            scheduler: ProgramScheduler::new(ProgramTable::new()),
            keys_tx,
            keys_rx,
            display: None,
            opr_err: false,
            busy: false,
            lamp_test_remaining: 0,
            paused: None,
            ticks: 0,
            config,
        }
    }

    pub fn keypad(&self) -> Keypad {
        Keypad {
            tx: self.keys_tx.clone(),
        }
    }

    pub fn config(&self) -> &ComputerConfig {
        &self.config
    }

    pub fn bank(&self) -> &RegisterBank {
        &self.bank
    }

    pub fn scheduler(&self) -> &ProgramScheduler {
        &self.scheduler
    }

    pub fn alarms(&self) -> &AlarmMonitor {
        &self.monitor
    }

    pub fn link(&self) -> &TelemetryLink<P> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut TelemetryLink<P> {
        &mut self.link
    }

    /// Run one control cycle as of `now`
    pub fn tick(&mut self, now: Instant) -> ConsoleSnapshot {
        self.ticks += 1;

        let keys: Vec<Key> = self.keys_rx.try_iter().collect();
        for key in keys {
            self.handle_key(key, now);
        }

        let samples = self.link.poll_at(now);
        let uplink = self.bank.apply_all(&samples) > 0;
        self.watch_pause();

        let stats = self.link.take_command_stats();
        let inputs = AlarmInputs {
            link: self.link.health(),
            consecutive_empty: self.link.consecutive_empty(),
            stale_fields: self.link.stale_fields().len(),
            fuel_fraction: self.bank.scalar(names::FUEL_FRACTION),
            failed_commands: stats.failed,
        };
        if let Some(code) = self.monitor.evaluate(&inputs, now).first() {
            self.scheduler.raise(*code);
        }

        let executed = match self.scheduler.step(&mut self.bank) {
            Some(result) => {
                self.apply_result(result, now);
                true
            }
            None => {
                self.interpreter.sync_request(None);
                false
            }
        };

        let snapshot = self.snapshot(executed, uplink);
        self.lamp_test_remaining = self.lamp_test_remaining.saturating_sub(1);
        snapshot
    }

    fn handle_key(&mut self, key: Key, now: Instant) {
        let scheduler = &self.scheduler;
        let outcome = self
            .interpreter
            .press(key, |verb, noun| scheduler.operands(verb, noun));

        match outcome {
            Ok(None) => {}
            Ok(Some(Dispatch::Command(command))) => self.dispatch(command, now),
            Ok(Some(Dispatch::Proceed)) => self.scheduler.proceed(),
            Ok(Some(Dispatch::Acknowledge)) => {
                self.monitor.acknowledge();
                self.scheduler.acknowledge();
                self.opr_err = false;
                self.busy = false;
            }
            Err(e) => self.operator_error(e),
        }
    }

    fn dispatch(&mut self, command: VerbNounCommand, now: Instant) {
        debug!("V{:02} N{:02} {:?}", command.verb(), command.noun(), command.data());
        match self.scheduler.dispatch(command, now) {
            Ok(Resolution::LampTest) => {
                info!("Lamp test");
                self.lamp_test_remaining = self.config.lamp_test_ticks();
            }
            Ok(Resolution::Start(_))
            | Ok(Resolution::Monitor(_))
            | Ok(Resolution::Terminate)
            | Ok(Resolution::GoIdle) => {
                self.display = None;
                self.busy = false;
            }
            Ok(_) => {}
            Err(e) => {
                if matches!(e, AgcError::ProgramBusy { .. }) {
                    self.busy = true;
                }
                self.operator_error(e);
            }
        }
    }

    fn operator_error(&mut self, e: AgcError) {
        warn!("Operator error: {}", e);
        self.opr_err = true;
    }

    fn apply_result(&mut self, result: ProgramResult, now: Instant) {
        for command in result.commands.iter() {
            if let Err(e) = self.link.send_at(command, now) {
                debug!("{} not delivered: {}", command.name, e);
            }
        }
        if let Some(display) = result.display {
            self.display = Some(display);
        }
        self.interpreter.sync_request(result.request.as_ref());

        if let ProgramStatus::Alarm(code) = result.status {
            self.monitor.raise_event(code, now);
            self.scheduler.raise(code);
        }
    }

    fn watch_pause(&mut self) {
        let paused = self.bank.scalar(names::PAUSED).map(|p| p as u8);
        if paused == self.paused {
            return;
        }
        match paused {
            Some(0) => info!("Simulation running"),
            Some(1) => info!("Simulation paused"),
            Some(2) => warn!("Signal lost: no antenna power"),
            Some(3) => warn!("Signal lost: antenna off"),
            Some(4) => warn!("Signal lost: no antenna"),
            Some(other) => warn!("Unknown pause state {}", other),
            None => {}
        }
        self.paused = paused;
    }

    fn snapshot(&self, executed: bool, uplink: bool) -> ConsoleSnapshot {
        let entering = self.interpreter.has_input();
        let (verb, noun, registers, flashing) = if entering {
            let mut registers = [None; 3];
            let operands = self.interpreter.operands();
            for (slot, value) in registers.iter_mut().zip(operands) {
                *slot = Some(*value);
            }
            if let Some(slot) = registers.get_mut(operands.len()) {
                *slot = self.interpreter.operand_in_progress();
            }
            let field = |digits: &[u8]| CodeField::from_slice(digits).unwrap_or_default();
            (
                field(self.interpreter.verb()),
                field(self.interpreter.noun()),
                registers,
                self.interpreter.is_requested(),
            )
        } else if let Some(display) = self.display {
            (
                code_field(display.verb),
                code_field(display.noun),
                display.registers,
                display.flashing,
            )
        } else {
            (CodeField::new(), CodeField::new(), [None; 3], false)
        };

        let program = self.scheduler.major_mode();
        let alarm = self.monitor.current().map(|r| r.code);
        let lamp_test = self.lamp_test_remaining > 0;
        let annunciators = if lamp_test {
            Annunciators::all_lit()
        } else {
            Annunciators {
                comp_acty: executed,
                uplink_acty: uplink,
                no_att: self.bank.vector(names::ATTITUDE).is_none()
                    || self.link.health() == LinkHealth::Down,
                stby: self.paused.map_or(false, |p| p != 0),
                key_rel: entering && self.display.is_some() && !self.interpreter.is_requested(),
                opr_err: self.opr_err,
                prog: alarm.is_some(),
                busy: self.busy,
            }
        };

        ConsoleSnapshot {
            tick: self.ticks,
            formats: ConsoleSnapshot::formats_for(&noun),
            verb,
            noun,
            registers,
            program,
            major_mode: program.map_or(programs::IDLE, |p| p.major_mode()),
            alarm,
            link: self.link.health(),
            flashing,
            lamp_test,
            annunciators,
        }
    }
}
