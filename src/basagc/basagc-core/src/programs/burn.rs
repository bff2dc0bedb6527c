use super::{forget, store, DataRequest, Display, ProgramInput, ProgramResult, Routine};
use crate::alarms::AlarmCode;
use crate::constants::{nouns, programs, verbs, DISPLAY_REGISTERS};
use crate::interpreter::VerbNounCommand;
use crate::memory::{names, RegisterBank, Value};
use crate::telemetry::LinkCommand;
use log::{info, warn};

// Seconds before ignition at which the crew is asked to authorise the burn
const AUTHORISATION_LEAD_S: f64 = 30.0;
// Mission seconds a V21 N40 load request stays up before alarm 115
const LOAD_TIMEOUT_S: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BurnPhase {
    Countdown,
    AwaitAuthorisation,
    Armed,
    Burning { reference: f64 }, // Orbital velocity at ignition
}

/// P40: counts down to ignition, asks for authorisation on V99 N40, then
/// burns until the planned delta-v is gained
pub struct BurnTimer {
    phase: BurnPhase,
    tig: Option<f64>, // Mission time of ignition
    delta_v: Option<f64>,
    requested_at: Option<f64>,
}

impl BurnTimer {
    pub fn new() -> Self {
        Self {
            phase: BurnPhase::Countdown,
            tig: None,
            delta_v: None,
            requested_at: None,
        }
    }

    fn load_request() -> DataRequest {
        DataRequest {
            verb: verbs::LOAD,
            noun: nouns::BURN_STATUS,
            operands: 2,
            default: None,
        }
    }

    // No planned burn: flash V21 N40 until the crew loads one. PRO without
    // data, or no load within the timeout, raises alarm 115.
    fn request_load(&mut self, input: &ProgramInput, bank: &RegisterBank) -> ProgramResult {
        if *input == ProgramInput::Proceed {
            warn!("P40: burn data load declined");
            self.requested_at = None;
            return ProgramResult::alarm(AlarmCode::NoBurnData);
        }
        if let Some(now) = bank.scalar(names::MISSION_TIME) {
            let since = *self.requested_at.get_or_insert(now);
            if now - since > LOAD_TIMEOUT_S {
                warn!("P40: no burn data loaded in {:.0} s", LOAD_TIMEOUT_S);
                self.requested_at = None;
                return ProgramResult::alarm(AlarmCode::NoBurnData);
            }
        }

        let display = Display::new(verbs::LOAD, nouns::BURN_STATUS, [None; DISPLAY_REGISTERS]);
        ProgramResult::running()
            .with_display(display.flashing())
            .with_request(Self::load_request())
    }

    fn load(&mut self, cmd: &VerbNounCommand, bank: &mut RegisterBank) -> bool {
        let (lead, delta_v) = match *cmd.data() {
            [lead, delta_v] => (lead, delta_v),
            _ => return false,
        };
        let now = match bank.scalar(names::MISSION_TIME) {
            Some(t) => t,
            None => return false,
        };
        info!("P40: loaded dv {:.1} m/s, ignition in {:.0} s", delta_v, lead);
        self.tig = Some(now + lead);
        self.delta_v = Some(delta_v);
        self.phase = BurnPhase::Countdown;
        store(bank, names::TIME_OF_IGNITION, Value::Scalar(now + lead));
        store(bank, names::BURN_DELTA_V, Value::Scalar(delta_v));
        true
    }

    fn cutoff(&mut self, bank: &mut RegisterBank) {
        info!("P40: engine cutoff");
        forget(bank, names::TIME_OF_IGNITION);
        forget(bank, names::BURN_DELTA_V);
        self.tig = None;
        self.delta_v = None;
        self.phase = BurnPhase::Countdown;
    }
}

impl Default for BurnTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Routine for BurnTimer {
    fn accepts(&self, verb: u8, noun: u8) -> bool {
        matches!(
            (verb, noun),
            (verbs::CHANGE_PROGRAM, programs::BURN_TIMER) | (verbs::LOAD, nouns::BURN_STATUS)
        )
    }

    fn operands(&self, verb: u8, noun: u8) -> usize {
        if (verb, noun) == (verbs::LOAD, nouns::BURN_STATUS) {
            2
        } else {
            0
        }
    }

    // Once the crew is asked to authorise, the burn owns the computer
    fn preemptible(&self) -> bool {
        self.phase == BurnPhase::Countdown
    }

    fn start(&mut self, _command: &VerbNounCommand) {
        self.phase = BurnPhase::Countdown;
        self.tig = None;
        self.delta_v = None;
        self.requested_at = None;
    }

    fn execute(&mut self, input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult {
        if let ProgramInput::Command(cmd) = &input {
            if !self.load(cmd, bank) {
                return ProgramResult::alarm(AlarmCode::NoBurnData);
            }
        }

        let tig = self.tig.or_else(|| bank.scalar(names::TIME_OF_IGNITION));
        let delta_v = self.delta_v.or_else(|| bank.scalar(names::BURN_DELTA_V));
        let (tig, delta_v) = match (tig, delta_v) {
            (Some(t), Some(dv)) => (t, dv),
            _ => return self.request_load(&input, bank),
        };
        self.requested_at = None;
        self.tig = Some(tig);
        self.delta_v = Some(delta_v);

        let now = match bank.scalar(names::MISSION_TIME) {
            Some(t) => t,
            None => return ProgramResult::running(),
        };
        let to_ignition = tig - now;
        store(bank, names::TIME_TO_IGNITION, Value::Scalar(to_ignition));

        let mut result = ProgramResult::running();
        let mut gained = 0.0;

        if self.phase == BurnPhase::Countdown && to_ignition <= AUTHORISATION_LEAD_S {
            info!("P40: awaiting burn authorisation");
            self.phase = BurnPhase::AwaitAuthorisation;
        }
        if self.phase == BurnPhase::AwaitAuthorisation && input == ProgramInput::Proceed {
            info!("P40: burn authorised");
            self.phase = BurnPhase::Armed;
        }
        if self.phase == BurnPhase::Armed && to_ignition <= 0.0 {
            if let Some(reference) = bank.scalar(names::ORBITAL_VELOCITY) {
                info!("P40: ignition");
                self.phase = BurnPhase::Burning { reference };
                result = result.with_command(LinkCommand::throttle(1.0));
            }
        }
        if let BurnPhase::Burning { reference } = self.phase {
            gained = bank
                .scalar(names::ORBITAL_VELOCITY)
                .map_or(0.0, |v| (v - reference).abs());
        }

        let remaining = (delta_v - gained).max(0.0);
        store(bank, names::BURN_DELTA_V_REMAINING, Value::Scalar(remaining));
        let registers = [Some(to_ignition.max(0.0)), Some(remaining), Some(gained)];

        if matches!(self.phase, BurnPhase::Burning { .. }) && remaining <= 0.0 {
            self.cutoff(bank);
            let display = Display::new(verbs::DISPLAY, nouns::BURN_STATUS, registers);
            return result
                .with_command(LinkCommand::throttle(0.0))
                .with_display(display)
                .completed();
        }

        let display = if self.phase == BurnPhase::AwaitAuthorisation {
            Display::new(verbs::PLEASE_PERFORM, nouns::BURN_STATUS, registers).flashing()
        } else {
            Display::new(verbs::MONITOR, nouns::BURN_STATUS, registers)
        };
        result.with_display(display)
    }
}

#[cfg(test)]
mod burn_tests {
    use super::*;
    use crate::memory::Source;
    use crate::programs::ProgramStatus;
    use crate::telemetry::commands;

    fn set(bank: &mut RegisterBank, name: &'static str, value: f64) {
        bank.write(name, Value::Scalar(value), Source::Telemetry).unwrap();
    }

    fn started() -> BurnTimer {
        let mut p = BurnTimer::new();
        p.start(&VerbNounCommand::new(37, 40, &[]).unwrap());
        p
    }

    #[test]
    fn test_missing_burn_data_requests_load() {
        let mut p = started();
        let mut bank = RegisterBank::new();
        set(&mut bank, names::MISSION_TIME, 0.0);

        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.status, ProgramStatus::Running);
        assert_eq!(r.request, Some(BurnTimer::load_request()));
        let shown = r.display.unwrap();
        assert_eq!((shown.verb, shown.noun), (verbs::LOAD, nouns::BURN_STATUS));
        assert!(shown.flashing);

        // Loaded on a later step, the countdown starts
        set(&mut bank, names::MISSION_TIME, 5.0);
        let load = VerbNounCommand::new(21, 40, &[60.0, 500.0]).unwrap();
        let r = p.execute(ProgramInput::Command(load), &mut bank);
        assert!(r.request.is_none());
        assert_eq!(r.display.unwrap().verb, verbs::MONITOR);
        assert_eq!(bank.scalar(names::TIME_OF_IGNITION), Some(65.0));
    }

    #[test]
    fn test_declined_load_alarms() {
        let mut p = started();
        let mut bank = RegisterBank::new();
        set(&mut bank, names::MISSION_TIME, 0.0);
        p.execute(ProgramInput::Tick, &mut bank);
        let r = p.execute(ProgramInput::Proceed, &mut bank);
        assert_eq!(r.status, ProgramStatus::Alarm(AlarmCode::NoBurnData));
    }

    #[test]
    fn test_load_request_times_out() {
        let mut p = started();
        let mut bank = RegisterBank::new();
        set(&mut bank, names::MISSION_TIME, 10.0);
        p.execute(ProgramInput::Tick, &mut bank);

        set(&mut bank, names::MISSION_TIME, 10.0 + LOAD_TIMEOUT_S);
        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.status, ProgramStatus::Running);

        set(&mut bank, names::MISSION_TIME, 11.0 + LOAD_TIMEOUT_S);
        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.status, ProgramStatus::Alarm(AlarmCode::NoBurnData));
    }

    #[test]
    fn test_full_burn_sequence() {
        let mut p = started();
        let mut bank = RegisterBank::new();
        set(&mut bank, names::MISSION_TIME, 100.0);
        set(&mut bank, names::ORBITAL_VELOCITY, 2_246.0);

        let load = VerbNounCommand::new(21, 40, &[60.0, 800.0]).unwrap();
        let r = p.execute(ProgramInput::Command(load), &mut bank);
        assert_eq!(r.display.unwrap().verb, verbs::MONITOR);
        assert!(p.preemptible());

        // T-30: authorisation requested
        set(&mut bank, names::MISSION_TIME, 130.0);
        let r = p.execute(ProgramInput::Tick, &mut bank);
        let shown = r.display.unwrap();
        assert_eq!(shown.verb, verbs::PLEASE_PERFORM);
        assert!(shown.flashing);
        assert!(!p.preemptible());

        p.execute(ProgramInput::Proceed, &mut bank);

        set(&mut bank, names::MISSION_TIME, 160.0);
        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.commands[0], LinkCommand::throttle(1.0));

        set(&mut bank, names::ORBITAL_VELOCITY, 2_646.0);
        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.status, ProgramStatus::Running);
        assert_eq!(bank.scalar(names::BURN_DELTA_V_REMAINING), Some(400.0));

        set(&mut bank, names::ORBITAL_VELOCITY, 3_050.0);
        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.status, ProgramStatus::Complete);
        assert_eq!(r.commands[0].name, commands::THROTTLE);
        assert_eq!(r.commands[0].value, Some(Value::Scalar(0.0)));
        assert!(bank.read(names::BURN_DELTA_V).is_err());
    }

    #[test]
    fn test_uses_planned_burn_registers() {
        let mut p = started();
        let mut bank = RegisterBank::new();
        set(&mut bank, names::MISSION_TIME, 0.0);
        bank.write(names::TIME_OF_IGNITION, Value::Scalar(500.0), Source::Program)
            .unwrap();
        bank.write(names::BURN_DELTA_V, Value::Scalar(842.0), Source::Program)
            .unwrap();

        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert_eq!(r.display.unwrap().registers[0], Some(500.0));
        assert_eq!(bank.scalar(names::TIME_TO_IGNITION), Some(500.0));
    }

    #[test]
    fn test_no_ignition_without_authorisation() {
        let mut p = started();
        let mut bank = RegisterBank::new();
        set(&mut bank, names::MISSION_TIME, 0.0);
        set(&mut bank, names::ORBITAL_VELOCITY, 2_000.0);
        p.execute(
            ProgramInput::Command(VerbNounCommand::new(21, 40, &[10.0, 100.0]).unwrap()),
            &mut bank,
        );
        set(&mut bank, names::MISSION_TIME, 20.0);
        let r = p.execute(ProgramInput::Tick, &mut bank);
        assert!(r.commands.is_empty());
        assert_eq!(r.display.unwrap().verb, verbs::PLEASE_PERFORM);
    }
}
