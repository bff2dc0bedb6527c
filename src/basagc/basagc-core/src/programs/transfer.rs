use super::maneuvers::{hohmann, orbital_period, time_to_ignition};
use super::{store, DataRequest, Display, ProgramInput, ProgramResult, Routine};
use crate::alarms::AlarmCode;
use crate::constants::{bodies, nouns, programs, verbs};
use crate::interpreter::VerbNounCommand;
use crate::memory::{names, RegisterBank, Value};
use crate::utils::seconds_to_time;
use log::{info, warn};

const MAX_ECCENTRICITY: f64 = 0.001;
const INCLINATION_TOLERANCE_DEG: f64 = 0.5;
const MIN_LEAD_TIME_S: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    CheckOrbit,
    AwaitTarget,
    Planned,
}

struct Target {
    id: u8,
    sma: f64,
    inclination: f64,
    phase_register: &'static str,
}

fn target(id: f64) -> Option<Target> {
    if id == bodies::MUN as f64 {
        Some(Target {
            id: bodies::MUN,
            sma: bodies::MUN_SMA_M,
            inclination: bodies::MUN_INCLINATION_DEG,
            phase_register: names::MUN_PHASE_ANGLE,
        })
    } else if id == bodies::MINMUS as f64 {
        Some(Target {
            id: bodies::MINMUS,
            sma: bodies::MINMUS_SMA_M,
            inclination: bodies::MINMUS_INCLINATION_DEG,
            phase_register: names::MINMUS_PHASE_ANGLE,
        })
    } else {
        None
    }
}

/// P15: plans a Hohmann transfer from a circular parking orbit to the Mun
/// or Minmus and leaves the burn data for P40.
pub struct TransferPlanner {
    phase: Phase,
}

impl TransferPlanner {
    pub fn new() -> Self {
        Self {
            phase: Phase::CheckOrbit,
        }
    }

    fn target_request() -> DataRequest {
        DataRequest {
            verb: verbs::LOAD,
            noun: nouns::TARGET_BODY,
            operands: 1,
            default: Some(bodies::MUN as f64),
        }
    }

    fn await_target(&mut self, input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult {
        match input {
            ProgramInput::Command(cmd) if (cmd.verb(), cmd.noun()) == (verbs::LOAD, nouns::TARGET_BODY) => {
                let id = cmd.data().first().copied().unwrap_or(f64::NAN);
                self.plan(id, bank)
            }
            ProgramInput::Proceed => self.plan(bodies::MUN as f64, bank),
            _ => {
                let display = Display::new(
                    verbs::LOAD,
                    nouns::TARGET_BODY,
                    [Some(bodies::MUN as f64), None, None],
                );
                ProgramResult::running()
                    .with_display(display.flashing())
                    .with_request(Self::target_request())
            }
        }
    }

    fn plan(&mut self, id: f64, bank: &mut RegisterBank) -> ProgramResult {
        let target = match target(id) {
            Some(t) => t,
            None => {
                warn!("P15: {} is not a valid target", id);
                return ProgramResult::alarm(AlarmCode::InvalidTarget);
            }
        };

        let inclination = bank.scalar(names::INCLINATION);
        let altitude = bank.scalar(names::ALTITUDE);
        let current_phase = bank.scalar(target.phase_register);
        let mission_time = bank.scalar(names::MISSION_TIME);
        let (inclination, altitude, current_phase, mission_time) =
            match (inclination, altitude, current_phase, mission_time) {
                (Some(i), Some(a), Some(p), Some(t)) => (i, a, p, t),
                _ => return ProgramResult::alarm(AlarmCode::NoPhaseAngle),
            };

        if (inclination - target.inclination).abs() > INCLINATION_TOLERANCE_DEG {
            return ProgramResult::alarm(AlarmCode::InclinationMismatch);
        }

        let r1 = bodies::KERBIN_RADIUS_M + altitude;
        let plan = hohmann(r1, target.sma, bodies::KERBIN_MU);
        let vessel_period = bank
            .scalar(names::ORBITAL_PERIOD)
            .filter(|p| *p > 0.0)
            .unwrap_or_else(|| orbital_period(r1, bodies::KERBIN_MU));
        let target_period = orbital_period(target.sma, bodies::KERBIN_MU);

        let lead = match time_to_ignition(current_phase, plan.phase_angle, vessel_period, target_period) {
            Some(t) => t,
            None => return ProgramResult::alarm(AlarmCode::NoPhaseAngle),
        };
        if lead < MIN_LEAD_TIME_S {
            return ProgramResult::alarm(AlarmCode::IgnitionTooSoon);
        }

        let tig = mission_time + lead;
        store(bank, names::TARGET_BODY, Value::Scalar(target.id as f64));
        store(bank, names::BURN_DELTA_V, Value::Scalar(plan.delta_v));
        store(bank, names::TIME_OF_IGNITION, Value::Scalar(tig));
        store(bank, names::TRANSFER_TIME, Value::Scalar(plan.transfer_time));
        store(bank, names::PHASE_ANGLE_REQUIRED, Value::Scalar(plan.phase_angle));

        let (days, hours, minutes, seconds) = seconds_to_time(tig);
        info!(
            "P15: phase angle {:.2}, dv {:.1} m/s, ignition in {:.0} s",
            plan.phase_angle, plan.delta_v, lead
        );
        self.phase = Phase::Planned;

        let display = Display::new(
            verbs::DISPLAY,
            nouns::TIME_OF_IGNITION,
            [
                Some((days * 24 + hours) as f64),
                Some(minutes as f64),
                Some(seconds),
            ],
        );
        ProgramResult::complete().with_display(display)
    }
}

impl Default for TransferPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Routine for TransferPlanner {
    fn accepts(&self, verb: u8, noun: u8) -> bool {
        matches!(
            (verb, noun),
            (verbs::CHANGE_PROGRAM, programs::TRANSFER_PLANNER) | (verbs::LOAD, nouns::TARGET_BODY)
        )
    }

    fn operands(&self, verb: u8, noun: u8) -> usize {
        if (verb, noun) == (verbs::LOAD, nouns::TARGET_BODY) {
            1
        } else {
            0
        }
    }

    fn start(&mut self, _command: &VerbNounCommand) {
        self.phase = Phase::CheckOrbit;
    }

    fn execute(&mut self, input: ProgramInput, bank: &mut RegisterBank) -> ProgramResult {
        match self.phase {
            Phase::CheckOrbit => match bank.scalar(names::ECCENTRICITY) {
                None => ProgramResult::running(),
                Some(e) if e > MAX_ECCENTRICITY => ProgramResult::alarm(AlarmCode::OrbitNotCircular),
                Some(_) => {
                    self.phase = Phase::AwaitTarget;
                    self.await_target(input, bank)
                }
            },
            Phase::AwaitTarget => self.await_target(input, bank),
            Phase::Planned => ProgramResult::complete(),
        }
    }
}
