use crate::alarms::{AlarmCode, Severity};
use crate::error::AgcError;
use crate::interpreter::VerbNounCommand;
use crate::memory::RegisterBank;
use crate::programs::{ProgramId, ProgramInput, ProgramResult, ProgramStatus, ProgramTable, Resolution};
use log::{debug, info, warn};
use std::time::Instant;

/// A program and when it became the major mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub program: ProgramId,
    pub entered_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running(Activation),
    Alarm {
        suspended: Option<Activation>,
        code: AlarmCode,
    },
}

/// Decides which program is the major mode.
///
/// The programs themselves live in the [`ProgramTable`] owned here, so a
/// program suspended by an alarm keeps its progress and resumes where it
/// stopped.
pub struct ProgramScheduler {
    state: SchedulerState,
    table: ProgramTable,
    pending: Option<ProgramInput>, // Delivered on the next step
    monitor: Option<ProgramId>,    // Display requested over the major mode
}

impl ProgramScheduler {
    pub fn new(table: ProgramTable) -> Self {
        Self {
            state: SchedulerState::Idle,
            table,
            pending: None,
            monitor: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// The running program, if any
    pub fn active(&self) -> Option<ProgramId> {
        match self.state {
            SchedulerState::Running(a) => Some(a.program),
            _ => None,
        }
    }

    /// The running or suspended program
    pub fn major_mode(&self) -> Option<ProgramId> {
        match self.state {
            SchedulerState::Running(a) => Some(a.program),
            SchedulerState::Alarm { suspended, .. } => suspended.map(|a| a.program),
            SchedulerState::Idle => None,
        }
    }

    /// Display request running alongside the major mode
    pub fn monitor(&self) -> Option<ProgramId> {
        self.monitor
    }

    pub fn table(&self) -> &ProgramTable {
        &self.table
    }

    /// Operand count the interpreter should collect for a pair
    pub fn operands(&self, verb: u8, noun: u8) -> usize {
        self.table.operands(verb, noun, self.active())
    }

    fn busy(&self) -> Option<AgcError> {
        match self.state {
            SchedulerState::Running(a) => {
                let preemptible = self
                    .table
                    .program(a.program)
                    .map_or(true, |p| p.preemptible());
                if preemptible {
                    None
                } else {
                    Some(AgcError::ProgramBusy {
                        active: a.program.name(),
                    })
                }
            }
            SchedulerState::Alarm { .. } => Some(AgcError::ProgramBusy { active: "alarm" }),
            SchedulerState::Idle => None,
        }
    }

    /// Route an operator command. Rejections leave the state untouched.
    pub fn dispatch(&mut self, command: VerbNounCommand, now: Instant) -> Result<Resolution, AgcError> {
        let resolution = self.table.resolve(&command, self.active())?;

        match resolution {
            Resolution::Start(id) => {
                if let Some(e) = self.busy() {
                    if self.active() == Some(id) {
                        info!("{} already active", id.name());
                        return Ok(resolution);
                    }
                    return Err(e);
                }
                self.start(id, &command, now);
            }
            Resolution::Monitor(id) => match self.state {
                SchedulerState::Running(a) if !a.program.is_display() => self.show_alongside(id, &command),
                SchedulerState::Alarm { .. } => self.show_alongside(id, &command),
                _ => self.start(id, &command, now),
            },
            Resolution::Forward(_) => self.pending = Some(ProgramInput::Command(command)),
            Resolution::Proceed => self.proceed(),
            Resolution::Terminate => self.terminate(),
            Resolution::GoIdle => {
                if let Some(e) = self.busy() {
                    return Err(e);
                }
                self.terminate();
            }
            Resolution::LampTest => {}
        }
        Ok(resolution)
    }

    fn start(&mut self, id: ProgramId, command: &VerbNounCommand, now: Instant) {
        if let Some(program) = self.table.program_mut(id) {
            program.start(command);
        }
        self.pending = None;
        self.monitor = None;
        info!("Major mode: {}", id.name());
        self.state = SchedulerState::Running(Activation {
            program: id,
            entered_at: now,
        });
    }

    // The major mode keeps running; only the console shows the display
    fn show_alongside(&mut self, id: ProgramId, command: &VerbNounCommand) {
        if let Some(program) = self.table.program_mut(id) {
            program.start(command);
        }
        debug!("{} shown alongside {:?}", id.name(), self.major_mode());
        self.monitor = Some(id);
    }

    /// Operator PRO for the running program
    pub fn proceed(&mut self) {
        if self.active().is_some() {
            self.pending = Some(ProgramInput::Proceed);
        }
    }

    /// Stop whatever runs now. From alarm the suspended program is dropped
    /// but the alarm stays until acknowledged.
    pub fn terminate(&mut self) {
        self.pending = None;
        self.monitor = None;
        match self.state {
            SchedulerState::Running(a) => {
                info!("Terminated {}", a.program.name());
                self.state = SchedulerState::Idle;
            }
            SchedulerState::Alarm {
                suspended: Some(a),
                code,
            } => {
                info!("Terminated suspended {}", a.program.name());
                self.state = SchedulerState::Alarm {
                    suspended: None,
                    code,
                };
            }
            _ => {}
        }
    }

    /// Enter or escalate the alarm state. The running program is suspended
    /// with its progress intact.
    pub fn raise(&mut self, code: AlarmCode) {
        match self.state {
            SchedulerState::Idle => {
                self.state = SchedulerState::Alarm {
                    suspended: None,
                    code,
                }
            }
            SchedulerState::Running(a) => {
                warn!("Alarm {} suspends {}", code.displayed(), a.program.name());
                self.pending = None;
                self.state = SchedulerState::Alarm {
                    suspended: Some(a),
                    code,
                };
            }
            SchedulerState::Alarm {
                suspended,
                code: current,
            } => {
                if code.severity() > current.severity() {
                    warn!("Alarm {} escalates {}", code.displayed(), current.displayed());
                    self.state = SchedulerState::Alarm { suspended, code };
                }
            }
        }
    }

    /// Operator acknowledgement. Resumes the suspended program unless the
    /// alarm was an abort.
    pub fn acknowledge(&mut self) {
        if let SchedulerState::Alarm { suspended, code } = self.state {
            self.state = match suspended {
                Some(a) if code.severity() < Severity::Abort => {
                    info!("Resuming {}", a.program.name());
                    SchedulerState::Running(a)
                }
                Some(a) => {
                    info!("Abort {} discards {}", code.displayed(), a.program.name());
                    SchedulerState::Idle
                }
                None => SchedulerState::Idle,
            };
        }
    }

    /// Execute the running program once with the pending input or a tick,
    /// then any display shown alongside it
    pub fn step(&mut self, bank: &mut RegisterBank) -> Option<ProgramResult> {
        let result = match self.state {
            SchedulerState::Running(activation) => {
                let input = self.pending.take().unwrap_or(ProgramInput::Tick);
                let result = self.table.program_mut(activation.program)?.execute(input, bank);

                if result.status == ProgramStatus::Complete {
                    info!("{} complete", activation.program.name());
                    self.state = SchedulerState::Idle;
                } else {
                    debug!("{} running", activation.program.name());
                }
                Some(result)
            }
            _ => None,
        };

        match self.monitor {
            Some(id) => self.step_monitor(id, result, bank),
            None => result,
        }
    }

    // A program that flashes or asks for data takes the console back
    fn step_monitor(
        &mut self,
        id: ProgramId,
        result: Option<ProgramResult>,
        bank: &mut RegisterBank,
    ) -> Option<ProgramResult> {
        let claimed = result.as_ref().map_or(false, |r| {
            r.request.is_some() || r.display.map_or(false, |d| d.flashing)
        });
        if claimed {
            debug!("{} yields the console", id.name());
            self.monitor = None;
            return result;
        }

        let display = match self.table.program_mut(id) {
            Some(program) => program.execute(ProgramInput::Tick, bank).display,
            None => return result,
        };
        Some(match result {
            Some(r) => ProgramResult {
                display: display.or(r.display),
                ..r
            },
            None => {
                let mut shown = ProgramResult::running();
                shown.display = display;
                shown
            }
        })
    }
}

#[cfg(test)]
mod scheduler_tests {
    use super::*;
    use crate::memory::{names, Source, Value};

    fn scheduler() -> ProgramScheduler {
        ProgramScheduler::new(ProgramTable::new())
    }

    fn cmd(verb: u8, noun: u8) -> VerbNounCommand {
        VerbNounCommand::new(verb, noun, &[]).unwrap()
    }

    #[test]
    fn test_idle_to_running_to_idle() {
        let mut s = scheduler();
        let now = Instant::now();
        s.dispatch(cmd(37, 20), now).unwrap();
        assert_eq!(s.active(), Some(ProgramId::AttitudeHold));

        s.dispatch(cmd(34, 0), now).unwrap();
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_terminate_from_any_program() {
        let now = Instant::now();
        for (v, n) in [(6, 9), (16, 62), (37, 11), (37, 15), (37, 20), (37, 40)] {
            let mut s = scheduler();
            s.dispatch(cmd(v, n), now).unwrap();
            assert!(s.active().is_some());
            s.dispatch(cmd(34, 0), now).unwrap();
            assert_eq!(s.state(), SchedulerState::Idle);
        }
    }

    #[test]
    fn test_preemption() {
        let mut s = scheduler();
        let now = Instant::now();
        s.dispatch(cmd(37, 20), now).unwrap();
        s.dispatch(cmd(37, 11), now).unwrap();
        assert_eq!(s.active(), Some(ProgramId::OrbitInsertion));

        // From idle a display becomes the major mode, another display replaces it
        let mut s = scheduler();
        s.dispatch(cmd(6, 9), now).unwrap();
        s.dispatch(cmd(16, 62), now).unwrap();
        assert_eq!(s.active(), Some(ProgramId::VelocityDisplay));
        assert!(s.monitor().is_none());
    }

    #[test]
    fn test_display_runs_alongside_program() {
        let mut s = scheduler();
        let mut bank = RegisterBank::new();
        bank.write(names::ALTITUDE, Value::Scalar(90_000.0), Source::Telemetry)
            .unwrap();
        let now = Instant::now();
        s.dispatch(cmd(37, 20), now).unwrap();

        assert_eq!(
            s.dispatch(cmd(16, 62), now),
            Ok(Resolution::Monitor(ProgramId::VelocityDisplay))
        );
        assert_eq!(s.active(), Some(ProgramId::AttitudeHold));
        assert_eq!(s.monitor(), Some(ProgramId::VelocityDisplay));

        let result = s.step(&mut bank).unwrap();
        let display = result.display.unwrap();
        assert_eq!((display.verb, display.noun), (16, 62));
        assert_eq!(display.registers[2], Some(90_000.0));
        assert_eq!(s.active(), Some(ProgramId::AttitudeHold));

        s.dispatch(cmd(34, 0), now).unwrap();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(s.monitor().is_none());
        assert!(s.step(&mut bank).is_none());
    }

    #[test]
    fn test_display_allowed_during_busy_burn() {
        let mut s = scheduler();
        let mut bank = RegisterBank::new();
        bank.write(names::MISSION_TIME, Value::Scalar(0.0), Source::Telemetry)
            .unwrap();
        let now = Instant::now();

        s.dispatch(cmd(37, 40), now).unwrap();
        s.dispatch(VerbNounCommand::new(21, 40, &[100.0, 100.0]).unwrap(), now)
            .unwrap();
        s.step(&mut bank);
        bank.write(names::MISSION_TIME, Value::Scalar(80.0), Source::Telemetry)
            .unwrap();
        s.step(&mut bank);
        s.proceed();
        s.step(&mut bank);
        assert!(s.dispatch(cmd(37, 20), now).is_err());

        s.dispatch(cmd(6, 9), now).unwrap();
        assert_eq!(s.active(), Some(ProgramId::BurnTimer));
        let display = s.step(&mut bank).unwrap().display.unwrap();
        assert_eq!((display.verb, display.noun), (6, 9));
    }

    #[test]
    fn test_flashing_program_takes_console_back() {
        let mut s = scheduler();
        let mut bank = RegisterBank::new();
        bank.write(names::MISSION_TIME, Value::Scalar(0.0), Source::Telemetry)
            .unwrap();
        let now = Instant::now();
        s.dispatch(cmd(37, 40), now).unwrap();
        s.dispatch(cmd(6, 9), now).unwrap();

        // No burn data: P40 flashes its load request over the display
        let result = s.step(&mut bank).unwrap();
        assert!(result.request.is_some());
        assert_eq!(result.display.unwrap().noun, 40);
        assert!(s.monitor().is_none());
    }

    #[test]
    fn test_reselecting_busy_program_is_not_an_error() {
        let mut s = scheduler();
        let mut bank = RegisterBank::new();
        bank.write(names::MISSION_TIME, Value::Scalar(0.0), Source::Telemetry)
            .unwrap();
        let now = Instant::now();
        s.dispatch(cmd(37, 40), now).unwrap();
        s.dispatch(VerbNounCommand::new(21, 40, &[10.0, 100.0]).unwrap(), now)
            .unwrap();
        s.step(&mut bank);
        let before = s.state();

        assert_eq!(
            s.dispatch(cmd(37, 40), now),
            Ok(Resolution::Start(ProgramId::BurnTimer))
        );
        assert_eq!(s.state(), before);
        // Progress kept: the burn still asks for authorisation
        let display = s.step(&mut bank).unwrap().display.unwrap();
        assert_eq!(display.verb, 99);
    }

    #[test]
    fn test_busy_burn_rejects_and_keeps_state() {
        let mut s = scheduler();
        let mut bank = RegisterBank::new();
        bank.write(names::MISSION_TIME, Value::Scalar(0.0), Source::Telemetry)
            .unwrap();
        let now = Instant::now();

        s.dispatch(cmd(37, 40), now).unwrap();
        s.dispatch(VerbNounCommand::new(21, 40, &[10.0, 100.0]).unwrap(), now)
            .unwrap();
        s.step(&mut bank);
        let before = s.state();

        let err = s.dispatch(cmd(37, 20), now).unwrap_err();
        assert!(matches!(err, AgcError::ProgramBusy { .. }));
        assert_eq!(s.state(), before);
        assert!(s.dispatch(cmd(37, 0), now).is_err());

        // Terminate is always honoured
        s.dispatch(cmd(34, 0), now).unwrap();
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_unsupported_leaves_state() {
        let mut s = scheduler();
        let now = Instant::now();
        s.dispatch(cmd(37, 20), now).unwrap();
        let before = s.state();
        assert_eq!(
            s.dispatch(cmd(5, 77), now),
            Err(AgcError::Unsupported { verb: 5, noun: 77 })
        );
        assert_eq!(s.state(), before);
    }

    #[test]
    fn test_alarm_suspends_and_resumes() {
        let mut s = scheduler();
        let now = Instant::now();
        s.dispatch(cmd(37, 11), now).unwrap();
        let running = s.state();

        s.raise(AlarmCode::TelemetryLoss);
        assert!(matches!(
            s.state(),
            SchedulerState::Alarm {
                suspended: Some(_),
                code: AlarmCode::TelemetryLoss
            }
        ));
        assert_eq!(s.major_mode(), Some(ProgramId::OrbitInsertion));
        assert!(s.step(&mut RegisterBank::new()).is_none());

        s.acknowledge();
        assert_eq!(s.state(), running);
    }

    #[test]
    fn test_escalation_and_abort_discard() {
        let mut s = scheduler();
        let now = Instant::now();
        s.dispatch(cmd(37, 15), now).unwrap();

        s.raise(AlarmCode::StaleTelemetry);
        s.raise(AlarmCode::OrbitNotCircular);
        s.raise(AlarmCode::LowFuel);
        assert!(matches!(
            s.state(),
            SchedulerState::Alarm {
                code: AlarmCode::OrbitNotCircular,
                ..
            }
        ));

        s.acknowledge();
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_no_start_while_in_alarm() {
        let mut s = scheduler();
        let now = Instant::now();
        s.raise(AlarmCode::LowFuel);
        assert!(s.dispatch(cmd(37, 20), now).is_err());
        // Displays stay available
        s.dispatch(cmd(6, 9), now).unwrap();
        assert_eq!(s.monitor(), Some(ProgramId::OrbitalDisplay));
        s.acknowledge();
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_completion_goes_idle() {
        let mut s = scheduler();
        let mut bank = RegisterBank::new();
        bank.write(names::PERIAPSIS, Value::Scalar(80_000.0), Source::Telemetry)
            .unwrap();
        s.dispatch(cmd(37, 11), Instant::now()).unwrap();
        let result = s.step(&mut bank).unwrap();
        assert_eq!(result.status, ProgramStatus::Complete);
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_forwarded_command_reaches_program() {
        let mut s = scheduler();
        let mut bank = RegisterBank::new();
        let now = Instant::now();
        s.dispatch(cmd(37, 20), now).unwrap();
        s.dispatch(VerbNounCommand::new(21, 22, &[1.0, 2.0, 3.0]).unwrap(), now)
            .unwrap();
        let result = s.step(&mut bank).unwrap();
        assert_eq!(result.commands.len(), 1);
        assert_eq!(bank.vector(names::TARGET_ATTITUDE), Some([1.0, 2.0, 3.0]));
    }
}
