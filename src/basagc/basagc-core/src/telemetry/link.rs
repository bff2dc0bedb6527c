use super::{Ack, LinkCommand, LinkHealth, TelemetryField, TelemetryPort, TelemetrySample, Watchdog};
use crate::config::ComputerConfig;
use crate::error::LinkError;
use crate::memory::Value;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Exponential reconnection delay: doubles on every failure up to a cap
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns twice as much
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Command delivery counts since the last call to `take_command_stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub sent: u32,
    pub failed: u32,
}

/// Keeps the connection to the simulator and turns wire frames into samples.
///
/// A failed fetch never reaches the caller: `poll` returns no samples and
/// the health flag drops to `Down`. While down, reconnection probes are
/// spaced by [`Backoff`] and sampling resumes in the same poll that
/// restores the link.
pub struct TelemetryLink<P: TelemetryPort> {
    port: P,
    fields: Vec<TelemetryField>,
    keys: Vec<&'static str>, // Unique wire keys across all fields
    timeout: Duration,
    health: LinkHealth,
    backoff: Backoff,
    next_retry: Option<Instant>,
    consecutive_empty: u32,
    watchdog: Watchdog,
    stats: CommandStats,
}

impl<P: TelemetryPort> TelemetryLink<P> {
    pub fn new(port: P, fields: Vec<TelemetryField>, config: &ComputerConfig) -> Self {
        let mut keys: Vec<&'static str> = Vec::new();
        for field in &fields {
            for key in field.source.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        Self {
            port,
            fields,
            keys,
            timeout: config.poll_timeout,
            health: LinkHealth::Up,
            backoff: Backoff::new(config.backoff_initial, config.backoff_max),
            next_retry: None,
            consecutive_empty: 0,
            watchdog: Watchdog::new(config.stale_polls),
            stats: CommandStats::default(),
        }
    }

    pub fn health(&self) -> LinkHealth {
        self.health
    }

    /// Polls in a row that produced no samples
    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    pub fn stale_fields(&self) -> Vec<&'static str> {
        self.watchdog.stale_fields()
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn poll(&mut self) -> Vec<TelemetrySample> {
        self.poll_at(Instant::now())
    }

    /// Fetch one frame of telemetry as of `now`
    pub fn poll_at(&mut self, now: Instant) -> Vec<TelemetrySample> {
        self.watchdog.begin_poll();

        if self.health == LinkHealth::Down && !self.try_reconnect(now) {
            self.consecutive_empty += 1;
            return Vec::new();
        }

        let frame = match self.port.fetch(&self.keys, self.timeout) {
            Ok(frame) => frame,
            Err(e) => {
                self.mark_down(now, &e);
                self.consecutive_empty += 1;
                return Vec::new();
            }
        };

        let samples: Vec<TelemetrySample> = self
            .fields
            .iter()
            .map(|field| field.sample(&frame, now))
            .collect();

        for sample in samples.iter().filter(|s| s.valid) {
            self.watchdog.refresh(sample.field);
        }

        debug!(
            "Polled {} fields ({} valid)",
            samples.len(),
            samples.iter().filter(|s| s.valid).count()
        );

        if samples.is_empty() {
            self.consecutive_empty += 1;
        } else {
            self.consecutive_empty = 0;
        }
        samples
    }

    /// Send a named command to the simulator
    pub fn send_command(&mut self, name: &'static str, value: Option<Value>) -> Result<Ack, LinkError> {
        self.send_at(&LinkCommand::new(name, value), Instant::now())
    }

    pub fn send_at(&mut self, command: &LinkCommand, now: Instant) -> Result<Ack, LinkError> {
        if self.health == LinkHealth::Down {
            self.stats.failed += 1;
            return Err(LinkError::Down(format!("cannot send {}", command.name)));
        }

        match self.port.send(command, self.timeout) {
            Ok(()) => {
                self.stats.sent += 1;
                debug!("Command {} acknowledged", command.name);
                Ok(Ack {
                    command: command.name,
                })
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!("Command {} failed: {}", command.name, e);
                if matches!(e, LinkError::Down(_) | LinkError::Timeout) {
                    self.mark_down(now, &e);
                }
                Err(e)
            }
        }
    }

    pub fn take_command_stats(&mut self) -> CommandStats {
        std::mem::take(&mut self.stats)
    }

    fn mark_down(&mut self, now: Instant, cause: &LinkError) {
        if self.health == LinkHealth::Up {
            warn!("Telemetry link lost: {}", cause);
            self.health = LinkHealth::Down;
            self.backoff.reset();
        }
        self.next_retry = Some(now + self.backoff.next_delay());
    }

    /// Probe the simulator if the backoff delay has elapsed
    fn try_reconnect(&mut self, now: Instant) -> bool {
        if let Some(at) = self.next_retry {
            if now < at {
                return false;
            }
        }

        match self.port.probe(self.timeout) {
            Ok(()) => {
                info!("Telemetry link restored");
                self.health = LinkHealth::Up;
                self.backoff.reset();
                self.next_retry = None;
                true
            }
            Err(e) => {
                let delay = self.backoff.next_delay();
                debug!("Reconnect failed ({}), next attempt in {:?}", e, delay);
                self.next_retry = Some(now + delay);
                false
            }
        }
    }
}

#[cfg(test)]
mod link_tests {
    use super::*;
    use crate::memory::names;
    use crate::testing::{orbit_fields, FakePort};

    fn link(port: FakePort) -> TelemetryLink<FakePort> {
        TelemetryLink::new(port, orbit_fields(), &ComputerConfig::default())
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut b = Backoff::new(Duration::from_millis(500), Duration::from_secs(8));
        let delays: Vec<u128> = (0..7).map(|_| b.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000, 8000, 8000]);
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_poll_returns_samples() {
        let mut port = FakePort::connected();
        port.set("apa", 120_000.0);
        port.set("pea", 100_000.0);
        let mut link = link(port);

        let samples = link.poll_at(Instant::now());
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.valid));
        assert_eq!(link.health(), LinkHealth::Up);
    }

    #[test]
    fn test_missing_key_gives_invalid_sample() {
        let mut port = FakePort::connected();
        port.set("apa", 120_000.0);
        let mut link = link(port);

        let samples = link.poll_at(Instant::now());
        let pea = samples.iter().find(|s| s.field == names::PERIAPSIS).unwrap();
        assert!(!pea.valid);
    }

    #[test]
    fn test_connection_loss_is_not_an_error() {
        let mut link = link(FakePort::default());
        let t0 = Instant::now();

        assert!(link.poll_at(t0).is_empty());
        assert_eq!(link.health(), LinkHealth::Down);
        assert_eq!(link.consecutive_empty(), 1);
    }

    #[test]
    fn test_reconnect_respects_backoff() {
        let mut link = link(FakePort::default());
        let t0 = Instant::now();

        link.poll_at(t0); // goes down, retry at +500ms
        link.poll_at(t0 + Duration::from_millis(250));
        assert_eq!(link.port_mut().probes, 0);

        link.poll_at(t0 + Duration::from_millis(500)); // probe fails, retry at +1500ms
        assert_eq!(link.port_mut().probes, 1);
        link.poll_at(t0 + Duration::from_millis(1250));
        assert_eq!(link.port_mut().probes, 1);

        link.port_mut().up = true;
        link.port_mut().set("apa", 1.0);
        let samples = link.poll_at(t0 + Duration::from_millis(1500));
        assert_eq!(link.port_mut().probes, 2);
        assert_eq!(link.health(), LinkHealth::Up);
        assert_eq!(samples.len(), 2);
        assert_eq!(link.consecutive_empty(), 0);
    }

    #[test]
    fn test_watchdog_flags_unrefreshed_fields() {
        let mut port = FakePort::connected();
        port.set("apa", 1.0);
        port.set("pea", 2.0);
        let mut link = link(port);
        let now = Instant::now();

        link.poll_at(now);
        link.port_mut().values.remove("pea");
        for _ in 0..3 {
            link.poll_at(now);
        }
        assert_eq!(link.stale_fields(), vec![names::PERIAPSIS]);
    }

    #[test]
    fn test_send_command_paths() {
        let mut link = link(FakePort::connected());
        let ack = link.send_command("stage", None).unwrap();
        assert_eq!(ack.command, "stage");

        link.port_mut().reject_commands = true;
        assert!(matches!(
            link.send_at(&LinkCommand::throttle(1.0), Instant::now()),
            Err(LinkError::Rejected(_))
        ));
        assert_eq!(link.health(), LinkHealth::Up);

        link.port_mut().up = false;
        assert!(link.send_at(&LinkCommand::stage(), Instant::now()).is_err());
        assert_eq!(link.health(), LinkHealth::Down);
        assert!(matches!(
            link.send_at(&LinkCommand::stage(), Instant::now()),
            Err(LinkError::Down(_))
        ));

        let stats = link.take_command_stats();
        assert_eq!(stats, CommandStats { sent: 1, failed: 3 });
        assert_eq!(link.take_command_stats(), CommandStats::default());
    }
}
