use basagc_core::error::LinkError;
use basagc_core::memory::{names, Value};
use basagc_core::telemetry::{
    commands, FieldSource, LinkCommand, TelemetryField, TelemetryPort, WireFrame, WireValue,
};
use log::debug;
use reqwest::blocking::Client;
use serde_json::{Map, Value as Json};
use std::time::Duration;

const PAUSE_KEY: &str = "p.paused";

/// Registers and the datalink API keys they are read from
pub fn field_map() -> Vec<TelemetryField> {
    use FieldSource::*;
    vec![
        TelemetryField::new(names::ALTITUDE, Scalar("v.altitude")),
        TelemetryField::new(names::VERTICAL_SPEED, Scalar("v.verticalSpeed")),
        TelemetryField::new(names::SURFACE_SPEED, Scalar("v.surfaceSpeed")),
        TelemetryField::new(names::ORBITAL_VELOCITY, Scalar("v.orbitalVelocity")),
        TelemetryField::new(names::APOAPSIS, Scalar("o.ApA")),
        TelemetryField::new(names::PERIAPSIS, Scalar("o.PeA")),
        TelemetryField::new(names::ECCENTRICITY, Scalar("o.eccentricity")),
        TelemetryField::new(names::INCLINATION, Scalar("o.inclination")),
        TelemetryField::new(names::ORBITAL_PERIOD, Scalar("o.period")),
        TelemetryField::new(names::TIME_TO_APOAPSIS, Scalar("o.timeToAp")),
        TelemetryField::new(names::ATTITUDE, Vector(["n.pitch", "n.heading", "n.roll"])),
        TelemetryField::new(
            names::FUEL_FRACTION,
            Ratio("r.resource[LiquidFuel]", "r.resourceMax[LiquidFuel]"),
        ),
        TelemetryField::new(names::MISSION_TIME, Scalar("v.missionTime")),
        TelemetryField::new(names::UNIVERSAL_TIME, Scalar("t.universalTime")),
        TelemetryField::new(names::PAUSED, Scalar(PAUSE_KEY)),
        TelemetryField::new(names::MUN_PHASE_ANGLE, Scalar("b.o.phaseAngle[2]")),
        TelemetryField::new(names::MINMUS_PHASE_ANGLE, Scalar("b.o.phaseAngle[3]")),
    ]
}

/// Datalink API call for a vessel command
pub fn command_key(command: &LinkCommand) -> Result<String, LinkError> {
    match (command.name, &command.value) {
        (commands::THROTTLE, Some(Value::Scalar(level))) => Ok(format!("f.setThrottle[{}]", level)),
        (commands::STAGE, None) => Ok("f.stage".into()),
        (commands::SAS, Some(Value::Flag(on))) => {
            Ok(format!("f.sas[{}]", if *on { "True" } else { "False" }))
        }
        (commands::ATTITUDE, Some(Value::Vector([pitch, heading, roll]))) => {
            Ok(format!("mj.surface2[{},{},{}]", heading, pitch, roll))
        }
        (commands::AUTOPILOT_OFF, None) => Ok("mj.smartassoff".into()),
        _ => Err(LinkError::Rejected(format!(
            "{} has no datalink call for {:?}",
            command.name, command.value
        ))),
    }
}

fn alias(idx: usize) -> String {
    format!("a{}", idx)
}

fn wire_value(value: &Json) -> WireValue {
    match value {
        Json::Number(n) => n.as_f64().map_or(WireValue::Null, WireValue::Number),
        Json::Bool(b) => WireValue::Bool(*b),
        Json::String(s) => WireValue::Text(s.clone()),
        _ => WireValue::Null,
    }
}

/// Map an aliased datalink response back onto the requested keys. Keys the
/// response leaves out come back as `Null`.
pub fn parse_frame(keys: &[&'static str], response: &Map<String, Json>) -> WireFrame {
    keys.iter()
        .enumerate()
        .map(|(idx, key)| {
            let value = response.get(&alias(idx)).map_or(WireValue::Null, wire_value);
            (key.to_string(), value)
        })
        .collect()
}

fn link_error(e: reqwest::Error) -> LinkError {
    if e.is_timeout() {
        LinkError::Timeout
    } else if e.is_status() {
        LinkError::Rejected(e.to_string())
    } else if e.is_decode() || e.is_body() {
        LinkError::Malformed(e.to_string())
    } else {
        LinkError::Down(e.to_string())
    }
}

/// Telemachus datalink over HTTP. Every request is a GET on
/// `/telemachus/datalink` with one `alias=key` pair per value.
pub struct TelemachusPort {
    client: Client,
    url: String,
}

impl TelemachusPort {
    pub fn new(host: &str, port: u16) -> Result<Self, LinkError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LinkError::Down(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("http://{}:{}/telemachus/datalink", host, port),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn get(&self, keys: &[&str], timeout: Duration) -> Result<Map<String, Json>, LinkError> {
        let query: Vec<(String, &str)> = keys
            .iter()
            .enumerate()
            .map(|(idx, key)| (alias(idx), *key))
            .collect();

        self.client
            .get(&self.url)
            .query(&query)
            .timeout(timeout)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(link_error)?
            .json::<Map<String, Json>>()
            .map_err(|e| LinkError::Malformed(e.to_string()))
    }
}

impl TelemetryPort for TelemachusPort {
    fn fetch(&mut self, keys: &[&'static str], timeout: Duration) -> Result<WireFrame, LinkError> {
        let response = self.get(keys, timeout)?;
        Ok(parse_frame(keys, &response))
    }

    fn send(&mut self, command: &LinkCommand, timeout: Duration) -> Result<(), LinkError> {
        let key = command_key(command)?;
        debug!("Datalink call {}", key);
        self.get(&[key.as_str()], timeout).map(|_| ())
    }

    fn probe(&mut self, timeout: Duration) -> Result<(), LinkError> {
        self.get(&[PAUSE_KEY], timeout).map(|_| ())
    }
}

#[cfg(test)]
mod telemachus_tests {
    use super::*;
    use basagc_core::memory::{Source, REGISTERS};
    use serde_json::json;
    use std::time::Instant;

    #[test]
    fn test_field_map_covers_telemetry_registers() {
        let fields = field_map();
        for spec in REGISTERS.iter().filter(|s| s.owner == Source::Telemetry) {
            assert!(
                fields.iter().any(|f| f.register == spec.name),
                "{} has no datalink key",
                spec.name
            );
        }
        assert_eq!(fields.len(), REGISTERS.iter().filter(|s| s.owner == Source::Telemetry).count());
    }

    #[test]
    fn test_command_keys() {
        assert_eq!(command_key(&LinkCommand::throttle(1.0)).unwrap(), "f.setThrottle[1]");
        assert_eq!(command_key(&LinkCommand::throttle(0.5)).unwrap(), "f.setThrottle[0.5]");
        assert_eq!(command_key(&LinkCommand::stage()).unwrap(), "f.stage");
        assert_eq!(command_key(&LinkCommand::sas(false)).unwrap(), "f.sas[False]");
        assert_eq!(
            command_key(&LinkCommand::attitude([10.0, 90.0, 0.0])).unwrap(),
            "mj.surface2[90,10,0]"
        );
        assert_eq!(command_key(&LinkCommand::autopilot_off()).unwrap(), "mj.smartassoff");
    }

    #[test]
    fn test_unmapped_command_is_rejected() {
        let bad = LinkCommand::new(commands::THROTTLE, Some(Value::Flag(true)));
        assert!(matches!(command_key(&bad), Err(LinkError::Rejected(_))));
    }

    #[test]
    fn test_parse_frame() {
        let keys = ["o.ApA", "o.PeA", "n.pitch", "p.paused"];
        let response = json!({ "a0": 120000.5, "a1": null, "a2": "12.5" });
        let frame = parse_frame(&keys, response.as_object().unwrap());

        assert_eq!(frame["o.ApA"], WireValue::Number(120000.5));
        assert_eq!(frame["o.PeA"], WireValue::Null);
        assert_eq!(frame["n.pitch"], WireValue::Text("12.5".into()));
        assert_eq!(frame["p.paused"], WireValue::Null);
    }

    #[test]
    fn test_samples_from_datalink_frame() {
        let keys = ["r.resource[LiquidFuel]", "r.resourceMax[LiquidFuel]", "o.ApA"];
        let response = json!({ "a0": 90.0, "a1": 360.0, "a2": "NaN" });
        let frame = parse_frame(&keys, response.as_object().unwrap());
        let now = Instant::now();

        let fields = field_map();
        let fuel = fields.iter().find(|f| f.register == names::FUEL_FRACTION).unwrap();
        let sample = fuel.sample(&frame, now);
        assert!(sample.valid);
        assert_eq!(sample.value, Value::Scalar(0.25));

        let apoapsis = fields.iter().find(|f| f.register == names::APOAPSIS).unwrap();
        assert!(!apoapsis.sample(&frame, now).valid);
    }
}
