use super::Source;

/// Shape of the value a register holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Scalar,
    Vector,
    Flag,
}

/// Static description of one register slot
#[derive(Debug)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub kind: RegisterKind,
    pub owner: Source, // Only this source may write the slot
}

pub mod names {
    // Telemetry-sourced
    pub const ALTITUDE: &str = "altitude";
    pub const VERTICAL_SPEED: &str = "vertical_speed";
    pub const SURFACE_SPEED: &str = "surface_speed";
    pub const ORBITAL_VELOCITY: &str = "orbital_velocity";
    pub const APOAPSIS: &str = "apoapsis";
    pub const PERIAPSIS: &str = "periapsis";
    pub const ECCENTRICITY: &str = "eccentricity";
    pub const INCLINATION: &str = "inclination";
    pub const ORBITAL_PERIOD: &str = "orbital_period";
    pub const TIME_TO_APOAPSIS: &str = "time_to_apoapsis";
    pub const ATTITUDE: &str = "attitude"; // pitch, heading, roll
    pub const FUEL_FRACTION: &str = "fuel_fraction";
    pub const MISSION_TIME: &str = "mission_time";
    pub const UNIVERSAL_TIME: &str = "universal_time";
    pub const PAUSED: &str = "paused";
    pub const MUN_PHASE_ANGLE: &str = "mun_phase_angle";
    pub const MINMUS_PHASE_ANGLE: &str = "minmus_phase_angle";

    // Program-computed
    pub const TARGET_BODY: &str = "target_body";
    pub const BURN_DELTA_V: &str = "burn_delta_v";
    pub const TIME_OF_IGNITION: &str = "time_of_ignition";
    pub const TRANSFER_TIME: &str = "transfer_time";
    pub const PHASE_ANGLE_REQUIRED: &str = "phase_angle_required";
    pub const BURN_DELTA_V_REMAINING: &str = "burn_delta_v_remaining";
    pub const TIME_TO_IGNITION: &str = "time_to_ignition";
    pub const TARGET_ATTITUDE: &str = "target_attitude";
    pub const ATTITUDE_ERROR: &str = "attitude_error";
}

const fn telemetry(name: &'static str, kind: RegisterKind) -> RegisterSpec {
    RegisterSpec {
        name,
        kind,
        owner: Source::Telemetry,
    }
}

const fn computed(name: &'static str, kind: RegisterKind) -> RegisterSpec {
    RegisterSpec {
        name,
        kind,
        owner: Source::Program,
    }
}

/// Every register the computer knows about, fixed at startup
pub static REGISTERS: &[RegisterSpec] = &[
    telemetry(names::ALTITUDE, RegisterKind::Scalar),
    telemetry(names::VERTICAL_SPEED, RegisterKind::Scalar),
    telemetry(names::SURFACE_SPEED, RegisterKind::Scalar),
    telemetry(names::ORBITAL_VELOCITY, RegisterKind::Scalar),
    telemetry(names::APOAPSIS, RegisterKind::Scalar),
    telemetry(names::PERIAPSIS, RegisterKind::Scalar),
    telemetry(names::ECCENTRICITY, RegisterKind::Scalar),
    telemetry(names::INCLINATION, RegisterKind::Scalar),
    telemetry(names::ORBITAL_PERIOD, RegisterKind::Scalar),
    telemetry(names::TIME_TO_APOAPSIS, RegisterKind::Scalar),
    telemetry(names::ATTITUDE, RegisterKind::Vector),
    telemetry(names::FUEL_FRACTION, RegisterKind::Scalar),
    telemetry(names::MISSION_TIME, RegisterKind::Scalar),
    telemetry(names::UNIVERSAL_TIME, RegisterKind::Scalar),
    telemetry(names::PAUSED, RegisterKind::Scalar),
    telemetry(names::MUN_PHASE_ANGLE, RegisterKind::Scalar),
    telemetry(names::MINMUS_PHASE_ANGLE, RegisterKind::Scalar),
    computed(names::TARGET_BODY, RegisterKind::Scalar),
    computed(names::BURN_DELTA_V, RegisterKind::Scalar),
    computed(names::TIME_OF_IGNITION, RegisterKind::Scalar),
    computed(names::TRANSFER_TIME, RegisterKind::Scalar),
    computed(names::PHASE_ANGLE_REQUIRED, RegisterKind::Scalar),
    computed(names::BURN_DELTA_V_REMAINING, RegisterKind::Scalar),
    computed(names::TIME_TO_IGNITION, RegisterKind::Scalar),
    computed(names::TARGET_ATTITUDE, RegisterKind::Vector),
    computed(names::ATTITUDE_ERROR, RegisterKind::Vector),
];

/// Find the spec for a register name
pub fn lookup(name: &str) -> Option<&'static RegisterSpec> {
    REGISTERS.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod catalogue_tests {
    use super::*;

    #[test]
    fn test_names_unique() {
        for (i, a) in REGISTERS.iter().enumerate() {
            for b in &REGISTERS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_owner_split() {
        assert_eq!(lookup(names::APOAPSIS).unwrap().owner, Source::Telemetry);
        assert_eq!(lookup(names::BURN_DELTA_V).unwrap().owner, Source::Program);
        assert!(lookup("warp_factor").is_none());
    }
}
