// Control loop cadence and telemetry link timing
pub const TICK_RATE_HZ: u32 = 4;
pub const POLL_TIMEOUT_MS: u64 = 250;
pub const BACKOFF_INITIAL_MS: u64 = 500;
pub const BACKOFF_MAX_MS: u64 = 8_000;
pub const STALE_POLL_INTERVALS: u64 = 3;
pub const TELEMETRY_LOSS_POLLS: u32 = 4;
pub const LOW_FUEL_FRACTION: f64 = 0.1;
pub const KEY_QUEUE_DEPTH: usize = 64;
pub const LAMP_TEST_MS: u64 = 5_000;

// Number of numeric display registers (R1-R3)
pub const DISPLAY_REGISTERS: usize = 3;
// Operand slots per data load (one per display register)
pub const MAX_OPERANDS: usize = DISPLAY_REGISTERS;
// Digits per display register
pub const REGISTER_DIGITS: usize = 5;
// Outbound link commands a program can emit in a single step
pub const MAX_PROGRAM_COMMANDS: usize = 4;

pub mod verbs {
    // Global display verbs
    pub const DISPLAY: u8 = 6;
    pub const MONITOR: u8 = 16;

    // Data load into the active program
    pub const LOAD: u8 = 21;

    // Noun-less control verbs
    pub const PROCEED: u8 = 33;
    pub const TERMINATE: u8 = 34;
    pub const LAMP_TEST: u8 = 35;

    pub const CHANGE_PROGRAM: u8 = 37;

    // Crew authorisation request (flashing display only)
    pub const PLEASE_PERFORM: u8 = 99;
}

pub mod nouns {
    pub const NONE: u8 = 0;
    pub const ORBITAL_ELEMENTS: u8 = 9;
    pub const ATTITUDE_ERROR: u8 = 20;
    pub const DESIRED_ATTITUDE: u8 = 22;
    pub const TARGET_BODY: u8 = 30;
    pub const TIME_OF_IGNITION: u8 = 33;
    pub const BURN_STATUS: u8 = 40;
    pub const VELOCITY: u8 = 62;
}

pub mod programs {
    // Major mode numbers shown on the PROG display
    pub const IDLE: u8 = 0;
    pub const ORBIT_INSERTION: u8 = 11;
    pub const TRANSFER_PLANNER: u8 = 15;
    pub const ATTITUDE_HOLD: u8 = 20;
    pub const BURN_TIMER: u8 = 40;
}

pub mod alarms {
    pub const TELEMETRY_LOSS: u16 = 110;
    pub const STALE_TELEMETRY: u16 = 111;
    pub const NO_BURN_DATA: u16 = 115;
    pub const NO_PHASE_ANGLE: u16 = 120;
    pub const LOW_FUEL: u16 = 130;
    pub const INVALID_TARGET: u16 = 223;
    pub const ORBIT_NOT_CIRCULAR: u16 = 224;
    pub const INCLINATION_MISMATCH: u16 = 225;
    pub const IGNITION_TOO_SOON: u16 = 226;
    pub const AUTOPILOT_ERROR: u16 = 410;

    // Offsets added to the code on the console, by severity
    pub const CAUTION_OFFSET: u16 = 1000;
    pub const ABORT_OFFSET: u16 = 2000;
}

pub mod bodies {
    // Telemachus body ids for the transfer targets
    pub const MUN: u8 = 2;
    pub const MINMUS: u8 = 3;

    pub const KERBIN_RADIUS_M: f64 = 600_000.0;
    pub const KERBIN_MU: f64 = 3.531_6e12;
    pub const KERBIN_ATMOSPHERE_M: f64 = 70_000.0;

    pub const MUN_SMA_M: f64 = 12_000_000.0;
    pub const MUN_INCLINATION_DEG: f64 = 0.0;
    pub const MINMUS_SMA_M: f64 = 47_000_000.0;
    pub const MINMUS_INCLINATION_DEG: f64 = 6.0;
}
