use crate::constants::REGISTER_DIGITS;

const REGISTER_MAX: i64 = 99_999;

/// Sign and five digits as shown in one display register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDigits {
    pub negative: bool,
    pub digits: [u8; REGISTER_DIGITS],
}

impl RegisterDigits {
    pub fn from_integer(value: i64) -> Self {
        let negative = value < 0;
        let mut magnitude = value.unsigned_abs().min(REGISTER_MAX as u64);
        let mut digits = [0u8; REGISTER_DIGITS];
        for slot in digits.iter_mut().rev() {
            *slot = (magnitude % 10) as u8;
            magnitude /= 10;
        }
        Self { negative, digits }
    }
}

// Scales a value into display units and rounds; saturates at 99999
pub fn to_register_digits(value: f64, factor: f64) -> RegisterDigits {
    let scaled = (value * factor).round();
    let clamped = scaled.clamp(-(REGISTER_MAX as f64), REGISTER_MAX as f64);
    RegisterDigits::from_integer(clamped as i64)
}

// Splits seconds into (days, hours, minutes, seconds)
pub fn seconds_to_time(seconds: f64) -> (u64, u64, u64, f64) {
    let total = seconds.max(0.0);
    let whole = total.trunc() as u64;
    let days = whole / 86_400;
    let hours = (whole % 86_400) / 3_600;
    let minutes = (whole % 3_600) / 60;
    let secs = (whole % 60) as f64 + total.fract();
    (days, hours, minutes, secs)
}

// Wraps an angle in degrees into (-180, 180]
pub fn wrap_degrees(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

// Wraps an angle in degrees into [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 {
        a + 360.0
    } else {
        a
    }
}
