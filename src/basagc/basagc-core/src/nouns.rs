use crate::constants::{nouns, DISPLAY_REGISTERS};
use crate::utils::{to_register_digits, RegisterDigits};

/// How one display register scales its value into five digits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterFormat {
    pub label: &'static str,
    pub factor: f64, // Display units per engineering unit
}

impl RegisterFormat {
    pub const fn new(label: &'static str, factor: f64) -> Self {
        Self { label, factor }
    }

    pub fn digits(&self, value: f64) -> RegisterDigits {
        to_register_digits(value, self.factor)
    }
}

const KM_TENTHS: f64 = 0.01; // metres -> 0.1 km
const TENTHS: f64 = 10.0;
const HUNDREDTHS: f64 = 100.0;
const WHOLE: f64 = 1.0;

/// A noun: what the three display registers mean for a verb/noun pair
#[derive(Debug)]
pub struct Noun {
    pub number: u8,
    pub description: &'static str,
    pub registers: [Option<RegisterFormat>; DISPLAY_REGISTERS],
}

static NOUNS: &[Noun] = &[
    Noun {
        number: nouns::ORBITAL_ELEMENTS,
        description: "Apoapsis, periapsis, inclination",
        registers: [
            Some(RegisterFormat::new("apoapsis", KM_TENTHS)),
            Some(RegisterFormat::new("periapsis", KM_TENTHS)),
            Some(RegisterFormat::new("inclination", HUNDREDTHS)),
        ],
    },
    Noun {
        number: nouns::ATTITUDE_ERROR,
        description: "Attitude error pitch, heading, roll",
        registers: [
            Some(RegisterFormat::new("pitch error", HUNDREDTHS)),
            Some(RegisterFormat::new("heading error", HUNDREDTHS)),
            Some(RegisterFormat::new("roll error", HUNDREDTHS)),
        ],
    },
    Noun {
        number: nouns::DESIRED_ATTITUDE,
        description: "Desired pitch, heading, roll",
        registers: [
            Some(RegisterFormat::new("pitch", HUNDREDTHS)),
            Some(RegisterFormat::new("heading", HUNDREDTHS)),
            Some(RegisterFormat::new("roll", HUNDREDTHS)),
        ],
    },
    Noun {
        number: nouns::TARGET_BODY,
        description: "Target body id",
        registers: [Some(RegisterFormat::new("target", WHOLE)), None, None],
    },
    Noun {
        number: nouns::TIME_OF_IGNITION,
        description: "Time of ignition hours, minutes, seconds",
        registers: [
            Some(RegisterFormat::new("hours", WHOLE)),
            Some(RegisterFormat::new("minutes", WHOLE)),
            Some(RegisterFormat::new("seconds", HUNDREDTHS)),
        ],
    },
    Noun {
        number: nouns::BURN_STATUS,
        description: "Time to ignition, delta-v remaining, delta-v gained",
        registers: [
            Some(RegisterFormat::new("time to ignition", WHOLE)),
            Some(RegisterFormat::new("delta-v remaining", TENTHS)),
            Some(RegisterFormat::new("delta-v gained", TENTHS)),
        ],
    },
    Noun {
        number: nouns::VELOCITY,
        description: "Surface speed, vertical speed, altitude",
        registers: [
            Some(RegisterFormat::new("surface speed", TENTHS)),
            Some(RegisterFormat::new("vertical speed", TENTHS)),
            Some(RegisterFormat::new("altitude", KM_TENTHS)),
        ],
    },
];

pub fn noun(number: u8) -> Option<&'static Noun> {
    NOUNS.iter().find(|n| n.number == number)
}

/// Format for register `index` of a noun; unknown nouns show whole numbers
pub fn register_format(noun_number: u8, index: usize) -> RegisterFormat {
    noun(noun_number)
        .and_then(|n| n.registers.get(index).copied().flatten())
        .unwrap_or(RegisterFormat::new("value", WHOLE))
}

#[cfg(test)]
mod noun_tests {
    use super::*;

    #[test]
    fn test_orbital_elements_scaling() {
        let n = noun(nouns::ORBITAL_ELEMENTS).unwrap();
        let apo = n.registers[0].unwrap();
        assert_eq!(apo.digits(120_000.0).digits, [0, 1, 2, 0, 0]);
    }

    #[test]
    fn test_unknown_noun_format() {
        assert!(noun(77).is_none());
        assert_eq!(register_format(77, 0).factor, 1.0);
        assert_eq!(register_format(nouns::TARGET_BODY, 2).factor, 1.0);
    }
}
