//! Display relay words for output channel 010 and the lamp bits of channels
//! 011 and 0163.
//!
//! A relay word is `AAAA B CCCCC DDDDD`: a relay index, one sign or flag bit
//! and two 5-bit digit codes (left, right).

/// Relay indexes in channel 010
pub mod relays {
    pub const PROG: u16 = 11;
    pub const VERB: u16 = 10;
    pub const NOUN: u16 = 9;
    pub const LAMPS: u16 = 12;
}

/// Lamp bits of relay word 12
pub mod relay_lamps {
    pub const NO_ATT: u16 = 1 << 3;
    pub const GIMBAL_LOCK: u16 = 1 << 5;
    pub const TRACKER: u16 = 1 << 7;
    pub const PROG: u16 = 1 << 8;
}

/// Lamp bits of channel 011
pub mod lamps {
    pub const COMP_ACTY: u16 = 1 << 1;
    pub const UPLINK_ACTY: u16 = 1 << 2;
    pub const TEMP: u16 = 1 << 3;
    pub const KEY_REL: u16 = 1 << 4;
    pub const VN_FLASH: u16 = 1 << 5;
    pub const OPR_ERR: u16 = 1 << 6;
}

/// Lamp bits of channel 0163
pub mod status_lamps {
    pub const RESTART: u16 = 1 << 7;
    pub const STBY: u16 = 1 << 8;
}

/// Number of relay words carrying digits (indexes 1 to 11)
pub const DIGIT_RELAYS: usize = 11;

// Relay code for each decimal digit
const DIGIT_CODES: [u16; 10] = [21, 3, 25, 27, 15, 30, 28, 19, 29, 31];

/// One display digit, blank when `None`
pub type Digit = Option<u8>;

/// Relay code for a digit; blanks and out-of-range values show nothing
pub fn digit_code(digit: Digit) -> u16 {
    match digit {
        Some(d) if d < 10 => DIGIT_CODES[d as usize],
        _ => 0,
    }
}

/// Digit shown by a relay code
pub fn code_digit(code: u16) -> Digit {
    DIGIT_CODES
        .iter()
        .position(|c| *c == code & 0x1F)
        .map(|d| d as u8)
}

pub fn relay_word(index: u16, flag: bool, left: Digit, right: Digit) -> u16 {
    ((index & 0xF) << 11) | ((flag as u16) << 10) | (digit_code(left) << 5) | digit_code(right)
}

/// Relay index, flag bit and the two digits of a relay word
pub fn split_relay_word(word: u16) -> (u16, bool, Digit, Digit) {
    (
        (word >> 11) & 0xF,
        word & (1 << 10) != 0,
        code_digit(word >> 5),
        code_digit(word),
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Sign {
    #[default]
    Blank,
    Plus,
    Minus,
}

/// Sign and five digits of one data register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterField {
    pub sign: Sign,
    pub digits: [Digit; 5],
}

/// Every digit position of the display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayFields {
    pub prog: [Digit; 2],
    pub verb: [Digit; 2],
    pub noun: [Digit; 2],
    pub registers: [RegisterField; 3],
}

impl DisplayFields {
    /// Relay words 1 to 11; element `i` drives relay `i + 1`
    pub fn relay_words(&self) -> [u16; DIGIT_RELAYS] {
        let [r1, r2, r3] = self.registers;
        let plus = |r: &RegisterField| r.sign == Sign::Plus;
        let minus = |r: &RegisterField| r.sign == Sign::Minus;

        [
            relay_word(1, minus(&r3), r3.digits[3], r3.digits[4]),
            relay_word(2, plus(&r3), r3.digits[1], r3.digits[2]),
            relay_word(3, false, r2.digits[4], r3.digits[0]),
            relay_word(4, minus(&r2), r2.digits[2], r2.digits[3]),
            relay_word(5, plus(&r2), r2.digits[0], r2.digits[1]),
            relay_word(6, minus(&r1), r1.digits[3], r1.digits[4]),
            relay_word(7, plus(&r1), r1.digits[1], r1.digits[2]),
            relay_word(8, false, None, r1.digits[0]),
            relay_word(relays::NOUN, false, self.noun[0], self.noun[1]),
            relay_word(relays::VERB, false, self.verb[0], self.verb[1]),
            relay_word(relays::PROG, false, self.prog[0], self.prog[1]),
        ]
    }
}

#[cfg(test)]
mod relay_tests {
    use super::*;

    #[test]
    fn test_digit_codes() {
        assert_eq!(digit_code(Some(0)), 21);
        assert_eq!(digit_code(Some(9)), 31);
        assert_eq!(digit_code(None), 0);
        assert_eq!(digit_code(Some(12)), 0);
        for d in 0..10 {
            assert_eq!(code_digit(digit_code(Some(d))), Some(d));
        }
        assert_eq!(code_digit(0), None);
    }

    #[test]
    fn test_verb_relay() {
        let word = relay_word(relays::VERB, false, Some(1), Some(6));
        assert_eq!(word, (10 << 11) | (3 << 5) | 28);
        assert_eq!(split_relay_word(word), (10, false, Some(1), Some(6)));
    }

    #[test]
    fn test_register_layout() {
        let fields = DisplayFields {
            registers: [
                RegisterField {
                    sign: Sign::Plus,
                    digits: [Some(1), Some(2), Some(3), Some(4), Some(5)],
                },
                RegisterField {
                    sign: Sign::Minus,
                    digits: [Some(6), Some(7), Some(8), Some(9), Some(0)],
                },
                RegisterField::default(),
            ],
            ..DisplayFields::default()
        };
        let words = fields.relay_words();

        assert_eq!(split_relay_word(words[7]), (8, false, None, Some(1)));
        assert_eq!(split_relay_word(words[6]), (7, true, Some(2), Some(3)));
        assert_eq!(split_relay_word(words[5]), (6, false, Some(4), Some(5)));
        assert_eq!(split_relay_word(words[4]), (5, false, Some(6), Some(7)));
        assert_eq!(split_relay_word(words[3]), (4, true, Some(8), Some(9)));
        assert_eq!(split_relay_word(words[2]), (3, false, Some(0), None));
        assert_eq!(split_relay_word(words[0]), (1, false, None, None));
    }
}
