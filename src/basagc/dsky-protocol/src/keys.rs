use crate::agc::{channels, Packet};

/// Keypad buttons as reported by the DSKY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Digit(u8),
    Verb,
    Noun,
    Plus,
    Minus,
    Enter,
    Clear,
    Reset,
    KeyRelease,
    Proceed,
}

// PRO is wired to channel 032 bit 14, active low
const PROCEED_BIT: u16 = 1 << 13;

/// Decode the 5-bit keycode written to channel 015
pub fn decode_keycode(code: u16) -> Option<KeyCode> {
    let key = match code & 0x1F {
        d @ 1..=9 => KeyCode::Digit(d as u8),
        0o20 => KeyCode::Digit(0),
        0o21 => KeyCode::Verb,
        0o37 => KeyCode::Noun,
        0o32 => KeyCode::Plus,
        0o33 => KeyCode::Minus,
        0o34 => KeyCode::Enter,
        0o36 => KeyCode::Clear,
        0o22 => KeyCode::Reset,
        0o31 => KeyCode::KeyRelease,
        _ => return None,
    };
    Some(key)
}

pub fn encode_keycode(key: KeyCode) -> u16 {
    match key {
        KeyCode::Digit(0) => 0o20,
        KeyCode::Digit(d) => (d as u16) & 0x1F,
        KeyCode::Verb => 0o21,
        KeyCode::Noun => 0o37,
        KeyCode::Plus => 0o32,
        KeyCode::Minus => 0o33,
        KeyCode::Enter => 0o34,
        KeyCode::Clear => 0o36,
        KeyCode::Reset => 0o22,
        KeyCode::KeyRelease => 0o31,
        KeyCode::Proceed => 0,
    }
}

/// Key pressed by an input packet, if any. Mask packets and PRO releases
/// carry no key.
pub fn decode_input(packet: &Packet) -> Option<KeyCode> {
    if packet.mask {
        return None;
    }
    match packet.channel {
        channels::KEYPAD => decode_keycode(packet.value),
        channels::PROCEED if packet.value & PROCEED_BIT == 0 => Some(KeyCode::Proceed),
        _ => None,
    }
}

/// Packet a DSKY sends for a key press
pub fn key_packet(key: KeyCode) -> Packet {
    match key {
        KeyCode::Proceed => Packet::new(channels::PROCEED, 0o77777 & !PROCEED_BIT),
        other => Packet::new(channels::KEYPAD, encode_keycode(other)),
    }
}
