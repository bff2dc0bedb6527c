/// IO channels used by the DSKY socket protocol
pub mod channels {
    pub const RELAYS: u16 = 0o10; // Display relay words
    pub const LAMPS: u16 = 0o11; // COMP ACTY, UPLINK ACTY, KEY REL, V/N flash, OPR ERR
    pub const KEYPAD: u16 = 0o15;
    pub const PROCEED: u16 = 0o32;
    pub const STATUS_LAMPS: u16 = 0o163; // STBY, RESTART
}

const ADDR_MASK: u16 = 0x7F; // 7-bit channel
const VALUE_MASK: u16 = 0x7FFF; // 15-bit value
const MASK_FLAG: u8 = 0x20; // Set on bit-mask packets, which carry no data

/// One channel write carried in a 4-byte DSKY packet:
/// `00u0aaaa 01aaavvv 10vvvvvv 11vvvvvv`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub channel: u16,
    pub value: u16,
    pub mask: bool,
}

impl Packet {
    pub fn new(channel: u16, value: u16) -> Self {
        Packet {
            channel: channel & ADDR_MASK,
            value: value & VALUE_MASK,
            mask: false,
        }
    }

    /// Parse 4 raw bytes; `None` unless every byte carries its position tag
    pub fn decode(bytes: [u8; 4]) -> Option<Self> {
        let [b0, b1, b2, b3] = bytes;
        let tagged = tag(b0) == 0 && tag(b1) == 1 && tag(b2) == 2 && tag(b3) == 3;
        if !tagged {
            return None;
        }

        let value = ((b1 as u16 & 0x07) << 12) | ((b2 as u16 & 0x3F) << 6) | (b3 as u16 & 0x3F);
        let channel = ((b0 as u16 & 0x0F) << 3) | ((b1 as u16 >> 3) & 0x07);

        Some(Packet {
            channel,
            value,
            mask: b0 & MASK_FLAG != 0,
        })
    }

    /// Change the packet back to wire format
    pub fn encode(&self) -> [u8; 4] {
        let mut header = ((self.channel >> 3) & 0x0F) as u8;
        if self.mask {
            header |= MASK_FLAG;
        }
        let upper = 0x40 | ((self.channel & 0x7) << 3) as u8 | ((self.value >> 12) & 0x7) as u8;
        let middle = 0x80 | ((self.value >> 6) & 0x3F) as u8;
        let lower = 0xC0 | (self.value & 0x3F) as u8;
        [header, upper, middle, lower]
    }
}

// Position tag in the top two bits of each packet byte
fn tag(byte: u8) -> u8 {
    byte >> 6
}

/// Reassembles packets from a byte stream, resynchronising on the byte tags
/// after garbage or a partial packet.
#[derive(Debug, Default)]
pub struct PacketReader {
    buf: [u8; 4],
    len: usize,
}

impl PacketReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte, returning a packet when it completes one
    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        if tag(byte) as usize != self.len {
            // Out of sequence: a header byte starts over, anything else is dropped
            self.len = 0;
            if tag(byte) != 0 {
                return None;
            }
        }

        self.buf[self.len] = byte;
        self.len += 1;
        if self.len < 4 {
            return None;
        }

        self.len = 0;
        Packet::decode(self.buf)
    }

    /// Feed a chunk, collecting the packets it completes
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Packet> {
        bytes.iter().filter_map(|b| self.push(*b)).collect()
    }
}
