use basagc_core::console::{ConsoleSink, ConsoleSnapshot};
use basagc_core::interpreter::{code_field, CodeField};
use basagc_core::{Key, Keypad};
use dsky_protocol::agc::{channels, Packet, PacketReader};
use dsky_protocol::keys::{decode_input, KeyCode};
use dsky_protocol::relay::{
    lamps, relay_lamps, relays, status_lamps, Digit, DisplayFields, RegisterField,
    Sign, DIGIT_RELAYS,
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, info, warn};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Relays 1-12 on channel 010, then channels 011 and 0163
const FRAME_WORDS: usize = DIGIT_RELAYS + 3;

// Packets buffered for the writer; a few full frames
const DOWNLINK_DEPTH: usize = 4 * FRAME_WORDS;

type Frame = [Packet; FRAME_WORDS];

fn key(code: KeyCode) -> Key {
    match code {
        KeyCode::Digit(d) => Key::Digit(d),
        KeyCode::Verb => Key::Verb,
        KeyCode::Noun => Key::Noun,
        KeyCode::Plus => Key::Plus,
        KeyCode::Minus => Key::Minus,
        KeyCode::Enter => Key::Enter,
        KeyCode::Clear => Key::Clear,
        KeyCode::Reset => Key::Reset,
        KeyCode::KeyRelease => Key::KeyRelease,
        KeyCode::Proceed => Key::Proceed,
    }
}

fn digits(field: &CodeField) -> [Digit; 2] {
    [field.get(0).copied(), field.get(1).copied()]
}

/// Digit fields for a snapshot; the lamp test shows 8 in every position
pub fn display_fields(snapshot: &ConsoleSnapshot) -> DisplayFields {
    if snapshot.lamp_test {
        let eights = RegisterField {
            sign: Sign::Plus,
            digits: [Some(8); 5],
        };
        return DisplayFields {
            prog: [Some(8); 2],
            verb: [Some(8); 2],
            noun: [Some(8); 2],
            registers: [eights; 3],
        };
    }

    let mut registers = [RegisterField::default(); 3];
    for (idx, field) in registers.iter_mut().enumerate() {
        if let Some(r) = snapshot.register_digits(idx) {
            field.sign = if r.negative { Sign::Minus } else { Sign::Plus };
            for (slot, d) in field.digits.iter_mut().zip(r.digits.iter()) {
                *slot = Some(*d);
            }
        }
    }

    DisplayFields {
        prog: digits(&code_field(snapshot.major_mode)),
        verb: digits(&snapshot.verb),
        noun: digits(&snapshot.noun),
        registers,
    }
}

/// Every output word for a snapshot, in a fixed order
pub fn frame(snapshot: &ConsoleSnapshot) -> Frame {
    let a = &snapshot.annunciators;
    let mut relay_bits = 0;
    if a.no_att {
        relay_bits |= relay_lamps::NO_ATT;
    }
    if a.prog {
        relay_bits |= relay_lamps::PROG;
    }

    let mut lamp_bits = 0;
    for (lit, bit) in [
        (a.comp_acty, lamps::COMP_ACTY),
        (a.uplink_acty, lamps::UPLINK_ACTY),
        (a.key_rel, lamps::KEY_REL),
        (snapshot.flashing, lamps::VN_FLASH),
        (a.opr_err, lamps::OPR_ERR),
    ] {
        if lit {
            lamp_bits |= bit;
        }
    }

    let mut status_bits = 0;
    if a.stby {
        status_bits |= status_lamps::STBY;
    }

    let mut words = [Packet::new(0, 0); FRAME_WORDS];
    for (slot, word) in words.iter_mut().zip(display_fields(snapshot).relay_words().iter()) {
        *slot = Packet::new(channels::RELAYS, *word);
    }
    words[DIGIT_RELAYS] = Packet::new(channels::RELAYS, (relays::LAMPS << 11) | relay_bits);
    words[DIGIT_RELAYS + 1] = Packet::new(channels::LAMPS, lamp_bits);
    words[DIGIT_RELAYS + 2] = Packet::new(channels::STATUS_LAMPS, status_bits);
    words
}

// Forwards keypad packets from one DSKY client into the computer
fn uplink_thread(mut stream: TcpStream, keypad: Keypad) {
    let mut reader = PacketReader::new();
    let mut buf = [0u8; 64];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        for packet in reader.extend(&buf[..n]) {
            if let Some(code) = decode_input(&packet) {
                debug!("DSKY key {:?}", code);
                keypad.press(key(code));
            }
        }
    }
    info!("DSKY disconnected");
}

// Accepts one DSKY at a time and writes display packets to it
fn downlink_thread(listener: TcpListener, rx: Receiver<[u8; 4]>, keypad: Keypad, resync: Arc<AtomicBool>) {
    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("DSKY accept failed: {}", e);
                continue;
            }
        };
        info!("DSKY connected from {:?}", stream.peer_addr().ok());

        match stream.try_clone() {
            Ok(input) => {
                let keypad = keypad.clone();
                std::thread::spawn(move || uplink_thread(input, keypad));
            }
            Err(e) => warn!("DSKY keypad unavailable: {}", e),
        }

        // Drop words queued while nobody listened; the next refresh sends all
        let stale = rx.try_iter().count();
        debug!("Discarded {} queued DSKY packets", stale);
        resync.store(true, Ordering::SeqCst);

        loop {
            let msg = match rx.recv() {
                Ok(x) => x,
                Err(_) => return,
            };
            if stream.write_all(&msg).is_err() {
                break;
            }
        }
    }
}

/// yaDSKY-compatible console server. Display words go out on change only;
/// key presses come back through the computer's [`Keypad`].
pub struct DskyServer {
    tx: Sender<[u8; 4]>,
    last: Option<Frame>,
    resync: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl DskyServer {
    pub fn bind(addr: &str, keypad: Keypad) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        let (tx, rx) = bounded(DOWNLINK_DEPTH);
        let resync = Arc::new(AtomicBool::new(false));

        let flag = resync.clone();
        std::thread::spawn(move || downlink_thread(listener, rx, keypad, flag));
        info!("DSKY server listening on {}", addr);

        Ok(DskyServer {
            tx,
            last: None,
            resync,
            addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    // Drops the packet when the writer falls behind or no DSKY is connected;
    // the next refresh then sends the whole frame
    fn send(&self, packet: &Packet) {
        match self.tx.try_send(packet.encode()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.resync.store(true, Ordering::SeqCst),
            Err(TrySendError::Disconnected(_)) => warn!("DSKY writer stopped"),
        }
    }
}

impl ConsoleSink for DskyServer {
    fn refresh(&mut self, snapshot: &ConsoleSnapshot) {
        let next = frame(snapshot);
        let full = self.resync.swap(false, Ordering::SeqCst);

        for (idx, packet) in next.iter().enumerate() {
            let changed = self.last.map_or(true, |last| last[idx] != *packet);
            if full || changed {
                self.send(packet);
            }
        }
        self.last = Some(next);
    }
}
