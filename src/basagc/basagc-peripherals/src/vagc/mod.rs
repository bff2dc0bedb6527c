mod dsky;

pub use dsky::{display_fields, frame, DskyServer};
