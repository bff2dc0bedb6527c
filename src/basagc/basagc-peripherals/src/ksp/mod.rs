mod telemachus;

pub use telemachus::{command_key, field_map, parse_frame, TelemachusPort};
