pub mod alarms;
pub mod computer;
pub mod config;
pub mod console;
pub mod constants;
pub mod error;
pub mod interpreter;
pub mod memory;
pub mod nouns;
pub mod programs;
pub mod scheduler;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
mod testing;

pub use computer::{Computer, Keypad};
pub use config::ComputerConfig;
pub use console::{Annunciators, ConsoleSink, ConsoleSnapshot};
pub use interpreter::Key;
