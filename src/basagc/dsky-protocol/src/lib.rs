pub mod agc;
pub mod keys;
pub mod relay;
