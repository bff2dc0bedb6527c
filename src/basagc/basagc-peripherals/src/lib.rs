#[cfg(feature = "telemachus")]
pub mod ksp;

#[cfg(feature = "vagc-peripherals")]
pub mod vagc;
