//! # Nightshade Core
//!
//! Core crate for Nightshade Engine basic utilities.

pub mod pool;
pub mod profiling;
pub mod task;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core subsystem.
pub fn init() {
    log::info!("Nightshade Core v{} initialized", VERSION);
}
