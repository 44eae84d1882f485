//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the graphics system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A handle referenced a destroyed or recycled slot.
    #[error("stale {kind} handle (index {index}, generation {generation})")]
    StaleHandle {
        /// Resource kind name ("texture", "buffer", ...).
        kind: &'static str,
        /// Slot index of the offending handle.
        index: u32,
        /// Generation of the offending handle.
        generation: u32,
    },
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
