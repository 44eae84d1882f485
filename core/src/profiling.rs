//! Profiling support via Tracy.
//!
//! Optional instrumentation using the [Tracy profiler](https://github.com/wolfpld/tracy),
//! enabled through the `profiling` Cargo feature:
//!
//! ```toml
//! [dependencies]
//! nightshade-core = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! Use the macros to instrument code:
//!
//! ```ignore
//! use nightshade_core::{profile_function, profile_scope};
//!
//! fn compile_frame() {
//!     profile_function!();
//!     {
//!         profile_scope!("topological_sort");
//!         // ... do work ...
//!     }
//! }
//! ```
//!
//! When profiling is disabled (the default), all macros compile to no-ops
//! with zero runtime overhead.

// Re-export tracy-client types when profiling is enabled
#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, Span, frame_mark as tracy_frame_mark, span};

/// Profile a named scope until the end of the enclosing block.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profiling_span = $crate::profiling::span!($name);
    };
}

/// Profile a named scope (no-op when profiling is disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Profile the current function until it returns.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profiling_span = $crate::profiling::span!();
    };
}

/// Profile the current function (no-op when profiling is disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Mark a frame boundary for frame-time analysis.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark();
    };
}

/// Mark a frame boundary (no-op when profiling is disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}
