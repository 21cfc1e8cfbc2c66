//! Profiling support via Tracy.
//!
//! Export passes over large projects spend most of their time inside the
//! transpiler and the vendor compiler. Enable the `profiling` feature to see
//! per-stage spans in the [Tracy profiler](https://github.com/wolfpld/tracy):
//!
//! ```bash
//! cargo run -p shaderport-app --features profiling -- --project my_game
//! ```
//!
//! ```ignore
//! use shaderport_core::profiling::{profile_function, profile_scope};
//!
//! fn compile_entry() {
//!     profile_function!();
//!     {
//!         profile_scope!("transpile");
//!         // ...
//!     }
//! }
//! ```
//!
//! When the feature is disabled every macro expands to nothing.

#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, span};

/// Create a profiling span for the current scope.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span for the entire function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a profiling span for function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Span named after a cache entry. The name is allocated per call.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope_dynamic {
    ($name:expr) => {
        let _profile_span = $crate::profiling::Client::running()
            .map(|c| c.span_alloc(Some($name), "", file!(), line!(), 0));
    };
}

/// Span named at runtime (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope_dynamic {
    ($name:expr) => {
        let _ = $name;
    };
}

pub use profile_function;
pub use profile_scope;
pub use profile_scope_dynamic;
