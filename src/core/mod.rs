//! Core application primitives (engines, orchestrators)

pub mod runtime;

pub use runtime::AlertRuntime;
