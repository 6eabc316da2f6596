//! Binding and dispatch engine.
//!
//! Types and regular expressions, the mapping engine that binds payloads to
//! schemas, and the method dispatcher with its per-call context and
//! lifecycle hooks.

pub mod context;
pub mod dispatcher;
pub mod mapping;
pub mod method;
pub mod trigger;
pub mod types;
