//! Logging backend: severities, patterns, sinks, fan-out, registry and the logger handle.

pub mod console;
pub mod fanout;
pub mod flusher;
pub mod global;
pub mod handle;
pub mod level;
pub mod memory;
pub mod pattern;
pub mod registry;
pub mod rotating;
pub mod sink;
