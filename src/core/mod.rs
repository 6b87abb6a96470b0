//! Core types: errors, configuration snapshot, value parsing.

pub mod config;
pub mod errors;
pub mod parse;
