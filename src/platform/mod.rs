//! Platform abstraction layer: filesystem capacity probing.

pub mod pal;
