//! Filesystem monitoring: the disk guard that suspends file logging on low space.

pub mod disk_guard;
