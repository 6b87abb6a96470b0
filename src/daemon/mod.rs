//! Runtime control: reconciliation, alerts, the reload scheduler, signal
//! handling and the `LoggerManager` tying them together.

pub mod alerts;
pub mod manager;
pub mod reconcile;
pub mod scheduler;
#[cfg(feature = "daemon")]
pub mod signals;
pub mod ticker;
