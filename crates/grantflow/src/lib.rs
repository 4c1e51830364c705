//! Core engine for the grant intake platform.
//!
//! The heart of the crate is [`workflows::intake`]: consultant matching,
//! the append-only assignment ledger, the application state machine, and
//! the per-application collaboration room. Persistence, the consultant
//! directory, and notification delivery are consumed through traits so the
//! engine can be exercised in isolation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
