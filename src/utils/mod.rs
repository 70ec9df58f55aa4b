//! Shared helpers for binaries and the orchestrator.

pub mod bootstrap;
pub mod retry;
