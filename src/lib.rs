//! TPC-C workload driver.
//!
//! Runs the five TPC-C transaction profiles against a pluggable storage
//! backend:
//!
//! - [`storage`]: the `Storage` contract and its backends (in-memory,
//!   SQLite, PostgreSQL, Elasticsearch)
//! - [`executor`]: the per-worker orchestrator with its retry loop and
//!   load-phase batch buffer
//! - [`models`]: TPC-C entities
//! - [`config`]: layered YAML / environment configuration

pub mod config;
pub mod executor;
pub mod models;
pub mod storage;
pub mod utils;
