//! Shared storage integration tests.
//!
//! Tests the Storage interface against all implementations. Each backend
//! module connects a store and runs `run_storage_tests!` against it.

pub mod storage_tests;
