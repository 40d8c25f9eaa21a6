//! meter-costs: energy consumption costing poller.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod engine;
pub mod provider;
pub mod storage;
pub mod types;
