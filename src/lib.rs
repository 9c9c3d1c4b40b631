//! STAKER: rule-driven bet selection for instant-virtual football
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod alerts;
pub mod config;
pub mod engine;
pub mod feed;
pub mod storage;
pub mod strategy;
pub mod types;
