//! STAYRATE: nightly pricing suggestions for hospitality properties
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod pricing;
pub mod llm;
pub mod engine;
pub mod storage;
pub mod dashboard;
