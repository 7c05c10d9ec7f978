//! Integration tests for the suggestion pipeline and the applier.
//!
//! Everything runs in-process: a scripted advisor stands in for the
//! model, `mockall` mocks the rule sink, and SQLite runs in memory.

mod apply_flow;
mod mock_advisor;
mod pipeline_flow;
