//! Core engine: the suggestion pipeline and the applier that turns
//! accepted suggestions into stored pricing rules.

pub mod applier;
pub mod pipeline;
