//! Recruitment plans, written directly or generated from match results.

pub mod handlers;
pub mod queries;
pub mod workflow;
