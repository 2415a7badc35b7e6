//! Resume-to-job match scoring.

pub mod handlers;
pub mod queries;
pub mod workflow;
