//! Resumes and their tags: upload workflow, queries and HTTP handlers.

pub mod handlers;
pub mod ingest;
pub mod queries;
pub mod tags;
