//! Job requirements: ingestion workflows, queries and HTTP handlers.

pub mod handlers;
pub mod ingest;
pub mod queries;
