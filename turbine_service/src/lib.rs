/// Wind turbine telemetry: ingestion of vendor CSV exports into PostgreSQL and
/// analytics (range queries, power curves, statistics) over the stored data.

pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod sources;
pub mod store;
