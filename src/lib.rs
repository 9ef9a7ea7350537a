pub mod config;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod gtfs;
pub mod infra;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod proximity;
pub mod report;
pub mod services;
pub mod transform;
