//! # opmetrics
//!
//! Operation metrics collection service: clients submit timed operation
//! records per project, users filter, aggregate, chart and export them.
//!
//! ## Architecture
//!
//! - **domain**: entities, the filter compiler and repository traits
//! - **application**: use cases (identity, projects, ingest, query,
//!   aggregation and charting, query suggestions)
//! - **infrastructure**: SeaORM persistence, crypto, telemetry and the
//!   completion client
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: process lifecycle shared by the CLI

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

pub use infrastructure::{init_database, DatabaseConfig};

pub use interfaces::http::create_api_router;
