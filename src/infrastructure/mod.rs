//! Infrastructure layer - external concerns

pub mod completion;
pub mod crypto;
pub mod database;
pub mod telemetry;

pub use database::{init_database, DatabaseConfig};
pub use telemetry::{TelemetryConfig, TelemetryEmitter, TelemetryEvent, TelemetryHandle};
