pub mod config;

pub use config::{ConfigError, DatabaseConfig, load_database_config};
