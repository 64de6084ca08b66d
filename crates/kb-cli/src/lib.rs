//! kb-cli library: Exposes internal modules for testing.
//!
//! This is a thin library layer over the CLI components,
//! allowing integration tests to access internal types.

pub mod config;
pub mod list;
pub mod native_fs;
pub mod notion;
pub mod output;

// Re-export key types for convenience
pub use config::{Config, ConfigError};
pub use list::{ListEntry, list_entries};
pub use native_fs::NativeFs;
pub use notion::NotionGateway;
pub use output::OutputFormat;
