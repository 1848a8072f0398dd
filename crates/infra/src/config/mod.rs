//! Configuration loading
//!
//! Loads [`fieldsync_domain::Config`] from environment variables or a JSON /
//! TOML file.

pub mod loader;

pub use loader::{find_config_path, load, load_from_env, load_from_file, parse_config};
