/// Logging setup.
pub mod logging;
/// TOML configuration (`voxa.toml`).
pub mod toml_config;
