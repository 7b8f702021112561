//! Application wiring
//!
//! - `config`: TOML-backed configuration types
//! - `loader`: layered config loading (embedded defaults, files, environment)
//! - `validation`: fail-fast checks and warnings
//! - `init`: builds the orchestrator and its collaborators

pub mod config;
pub mod init;
pub mod loader;
pub mod validation;

pub use config::AppConfig;
pub use init::{build_orchestrator, build_registry, build_store};
pub use loader::load_config;
