#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CartCommand, CliConfig, Command};
pub use toml_config::TomlConfig;

pub use crate::adapters::http::DEFAULT_API_BASE_URL;
pub use crate::core::calculator::DEFAULT_DEBOUNCE_MS;
pub use crate::core::cart::DEFAULT_CART_KEY;

pub const DEFAULT_DATA_DIR: &str = "./.site-estimator";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_DEBOUNCE_MS: u64 = 10_000;
