use crate::config::{
    DEFAULT_API_BASE_URL, DEFAULT_CART_KEY, DEFAULT_DATA_DIR, DEFAULT_DEBOUNCE_MS,
    DEFAULT_TIMEOUT_SECONDS, MAX_DEBOUNCE_MS,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_storage_key, validate_url,
    Validate,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "site-estimator")]
#[command(about = "Estimate service prices, build a cart and send it as an inquiry")]
pub struct CliConfig {
    #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    #[arg(long, default_value = DEFAULT_DATA_DIR, help = "Directory holding the cart and tokens")]
    pub data_dir: String,

    #[arg(long, default_value = DEFAULT_CART_KEY)]
    pub cart_key: String,

    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    #[arg(long, help = "TOML configuration file (replaces the flags above)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show the inputs a service's estimate form collects
    Inputs { slug: String },

    /// Calculate an estimate, optionally overriding inputs
    Estimate {
        slug: String,
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_value)]
        overrides: Vec<(String, String)>,
    },

    /// Calculate an estimate and add it to the cart
    Add {
        slug: String,
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_value)]
        overrides: Vec<(String, String)>,
    },

    /// Inspect or change the cart
    #[command(subcommand)]
    Cart(CartCommand),

    /// Send the cart as an estimation request
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long, default_value = "")]
        message: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CartCommand {
    List,
    /// Remove the item at a 1-based position
    Remove { position: usize },
    Clear,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

impl ConfigProvider for CliConfig {
    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn cart_key(&self) -> &str {
        &self.cart_key
    }

    fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_base_url", &self.api_base_url)?;
        validate_path("data_dir", &self.data_dir)?;
        validate_storage_key("cart_key", &self.cart_key)?;
        validate_positive_number("timeout_seconds", self.timeout_seconds, 1)?;
        validate_range("debounce_ms", self.debounce_ms, 0, MAX_DEBOUNCE_MS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides_parse() {
        let config = CliConfig::try_parse_from([
            "site-estimator",
            "estimate",
            "web-design",
            "--set",
            "pages=3",
            "--set",
            "features.cms = true",
        ])
        .unwrap();

        assert_eq!(config.cart_key, DEFAULT_CART_KEY);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(config.validate().is_ok());
        match config.command {
            Command::Estimate { slug, overrides } => {
                assert_eq!(slug, "web-design");
                assert_eq!(
                    overrides,
                    vec![
                        ("pages".to_string(), "3".to_string()),
                        ("features.cms".to_string(), "true".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cart_subcommands() {
        let config =
            CliConfig::try_parse_from(["site-estimator", "cart", "remove", "2"]).unwrap();
        assert!(matches!(
            config.command,
            Command::Cart(CartCommand::Remove { position: 2 })
        ));
    }

    #[test]
    fn test_malformed_override_rejected() {
        assert!(parse_key_value("pages").is_err());
        assert!(parse_key_value("=3").is_err());
        assert_eq!(
            parse_key_value("platform=both").unwrap(),
            ("platform".to_string(), "both".to_string())
        );
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let mut config = CliConfig::try_parse_from(["site-estimator", "cart", "list"]).unwrap();
        config.cart_key = "../escape".to_string();
        assert!(config.validate().is_err());

        config.cart_key = DEFAULT_CART_KEY.to_string();
        config.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }
}
