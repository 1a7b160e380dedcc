use crate::config::{
    DEFAULT_API_BASE_URL, DEFAULT_CART_KEY, DEFAULT_DATA_DIR, DEFAULT_DEBOUNCE_MS,
    DEFAULT_TIMEOUT_SECONDS, MAX_DEBOUNCE_MS,
};
use crate::core::slug::SlugNormalizer;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EstimatorError, Result};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_storage_key, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub storage: Option<StorageConfig>,
    pub estimation: Option<EstimationConfig>,
    /// 額外的 slug 別名（alias → canonical id）
    pub aliases: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
    pub cart_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    pub debounce_ms: Option<u64>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                timeout_seconds: None,
            },
            storage: None,
            estimation: None,
            aliases: None,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EstimatorError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EstimatorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_BASE_URL})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EstimatorError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        // 未設定的環境變數會原樣保留
        if let Some(var) = unresolved_env_var(&self.api.base_url) {
            return Err(EstimatorError::MissingConfigError {
                field: format!("api.base_url (environment variable {})", var),
            });
        }
        validate_url("api.base_url", &self.api.base_url)?;
        validate_positive_number("api.timeout_seconds", self.request_timeout_seconds(), 1)?;
        validate_path("storage.data_dir", self.data_dir())?;
        validate_storage_key("storage.cart_key", self.cart_key())?;
        validate_range(
            "estimation.debounce_ms",
            self.debounce_ms(),
            0,
            MAX_DEBOUNCE_MS,
        )?;

        // 別名表合併後必須封閉
        if let Some(aliases) = &self.aliases {
            SlugNormalizer::with_aliases(aliases)?;
        }

        Ok(())
    }
}

fn unresolved_env_var(value: &str) -> Option<&str> {
    let start = value.find("${")? + 2;
    let len = value[start..].find('}')?;
    Some(&value[start..start + len])
}

impl ConfigProvider for TomlConfig {
    fn api_base_url(&self) -> &str {
        &self.api.base_url
    }

    fn data_dir(&self) -> &str {
        self.storage
            .as_ref()
            .and_then(|s| s.data_dir.as_deref())
            .unwrap_or(DEFAULT_DATA_DIR)
    }

    fn cart_key(&self) -> &str {
        self.storage
            .as_ref()
            .and_then(|s| s.cart_key.as_deref())
            .unwrap_or(DEFAULT_CART_KEY)
    }

    fn debounce_ms(&self) -> u64 {
        self.estimation
            .as_ref()
            .and_then(|e| e.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    fn slug_aliases(&self) -> Option<&HashMap<String, String>> {
        self.aliases.as_ref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[api]
base_url = "https://studio.example.com/api/"
timeout_seconds = 10

[storage]
data_dir = "./state"
cart_key = "my_cart"

[estimation]
debounce_ms = 250

[aliases]
"brand-identity" = "logo-designing"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.api_base_url(), "https://studio.example.com/api/");
        assert_eq!(config.request_timeout_seconds(), 10);
        assert_eq!(config.data_dir(), "./state");
        assert_eq!(config.cart_key(), "my_cart");
        assert_eq!(config.debounce_ms(), 250);
        assert_eq!(
            config.slug_aliases().unwrap().get("brand-identity").map(String::as_str),
            Some("logo-designing")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("[api]\nbase_url = \"http://localhost:8000/api/\"\n").unwrap();

        assert_eq!(config.data_dir(), DEFAULT_DATA_DIR);
        assert_eq!(config.cart_key(), DEFAULT_CART_KEY);
        assert_eq!(config.debounce_ms(), DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.request_timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
        assert!(config.slug_aliases().is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SITE_ESTIMATOR_TEST_API", "https://test.api.com/api/");

        let toml_content = r#"
[api]
base_url = "${SITE_ESTIMATOR_TEST_API}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "https://test.api.com/api/");

        std::env::remove_var("SITE_ESTIMATOR_TEST_API");

        let unset = TomlConfig::from_toml_str("[api]\nbase_url = \"${SITE_ESTIMATOR_UNSET_VAR}\"\n").unwrap();
        assert_eq!(unset.api.base_url, "${SITE_ESTIMATOR_UNSET_VAR}");
        assert!(matches!(
            unset.validate(),
            Err(EstimatorError::MissingConfigError { ref field }) if field.contains("SITE_ESTIMATOR_UNSET_VAR")
        ));
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = TomlConfig::from_toml_str("[api]\nbase_url = \"invalid-url\"\n").unwrap();
        assert!(invalid_url.validate().is_err());

        let chained_alias = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "http://localhost:8000/api/"

[aliases]
"landing-pages" = "web-design"
"#,
        )
        .unwrap();
        assert!(matches!(
            chained_alias.validate(),
            Err(EstimatorError::InvalidConfigValueError { .. })
        ));

        let slow = TomlConfig::from_toml_str(
            "[api]\nbase_url = \"http://localhost:8000/api/\"\n\n[estimation]\ndebounce_ms = 60000\n",
        )
        .unwrap();
        assert!(slow.validate().is_err());
    }

    #[test]
    fn test_missing_api_section_is_a_parse_error() {
        let err = TomlConfig::from_toml_str("[storage]\ndata_dir = \"./x\"\n").unwrap_err();
        assert!(matches!(err, EstimatorError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[api]\nbase_url = \"https://api.example.com/\"\n\n[storage]\ncart_key = \"file_cart\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.cart_key(), "file_cart");
        assert_eq!(TomlConfig::default().api_base_url(), DEFAULT_API_BASE_URL);
    }
}
