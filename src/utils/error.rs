use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API responded with status {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    HttpStatus { status: u16, message: Option<String> },

    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Storage error for key '{key}': {message}")]
    StorageError { key: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, EstimatorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Storage,
    Configuration,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EstimatorError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::HttpStatus { .. } | Self::SerializationError(_) => {
                ErrorCategory::Network
            }
            Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::IoError(_) | Self::StorageError { .. } => ErrorCategory::Storage,
            Self::UrlError(_)
            | Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } => ErrorCategory::Validation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Authentication => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// 傳輸層錯誤（網路或伺服器回應），使用者可重試
    pub fn is_transport(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Authentication
        )
    }

    /// 伺服器回傳的失敗原因（若有）
    pub fn server_reason(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the API base URL is reachable and try again",
            ErrorCategory::Authentication => "Sign in again to obtain a fresh token",
            ErrorCategory::Storage => "Check that the data directory exists and is writable",
            ErrorCategory::Configuration => "Review the configuration file and command-line flags",
            ErrorCategory::Validation => "Correct the highlighted field and retry",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message, .. } => message.clone(),
            Self::HttpStatus {
                message: Some(message),
                ..
            } => message.clone(),
            Self::HttpStatus { status, .. } => format!("The server rejected the request ({})", status),
            Self::ApiError(_) => "Could not reach the server".to_string(),
            Self::Unauthorized { .. } => "Your session has expired".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_includes_reason() {
        let err = EstimatorError::HttpStatus {
            status: 400,
            message: Some("Enter a valid email address.".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "API responded with status 400: Enter a valid email address."
        );

        let bare = EstimatorError::HttpStatus {
            status: 502,
            message: None,
        };
        assert_eq!(bare.to_string(), "API responded with status 502");
    }

    #[test]
    fn test_categories_and_severity() {
        let validation = EstimatorError::validation("name", "Please fill in all required fields.");
        assert_eq!(validation.category(), ErrorCategory::Validation);
        assert_eq!(validation.severity(), ErrorSeverity::Low);
        assert!(!validation.is_transport());
        assert_eq!(
            validation.user_friendly_message(),
            "Please fill in all required fields."
        );

        let http = EstimatorError::HttpStatus {
            status: 500,
            message: None,
        };
        assert!(http.is_transport());
        assert_eq!(http.server_reason(), None);
        assert_eq!(http.severity(), ErrorSeverity::Medium);

        let missing = EstimatorError::MissingConfigError {
            field: "api.base_url".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Configuration);
    }
}
