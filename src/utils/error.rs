use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Io,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CatalogError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CatalogError::ApiError(_) | CatalogError::HttpStatus { .. } => ErrorCategory::Network,
            CatalogError::CsvError(_) | CatalogError::SerializationError(_) => ErrorCategory::Data,
            CatalogError::ConfigError { .. }
            | CatalogError::InvalidConfigValueError { .. }
            | CatalogError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CatalogError::IoError(_) => ErrorCategory::Io,
            CatalogError::ValidationError { .. } => ErrorCategory::Validation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Validation => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// Whether a single fetch failing with this error should degrade the field
    /// it was fetching instead of failing the whole operation.
    ///
    /// Transport failures, timeouts, error statuses and undecodable bodies all
    /// come from the remote side and are recoverable. Configuration and local
    /// errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Data
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CatalogError::ApiError(e) if e.is_timeout() => {
                "The catalog service did not answer in time".to_string()
            }
            CatalogError::ApiError(_) => "Could not reach the catalog service".to_string(),
            CatalogError::HttpStatus { status, .. } => {
                format!("The catalog service rejected the request (HTTP {})", status)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the API base URL and your network connection",
            ErrorCategory::Data => "The service returned unexpected data; try again later",
            ErrorCategory::Configuration => "Review the configuration file and CLI flags",
            ErrorCategory::Io => "Check file paths and permissions",
            ErrorCategory::Validation => "Correct the input and retry",
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
