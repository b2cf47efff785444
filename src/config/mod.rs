#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command, FilterArgs, OutputFormat};
pub use toml_config::TomlConfig;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_positive_number, validate_required_field, validate_url, Validate,
};
use std::time::Duration;

/// Connection settings after merging the config file with command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub auth_token: Option<String>,
}

impl ApiSettings {
    /// Flags win over the file. The base URL must come from one of them.
    pub fn resolve(
        file: Option<&TomlConfig>,
        base_url: Option<&str>,
        timeout_seconds: Option<u64>,
        auth_token: Option<&str>,
    ) -> Result<Self> {
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| file.map(|f| f.api_base_url().to_string()));
        let base_url = validate_required_field("api.base_url", &base_url)?.clone();

        let timeout = match timeout_seconds {
            Some(seconds) => {
                validate_positive_number("timeout_seconds", seconds, 1)?;
                Duration::from_secs(seconds)
            }
            None => file.map(|f| f.request_timeout()).unwrap_or(Duration::from_secs(
                toml_config::DEFAULT_TIMEOUT_SECONDS,
            )),
        };

        let auth_token = auth_token
            .map(str::to_string)
            .or_else(|| file.and_then(|f| f.auth_token().map(str::to_string)));

        let settings = Self {
            base_url,
            timeout,
            auth_token,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl ConfigProvider for ApiSettings {
    fn api_base_url(&self) -> &str {
        &self.base_url
    }

    fn request_timeout(&self) -> Duration {
        self.timeout
    }

    fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}

impl Validate for ApiSettings {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.base_url)
    }
}
