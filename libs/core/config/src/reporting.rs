use crate::{env_optional, ConfigError, FromEnv};

/// Error-reporting sink configuration
#[derive(Clone, Debug, Default)]
pub struct ReportingConfig {
    /// HTTP endpoint receiving JSON error reports. `None` keeps reports in the log.
    pub endpoint: Option<String>,
}

impl ReportingConfig {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { endpoint }
    }
}

impl FromEnv for ReportingConfig {
    /// ERROR_REPORTING_URL is optional; when set it must be an http(s) URL
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env_optional("ERROR_REPORTING_URL");

        if let Some(url) = &endpoint {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::parse(
                    "ERROR_REPORTING_URL",
                    format!("'{}' is not an http(s) URL", url),
                ));
            }
        }

        Ok(Self { endpoint })
    }
}
