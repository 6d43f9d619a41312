use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::LedgerError;

/// Everything a request needs to know about who is calling and where.
///
/// Passed explicitly to [`super::HttpInventoryClient`]; there is no global session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    base_url: String,
    operator: Option<String>,
    timeout: Option<Duration>,
}

impl Session {
    pub fn new(base_url: &str) -> Result<Self, LedgerError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| {
            LedgerError::Validation(format!("invalid server url '{}': {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LedgerError::Validation(format!(
                "server url must be http(s): {}",
                base_url
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            operator: None,
            timeout: None,
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, LedgerError> {
        let mut session = Self::new(&cfg.server_url)?;
        session.operator = cfg
            .operator
            .as_deref()
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .map(str::to_string);
        session.timeout = cfg.request_timeout();
        Ok(session)
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
