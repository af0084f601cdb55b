use crate::error::{Result, TrainerError};
use serde::{Deserialize, Serialize};
use std::env;

pub const TRACKING_URI_VAR: &str = "MLFLOW_TRACKING_URI";
pub const TRACKING_USERNAME_VAR: &str = "MLFLOW_TRACKING_USERNAME";
pub const TRACKING_PASSWORD_VAR: &str = "MLFLOW_TRACKING_PASSWORD";

/// Connection settings for a remote tracking server. Passed explicitly to the
/// tracker; never installed as process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub tracking_uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub experiment_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_uri: "http://localhost:5000".to_string(),
            username: None,
            password: None,
            experiment_name: "Default".to_string(),
        }
    }
}

impl TrackingConfig {
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    /// Read `MLFLOW_TRACKING_URI` (required) and the optional
    /// `MLFLOW_TRACKING_USERNAME` / `MLFLOW_TRACKING_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tracking_uri = lookup(TRACKING_URI_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| TrainerError::ConfigError(format!("{} is not set", TRACKING_URI_VAR)))?;

        Ok(Self {
            tracking_uri,
            username: lookup(TRACKING_USERNAME_VAR),
            password: lookup(TRACKING_PASSWORD_VAR),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (TRACKING_URI_VAR, "https://tracking.example.com"),
            (TRACKING_USERNAME_VAR, "ci"),
            (TRACKING_PASSWORD_VAR, "secret"),
        ]
        .into_iter()
        .collect();

        let config = TrackingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.tracking_uri, "https://tracking.example.com");
        assert_eq!(config.username.as_deref(), Some("ci"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.experiment_name, "Default");
    }

    #[test]
    fn test_missing_uri_is_config_error() {
        let err = TrackingConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, TrainerError::ConfigError(_)));
    }
}
