use crate::ConfigError;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Chain node WebSocket or HTTP URL
    ///
    /// Env: IDX_CHAIN_URL
    /// Valid schemes: ws://, wss://, http://, https://
    /// Default: ws://127.0.0.1:9944
    #[serde(default = "default_url")]
    pub url: String,

    /// Currency symbol attached to transfer records
    ///
    /// Env: IDX_CHAIN_CURRENCY
    /// Default: AVL
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_url() -> String {
    "ws://127.0.0.1:9944".to_string()
}

fn default_currency() -> String {
    "AVL".to_string()
}

impl ChainConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::ValidateError(
                "Chain URL cannot be empty".to_string(),
            ));
        }

        let valid_schemes = ["ws://", "wss://", "http://", "https://"];
        if !valid_schemes.iter().any(|s| self.url.starts_with(s)) {
            return Err(ConfigError::ValidateError(format!(
                "Invalid chain URL scheme '{}'. Must be one of: {}",
                self.url,
                valid_schemes.join(", ")
            )));
        }

        if self.currency.is_empty() {
            return Err(ConfigError::ValidateError(
                "Currency symbol cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            currency: default_currency(),
        }
    }
}
