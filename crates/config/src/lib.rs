mod chain;
mod error;
mod log;
mod reconcile;

pub use chain::ChainConfig;
pub use error::ConfigError;
pub use log::LogConfig;
pub use reconcile::ReconcileConfig;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct IndexerConfig {
    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl IndexerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = envy::prefixed("IDX_").from_env::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.chain.validate()?;
        self.log.validate()?;
        self.reconcile.validate()?;
        Ok(())
    }
}
