use thiserror::Error;

use crate::domain::NetworkConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no enabled network in catalog")]
    NoNetworkAvailable,
    #[error("chain {0} is not in the network catalog")]
    UnknownChain(u64),
    #[error("chain {0} is disabled")]
    ChainDisabled(u64),
    #[error("invalid network catalog: {0}")]
    Invalid(String),
}

/// Supported chains in configuration order. Never mutated after load.
#[derive(Debug, Clone, Default)]
pub struct NetworkCatalog {
    networks: Vec<NetworkConfig>,
}

impl NetworkCatalog {
    pub fn new(networks: Vec<NetworkConfig>) -> Self {
        Self { networks }
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let networks: Vec<NetworkConfig> =
            serde_json::from_str(raw).map_err(|e| CatalogError::Invalid(e.to_string()))?;
        Ok(Self::new(networks))
    }

    pub fn networks(&self) -> &[NetworkConfig] {
        &self.networks
    }

    pub fn enabled(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.iter().filter(|n| !n.disabled)
    }

    pub fn default_network(&self) -> Result<NetworkConfig, CatalogError> {
        self.enabled()
            .next()
            .cloned()
            .ok_or(CatalogError::NoNetworkAvailable)
    }

    pub fn network(&self, chain_id: u64) -> Result<NetworkConfig, CatalogError> {
        let network = self
            .networks
            .iter()
            .find(|n| n.chain_id == chain_id)
            .ok_or(CatalogError::UnknownChain(chain_id))?;
        if network.disabled {
            return Err(CatalogError::ChainDisabled(chain_id));
        }
        Ok(network.clone())
    }

    /// Explicit preference if given, else the default network.
    pub fn resolve(&self, preference: Option<u64>) -> Result<NetworkConfig, CatalogError> {
        match preference {
            Some(chain_id) => self.network(chain_id),
            None => self.default_network(),
        }
    }
}
