use std::path::Path;

use dao_connect_core::{NetworkCatalog, NetworkConfig};
use eyre::WrapErr;

/// Catalog compiled into the binary, used when no file is configured. Its
/// contract addresses are zero placeholders; deployments point
/// `DAO_CONNECT_NETWORKS` at a catalog with the real registries.
pub const BUILTIN_NETWORKS: &str = include_str!("networks.json");

/// Contracts left at the zero address.
pub fn placeholder_contracts(network: &NetworkConfig) -> Vec<&'static str> {
    network
        .contracts
        .iter()
        .filter(|(_, address)| address.is_zero())
        .map(|(name, _)| name)
        .collect()
}

pub fn load_catalog(path: Option<&Path>) -> eyre::Result<NetworkCatalog> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading network catalog {}", path.display()))?,
        None => BUILTIN_NETWORKS.to_owned(),
    };
    let catalog = NetworkCatalog::from_json(&raw)?;
    let default = catalog
        .default_network()
        .wrap_err("network catalog has no enabled network")?;
    tracing::info!(
        networks = catalog.networks().len(),
        default_chain = default.chain_id,
        "network catalog loaded"
    );
    let placeholders = placeholder_contracts(&default);
    if !placeholders.is_empty() {
        tracing::warn!(
            chain_id = default.chain_id,
            contracts = ?placeholders,
            "default network has placeholder contract addresses, set DAO_CONNECT_NETWORKS"
        );
    }
    Ok(catalog)
}
