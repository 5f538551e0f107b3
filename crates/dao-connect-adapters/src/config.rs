use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

impl RuntimeProfile {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(RuntimeProfile::Development),
            "production" | "prod" => Some(RuntimeProfile::Production),
            _ => None,
        }
    }
}

pub const ENV_RUNTIME_PROFILE: &str = "DAO_CONNECT_RUNTIME_PROFILE";
pub const ENV_EIP1193_PROXY_URL: &str = "DAO_CONNECT_EIP1193_PROXY_URL";
pub const ENV_RELAY_PROXY_URL: &str = "DAO_CONNECT_RELAY_PROXY_URL";
pub const ENV_AUTH_BASE_URL: &str = "DAO_CONNECT_AUTH_BASE_URL";
pub const ENV_RPC_CHECK: &str = "DAO_CONNECT_RPC_CHECK";
pub const ENV_HTTP_TIMEOUT_MS: &str = "DAO_CONNECT_HTTP_TIMEOUT_MS";
pub const ENV_NETWORKS: &str = "DAO_CONNECT_NETWORKS";

#[derive(Debug, Clone)]
pub struct ConnectAdapterConfig {
    pub runtime_profile: RuntimeProfile,
    pub eip1193_proxy_url: Option<String>,
    pub relay_proxy_url: Option<String>,
    pub auth_base_url: Option<String>,
    /// Verify contract code over RPC while initialising the SDK.
    pub rpc_check: bool,
    pub http_timeout_ms: u64,
    pub networks_path: Option<PathBuf>,
}

impl Default for ConnectAdapterConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            eip1193_proxy_url: None,
            relay_proxy_url: None,
            auth_base_url: None,
            rpc_check: false,
            http_timeout_ms: 15_000,
            networks_path: None,
        }
    }
}

impl ConnectAdapterConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let runtime_profile = match non_empty(ENV_RUNTIME_PROFILE) {
            Some(raw) => RuntimeProfile::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unknown runtime profile, using development");
                RuntimeProfile::Development
            }),
            None => defaults.runtime_profile,
        };
        let rpc_check = non_empty(ENV_RPC_CHECK)
            .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.rpc_check);
        let http_timeout_ms = non_empty(ENV_HTTP_TIMEOUT_MS)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.http_timeout_ms);

        Self {
            runtime_profile,
            eip1193_proxy_url: non_empty(ENV_EIP1193_PROXY_URL),
            relay_proxy_url: non_empty(ENV_RELAY_PROXY_URL),
            auth_base_url: non_empty(ENV_AUTH_BASE_URL),
            rpc_check,
            http_timeout_ms,
            networks_path: non_empty(ENV_NETWORKS).map(PathBuf::from),
        }
    }

    /// In production, adapters must talk to a real runtime and never fall
    /// back to deterministic behaviour.
    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(self.http_timeout_ms))
            .build()
    }
}
