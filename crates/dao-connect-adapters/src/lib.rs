pub mod auth;
pub mod bridge;
pub mod config;
pub mod eip1193;
pub mod relay;
mod rpc;
pub mod sdk;

pub use auth::AuthServiceAdapter;
pub use bridge::WalletBridgeAdapter;
pub use config::{ConnectAdapterConfig, RuntimeProfile};
pub use eip1193::Eip1193Adapter;
pub use relay::{RelayAdapter, RelaySession};
pub use rpc::{UNRECOGNIZED_CHAIN, USER_REJECTED};
pub use sdk::{BackendSdkAdapter, SdkBinding};
