#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use alloy::primitives::Address;
use serde_json::{json, Value};
use tiny_http::{Method, Response, Server, StatusCode};

use dao_connect_adapters::{
    AuthServiceAdapter, BackendSdkAdapter, ConnectAdapterConfig, WalletBridgeAdapter,
};
use dao_connect_core::{
    ConnectionCoordinator, ConnectionSession, NetworkCatalog, PresentationPort,
    RequiredParameterValidator, RequiredParameters,
};

pub struct MockServer {
    pub base_url: String,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

/// Serves every request through `handler(method, path, json_body)`. JSON-RPC
/// calls are logged by RPC method name, everything else by `METHOD path`.
pub fn spawn_mock_server<F>(handler: F) -> MockServer
where
    F: Fn(&Method, &str, &Value) -> (u16, Value) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let base_url = format!("http://{}", server.server_addr());
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&calls);

    thread::spawn(move || {
        for mut req in server.incoming_requests() {
            let mut raw = String::new();
            let _ = req.as_reader().read_to_string(&mut raw);
            let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
            let method = req.method().clone();
            let path = req.url().to_owned();
            let entry = match body.get("method").and_then(Value::as_str) {
                Some(rpc_method) => rpc_method.to_owned(),
                None => format!("{method} {path}"),
            };
            if let Ok(mut g) = log.lock() {
                g.push(entry);
            }

            let (code, payload) = handler(&method, &path, &body);
            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    MockServer { base_url, calls }
}

pub fn rpc_result(request: &Value, result: Value) -> (u16, Value) {
    (
        200,
        json!({ "jsonrpc": "2.0", "id": request["id"].clone(), "result": result }),
    )
}

pub fn rpc_error(request: &Value, code: i64, message: &str) -> (u16, Value) {
    (
        200,
        json!({
            "jsonrpc": "2.0",
            "id": request["id"].clone(),
            "error": { "code": code, "message": message }
        }),
    )
}

pub fn rpc_method(body: &Value) -> &str {
    body.get("method").and_then(Value::as_str).unwrap_or("")
}

pub fn wallet_account() -> Address {
    "0x3000000000000000000000000000000000000003"
        .parse()
        .expect("wallet account")
}

pub fn signature_hex(seed: u8) -> String {
    let mut sig = vec![seed; 65];
    sig[64] = 27;
    format!("0x{}", alloy::hex::encode(sig))
}

pub fn params() -> RequiredParameters {
    RequiredParameterValidator::validate(
        "organizationAddress=0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\
         &onboardingEntityAddress=0x1000000000000000000000000000000000000001&questId=7",
    )
    .parameters()
    .cloned()
    .expect("valid params")
}

pub fn catalog() -> NetworkCatalog {
    let contracts = json!({
        "organizationRegistry": "0x0000000000000000000000000000000000000011",
        "onboardingRegistry": "0x0000000000000000000000000000000000000012",
        "identityRegistry": "0x0000000000000000000000000000000000000013",
        "organizationTypeRegistry": "0x0000000000000000000000000000000000000014",
        "pluginRegistry": "0x0000000000000000000000000000000000000015"
    });
    NetworkCatalog::from_json(
        &json!([{
            "chainId": 80001,
            "name": "Mumbai",
            "rpcUrls": ["https://rpc-mumbai.example"],
            "explorerUrls": ["https://mumbai.polygonscan.com"],
            "nativeCurrency": { "name": "MATIC", "symbol": "MATIC", "decimals": 18 },
            "contracts": contracts
        }])
        .to_string(),
    )
    .expect("catalog")
}

#[derive(Debug, Default)]
pub struct NullPresentation {
    pub last: Mutex<Option<ConnectionSession>>,
}

impl PresentationPort for NullPresentation {
    fn on_connected(&self, session: &ConnectionSession) {
        if let Ok(mut g) = self.last.lock() {
            *g = Some(session.clone());
        }
    }

    fn on_disconnected(&self) {
        if let Ok(mut g) = self.last.lock() {
            *g = None;
        }
    }

    fn on_validation_failed(&self, _reason: &str) {}
}

pub type RuntimeCoordinator = ConnectionCoordinator<
    WalletBridgeAdapter,
    AuthServiceAdapter,
    BackendSdkAdapter,
    NullPresentation,
>;

pub fn deterministic_coordinator() -> RuntimeCoordinator {
    let cfg = ConnectAdapterConfig::default();
    ConnectionCoordinator::new(
        WalletBridgeAdapter::with_config(cfg.clone()),
        AuthServiceAdapter::with_config(cfg.clone()),
        BackendSdkAdapter::with_config(cfg),
        NullPresentation::default(),
        catalog(),
    )
}
