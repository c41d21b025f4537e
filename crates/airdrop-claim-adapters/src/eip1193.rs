use std::str::FromStr;
use std::sync::{Arc, Mutex};

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde_json::Value;
use tracing::debug;

use airdrop_claim_core::ports::{
    parse_accounts, sign_typed_data_params, METHOD_REQUEST_ACCOUNTS, METHOD_SIGN_TYPED_DATA_V4,
};
use airdrop_claim_core::{ClaimEnvelope, ExternalAccountAddress, PortError, ProviderPort};

use crate::ClaimAdapterConfig;

/// Key of the built-in development wallet (the first well-known Anvil/Hardhat account).
/// Never holds funds; only used when no real wallet runtime is configured.
const DEV_WALLET_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// EIP-1193 error code for a request the user declined.
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic(PrivateKeySigner),
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser { uuid: String, timeout_ms: u64 },
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct ProxyRuntime {
    base_url: String,
    timeout_ms: u64,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Clone, Default)]
struct ProviderState {
    accounts: Vec<ExternalAccountAddress>,
    request_seq: u64,
}

impl Eip1193Adapter {
    pub fn with_config(config: &ClaimAdapterConfig) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(ref base_url) = config.eip1193_proxy_url {
            return Self::proxy(base_url, config.wallet_request_timeout_ms);
        }

        if config.strict_runtime_required() {
            Self::disabled("EIP-1193 wallet runtime not configured in production runtime profile")
        } else {
            Self::deterministic()
        }
    }

    /// Built-in development wallet producing real EIP-712 signatures over claim envelopes.
    pub fn deterministic() -> Self {
        match PrivateKeySigner::from_str(DEV_WALLET_KEY) {
            Ok(signer) => Self::from_mode(ProviderMode::Deterministic(signer)),
            Err(e) => Self::disabled(format!("development wallet key rejected: {e}")),
        }
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::from_mode(ProviderMode::Disabled(reason.into()))
    }

    /// Forwards JSON-RPC requests to a wallet bridge listening at `base_url`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn proxy(base_url: &str, timeout_ms: u64) -> Self {
        let timeout = std::time::Duration::from_millis(timeout_ms);
        match reqwest::blocking::Client::builder().timeout(timeout).build() {
            Ok(client) => Self::from_mode(ProviderMode::Proxy(ProxyRuntime {
                base_url: base_url.to_owned(),
                timeout_ms,
                client,
            })),
            Err(e) => Self::disabled(format!("failed to initialize EIP-1193 proxy client: {e}")),
        }
    }

    /// Wraps the wallet object announced over EIP-6963 under `uuid`.
    #[cfg(target_arch = "wasm32")]
    pub fn browser(uuid: &str, timeout_ms: u64) -> Self {
        Self::from_mode(ProviderMode::Browser {
            uuid: uuid.to_owned(),
            timeout_ms,
        })
    }

    fn from_mode(mode: ProviderMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.mode, ProviderMode::Disabled(_))
    }

    /// Accounts returned by the last successful `eth_requestAccounts`.
    pub fn connected_accounts(&self) -> Result<Vec<ExternalAccountAddress>, PortError> {
        let g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))?;
        Ok(g.accounts.clone())
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn next_request_id(&self) -> Result<u64, PortError> {
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))?;
        g.request_seq = g.request_seq.saturating_add(1);
        Ok(g.request_seq)
    }

    fn record_accounts(&self, accounts: &[ExternalAccountAddress]) -> Result<(), PortError> {
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))?;
        g.accounts = accounts.to_vec();
        Ok(())
    }

    fn deterministic_request(
        &self,
        signer: &PrivateKeySigner,
        method: &str,
        params: &Value,
    ) -> Result<Value, PortError> {
        let account = signer.address().to_string();
        match method {
            METHOD_REQUEST_ACCOUNTS | "eth_accounts" => Ok(serde_json::json!([account])),
            "eth_chainId" => Ok(serde_json::json!("0x1")),
            METHOD_SIGN_TYPED_DATA_V4 => {
                let requested = params
                    .get(0)
                    .and_then(Value::as_str)
                    .map(ExternalAccountAddress::parse)
                    .transpose()?
                    .ok_or_else(|| PortError::Validation("missing signer account".to_owned()))?;
                if !requested.same_account(signer.address()) {
                    return Err(PortError::Validation(format!(
                        "development wallet cannot sign for {requested}"
                    )));
                }
                let typed_data = match params.get(1) {
                    Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|e| {
                        PortError::Validation(format!("typed data is not JSON: {e}"))
                    })?,
                    Some(value) => value.clone(),
                    None => return Err(PortError::Validation("missing typed data".to_owned())),
                };
                let envelope = ClaimEnvelope::from_json(&typed_data)?;
                let signature = signer
                    .sign_hash_sync(&envelope.signing_hash())
                    .map_err(|e| PortError::Transport(format!("development signing failed: {e}")))?;
                Ok(Value::String(format!(
                    "0x{}",
                    alloy::hex::encode(signature.as_bytes())
                )))
            }
            _ => Err(PortError::NotImplemented(
                "development wallet only supports accounts and claim signing",
            )),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn proxy_call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let proxy = match &self.mode {
            ProviderMode::Proxy(proxy) => proxy,
            ProviderMode::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
            _ => {
                return Err(PortError::NotImplemented(
                    "eip1193 proxy runtime not enabled",
                ))
            }
        };

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_request_id()?,
            "method": method,
            "params": params,
        });
        let response = proxy
            .client
            .post(&proxy.base_url)
            .json(&payload)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    PortError::Timeout(proxy.timeout_ms)
                } else {
                    PortError::Transport(format!("eip1193 proxy request failed: {e}"))
                }
            })?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| PortError::Transport(format!("eip1193 proxy json decode failed: {e}")))?;
        if let Some(err) = body.get("error") {
            return Err(rpc_error(err));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "eip1193 proxy status {status}: {body}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport("eip1193 proxy missing result".to_owned()))
    }

    /// Async request path for wallets living in the page. Other modes answer inline.
    #[cfg(target_arch = "wasm32")]
    pub async fn wasm_request_async(&self, method: &str, params: Value) -> Result<Value, PortError> {
        use wasm_bindgen::JsCast;

        self.check_mode()?;
        let (uuid, timeout_ms) = match &self.mode {
            ProviderMode::Browser { uuid, timeout_ms } => (uuid.clone(), *timeout_ms),
            _ => return self.request(method, params),
        };
        self.next_request_id()?;

        let provider = crate::eip6963::browser_provider(&uuid)?;
        let request_fn = js_sys::Reflect::get(&provider, &wasm_bindgen::JsValue::from_str("request"))
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
            .ok_or(PortError::NotImplemented("provider.request is unavailable"))?;

        let request = serde_json::json!({
            "method": method,
            "params": params,
        });
        let request_js = serde_wasm_bindgen::to_value(&request)
            .map_err(|e| PortError::Transport(format!("failed to encode wasm request: {e}")))?;
        let promise_js = request_fn.call1(&provider, &request_js).map_err(|e| {
            PortError::Transport(format!("provider request dispatch failed: {e:?}"))
        })?;
        let promise = promise_js.dyn_into::<js_sys::Promise>().map_err(|_| {
            PortError::Transport("provider request did not return Promise".to_owned())
        })?;
        let result_js = wasm_bindgen_futures::JsFuture::from(with_timeout(promise, timeout_ms))
            .await
            .map_err(|e| js_rpc_error(&e, timeout_ms))?;
        serde_wasm_bindgen::from_value(result_js)
            .map_err(|e| PortError::Transport(format!("failed to decode wasm response: {e}")))
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn wasm_request_accounts_async(
        &self,
    ) -> Result<Vec<ExternalAccountAddress>, PortError> {
        let result = self
            .wasm_request_async(METHOD_REQUEST_ACCOUNTS, serde_json::json!([]))
            .await?;
        let accounts = parse_accounts(&result)?;
        self.record_accounts(&accounts)?;
        Ok(accounts)
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn wasm_sign_typed_data_async(
        &self,
        account: &ExternalAccountAddress,
        typed_data: &Value,
    ) -> Result<String, PortError> {
        let result = self
            .wasm_request_async(
                METHOD_SIGN_TYPED_DATA_V4,
                sign_typed_data_params(account, typed_data)?,
            )
            .await?;
        airdrop_claim_core::ports::parse_signature(&result)
    }
}

impl ProviderPort for Eip1193Adapter {
    fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        self.check_mode()?;
        debug!(method, "eip1193 request");

        match &self.mode {
            ProviderMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            ProviderMode::Deterministic(signer) => {
                self.next_request_id()?;
                self.deterministic_request(signer, method, &params)
            }
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => self.proxy_call(method, params),
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser { .. } => Err(PortError::NotImplemented(
                "wasm sync request is unavailable; use wasm_request_async",
            )),
        }
    }

    fn request_accounts(&self) -> Result<Vec<ExternalAccountAddress>, PortError> {
        let result = self.request(METHOD_REQUEST_ACCOUNTS, serde_json::json!([]))?;
        let accounts = parse_accounts(&result)?;
        self.record_accounts(&accounts)?;
        Ok(accounts)
    }

    fn sign_typed_data(
        &self,
        account: &ExternalAccountAddress,
        typed_data: &Value,
    ) -> Result<String, PortError> {
        let result = self.request(
            METHOD_SIGN_TYPED_DATA_V4,
            sign_typed_data_params(account, typed_data)?,
        )?;
        airdrop_claim_core::ports::parse_signature(&result)
    }
}

fn rpc_error(err: &Value) -> PortError {
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| err.to_string());
    match err.get("code").and_then(Value::as_i64) {
        Some(USER_REJECTED_CODE) => PortError::Rejected(message),
        _ => PortError::Transport(format!("eip1193 proxy returned error: {message}")),
    }
}

#[cfg(target_arch = "wasm32")]
const TIMEOUT_SENTINEL: &str = "airdrop-claim:wallet-timeout";

#[cfg(target_arch = "wasm32")]
fn with_timeout(promise: js_sys::Promise, timeout_ms: u64) -> js_sys::Promise {
    let timeout = js_sys::Promise::new(&mut |_resolve, reject| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_1(
                &reject,
                i32::try_from(timeout_ms).unwrap_or(i32::MAX),
                &wasm_bindgen::JsValue::from_str(TIMEOUT_SENTINEL),
            );
        }
    });
    js_sys::Promise::race(&js_sys::Array::of2(&promise, &timeout))
}

#[cfg(target_arch = "wasm32")]
fn js_rpc_error(err: &wasm_bindgen::JsValue, timeout_ms: u64) -> PortError {
    if err.as_string().as_deref() == Some(TIMEOUT_SENTINEL) {
        return PortError::Timeout(timeout_ms);
    }
    match serde_wasm_bindgen::from_value::<Value>(err.clone()) {
        Ok(value) if value.is_object() => rpc_error(&value),
        _ => PortError::Transport(format!("provider request rejected: {err:?}")),
    }
}
