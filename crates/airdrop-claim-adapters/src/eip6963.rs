//! EIP-6963 multi-wallet discovery.
//!
//! Wallets announce themselves with an `eip6963:announceProvider` event and re-announce
//! when the page dispatches `eip6963:requestProvider`.

use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use airdrop_claim_core::{DiscoveryPort, PortError, ProviderRegistry, WalletProviderInfo};

use crate::{ClaimAdapterConfig, Eip1193Adapter};

pub const ANNOUNCE_PROVIDER_EVENT: &str = "eip6963:announceProvider";
pub const REQUEST_PROVIDER_EVENT: &str = "eip6963:requestProvider";

const DEV_WALLET_UUID: &str = "7f3c1a52-9d0e-4b8a-a6f1-2c5d8e9b0a11";
const PROXY_WALLET_UUID: &str = "c2b8e4d6-13a7-4f59-8e0c-6a9d1f3b5e22";
const WALLET_ICON: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAxNiAxNiI+PGNpcmNsZSBjeD0iOCIgY3k9IjgiIHI9IjgiLz48L3N2Zz4=";

/// The `info` part of an announcement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAnnouncement {
    pub uuid: String,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub rdns: String,
}

impl ProviderAnnouncement {
    pub fn into_wallet<P>(self, handle: P) -> WalletProviderInfo<P> {
        WalletProviderInfo::new(self.uuid, self.name, self.icon, handle).with_rdns(self.rdns)
    }
}

/// Process-wide registry shared by the discovery listener and the UI.
pub fn global_registry() -> ProviderRegistry<Eip1193Adapter> {
    static REGISTRY: OnceLock<ProviderRegistry<Eip1193Adapter>> = OnceLock::new();
    REGISTRY.get_or_init(ProviderRegistry::new).clone()
}

/// Announces a fixed set of wallets every time discovery is requested.
///
/// Stands in for the browser event bus on native builds and in tests.
#[derive(Debug)]
pub struct StaticDiscovery<P> {
    wallets: Vec<WalletProviderInfo<P>>,
    registry: Mutex<Option<ProviderRegistry<P>>>,
}

impl<P> StaticDiscovery<P> {
    pub fn new(wallets: Vec<WalletProviderInfo<P>>) -> Self {
        Self {
            wallets,
            registry: Mutex::new(None),
        }
    }
}

impl StaticDiscovery<Eip1193Adapter> {
    /// The proxy wallet when one is configured, else the development wallet outside
    /// production. A production build without a wallet runtime announces nothing.
    pub fn from_config(config: &ClaimAdapterConfig) -> Self {
        let adapter = Eip1193Adapter::with_config(config);
        if adapter.is_disabled() {
            return Self::new(Vec::new());
        }
        let announcement = if config.eip1193_proxy_url.is_some() {
            ProviderAnnouncement {
                uuid: PROXY_WALLET_UUID.to_owned(),
                name: "EIP-1193 proxy wallet".to_owned(),
                icon: WALLET_ICON.to_owned(),
                rdns: "io.linera.airdrop.proxy".to_owned(),
            }
        } else {
            ProviderAnnouncement {
                uuid: DEV_WALLET_UUID.to_owned(),
                name: "Development wallet".to_owned(),
                icon: WALLET_ICON.to_owned(),
                rdns: "io.linera.airdrop.dev".to_owned(),
            }
        };
        Self::new(vec![announcement.into_wallet(adapter)])
    }
}

impl<P: Clone> DiscoveryPort<P> for StaticDiscovery<P> {
    fn listen(&self, registry: &ProviderRegistry<P>) -> Result<(), PortError> {
        let mut g = self
            .registry
            .lock()
            .map_err(|e| PortError::Transport(format!("discovery lock poisoned: {e}")))?;
        *g = Some(registry.clone());
        Ok(())
    }

    fn request_providers(&self) -> Result<(), PortError> {
        let registry = self
            .registry
            .lock()
            .map_err(|e| PortError::Transport(format!("discovery lock poisoned: {e}")))?
            .clone();
        let Some(registry) = registry else {
            debug!("provider request broadcast with no listener attached");
            return Ok(());
        };
        for wallet in &self.wallets {
            registry.announce(wallet.clone());
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use tracing::warn;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};

    use airdrop_claim_core::{DiscoveryPort, PortError, ProviderRegistry};

    use super::{ProviderAnnouncement, ANNOUNCE_PROVIDER_EVENT, REQUEST_PROVIDER_EVENT};
    use crate::Eip1193Adapter;

    thread_local! {
        static BROWSER_PROVIDERS: RefCell<HashMap<String, JsValue>> = RefCell::new(HashMap::new());
        static ANNOUNCE_LISTENER: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>> =
            const { RefCell::new(None) };
    }

    /// Discovery over the page's `window` event bus.
    #[derive(Debug, Clone)]
    pub struct BrowserDiscovery {
        timeout_ms: u64,
    }

    impl BrowserDiscovery {
        pub fn new(wallet_request_timeout_ms: u64) -> Self {
            Self {
                timeout_ms: wallet_request_timeout_ms,
            }
        }
    }

    impl DiscoveryPort<Eip1193Adapter> for BrowserDiscovery {
        fn listen(&self, registry: &ProviderRegistry<Eip1193Adapter>) -> Result<(), PortError> {
            let window =
                web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
            let registry = registry.clone();
            let timeout_ms = self.timeout_ms;
            let callback = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
                let Ok(event) = event.dyn_into::<web_sys::CustomEvent>() else {
                    return;
                };
                let detail = event.detail();
                let info = js_sys::Reflect::get(&detail, &JsValue::from_str("info"))
                    .unwrap_or(JsValue::UNDEFINED);
                let provider = js_sys::Reflect::get(&detail, &JsValue::from_str("provider"))
                    .unwrap_or(JsValue::UNDEFINED);
                if provider.is_undefined() || provider.is_null() {
                    warn!("ignoring provider announcement without a provider object");
                    return;
                }
                let announcement: ProviderAnnouncement = match serde_wasm_bindgen::from_value(info)
                {
                    Ok(a) => a,
                    Err(e) => {
                        warn!(error = %e, "ignoring malformed provider announcement");
                        return;
                    }
                };
                BROWSER_PROVIDERS.with(|providers| {
                    providers
                        .borrow_mut()
                        .entry(announcement.uuid.clone())
                        .or_insert(provider);
                });
                let handle = Eip1193Adapter::browser(&announcement.uuid, timeout_ms);
                registry.announce(announcement.into_wallet(handle));
            });

            window
                .add_event_listener_with_callback(
                    ANNOUNCE_PROVIDER_EVENT,
                    callback.as_ref().unchecked_ref(),
                )
                .map_err(|e| PortError::Transport(format!("register announce listener failed: {e:?}")))?;
            ANNOUNCE_LISTENER.with(|slot| *slot.borrow_mut() = Some(callback));
            Ok(())
        }

        fn request_providers(&self) -> Result<(), PortError> {
            let window =
                web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
            let event = web_sys::Event::new(REQUEST_PROVIDER_EVENT)
                .map_err(|e| PortError::Transport(format!("create request event failed: {e:?}")))?;
            window
                .dispatch_event(&event)
                .map_err(|e| PortError::Transport(format!("dispatch request event failed: {e:?}")))?;
            Ok(())
        }
    }

    pub(crate) fn browser_provider(uuid: &str) -> Result<JsValue, PortError> {
        BROWSER_PROVIDERS
            .with(|providers| providers.borrow().get(uuid).cloned())
            .ok_or_else(|| PortError::NotFound(format!("no announced provider with uuid {uuid}")))
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserDiscovery;
#[cfg(target_arch = "wasm32")]
pub(crate) use browser::browser_provider;
