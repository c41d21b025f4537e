//! Bridge between the egui form and the claim workspace crates.
//! The form never talks to the adapters directly.

use std::sync::Arc;

use airdrop_claim_adapters::{
    global_registry, ClaimAdapterConfig, Eip1193Adapter, GraphQlClaimAdapter,
};
use airdrop_claim_core::{
    ClaimDestination, ClaimReceipt, ExternalAccountAddress, Orchestrator, PortError,
    ProvidersSnapshot, SessionState, Subscription,
};

type ClaimOrchestrator = Orchestrator<Eip1193Adapter, GraphQlClaimAdapter>;

#[derive(Clone)]
pub struct ClaimBridge {
    orchestrator: Arc<ClaimOrchestrator>,
    config: ClaimAdapterConfig,
}

impl ClaimBridge {
    pub fn new(config: ClaimAdapterConfig) -> Self {
        let orchestrator = ClaimOrchestrator::new(
            global_registry(),
            GraphQlClaimAdapter::with_config(&config),
            config.app_id.clone(),
            config.destination(),
        );
        Self {
            orchestrator: Arc::new(orchestrator),
            config,
        }
    }

    /// Starts listening for wallet announcements and asks wallets to announce.
    pub fn start_discovery(&self) -> Result<(), PortError> {
        #[cfg(target_arch = "wasm32")]
        let discovery =
            airdrop_claim_adapters::BrowserDiscovery::new(self.config.wallet_request_timeout_ms);
        #[cfg(not(target_arch = "wasm32"))]
        let discovery = airdrop_claim_adapters::StaticDiscovery::from_config(&self.config);

        self.orchestrator.registry.initialize(&discovery)?;
        self.orchestrator.sync_providers()?;
        Ok(())
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription<Eip1193Adapter>
    where
        F: Fn(&ProvidersSnapshot<Eip1193Adapter>) + Send + Sync + 'static,
    {
        self.orchestrator.registry.subscribe(listener)
    }

    pub fn providers(&self) -> ProvidersSnapshot<Eip1193Adapter> {
        self.orchestrator.registry.snapshot()
    }

    pub fn sync_providers(&self) -> Result<SessionState, PortError> {
        self.orchestrator.sync_providers()
    }

    pub fn session_state(&self) -> Result<SessionState, PortError> {
        self.orchestrator.session_state()
    }

    pub fn account(&self) -> Option<ExternalAccountAddress> {
        self.orchestrator.account().ok().flatten()
    }

    pub fn destination(&self) -> &ClaimDestination {
        self.orchestrator.destination()
    }

    pub fn app_id(&self) -> &str {
        self.orchestrator.app_id()
    }

    pub fn config(&self) -> &ClaimAdapterConfig {
        &self.config
    }

    pub fn claim_enabled(&self, api_token: &str) -> bool {
        self.orchestrator.claim_enabled(api_token)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn authorize(&self) -> Result<Option<ExternalAccountAddress>, PortError> {
        self.orchestrator.authorize()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn claim(&self, api_token: &str) -> Result<ClaimReceipt, PortError> {
        self.orchestrator.claim(api_token)
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn authorize_async(&self) -> Result<Option<ExternalAccountAddress>, PortError> {
        match self.orchestrator.begin_authorization()? {
            Some(provider) => {
                let result = provider.wasm_request_accounts_async().await;
                self.orchestrator.complete_authorization(result)
            }
            None => self.orchestrator.account(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn claim_async(&self, api_token: &str) -> Result<ClaimReceipt, PortError> {
        let prepared = self.orchestrator.prepare_claim(api_token)?;
        let signature = prepared
            .provider
            .wasm_sign_typed_data_async(&prepared.account, &prepared.typed_data)
            .await;
        let variables = self.orchestrator.signed_claim(prepared, signature)?;
        let result = self
            .orchestrator
            .service
            .wasm_submit_claim_async(&variables)
            .await;
        self.orchestrator.complete_claim(result)
    }
}
