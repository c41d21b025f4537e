#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde_json::{json, Value};

use airdrop_claim_core::{
    ClaimEnvelope, ClaimMutationVariables, ClaimReceipt, ClaimServicePort, DiscoveryPort,
    PortError, ProviderPort, ProviderRegistry, WalletProviderInfo,
};

pub const ACCOUNT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub fn signer(key: &str) -> PrivateKeySigner {
    PrivateKeySigner::from_str(key).expect("valid test key")
}

#[derive(Debug)]
struct MockState {
    accounts: Result<Vec<String>, PortError>,
    signer: PrivateKeySigner,
    reject_signing: bool,
    calls: Vec<String>,
}

/// In-memory wallet answering `eth_requestAccounts` and `eth_signTypedData_v4`.
#[derive(Debug, Clone)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub fn with_accounts(accounts: Vec<&str>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                accounts: Ok(accounts.into_iter().map(str::to_owned).collect()),
                signer: signer(ACCOUNT_KEY),
                reject_signing: false,
                calls: Vec::new(),
            })),
        }
    }

    /// Wallet whose account is the address of `key`.
    pub fn signing_with(key: &str) -> Self {
        let address = signer(key).address().to_string();
        let provider = Self::with_accounts(vec![address.as_str()]);
        provider.state.lock().expect("mock lock").signer = signer(key);
        provider
    }

    pub fn failing(error: PortError) -> Self {
        let provider = Self::with_accounts(vec![]);
        provider.state.lock().expect("mock lock").accounts = Err(error);
        provider
    }

    pub fn set_signer(&self, key: &str) {
        self.state.lock().expect("mock lock").signer = signer(key);
    }

    pub fn reject_signing(&self) {
        self.state.lock().expect("mock lock").reject_signing = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("mock lock").calls.clone()
    }
}

impl ProviderPort for MockProvider {
    fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let mut g = self.state.lock().expect("mock lock");
        g.calls.push(method.to_owned());
        match method {
            "eth_requestAccounts" => g.accounts.clone().map(|a| json!(a)),
            "eth_signTypedData_v4" => {
                if g.reject_signing {
                    return Err(PortError::Rejected("User rejected the request.".to_owned()));
                }
                let raw = params[1].as_str().expect("typed data is passed as a string");
                let typed: Value = serde_json::from_str(raw).expect("typed data json");
                let envelope = ClaimEnvelope::from_json(&typed)?;
                let signature = g
                    .signer
                    .sign_hash_sync(&envelope.signing_hash())
                    .expect("sign");
                Ok(json!(format!("0x{}", alloy::hex::encode(signature.as_bytes()))))
            }
            _ => Err(PortError::NotImplemented("mock method")),
        }
    }
}

pub fn wallet(uuid: &str, provider: MockProvider) -> WalletProviderInfo<MockProvider> {
    WalletProviderInfo::new(uuid, format!("Wallet {uuid}"), "data:image/svg+xml,<svg/>", provider)
}

/// Announces a fixed set of wallets whenever a request is broadcast.
#[derive(Debug, Default)]
pub struct FakeDiscovery {
    pub wallets: Vec<WalletProviderInfo<MockProvider>>,
    registry: Mutex<Option<ProviderRegistry<MockProvider>>>,
    pub listen_calls: Mutex<u32>,
    pub request_calls: Mutex<u32>,
}

impl FakeDiscovery {
    pub fn new(wallets: Vec<WalletProviderInfo<MockProvider>>) -> Self {
        Self {
            wallets,
            ..Self::default()
        }
    }
}

impl DiscoveryPort<MockProvider> for FakeDiscovery {
    fn listen(&self, registry: &ProviderRegistry<MockProvider>) -> Result<(), PortError> {
        *self.listen_calls.lock().expect("lock") += 1;
        *self.registry.lock().expect("lock") = Some(registry.clone());
        Ok(())
    }

    fn request_providers(&self) -> Result<(), PortError> {
        *self.request_calls.lock().expect("lock") += 1;
        if let Some(registry) = self.registry.lock().expect("lock").as_ref() {
            for wallet in &self.wallets {
                registry.announce(wallet.clone());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MockClaimService {
    pub submitted: Arc<Mutex<Vec<ClaimMutationVariables>>>,
    pub fail_with: Option<PortError>,
}

impl ClaimServicePort for MockClaimService {
    fn submit_claim(
        &self,
        variables: &ClaimMutationVariables,
    ) -> Result<ClaimReceipt, PortError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.submitted.lock().expect("lock").push(variables.clone());
        Ok(ClaimReceipt(vec![1, 2, 3]))
    }
}
