use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{ClaimDestination, ClaimReceipt, ExternalAccountAddress};
use crate::envelope::{build_envelope, build_mutation_variables, ClaimEnvelope, ClaimMutationVariables};
use crate::ports::{ClaimServicePort, PortError, ProviderPort};
use crate::registry::ProviderRegistry;
use crate::session::{AccountSession, FirstProvider, SelectionPolicy, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimCommand {
    /// Binds the session to a provider if one has been announced.
    SyncProviders,
    /// Requests an account from the selected provider.
    Authorize,
    /// Signs the claim envelope and submits the mutation.
    Claim { api_token: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub session: SessionState,
    pub receipt: Option<ClaimReceipt>,
}

/// Everything needed to ask the wallet for a claim signature.
#[derive(Debug, Clone)]
pub struct PreparedClaim<P> {
    pub provider: P,
    pub account: ExternalAccountAddress,
    pub envelope: ClaimEnvelope,
    pub typed_data: Value,
    pub api_token: String,
}

pub struct Orchestrator<P, C, S = FirstProvider> {
    pub registry: ProviderRegistry<P>,
    pub service: C,
    session: Mutex<AccountSession<P, S>>,
    app_id: String,
    destination: ClaimDestination,
    claiming: AtomicBool,
}

impl<P, C> Orchestrator<P, C, FirstProvider> {
    pub fn new(
        registry: ProviderRegistry<P>,
        service: C,
        app_id: impl Into<String>,
        destination: ClaimDestination,
    ) -> Self {
        Self::with_policy(registry, service, app_id, destination, FirstProvider)
    }
}

impl<P, C, S> Orchestrator<P, C, S> {
    pub fn with_policy(
        registry: ProviderRegistry<P>,
        service: C,
        app_id: impl Into<String>,
        destination: ClaimDestination,
        policy: S,
    ) -> Self {
        Self {
            registry,
            service,
            session: Mutex::new(AccountSession::with_policy(policy)),
            app_id: app_id.into(),
            destination,
            claiming: AtomicBool::new(false),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn destination(&self) -> &ClaimDestination {
        &self.destination
    }

    pub fn session_state(&self) -> Result<SessionState, PortError> {
        Ok(self.session()?.state())
    }

    pub fn account(&self) -> Result<Option<ExternalAccountAddress>, PortError> {
        Ok(self.session()?.account().cloned())
    }

    pub fn is_claiming(&self) -> bool {
        self.claiming.load(Ordering::SeqCst)
    }

    /// Whether the claim action may be offered to the user.
    pub fn claim_enabled(&self, api_token: &str) -> bool {
        !api_token.trim().is_empty()
            && !self.is_claiming()
            && self.session().map(|s| s.is_authorized()).unwrap_or(false)
    }

    /// Clears the in-flight flag and logs the mutation outcome.
    pub fn complete_claim(
        &self,
        result: Result<ClaimReceipt, PortError>,
    ) -> Result<ClaimReceipt, PortError> {
        self.claiming.store(false, Ordering::SeqCst);
        match &result {
            Ok(receipt) => info!(bytes = receipt.len(), "airdrop claim accepted"),
            Err(e) => warn!(error = %e, "airdrop claim mutation failed"),
        }
        result
    }

    fn session(&self) -> Result<MutexGuard<'_, AccountSession<P, S>>, PortError> {
        self.session
            .lock()
            .map_err(|e| PortError::Transport(format!("session lock poisoned: {e}")))
    }
}

impl<P: Clone, C, S: SelectionPolicy<P>> Orchestrator<P, C, S> {
    pub fn sync_providers(&self) -> Result<SessionState, PortError> {
        let snapshot = self.registry.snapshot();
        let mut session = self.session()?;
        session.select_from(&snapshot);
        Ok(session.state())
    }

    /// Selects a provider if needed and reserves the single authorization slot.
    pub fn begin_authorization(&self) -> Result<Option<P>, PortError> {
        let snapshot = self.registry.snapshot();
        let mut session = self.session()?;
        session.select_from(&snapshot);
        Ok(session.begin_authorization())
    }

    pub fn complete_authorization(
        &self,
        result: Result<Vec<ExternalAccountAddress>, PortError>,
    ) -> Result<Option<ExternalAccountAddress>, PortError> {
        self.session()?.complete_authorization(result)
    }

    /// Reserves the claim slot and builds the envelope for the authorized account.
    ///
    /// Calling this without a selected provider, an authorized account and a non-empty
    /// API token is a caller bug: the claim action must stay disabled until all exist.
    pub fn prepare_claim(&self, api_token: &str) -> Result<PreparedClaim<P>, PortError> {
        if api_token.trim().is_empty() {
            return Err(PortError::Precondition("claim requires an API token"));
        }
        let (provider, account) = {
            let session = self.session()?;
            let provider = session
                .selected_provider()
                .map(|p| p.handle.clone())
                .ok_or(PortError::Precondition("claim requires a selected wallet provider"))?;
            let account = session
                .account()
                .cloned()
                .ok_or(PortError::Precondition("claim requires an authorized account"))?;
            (provider, account)
        };
        if self
            .claiming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PortError::Policy("a claim is already in flight".to_owned()));
        }

        let envelope = build_envelope(&self.app_id, &self.destination);
        let typed_data = match envelope.to_json() {
            Ok(v) => v,
            Err(e) => {
                self.claiming.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        debug!(app_id = %self.app_id, owner = %self.destination.owner, "claim envelope built");
        Ok(PreparedClaim {
            provider,
            account,
            envelope,
            typed_data,
            api_token: api_token.to_owned(),
        })
    }

    /// Turns the wallet's answer into mutation variables.
    ///
    /// A rejected signature, or one that does not recover to the authorized account,
    /// ends the attempt without sending anything.
    pub fn signed_claim(
        &self,
        prepared: PreparedClaim<P>,
        signature: Result<String, PortError>,
    ) -> Result<ClaimMutationVariables, PortError> {
        let result = signature.and_then(|signature| {
            let signer = prepared.envelope.recover_signer(&signature)?;
            if !prepared.account.same_account(signer) {
                return Err(PortError::Validation(format!(
                    "signature recovered to {signer}, expected {}",
                    prepared.account
                )));
            }
            Ok(build_mutation_variables(
                signature,
                self.destination.clone(),
                prepared.api_token,
            ))
        });
        if let Err(e) = &result {
            warn!(error = %e, "claim signing failed; no mutation sent");
            self.claiming.store(false, Ordering::SeqCst);
        }
        result
    }
}

impl<P, C, S> Orchestrator<P, C, S>
where
    P: Clone + ProviderPort,
    C: ClaimServicePort,
    S: SelectionPolicy<P>,
{
    pub fn handle(&self, command: ClaimCommand) -> Result<CommandResult, PortError> {
        let receipt = match command {
            ClaimCommand::SyncProviders => {
                self.sync_providers()?;
                None
            }
            ClaimCommand::Authorize => {
                self.authorize()?;
                None
            }
            ClaimCommand::Claim { api_token } => Some(self.claim(&api_token)?),
        };
        Ok(CommandResult {
            session: self.session_state()?,
            receipt,
        })
    }

    pub fn authorize(&self) -> Result<Option<ExternalAccountAddress>, PortError> {
        match self.begin_authorization()? {
            Some(provider) => {
                let result = provider.request_accounts();
                self.complete_authorization(result)
            }
            None => self.account(),
        }
    }

    pub fn claim(&self, api_token: &str) -> Result<ClaimReceipt, PortError> {
        let prepared = self.prepare_claim(api_token)?;
        let signature = prepared
            .provider
            .sign_typed_data(&prepared.account, &prepared.typed_data);
        let variables = self.signed_claim(prepared, signature)?;
        self.complete_claim(self.service.submit_claim(&variables))
    }
}
