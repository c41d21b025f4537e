//! Picks one wallet and obtains one authorized account from it.

use tracing::{debug, info, warn};

use crate::domain::{ExternalAccountAddress, WalletProviderInfo};
use crate::ports::{PortError, ProviderPort};

/// Chooses which announced wallet the session binds to.
pub trait SelectionPolicy<P> {
    /// Returns the index of the chosen provider, or `None` to keep waiting.
    fn select(&self, providers: &[WalletProviderInfo<P>]) -> Option<usize>;
}

/// Binds to whichever wallet announced itself first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstProvider;

impl<P> SelectionPolicy<P> for FirstProvider {
    fn select(&self, providers: &[WalletProviderInfo<P>]) -> Option<usize> {
        if providers.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}

impl<P, F> SelectionPolicy<P> for F
where
    F: Fn(&[WalletProviderInfo<P>]) -> Option<usize>,
{
    fn select(&self, providers: &[WalletProviderInfo<P>]) -> Option<usize> {
        self(providers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unselected,
    Unauthorized {
        provider_uuid: String,
        pending: bool,
    },
    Authorized {
        provider_uuid: String,
        account: ExternalAccountAddress,
    },
}

/// Unselected -> Selected/Unauthorized -> Authorized. There are no backward transitions.
#[derive(Debug)]
pub struct AccountSession<P, S = FirstProvider> {
    policy: S,
    selected: Option<WalletProviderInfo<P>>,
    account: Option<ExternalAccountAddress>,
    pending: bool,
}

impl<P> Default for AccountSession<P, FirstProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> AccountSession<P, FirstProvider> {
    pub fn new() -> Self {
        Self::with_policy(FirstProvider)
    }
}

impl<P, S> AccountSession<P, S> {
    pub fn with_policy(policy: S) -> Self {
        Self {
            policy,
            selected: None,
            account: None,
            pending: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.selected, &self.account) {
            (None, _) => SessionState::Unselected,
            (Some(p), None) => SessionState::Unauthorized {
                provider_uuid: p.uuid.clone(),
                pending: self.pending,
            },
            (Some(p), Some(account)) => SessionState::Authorized {
                provider_uuid: p.uuid.clone(),
                account: account.clone(),
            },
        }
    }

    pub fn selected_provider(&self) -> Option<&WalletProviderInfo<P>> {
        self.selected.as_ref()
    }

    pub fn account(&self) -> Option<&ExternalAccountAddress> {
        self.account.as_ref()
    }

    pub fn is_authorized(&self) -> bool {
        self.selected.is_some() && self.account.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Applies the outcome of an `eth_requestAccounts` call started by
    /// [`AccountSession::begin_authorization`].
    ///
    /// Failures and empty account lists leave the session unauthorized; the error is
    /// handed back so the caller can surface it, but nothing is retried.
    pub fn complete_authorization(
        &mut self,
        result: Result<Vec<ExternalAccountAddress>, PortError>,
    ) -> Result<Option<ExternalAccountAddress>, PortError> {
        if !self.pending {
            debug!("ignoring authorization result with no request in flight");
            return Ok(self.account.clone());
        }
        self.pending = false;
        match result {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(account) => {
                    info!(%account, "wallet account authorized");
                    self.account = Some(account.clone());
                    Ok(Some(account))
                }
                None => {
                    warn!("wallet returned no accounts; session stays unauthorized");
                    Ok(None)
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to connect to wallet");
                Err(e)
            }
        }
    }
}

impl<P: Clone, S: SelectionPolicy<P>> AccountSession<P, S> {
    /// Binds to a provider from `providers` if none is selected yet.
    ///
    /// Returns `true` only on the call that performed the selection.
    pub fn select_from(&mut self, providers: &[WalletProviderInfo<P>]) -> bool {
        if self.selected.is_some() {
            return false;
        }
        let Some(chosen) = self
            .policy
            .select(providers)
            .and_then(|idx| providers.get(idx))
        else {
            return false;
        };
        info!(uuid = %chosen.uuid, name = %chosen.name, "wallet provider selected");
        self.selected = Some(chosen.clone());
        true
    }

    /// Marks an authorization as in flight and hands out the provider to call.
    ///
    /// Returns `None` when nothing is selected, an account is already held, or another
    /// authorization is still outstanding.
    pub fn begin_authorization(&mut self) -> Option<P> {
        if self.pending || self.account.is_some() {
            return None;
        }
        let handle = self.selected.as_ref()?.handle.clone();
        self.pending = true;
        Some(handle)
    }
}

impl<P: Clone + ProviderPort, S: SelectionPolicy<P>> AccountSession<P, S> {
    /// Runs `eth_requestAccounts` against the selected provider.
    pub fn authorize(&mut self) -> Result<Option<ExternalAccountAddress>, PortError> {
        let Some(provider) = self.begin_authorization() else {
            return Ok(self.account.clone());
        };
        let result = provider.request_accounts();
        self.complete_authorization(result)
    }
}
