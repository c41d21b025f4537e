use serde_json::Value;
use thiserror::Error;

use crate::domain::{ClaimReceipt, ExternalAccountAddress};
use crate::envelope::ClaimMutationVariables;
use crate::registry::ProviderRegistry;

pub const METHOD_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const METHOD_SIGN_TYPED_DATA_V4: &str = "eth_signTypedData_v4";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("wallet rejected request: {0}")]
    Rejected(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
    #[error("graphql errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),
}

/// An EIP-1193 style wallet handle.
pub trait ProviderPort {
    fn request(&self, method: &str, params: Value) -> Result<Value, PortError>;

    fn request_accounts(&self) -> Result<Vec<ExternalAccountAddress>, PortError> {
        let result = self.request(METHOD_REQUEST_ACCOUNTS, serde_json::json!([]))?;
        parse_accounts(&result)
    }

    /// Signs `typed_data` with `eth_signTypedData_v4` and returns the signature hex verbatim.
    fn sign_typed_data(
        &self,
        account: &ExternalAccountAddress,
        typed_data: &Value,
    ) -> Result<String, PortError> {
        let result = self.request(
            METHOD_SIGN_TYPED_DATA_V4,
            sign_typed_data_params(account, typed_data)?,
        )?;
        parse_signature(&result)
    }
}

/// Source of EIP-6963 announcements.
pub trait DiscoveryPort<P> {
    /// Routes every future announcement into `registry`.
    fn listen(&self, registry: &ProviderRegistry<P>) -> Result<(), PortError>;
    /// Asks already-present wallets to announce themselves again.
    fn request_providers(&self) -> Result<(), PortError>;
}

pub trait ClaimServicePort {
    fn submit_claim(&self, variables: &ClaimMutationVariables)
        -> Result<ClaimReceipt, PortError>;
}

pub fn sign_typed_data_params(
    account: &ExternalAccountAddress,
    typed_data: &Value,
) -> Result<Value, PortError> {
    let payload = serde_json::to_string(typed_data)
        .map_err(|e| PortError::Validation(format!("typed data serialization failed: {e}")))?;
    Ok(serde_json::json!([account.as_str(), payload]))
}

pub fn parse_accounts(value: &Value) -> Result<Vec<ExternalAccountAddress>, PortError> {
    let arr = value.as_array().ok_or_else(|| {
        PortError::Transport("eth_requestAccounts result must be array".to_owned())
    })?;
    arr.iter()
        .map(|item| {
            let raw = item.as_str().ok_or_else(|| {
                PortError::Transport("eth_requestAccounts item must be string".to_owned())
            })?;
            ExternalAccountAddress::parse(raw)
        })
        .collect()
}

pub fn parse_signature(value: &Value) -> Result<String, PortError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| PortError::Transport("signature response must be hex string".to_owned()))
}
