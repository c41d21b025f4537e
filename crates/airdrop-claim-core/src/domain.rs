use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::ports::PortError;

/// Prefix the node service expects in front of a user-owned account owner.
pub const USER_OWNER_PREFIX: &str = "User:";

/// A wallet announced through EIP-6963, together with the handle used to talk to it.
///
/// Entries are immutable once announced; the registry never removes them.
#[derive(Debug, Clone)]
pub struct WalletProviderInfo<P> {
    pub uuid: String,
    pub name: String,
    /// Data URI of the wallet's icon.
    pub icon: String,
    /// Reverse-DNS identifier, empty when the wallet did not provide one.
    pub rdns: String,
    pub handle: P,
}

impl<P> WalletProviderInfo<P> {
    pub fn new(
        uuid: impl Into<String>,
        name: impl Into<String>,
        icon: impl Into<String>,
        handle: P,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            icon: icon.into(),
            rdns: String::new(),
            handle,
        }
    }

    pub fn with_rdns(mut self, rdns: impl Into<String>) -> Self {
        self.rdns = rdns.into();
        self
    }
}

/// Hex encoded 20-byte externally-owned account, kept exactly as the wallet returned it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalAccountAddress {
    raw: String,
    address: Address,
}

impl ExternalAccountAddress {
    pub fn parse(raw: &str) -> Result<Self, PortError> {
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| PortError::Validation(format!("account must be 0x-prefixed: {raw}")))?;
        if hex.len() != 40 {
            return Err(PortError::Validation(format!(
                "account must be 20 bytes, got {} hex chars",
                hex.len()
            )));
        }
        let address = Address::from_str(hex)
            .map_err(|e| PortError::Validation(format!("invalid account {raw}: {e}")))?;
        Ok(Self {
            raw: raw.to_owned(),
            address,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Compares the underlying 20 bytes, ignoring the hex casing.
    pub fn same_account(&self, other: Address) -> bool {
        self.address == other
    }
}

impl fmt::Display for ExternalAccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for ExternalAccountAddress {
    type Error = PortError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<ExternalAccountAddress> for String {
    fn from(value: ExternalAccountAddress) -> Self {
        value.raw
    }
}

/// The Linera account that receives the airdropped tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDestination {
    pub chain_id: String,
    pub owner: String,
}

impl ClaimDestination {
    /// Uses `owner` verbatim.
    pub fn new(chain_id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            owner: owner.into(),
        }
    }

    /// Tags `owner_id` as a user owner. No case or whitespace normalization is applied.
    pub fn for_user(chain_id: impl Into<String>, owner_id: &str) -> Self {
        Self::new(chain_id, format!("{USER_OWNER_PREFIX}{owner_id}"))
    }
}

/// Opaque bytes returned by the claim mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimReceipt(pub Vec<u8>);

impl ClaimReceipt {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        alloy::hex::encode_prefixed(&self.0)
    }
}
