//! The EIP-712 claim envelope the wallet signs, and the mutation that carries the signature.
//!
//! Field names and types are the signing contract: the airdrop contract recomputes the
//! digest from the same `sol!` types, so any drift here invalidates every claim.

use alloy::primitives::{Address, PrimitiveSignature, B256};
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ClaimDestination;
use crate::ports::PortError;

/// The [EIP-155] chain id of Ethereum mainnet, used as the signing domain's chain.
///
/// [EIP-155]: https://eips.ethereum.org/EIPS/eip-155
pub const ETHEREUM_MAINNET_CHAIN_ID: u64 = 1;

pub const DOMAIN_NAME: &str = "Linera AirDrop demo";
pub const DOMAIN_VERSION: &str = "0.0.1";
pub const PRIMARY_TYPE: &str = "AirDropClaim";

pub const AIRDROP_CLAIM_DOMAIN: Eip712Domain = eip712_domain! {
    name: "Linera AirDrop demo",
    version: "0.0.1",
    chain_id: ETHEREUM_MAINNET_CHAIN_ID,
};

pub const AIRDROP_CLAIM_MUTATION: &str = "\
mutation AirDropClaim($destination: FungibleAccount!, $signature: String!, $apiToken: String!) {
    airDropClaim(destination: $destination, signature: $signature, apiToken: $apiToken)
}
";

pub const AIRDROP_CLAIM_OPERATION: &str = "AirDropClaim";

mod eip712 {
    alloy::sol! {
        struct AirDropClaim {
            string appId;
            FungibleAccount claimer;
        }

        struct FungibleAccount {
            string chainId;
            string owner;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: kind.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTypes {
    #[serde(rename = "EIP712Domain")]
    pub eip712_domain: Vec<TypedField>,
    #[serde(rename = "AirDropClaim")]
    pub air_drop_claim: Vec<TypedField>,
    #[serde(rename = "FungibleAccount")]
    pub fungible_account: Vec<TypedField>,
}

impl Default for ClaimTypes {
    fn default() -> Self {
        Self {
            eip712_domain: vec![
                TypedField::new("name", "string"),
                TypedField::new("version", "string"),
                TypedField::new("chainId", "uint256"),
            ],
            air_drop_claim: vec![
                TypedField::new("appId", "string"),
                TypedField::new("claimer", "FungibleAccount"),
            ],
            fungible_account: vec![
                TypedField::new("chainId", "string"),
                TypedField::new("owner", "string"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
}

impl Default for ClaimDomain {
    fn default() -> Self {
        Self {
            name: DOMAIN_NAME.to_owned(),
            version: DOMAIN_VERSION.to_owned(),
            chain_id: ETHEREUM_MAINNET_CHAIN_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMessage {
    pub app_id: String,
    pub claimer: ClaimDestination,
}

/// `eth_signTypedData_v4` payload for an airdrop claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEnvelope {
    pub types: ClaimTypes,
    pub primary_type: String,
    pub domain: ClaimDomain,
    pub message: ClaimMessage,
}

/// Builds the typed data for `app_id` claiming into `claimer`. Pure.
pub fn build_envelope(app_id: &str, claimer: &ClaimDestination) -> ClaimEnvelope {
    ClaimEnvelope {
        types: ClaimTypes::default(),
        primary_type: PRIMARY_TYPE.to_owned(),
        domain: ClaimDomain::default(),
        message: ClaimMessage {
            app_id: app_id.to_owned(),
            claimer: claimer.clone(),
        },
    }
}

impl ClaimEnvelope {
    pub fn from_json(value: &Value) -> Result<Self, PortError> {
        let envelope: Self = serde_json::from_value(value.clone())
            .map_err(|e| PortError::Validation(format!("not an airdrop claim envelope: {e}")))?;
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn to_json(&self) -> Result<Value, PortError> {
        serde_json::to_value(self)
            .map_err(|e| PortError::Validation(format!("envelope serialization failed: {e}")))
    }

    /// Rejects envelopes whose types, primary type or domain differ from the claim contract.
    pub fn validate(&self) -> Result<(), PortError> {
        if self.types != ClaimTypes::default() {
            return Err(PortError::Validation(
                "envelope types differ from the airdrop claim types".to_owned(),
            ));
        }
        if self.primary_type != PRIMARY_TYPE {
            return Err(PortError::Validation(format!(
                "unexpected primary type {}",
                self.primary_type
            )));
        }
        if self.domain != ClaimDomain::default() {
            return Err(PortError::Validation(
                "envelope domain differs from the airdrop claim domain".to_owned(),
            ));
        }
        Ok(())
    }

    /// EIP-712 digest the wallet signs and the contract recovers the claimer from.
    pub fn signing_hash(&self) -> B256 {
        let claim = eip712::AirDropClaim {
            appId: self.message.app_id.clone(),
            claimer: eip712::FungibleAccount {
                chainId: self.message.claimer.chain_id.clone(),
                owner: self.message.claimer.owner.clone(),
            },
        };
        claim.eip712_signing_hash(&AIRDROP_CLAIM_DOMAIN)
    }

    /// Recovers the address that produced `signature_hex` over this envelope.
    pub fn recover_signer(&self, signature_hex: &str) -> Result<Address, PortError> {
        let bytes = alloy::hex::decode(signature_hex)
            .map_err(|e| PortError::Validation(format!("invalid signature hex: {e}")))?;
        let signature = PrimitiveSignature::try_from(bytes.as_slice())
            .map_err(|e| PortError::Validation(format!("invalid signature: {e}")))?;
        signature
            .recover_address_from_prehash(&self.signing_hash())
            .map_err(|e| PortError::Validation(format!("signer recovery failed: {e}")))
    }
}

/// Arguments of the `airDropClaim` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMutationVariables {
    pub destination: ClaimDestination,
    pub signature: String,
    pub api_token: String,
}

/// Packages a wallet signature for the claim mutation. The signature is forwarded verbatim.
pub fn build_mutation_variables(
    signature: impl Into<String>,
    destination: ClaimDestination,
    api_token: impl Into<String>,
) -> ClaimMutationVariables {
    ClaimMutationVariables {
        destination,
        signature: signature.into(),
        api_token: api_token.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Value,
}

impl GraphQlRequest {
    pub fn claim(variables: &ClaimMutationVariables) -> Result<Self, PortError> {
        let variables = serde_json::to_value(variables)
            .map_err(|e| PortError::Validation(format!("mutation variables: {e}")))?;
        Ok(Self {
            query: AIRDROP_CLAIM_MUTATION.to_owned(),
            operation_name: Some(AIRDROP_CLAIM_OPERATION.to_owned()),
            variables,
        })
    }
}
