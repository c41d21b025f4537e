pub mod domain;
pub mod envelope;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod session;

pub use domain::{ClaimDestination, ClaimReceipt, ExternalAccountAddress, WalletProviderInfo};
pub use envelope::{
    build_envelope, build_mutation_variables, ClaimEnvelope, ClaimMutationVariables,
    GraphQlRequest, AIRDROP_CLAIM_DOMAIN, AIRDROP_CLAIM_MUTATION, ETHEREUM_MAINNET_CHAIN_ID,
};
pub use orchestrator::{ClaimCommand, CommandResult, Orchestrator, PreparedClaim};
pub use ports::{ClaimServicePort, DiscoveryPort, PortError, ProviderPort};
pub use registry::{ProviderRegistry, ProvidersSnapshot, Subscription};
pub use session::{AccountSession, FirstProvider, SelectionPolicy, SessionState};
