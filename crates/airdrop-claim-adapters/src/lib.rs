pub mod config;
pub mod eip1193;
pub mod eip6963;
pub mod graphql;

pub use config::{ClaimAdapterConfig, ConfigError, RuntimeProfile};
pub use eip1193::Eip1193Adapter;
#[cfg(target_arch = "wasm32")]
pub use eip6963::BrowserDiscovery;
pub use eip6963::{global_registry, ProviderAnnouncement, StaticDiscovery};
pub use graphql::{Endpoint, GraphQlClaimAdapter, GraphQlEndpoints, OperationKind};
