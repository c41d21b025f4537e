use reqwest::Url;
use thiserror::Error;
use tracing::warn;

use airdrop_claim_core::ClaimDestination;

use crate::graphql::GraphQlEndpoints;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "8080";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("the URL is missing the chain ID")]
    MissingChainId,
    #[error("the URL is missing the `{0}` query parameter")]
    MissingParameter(&'static str),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimAdapterConfig {
    pub chain_id: String,
    pub app_id: String,
    pub owner: String,
    pub host: String,
    pub port: String,
    pub runtime_profile: RuntimeProfile,
    pub eip1193_proxy_url: Option<String>,
    pub wallet_request_timeout_ms: u64,
    pub graphql_timeout_ms: u64,
}

impl Default for ClaimAdapterConfig {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            app_id: String::new(),
            owner: String::new(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT.to_owned(),
            runtime_profile: RuntimeProfile::Development,
            eip1193_proxy_url: None,
            wallet_request_timeout_ms: 120_000,
            graphql_timeout_ms: 15_000,
        }
    }
}

impl ClaimAdapterConfig {
    /// Reads `/{chainId}?app=..&owner=..[&host=..][&port=..]` from a full URL.
    pub fn from_url(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{raw}: {e}")))?;
        Self::from_parsed(&url)
    }

    /// Same as [`ClaimAdapterConfig::from_url`] for a browser `location.pathname` and
    /// `location.search` pair.
    pub fn from_location(path: &str, search: &str) -> Result<Self, ConfigError> {
        let base = Url::parse("http://localhost/")
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        let search = search.trim_start_matches('?');
        let relative = if search.is_empty() {
            path.to_owned()
        } else {
            format!("{path}?{search}")
        };
        let url = base
            .join(&relative)
            .map_err(|e| ConfigError::InvalidUrl(format!("{relative}: {e}")))?;
        Self::from_parsed(&url)
    }

    /// Parses `AIRDROP_CLAIM_URL` and applies the other `AIRDROP_*` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("AIRDROP_CLAIM_URL")
            .map_err(|_| ConfigError::MissingParameter("AIRDROP_CLAIM_URL"))?;
        Self::from_url(&raw)?.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var("AIRDROP_EIP1193_PROXY_URL") {
            if !url.trim().is_empty() {
                self.eip1193_proxy_url = Some(url.trim().to_owned());
            }
        }
        if let Ok(raw) = std::env::var("AIRDROP_WALLET_TIMEOUT_MS") {
            self.wallet_request_timeout_ms = parse_ms("AIRDROP_WALLET_TIMEOUT_MS", &raw)?;
        }
        if let Ok(raw) = std::env::var("AIRDROP_GRAPHQL_TIMEOUT_MS") {
            self.graphql_timeout_ms = parse_ms("AIRDROP_GRAPHQL_TIMEOUT_MS", &raw)?;
        }
        if let Ok(raw) = std::env::var("AIRDROP_RUNTIME_PROFILE") {
            self.runtime_profile = match raw.trim().to_ascii_lowercase().as_str() {
                "development" | "dev" => RuntimeProfile::Development,
                "production" | "prod" => RuntimeProfile::Production,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "AIRDROP_RUNTIME_PROFILE",
                        value: raw,
                    })
                }
            };
        }
        Ok(self)
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    /// Account receiving the airdrop: the `owner` parameter tagged as a user owner.
    pub fn destination(&self) -> ClaimDestination {
        ClaimDestination::for_user(self.chain_id.clone(), &self.owner)
    }

    pub fn endpoints(&self) -> GraphQlEndpoints {
        GraphQlEndpoints::new(&self.host, &self.port, &self.chain_id, &self.app_id)
    }

    fn from_parsed(url: &Url) -> Result<Self, ConfigError> {
        let chain_id = url
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map(str::to_owned)
            .ok_or(ConfigError::MissingChainId)?;

        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        let app_id = param("app").ok_or(ConfigError::MissingParameter("app"))?;
        let owner = param("owner").ok_or(ConfigError::MissingParameter("owner"))?;
        let host = param("host").unwrap_or_else(|| {
            warn!("the URL has no `host` query parameter; assuming `{DEFAULT_HOST}`");
            DEFAULT_HOST.to_owned()
        });
        let port = param("port").unwrap_or_else(|| {
            warn!("the URL has no `port` query parameter; assuming `{DEFAULT_PORT}`");
            DEFAULT_PORT.to_owned()
        });

        Ok(Self {
            chain_id,
            app_id,
            owner,
            host,
            port,
            ..Self::default()
        })
    }
}

fn parse_ms(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_owned(),
    })
}
