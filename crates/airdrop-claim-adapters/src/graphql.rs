//! Node-service GraphQL transport for the claim mutation.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use airdrop_claim_core::{
    ClaimMutationVariables, ClaimReceipt, ClaimServicePort, GraphQlRequest, PortError,
};

use crate::ClaimAdapterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// Kind of the first operation in `document`, skipping fragment definitions.
    /// Anonymous `{ ... }` documents are queries.
    pub fn of(document: &str) -> Self {
        let source = document
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");
        let mut rest = source.trim_start();
        while rest.starts_with("fragment") {
            rest = skip_definition(rest).trim_start();
        }
        match rest {
            r if r.starts_with("subscription") => Self::Subscription,
            r if r.starts_with("mutation") => Self::Mutation,
            _ => Self::Query,
        }
    }
}

/// Everything after the brace-balanced selection set of the leading definition.
fn skip_definition(definition: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in definition.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &definition[i + 1..];
                }
            }
            _ => {}
        }
    }
    ""
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Http(&'a str),
    WebSocket(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQlEndpoints {
    pub http: String,
    pub ws: String,
}

impl GraphQlEndpoints {
    pub fn new(host: &str, port: &str, chain_id: &str, app_id: &str) -> Self {
        Self {
            http: format!("http://{host}:{port}/chains/{chain_id}/applications/{app_id}"),
            ws: format!("ws://{host}:{port}/ws"),
        }
    }

    /// Subscriptions go over the WebSocket; everything else over HTTP.
    pub fn route(&self, kind: OperationKind) -> Endpoint<'_> {
        match kind {
            OperationKind::Subscription => Endpoint::WebSocket(&self.ws),
            OperationKind::Query | OperationKind::Mutation => Endpoint::Http(&self.http),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Clone)]
pub struct GraphQlClaimAdapter {
    endpoints: GraphQlEndpoints,
    timeout_ms: u64,
    mode: ServiceMode,
}

#[derive(Debug, Clone)]
enum ServiceMode {
    #[cfg(not(target_arch = "wasm32"))]
    Http(reqwest::blocking::Client),
    #[cfg(target_arch = "wasm32")]
    Http(reqwest::Client),
    Disabled(String),
}

impl GraphQlClaimAdapter {
    pub fn with_config(config: &ClaimAdapterConfig) -> Self {
        Self::new(config.endpoints(), config.graphql_timeout_ms)
    }

    pub fn new(endpoints: GraphQlEndpoints, timeout_ms: u64) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let mode = match reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
        {
            Ok(client) => ServiceMode::Http(client),
            Err(e) => ServiceMode::Disabled(format!("failed to initialize GraphQL client: {e}")),
        };

        #[cfg(target_arch = "wasm32")]
        let mode = ServiceMode::Http(reqwest::Client::new());

        Self {
            endpoints,
            timeout_ms,
            mode,
        }
    }

    pub fn endpoints(&self) -> &GraphQlEndpoints {
        &self.endpoints
    }

    fn claim_url(&self) -> Result<&str, PortError> {
        match self.endpoints.route(OperationKind::Mutation) {
            Endpoint::Http(url) => Ok(url),
            Endpoint::WebSocket(_) => Err(PortError::NotImplemented(
                "claim mutation over WebSocket",
            )),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> PortError {
        if e.is_timeout() {
            PortError::Timeout(self.timeout_ms)
        } else {
            PortError::Transport(format!("claim mutation request failed: {e}"))
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn wasm_submit_claim_async(
        &self,
        variables: &ClaimMutationVariables,
    ) -> Result<ClaimReceipt, PortError> {
        let client = match &self.mode {
            ServiceMode::Http(client) => client,
            ServiceMode::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
        };
        let request = GraphQlRequest::claim(variables)?;
        let response = client
            .post(self.claim_url()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("claim response json decode failed: {e}")))?;
        decode_claim_response(status.is_success(), status.as_u16(), body)
    }
}

impl ClaimServicePort for GraphQlClaimAdapter {
    fn submit_claim(
        &self,
        variables: &ClaimMutationVariables,
    ) -> Result<ClaimReceipt, PortError> {
        let client = match &self.mode {
            ServiceMode::Http(client) => client,
            ServiceMode::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
        };

        #[cfg(target_arch = "wasm32")]
        {
            let _ = (client, variables);
            Err(PortError::NotImplemented(
                "wasm sync submit_claim is unavailable; use wasm_submit_claim_async",
            ))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let request = GraphQlRequest::claim(variables)?;
            let url = self.claim_url()?;
            debug!(url, "submitting airdrop claim");
            let response = client
                .post(url)
                .json(&request)
                .send()
                .map_err(|e| self.map_send_error(e))?;
            let status = response.status();
            let body: Value = response.json().map_err(|e| {
                PortError::Transport(format!("claim response json decode failed: {e}"))
            })?;
            decode_claim_response(status.is_success(), status.as_u16(), body)
        }
    }
}

fn decode_claim_response(success: bool, status: u16, body: Value) -> Result<ClaimReceipt, PortError> {
    let response: GraphQlResponse = serde_json::from_value(body.clone()).map_err(|e| {
        PortError::Transport(format!("unexpected GraphQL response ({status}): {e}: {body}"))
    })?;
    if !response.errors.is_empty() {
        return Err(PortError::GraphQl(
            response.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    if !success {
        return Err(PortError::Transport(format!(
            "node service status {status}: {body}"
        )));
    }
    let receipt = response
        .data
        .and_then(|mut data| data.get_mut("airDropClaim").map(Value::take))
        .ok_or_else(|| PortError::Transport("claim response missing airDropClaim".to_owned()))?;
    serde_json::from_value(receipt)
        .map_err(|e| PortError::Transport(format!("claim receipt is not a byte list: {e}")))
}
