use crate::config::{CompletionParams, RelayConfig};
use crate::error::RelayError;
use axum::http::StatusCode;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Body sent to the completions endpoint: caller messages plus the fixed
/// sampling parameters.
#[derive(Debug, Serialize)]
struct UpstreamPayload<'a> {
    messages: &'a Value,
    #[serde(flatten)]
    params: &'a CompletionParams,
}

pub struct LlmService {
    client: Client,
    api_key: String,
    upstream_url: String,
    params: CompletionParams,
}

impl LlmService {
    pub fn new(config: &RelayConfig) -> reqwest::Result<Self> {
        info!("Initializing LLM service with model: {}", config.params.model);

        let mut builder = Client::builder();
        if let Some(timeout) = config.upstream_timeout {
            info!("Upstream timeout: {:?}", timeout);
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key: config.api_key.clone(),
            upstream_url: config.upstream_url.clone(),
            params: config.params.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.params.model
    }

    /// Forwards `messages` verbatim and hands back the upstream JSON untouched
    /// on 200.
    pub async fn complete(&self, messages: &Value) -> Result<Value, RelayError> {
        let payload = UpstreamPayload {
            messages,
            params: &self.params,
        };

        debug!(
            "Forwarding {} message(s) to {}",
            messages.as_array().map_or(0, Vec::len),
            self.upstream_url
        );

        // `json` sets Content-Type: application/json.
        let response = self
            .client
            .post(&self.upstream_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            let completion = response.json::<Value>().await?;
            debug!("Upstream completion received");
            return Ok(completion);
        }

        let body = response.text().await?;
        warn!("Upstream returned {}: {}", status, body);
        Err(RelayError::UpstreamError { status, body })
    }
}
