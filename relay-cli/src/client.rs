use relay_shared::{completion_text, ChatMessage, ClientChatRequest, ErrorResponse};
use serde_json::Value;
use tracing::{debug, error, warn};

#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionStatus {
    Checking,
    Connected,
    Disconnected,
}

/// Outcome of one chat round trip, already rendered for display.
#[derive(Debug, PartialEq)]
pub enum ChatReply {
    Answer(String),
    Failed(String),
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn check_health(&self) -> ConnectionStatus {
        let url = format!("{}/api/health", self.base_url);
        debug!("Checking backend health at {}", url);

        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => ConnectionStatus::Connected,
            Ok(resp) => {
                warn!("Health check returned {}", resp.status());
                ConnectionStatus::Disconnected
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                ConnectionStatus::Disconnected
            }
        }
    }

    pub async fn send_chat(&self, messages: Vec<ChatMessage>) -> ChatReply {
        let url = format!("{}/api/chat", self.base_url);
        let request = ClientChatRequest { messages };
        debug!("Sending {} message(s) to {}", request.messages.len(), url);

        let resp = match self.http.post(&url).json(&request).send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!("Chat request failed: {}", e);
                return ChatReply::Failed(format!("Network error: {}", e));
            }
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to read chat response: {}", e);
                return ChatReply::Failed(format!("Network error: {}", e));
            }
        };

        if status.is_success() {
            parse_answer(&body)
        } else {
            ChatReply::Failed(describe_failure(status.as_u16(), &body))
        }
    }
}

fn parse_answer(body: &str) -> ChatReply {
    let completion = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(e) => return ChatReply::Failed(format!("Invalid response: {}", e)),
    };

    match completion_text(&completion) {
        Some(text) => ChatReply::Answer(text.to_string()),
        None => ChatReply::Failed("Invalid response: no completion text".to_string()),
    }
}

fn describe_failure(status: u16, body: &str) -> String {
    let reason = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| "Unknown error".to_string());
    format!("Error {}: {}", status, reason)
}
