use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const GROQ_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Fixed sampling configuration attached to every upstream call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: "llama3-8b-8192".to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

#[derive(Clone)]
pub struct RelayConfig {
    pub host: IpAddr,
    pub port: u16,
    pub api_key: String,
    pub upstream_url: String,
    pub params: CompletionParams,
    /// `None` waits on the upstream for as long as it takes.
    pub upstream_timeout: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            api_key: String::new(),
            upstream_url: GROQ_COMPLETIONS_URL.to_string(),
            params: CompletionParams::default(),
            upstream_timeout: None,
        }
    }
}

// The credential must never end up in logs.
impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &"<redacted>")
            .field("upstream_url", &self.upstream_url)
            .field("params", &self.params)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source; unset variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("API_KEY") {
            config.api_key = key;
        }
        if let Some(host) = parse_var(&lookup, "RELAY_HOST")? {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "RELAY_PORT")? {
            config.port = port;
        }
        if let Some(url) = lookup("RELAY_UPSTREAM_URL") {
            config.upstream_url = url;
        }
        if let Some(model) = lookup("RELAY_MODEL") {
            config.params.model = model;
        }
        if let Some(max_tokens) = parse_var(&lookup, "RELAY_MAX_TOKENS")? {
            config.params.max_tokens = max_tokens;
        }
        if let Some(temperature) = parse_var(&lookup, "RELAY_TEMPERATURE")? {
            config.params.temperature = temperature;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "RELAY_UPSTREAM_TIMEOUT_SECS")? {
            config.upstream_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", name, raw))
        })
        .transpose()
}
