use super::Renderer;
use crate::{config::Config, document::ReportDocument};
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// POSTs the document as JSON to the configured rendering endpoint.
pub struct HttpRenderer {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpRenderer {
    pub fn new(cfg: &Config) -> Result<Self> {
        let timeout = match cfg.service.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let mut builder = Client::builder().timeout(timeout);
        if !cfg.service.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .with_context(|| "building HTTP client")?;

        let bearer_token = resolve_bearer_token(&cfg.service.bearer_token_env);

        Ok(Self {
            client,
            endpoint: cfg.service.endpoint.clone(),
            bearer_token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Renderer for HttpRenderer {
    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        debug!(
            "sending report data: {}",
            doc.to_json_pretty().unwrap_or_default()
        );

        // `json` sets Content-Type: application/json.
        let mut req = self.client.post(&self.endpoint).json(doc);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .with_context(|| format!("POST {}", self.endpoint))?;
        let status = response.status();

        if !status.is_success() {
            let details = response.text().unwrap_or_default();
            return Err(anyhow!(
                "HTTP error! Status: {}. Details: {}",
                status.as_u16(),
                details
            ));
        }

        let bytes = response
            .bytes()
            .with_context(|| "reading rendering service response")?;
        if !bytes.starts_with(b"%PDF") {
            warn!("response body does not start with a PDF header");
        }
        info!("rendering service returned {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

fn resolve_bearer_token(env_name: &str) -> Option<String> {
    let env_name = env_name.trim();
    if env_name.is_empty() {
        return None;
    }
    match std::env::var(env_name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => {
            warn!("bearer_token_env={env_name} is set but the variable is empty or missing");
            None
        }
    }
}
