//! Health probes for the configured model backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, then look for the model in `models[].name`
//! - OpenAI-compatible: `GET {endpoint}/v1/models`, then look for it in `data[].id`
//!
//! [`HealthService::check`] never fails: transport and status errors become
//! `ok = false` with a short message, which is what `/health` renders.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::{LlmModelConfig, LlmProvider},
    error_handler::{AiLlmError, Result},
    services::{build_client, ensure_success},
};

/// Health snapshot of one backend role.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Role of the backend (`generation`, `embedding`).
    pub component: String,
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

/// Probe outcome before it is stamped with the config it came from.
struct Probe {
    ok: bool,
    message: String,
}

/// Reusable health checker.
#[derive(Debug)]
pub struct HealthService {
    client: reqwest::Client,
}

impl HealthService {
    /// Builds the checker; probes default to a 10s timeout.
    ///
    /// # Errors
    /// [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self> {
        let timeout = timeout_secs.unwrap_or(10);
        info!(timeout_secs = timeout, "HealthService initialized");
        Ok(Self {
            client: build_client(Some(timeout))?,
        })
    }

    /// Probes one backend. Failures are folded into the returned status.
    pub async fn check(&self, component: &str, cfg: &LlmModelConfig) -> HealthStatus {
        let started = Instant::now();
        let probe = match cfg.provider {
            LlmProvider::Ollama => self.probe_ollama(cfg).await,
            LlmProvider::OpenAI => self.probe_openai(cfg).await,
        };
        let latency_ms = started.elapsed().as_millis();

        let probe = probe.unwrap_or_else(|err| Probe {
            ok: false,
            message: err.to_string(),
        });
        if probe.ok {
            debug!(component, model = %cfg.model, latency_ms, "health probe ok");
        } else {
            warn!(component, model = %cfg.model, latency_ms, message = %probe.message, "health probe failed");
        }

        HealthStatus {
            component: component.to_string(),
            provider: cfg.provider.to_string(),
            endpoint: cfg.base_url().to_string(),
            model: cfg.model.clone(),
            ok: probe.ok,
            latency_ms,
            message: probe.message,
        }
    }

    async fn probe_ollama(&self, cfg: &LlmModelConfig) -> Result<Probe> {
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            #[serde(default)]
            models: Vec<Tag>,
        }

        let url = format!("{}/api/tags", cfg.base_url());
        let resp = self.client.get(&url).send().await?;
        let tags: Tags = ensure_success(resp, &url)
            .await?
            .json()
            .await
            .map_err(|e| AiLlmError::Decode(format!("/api/tags: {e}")))?;

        // Ollama reports untagged pulls as `name:latest`.
        let tagged = format!("{}:latest", cfg.model);
        let found = tags
            .models
            .iter()
            .any(|m| m.name == cfg.model || m.name == tagged);
        Ok(model_probe(found, "/api/tags"))
    }

    async fn probe_openai(&self, cfg: &LlmModelConfig) -> Result<Probe> {
        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            #[serde(default)]
            data: Vec<ModelItem>,
        }

        let url = format!("{}/v1/models", cfg.base_url());
        let mut req = self.client.get(&url);
        if let Some(key) = &cfg.api_key {
            req = req.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        if let Some(secs) = cfg.timeout_secs {
            req = req.timeout(Duration::from_secs(secs.min(10)));
        }

        let resp = req.send().await?;
        let models: Models = ensure_success(resp, &url)
            .await?
            .json()
            .await
            .map_err(|e| AiLlmError::Decode(format!("/v1/models: {e}")))?;

        let found = models.data.iter().any(|m| m.id == cfg.model);
        Ok(model_probe(found, "/v1/models"))
    }
}

fn model_probe(found: bool, listing: &str) -> Probe {
    if found {
        Probe {
            ok: true,
            message: "reachable; model is available".into(),
        }
    } else {
        Probe {
            ok: false,
            message: format!("reachable, but model not listed in {listing}"),
        }
    }
}
