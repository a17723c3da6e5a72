// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingest service client.
//!
//! Each blocking boundary decides locally between retry, discard and
//! surface; this module only classifies outcomes. The harvest scheduler
//! discards payloads on every non-accepted outcome (there is no retry
//! buffer), and a permanent rejection additionally disconnects the entry.

use async_trait::async_trait;
use beacon_core::AppIdentity;
use beacon_harvest::Payload;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Result of one payload upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Payload accepted by the ingest service.
    Accepted,
    /// Service temporarily unavailable; the payload is discarded anyway.
    RetryLater,
    /// Data malformed or identity rejected; the entry must reconnect.
    RejectedPermanent,
}

/// Result of a connect handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Run token issued for this application run.
    Accepted { run_token: String },
    /// The license is unknown or disabled.
    InvalidLicense,
    /// The application should connect to a different ingest host.
    Redirect { host: String },
    /// Service temporarily unavailable.
    RetryLater,
}

/// Client construction errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot build ingest client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("cannot read CA certificates: {0}")]
    CaCerts(#[from] std::io::Error),
}

/// Capability the harvest scheduler uploads through; stubbed in tests.
#[async_trait]
pub trait Ingest: Send + Sync {
    /// Run the connect handshake for an application identity.
    async fn connect(&self, identity: &AppIdentity) -> ConnectOutcome;

    /// Upload one reduced payload for an application run.
    async fn upload(&self, run_token: &str, payload: &Payload) -> UploadOutcome;
}

/// Fold an HTTP status into an upload outcome.
///
/// 2xx accepts; timeouts, throttling and server errors are transient;
/// every other status is a permanent rejection.
pub fn outcome_for_status(status: u16) -> UploadOutcome {
    match status {
        200..=299 => UploadOutcome::Accepted,
        408 | 429 | 500..=599 => UploadOutcome::RetryLater,
        _ => UploadOutcome::RejectedPermanent,
    }
}

#[derive(Debug, Deserialize)]
struct ConnectBody {
    #[serde(default)]
    run_token: Option<String>,
    #[serde(default)]
    redirect_host: Option<String>,
}

/// HTTPS client for the remote ingest service.
pub struct Collector {
    client: reqwest::Client,
    base: String,
}

impl Collector {
    /// Build the client once, honouring proxy and CA settings.
    pub fn new(config: &Config) -> Result<Collector, UploadError> {
        let mut builder = reqwest::Client::builder().timeout(config.collector_timeout);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        if let Some(cafile) = &config.cafile {
            let pem = std::fs::read(cafile)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        if let Some(capath) = &config.capath {
            for entry in std::fs::read_dir(capath)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "pem") {
                    let pem = std::fs::read(&path)?;
                    builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
                }
            }
        }

        Ok(Collector {
            client: builder.build()?,
            base: config.collector.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Ingest for Collector {
    async fn connect(&self, identity: &AppIdentity) -> ConnectOutcome {
        let url = format!("{}/v1/connect", self.base);
        let response = match self.client.post(&url).json(identity).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("connect handshake failed: {e}");
                return ConnectOutcome::RetryLater;
            }
        };

        match response.status().as_u16() {
            200..=299 => match response.json::<ConnectBody>().await {
                Ok(ConnectBody {
                    run_token: Some(token),
                    ..
                }) => ConnectOutcome::Accepted { run_token: token },
                Ok(ConnectBody {
                    redirect_host: Some(host),
                    ..
                }) => ConnectOutcome::Redirect { host },
                _ => ConnectOutcome::InvalidLicense,
            },
            401 | 403 | 410 => ConnectOutcome::InvalidLicense,
            _ => ConnectOutcome::RetryLater,
        }
    }

    async fn upload(&self, run_token: &str, payload: &Payload) -> UploadOutcome {
        let url = format!(
            "{}/v1/{}?run_token={}",
            self.base,
            payload.kind.endpoint(),
            run_token
        );
        match self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.body.clone())
            .send()
            .await
        {
            Ok(response) => outcome_for_status(response.status().as_u16()),
            Err(e) => {
                debug!("upload failed: {e}");
                UploadOutcome::RetryLater
            }
        }
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
