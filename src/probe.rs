//! HTTP probing.
//!
//! A probe never fails from the caller's point of view: transport errors are
//! folded into [`ProbeOutcome::Failed`] so one unreachable target cannot abort
//! a tick.

use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

use crate::models::{ProbeOutcome, ProbeResult};

pub trait Probe: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = ProbeOutcome> + Send;
}

pub struct HttpProber {
    http_client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self { http_client })
    }
}

impl Probe for HttpProber {
    fn probe(&self, url: &str) -> impl Future<Output = ProbeOutcome> + Send {
        let request = self.http_client.get(url);
        async move {
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => return ProbeOutcome::Failed { error: e.to_string(), partial: None },
            };

            let status = response.status().as_u16();
            match response.bytes().await {
                Ok(body) => ProbeOutcome::Response(ProbeResult {
                    status: Some(status),
                    body: body.to_vec(),
                }),
                Err(e) => ProbeOutcome::Failed {
                    error: format!("failed to read body: {}", e),
                    partial: Some(ProbeResult { status: Some(status), body: Vec::new() }),
                },
            }
        }
    }
}
