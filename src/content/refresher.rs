//! Background refresh of rule content and rule groups.
//!
//! Pattern mirrors `api::server`: spawn a background task and hand back
//! a handle with a shutdown channel.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tokio::sync::oneshot;

use super::{ContentDirectory, GroupsPublisher};
use crate::models::{RuleContent, RuleGroup};
use crate::services::make_url;

const CONTENT_ENDPOINT: &str = "content";
const GROUPS_ENDPOINT: &str = "groups";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("content service unreachable: {0}")]
    Transport(String),
    #[error("content service returned {status}")]
    Status { status: u16 },
    #[error("unexpected content service payload: {0}")]
    Decode(String),
    #[error("invalid content service URL")]
    InvalidUrl,
}

#[derive(Deserialize)]
struct ContentEnvelope {
    content: Vec<RuleContent>,
}

#[derive(Deserialize)]
struct GroupsEnvelope {
    groups: Vec<RuleGroup>,
}

pub struct ContentRefresher {
    client: reqwest::Client,
    base_url: Url,
    interval: Duration,
    directory: Arc<ContentDirectory>,
    groups: GroupsPublisher,
}

/// Handle to a running refresher task.
pub struct RefresherHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RefresherHandle {
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Content refresher shutdown signal sent");
        }
    }
}

impl ContentRefresher {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        interval: Duration,
        directory: Arc<ContentDirectory>,
        groups: GroupsPublisher,
    ) -> Self {
        Self {
            client,
            base_url,
            interval,
            directory,
            groups,
        }
    }

    /// Fetch content and groups once.
    ///
    /// A failed content fetch keeps the previous directory. A failed
    /// groups fetch is published so readers see the error.
    pub async fn refresh_once(&self) {
        match self.fetch::<ContentEnvelope>(CONTENT_ENDPOINT).await {
            Ok(envelope) => match self.directory.load(envelope.content) {
                Ok(count) => tracing::info!(count, "Rule content directory refreshed"),
                Err(e) => tracing::error!(error = %e, "Failed to store rule content"),
            },
            Err(e) => tracing::error!(error = %e, "Rule content refresh failed"),
        }

        match self.fetch::<GroupsEnvelope>(GROUPS_ENDPOINT).await {
            Ok(envelope) => {
                tracing::info!(count = envelope.groups.len(), "Rule groups refreshed");
                self.groups.publish(envelope.groups);
            }
            Err(e) => {
                tracing::error!(error = %e, "Rule groups refresh failed");
                self.groups.publish_error(e);
            }
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, RefreshError> {
        let url = make_url(&self.base_url, endpoint, &[]).ok_or(RefreshError::InvalidUrl)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RefreshError::Decode(e.to_string()))
    }

    /// Refresh immediately, then every `interval` until shut down.
    pub fn spawn(self) -> RefresherHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.refresh_once().await,
                    _ = &mut shutdown_rx => break,
                }
            }
            tracing::info!("Content refresher stopped");
        });

        RefresherHandle {
            shutdown_tx: Some(shutdown_tx),
        }
    }
}
