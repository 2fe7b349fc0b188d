//! [`RemoteStore`] backed by a hosted realtime database over its REST API.
//!
//! Reads stream over server-sent events from `GET {collection}.json`; writes
//! are plain `POST`/`PATCH`/`DELETE` calls on the same paths.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header::ACCEPT, Client, Response};
use serde_json::Value;
use shared::{
    domain::{ItemId, ItemPatch, ItemRecord},
    error::RemoteError,
    protocol::{ErrorResponse, PushResponse, StreamEventKind, StreamPayload},
};
use storage::{RemoteStore, SnapshotDelivery, Subscription};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

pub mod mirror;
pub mod sse;

use mirror::CollectionMirror;
use sse::SseDecoder;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct FirebaseStore {
    http: Client,
    base_url: String,
    collection: String,
    reconnect_delay: Duration,
}

impl FirebaseStore {
    pub fn new(database_url: &str, collection: impl Into<String>) -> anyhow::Result<Self> {
        let parsed = Url::parse(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "database url must use http or https, got '{}'",
                parsed.scheme()
            ));
        }

        let collection = collection.into().trim_matches('/').to_string();
        if collection.is_empty() {
            return Err(anyhow!("collection path must not be empty"));
        }

        Ok(Self {
            http: Client::new(),
            base_url: database_url.trim_end_matches('/').to_string(),
            collection,
            reconnect_delay: RECONNECT_DELAY,
        })
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn collection_url(&self) -> String {
        format!("{}/{}.json", self.base_url, self.collection)
    }

    fn record_url(&self, id: &ItemId) -> String {
        format!("{}/{}/{}.json", self.base_url, self.collection, id)
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn append(&self, record: ItemRecord) -> Result<ItemId, RemoteError> {
        let response = self
            .http
            .post(self.collection_url())
            .json(&record)
            .send()
            .await
            .map_err(RemoteError::transport)?;
        let body: PushResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(RemoteError::decode)?;
        info!(key = %body.name, collection = %self.collection, "record appended");
        Ok(ItemId(body.name))
    }

    async fn subscribe(&self) -> Result<Subscription, RemoteError> {
        let (tx, rx) = Subscription::channel();
        let http = self.http.clone();
        let url = self.collection_url();
        let delay = self.reconnect_delay;

        let task = tokio::spawn(async move {
            loop {
                match stream_collection(&http, &url, &tx).await {
                    StreamEnd::ReceiverGone => return,
                    StreamEnd::Fatal(err) => {
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                    StreamEnd::Dropped(err) => {
                        warn!("collection stream dropped: {err}");
                        if tx.send(Err(err)).await.is_err() {
                            return;
                        }
                    }
                }
                tokio::time::sleep(delay).await;
                if tx.is_closed() {
                    return;
                }
                debug!("reconnecting collection stream");
            }
        });

        info!(collection = %self.collection, "subscribed to collection stream");
        Ok(Subscription::new(rx, task))
    }

    async fn patch(&self, id: &ItemId, fields: ItemPatch) -> Result<(), RemoteError> {
        // The hosted store creates missing paths on PATCH; check first.
        let response = self
            .http
            .get(self.record_url(id))
            .send()
            .await
            .map_err(RemoteError::transport)?;
        let existing: Value = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(RemoteError::decode)?;
        if existing.is_null() {
            return Err(RemoteError::NotFound(id.clone()));
        }
        if fields.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .patch(self.record_url(id))
            .json(&fields)
            .send()
            .await
            .map_err(RemoteError::transport)?;
        ensure_success(response).await?;
        info!(key = %id, "record patched");
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(self.record_url(id))
            .send()
            .await
            .map_err(RemoteError::transport)?;
        ensure_success(response).await?;
        info!(key = %id, "record deleted");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.error)
        .unwrap_or(body);
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
    })
}

enum StreamEnd {
    ReceiverGone,
    Dropped(RemoteError),
    Fatal(RemoteError),
}

async fn stream_collection(
    http: &Client,
    url: &str,
    tx: &mpsc::Sender<SnapshotDelivery>,
) -> StreamEnd {
    let response = match http
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => return StreamEnd::Dropped(RemoteError::transport(err)),
    };
    let response = match ensure_success(response).await {
        Ok(response) => response,
        Err(err) => return StreamEnd::Fatal(err),
    };

    let mut mirror = CollectionMirror::new();
    let mut decoder = SseDecoder::new();
    let mut bytes_stream = response.bytes_stream();
    while let Some(chunk_result) = bytes_stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(err) => return StreamEnd::Dropped(RemoteError::transport(err)),
        };

        for event in decoder.push(&chunk) {
            let kind = StreamEventKind::parse(&event.event);
            match &kind {
                StreamEventKind::Put | StreamEventKind::Patch => {
                    let payload = match serde_json::from_str::<StreamPayload>(&event.data) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!("ignoring malformed {} event: {err}", event.event);
                            continue;
                        }
                    };
                    if matches!(kind, StreamEventKind::Put) {
                        mirror.put(&payload.path, payload.data);
                    } else {
                        mirror.patch(&payload.path, payload.data);
                    }
                    if tx.send(Ok(mirror.snapshot())).await.is_err() {
                        return StreamEnd::ReceiverGone;
                    }
                }
                StreamEventKind::KeepAlive => {}
                StreamEventKind::Cancel | StreamEventKind::AuthRevoked => {
                    return StreamEnd::Fatal(RemoteError::Cancelled(event.data.clone()));
                }
                StreamEventKind::Other(name) => debug!(event = %name, "ignoring stream event"),
            }
        }
    }

    StreamEnd::Dropped(RemoteError::Transport("event stream closed".to_string()))
}

#[cfg(test)]
#[path = "../tests/firebase_tests.rs"]
mod tests;
