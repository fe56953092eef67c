//! Realtime catalog feed adapter.
//!
//! The product catalog lives in a realtime database that pushes changes over
//! a streaming HTTP endpoint (`text/event-stream`). The adapter owns a
//! long-lived listener task, normalizes the keyed product map into an ordered
//! list, and publishes [`CatalogSnapshot`]s through a `tokio::sync::watch`
//! channel.
//!
//! [`CatalogSubscription`] is the dispose contract: dropping it aborts the
//! listener, so a mounted view that holds the subscription cannot leak it.
//!
//! Feed rules:
//! - "no data" (a `null` payload) is an empty catalog, not an error
//! - stream or decode errors surface as [`FeedStatus::Error`] with a
//!   user-facing message; the last known products are retained
//! - the listener reconnects with a fixed delay until the subscription is
//!   dropped

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use rust_decimal::Decimal;
use urban_shoes_core::{ProductId, ProductRecord};

/// User-facing message when the feed cannot be read.
pub const PRODUCTS_LOAD_ERROR: &str = "Failed to load products. Please refresh.";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Errors from the feed listener.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request or stream read failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The stream sent an event we cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server revoked the stream (auth or listen cancellation).
    #[error("stream revoked: {0}")]
    Revoked(String),
}

/// Connection state of the catalog feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedStatus {
    /// No snapshot received yet.
    #[default]
    Loading,
    /// Live and current.
    Ready,
    /// The listener failed; the message is safe to show to users.
    Error(String),
}

/// A point-in-time view of the catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Products in feed order (ascending feed key).
    pub products: Vec<ProductRecord>,
    /// Connection state the snapshot was taken under.
    pub status: FeedStatus,
}

impl CatalogSnapshot {
    /// Whether the first snapshot is still pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == FeedStatus::Loading
    }

    /// The user-facing error message, if the feed is failing.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FeedStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Look up a single product by id.
    #[must_use]
    pub fn find(&self, id: &ProductId) -> Option<&ProductRecord> {
        self.products.iter().find(|product| &product.id == id)
    }
}

/// Factory for catalog subscriptions.
#[derive(Debug, Clone)]
pub struct CatalogFeed {
    client: reqwest::Client,
    stream_url: String,
}

impl CatalogFeed {
    /// Create a feed against a realtime database base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            stream_url: format!("{}/products.json", base_url.trim_end_matches('/')),
        }
    }

    /// Spawn the listener and return its subscription handle.
    ///
    /// The handle must be kept alive for as long as snapshots are wanted;
    /// dropping it tears the listener down.
    #[must_use]
    pub fn connect(&self) -> CatalogSubscription {
        let (tx, rx) = watch::channel(CatalogSnapshot::default());
        let client = self.client.clone();
        let url = self.stream_url.clone();
        let task = tokio::spawn(run_listener(client, url, tx));
        CatalogSubscription { rx, task }
    }
}

/// Handle to a live catalog subscription.
///
/// Dropping the handle aborts the listener task: subscribe on mount, drop on
/// unmount.
#[derive(Debug)]
pub struct CatalogSubscription {
    rx: watch::Receiver<CatalogSnapshot>,
    task: JoinHandle<()>,
}

impl CatalogSubscription {
    /// The latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.rx.borrow().clone()
    }

    /// A receiver for waiting on snapshot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<CatalogSnapshot> {
        self.rx.clone()
    }
}

impl Drop for CatalogSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Listener
// =============================================================================

async fn run_listener(
    client: reqwest::Client,
    url: String,
    tx: watch::Sender<CatalogSnapshot>,
) {
    let mut entries: BTreeMap<String, Value> = BTreeMap::new();

    loop {
        match stream_events(&client, &url, &tx, &mut entries).await {
            Ok(()) => debug!("catalog stream ended, reconnecting"),
            Err(e) => {
                warn!("catalog feed error: {e}");
                let products = tx.borrow().products.clone();
                tx.send_replace(CatalogSnapshot {
                    products,
                    status: FeedStatus::Error(PRODUCTS_LOAD_ERROR.to_owned()),
                });
            }
        }

        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Consume one stream connection until it ends or fails.
async fn stream_events(
    client: &reqwest::Client,
    url: &str,
    tx: &watch::Sender<CatalogSnapshot>,
    entries: &mut BTreeMap<String, Value>,
) -> Result<(), FeedError> {
    let response = client
        .get(url)
        .header("Accept", "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(boundary) = buffer.find("\n\n") {
            let frame = buffer.drain(..boundary + 2).collect::<String>();
            if let Some(event) = parse_frame(&frame) {
                handle_event(&event, tx, entries)?;
            }
        }
    }

    Ok(())
}

/// One server-sent event: its type line and data payload.
#[derive(Debug, PartialEq, Eq)]
struct SseEvent {
    event: String,
    data: String,
}

/// Parse an SSE frame into its event name and data payload.
fn parse_frame(frame: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data = String::new();

    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim().to_owned());
        } else if let Some(value) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.trim_start());
        }
    }

    event.map(|event| SseEvent { event, data })
}

/// Payload of `put` and `patch` events.
#[derive(Debug, Deserialize)]
struct ChangePayload {
    path: String,
    data: Value,
}

fn handle_event(
    event: &SseEvent,
    tx: &watch::Sender<CatalogSnapshot>,
    entries: &mut BTreeMap<String, Value>,
) -> Result<(), FeedError> {
    match event.event.as_str() {
        "put" => {
            let payload: ChangePayload = serde_json::from_str(&event.data)
                .map_err(|e| FeedError::Protocol(format!("bad put payload: {e}")))?;
            apply_put(entries, &payload.path, payload.data);
            publish(tx, entries);
        }
        "patch" => {
            let payload: ChangePayload = serde_json::from_str(&event.data)
                .map_err(|e| FeedError::Protocol(format!("bad patch payload: {e}")))?;
            apply_patch(entries, &payload.path, payload.data);
            publish(tx, entries);
        }
        "keep-alive" => {}
        "cancel" | "auth_revoked" => {
            return Err(FeedError::Revoked(event.event.clone()));
        }
        other => debug!("ignoring feed event: {other}"),
    }
    Ok(())
}

/// Apply a `put`: replace at the root, upsert or delete at a single key.
fn apply_put(entries: &mut BTreeMap<String, Value>, path: &str, data: Value) {
    if path == "/" {
        entries.clear();
        // A null root means "no data": an empty catalog.
        if let Value::Object(map) = data {
            entries.extend(map);
        }
        return;
    }

    // Single-key paths look like "/<key>"; deeper paths are field updates we
    // fold into the entry wholesale on the next root put.
    let key = path.trim_start_matches('/');
    if key.contains('/') {
        debug!("ignoring nested put at {path}");
        return;
    }

    if data.is_null() {
        entries.remove(key);
    } else {
        entries.insert(key.to_owned(), data);
    }
}

/// Apply a `patch` at the root: merge the given keys.
fn apply_patch(entries: &mut BTreeMap<String, Value>, path: &str, data: Value) {
    if path != "/" {
        debug!("ignoring nested patch at {path}");
        return;
    }
    if let Value::Object(map) = data {
        for (key, value) in map {
            if value.is_null() {
                entries.remove(&key);
            } else {
                entries.insert(key, value);
            }
        }
    }
}

fn publish(tx: &watch::Sender<CatalogSnapshot>, entries: &BTreeMap<String, Value>) {
    tx.send_replace(CatalogSnapshot {
        products: decode_products(entries),
        status: FeedStatus::Ready,
    });
}

/// Product fields as stored in the feed; the id is the map key.
#[derive(Debug, Deserialize)]
struct FeedProduct {
    name: String,
    price: Decimal,
    #[serde(default)]
    stock: u32,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, rename = "originalPrice")]
    original_price: Option<Decimal>,
}

/// Normalize the keyed map into feed-ordered records.
///
/// Iteration over the `BTreeMap` gives ascending key order, which is the
/// catalog's feed order. Malformed entries are skipped, not fatal.
fn decode_products(entries: &BTreeMap<String, Value>) -> Vec<ProductRecord> {
    entries
        .iter()
        .filter_map(|(key, value)| {
            match serde_json::from_value::<FeedProduct>(value.clone()) {
                Ok(fields) => Some(ProductRecord {
                    id: ProductId::new(key.as_str()),
                    name: fields.name,
                    price: fields.price,
                    stock: fields.stock,
                    category: fields.category,
                    description: fields.description,
                    image: fields.image,
                    original_price: fields.original_price,
                }),
                Err(e) => {
                    warn!("skipping malformed product {key}: {e}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, price: &str, stock: u32) -> Value {
        serde_json::json!({
            "name": name,
            "price": price,
            "stock": stock,
            "category": "Running",
        })
    }

    #[test]
    fn test_parse_frame_extracts_event_and_data() {
        let frame = "event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n";
        let event = parse_frame(frame).expect("valid frame");
        assert_eq!(event.event, "put");
        assert_eq!(event.data, "{\"path\":\"/\",\"data\":null}");
    }

    #[test]
    fn test_parse_frame_without_event_line_is_ignored() {
        assert_eq!(parse_frame(": comment only\n\n"), None);
    }

    #[test]
    fn test_root_put_replaces_catalog_in_key_order() {
        let mut entries = BTreeMap::new();
        apply_put(
            &mut entries,
            "/",
            serde_json::json!({
                "shoe-b": entry("Beta", "120", 5),
                "shoe-a": entry("Alpha", "80", 2),
            }),
        );

        let products = decode_products(&entries);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, ProductId::new("shoe-a"));
        assert_eq!(products[1].id, ProductId::new("shoe-b"));
    }

    #[test]
    fn test_null_root_put_is_empty_catalog() {
        let mut entries = BTreeMap::new();
        apply_put(&mut entries, "/", serde_json::json!({"x": entry("X", "10", 1)}));
        apply_put(&mut entries, "/", Value::Null);
        assert!(decode_products(&entries).is_empty());
    }

    #[test]
    fn test_single_key_put_upserts_and_deletes() {
        let mut entries = BTreeMap::new();
        apply_put(&mut entries, "/shoe-a", entry("Alpha", "80", 2));
        assert_eq!(decode_products(&entries).len(), 1);

        apply_put(&mut entries, "/shoe-a", Value::Null);
        assert!(decode_products(&entries).is_empty());
    }

    #[test]
    fn test_root_patch_merges_keys() {
        let mut entries = BTreeMap::new();
        apply_put(&mut entries, "/", serde_json::json!({"a": entry("A", "10", 1)}));
        apply_patch(
            &mut entries,
            "/",
            serde_json::json!({"b": entry("B", "20", 1), "a": Value::Null}),
        );

        let products = decode_products(&entries);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, ProductId::new("b"));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let mut entries = BTreeMap::new();
        entries.insert("good".to_owned(), entry("Good", "10", 1));
        entries.insert("bad".to_owned(), serde_json::json!({"price": "oops"}));

        let products = decode_products(&entries);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, ProductId::new("good"));
    }

    #[test]
    fn test_snapshot_find() {
        let mut entries = BTreeMap::new();
        apply_put(&mut entries, "/shoe-a", entry("Alpha", "80", 2));
        let snapshot = CatalogSnapshot {
            products: decode_products(&entries),
            status: FeedStatus::Ready,
        };

        assert!(snapshot.find(&ProductId::new("shoe-a")).is_some());
        assert!(snapshot.find(&ProductId::new("missing")).is_none());
        assert!(snapshot.error().is_none());
    }

    #[tokio::test]
    async fn test_revoked_event_fails_the_stream() {
        let (tx, _rx) = watch::channel(CatalogSnapshot::default());
        let mut entries = BTreeMap::new();
        let event = SseEvent {
            event: "cancel".to_owned(),
            data: "null".to_owned(),
        };

        let result = handle_event(&event, &tx, &mut entries);
        assert!(matches!(result, Err(FeedError::Revoked(_))));
    }
}
