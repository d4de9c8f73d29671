// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Offline caching for OTLP/HTTP exports.
//!
//! [`PersistentHttpClient`] sits between an exporter and its HTTP transport. When
//! a request cannot be delivered (transport error, 429 or 5xx) the serialized
//! payload is spooled to disk. The next successful delivery replays the spool,
//! oldest first, stopping at the first request that still fails.
//!
//! ```text
//! exporter ──▶ PersistentHttpClient ──▶ BlockingHttpClient ──▶ network
//!                    │  ▲
//!          failure   ▼  │ replay after success
//!               <cache>/honeycomb/<signal>-cache/
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use opentelemetry_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};

use crate::config::Signal;
use crate::error::StorageError;
use crate::session::storage::STORAGE_NAMESPACE;

/// Spooled requests kept per signal before the oldest are evicted.
pub const DEFAULT_MAX_SPOOLED: usize = 500;

/// Default spool directory for `signal`, under the platform cache directory.
pub fn default_spool_dir(signal: Signal) -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| spool_dir_in(&dir.join(STORAGE_NAMESPACE), signal))
}

/// Spool directory for `signal` under `base`.
pub fn spool_dir_in(base: &Path, signal: Signal) -> PathBuf {
    base.join(format!("{}-cache", signal_cache_name(signal)))
}

fn signal_cache_name(signal: Signal) -> &'static str {
    match signal {
        Signal::Traces => "span",
        Signal::Metrics => "metric",
        Signal::Logs => "log",
    }
}

/// Whether a response means "try again later".
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// HTTP transport backed by a blocking `reqwest` client.
///
/// Exporters call it from the SDK's dedicated export threads, never from async tasks.
#[derive(Debug, Clone)]
pub struct BlockingHttpClient {
    client: reqwest::blocking::Client,
}

impl BlockingHttpClient {
    /// Build a client with a per-request timeout.
    ///
    /// The client is constructed on a scratch thread since `reqwest`'s blocking
    /// client refuses to start inside an async runtime.
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let client = std::thread::spawn(move || {
            reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
        })
        .join()
        .map_err(|_| "HTTP client construction panicked".to_string())?
        .map_err(|e| e.to_string())?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for BlockingHttpClient {
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        let (parts, body) = request.into_parts();
        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body.to_vec())
            .send()?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        let mut builder = Response::builder().status(status);
        if let Some(map) = builder.headers_mut() {
            *map = headers;
        }
        Ok(builder.body(body)?)
    }
}

/// Metadata of a spooled request; the body lives in a sibling file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SpooledRequest {
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
}

impl SpooledRequest {
    fn capture(request: &Request<Bytes>) -> Self {
        Self {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            headers: request
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect(),
        }
    }

    fn into_request(self, body: Bytes) -> Result<Request<Bytes>, StorageError> {
        let corrupted = |e: &dyn fmt::Display| StorageError::Corrupted(e.to_string());
        let method = Method::from_bytes(self.method.as_bytes()).map_err(|e| corrupted(&e))?;
        let mut builder = Request::builder().method(method).uri(self.uri.as_str());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| corrupted(&e))?;
            let value = HeaderValue::from_str(value).map_err(|e| corrupted(&e))?;
            builder = builder.header(name, value);
        }
        builder.body(body).map_err(|e| corrupted(&e))
    }
}

/// On-disk FIFO of undelivered requests.
#[derive(Debug)]
pub struct Spool {
    dir: PathBuf,
    max_entries: usize,
    lock: Mutex<()>,
}

impl Spool {
    /// Open (creating if needed) a spool directory.
    pub fn open(dir: &Path, max_entries: usize) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let metadata = std::fs::metadata(dir)?;
        if metadata.permissions().readonly() {
            return Err(StorageError::Unavailable(format!(
                "{} is read-only",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            max_entries: max_entries.max(1),
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of spooled requests.
    pub fn len(&self) -> usize {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, request: &SpooledRequest, body: &[u8]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let stem = format!("{:024}-{}", nanos, uuid::Uuid::new_v4().simple());
        self.write_entry(&stem, request, body)?;

        let entries = self.entries();
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            for stem in &entries[..excess] {
                tracing::debug!(entry = %stem, "Evicting oldest spooled export");
                if let Err(e) = self.remove(stem) {
                    tracing::debug!(entry = %stem, error = %e, "Failed to evict spooled export");
                }
            }
        }
        Ok(())
    }

    /// Write one entry, body first. Caller holds the lock.
    ///
    /// A metadata file is only ever visible with its body in place, and a failed
    /// metadata write leaves no body behind.
    fn write_entry(
        &self,
        stem: &str,
        request: &SpooledRequest,
        body: &[u8],
    ) -> Result<(), StorageError> {
        let body_path = self.dir.join(format!("{}.body", stem));
        std::fs::write(&body_path, body)?;

        let written = serde_json::to_vec(request)
            .map_err(StorageError::from)
            .and_then(|metadata| {
                std::fs::write(self.dir.join(format!("{}.json", stem)), metadata)
                    .map_err(StorageError::from)
            });
        if written.is_err() {
            let _ = std::fs::remove_file(&body_path);
        }
        written
    }

    /// Oldest spooled entry.
    fn peek(&self) -> Option<(String, Result<Request<Bytes>, StorageError>)> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let stem = self.entries().into_iter().next()?;
        let request = self.load(&stem);
        Some((stem, request))
    }

    fn load(&self, stem: &str) -> Result<Request<Bytes>, StorageError> {
        let metadata = std::fs::read(self.dir.join(format!("{}.json", stem)))?;
        let request: SpooledRequest = serde_json::from_slice(&metadata)?;
        let body = std::fs::read(self.dir.join(format!("{}.body", stem)))?;
        request.into_request(Bytes::from(body))
    }

    fn remove_entry(&self, stem: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.remove(stem)
    }

    /// Delete both files of an entry. Already-missing files are not an error.
    fn remove(&self, stem: &str) -> Result<(), StorageError> {
        for suffix in ["json", "body"] {
            match std::fs::remove_file(self.dir.join(format!("{}.{}", stem, suffix))) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Entry stems, oldest first. Caller holds the lock.
    fn entries(&self) -> Vec<String> {
        let mut stems: Vec<String> = std::fs::read_dir(&self.dir)
            .map(|dir| {
                dir.filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        entry
                            .file_name()
                            .to_str()
                            .and_then(|name| name.strip_suffix(".json"))
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();
        stems.sort();
        stems
    }
}

/// HTTP transport decorator that spools undeliverable payloads and replays them.
pub struct PersistentHttpClient<C> {
    inner: C,
    spool: Spool,
    replaying: AtomicBool,
}

impl<C: HttpClient + 'static> PersistentHttpClient<C> {
    pub fn new(inner: C, spool: Spool) -> Self {
        Self {
            inner,
            spool,
            replaying: AtomicBool::new(false),
        }
    }

    pub fn spool(&self) -> &Spool {
        &self.spool
    }

    fn save(&self, request: &SpooledRequest, body: &[u8]) {
        match self.spool.push(request, body) {
            Ok(()) => tracing::debug!(uri = %request.uri, "Spooled export for later delivery"),
            Err(e) => tracing::debug!(uri = %request.uri, error = %e, "Failed to spool export"),
        }
    }

    /// Deliver spooled requests until one fails or the spool is empty.
    async fn replay(&self) {
        if self.replaying.swap(true, Ordering::AcqRel) {
            return;
        }

        while let Some((stem, request)) = self.spool.peek() {
            let request = match request {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!(entry = %stem, error = %e, "Dropping unreadable spooled export");
                    if self.remove_or_stop(&stem) {
                        continue;
                    }
                    break;
                }
            };

            match self.inner.send_bytes(request).await {
                Ok(response) if is_retryable(response.status()) => break,
                Ok(response) => {
                    if !response.status().is_success() {
                        tracing::debug!(
                            entry = %stem,
                            status = %response.status(),
                            "Dropping spooled export rejected by the server"
                        );
                    }
                    if !self.remove_or_stop(&stem) {
                        break;
                    }
                }
                Err(_) => break,
            }
        }

        self.replaying.store(false, Ordering::Release);
    }

    /// Remove a handled entry. Returns false when it is still on disk, since the
    /// next peek would hand it back again.
    fn remove_or_stop(&self, stem: &str) -> bool {
        match self.spool.remove_entry(stem) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(entry = %stem, error = %e, "Stopping replay: spooled export could not be removed");
                false
            }
        }
    }
}

impl<C> fmt::Debug for PersistentHttpClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentHttpClient")
            .field("spool", &self.spool.dir)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: HttpClient + 'static> HttpClient for PersistentHttpClient<C> {
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        let snapshot = SpooledRequest::capture(&request);
        let body = request.body().clone();

        match self.inner.send_bytes(request).await {
            Ok(response) if is_retryable(response.status()) => {
                self.save(&snapshot, &body);
                Ok(response)
            }
            Ok(response) => {
                if response.status().is_success() {
                    self.replay().await;
                }
                Ok(response)
            }
            Err(e) => {
                self.save(&snapshot, &body);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Scripted transport: pops one outcome per request, succeeding once empty.
    #[derive(Debug, Clone, Default)]
    struct ScriptedClient {
        outcomes: Arc<Mutex<VecDeque<Option<StatusCode>>>>,
        sent: Arc<Mutex<Vec<Bytes>>>,
    }

    impl ScriptedClient {
        fn script(&self, outcomes: &[Option<StatusCode>]) {
            self.outcomes.lock().unwrap().extend(outcomes.iter().copied());
        }

        fn sent(&self) -> Vec<Bytes> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn send_bytes(
            &self,
            request: Request<Bytes>,
        ) -> Result<Response<Bytes>, HttpError> {
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Some(StatusCode::OK));
            self.sent.lock().unwrap().push(request.body().clone());
            match outcome {
                Some(status) => Ok(Response::builder().status(status).body(Bytes::new())?),
                None => Err("connection refused".into()),
            }
        }
    }

    fn request(body: &'static str) -> Request<Bytes> {
        Request::builder()
            .method(Method::POST)
            .uri("https://api.honeycomb.io:443/v1/traces")
            .header("content-type", "application/x-protobuf")
            .header("x-honeycomb-team", "key")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    fn client(temp: &TempDir, max: usize) -> (PersistentHttpClient<ScriptedClient>, ScriptedClient) {
        let inner = ScriptedClient::default();
        let spool = Spool::open(&temp.path().join("span-cache"), max).unwrap();
        (PersistentHttpClient::new(inner.clone(), spool), inner)
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 10);

        let response = client.send_bytes(request("one")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(client.spool().is_empty());
        assert_eq!(inner.sent(), vec![Bytes::from_static(b"one")]);
    }

    #[tokio::test]
    async fn test_transport_error_spools_and_returns_error() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 10);
        inner.script(&[None]);

        assert!(client.send_bytes(request("one")).await.is_err());
        assert_eq!(client.spool().len(), 1);
    }

    #[tokio::test]
    async fn test_retryable_status_spools() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 10);
        inner.script(&[
            Some(StatusCode::TOO_MANY_REQUESTS),
            Some(StatusCode::SERVICE_UNAVAILABLE),
            Some(StatusCode::BAD_REQUEST),
        ]);

        client.send_bytes(request("a")).await.unwrap();
        client.send_bytes(request("b")).await.unwrap();
        client.send_bytes(request("c")).await.unwrap();

        // 400 will never succeed, so it is not kept.
        assert_eq!(client.spool().len(), 2);
    }

    #[tokio::test]
    async fn test_success_replays_oldest_first() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 10);
        inner.script(&[None, None]);

        let _ = client.send_bytes(request("first")).await;
        let _ = client.send_bytes(request("second")).await;
        assert_eq!(client.spool().len(), 2);

        client.send_bytes(request("third")).await.unwrap();

        assert!(client.spool().is_empty());
        let sent = inner.sent();
        assert_eq!(
            sent[2..],
            [
                Bytes::from_static(b"third"),
                Bytes::from_static(b"first"),
                Bytes::from_static(b"second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_replay_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 10);
        inner.script(&[None, None]);
        let _ = client.send_bytes(request("first")).await;
        let _ = client.send_bytes(request("second")).await;

        // Live request succeeds, first replay fails.
        inner.script(&[Some(StatusCode::OK), Some(StatusCode::BAD_GATEWAY)]);
        client.send_bytes(request("third")).await.unwrap();

        assert_eq!(client.spool().len(), 2);
    }

    #[tokio::test]
    async fn test_replayed_request_keeps_headers() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 10);
        inner.script(&[None]);
        let _ = client.send_bytes(request("first")).await;

        let (stem, loaded) = client.spool().peek().unwrap();
        let loaded = loaded.unwrap();
        assert!(!stem.is_empty());
        assert_eq!(loaded.method(), Method::POST);
        assert_eq!(loaded.uri(), "https://api.honeycomb.io:443/v1/traces");
        assert_eq!(loaded.headers()["x-honeycomb-team"], "key");
        assert_eq!(loaded.body(), &Bytes::from_static(b"first"));
    }

    #[tokio::test]
    async fn test_spool_is_bounded() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 2);
        inner.script(&[None, None, None]);

        let _ = client.send_bytes(request("first")).await;
        let _ = client.send_bytes(request("second")).await;
        let _ = client.send_bytes(request("third")).await;

        assert_eq!(client.spool().len(), 2);
        let (_, oldest) = client.spool().peek().unwrap();
        assert_eq!(oldest.unwrap().body(), &Bytes::from_static(b"second"));
    }

    #[test]
    fn test_failed_metadata_write_leaves_no_body() {
        let temp = TempDir::new().unwrap();
        let spool = Spool::open(temp.path(), 10).unwrap();
        let stem = "000000000000000000000001-blocked";
        // A directory where the metadata file should go makes its write fail.
        std::fs::create_dir(temp.path().join(format!("{}.json", stem))).unwrap();

        let metadata = SpooledRequest::capture(&request("lost"));
        assert!(spool.write_entry(stem, &metadata, b"lost").is_err());

        assert!(!temp.path().join(format!("{}.body", stem)).exists());
    }

    #[test]
    fn test_remove_missing_entry_is_ok() {
        let temp = TempDir::new().unwrap();
        let spool = Spool::open(temp.path(), 10).unwrap();
        assert!(spool.remove_entry("000000000000000000000001-gone").is_ok());
    }

    #[tokio::test]
    async fn test_replay_stops_when_entry_cannot_be_removed() {
        let temp = TempDir::new().unwrap();
        let (client, inner) = client(&temp, 10);
        // Unreadable and undeletable: a directory named like a metadata file.
        std::fs::create_dir(
            client
                .spool()
                .dir()
                .join("000000000000000000000001-stuck.json"),
        )
        .unwrap();

        let response = client.send_bytes(request("live")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(inner.sent(), vec![Bytes::from_static(b"live")]);
        assert_eq!(client.spool().len(), 1);
    }

    #[test]
    fn test_unusable_spool_dir() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        assert!(Spool::open(&blocker.join("span-cache"), 10).is_err());
    }

    #[test]
    fn test_default_spool_dir_is_namespaced() {
        if let Some(dir) = default_spool_dir(Signal::Traces) {
            assert!(dir.ends_with("honeycomb/span-cache"));
        }
    }
}
