//! Collaborator boundary: what the hosting environment must supply.
//!
//! The negotiator never talks to a concrete web framework. Hosts implement
//! `RequestContext` over their request type (and `CookieStore` over whatever
//! backs their cookies); the in-memory implementations here serve tests,
//! previews, and adapters under development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Read access to the parts of an incoming request that detection inspects.
pub trait RequestContext: Send + Sync {
    /// Value of a query-string parameter, if present.
    fn query_param(&self, name: &str) -> Option<&str>;

    /// Raw value of a named header, if present.
    fn header(&self, name: &str) -> Option<&str>;

    /// The request path, as received.
    fn path(&self) -> &str;

    /// Cookie storage supplied by the hosting environment, when available.
    ///
    /// Returning `None` is valid for hosts without cookie support, but
    /// negotiation then refuses configurations that need cookies.
    fn cookie_store(&self) -> Option<&dyn CookieStore> {
        None
    }
}

/// Persistent cookie access. Both operations may suspend; both may fail.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Read a cookie. `Ok(None)` means "not present" and is not an error.
    async fn get(&self, name: &str) -> Result<Option<String>>;

    /// Write a cookie.
    async fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// Destination for per-request diagnostics, split into an info and an error
/// channel. A no-op implementation is valid.
pub trait DiagnosticSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink: forwards both channels to the `tracing` macros.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Sink that drops everything.
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Sink that records both channels; used to assert on diagnostics in tests.
#[derive(Default)]
pub struct RecordingSink {
    infos: StdMutex<Vec<String>>,
    errors: StdMutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().expect("diagnostic log poisoned").clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("diagnostic log poisoned").clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn info(&self, message: &str) {
        self.infos
            .lock()
            .expect("diagnostic log poisoned")
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("diagnostic log poisoned")
            .push(message.to_string());
    }
}

/// In-memory cookie store with a write counter.
///
/// The counter exists so tests can assert not just the final value but how
/// many writes produced it.
#[derive(Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cookie before the store is shared.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies
            .get_mut()
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Number of `set` calls performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.cookies.lock().await.get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        self.cookies
            .lock()
            .await
            .insert(name.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory request used by tests and the preview binary.
///
/// Header names are folded to lowercase on insert and lookup, matching how
/// HTTP header names compare.
#[derive(Default)]
pub struct SimpleRequest {
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    path: String,
    cookies: Option<Arc<dyn CookieStore>>,
}

impl SimpleRequest {
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookies = Some(store);
        self
    }
}

impl RequestContext for SimpleRequest {
    fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn cookie_store(&self) -> Option<&dyn CookieStore> {
        self.cookies.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_cookie_store_roundtrip() {
        let store = MemoryCookieStore::new();
        tokio_test::block_on(store.set("language", "fr")).expect("set should succeed");
        let value = tokio_test::block_on(store.get("language")).expect("get should succeed");
        assert_eq!(value, Some("fr".to_string()));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_memory_cookie_store_missing_cookie_is_none() {
        let store = MemoryCookieStore::new();
        let value = tokio_test::block_on(store.get("absent")).expect("get should succeed");
        assert_eq!(value, None);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_memory_cookie_store_seeding_does_not_count_as_write() {
        let store = MemoryCookieStore::new().with_cookie("language", "es");
        let value = tokio_test::block_on(store.get("language")).expect("get should succeed");
        assert_eq!(value, Some("es".to_string()));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_simple_request_accessors() {
        let request = SimpleRequest::new()
            .with_query("lang", "fr")
            .with_header("Accept-Language", "fr;q=0.9")
            .with_path("/fr/home");

        assert_eq!(request.query_param("lang"), Some("fr"));
        assert_eq!(request.query_param("other"), None);
        assert_eq!(request.header("accept-language"), Some("fr;q=0.9"));
        assert_eq!(request.header("ACCEPT-LANGUAGE"), Some("fr;q=0.9"));
        assert_eq!(request.path(), "/fr/home");
        assert!(request.cookie_store().is_none());
    }

    #[test]
    fn test_simple_request_exposes_cookie_store() {
        let store = Arc::new(MemoryCookieStore::new().with_cookie("language", "en"));
        let request = SimpleRequest::new().with_cookie_store(store);
        let value = tokio_test::block_on(
            request
                .cookie_store()
                .expect("store should be present")
                .get("language"),
        )
        .expect("get should succeed");
        assert_eq!(value, Some("en".to_string()));
    }

    #[test]
    fn test_recording_sink_captures_both_channels() {
        let sink = RecordingSink::new();
        sink.info("first");
        sink.error("second");
        assert_eq!(sink.infos(), vec!["first".to_string()]);
        assert_eq!(sink.errors(), vec!["second".to_string()]);
    }
}
