//! The negotiation pipeline: ordered strategies, first success wins.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::NegotiationConfig;
use crate::request::{DiagnosticSink, RequestContext, TracingSink};
use crate::strategy::Strategy;

/// Failure that prevents negotiation from running at all.
///
/// Per-strategy failures are absorbed by the pipeline; only a broken
/// precondition surfaces to the caller.
#[derive(Debug, Error)]
pub enum NegotiateError {
    #[error(
        "the configuration requires cookie access ({reason}) but the request supplies no cookie store"
    )]
    MissingCookieStore { reason: &'static str },
}

/// Picks one language per request from a validated configuration.
///
/// Cheap to share: hold it in application state and call
/// [`negotiate`](LanguageNegotiator::negotiate) from concurrent request
/// handlers.
pub struct LanguageNegotiator {
    config: NegotiationConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl LanguageNegotiator {
    /// Build a negotiator with diagnostics routed to [`TracingSink`].
    pub fn new(config: NegotiationConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the diagnostic sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    /// Pick one language for the request.
    ///
    /// Strategies run strictly in configured order; the first that yields a
    /// normalized language wins and later strategies never execute. A
    /// strategy that fails is reported through the sink (when `debug` is
    /// set) and skipped. When every strategy comes up empty the configured
    /// fallback is returned. A fallback is never written to the cache;
    /// only actively detected languages are, and only when cookie caching
    /// is configured. A cache-write failure is likewise reported and
    /// discarded without touching the result.
    ///
    /// # Arguments
    /// * `request` - The request collaborator to inspect
    ///
    /// # Returns
    /// * `Ok(language)` - a member of the supported set (or the fallback)
    /// * `Err(NegotiateError)` - the configuration needs cookie access but
    ///   the request has no cookie store
    pub async fn negotiate(&self, request: &dyn RequestContext) -> Result<String, NegotiateError> {
        let config = &self.config;

        if let Some(reason) = self.cookie_requirement() {
            if request.cookie_store().is_none() {
                return Err(NegotiateError::MissingCookieStore { reason });
            }
        }

        let mut detected: Option<String> = None;
        for &strategy in config.order() {
            match strategy.detect(request, config).await {
                Ok(Some(language)) => {
                    if config.debug() {
                        self.sink
                            .info(&format!("{} strategy detected {:?}", strategy, language));
                    }
                    detected = Some(language);
                    break;
                }
                Ok(None) => {}
                Err(error) => {
                    // One broken strategy never aborts the pipeline.
                    if config.debug() {
                        self.sink
                            .error(&format!("{} strategy failed: {:#}", strategy, error));
                    }
                }
            }
        }

        let (language, was_detected) = match detected {
            Some(language) => (language, true),
            None => (config.fallback_language().to_string(), false),
        };
        debug!(
            "negotiated language {:?} ({})",
            language,
            if was_detected { "detected" } else { "fallback" }
        );

        if was_detected && config.cache_to_cookie() {
            self.write_cookie_cache(request, &language).await;
        }

        Ok(language)
    }

    /// Why cookie access is mandatory under the current configuration, if
    /// it is.
    fn cookie_requirement(&self) -> Option<&'static str> {
        if self.config.order().contains(&Strategy::Cookie) {
            Some("the cookie strategy is in the detection order")
        } else if self.config.cache_to_cookie() {
            Some("detections are cached in a cookie")
        } else {
            None
        }
    }

    async fn write_cookie_cache(&self, request: &dyn RequestContext, language: &str) {
        let Some(store) = request.cookie_store() else {
            // Unreachable when the precondition check ran; a custom
            // RequestContext returning inconsistent stores just loses the
            // cache write.
            return;
        };
        if let Err(error) = store.set(self.config.lookup_cookie(), language).await {
            if self.config.debug() {
                self.sink.error(&format!(
                    "caching {:?} in cookie {:?} failed: {:#}",
                    language,
                    self.config.lookup_cookie(),
                    error
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NegotiationOptions;
    use crate::request::{CookieStore, MemoryCookieStore, RecordingSink, SimpleRequest};
    use anyhow::bail;
    use async_trait::async_trait;
    use serde_json::json;

    fn negotiator(value: serde_json::Value) -> LanguageNegotiator {
        let options: NegotiationOptions =
            serde_json::from_value(value).expect("options should deserialize");
        LanguageNegotiator::new(NegotiationConfig::new(options).expect("config should validate"))
    }

    /// Store whose reads always fail; writes succeed.
    struct BrokenReadStore;

    #[async_trait]
    impl CookieStore for BrokenReadStore {
        async fn get(&self, _name: &str) -> anyhow::Result<Option<String>> {
            bail!("cookie backend offline")
        }

        async fn set(&self, _name: &str, _value: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Store whose writes always fail; reads find nothing.
    struct BrokenWriteStore;

    #[async_trait]
    impl CookieStore for BrokenWriteStore {
        async fn get(&self, _name: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _name: &str, _value: &str) -> anyhow::Result<()> {
            bail!("cookie write refused")
        }
    }

    // ==================== Precondition Tests ====================

    #[tokio::test]
    async fn test_cookie_strategy_without_store_is_fatal() {
        let negotiator = negotiator(json!({
            "order": ["cookie"],
            "caches": false,
            "supportedLanguages": ["en"],
        }));
        let result = negotiator.negotiate(&SimpleRequest::new()).await;
        assert!(matches!(
            result,
            Err(NegotiateError::MissingCookieStore { .. })
        ));
    }

    #[tokio::test]
    async fn test_cookie_caching_without_store_is_fatal() {
        let negotiator = negotiator(json!({
            "order": ["querystring"],
            "caches": ["cookie"],
            "supportedLanguages": ["en"],
        }));
        let result = negotiator.negotiate(&SimpleRequest::new()).await;
        assert!(matches!(
            result,
            Err(NegotiateError::MissingCookieStore { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_cookie_involvement_needs_no_store() {
        let negotiator = negotiator(json!({
            "order": ["querystring", "header"],
            "caches": false,
            "supportedLanguages": ["en", "fr"],
        }));
        let request = SimpleRequest::new().with_query("lang", "fr");
        let language = negotiator
            .negotiate(&request)
            .await
            .expect("negotiation should succeed");
        assert_eq!(language, "fr");
    }

    // ==================== Fault Isolation Tests ====================

    #[tokio::test]
    async fn test_failing_strategy_is_skipped_not_fatal() {
        let negotiator = negotiator(json!({
            "order": ["cookie", "header"],
            "caches": false,
            "supportedLanguages": ["en", "fr"],
        }));
        let request = SimpleRequest::new()
            .with_header("accept-language", "fr")
            .with_cookie_store(std::sync::Arc::new(BrokenReadStore));
        let language = negotiator
            .negotiate(&request)
            .await
            .expect("negotiation should survive the broken store");
        assert_eq!(language, "fr");
    }

    #[tokio::test]
    async fn test_strategy_failure_reported_when_debug_enabled() {
        let sink = std::sync::Arc::new(RecordingSink::new());
        let negotiator = negotiator(json!({
            "order": ["cookie"],
            "caches": false,
            "supportedLanguages": ["en"],
            "debug": true,
        }))
        .with_sink(sink.clone());
        let request =
            SimpleRequest::new().with_cookie_store(std::sync::Arc::new(BrokenReadStore));
        let language = negotiator
            .negotiate(&request)
            .await
            .expect("negotiation should fall back");
        assert_eq!(language, "en");
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cookie strategy failed"));
    }

    #[tokio::test]
    async fn test_strategy_failure_silent_when_debug_disabled() {
        let sink = std::sync::Arc::new(RecordingSink::new());
        let negotiator = negotiator(json!({
            "order": ["cookie"],
            "caches": false,
            "supportedLanguages": ["en"],
        }))
        .with_sink(sink.clone());
        let request =
            SimpleRequest::new().with_cookie_store(std::sync::Arc::new(BrokenReadStore));
        negotiator
            .negotiate(&request)
            .await
            .expect("negotiation should fall back");
        assert!(sink.errors().is_empty());
        assert!(sink.infos().is_empty());
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_change_result() {
        let sink = std::sync::Arc::new(RecordingSink::new());
        let negotiator = negotiator(json!({
            "order": ["querystring"],
            "caches": ["cookie"],
            "supportedLanguages": ["en", "fr"],
            "debug": true,
        }))
        .with_sink(sink.clone());
        let request = SimpleRequest::new()
            .with_query("lang", "fr")
            .with_cookie_store(std::sync::Arc::new(BrokenWriteStore));
        let language = negotiator
            .negotiate(&request)
            .await
            .expect("negotiation should succeed despite the failed write");
        assert_eq!(language, "fr");
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cookie write refused"));
    }

    // ==================== Detection Reporting Tests ====================

    #[tokio::test]
    async fn test_detection_reported_on_info_channel_when_debug_enabled() {
        let sink = std::sync::Arc::new(RecordingSink::new());
        let negotiator = negotiator(json!({
            "order": ["querystring"],
            "caches": false,
            "supportedLanguages": ["en", "fr"],
            "debug": true,
        }))
        .with_sink(sink.clone());
        let request = SimpleRequest::new().with_query("lang", "fr");
        negotiator
            .negotiate(&request)
            .await
            .expect("negotiation should succeed");
        let infos = sink.infos();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].contains("querystring"));
        assert!(infos[0].contains("fr"));
    }

    // ==================== Fallback Tests ====================

    #[tokio::test]
    async fn test_empty_order_always_falls_back() {
        let negotiator = negotiator(json!({
            "order": [],
            "caches": false,
            "supportedLanguages": ["en", "fr"],
        }));
        let request = SimpleRequest::new().with_query("lang", "fr");
        let language = negotiator
            .negotiate(&request)
            .await
            .expect("negotiation should succeed");
        assert_eq!(language, "en");
    }
}
