//! Negotiation configuration: loose options in, validated config out.
//!
//! `NegotiationOptions` mirrors the configuration surface hosts feed in
//! (typically deserialized from JSON, hence the camelCase field names) and
//! accepts anything serde can read. `NegotiationConfig::new` is the single
//! validation gate: it resolves strategy names, checks the supported set and
//! fallback, and freezes the result. Nothing downstream re-validates.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::Strategy;

/// Optional hook applied to a detected candidate before it is matched
/// against the supported set (e.g. collapsing `en-US` to `en`). An `Err`
/// makes the candidate count as invalid; it never propagates further.
pub type ConvertFn = Arc<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>;

/// Raw configuration as supplied by the host.
///
/// Every field has a default, so `{}` deserializes to a working setup that
/// detects via querystring, cookie, then header, supports only `en`, and
/// caches detections in the `language` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NegotiationOptions {
    /// Strategy names tried in order: `querystring`, `cookie`, `header`,
    /// `path`.
    pub order: Vec<String>,

    /// Query-string parameter holding a language override.
    pub lookup_query_string: String,

    /// Cookie name read by the cookie strategy and written by the cache.
    pub lookup_cookie: String,

    /// Header inspected by the header strategy.
    pub lookup_from_header_key: String,

    /// Which non-empty path segment the path strategy reads.
    pub lookup_from_path_index: usize,

    /// Where detections are cached. Deliberately loose: only an array
    /// containing `"cookie"` enables caching, every other shape (including
    /// `true`) disables it.
    pub caches: serde_json::Value,

    /// Case-insensitive matching against the supported set.
    pub ignore_case: bool,

    /// Language used when no strategy detects anything.
    pub fallback_language: String,

    /// Languages the application can serve; matches are canonicalized to
    /// these exact spellings.
    pub supported_languages: Vec<String>,

    /// Route per-request diagnostics to the configured sink.
    pub debug: bool,
}

impl Default for NegotiationOptions {
    fn default() -> Self {
        Self {
            order: vec![
                Strategy::QueryString.to_string(),
                Strategy::Cookie.to_string(),
                Strategy::Header.to_string(),
            ],
            lookup_query_string: "lang".to_string(),
            lookup_cookie: "language".to_string(),
            lookup_from_header_key: "accept-language".to_string(),
            lookup_from_path_index: 0,
            caches: serde_json::json!(["cookie"]),
            ignore_case: true,
            fallback_language: "en".to_string(),
            supported_languages: vec!["en".to_string()],
            debug: false,
        }
    }
}

/// Configuration rejected at construction time, before any request runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown detection strategy {0:?} (expected querystring, cookie, header, or path)")]
    UnknownStrategy(String),

    #[error("detection strategy {0} listed more than once in order")]
    DuplicateStrategy(Strategy),

    #[error("supportedLanguages must not be empty")]
    NoSupportedLanguages,

    #[error("fallbackLanguage {fallback:?} is not among supportedLanguages {supported:?}")]
    FallbackNotSupported {
        fallback: String,
        supported: Vec<String>,
    },
}

/// Validated, immutable negotiation configuration.
///
/// Built once per negotiator and shared read-only across requests.
#[derive(Clone)]
pub struct NegotiationConfig {
    order: Vec<Strategy>,
    lookup_query_string: String,
    lookup_cookie: String,
    lookup_from_header_key: String,
    lookup_from_path_index: usize,
    cache_to_cookie: bool,
    ignore_case: bool,
    fallback_language: String,
    supported_languages: Vec<String>,
    convert: Option<ConvertFn>,
    debug: bool,
}

impl NegotiationConfig {
    /// Validate raw options into a usable configuration.
    ///
    /// # Arguments
    /// * `options` - The raw options, usually deserialized from host config
    ///
    /// # Returns
    /// * `Ok(NegotiationConfig)` when every option checks out
    /// * `Err(ConfigError)` on an unknown or repeated strategy name, an
    ///   empty supported set, or a fallback outside the supported set
    pub fn new(options: NegotiationOptions) -> Result<Self, ConfigError> {
        let mut order = Vec::with_capacity(options.order.len());
        for name in &options.order {
            let strategy: Strategy = name.parse()?;
            if order.contains(&strategy) {
                return Err(ConfigError::DuplicateStrategy(strategy));
            }
            order.push(strategy);
        }

        if options.supported_languages.is_empty() {
            return Err(ConfigError::NoSupportedLanguages);
        }
        if !options
            .supported_languages
            .contains(&options.fallback_language)
        {
            return Err(ConfigError::FallbackNotSupported {
                fallback: options.fallback_language,
                supported: options.supported_languages,
            });
        }

        Ok(Self {
            order,
            lookup_query_string: options.lookup_query_string,
            lookup_cookie: options.lookup_cookie,
            lookup_from_header_key: options.lookup_from_header_key,
            lookup_from_path_index: options.lookup_from_path_index,
            cache_to_cookie: cookie_cache_enabled(&options.caches),
            ignore_case: options.ignore_case,
            fallback_language: options.fallback_language,
            supported_languages: options.supported_languages,
            convert: None,
            debug: options.debug,
        })
    }

    /// Install a conversion hook applied to every detected candidate.
    pub fn with_convert(
        mut self,
        hook: impl Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.convert = Some(Arc::new(hook));
        self
    }

    /// Strategies in the order they are tried.
    pub fn order(&self) -> &[Strategy] {
        &self.order
    }

    pub fn lookup_query_string(&self) -> &str {
        &self.lookup_query_string
    }

    pub fn lookup_cookie(&self) -> &str {
        &self.lookup_cookie
    }

    pub fn lookup_from_header_key(&self) -> &str {
        &self.lookup_from_header_key
    }

    pub fn lookup_from_path_index(&self) -> usize {
        self.lookup_from_path_index
    }

    /// Whether detections are written back to the lookup cookie.
    pub fn cache_to_cookie(&self) -> bool {
        self.cache_to_cookie
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    pub fn convert(&self) -> Option<&ConvertFn> {
        self.convert.as_ref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl fmt::Debug for NegotiationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiationConfig")
            .field("order", &self.order)
            .field("lookup_query_string", &self.lookup_query_string)
            .field("lookup_cookie", &self.lookup_cookie)
            .field("lookup_from_header_key", &self.lookup_from_header_key)
            .field("lookup_from_path_index", &self.lookup_from_path_index)
            .field("cache_to_cookie", &self.cache_to_cookie)
            .field("ignore_case", &self.ignore_case)
            .field("fallback_language", &self.fallback_language)
            .field("supported_languages", &self.supported_languages)
            .field("convert", &self.convert.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

/// Caching is opted into by listing `"cookie"` in an array; any other shape
/// of the `caches` value, truthy or not, leaves caching off.
fn cookie_cache_enabled(caches: &serde_json::Value) -> bool {
    caches
        .as_array()
        .map(|targets| targets.iter().any(|target| target == "cookie"))
        .unwrap_or(false)
}
