//! Multi-source language negotiation for web services.
//!
//! Given a request-shaped collaborator, this crate picks one language out of
//! a configured supported set by trying detection strategies in order
//! (query string, cookie, negotiation header, path segment) and falling back
//! deterministically when none of them produce a usable candidate.
//!
//! # Architecture
//!
//! - `header`: tolerant, quote-aware parser for quality-weighted header
//!   values; never fails, sorts candidates best-first
//! - `normalize`: maps raw candidates onto the supported set's canonical
//!   spellings, applying the optional conversion hook
//! - `config`: loose host-supplied options validated into an immutable
//!   configuration
//! - `strategy`: the four candidate sources behind one tagged enumeration
//! - `negotiate`: the ordered, fault-isolated pipeline with short-circuiting
//!   and the detected-only cookie cache write
//! - `request`: the collaborator traits a host implements, plus in-memory
//!   implementations for tests and previews
//!
//! # Example
//!
//! ```rust,ignore
//! use language_negotiator::{LanguageNegotiator, NegotiationConfig, NegotiationOptions};
//!
//! let options: NegotiationOptions = serde_json::from_value(serde_json::json!({
//!     "supportedLanguages": ["en", "fr", "es"],
//!     "fallbackLanguage": "en",
//! }))?;
//! let negotiator = LanguageNegotiator::new(NegotiationConfig::new(options)?);
//! let language = negotiator.negotiate(&request).await?;
//! ```

pub mod config;
pub mod header;
pub mod negotiate;
pub mod normalize;
pub mod request;
pub mod strategy;

pub use config::{ConfigError, ConvertFn, NegotiationConfig, NegotiationOptions};
pub use header::{parse_header_value, resolve_quality, HeaderEntry};
pub use negotiate::{LanguageNegotiator, NegotiateError};
pub use normalize::normalize;
pub use request::{
    CookieStore, DiagnosticSink, MemoryCookieStore, NoopSink, RecordingSink, RequestContext,
    SimpleRequest, TracingSink,
};
pub use strategy::Strategy;
