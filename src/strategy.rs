//! Detection strategies: the four sources a language candidate can come
//! from, behind one tagged enumeration.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::config::{ConfigError, NegotiationConfig};
use crate::header::parse_header_value;
use crate::normalize::normalize;
use crate::request::RequestContext;

/// One source of a language candidate.
///
/// Strategy names are resolved from configuration at validation time, so an
/// unrecognized name never reaches request handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A query-string parameter (e.g. `?lang=fr`).
    QueryString,
    /// A cookie previously stored for the visitor.
    Cookie,
    /// The negotiation header, walked best-quality-first.
    Header,
    /// A path segment (e.g. the `fr` in `/fr/home`).
    Path,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::QueryString,
        Strategy::Cookie,
        Strategy::Header,
        Strategy::Path,
    ];

    /// The configuration name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::QueryString => "querystring",
            Strategy::Cookie => "cookie",
            Strategy::Header => "header",
            Strategy::Path => "path",
        }
    }

    /// Run this strategy against a request.
    ///
    /// Every candidate is routed through [`normalize`], so `Ok(Some(..))`
    /// always carries a canonical member of the supported set. Only the
    /// cookie strategy can actually fail; the others read request state
    /// infallibly.
    pub(crate) async fn detect(
        self,
        request: &dyn RequestContext,
        config: &NegotiationConfig,
    ) -> Result<Option<String>> {
        match self {
            Strategy::QueryString => Ok(from_query_string(request, config)),
            Strategy::Cookie => from_cookie(request, config).await,
            Strategy::Header => Ok(from_header(request, config)),
            Strategy::Path => Ok(from_path(request, config)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "querystring" => Ok(Strategy::QueryString),
            "cookie" => Ok(Strategy::Cookie),
            "header" => Ok(Strategy::Header),
            "path" => Ok(Strategy::Path),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

fn from_query_string(request: &dyn RequestContext, config: &NegotiationConfig) -> Option<String> {
    normalize(request.query_param(config.lookup_query_string()), config)
}

async fn from_cookie(
    request: &dyn RequestContext,
    config: &NegotiationConfig,
) -> Result<Option<String>> {
    let store = request
        .cookie_store()
        .context("cookie strategy configured but the request has no cookie store")?;
    let raw = store
        .get(config.lookup_cookie())
        .await
        .with_context(|| format!("reading cookie {:?}", config.lookup_cookie()))?;
    Ok(normalize(raw.as_deref(), config))
}

fn from_header(request: &dyn RequestContext, config: &NegotiationConfig) -> Option<String> {
    let raw = request.header(config.lookup_from_header_key());
    for entry in parse_header_value(raw) {
        if let Some(language) = normalize(Some(&entry.value), config) {
            return Some(language);
        }
    }
    None
}

fn from_path(request: &dyn RequestContext, config: &NegotiationConfig) -> Option<String> {
    // Empty segments are dropped so leading/trailing slashes never shift
    // the configured index.
    let segment = request
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .nth(config.lookup_from_path_index());
    normalize(segment, config)
}
