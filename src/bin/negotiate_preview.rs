//! Preview tool: runs a handful of canned requests through a negotiator and
//! logs what each one resolves to. Useful for eyeballing configuration
//! changes without wiring up a host application.

use std::sync::Arc;

use anyhow::Result;
use language_negotiator::{
    LanguageNegotiator, MemoryCookieStore, NegotiationConfig, NegotiationOptions, SimpleRequest,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("language_negotiator=info".parse()?),
        )
        .init();

    let options: NegotiationOptions = serde_json::from_value(serde_json::json!({
        "order": ["querystring", "cookie", "header", "path"],
        "supportedLanguages": ["en", "fr", "es"],
        "fallbackLanguage": "en",
        "debug": true,
    }))?;
    let negotiator = LanguageNegotiator::new(NegotiationConfig::new(options)?);

    let previews = vec![
        (
            "query override",
            SimpleRequest::new().with_query("lang", "fr"),
            MemoryCookieStore::new(),
        ),
        (
            "unsupported query value",
            SimpleRequest::new().with_query("lang", "de"),
            MemoryCookieStore::new(),
        ),
        (
            "returning visitor cookie",
            SimpleRequest::new(),
            MemoryCookieStore::new().with_cookie("language", "es"),
        ),
        (
            "browser header",
            SimpleRequest::new().with_header("accept-language", "de;q=0.9,es;q=0.8,en;q=0.1"),
            MemoryCookieStore::new(),
        ),
        (
            "path prefix",
            SimpleRequest::new().with_path("/es/pricing"),
            MemoryCookieStore::new(),
        ),
        ("nothing to go on", SimpleRequest::new(), MemoryCookieStore::new()),
    ];

    for (label, request, store) in previews {
        let store = Arc::new(store);
        let request = request.with_cookie_store(store.clone());
        let language = negotiator.negotiate(&request).await?;
        info!(
            "{}: negotiated {} ({} cookie write{})",
            label,
            language,
            store.write_count(),
            if store.write_count() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
