//! Candidate normalization against the supported-language set.

use tracing::debug;

use crate::config::NegotiationConfig;

/// Map a raw candidate onto a member of the supported-language set.
///
/// The candidate is trimmed, run through the configured conversion hook (if
/// any), and compared against the supported languages, case-folded on both
/// sides when `ignoreCase` is set. A match returns the supported set's exact
/// spelling, not the caller's, so downstream code always sees canonical
/// values. A hook failure counts as "no candidate" and is absorbed here.
///
/// # Arguments
/// * `candidate` - The raw candidate, or `None` when the source had nothing
/// * `config` - The validated negotiation configuration
///
/// # Returns
/// * `Some(language)` with the canonical supported spelling on a match
/// * `None` for absent, blank, hook-rejected, or unsupported candidates
pub fn normalize(candidate: Option<&str>, config: &NegotiationConfig) -> Option<String> {
    let trimmed = candidate?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let converted = match config.convert() {
        Some(hook) => match hook(trimmed) {
            Ok(value) => value,
            Err(error) => {
                debug!("conversion hook rejected candidate {:?}: {:#}", trimmed, error);
                return None;
            }
        },
        None => trimmed.to_string(),
    };

    find_supported(&converted, config)
}

fn find_supported(candidate: &str, config: &NegotiationConfig) -> Option<String> {
    if config.ignore_case() {
        let folded = candidate.to_lowercase();
        config
            .supported_languages()
            .iter()
            .find(|language| language.to_lowercase() == folded)
            .cloned()
    } else {
        config
            .supported_languages()
            .iter()
            .find(|language| language.as_str() == candidate)
            .cloned()
    }
}
