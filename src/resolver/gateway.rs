//! Gateway base-URL normalization and provider detection

use super::explicit::{
    AI_GATEWAY_BASE_URL, ANTHROPIC_API_KEY, ANTHROPIC_BASE_URL, OPENAI_API_KEY, OPENAI_BASE_URL,
};
use crate::SourceConfig;
use serde::Serialize;

/// Upstream provider an AI gateway URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayProvider {
    /// Anthropic-compatible endpoint (the default)
    #[default]
    Anthropic,
    /// OpenAI-compatible endpoint
    OpenAi,
}

/// Trailing path segments that select a non-default provider
const PROVIDER_SUFFIXES: &[(&str, GatewayProvider)] = &[("/openai", GatewayProvider::OpenAi)];

impl GatewayProvider {
    /// Detect the provider from an already-normalized gateway URL.
    ///
    /// Only the literal trailing path segment is considered.
    pub fn detect(normalized_url: Option<&str>) -> Self {
        normalized_url
            .and_then(|url| {
                PROVIDER_SUFFIXES
                    .iter()
                    .find(|(suffix, _)| url.ends_with(suffix))
                    .map(|(_, provider)| *provider)
            })
            .unwrap_or_default()
    }

    /// Output slot for this provider's API key
    pub fn api_key_var(self) -> &'static str {
        match self {
            GatewayProvider::Anthropic => ANTHROPIC_API_KEY,
            GatewayProvider::OpenAi => OPENAI_API_KEY,
        }
    }

    /// Output slot for this provider's base URL
    pub fn base_url_var(self) -> &'static str {
        match self {
            GatewayProvider::Anthropic => ANTHROPIC_BASE_URL,
            GatewayProvider::OpenAi => OPENAI_BASE_URL,
        }
    }
}

impl std::fmt::Display for GatewayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayProvider::Anthropic => write!(f, "anthropic"),
            GatewayProvider::OpenAi => write!(f, "openai"),
        }
    }
}

/// Strip every trailing `/` from a base URL
pub fn normalize_base_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// The gateway settings derived from a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gateway<'a> {
    /// Normalized base URL, if one survives normalization
    pub base_url: Option<&'a str>,
    /// Provider detected from `base_url`
    pub provider: GatewayProvider,
}

impl<'a> Gateway<'a> {
    /// Read and normalize `AI_GATEWAY_BASE_URL`
    pub fn from_source(source: &'a SourceConfig) -> Self {
        let base_url = source
            .text(AI_GATEWAY_BASE_URL)
            .map(normalize_base_url)
            .filter(|url| !url.is_empty());

        Self {
            base_url,
            provider: GatewayProvider::detect(base_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://gateway.ai.cloudflare.com/v1/123/my-gw";

    #[test]
    fn test_normalize_strips_all_trailing_slashes() {
        assert_eq!(normalize_base_url("https://x/anthropic"), "https://x/anthropic");
        assert_eq!(normalize_base_url("https://x/anthropic/"), "https://x/anthropic");
        assert_eq!(normalize_base_url("https://x/openai///"), "https://x/openai");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for url in ["https://x", "https://x/", "https://x//", "https://x/a/b////", ""] {
            let once = normalize_base_url(url);
            assert_eq!(normalize_base_url(once), once);
            assert!(!once.ends_with('/'));
        }
    }

    #[test]
    fn test_detect_provider() {
        assert_eq!(
            GatewayProvider::detect(Some(format!("{BASE}/openai").as_str())),
            GatewayProvider::OpenAi
        );
        assert_eq!(
            GatewayProvider::detect(Some(format!("{BASE}/anthropic").as_str())),
            GatewayProvider::Anthropic
        );
        assert_eq!(GatewayProvider::detect(None), GatewayProvider::Anthropic);
        // suffix test only, no URL parsing
        assert_eq!(GatewayProvider::detect(Some("openai")), GatewayProvider::Anthropic);
        assert_eq!(
            GatewayProvider::detect(Some(format!("{BASE}/openai/v1").as_str())),
            GatewayProvider::Anthropic
        );
        assert_eq!(
            GatewayProvider::detect(Some("not a url/openai")),
            GatewayProvider::OpenAi
        );
    }

    #[test]
    fn test_gateway_from_source() {
        let source =
            SourceConfig::new().with_text(AI_GATEWAY_BASE_URL, format!("{BASE}/openai//"));
        let gateway = Gateway::from_source(&source);
        assert_eq!(gateway.base_url, Some(format!("{BASE}/openai").as_str()));
        assert_eq!(gateway.provider, GatewayProvider::OpenAi);
    }

    #[test]
    fn test_slash_only_url_is_absent() {
        let source = SourceConfig::new().with_text(AI_GATEWAY_BASE_URL, "//");
        let gateway = Gateway::from_source(&source);
        assert_eq!(gateway.base_url, None);
        assert_eq!(gateway.provider, GatewayProvider::Anthropic);
    }

    #[test]
    fn test_provider_slots() {
        assert_eq!(GatewayProvider::OpenAi.api_key_var(), "OPENAI_API_KEY");
        assert_eq!(GatewayProvider::OpenAi.base_url_var(), "OPENAI_BASE_URL");
        assert_eq!(GatewayProvider::Anthropic.api_key_var(), "ANTHROPIC_API_KEY");
        assert_eq!(GatewayProvider::Anthropic.base_url_var(), "ANTHROPIC_BASE_URL");
    }
}
