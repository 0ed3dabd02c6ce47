//! Explicit rule table
//!
//! Rules run in a fixed order and never consult the passthrough blocklist:
//! 1. direct provider keys
//! 2. gateway API key placement
//! 3. base URL propagation
//! 4. flat pass-through mappings (built-in, then configured)

use super::gateway::{Gateway, GatewayProvider};
use crate::{ResolvedEnv, SourceConfig};
use serde::Serialize;
use tracing::debug;

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_OAUTH_TOKEN: &str = "ANTHROPIC_OAUTH_TOKEN";
pub const ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const AI_GATEWAY_API_KEY: &str = "AI_GATEWAY_API_KEY";
pub const AI_GATEWAY_BASE_URL: &str = "AI_GATEWAY_BASE_URL";

/// Provider credentials copied verbatim when set directly
pub const DIRECT_PROVIDER_KEYS: &[&str] =
    &[ANTHROPIC_API_KEY, ANTHROPIC_OAUTH_TOKEN, OPENAI_API_KEY];

/// Output slots the gateway key may land in, in priority order
pub const GATEWAY_KEY_SLOTS: &[&str] =
    &[OPENAI_API_KEY, ANTHROPIC_API_KEY, AI_GATEWAY_API_KEY];

/// Output slots the gateway base URL is written to
pub const GATEWAY_URL_SLOTS: &[&str] =
    &[AI_GATEWAY_BASE_URL, OPENAI_BASE_URL, ANTHROPIC_BASE_URL];

/// Source key to output key, applied when the source is set
pub const FLAT_MAPPINGS: &[(&str, &str)] = &[
    // renamed for the container
    ("MOLTBOT_GATEWAY_TOKEN", "OPENCLAW_GATEWAY_TOKEN"),
    ("DEV_MODE", "OPENCLAW_DEV_MODE"),
    ("OPENCLAW_BIND_MODE", "OPENCLAW_BIND_MODE"),
    // chat channels
    ("TELEGRAM_BOT_TOKEN", "TELEGRAM_BOT_TOKEN"),
    ("TELEGRAM_DM_POLICY", "TELEGRAM_DM_POLICY"),
    ("DISCORD_BOT_TOKEN", "DISCORD_BOT_TOKEN"),
    ("DISCORD_DM_POLICY", "DISCORD_DM_POLICY"),
    ("SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"),
    ("SLACK_APP_TOKEN", "SLACK_APP_TOKEN"),
    ("CDP_SECRET", "CDP_SECRET"),
    ("WORKER_URL", "WORKER_URL"),
    // cloud and source control
    ("CLOUDFLARE_API_TOKEN", "CLOUDFLARE_API_TOKEN"),
    ("CLOUDFLARE_ACCOUNT_ID", "CLOUDFLARE_ACCOUNT_ID"),
    ("CF_ACCOUNT_ID", "CF_ACCOUNT_ID"),
    ("GITHUB_PAT", "GITHUB_PAT"),
    ("GITHUB_REPO", "GITHUB_REPO"),
    // skills
    ("AGENTMAIL_API_KEY", "AGENTMAIL_API_KEY"),
    ("GOG_KEYRING_PASSWORD", "GOG_KEYRING_PASSWORD"),
    ("GOOGLE_API_KEY", "GOOGLE_API_KEY"),
    ("ELEVENLABS_API_KEY", "ELEVENLABS_API_KEY"),
    ("BRAVE_API_KEY", "BRAVE_API_KEY"),
];

/// A configured source-to-output mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvMapping {
    pub from: String,
    pub to: String,
}

impl EnvMapping {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One output key written by the explicit phase, and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    pub source: String,
    pub target: String,
}

/// Result of the explicit phase
#[derive(Debug, Default)]
pub struct ExplicitOutput {
    pub env: ResolvedEnv,
    pub claims: Vec<Claim>,
}

impl ExplicitOutput {
    fn set(&mut self, source: &str, target: &str, value: &str) {
        debug!(source = %source, target = %target, "explicit rule");
        self.env.insert(target, value);
        self.claims.push(Claim {
            source: source.to_string(),
            target: target.to_string(),
        });
    }

    fn has(&self, key: &str) -> bool {
        self.env.contains_key(key)
    }

    /// Output keys produced from a given source key
    pub fn targets_of<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.source == source)
            .map(|c| c.target.as_str())
    }
}

/// The explicit rule table, plus any configured extra mappings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitRules {
    extra_mappings: Vec<EnvMapping>,
}

impl ExplicitRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapping after the built-in flat mappings
    pub fn with_mapping(mut self, mapping: EnvMapping) -> Self {
        self.extra_mappings.push(mapping);
        self
    }

    pub fn extra_mappings(&self) -> &[EnvMapping] {
        &self.extra_mappings
    }

    /// Every output key some rule may produce from `key`, in rule order.
    ///
    /// Empty when no explicit rule reads `key`.
    pub fn candidate_targets<'a>(&'a self, key: &str) -> Vec<&'a str> {
        let mut targets: Vec<&'a str> = Vec::new();
        let mut push = |target: &'a str| {
            if !targets.contains(&target) {
                targets.push(target);
            }
        };

        if let Some(direct) = DIRECT_PROVIDER_KEYS.iter().find(|k| **k == key) {
            push(*direct);
        }
        if key == AI_GATEWAY_API_KEY {
            GATEWAY_KEY_SLOTS.iter().for_each(|slot| push(*slot));
        }
        if key == AI_GATEWAY_BASE_URL {
            GATEWAY_URL_SLOTS.iter().for_each(|slot| push(*slot));
        }
        if key == ANTHROPIC_BASE_URL {
            push(ANTHROPIC_BASE_URL);
        }
        for (from, to) in FLAT_MAPPINGS {
            if *from == key {
                push(*to);
            }
        }
        for mapping in &self.extra_mappings {
            if mapping.from == key {
                push(mapping.to.as_str());
            }
        }

        targets
    }

    /// Whether a set `key` is always written back under its own name,
    /// leaving nothing for the dynamic phase to do.
    ///
    /// The gateway key is excluded since it only keeps its name when both
    /// provider slots are taken.
    pub fn claims_own_name(&self, key: &str) -> bool {
        DIRECT_PROVIDER_KEYS.iter().any(|k| *k == key)
            || key == AI_GATEWAY_BASE_URL
            || FLAT_MAPPINGS.iter().any(|(from, to)| *from == key && *to == key)
            || self
                .extra_mappings
                .iter()
                .any(|m| m.from == key && m.to == key)
    }

    /// Run every explicit rule against a snapshot
    pub fn apply(&self, source: &SourceConfig) -> ExplicitOutput {
        let mut out = ExplicitOutput::default();
        let gateway = Gateway::from_source(source);

        self.apply_direct_keys(source, &mut out);
        self.apply_gateway_key(source, &gateway, &mut out);
        self.apply_base_url(source, &gateway, &mut out);
        self.apply_flat_mappings(source, &mut out);

        out
    }

    fn apply_direct_keys(&self, source: &SourceConfig, out: &mut ExplicitOutput) {
        for key in DIRECT_PROVIDER_KEYS {
            if let Some(value) = source.text(key) {
                out.set(key, key, value);
            }
        }
    }

    /// Route the gateway key to the first free natural slot, or keep it
    /// under its own name when a direct credential already occupies it.
    fn apply_gateway_key(
        &self,
        source: &SourceConfig,
        gateway: &Gateway<'_>,
        out: &mut ExplicitOutput,
    ) {
        let Some(key) = source.text(AI_GATEWAY_API_KEY) else {
            return;
        };

        let natural = gateway.provider.api_key_var();
        let target = if gateway.provider == GatewayProvider::OpenAi && !out.has(natural) {
            natural
        } else if !out.has(ANTHROPIC_API_KEY) && !out.has(ANTHROPIC_OAUTH_TOKEN) {
            GatewayProvider::Anthropic.api_key_var()
        } else {
            AI_GATEWAY_API_KEY
        };

        out.set(AI_GATEWAY_API_KEY, target, key);
    }

    fn apply_base_url(
        &self,
        source: &SourceConfig,
        gateway: &Gateway<'_>,
        out: &mut ExplicitOutput,
    ) {
        if let Some(url) = gateway.base_url {
            out.set(AI_GATEWAY_BASE_URL, AI_GATEWAY_BASE_URL, url);
            out.set(AI_GATEWAY_BASE_URL, gateway.provider.base_url_var(), url);
        } else if let Some(url) = source.text(ANTHROPIC_BASE_URL) {
            out.set(ANTHROPIC_BASE_URL, ANTHROPIC_BASE_URL, url);
        }
    }

    fn apply_flat_mappings(&self, source: &SourceConfig, out: &mut ExplicitOutput) {
        for (from, to) in FLAT_MAPPINGS {
            if let Some(value) = source.text(from) {
                out.set(from, to, value);
            }
        }

        // configured mappings never replace a key the table already wrote
        for mapping in &self.extra_mappings {
            if out.has(&mapping.to) {
                debug!(
                    source = %mapping.from,
                    target = %mapping.to,
                    "mapping target already set, skipping"
                );
                continue;
            }
            if let Some(value) = source.text(&mapping.from) {
                out.set(&mapping.from, &mapping.to, value);
            }
        }
    }
}
