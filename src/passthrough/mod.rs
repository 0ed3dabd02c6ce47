//! Dynamic secret passthrough
//!
//! Forwards any string-valued key that follows an approved naming
//! convention, without a dedicated explicit rule. Conventions are plain
//! ordered lists checked per key:
//! - prefixes (`SKILL_NOTION_API_KEY`, `API_AIRTABLE_TOKEN`)
//! - suffixes (`DISCORD_TOKEN`, `LINEAR_API_KEY`, `NOTION_API`)
//!
//! The blocklist is checked before either list and always wins.

mod types;

pub use types::*;

use crate::{ResolvedEnv, SourceConfig, SourceValue};
use tracing::debug;

/// Prefixes for dynamic secret passthrough
pub const DYNAMIC_SECRET_PREFIXES: &[&str] = &[
    "SKILL_", // skill-specific secrets
    "API_",   // third-party API keys
];

/// Suffixes for dynamic secret passthrough
pub const DYNAMIC_SECRET_SUFFIXES: &[&str] = &[
    "_TOKEN",   // DISCORD_TOKEN, SLACK_BOT_TOKEN
    "_API_KEY", // LINEAR_API_KEY
    "_API",     // NOTION_API
];

/// Key prefixes that are never forwarded dynamically
pub const PASSTHROUGH_BLOCKLIST: &[&str] = &["CF_ACCESS_", "R2_SECRET_"];

/// Infrastructure binding names that are never forwarded dynamically
pub const PASSTHROUGH_BLOCKED_NAMES: &[&str] = &["MOLTBOT_BUCKET", "BROWSER_KV"];

/// Check a key against the default blocklist
pub fn is_blocklisted(key: &str) -> bool {
    PASSTHROUGH_BLOCKLIST.iter().any(|p| key.starts_with(p))
        || PASSTHROUGH_BLOCKED_NAMES.iter().any(|name| key == *name)
}

/// Check a key against the default prefixes
pub fn has_dynamic_prefix(key: &str) -> bool {
    DYNAMIC_SECRET_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Check a key against the default suffixes
pub fn has_dynamic_suffix(key: &str) -> bool {
    DYNAMIC_SECRET_SUFFIXES.iter().any(|s| key.ends_with(s))
}

/// Prefix OR suffix match against the defaults. Does not consult the blocklist.
pub fn is_dynamic_secret(key: &str) -> bool {
    has_dynamic_prefix(key) || has_dynamic_suffix(key)
}

/// A configurable set of passthrough conventions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughRules {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    blocklist: Vec<BlockPattern>,
}

impl PassthroughRules {
    /// Rules that forward nothing
    pub fn empty() -> Self {
        Self {
            prefixes: Vec::new(),
            suffixes: Vec::new(),
            blocklist: Vec::new(),
        }
    }

    /// The built-in conventions
    pub fn defaults() -> Self {
        let mut rules = Self::empty();
        for p in DYNAMIC_SECRET_PREFIXES {
            rules.add_prefix(*p);
        }
        for s in DYNAMIC_SECRET_SUFFIXES {
            rules.add_suffix(*s);
        }
        for p in PASSTHROUGH_BLOCKLIST {
            rules.add_block(BlockPattern::prefix(*p));
        }
        for name in PASSTHROUGH_BLOCKED_NAMES {
            rules.add_block(BlockPattern::exact(*name));
        }
        rules
    }

    /// Add a forwarding prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.add_prefix(prefix);
        self
    }

    /// Add a forwarding suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.add_suffix(suffix);
        self
    }

    /// Add a blocklist entry
    pub fn with_block(mut self, pattern: BlockPattern) -> Self {
        self.add_block(pattern);
        self
    }

    pub fn add_prefix(&mut self, prefix: impl Into<String>) {
        push_unique(&mut self.prefixes, prefix.into());
    }

    pub fn add_suffix(&mut self, suffix: impl Into<String>) {
        push_unique(&mut self.suffixes, suffix.into());
    }

    pub fn add_block(&mut self, pattern: BlockPattern) {
        if !self.blocklist.contains(&pattern) {
            self.blocklist.push(pattern);
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn blocklist(&self) -> &[BlockPattern] {
        &self.blocklist
    }

    pub fn is_blocklisted(&self, key: &str) -> bool {
        self.blocklist.iter().any(|b| b.matches(key))
    }

    pub fn has_dynamic_prefix(&self, key: &str) -> bool {
        self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }

    pub fn has_dynamic_suffix(&self, key: &str) -> bool {
        self.suffixes.iter().any(|s| key.ends_with(s.as_str()))
    }

    /// Prefix OR suffix match. Does not consult the blocklist.
    pub fn is_dynamic_secret(&self, key: &str) -> bool {
        self.has_dynamic_prefix(key) || self.has_dynamic_suffix(key)
    }

    /// Classify a key name alone, as if it held a string nobody claimed
    pub fn classify_name(&self, key: &str) -> DynamicOutcome {
        if self.is_blocklisted(key) {
            DynamicOutcome::Blocklisted
        } else if self.is_dynamic_secret(key) {
            DynamicOutcome::Forwarded
        } else {
            DynamicOutcome::Unmatched
        }
    }

    /// Decide the dynamic outcome for one source entry.
    ///
    /// Check order is fixed: claimed key, type guard, blocklist, predicate.
    pub fn outcome(&self, key: &str, value: &SourceValue, already_set: bool) -> DynamicOutcome {
        if already_set {
            return DynamicOutcome::AlreadySet;
        }
        if !value.is_string() {
            return DynamicOutcome::NotString;
        }
        self.classify_name(key)
    }

    /// Run the dynamic phase over a snapshot, adding matches to `env`.
    ///
    /// Keys already in `env` are never overwritten.
    pub fn apply(&self, source: &SourceConfig, env: &mut ResolvedEnv) {
        let mut forwarded = 0usize;
        for (key, value) in source.iter() {
            let outcome = self.outcome(key, value, env.contains_key(key));
            match (outcome, value.as_str()) {
                (DynamicOutcome::Forwarded, Some(text)) => {
                    debug!(key = %key, "dynamic passthrough");
                    env.insert(key, text);
                    forwarded += 1;
                }
                (DynamicOutcome::Blocklisted, _) => {
                    debug!(key = %key, "blocked from dynamic passthrough");
                }
                _ => {}
            }
        }
        debug!(forwarded, "dynamic phase complete");
    }
}

impl Default for PassthroughRules {
    fn default() -> Self {
        Self::defaults()
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_prefix() {
        assert!(is_dynamic_secret("SKILL_TEST"));
        assert!(is_dynamic_secret("SKILL_"));
    }

    #[test]
    fn test_api_prefix() {
        assert!(is_dynamic_secret("API_TEST"));
        assert!(is_dynamic_secret("API_"));
    }

    #[test]
    fn test_non_matching_names() {
        assert!(!is_dynamic_secret("RANDOM_KEY"));
        assert!(!is_dynamic_secret("skill_lowercase"));
        assert!(!is_dynamic_secret("MYSKILL_KEY"));
        assert!(!is_dynamic_secret("MY_TOKEN_THING"));
    }

    #[test]
    fn test_suffixes() {
        assert!(has_dynamic_suffix("DISCORD_TOKEN"));
        assert!(has_dynamic_suffix("LINEAR_API_KEY"));
        assert!(has_dynamic_suffix("NOTION_API"));
        assert!(!has_dynamic_suffix("NOTION_API_URL"));
        assert!(!has_dynamic_prefix("NOTION_API"));
    }

    #[test]
    fn test_default_blocklist() {
        assert!(is_blocklisted("CF_ACCESS_TOKEN"));
        assert!(is_blocklisted("CF_ACCESS_AUD"));
        assert!(is_blocklisted("R2_SECRET_ACCESS_KEY"));
        assert!(is_blocklisted("MOLTBOT_BUCKET"));
        assert!(is_blocklisted("BROWSER_KV"));

        assert!(!is_blocklisted("SKILL_TEST"));
        assert!(!is_blocklisted("API_KEY"));
        assert!(!is_blocklisted("ANTHROPIC_API_KEY"));
        assert!(!is_blocklisted("BROWSER_KV_TOKEN"));
    }

    #[test]
    fn test_constants() {
        assert!(DYNAMIC_SECRET_PREFIXES.contains(&"SKILL_"));
        assert!(DYNAMIC_SECRET_PREFIXES.contains(&"API_"));
        assert!(DYNAMIC_SECRET_SUFFIXES.contains(&"_TOKEN"));
        assert!(DYNAMIC_SECRET_SUFFIXES.contains(&"_API_KEY"));
        assert!(DYNAMIC_SECRET_SUFFIXES.contains(&"_API"));
        assert!(PASSTHROUGH_BLOCKLIST.contains(&"CF_ACCESS_"));
        assert!(PASSTHROUGH_BLOCKLIST.contains(&"R2_SECRET_"));
    }

    #[test]
    fn test_defaults_mirror_constants() {
        let rules = PassthroughRules::defaults();
        for key in [
            "SKILL_X",
            "API_X",
            "X_TOKEN",
            "X_API_KEY",
            "X_API",
            "CF_ACCESS_TOKEN",
            "R2_SECRET_KEY",
            "MOLTBOT_BUCKET",
            "BROWSER_KV",
            "PLAIN",
        ] {
            assert_eq!(rules.is_dynamic_secret(key), is_dynamic_secret(key), "{key}");
            assert_eq!(rules.is_blocklisted(key), is_blocklisted(key), "{key}");
        }
    }

    #[test]
    fn test_blocklist_wins_over_predicate() {
        let rules = PassthroughRules::defaults();
        // matches the _TOKEN suffix and a blocked prefix
        assert!(rules.is_dynamic_secret("CF_ACCESS_TOKEN"));
        assert_eq!(rules.classify_name("CF_ACCESS_TOKEN"), DynamicOutcome::Blocklisted);

        let rules =
            PassthroughRules::defaults().with_block(BlockPattern::prefix("SKILL_INTERNAL_"));
        assert_eq!(
            rules.classify_name("SKILL_INTERNAL_API_KEY"),
            DynamicOutcome::Blocklisted
        );
        assert_eq!(rules.classify_name("SKILL_PUBLIC"), DynamicOutcome::Forwarded);
    }

    #[test]
    fn test_outcome_order() {
        let rules = PassthroughRules::defaults();
        let text = SourceValue::text("v");
        let object = SourceValue::binding("object");

        assert_eq!(rules.outcome("SKILL_A", &text, true), DynamicOutcome::AlreadySet);
        assert_eq!(rules.outcome("SKILL_A", &object, false), DynamicOutcome::NotString);
        assert_eq!(rules.outcome("CF_ACCESS_A", &object, false), DynamicOutcome::NotString);
        assert_eq!(rules.outcome("CF_ACCESS_A", &text, false), DynamicOutcome::Blocklisted);
        assert_eq!(rules.outcome("SKILL_A", &text, false), DynamicOutcome::Forwarded);
        assert_eq!(rules.outcome("OTHER", &text, false), DynamicOutcome::Unmatched);
    }

    #[test]
    fn test_apply_never_overwrites() {
        let rules = PassthroughRules::defaults();
        let source = SourceConfig::new()
            .with_text("AGENTMAIL_API_KEY", "raw")
            .with_text("SKILL_FOO", "y");
        let mut env = ResolvedEnv::new();
        env.insert("AGENTMAIL_API_KEY", "explicit");

        rules.apply(&source, &mut env);
        assert_eq!(env.get("AGENTMAIL_API_KEY"), Some("explicit"));
        assert_eq!(env.get("SKILL_FOO"), Some("y"));
    }

    #[test]
    fn test_empty_rules_forward_nothing() {
        let rules = PassthroughRules::empty();
        let source = SourceConfig::new().with_text("SKILL_FOO", "y");
        let mut env = ResolvedEnv::new();
        rules.apply(&source, &mut env);
        assert!(env.is_empty());
    }

    #[test]
    fn test_builders_deduplicate() {
        let rules = PassthroughRules::defaults()
            .with_prefix("SKILL_")
            .with_suffix("_SECRET")
            .with_suffix("_SECRET")
            .with_block(BlockPattern::exact("BROWSER_KV"));
        assert_eq!(rules.prefixes().len(), 2);
        assert_eq!(rules.suffixes().len(), 4);
        assert_eq!(rules.blocklist().len(), 4);
    }
}
