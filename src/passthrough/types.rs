//! Passthrough data structures

use serde::Serialize;

/// A blocklist entry for the dynamic phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum BlockPattern {
    /// Blocks every key starting with the pattern
    Prefix(String),
    /// Blocks exactly one key name
    Exact(String),
}

impl BlockPattern {
    /// Create a prefix entry
    pub fn prefix(pattern: impl Into<String>) -> Self {
        Self::Prefix(pattern.into())
    }

    /// Create an exact-name entry
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    /// Check if a key is blocked by this entry
    pub fn matches(&self, key: &str) -> bool {
        match self {
            BlockPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
            BlockPattern::Exact(name) => key == name,
        }
    }

    /// The raw pattern text
    pub fn pattern(&self) -> &str {
        match self {
            BlockPattern::Prefix(p) | BlockPattern::Exact(p) => p,
        }
    }
}

impl std::fmt::Display for BlockPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockPattern::Prefix(p) => write!(f, "{}*", p),
            BlockPattern::Exact(name) => write!(f, "{}", name),
        }
    }
}

/// What the dynamic phase did with a single source key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicOutcome {
    /// Copied into the output under its own name
    Forwarded,
    /// The explicit phase already produced this key
    AlreadySet,
    /// Value is a binding or absent
    NotString,
    /// Matched a blocklist entry
    Blocklisted,
    /// No prefix or suffix matched
    Unmatched,
}

impl std::fmt::Display for DynamicOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DynamicOutcome::Forwarded => "forwarded",
            DynamicOutcome::AlreadySet => "already-set",
            DynamicOutcome::NotString => "not-string",
            DynamicOutcome::Blocklisted => "blocklisted",
            DynamicOutcome::Unmatched => "unmatched",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_exact_matching() {
        let prefix = BlockPattern::prefix("CF_ACCESS_");
        assert!(prefix.matches("CF_ACCESS_AUD"));
        assert!(prefix.matches("CF_ACCESS_"));
        assert!(!prefix.matches("MY_CF_ACCESS_AUD"));

        let exact = BlockPattern::exact("BROWSER_KV");
        assert!(exact.matches("BROWSER_KV"));
        assert!(!exact.matches("BROWSER_KV_TOKEN"));
        assert!(!exact.matches("BROWSER"));
    }

    #[test]
    fn test_display() {
        assert_eq!(BlockPattern::prefix("R2_SECRET_").to_string(), "R2_SECRET_*");
        assert_eq!(BlockPattern::exact("MOLTBOT_BUCKET").to_string(), "MOLTBOT_BUCKET");
        assert_eq!(DynamicOutcome::AlreadySet.to_string(), "already-set");
    }
}
