//! Two-phase environment resolution
//!
//! Handles:
//! - The explicit rule table (provider keys, gateway routing, renames)
//! - Dynamic passthrough of convention-named secrets
//! - Per-key reports explaining what happened to every source entry

pub mod explicit;
mod gateway;
mod report;

pub use explicit::{Claim, EnvMapping, ExplicitOutput, ExplicitRules, FLAT_MAPPINGS};
pub use gateway::{normalize_base_url, Gateway, GatewayProvider};
pub use report::{KeyReport, ResolutionReport};

use crate::config::Config;
use crate::passthrough::{DynamicOutcome, PassthroughRules};
use crate::{ResolvedEnv, SourceConfig};
use tracing::info;

/// Resolves a configuration snapshot into a child-process environment.
///
/// Holds only immutable rule sets, so one resolver can be shared across
/// threads. Every call builds a fresh output.
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    explicit: ExplicitRules,
    passthrough: PassthroughRules,
}

impl EnvResolver {
    /// Create a resolver with the built-in rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with custom rule sets
    pub fn with_rules(explicit: ExplicitRules, passthrough: PassthroughRules) -> Self {
        Self {
            explicit,
            passthrough,
        }
    }

    /// Create a resolver from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let explicit = config
            .mappings
            .iter()
            .cloned()
            .fold(ExplicitRules::new(), ExplicitRules::with_mapping);
        Self::with_rules(explicit, config.passthrough.clone())
    }

    pub fn explicit_rules(&self) -> &ExplicitRules {
        &self.explicit
    }

    pub fn passthrough_rules(&self) -> &PassthroughRules {
        &self.passthrough
    }

    /// Resolve a snapshot into the environment for a child process
    pub fn resolve(&self, source: &SourceConfig) -> ResolvedEnv {
        let ExplicitOutput { mut env, claims } = self.explicit.apply(source);
        let explicit_count = env.len();
        self.passthrough.apply(source, &mut env);

        info!(
            source_keys = source.len(),
            explicit = explicit_count,
            dynamic = env.len() - explicit_count,
            claims = claims.len(),
            "resolved child environment"
        );
        env
    }

    /// Resolve a snapshot and report the fate of every source key
    pub fn explain(&self, source: &SourceConfig) -> ResolutionReport {
        let explicit = self.explicit.apply(source);

        let mut keys: Vec<KeyReport> = source
            .iter()
            .map(|(key, value)| {
                let outcome = self
                    .passthrough
                    .outcome(key, value, explicit.env.contains_key(key));
                KeyReport {
                    key: key.to_string(),
                    explicit_targets: explicit.targets_of(key).map(str::to_string).collect(),
                    dynamic: outcome,
                }
            })
            .collect();
        keys.sort_by(|a, b| a.key.cmp(&b.key));

        let mut env = explicit.env;
        self.passthrough.apply(source, &mut env);

        ResolutionReport { env, keys }
    }

    /// Classify a key name alone, as if it were set to a non-empty string.
    ///
    /// `explicit_targets` lists every output key an explicit rule may
    /// produce from it. A key the explicit phase always writes back under
    /// its own name reports `AlreadySet` for the dynamic phase.
    pub fn check(&self, key: &str) -> KeyReport {
        let dynamic = if self.explicit.claims_own_name(key) {
            DynamicOutcome::AlreadySet
        } else {
            self.passthrough.classify_name(key)
        };

        KeyReport {
            key: key.to_string(),
            explicit_targets: self
                .explicit
                .candidate_targets(key)
                .into_iter()
                .map(str::to_string)
                .collect(),
            dynamic,
        }
    }
}

/// Resolve a snapshot with the built-in rules
pub fn build_env_vars(source: &SourceConfig) -> ResolvedEnv {
    EnvResolver::new().resolve(source)
}
