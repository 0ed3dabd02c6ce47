//! Resolution reports

use crate::passthrough::DynamicOutcome;
use crate::ResolvedEnv;
use serde::Serialize;

/// What happened to one source key. Never carries the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReport {
    pub key: String,
    /// Output keys an explicit rule produced from this source key
    pub explicit_targets: Vec<String>,
    pub dynamic: DynamicOutcome,
}

impl KeyReport {
    /// Every output key this source key ended up under
    pub fn forwarded_as(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.explicit_targets.iter().map(String::as_str).collect();
        if self.dynamic == DynamicOutcome::Forwarded {
            out.push(&self.key);
        }
        out
    }

    /// Whether the key reached the output at all
    pub fn is_forwarded(&self) -> bool {
        !self.explicit_targets.is_empty() || self.dynamic == DynamicOutcome::Forwarded
    }
}

/// A resolved environment plus a per-key report, sorted by key
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    #[serde(skip)]
    pub env: ResolvedEnv,
    pub keys: Vec<KeyReport>,
}

impl ResolutionReport {
    /// Source keys that were dropped entirely
    pub fn dropped(&self) -> impl Iterator<Item = &KeyReport> {
        self.keys.iter().filter(|k| !k.is_forwarded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_as() {
        let report = KeyReport {
            key: "MOLTBOT_GATEWAY_TOKEN".to_string(),
            explicit_targets: vec!["OPENCLAW_GATEWAY_TOKEN".to_string()],
            dynamic: DynamicOutcome::Forwarded,
        };
        assert_eq!(
            report.forwarded_as(),
            vec!["OPENCLAW_GATEWAY_TOKEN", "MOLTBOT_GATEWAY_TOKEN"]
        );
        assert!(report.is_forwarded());

        let dropped = KeyReport {
            key: "CF_ACCESS_AUD".to_string(),
            explicit_targets: vec![],
            dynamic: DynamicOutcome::Blocklisted,
        };
        assert!(dropped.forwarded_as().is_empty());
        assert!(!dropped.is_forwarded());
    }

    #[test]
    fn test_report_serializes_without_values() {
        let mut env = ResolvedEnv::new();
        env.insert("SKILL_FOO", "super-secret");
        let report = ResolutionReport {
            env,
            keys: vec![KeyReport {
                key: "SKILL_FOO".to_string(),
                explicit_targets: vec![],
                dynamic: DynamicOutcome::Forwarded,
            }],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("SKILL_FOO"));
        assert!(json.contains("\"forwarded\""));
        assert!(!json.contains("super-secret"));
        assert_eq!(report.dropped().count(), 0);
    }
}
