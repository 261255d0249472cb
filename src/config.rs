//! Application configuration.
//!
//! The configuration is loaded from a JSON file at
//! `$XDG_CONFIG_HOME/snapdock/config.json`.  Every section is optional, so a
//! minimal `{}` file is valid and falls back to the compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "snap": {
//!     "distance": 15,
//!     "min_overlap": 10,
//!     "undock_distance": 10,
//!     "align_edges": true,
//!     "match_size": true
//!   },
//!   "tabs": { "tabstrip_height": 30 },
//!   "service": { "docking": true, "tabbing": true },
//!   "rules": [
//!     { "scope": { "application": "calc" }, "tabbing": false },
//!     { "scope": { "application": "calc", "window": "main" }, "docking": false }
//!   ]
//! }
//! ```

use crate::entity::Scope;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Snapping and docking thresholds.
    #[serde(default)]
    pub snap: SnapConfig,

    /// Tab group appearance.
    #[serde(default)]
    pub tabs: TabConfig,

    /// Service-wide feature defaults, the least specific rule scope.
    #[serde(default)]
    pub service: FeatureRule,

    /// Application and window scoped overrides.
    #[serde(default)]
    pub rules: Vec<ScopedRule>,
}

/// Distances (in pixels) that drive snap detection and undocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Maximum gap between two edges for them to count as a snap candidate.
    pub distance: i32,
    /// Minimum overlap on the perpendicular axis for a candidate.
    pub min_overlap: i32,
    /// How far an undocked entity is pushed away from its former neighbor.
    pub undock_distance: i32,
    /// Also align the perpendicular edges when they are within `distance`.
    pub align_edges: bool,
    /// Resize the docked entity to match the target's perpendicular extent
    /// when both ends are within `distance`.
    pub match_size: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            distance: 15,
            min_overlap: 10,
            undock_distance: 10,
            align_edges: true,
            match_size: true,
        }
    }
}

/// Tab group appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabConfig {
    /// Height of the tabstrip header above the active tab's content.
    pub tabstrip_height: i32,
}

impl Default for TabConfig {
    fn default() -> Self {
        Self {
            tabstrip_height: 30,
        }
    }
}

/// Feature switches at one scope.  `None` defers to the less specific
/// scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureRule {
    pub docking: Option<bool>,
    pub tabbing: Option<bool>,
}

/// Scope selector of a rule.  A rule with only `application` set applies to
/// every window of that application; one with `window` set as well applies
/// to that single window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleScope {
    pub application: Option<String>,
    pub window: Option<String>,
}

/// A feature rule bound to a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedRule {
    #[serde(default)]
    pub scope: RuleScope,
    #[serde(flatten)]
    pub rule: FeatureRule,
}

/// Resolved feature switches for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub docking: bool,
    pub tabbing: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            docking: true,
            tabbing: true,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Resolve the features enabled for a window in `scope`.
    ///
    /// Window rules win over application rules, which win over the service
    /// defaults.  Among rules of equal specificity the last one listed wins.
    pub fn features_for(&self, scope: &Scope) -> Features {
        let mut features = Features::default();
        apply_rule(&mut features, &self.service);

        let app_rules = self.rules.iter().filter(|r| {
            r.scope.window.is_none()
                && r.scope.application.as_deref() == Some(scope.application.as_str())
        });
        for r in app_rules {
            apply_rule(&mut features, &r.rule);
        }

        let window_rules = self.rules.iter().filter(|r| {
            r.scope.application.as_deref() == Some(scope.application.as_str())
                && r.scope.window.as_deref() == Some(scope.window.as_str())
        });
        for r in window_rules {
            apply_rule(&mut features, &r.rule);
        }
        features
    }
}

fn apply_rule(features: &mut Features, rule: &FeatureRule) {
    if let Some(docking) = rule.docking {
        features.docking = docking;
    }
    if let Some(tabbing) = rule.tabbing {
        features.tabbing = tabbing;
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(app: &str, window: &str) -> Scope {
        Scope {
            application: app.into(),
            window: window.into(),
        }
    }

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "snap": {
                "distance": 20,
                "min_overlap": 5,
                "undock_distance": 12,
                "align_edges": false,
                "match_size": false
            },
            "tabs": { "tabstrip_height": 24 },
            "service": { "docking": true },
            "rules": [
                { "scope": { "application": "calc" }, "tabbing": false }
            ]
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.snap.distance, 20);
        assert_eq!(cfg.snap.min_overlap, 5);
        assert_eq!(cfg.snap.undock_distance, 12);
        assert!(!cfg.snap.align_edges);
        assert!(!cfg.snap.match_size);
        assert_eq!(cfg.tabs.tabstrip_height, 24);
        assert_eq!(cfg.rules.len(), 1);
        assert_eq!(cfg.rules[0].rule.tabbing, Some(false));
        assert_eq!(cfg.rules[0].rule.docking, None);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.snap, SnapConfig::default());
        assert_eq!(cfg.tabs, TabConfig::default());
        assert!(cfg.rules.is_empty());
        assert_eq!(cfg.features_for(&scope("any", "w")), Features::default());
    }

    #[test]
    fn deserialize_partial_snap() {
        let cfg: Config = serde_json::from_str(r#"{ "snap": { "distance": 30 } }"#).unwrap();
        assert_eq!(cfg.snap.distance, 30);
        assert_eq!(cfg.snap.min_overlap, SnapConfig::default().min_overlap);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "snap": {}, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn window_rule_beats_application_rule() {
        let json = r#"{
            "service": { "docking": false },
            "rules": [
                { "scope": { "application": "calc", "window": "main" }, "docking": false },
                { "scope": { "application": "calc" }, "docking": true, "tabbing": false }
            ]
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();

        let main = cfg.features_for(&scope("calc", "main"));
        assert!(!main.docking);
        assert!(!main.tabbing);

        let other = cfg.features_for(&scope("calc", "other"));
        assert!(other.docking);
        assert!(!other.tabbing);

        let unrelated = cfg.features_for(&scope("editor", "main"));
        assert!(!unrelated.docking);
        assert!(unrelated.tabbing);
    }

    #[test]
    fn window_rule_requires_matching_application() {
        let json = r#"{
            "rules": [ { "scope": { "application": "a", "window": "main" }, "tabbing": false } ]
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert!(cfg.features_for(&scope("b", "main")).tabbing);
        assert!(!cfg.features_for(&scope("a", "main")).tabbing);
    }
}
