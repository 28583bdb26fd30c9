//! Configuration passed explicitly into graph operations.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Top-level settings for graph editing, consensus and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PogConfig {
    /// Remove successors orphaned by a node or transition removal.
    pub cascade_removals: bool,
    pub consensus: ConsensusConfig,
    pub dot: DotConfig,
    /// Worker threads for batch jobs.
    pub threads: usize,
}

impl Default for PogConfig {
    fn default() -> Self {
        Self {
            cascade_removals: true,
            consensus: ConsensusConfig::default(),
            dot: DotConfig::default(),
            threads: 4,
        }
    }
}

impl PogConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: PogConfig = serde_json::from_str(json)?;
        config.threads = config.threads.max(1);
        Ok(config)
    }
}

/// Consensus path extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Emit alignment-column gaps between chosen nodes.
    pub gapped: bool,
    /// Take a lone reciprocated edge over a better-supported one.
    pub prefer_reciprocated: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            gapped: false,
            prefer_reciprocated: true,
        }
    }
}

/// DOT export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotConfig {
    /// Annotate nodes with their character-state distribution.
    pub show_distributions: bool,
    pub node_color: String,
    pub consensus_color: String,
    pub rankdir: String,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            show_distributions: false,
            node_color: "#d9e7f5".to_string(),
            consensus_color: "#f5b971".to_string(),
            rankdir: "LR".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = PogConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PogConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{ "cascade_removals": false, "threads": 0, "consensus": { "gapped": true } }"#;
        let config = PogConfig::from_json_str(json).unwrap();
        assert!(!config.cascade_removals);
        assert_eq!(config.threads, 1);
        assert!(config.consensus.gapped);
        assert!(config.consensus.prefer_reciprocated);
        assert_eq!(config.dot.rankdir, "LR");
    }

    #[test]
    fn test_invalid_json() {
        assert!(PogConfig::from_json_str("{ threads: ").is_err());
    }
}
