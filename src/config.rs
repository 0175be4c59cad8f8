//! Engine and traversal configuration
//!
//! Every struct deserializes from JSON with missing fields taking their
//! defaults, so a config file only needs the keys it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::EdgeKind;

/// Options of a [`crate::PreorderTraversal`] run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Refuse to enter a node twice in one run (logged)
    pub safe_mode: bool,

    /// After a rooted run, sweep nodes seen only through reference edges
    pub visit_cross_edge_tree: bool,

    /// Turn the factory filter off for the run and visit filtered targets
    pub visit_filtered_edges: bool,

    /// After a rooted run, visit special nodes (comments, types) not reached yet
    pub visit_special_nodes: bool,

    /// Restrict the special node pass to nodes referenced from the visited part
    pub visit_used_special_nodes_only: bool,

    /// Reference edges the descent follows like tree edges
    pub cross_edge_kinds: Vec<EdgeKind>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            safe_mode: false,
            visit_cross_edge_tree: false,
            visit_filtered_edges: false,
            visit_special_nodes: true,
            visit_used_special_nodes_only: false,
            cross_edge_kinds: Vec::new(),
        }
    }
}

/// Options of the binary codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Check the blake3 trailer on load
    pub verify_checksum: bool,

    /// Value of the `generator` header property
    pub generator: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            generator: concat!("asgdb ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Build the reverse edge index right after load
    pub reverse_edges: bool,
    pub codec: CodecConfig,
    pub traversal: TraversalConfig,
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = EngineConfig::from_json_str(
            r#"{ "reverse_edges": true, "traversal": { "safe_mode": true, "cross_edge_kinds": ["MethodCallInvokes"] } }"#,
        )
        .unwrap();
        assert!(cfg.reverse_edges);
        assert!(cfg.traversal.safe_mode);
        assert!(cfg.traversal.visit_special_nodes);
        assert_eq!(cfg.traversal.cross_edge_kinds, vec![EdgeKind::MethodCallInvokes]);
        assert!(cfg.codec.verify_checksum);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut cfg = EngineConfig::default();
        cfg.codec.verify_checksum = false;
        let back = EngineConfig::from_json_str(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_bad_json() {
        assert!(EngineConfig::from_json_str("{ not json").is_err());
    }
}
