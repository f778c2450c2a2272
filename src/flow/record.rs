//! Input records for building operation flow maps.
//!
//! An order's routing arrives as a flat list of [`EdgeRecord`]s, one per edge.
//! Routings authored as a process map (operation nodes plus edges carrying the
//! components that travel them) are flattened with [`ProcessMap::to_edge_records`].
//!
//! Records are lenient on input: `next_operation` may be null, `sequence_no`
//! may be missing or zero (both mean 1), and `config` (alias `configs`) may be
//! an object, a JSON-encoded object string, or null.

use anyhow::{Context, Result};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One edge of an order's routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(default)]
    pub operation: String,

    #[serde(default)]
    pub component: String,

    #[serde(default, deserialize_with = "deserialize_next_operation")]
    pub next_operation: String,

    #[serde(default = "default_sequence_no", deserialize_with = "deserialize_sequence_no")]
    pub sequence_no: u32,

    #[serde(default, alias = "configs", deserialize_with = "deserialize_config")]
    pub config: Map<String, Value>,
}

fn default_sequence_no() -> u32 {
    1
}

impl EdgeRecord {
    pub fn new(operation: &str, component: &str, next_operation: &str, sequence_no: u32) -> Self {
        Self {
            operation: operation.to_string(),
            component: component.to_string(),
            next_operation: next_operation.to_string(),
            sequence_no: sequence_no.max(1),
            config: Map::new(),
        }
    }

    /// Attach opaque configuration.
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Whether this record points at a successor.
    pub fn has_next(&self) -> bool {
        !self.next_operation.trim().is_empty()
    }
}

/// Read a JSON array of edge records from a file.
pub fn load_records(path: &Path) -> Result<Vec<EdgeRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read edge records: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse edge records: {}", path.display()))
}

fn deserialize_next_operation<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).unwrap_or_default())
}

fn deserialize_sequence_no<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    match value {
        Some(n) if n >= 1 => u32::try_from(n).map_err(|_| {
            serde::de::Error::custom(format!("sequence_no {} is out of range", n))
        }),
        _ => Ok(default_sequence_no()),
    }
}

fn deserialize_config<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map,
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    })
}

/// Operation node in a process map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

/// Edge in a process map; every listed component travels it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub components: Vec<String>,
}

/// Routing authored as a graph of operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessMap {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<ProcessNode>,
    #[serde(default)]
    pub edges: Vec<ProcessEdge>,
}

impl ProcessMap {
    /// Load a process map from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read process map: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse process map: {}", path.display()))
    }

    /// Flatten into edge records.
    ///
    /// Emits one record per (edge, component), numbering repeated
    /// `(source, component)` pairs 1, 2, ... in edge order. Targets that never
    /// appear as a source for a component get a terminal record so the final
    /// operation exists as a node. Edges whose endpoints have no label are
    /// dropped.
    pub fn to_edge_records(&self) -> Vec<EdgeRecord> {
        let labels: HashMap<&str, &str> = self
            .nodes
            .iter()
            .filter(|n| !n.label.trim().is_empty())
            .map(|n| (n.id.as_str(), n.label.trim()))
            .collect();

        let mut sequence: HashMap<(&str, &str), u32> = HashMap::new();
        let mut records = Vec::new();
        let mut sources: HashSet<(&str, &str)> = HashSet::new();
        let mut targets: Vec<(&str, &str)> = Vec::new();

        for edge in &self.edges {
            let (Some(&source), Some(&target)) =
                (labels.get(edge.source.as_str()), labels.get(edge.target.as_str()))
            else {
                continue;
            };

            for component in &edge.components {
                let component = component.as_str();
                let seq = sequence.entry((source, component)).or_insert(0);
                *seq += 1;
                records.push(EdgeRecord::new(source, component, target, *seq));
                sources.insert((source, component));
                targets.push((target, component));
            }
        }

        let mut terminal_seen = HashSet::new();
        for (target, component) in targets {
            if !sources.contains(&(target, component)) && terminal_seen.insert((target, component)) {
                records.push(EdgeRecord::new(target, component, "", 1));
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let json = r#"[{"operation": "Pack", "component": "Body", "next_operation": null}]"#;
        let records: Vec<EdgeRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(records[0].next_operation, "");
        assert_eq!(records[0].sequence_no, 1);
        assert!(records[0].config.is_empty());
        assert!(!records[0].has_next());
    }

    #[test]
    fn test_record_zero_and_null_sequence_fall_back_to_one() {
        let json = r#"[
            {"operation": "A", "component": "Body", "sequence_no": 0},
            {"operation": "B", "component": "Body", "sequence_no": null},
            {"operation": "C", "component": "Body", "sequence_no": 3}
        ]"#;
        let records: Vec<EdgeRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(records[0].sequence_no, 1);
        assert_eq!(records[1].sequence_no, 1);
        assert_eq!(records[2].sequence_no, 3);
    }

    #[test]
    fn test_record_sequence_out_of_range_is_rejected() {
        let json = r#"[{"operation": "A", "component": "Body", "sequence_no": 4294967296}]"#;
        let err = serde_json::from_str::<Vec<EdgeRecord>>(json).unwrap_err();
        assert!(err.to_string().contains("sequence_no 4294967296 is out of range"));

        let json = r#"[{"operation": "A", "component": "Body", "sequence_no": 4294967295}]"#;
        let records: Vec<EdgeRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].sequence_no, u32::MAX);
    }

    #[test]
    fn test_record_config_accepts_object_string_and_alias() {
        let json = r#"[
            {"operation": "Link", "component": "Body", "config": {"merge_components": ["Sleeve"]}},
            {"operation": "Link", "component": "Body", "configs": "{\"split_components\": [\"Cuff\"]}"},
            {"operation": "Link", "component": "Body", "configs": "not json"}
        ]"#;
        let records: Vec<EdgeRecord> = serde_json::from_str(json).unwrap();

        assert!(records[0].config.contains_key("merge_components"));
        assert!(records[1].config.contains_key("split_components"));
        assert!(records[2].config.is_empty());
    }

    #[test]
    fn test_process_map_flattening() {
        let json = r#"{
            "name": "PM-001",
            "nodes": [
                {"id": "n1", "label": "Cut"},
                {"id": "n2", "label": "Sew"},
                {"id": "n3", "label": "Pack"}
            ],
            "edges": [
                {"source": "n1", "target": "n2", "components": ["Body", "Sleeve"]},
                {"source": "n2", "target": "n3", "components": ["Body"]}
            ]
        }"#;
        let map: ProcessMap = serde_json::from_str(json).unwrap();
        let records = map.to_edge_records();

        assert_eq!(records.len(), 5);
        assert_eq!(records[0], EdgeRecord::new("Cut", "Body", "Sew", 1));
        assert_eq!(records[1], EdgeRecord::new("Cut", "Sleeve", "Sew", 1));
        assert_eq!(records[2], EdgeRecord::new("Sew", "Body", "Pack", 1));
        // Terminal rows for targets that never act as a source
        assert!(records.contains(&EdgeRecord::new("Sew", "Sleeve", "", 1)));
        assert!(records.contains(&EdgeRecord::new("Pack", "Body", "", 1)));
    }

    #[test]
    fn test_process_map_numbers_repeated_sources() {
        let map = ProcessMap {
            name: None,
            nodes: vec![
                ProcessNode { id: "a".into(), label: "Sew".into() },
                ProcessNode { id: "b".into(), label: "QC".into() },
                ProcessNode { id: "c".into(), label: "Iron".into() },
            ],
            edges: vec![
                ProcessEdge { source: "a".into(), target: "b".into(), components: vec!["Body".into()] },
                ProcessEdge { source: "a".into(), target: "c".into(), components: vec!["Body".into()] },
                ProcessEdge { source: "x".into(), target: "c".into(), components: vec!["Body".into()] },
            ],
        };
        let records = map.to_edge_records();

        assert_eq!(records[0].sequence_no, 1);
        assert_eq!(records[1].sequence_no, 2);
        // Edge with an unknown endpoint is dropped; two terminal rows remain
        assert_eq!(records.len(), 4);
    }
}
