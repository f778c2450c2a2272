//! Graph vertices and identity types for operation flow maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Index of a node in the graph arena.
pub type NodeIndex = usize;

/// Kind of manufacturing step an operation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Tag activation at the start of a flow
    Activation,
    /// Routing step that merges or splits tracked units
    UnlinkLink,
    /// Physical production work
    Production,
    /// Quality check
    Qc,
    /// Counting station
    Count,
    /// Bookkeeping step that releases tags at the end of a flow
    Unlink,
    /// Anything not matched by the classification table
    Other,
}

impl OperationKind {
    /// Human-readable label used in exports and statistics.
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Activation => "Activation",
            OperationKind::UnlinkLink => "Unlink Link",
            OperationKind::Production => "Production",
            OperationKind::Qc => "QC",
            OperationKind::Count => "Count",
            OperationKind::Unlink => "Unlink",
            OperationKind::Other => "Other",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "activation" => Ok(OperationKind::Activation),
            "unlink_link" => Ok(OperationKind::UnlinkLink),
            "production" => Ok(OperationKind::Production),
            "qc" => Ok(OperationKind::Qc),
            "count" => Ok(OperationKind::Count),
            "unlink" => Ok(OperationKind::Unlink),
            "other" => Ok(OperationKind::Other),
            _ => anyhow::bail!(
                "Invalid operation kind '{}'. Valid values: activation, unlink_link, production, qc, count, unlink, other",
                s
            ),
        }
    }
}

/// Identity of an operation node: `(operation, component, sequence_no)`.
///
/// Query results hand these out by value so callers never hold references
/// into a cached map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationRef {
    pub operation: String,
    pub component: String,
    pub sequence_no: u32,
}

impl OperationRef {
    pub fn new(operation: impl Into<String>, component: impl Into<String>, sequence_no: u32) -> Self {
        Self {
            operation: operation.into(),
            component: component.into(),
            sequence_no,
        }
    }
}

impl fmt::Display for OperationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.component)
    }
}

/// A single operation in the flow.
///
/// Adjacency is stored as arena indices; the owning graph resolves them.
#[derive(Debug, Clone)]
pub struct OperationNode {
    pub(crate) key: OperationRef,
    pub(crate) kind: OperationKind,
    pub(crate) config: Map<String, Value>,
    pub(crate) next: Vec<NodeIndex>,
    pub(crate) previous: Vec<NodeIndex>,
}

impl OperationNode {
    pub(crate) fn new(key: OperationRef, kind: OperationKind, config: Map<String, Value>) -> Self {
        Self {
            key,
            kind,
            config,
            next: Vec::new(),
            previous: Vec::new(),
        }
    }

    pub fn key(&self) -> &OperationRef {
        &self.key
    }

    pub fn operation(&self) -> &str {
        &self.key.operation
    }

    pub fn component(&self) -> &str {
        &self.key.component
    }

    pub fn sequence_no(&self) -> u32 {
        self.key.sequence_no
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Opaque configuration; its keys are owned by callers.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn next_indices(&self) -> &[NodeIndex] {
        &self.next
    }

    pub fn previous_indices(&self) -> &[NodeIndex] {
        &self.previous
    }

    /// True when nothing follows this operation for its component.
    pub fn is_terminal(&self) -> bool {
        self.next.is_empty()
    }

    /// True when nothing precedes this operation for its component.
    pub fn is_start(&self) -> bool {
        self.previous.is_empty()
    }
}

impl PartialEq for OperationNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for OperationNode {}

impl std::hash::Hash for OperationNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
