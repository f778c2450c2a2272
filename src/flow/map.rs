//! Query engine over a validated operation graph.
//!
//! [`OperationMap`] is the read API used to gate scan events. Every query
//! answers with an empty value (empty vec, `false`, `None`) when the map did
//! not validate or when the asked-about operation does not exist, so callers
//! can ask speculative questions without handling errors.

use crate::flow::builder::{GraphBuilder, OperationGraph};
use crate::flow::kind::KindTable;
use crate::flow::node::{NodeIndex, OperationKind, OperationNode, OperationRef};
use crate::flow::record::EdgeRecord;
use crate::flow::validator::{TerminalPolicy, ValidationResult, Validator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

/// A node as it appears in an export, with adjacency as identity triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    pub operation: String,
    pub component: String,
    pub operation_kind: OperationKind,
    pub sequence_no: u32,
    pub config: Map<String, Value>,
    pub next_operations: Vec<OperationRef>,
    pub previous_operations: Vec<OperationRef>,
}

/// Serializable snapshot of a whole map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapExport {
    pub order_id: String,
    pub components: Vec<String>,
    pub nodes: Vec<NodeExport>,
    pub validation: ValidationResult,
}

/// Counts and flags describing a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStats {
    pub total_operations: usize,
    pub total_components: usize,
    /// Node count per kind label
    pub operation_kinds: BTreeMap<String, usize>,
    pub components: Vec<String>,
    pub has_activation: bool,
    pub has_unlink_operations: bool,
}

/// Where a component stands after its last completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub component: String,
    pub last_completed_operation: String,
    pub next_operations: Vec<String>,
    pub is_completed: bool,
    /// `(operation, sequence_no)` of every allowed next step
    pub possible_transitions: Vec<(String, u32)>,
}

/// Built, validated operation flow map for one production order.
#[derive(Debug)]
pub struct OperationMap {
    order_id: String,
    graph: OperationGraph,
    validation: ValidationResult,
    policy: TerminalPolicy,
    /// component -> nodes without previous operations
    starting: HashMap<String, Vec<NodeIndex>>,
    /// component -> nodes without next operations
    finals: HashMap<String, Vec<NodeIndex>>,
    /// component -> start-to-final shortest paths, filled on first use
    flows: HashMap<String, OnceLock<Vec<Vec<NodeIndex>>>>,
}

impl OperationMap {
    /// Build and validate a map from edge records.
    ///
    /// Always returns a map; check [`is_valid`](Self::is_valid) before relying
    /// on its answers.
    pub fn build(
        order_id: &str,
        records: &[EdgeRecord],
        kinds: &KindTable,
        policy: &TerminalPolicy,
    ) -> Self {
        let graph = GraphBuilder::new(kinds).build(records);
        let validation = Validator::new(policy).validate(&graph);

        let mut starting = HashMap::new();
        let mut finals = HashMap::new();
        let mut flows = HashMap::new();
        if validation.is_valid {
            for component in graph.components() {
                let indices = graph.component_indices(component);
                starting.insert(
                    component.clone(),
                    indices.iter().copied().filter(|&i| graph.previous_of(i).is_empty()).collect(),
                );
                finals.insert(
                    component.clone(),
                    indices.iter().copied().filter(|&i| graph.next_of(i).is_empty()).collect(),
                );
                flows.insert(component.clone(), OnceLock::new());
            }
        }

        Self {
            order_id: order_id.to_string(),
            graph,
            validation,
            policy: policy.clone(),
            starting,
            finals,
            flows,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Whether the map passed validation and may answer queries.
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation.errors
    }

    pub fn validation_warnings(&self) -> &[String] {
        &self.validation.warnings
    }

    /// The underlying graph, regardless of validity.
    pub fn graph(&self) -> &OperationGraph {
        &self.graph
    }

    fn index(&self, operation: &str, component: &str, sequence_no: u32) -> Option<NodeIndex> {
        if !self.is_valid() {
            return None;
        }
        self.graph.index_of(operation, component, sequence_no)
    }

    fn named(&self, operation: &str, component: &str) -> &[NodeIndex] {
        if !self.is_valid() {
            return &[];
        }
        self.graph.indices_named(operation, component)
    }

    fn refs(&self, indices: &[NodeIndex]) -> Vec<OperationRef> {
        indices
            .iter()
            .filter_map(|&i| self.graph.key_of(i).cloned())
            .collect()
    }

    /// Look up a single node.
    pub fn operation(&self, operation: &str, component: &str, sequence_no: u32) -> Option<&OperationNode> {
        self.index(operation, component, sequence_no)
            .and_then(|i| self.graph.node(i))
    }

    /// Operations directly after the given one.
    pub fn next_operations(&self, operation: &str, component: &str, sequence_no: u32) -> Vec<OperationRef> {
        self.index(operation, component, sequence_no)
            .map(|i| self.refs(self.graph.next_of(i)))
            .unwrap_or_default()
    }

    /// First operation directly after the given one.
    pub fn next_operation(&self, operation: &str, component: &str, sequence_no: u32) -> Option<OperationRef> {
        self.next_operations(operation, component, sequence_no)
            .into_iter()
            .next()
    }

    /// Operations directly before the given one.
    pub fn previous_operations(
        &self,
        operation: &str,
        component: &str,
        sequence_no: u32,
    ) -> Vec<OperationRef> {
        self.index(operation, component, sequence_no)
            .map(|i| self.refs(self.graph.previous_of(i)))
            .unwrap_or_default()
    }

    /// First operation directly before the given one.
    pub fn previous_operation(
        &self,
        operation: &str,
        component: &str,
        sequence_no: u32,
    ) -> Option<OperationRef> {
        self.previous_operations(operation, component, sequence_no)
            .into_iter()
            .next()
    }

    /// Names of every operation upstream of the given one.
    ///
    /// Breadth-first, so direct predecessors come before their ancestors.
    /// Each node is visited once, which also bounds the walk on cyclic input.
    pub fn all_previous_operations(
        &self,
        operation: &str,
        component: &str,
        sequence_no: u32,
    ) -> Vec<String> {
        let Some(start) = self.index(operation, component, sequence_no) else {
            return Vec::new();
        };

        let mut visited = HashSet::from([start]);
        let mut seen_names = HashSet::new();
        let mut names = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for &prev in self.graph.previous_of(node) {
                if !visited.insert(prev) {
                    continue;
                }
                if let Some(key) = self.graph.key_of(prev)
                    && seen_names.insert(key.operation.as_str())
                {
                    names.push(key.operation.clone());
                }
                queue.push_back(prev);
            }
        }

        names
    }

    /// True when the operation exists for the component and no sequence of it
    /// has a successor.
    pub fn is_final_operation(&self, operation: &str, component: &str) -> bool {
        let matching = self.named(operation, component);
        !matching.is_empty() && matching.iter().all(|&i| self.graph.next_of(i).is_empty())
    }

    /// Whether `to_operation` directly follows any sequence of `from_operation`.
    pub fn is_valid_transition(&self, component: &str, from_operation: &str, to_operation: &str) -> bool {
        self.named(from_operation, component).iter().any(|&i| {
            self.graph
                .next_of(i)
                .iter()
                .filter_map(|&n| self.graph.key_of(n))
                .any(|k| k.operation == to_operation)
        })
    }

    /// Components in first-seen order.
    pub fn components(&self) -> Vec<String> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.graph.components().to_vec()
    }

    /// Every operation of a component.
    pub fn component_operations(&self, component: &str) -> Vec<OperationRef> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.refs(&self.graph.component_indices(component))
    }

    /// Entry points of a component's flow.
    pub fn starting_operations(&self, component: &str) -> Vec<OperationRef> {
        self.starting
            .get(component)
            .map(|v| self.refs(v))
            .unwrap_or_default()
    }

    /// Terminal operations of a component's flow.
    pub fn final_operations(&self, component: &str) -> Vec<OperationRef> {
        self.finals
            .get(component)
            .map(|v| self.refs(v))
            .unwrap_or_default()
    }

    /// Every node of the given kind.
    pub fn operations_by_kind(&self, kind: OperationKind) -> Vec<OperationRef> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.graph
            .nodes()
            .iter()
            .filter(|n| n.kind() == kind)
            .map(|n| n.key().clone())
            .collect()
    }

    /// Operations lying strictly between `last_operation` and `current_operation`.
    ///
    /// Takes the shortest path between every matching pair of sequences and
    /// collects interior nodes, deduplicated in discovery order.
    pub fn skipped_operations(
        &self,
        component: &str,
        last_operation: &str,
        current_operation: &str,
    ) -> Vec<OperationRef> {
        let last_nodes = self.named(last_operation, component);
        let current_nodes = self.named(current_operation, component);

        let mut seen = HashSet::new();
        let mut skipped = Vec::new();
        for &from in last_nodes {
            for &to in current_nodes {
                let path = self.shortest_path(from, to);
                if path.len() <= 2 {
                    continue;
                }
                for &interior in &path[1..path.len() - 1] {
                    if seen.insert(interior) {
                        skipped.extend(self.graph.key_of(interior).cloned());
                    }
                }
            }
        }
        skipped
    }

    /// Shortest path from each starting operation to each final operation.
    pub fn operation_flows(&self, component: &str) -> Vec<Vec<OperationRef>> {
        let Some(cell) = self.flows.get(component) else {
            return Vec::new();
        };
        let paths = cell.get_or_init(|| {
            let starts = self.starting.get(component).map_or(&[][..], |v| v.as_slice());
            let finals = self.finals.get(component).map_or(&[][..], |v| v.as_slice());
            starts
                .iter()
                .flat_map(|&s| finals.iter().map(move |&f| (s, f)))
                .map(|(s, f)| self.shortest_path(s, f))
                .filter(|path| !path.is_empty())
                .collect()
        });
        paths.iter().map(|p| self.refs(p)).collect()
    }

    /// Name of the last production step.
    ///
    /// Uses the first component and its first terminal operation. When that
    /// terminal's kind is listed in the terminal policy (bookkeeping steps such
    /// as unlinking), its first predecessor is reported instead, or its own name
    /// if it has none.
    pub fn final_production_operation(&self) -> Option<String> {
        let component = self.graph.components().first()?;
        let &terminal = self.finals.get(component)?.first()?;
        let node = self.graph.node(terminal)?;

        if self.policy.report_predecessor_for.contains(&node.kind()) {
            let predecessor = node
                .previous_indices()
                .first()
                .and_then(|&p| self.graph.key_of(p));
            if let Some(prev) = predecessor {
                return Some(prev.operation.clone());
            }
        }
        Some(node.operation().to_string())
    }

    /// Next steps for a component whose last completed operation is known.
    ///
    /// Returns `None` when the map is invalid or the operation is unknown.
    pub fn component_status(&self, component: &str, last_completed_operation: &str) -> Option<ComponentStatus> {
        let matching = self.named(last_completed_operation, component);
        if matching.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let next: Vec<&OperationRef> = matching
            .iter()
            .flat_map(|&i| self.graph.next_of(i).iter().copied())
            .filter(|&n| seen.insert(n))
            .filter_map(|n| self.graph.key_of(n))
            .collect();

        let mut next_operations: Vec<String> = Vec::new();
        for key in &next {
            if !next_operations.contains(&key.operation) {
                next_operations.push(key.operation.clone());
            }
        }

        Some(ComponentStatus {
            component: component.to_string(),
            last_completed_operation: last_completed_operation.to_string(),
            is_completed: next.is_empty(),
            possible_transitions: next
                .iter()
                .map(|k| (k.operation.clone(), k.sequence_no))
                .collect(),
            next_operations,
        })
    }

    /// Serializable snapshot for diagnostics.
    pub fn export(&self) -> Option<MapExport> {
        if !self.is_valid() {
            return None;
        }
        let nodes = self
            .graph
            .nodes()
            .iter()
            .map(|n| NodeExport {
                operation: n.operation().to_string(),
                component: n.component().to_string(),
                operation_kind: n.kind(),
                sequence_no: n.sequence_no(),
                config: n.config().clone(),
                next_operations: self.refs(n.next_indices()),
                previous_operations: self.refs(n.previous_indices()),
            })
            .collect();

        Some(MapExport {
            order_id: self.order_id.clone(),
            components: self.graph.components().to_vec(),
            nodes,
            validation: self.validation.clone(),
        })
    }

    /// Node counts by kind and summary flags.
    pub fn operation_stats(&self) -> Option<OperationStats> {
        if !self.is_valid() {
            return None;
        }
        let mut operation_kinds = BTreeMap::new();
        for node in self.graph.nodes() {
            *operation_kinds.entry(node.kind().label().to_string()).or_insert(0) += 1;
        }
        let has = |kind: OperationKind| self.graph.nodes().iter().any(|n| n.kind() == kind);

        Some(OperationStats {
            total_operations: self.graph.len(),
            total_components: self.graph.components().len(),
            operation_kinds,
            components: self.graph.components().to_vec(),
            has_activation: has(OperationKind::Activation),
            has_unlink_operations: has(OperationKind::UnlinkLink),
        })
    }

    /// BFS over next edges; empty when `to` is unreachable.
    fn shortest_path(&self, from: NodeIndex, to: NodeIndex) -> Vec<NodeIndex> {
        if from == to {
            return vec![from];
        }

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            for &next in self.graph.next_of(node) {
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, node);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&p) = parent.get(&cursor) {
                        path.push(p);
                        cursor = p;
                    }
                    path.reverse();
                    return path;
                }
                queue.push_back(next);
            }
        }

        Vec::new()
    }
}
