//! Graph builder for turning edge records into an operation graph.
//!
//! The builder only materializes structure. It never rejects input; the
//! [`Validator`](crate::flow::Validator) decides whether the result is usable.

use crate::flow::kind::KindTable;
use crate::flow::node::{NodeIndex, OperationNode, OperationRef};
use crate::flow::record::EdgeRecord;
use std::collections::HashMap;

/// Arena of operation nodes with forward and backward adjacency.
#[derive(Debug, Clone, Default)]
pub struct OperationGraph {
    /// Nodes in first-seen order
    nodes: Vec<OperationNode>,
    /// Identity -> arena index
    index_map: HashMap<OperationRef, NodeIndex>,
    /// (component, operation) -> every sequence of that operation
    by_name: HashMap<(String, String), Vec<NodeIndex>>,
    /// Components in first-seen order
    components: Vec<String>,
}

impl OperationGraph {
    /// Get the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get all nodes.
    pub fn nodes(&self) -> &[OperationNode] {
        &self.nodes
    }

    /// Get a node by its index.
    pub fn node(&self, index: NodeIndex) -> Option<&OperationNode> {
        self.nodes.get(index)
    }

    /// Get the index for an identity triple.
    pub fn index_of(&self, operation: &str, component: &str, sequence_no: u32) -> Option<NodeIndex> {
        self.index_map
            .get(&OperationRef::new(operation, component, sequence_no))
            .copied()
    }

    /// Every sequence of `operation` for `component`, in first-seen order.
    pub fn indices_named(&self, operation: &str, component: &str) -> &[NodeIndex] {
        self.by_name
            .get(&(component.to_string(), operation.to_string()))
            .map_or(&[], |v| v.as_slice())
    }

    /// Components in first-seen order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Successor indices of a node.
    pub fn next_of(&self, index: NodeIndex) -> &[NodeIndex] {
        self.nodes.get(index).map_or(&[], |n| n.next.as_slice())
    }

    /// Predecessor indices of a node.
    pub fn previous_of(&self, index: NodeIndex) -> &[NodeIndex] {
        self.nodes.get(index).map_or(&[], |n| n.previous.as_slice())
    }

    /// Identity of a node.
    pub fn key_of(&self, index: NodeIndex) -> Option<&OperationRef> {
        self.nodes.get(index).map(|n| &n.key)
    }

    /// Indices of the nodes belonging to a component.
    pub fn component_indices(&self, component: &str) -> Vec<NodeIndex> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.key.component == component)
            .map(|(i, _)| i)
            .collect()
    }

    /// Adjacency rendered as identity triples, for structural comparison.
    pub fn adjacency(&self) -> Vec<(OperationRef, Vec<OperationRef>)> {
        self.nodes
            .iter()
            .map(|n| {
                let next = n.next.iter().map(|&i| self.nodes[i].key.clone()).collect();
                (n.key.clone(), next)
            })
            .collect()
    }

    fn insert(&mut self, node: OperationNode) -> NodeIndex {
        let index = self.nodes.len();
        let key = node.key.clone();
        if !self.components.contains(&key.component) {
            self.components.push(key.component.clone());
        }
        self.by_name
            .entry((key.component.clone(), key.operation.clone()))
            .or_default()
            .push(index);
        self.index_map.insert(key, index);
        self.nodes.push(node);
        index
    }

    fn link(&mut self, from: NodeIndex, to: NodeIndex) {
        if self.nodes[from].next.contains(&to) {
            return;
        }
        self.nodes[from].next.push(to);
        self.nodes[to].previous.push(from);
    }
}

/// Builder for constructing operation graphs.
pub struct GraphBuilder<'a> {
    kinds: &'a KindTable,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder that classifies operations with `kinds`.
    pub fn new(kinds: &'a KindTable) -> Self {
        Self { kinds }
    }

    /// Build the operation graph.
    ///
    /// Pass one creates a node per distinct `(operation, component, sequence_no)`;
    /// the first record for an identity supplies its config. Records missing an
    /// operation or component are ignored. Pass two links each record's node to
    /// every sequence of `next_operation` within the same component.
    pub fn build(&self, records: &[EdgeRecord]) -> OperationGraph {
        let mut graph = OperationGraph::default();

        for record in records {
            let operation = record.operation.trim();
            let component = record.component.trim();
            if operation.is_empty() || component.is_empty() {
                continue;
            }
            if graph.index_of(operation, component, record.sequence_no).is_some() {
                continue;
            }

            let key = OperationRef::new(operation, component, record.sequence_no);
            let kind = self.kinds.classify(operation);
            graph.insert(OperationNode::new(key, kind, record.config.clone()));
        }

        for record in records {
            if !record.has_next() {
                continue;
            }
            let component = record.component.trim();
            let Some(current) = graph.index_of(record.operation.trim(), component, record.sequence_no)
            else {
                continue;
            };

            let targets = graph
                .indices_named(record.next_operation.trim(), component)
                .to_vec();
            for target in targets {
                graph.link(current, target);
            }
        }

        graph
    }
}
