//! Structural validation of operation graphs.
//!
//! All checks run and accumulate into a [`ValidationResult`]; only an empty
//! graph stops early. Findings never raise during the check itself, the
//! registry decides what an invalid result means for the caller.

use crate::flow::builder::OperationGraph;
use crate::flow::node::{NodeIndex, OperationKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Config key naming components merged by an unlink/link step.
pub const MERGE_COMPONENTS_KEY: &str = "merge_components";
/// Config key naming components split by an unlink/link step.
pub const SPLIT_COMPONENTS_KEY: &str = "split_components";

/// Outcome of validating an operation graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// How a finding is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Rules for terminal operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalPolicy {
    /// Severity when terminal operations span more than one component
    #[serde(default)]
    pub multiple_terminal_components: Severity,
    /// Terminal kinds for which the final production operation is the predecessor
    #[serde(default = "default_report_predecessor_for")]
    pub report_predecessor_for: Vec<OperationKind>,
}

fn default_report_predecessor_for() -> Vec<OperationKind> {
    vec![OperationKind::Unlink]
}

impl Default for TerminalPolicy {
    fn default() -> Self {
        Self {
            multiple_terminal_components: Severity::Error,
            report_predecessor_for: default_report_predecessor_for(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Runs the structural checks over a built graph.
pub struct Validator<'a> {
    policy: &'a TerminalPolicy,
}

impl<'a> Validator<'a> {
    pub fn new(policy: &'a TerminalPolicy) -> Self {
        Self { policy }
    }

    /// Validate the graph.
    pub fn validate(&self, graph: &OperationGraph) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if graph.is_empty() {
            errors.push("Operation map is empty".to_string());
            return ValidationResult::from_findings(errors, warnings);
        }

        for cycle in find_cycles(graph) {
            errors.push(format!("Cycle detected in operation flow: {}", cycle));
        }

        for label in find_disconnected(graph) {
            warnings.push(format!("Disconnected operation: {}", label));
        }

        let terminal_components: BTreeSet<&str> = graph
            .nodes()
            .iter()
            .filter(|n| n.is_terminal())
            .map(|n| n.component())
            .collect();
        if terminal_components.is_empty() {
            errors.push("No final operation found".to_string());
        } else if terminal_components.len() > 1 {
            let listed: Vec<&str> = terminal_components.into_iter().collect();
            let message = format!("Multiple final components found: {}", listed.join(", "));
            match self.policy.multiple_terminal_components {
                Severity::Error => errors.push(message),
                Severity::Warning => warnings.push(message),
            }
        }

        if !graph
            .nodes()
            .iter()
            .any(|n| n.kind() == OperationKind::Activation)
        {
            warnings.push("No activation operations found".to_string());
        }

        errors.extend(unlink_config_errors(graph));

        let result = ValidationResult::from_findings(errors, warnings);
        tracing::debug!(
            nodes = graph.len(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "operation graph validated"
        );
        result
    }
}

/// Three-color DFS over next edges with an explicit stack.
///
/// Returns every back-edge as `op(component) -> op(component)`.
fn find_cycles(graph: &OperationGraph) -> Vec<String> {
    let mut color = vec![Color::White; graph.len()];
    let mut cycles = Vec::new();

    for root in 0..graph.len() {
        if color[root] != Color::White {
            continue;
        }

        color[root] = Color::Gray;
        let mut stack: Vec<(NodeIndex, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            match graph.next_of(node).get(frame.1).copied() {
                Some(next) => {
                    frame.1 += 1;
                    match color[next] {
                        Color::Gray => cycles.push(format!(
                            "{} -> {}",
                            describe(graph, node),
                            describe(graph, next)
                        )),
                        Color::White => {
                            color[next] = Color::Gray;
                            stack.push((next, 0));
                        }
                        Color::Black => {}
                    }
                }
                None => {
                    color[node] = Color::Black;
                    stack.pop();
                }
            }
        }
    }

    cycles
}

/// Nodes not reachable from any start node when edges are treated as undirected.
fn find_disconnected(graph: &OperationGraph) -> Vec<String> {
    let mut starts: Vec<NodeIndex> = graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_start())
        .map(|(i, _)| i)
        .collect();
    if starts.is_empty() {
        starts.push(0);
    }

    let mut visited = vec![false; graph.len()];
    let mut queue: VecDeque<NodeIndex> = starts.into_iter().collect();
    while let Some(node) = queue.pop_front() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        queue.extend(graph.next_of(node).iter().copied());
        queue.extend(graph.previous_of(node).iter().copied());
    }

    visited
        .iter()
        .enumerate()
        .filter(|&(_, seen)| !seen)
        .map(|(i, _)| describe(graph, i))
        .collect()
}

fn unlink_config_errors(graph: &OperationGraph) -> Vec<String> {
    let mut errors = Vec::new();
    for node in graph
        .nodes()
        .iter()
        .filter(|n| n.kind() == OperationKind::UnlinkLink)
    {
        let config = node.config();
        if config.is_empty() {
            errors.push(format!(
                "Unlink operation {} missing configuration",
                node.operation()
            ));
            continue;
        }
        if config.contains_key(MERGE_COMPONENTS_KEY) && config.contains_key(SPLIT_COMPONENTS_KEY) {
            errors.push(format!(
                "Unlink operation {} cannot have both merge and split",
                node.operation()
            ));
        }
    }
    errors
}

fn describe(graph: &OperationGraph, index: NodeIndex) -> String {
    graph
        .key_of(index)
        .map(|k| k.to_string())
        .unwrap_or_default()
}
