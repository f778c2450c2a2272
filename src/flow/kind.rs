//! Keyword table that infers an [`OperationKind`] from a free-text operation name.
//!
//! Rules are checked in order and the first rule with a keyword contained in the
//! lowercased operation name wins. Names matching no rule are [`OperationKind::Other`].

use crate::flow::node::OperationKind;
use serde::{Deserialize, Serialize};

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRule {
    pub kind: OperationKind,
    pub keywords: Vec<String>,
}

impl KindRule {
    pub fn new(kind: OperationKind, keywords: &[&str]) -> Self {
        Self {
            kind,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Ordered keyword → kind lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTable {
    #[serde(default)]
    pub rules: Vec<KindRule>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self {
            rules: vec![
                KindRule::new(OperationKind::Activation, &["activation"]),
                KindRule::new(OperationKind::UnlinkLink, &["unlink", "link"]),
                KindRule::new(OperationKind::Qc, &["qc", "quality"]),
                KindRule::new(OperationKind::Count, &["count"]),
                KindRule::new(OperationKind::Production, &["production", "manufacturing"]),
            ],
        }
    }
}

impl KindTable {
    pub fn new(rules: Vec<KindRule>) -> Self {
        Self { rules }
    }

    /// Classify an operation name.
    pub fn classify(&self, operation: &str) -> OperationKind {
        let lowered = operation.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
            })
            .map_or(OperationKind::Other, |rule| rule.kind)
    }

    /// Problems worth reporting about the table itself.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                warnings.push(format!(
                    "classification rule {} ({}) has no keywords and never matches",
                    i, rule.kind
                ));
            }
        }
        warnings
    }
}
