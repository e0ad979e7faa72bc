// src/dag/order.rs

//! Order strategies: tie-breaking between simultaneously eligible testcases.
//!
//! A strategy only sees the tree (topology, ids and delays), never the live
//! scheduling state. It returns a priority per testcase; lower runs first.
//! The scheduler breaks equal priorities by declaration order.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::dag::entry::TestcaseId;
use crate::dag::tree::Tree;
use crate::errors::{Result, SuitedagError};
use crate::types::OrderStrategyKind;

/// Priority assignment policy.
pub trait OrderStrategy: Send + Sync {
    /// Short name used in logs and dry-run output.
    fn name(&self) -> &'static str;

    fn optimize(&self, tree: &Tree) -> HashMap<TestcaseId, i64>;
}

/// First declared, first run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationOrder;

impl OrderStrategy for DeclarationOrder {
    fn name(&self) -> &'static str {
        "declaration"
    }

    fn optimize(&self, tree: &Tree) -> HashMap<TestcaseId, i64> {
        tree.entries()
            .map(|node| (tree.id(node).to_string(), tree.declaration_index(node) as i64))
            .collect()
    }
}

/// Front-load the subtrees whose delay chains end latest.
///
/// A testcase's priority is the negated length, in milliseconds, of the
/// longest delay path from it down through its subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxTotalDelay;

impl OrderStrategy for MaxTotalDelay {
    fn name(&self) -> &'static str {
        "max-total-delay"
    }

    fn optimize(&self, tree: &Tree) -> HashMap<TestcaseId, i64> {
        let longest = longest_paths(tree, |_| 0.0, |node| tree.edge_delay(node) * 60_000.0);
        tree.entries()
            .map(|node| (tree.id(node).to_string(), -(longest[node.index()].round() as i64)))
            .collect()
    }
}

/// Front-load the subtrees that historically take longest end to end.
///
/// Uses externally recorded durations per testcase (seconds). The critical
/// path of a node is its own duration plus the longest of
/// `edge delay + critical path` over its children.
#[derive(Debug, Clone, Default)]
pub struct HistoricalDuration {
    durations: HashMap<TestcaseId, f64>,
}

impl HistoricalDuration {
    pub fn new(durations: HashMap<TestcaseId, f64>) -> Self {
        Self { durations }
    }

    /// Load durations from a JSON object of `{ "<testcase id>": <seconds> }`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let durations: HashMap<TestcaseId, f64> =
            serde_json::from_str(&contents).map_err(|e| {
                SuitedagError::ConfigError(format!(
                    "history file {:?} is not a JSON object of testcase durations: {e}",
                    path
                ))
            })?;

        debug!(path = ?path, testcases = durations.len(), "loaded historical durations");
        Ok(Self::new(durations))
    }

    fn duration_ms(&self, id: &str) -> f64 {
        self.durations
            .get(id)
            .copied()
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d * 1000.0)
            .unwrap_or(0.0)
    }
}

impl OrderStrategy for HistoricalDuration {
    fn name(&self) -> &'static str {
        "history"
    }

    fn optimize(&self, tree: &Tree) -> HashMap<TestcaseId, i64> {
        let critical = longest_paths(
            tree,
            |node| self.duration_ms(tree.id(node)),
            |node| tree.edge_delay(node) * 60_000.0,
        );
        tree.entries()
            .map(|node| (tree.id(node).to_string(), -(critical[node.index()].round() as i64)))
            .collect()
    }
}

/// Bottom-up longest path: `own(node) + max(edge(child) + path(child))`.
fn longest_paths(
    tree: &Tree,
    own: impl Fn(NodeIndex) -> f64,
    edge: impl Fn(NodeIndex) -> f64,
) -> Vec<f64> {
    let mut paths = vec![0.0f64; tree.len() + 1];
    for &node in tree.preorder().iter().rev() {
        let below = tree
            .children(node)
            .iter()
            .map(|&child| edge(child) + paths[child.index()])
            .fold(0.0f64, f64::max);
        paths[node.index()] = own(node) + below;
    }
    paths
}

/// Construct the strategy selected in configuration.
pub fn strategy_for(
    kind: OrderStrategyKind,
    history_file: Option<&Path>,
) -> Result<Box<dyn OrderStrategy>> {
    match kind {
        OrderStrategyKind::Declaration => Ok(Box::new(DeclarationOrder)),
        OrderStrategyKind::MaxTotalDelay => Ok(Box::new(MaxTotalDelay)),
        OrderStrategyKind::History => {
            let path = history_file.ok_or_else(|| {
                SuitedagError::ConfigError(
                    "order strategy \"history\" requires a history file".to_string(),
                )
            })?;
            Ok(Box::new(HistoricalDuration::from_path(path)?))
        }
    }
}
