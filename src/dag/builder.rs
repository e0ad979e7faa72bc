// src/dag/builder.rs

//! Turn a flat list of declared testcases into a validated [`Tree`].
//!
//! Validation is fail-fast and ordered; the first violated rule wins:
//!
//! 1. ids are unique and every `depends_on` names a declared testcase
//! 2. a delay is only declared together with a dependency
//! 3. every delay is a non-negative number of minutes
//! 4. the dependency edges contain no cycle

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Control, DfsEvent, depth_first_search};
use tracing::debug;

use crate::dag::entry::TestcaseEntry;
use crate::dag::tree::{Tree, TreeNode};
use crate::errors::ConfigurationError;

/// Build and validate the dependency tree.
///
/// Entries without a dependency hang off the implicit root with an edge
/// weight of 0; every other entry hangs off its dependency with an edge
/// weight of its delay in minutes.
pub fn build(entries: Vec<TestcaseEntry>) -> Result<Tree, ConfigurationError> {
    let positions = index_entries(&entries)?;
    validate_dependencies(&entries, &positions)?;
    validate_delays_have_dependency(&entries)?;
    let delays = validate_delay_values(&entries)?;

    let mut graph: DiGraph<TreeNode, f64> =
        DiGraph::with_capacity(entries.len() + 1, entries.len());
    let root = graph.add_node(TreeNode::Root);

    // Declaration order fixes node indices: entry `i` becomes node `i + 1`.
    let parents: Vec<Option<usize>> = entries
        .iter()
        .map(|e| e.depends_on.as_ref().map(|dep| positions[dep.as_str()]))
        .collect();

    for entry in entries {
        graph.add_node(TreeNode::Testcase(entry));
    }

    for (i, parent) in parents.iter().enumerate() {
        let node = NodeIndex::new(i + 1);
        let source = parent.map(|p| NodeIndex::new(p + 1)).unwrap_or(root);
        graph.add_edge(source, node, delays[i]);
    }

    check_acyclic(&graph, &parents)?;

    let tree = Tree::from_graph(graph);
    debug!(
        testcases = tree.len(),
        height = tree.height(),
        "built testcase dependency tree"
    );
    Ok(tree)
}

fn index_entries(entries: &[TestcaseEntry]) -> Result<HashMap<&str, usize>, ConfigurationError> {
    let mut positions = HashMap::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if positions.insert(entry.id.as_str(), i).is_some() {
            return Err(ConfigurationError::DuplicateTestcase(entry.id.clone()));
        }
    }
    Ok(positions)
}

fn validate_dependencies(
    entries: &[TestcaseEntry],
    positions: &HashMap<&str, usize>,
) -> Result<(), ConfigurationError> {
    for entry in entries {
        if let Some(target) = &entry.depends_on {
            if !positions.contains_key(target.as_str()) {
                return Err(ConfigurationError::UnknownDependency {
                    id: entry.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_delays_have_dependency(entries: &[TestcaseEntry]) -> Result<(), ConfigurationError> {
    for entry in entries {
        if let (Some(delay), None) = (&entry.delay_minutes, &entry.depends_on) {
            return Err(ConfigurationError::DelayWithoutDependency {
                id: entry.id.clone(),
                delay: delay.to_string(),
            });
        }
    }
    Ok(())
}

/// Returns the edge weight for every entry, in declaration order.
fn validate_delay_values(entries: &[TestcaseEntry]) -> Result<Vec<f64>, ConfigurationError> {
    entries
        .iter()
        .map(|entry| match &entry.delay_minutes {
            None => Ok(0.0),
            Some(delay) => delay.minutes().ok_or_else(|| ConfigurationError::InvalidDelay {
                id: entry.id.clone(),
                value: delay.to_string(),
            }),
        })
        .collect()
}

/// Depth-first search from the root, then from every entry in declaration
/// order so that cycles detached from the root are visited too. A back edge
/// to a node still in progress closes a cycle.
fn check_acyclic(
    graph: &DiGraph<TreeNode, f64>,
    parents: &[Option<usize>],
) -> Result<(), ConfigurationError> {
    let starts = graph.node_indices();

    let back_edge = depth_first_search(graph, starts, |event| match event {
        DfsEvent::BackEdge(from, to) => Control::Break((from, to)),
        _ => Control::Continue,
    })
    .break_value();

    let Some((from, to)) = back_edge else {
        return Ok(());
    };

    // Edges run dependency -> dependent, so the back edge says `to` depends on
    // `from` while `from` descends from `to`. Walking dependency pointers from
    // `from` reaches `to` and yields the cycle in "depends on" order.
    let mut cycle = Vec::new();
    let mut seen = HashSet::new();
    let mut current = from.index() - 1;
    loop {
        if !seen.insert(current) {
            break;
        }
        cycle.push(node_id(graph, current));
        if current == to.index() - 1 {
            break;
        }
        match parents[current] {
            Some(next) => current = next,
            None => break,
        }
    }

    Err(ConfigurationError::CyclicDependency { cycle })
}

fn node_id(graph: &DiGraph<TreeNode, f64>, entry: usize) -> String {
    match &graph[NodeIndex::new(entry + 1)] {
        TreeNode::Testcase(e) => e.id.clone(),
        TreeNode::Root => "<root>".to_string(),
    }
}
