// src/dag/tree.rs

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::dag::entry::{TestcaseEntry, TestcaseId};

/// Node payload in the dependency tree.
#[derive(Debug, Clone)]
pub enum TreeNode {
    /// Implicit root every independent testcase hangs off.
    Root,
    Testcase(TestcaseEntry),
}

/// Validated, immutable dependency tree.
///
/// Nodes live in a petgraph arena: the root is always index 0 and entry `i`
/// (in declaration order) is index `i + 1`. Edges point from a dependency to
/// its dependent and carry the delay in minutes.
///
/// Only [`crate::dag::builder::build`] creates trees, so every tree is
/// acyclic and each testcase has exactly one parent.
#[derive(Debug, Clone)]
pub struct Tree {
    graph: DiGraph<TreeNode, f64>,
    ids: HashMap<TestcaseId, NodeIndex>,
    parents: Vec<Option<NodeIndex>>,
    children: Vec<Vec<NodeIndex>>,
    depths: Vec<usize>,
    subtree_heights: Vec<usize>,
    accumulated: Vec<f64>,
    preorder: Vec<NodeIndex>,
}

impl Tree {
    /// Derive the per-node data from an acyclic single-parent graph.
    pub(crate) fn from_graph(graph: DiGraph<TreeNode, f64>) -> Self {
        let n = graph.node_count();
        let root = NodeIndex::new(0);

        let mut ids = HashMap::with_capacity(n.saturating_sub(1));
        let mut parents = vec![None; n];
        let mut children: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];

        for node in graph.node_indices() {
            if let TreeNode::Testcase(entry) = &graph[node] {
                ids.insert(entry.id.clone(), node);
            }
            if let Some(edge) = graph.edges_directed(node, Direction::Incoming).next() {
                parents[node.index()] = Some(edge.source());
                children[edge.source().index()].push(node);
            }
        }

        // Incoming-edge iteration above visits nodes in index order, so the
        // children lists are already in declaration order.

        let mut depths = vec![0usize; n];
        let mut accumulated = vec![0.0f64; n];
        let mut preorder = Vec::with_capacity(n);
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            preorder.push(node);
            for &child in children[node.index()].iter().rev() {
                let weight = incoming_weight(&graph, child);
                depths[child.index()] = if node == root {
                    0
                } else {
                    depths[node.index()] + 1
                };
                accumulated[child.index()] = accumulated[node.index()] + weight;
                stack.push(child);
            }
        }

        let mut subtree_heights = vec![0usize; n];
        for &node in preorder.iter().rev() {
            subtree_heights[node.index()] = children[node.index()]
                .iter()
                .map(|c| subtree_heights[c.index()] + 1)
                .max()
                .unwrap_or(0);
        }

        Self {
            graph,
            ids,
            parents,
            children,
            depths,
            subtree_heights,
            accumulated,
            preorder,
        }
    }

    pub fn root(&self) -> NodeIndex {
        NodeIndex::new(0)
    }

    /// Number of testcases (the root is not counted).
    pub fn len(&self) -> usize {
        self.graph.node_count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Testcase nodes in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (1..self.graph.node_count()).map(NodeIndex::new)
    }

    /// The testcase stored at `node`, or `None` for the root.
    pub fn entry(&self, node: NodeIndex) -> Option<&TestcaseEntry> {
        match self.graph.node_weight(node)? {
            TreeNode::Root => None,
            TreeNode::Testcase(entry) => Some(entry),
        }
    }

    /// Identifier of the testcase at `node`; the root is `"<root>"`.
    pub fn id(&self, node: NodeIndex) -> &str {
        self.entry(node).map(|e| e.id.as_str()).unwrap_or("<root>")
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    /// Position of a testcase in declaration order (0-based).
    pub fn declaration_index(&self, node: NodeIndex) -> usize {
        node.index().saturating_sub(1)
    }

    /// Parent of `node`; root-attached testcases return the root, the root
    /// itself returns `None`.
    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.parents.get(node.index()).copied().flatten()
    }

    /// The testcase `node` depends on, if it does not hang off the root.
    pub fn dependency(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.parent(node).filter(|&p| p != self.root())
    }

    /// Children of `node`, in declaration order.
    pub fn children(&self, node: NodeIndex) -> &[NodeIndex] {
        self.children
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of dependency edges above a testcase. Root-attached testcases
    /// have depth 0.
    pub fn depth(&self, node: NodeIndex) -> usize {
        self.depths.get(node.index()).copied().unwrap_or(0)
    }

    /// Longest path, in edges, from `node` down to a leaf.
    pub fn subtree_height(&self, node: NodeIndex) -> usize {
        self.subtree_heights.get(node.index()).copied().unwrap_or(0)
    }

    /// Deepest testcase depth; 0 for a flat (or empty) tree.
    pub fn height(&self) -> usize {
        self.entries().map(|n| self.depth(n)).max().unwrap_or(0)
    }

    /// Weight of the edge into `node`, in minutes (0 for root-attached).
    pub fn edge_delay(&self, node: NodeIndex) -> f64 {
        incoming_weight(&self.graph, node)
    }

    /// Sum of edge delays on the path from the root to `node`, in minutes.
    pub fn accumulated_delay(&self, node: NodeIndex) -> f64 {
        self.accumulated.get(node.index()).copied().unwrap_or(0.0)
    }

    /// All nodes, root first, each parent before its children.
    pub fn preorder(&self) -> &[NodeIndex] {
        &self.preorder
    }
}

fn incoming_weight(graph: &DiGraph<TreeNode, f64>, node: NodeIndex) -> f64 {
    graph
        .edges_directed(node, Direction::Incoming)
        .next()
        .map(|e| *e.weight())
        .unwrap_or(0.0)
}
