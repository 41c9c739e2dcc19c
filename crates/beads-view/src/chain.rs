//! Dependency chain resolution.
//!
//! Given one issue, walk `blocks` edges breadth-first in both directions
//! up to a depth limit:
//!
//! - ancestors: issues that (transitively) block the root
//! - descendants: issues the root (transitively) blocks
//!
//! Each direction has its own visited set seeded with the root, so an
//! issue may appear on both sides. Meeting an already-visited issue sets
//! `has_cycle` and is not expanded again, so the walk always terminates.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::model::{Issue, Priority, Status};

/// Default number of levels walked in each direction.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// One issue in a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainNode {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub depth: usize,
    /// The node this one was reached from; `None` for the root.
    pub parent_id: Option<String>,
}

impl ChainNode {
    fn new(issue: &Issue, depth: usize, parent_id: Option<&str>) -> Self {
        Self {
            id: issue.id.clone(),
            title: issue.title.clone(),
            status: issue.status.clone(),
            priority: issue.priority,
            depth,
            parent_id: parent_id.map(str::to_string),
        }
    }
}

/// Which directions stopped at the depth limit with more graph beyond it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Truncation {
    pub ancestors: bool,
    pub descendants: bool,
}

/// Bounded view of the blocking graph around one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyChain {
    pub root: ChainNode,
    pub ancestors: Vec<ChainNode>,
    pub descendants: Vec<ChainNode>,
    pub has_cycle: bool,
    pub truncated: Truncation,
}

/// Blocking edges of a snapshot, indexed both ways.
struct BlockingGraph<'a> {
    by_id: HashMap<&'a str, &'a Issue>,
    /// issue -> issues it blocks
    blocks: HashMap<&'a str, Vec<&'a str>>,
    /// issue -> issues that block it
    blocked_by: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> BlockingGraph<'a> {
    fn build(issues: &'a [Issue]) -> Self {
        let mut by_id = HashMap::with_capacity(issues.len());
        for issue in issues {
            by_id.entry(issue.id.as_str()).or_insert(issue);
        }

        let mut blocks: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut blocked_by: HashMap<&str, Vec<&str>> = HashMap::new();
        for issue in issues {
            for target in issue.blocks_targets() {
                if !by_id.contains_key(target) {
                    continue;
                }
                let out = blocks.entry(issue.id.as_str()).or_default();
                if !out.contains(&target) {
                    out.push(target);
                }
                let inc = blocked_by.entry(target).or_default();
                if !inc.contains(&issue.id.as_str()) {
                    inc.push(issue.id.as_str());
                }
            }
        }

        Self {
            by_id,
            blocks,
            blocked_by,
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Ancestors,
    Descendants,
}

struct Walk {
    nodes: Vec<ChainNode>,
    has_cycle: bool,
    truncated: bool,
}

fn walk(graph: &BlockingGraph<'_>, root_id: &str, max_depth: usize, dir: Direction) -> Walk {
    let edges = match dir {
        Direction::Ancestors => &graph.blocked_by,
        Direction::Descendants => &graph.blocks,
    };

    let mut result = Walk {
        nodes: Vec::new(),
        has_cycle: false,
        truncated: false,
    };
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(root_id);
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    queue.push_back((root_id, 0));

    while let Some((current, depth)) = queue.pop_front() {
        let Some(neighbors) = edges.get(current) else {
            continue;
        };

        if depth >= max_depth {
            if neighbors.iter().any(|n| !visited.contains(n)) {
                result.truncated = true;
            }
            continue;
        }

        for &next in neighbors {
            if !visited.insert(next) {
                result.has_cycle = true;
                continue;
            }
            if let Some(issue) = graph.by_id.get(next) {
                result
                    .nodes
                    .push(ChainNode::new(issue, depth + 1, Some(current)));
            }
            queue.push_back((next, depth + 1));
        }
    }

    result
}

/// Resolve the dependency chain around `root_id`.
///
/// Returns `None` when `root_id` is not in `issues`.
#[must_use]
pub fn resolve(issues: &[Issue], root_id: &str, max_depth: usize) -> Option<DependencyChain> {
    let graph = BlockingGraph::build(issues);
    let root = graph.by_id.get(root_id)?;

    let up = walk(&graph, root_id, max_depth, Direction::Ancestors);
    let down = walk(&graph, root_id, max_depth, Direction::Descendants);

    Some(DependencyChain {
        root: ChainNode::new(root, 0, None),
        ancestors: up.nodes,
        descendants: down.nodes,
        has_cycle: up.has_cycle || down.has_cycle,
        truncated: Truncation {
            ancestors: up.truncated,
            descendants: down.truncated,
        },
    })
}
