//! The topological scheduler (§4.3): a pure function from `(nodes, pipes)`
//! to a stable, level-ordered traversal.

use crate::id::parent_node_ids;
use crate::node::{Node, NodeId};
use crate::pipe::Pipe;
use std::collections::HashMap;

/// A node's level: the length of its longest parent chain, or
/// [`Level::Cyclic`] if it sits on, or transitively depends on, a cycle
/// and is therefore unschedulable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Finite level: `0` for a node with no parents, otherwise
    /// `1 + max(parent levels)`.
    Finite(u32),
    /// Sorts after every finite level (§4.3); mutual order among cyclic
    /// nodes is unspecified.
    Cyclic,
}

/// Compute the level of every node and return them in the ordering the
/// driver runs: ascending level, ties broken by insertion order (§4.3,
/// §5 *Ordering guarantees*).
pub fn schedule<'a>(nodes: &'a [Node], pipes: &[Pipe]) -> Vec<&'a Node> {
    let mut memo: HashMap<NodeId, Level> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if !memo.contains_key(&node.id) {
            level_of(&node.id, pipes, &mut memo, &mut Vec::new());
        }
    }

    let mut ordered: Vec<&Node> = nodes.iter().collect();
    ordered.sort_by_key(|node| memo[&node.id]);
    ordered
}

/// Recursive level computation with cycle detection via the current
/// recursion path (§4.3). A node reappearing on `path` is classified
/// [`Level::Cyclic`], and that classification propagates to every node
/// that transitively depends on it, exactly as the recursive definition
/// `1 + max(parent levels)` would if `max` absorbed an infinite operand.
fn level_of(
    node_id: &NodeId,
    pipes: &[Pipe],
    memo: &mut HashMap<NodeId, Level>,
    path: &mut Vec<NodeId>,
) -> Level {
    if let Some(level) = memo.get(node_id) {
        return *level;
    }
    if path.contains(node_id) {
        return Level::Cyclic;
    }

    path.push(node_id.clone());
    let parents = parent_node_ids(node_id, pipes);
    let level = if parents.is_empty() {
        Level::Finite(0)
    } else {
        let mut max_finite = 0u32;
        let mut cyclic = false;
        for parent in &parents {
            match level_of(parent, pipes, memo, path) {
                Level::Cyclic => cyclic = true,
                Level::Finite(n) => max_finite = max_finite.max(n),
            }
        }
        if cyclic {
            Level::Cyclic
        } else {
            Level::Finite(max_finite + 1)
        }
    };
    path.pop();

    memo.insert(node_id.clone(), level);
    if level == Level::Cyclic {
        log::warn!("node `{node_id}` is unschedulable: on or downstream of a dependency cycle");
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Pin;

    fn n(id: &str) -> Node {
        Node::new(id, id)
    }

    #[test]
    fn no_parents_is_level_zero() {
        let nodes = vec![n("a")];
        let ordered = schedule(&nodes, &[]);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id.as_str(), "a");
    }

    #[test]
    fn chain_orders_by_ascending_level() {
        let nodes = vec![n("c"), n("a"), n("b")];
        let pipes = vec![
            Pipe::new(Pin::new("a"), Pin::new("b")),
            Pipe::new(Pin::new("b"), Pin::new("c")),
        ];
        let ordered = schedule(&nodes, &pipes);
        let ids: Vec<_> = ordered.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let nodes = vec![n("x"), n("a"), n("b")];
        // a and b both feed x but have no parents themselves, so they tie at
        // level 0 and x is level 1.
        let pipes = vec![
            Pipe::new(Pin::new("a"), Pin::new("x")),
            Pipe::new(Pin::new("b"), Pin::at("x", 1)),
        ];
        let ordered = schedule(&nodes, &pipes);
        let ids: Vec<_> = ordered.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "x"]);
    }

    #[test]
    fn diamond_dependency_is_not_mistaken_for_a_cycle() {
        let nodes = vec![n("d"), n("a"), n("b"), n("c")];
        let pipes = vec![
            Pipe::new(Pin::new("a"), Pin::new("b")),
            Pipe::new(Pin::new("a"), Pin::new("c")),
            Pipe::new(Pin::new("b"), Pin::new("d")),
            Pipe::new(Pin::new("c"), Pin::at("d", 1)),
        ];
        let ordered = schedule(&nodes, &pipes);
        let ids: Vec<_> = ordered.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids[0], "a");
        assert_eq!(ids.last(), Some(&"d"));
    }

    #[test]
    fn cycle_is_classified_unschedulable_and_sorts_last() {
        let nodes = vec![n("independent"), n("a"), n("b")];
        let pipes = vec![
            Pipe::new(Pin::new("a"), Pin::new("b")),
            Pipe::new(Pin::new("b"), Pin::new("a")),
        ];
        let ordered = schedule(&nodes, &pipes);
        let ids: Vec<_> = ordered.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids[0], "independent");
        assert!(ids[1..].contains(&"a"));
        assert!(ids[1..].contains(&"b"));
    }

    #[test]
    fn downstream_of_a_cycle_is_also_unschedulable() {
        let nodes = vec![n("a"), n("b"), n("downstream")];
        let pipes = vec![
            Pipe::new(Pin::new("a"), Pin::new("b")),
            Pipe::new(Pin::new("b"), Pin::new("a")),
            Pipe::new(Pin::new("b"), Pin::new("downstream")),
        ];
        let ordered = schedule(&nodes, &pipes);
        assert_eq!(ordered.last().map(|n| n.id.as_str()), Some("downstream"));
    }
}
