use serde::{Deserialize, Serialize};

use crate::core::{
    factor::Factor,
    factor_graph::{FactorGraph, NodeId},
    message::MessageStore,
};

/// A message to be sent from `source` to its neighbor behind `slot`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DirectedEdge {
    pub(crate) source: NodeId,
    pub(crate) slot: usize,
}

/// Messages grouped in steps, a message of a step depends only on
/// messages of previous steps
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    pub(crate) steps: Vec<Vec<DirectedEdge>>,
}

/// Scheduling state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// The node can not send anything yet
    Unvisited,

    /// The node has received enough messages to send at least one
    Ready,

    /// The node has sent messages to this many neighbors
    Sent(usize),

    /// The node has sent to and received from every neighbor
    Done,
}

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    node: NodeId,
    parent: Option<usize>,
    // slot of the parent among the node's neighbors
    up_slot: usize,
    depth: usize,
    height: usize,
}

/// Builds the two-pass schedule of a tree rooted at `root`.
///
/// The inward pass sends from every non-root node to its parent, a node of height `h`
/// sends at step `h`. The outward pass sends from every node to its children, a node of
/// depth `d` sends at step `H + d` where `H` is the height of the root. Within a step
/// nodes follow the pre-order of a depth-first traversal.
pub(crate) fn two_pass_schedule<F: Factor>(graph: &FactorGraph<F>, root: NodeId) -> Schedule {
    // pre-order traversal, children are visited in edge insertion order
    let mut order: Vec<TreeNode> = Vec::new();
    let mut stack = vec![TreeNode {
        node: root,
        parent: None,
        up_slot: 0,
        depth: 0,
        height: 0,
    }];
    while let Some(tree_node) = stack.pop() {
        let position = order.len();
        let parent_node = tree_node.parent.map(|x| order[x].node);
        order.push(tree_node);
        let degree = graph.degree_unchecked(tree_node.node);
        for slot in (0..degree).rev() {
            let (child, child_up_slot) = graph.edge_unchecked(tree_node.node, slot);
            if Some(child) == parent_node {
                continue;
            }
            stack.push(TreeNode {
                node: child,
                parent: Some(position),
                up_slot: child_up_slot,
                depth: tree_node.depth + 1,
                height: 0,
            });
        }
    }
    for position in (1..order.len()).rev() {
        if let Some(parent) = order[position].parent {
            order[parent].height = order[parent].height.max(order[position].height + 1);
        }
    }
    let root_height = order[0].height;
    let mut steps: Vec<Vec<DirectedEdge>> = vec![Vec::new(); root_height];
    for tree_node in order.iter().skip(1) {
        steps[tree_node.height].push(DirectedEdge {
            source: tree_node.node,
            slot: tree_node.up_slot,
        });
    }
    for tree_node in &order {
        let parent_node = tree_node.parent.map(|x| order[x].node);
        let degree = graph.degree_unchecked(tree_node.node);
        for slot in 0..degree {
            if Some(graph.edge_unchecked(tree_node.node, slot).0) == parent_node {
                continue;
            }
            let step = root_height + tree_node.depth;
            if steps.len() <= step {
                steps.resize(step + 1, Vec::new());
            }
            steps[step].push(DirectedEdge {
                source: tree_node.node,
                slot,
            });
        }
    }
    Schedule { steps }
}

/// Derives a scheduling state of a node from the messages sent so far
pub(crate) fn node_state<F: Factor>(graph: &FactorGraph<F>, store: &MessageStore, node: NodeId) -> NodeState {
    let degree = graph.degree_unchecked(node);
    let received = store.inbox(node).iter().filter(|x| x.is_some()).count();
    let sent = (0..degree)
        .filter(|slot| {
            let (neighbor, receiver_slot) = graph.edge_unchecked(node, *slot);
            store.inbox(neighbor)[receiver_slot].is_some()
        })
        .count();
    if sent == degree && received == degree {
        NodeState::Done
    } else if sent > 0 {
        NodeState::Sent(sent)
    } else if received + 1 >= degree {
        NodeState::Ready
    } else {
        NodeState::Unvisited
    }
}
