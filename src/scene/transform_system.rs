//! Transform System
//!
//! Hierarchy matrix updates, decoupled from [`Scene`](crate::scene::Scene) so
//! that callers holding other scene borrows (the animation manager, the render
//! walks) only need the node arena.
//!
//! Dirtiness is pushed down eagerly: mutating a node marks its whole subtree,
//! and each node clears only its own flag when it is updated. Updates must run
//! top-down so a parent's world matrix is resolved before any child reads it.

use glam::Affine3A;
use slotmap::SlotMap;

use crate::scene::NodeHandle;
use crate::scene::node::Node;

/// Marks `handle` and every descendant dirty.
pub fn mark_subtree_dirty(nodes: &mut SlotMap<NodeHandle, Node>, handle: NodeHandle) {
    let mut stack = vec![handle];
    while let Some(current) = stack.pop() {
        if let Some(node) = nodes.get_mut(current) {
            node.transform.mark_dirty();
            stack.extend_from_slice(&node.children);
        }
    }
}

/// Updates a single node's world matrix from its parent's cached world matrix.
///
/// No-op on a clean node. Returns `true` if the matrices were rebuilt.
pub fn update_node(nodes: &mut SlotMap<NodeHandle, Node>, handle: NodeHandle) -> bool {
    let Some(node) = nodes.get(handle) else {
        return false;
    };
    if !node.transform.is_dirty() {
        return false;
    }

    let parent_world = node
        .parent
        .and_then(|p| nodes.get(p))
        .map(|p| p.transform.world_matrix);

    match nodes.get_mut(handle) {
        Some(node) => node.transform.update_world(parent_world.as_ref()),
        None => false,
    }
}

/// Updates every node under `root`, parents before children.
///
/// Uses an explicit stack instead of recursion so deep hierarchies cannot
/// overflow the call stack. A rebuilt parent forces its children to rebuild
/// even if they were not marked. Returns the number of nodes whose matrices
/// were rebuilt.
pub fn update_hierarchy(nodes: &mut SlotMap<NodeHandle, Node>, root: NodeHandle) -> usize {
    let mut updated = 0;

    // Work stack: (node, parent world matrix, parent rebuilt)
    let mut stack: Vec<(NodeHandle, Option<Affine3A>, bool)> = Vec::with_capacity(64);

    let root_parent = nodes
        .get(root)
        .and_then(|n| n.parent)
        .and_then(|p| nodes.get(p))
        .map(|p| p.transform.world_matrix);
    stack.push((root, root_parent, false));

    while let Some((handle, parent_world, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(handle) else {
            continue;
        };

        if parent_changed {
            node.transform.mark_dirty();
        }
        let changed = node.transform.update_world(parent_world.as_ref());
        if changed {
            updated += 1;
        }

        let world = node.transform.world_matrix;
        for &child in node.children.iter().rev() {
            stack.push((child, Some(world), changed));
        }
    }

    log::trace!("Transform hierarchy update rebuilt {updated} node(s)");
    updated
}
