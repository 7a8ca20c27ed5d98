//! Depth-first traversal.
//!
//! Includes are transparent: the walker never reports an `Include` node,
//! only the node it wraps, at the include's position. A `Path` node's
//! attribute section is visited before its children.

use crate::view::NodeRef;

/// Callback interface for [`walk`].
pub trait Visitor {
    /// Called before the node's attributes and children. Returning `false`
    /// skips the subtree (and the matching `leave`).
    fn enter(&mut self, node: NodeRef<'_>, depth: usize) -> bool;

    fn leave(&mut self, _node: NodeRef<'_>, _depth: usize) {}
}

impl<F> Visitor for F
where
    F: FnMut(NodeRef<'_>, usize) -> bool,
{
    fn enter(&mut self, node: NodeRef<'_>, depth: usize) -> bool {
        self(node, depth)
    }
}

/// Walk the subtree rooted at `node`, which is visited at depth 0.
pub fn walk<V: Visitor + ?Sized>(node: NodeRef<'_>, visitor: &mut V) {
    walk_at(node.resolve(), 0, visitor);
}

fn walk_at<V: Visitor + ?Sized>(node: NodeRef<'_>, depth: usize, visitor: &mut V) {
    if !visitor.enter(node, depth) {
        return;
    }
    if let Some(attributes) = node.attributes() {
        walk_at(attributes, depth + 1, visitor);
    }
    for child in node.children() {
        walk_at(child, depth + 1, visitor);
    }
    visitor.leave(node, depth);
}
