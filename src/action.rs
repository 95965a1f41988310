//! Action items (§9 Design Note "action nodes as nodes"): `Insert`,
//! `Replace`, `Delete` modeled as a sum type rather than `Node`
//! subclasses, so matching/hashing over [`crate::node::Node`] stays
//! monomorphic.

use crate::node::Node;

/// One slot of a [`crate::difftree::DiffNode`]'s or
/// [`crate::pattern::Pattern`]'s child-item list: either an unchanged
/// overlay node, or one of the three edit actions.
#[derive(Debug, Clone)]
pub enum DiffItem {
    /// An unchanged prototype node, recursively diffed (its own children
    /// may still contain actions).
    Node(crate::difftree::DiffNode),
    /// A node present only in the right tree.
    Insert(Node),
    /// A left-tree node replaced wholesale by a right-tree node.
    Replace {
        /// The node as it was.
        before: Node,
        /// The node as it becomes.
        after: Node,
    },
    /// A node present only in the left tree.
    Delete(Node),
}

impl DiffItem {
    /// The `before()` projection (§4.7): `Insert → None` (skipped),
    /// `Delete → Some(its node)`, `Replace → Some(before)`, `Node → recurse`.
    pub fn before(&self) -> Option<Node> {
        match self {
            DiffItem::Node(n) => Some(n.before()),
            DiffItem::Insert(_) => None,
            DiffItem::Replace { before, .. } => Some(before.clone()),
            DiffItem::Delete(n) => Some(n.clone()),
        }
    }

    /// The `after()` projection (§4.7): `Delete → None`, `Insert → Some(its
    /// node)`, `Replace → Some(after)`, `Node → recurse`.
    pub fn after(&self) -> Option<Node> {
        match self {
            DiffItem::Node(n) => Some(n.after()),
            DiffItem::Insert(n) => Some(n.clone()),
            DiffItem::Replace { after, .. } => Some(after.clone()),
            DiffItem::Delete(_) => None,
        }
    }
}
