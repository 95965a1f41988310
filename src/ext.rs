//! The extended-node index (§4.2): a per-run overlay over a prototype tree
//! that adds parent/sibling/index navigation and precomputed hashes.
//!
//! Built on `indextree`'s arena, the same backend the teacher (`cinereus`)
//! uses for its whole tree model (`cinereus/src/tree.rs`): structure
//! (parent/children/siblings) lives in the `Arena`, and the overlay payload
//! per node is just the prototype reference plus its two precomputed
//! hashes. It is built once per [`crate::mapping::Mapper::map`] call and
//! dropped at the end of that call.

use indextree::{Arena, NodeId};

use crate::hash::{absolute_hash, local_hash, Hash64};
use crate::node::Node;

/// An id into an [`ExtIndex`]'s arena. Only meaningful relative to the
/// `ExtIndex` that produced it.
pub type ExtId = NodeId;

struct ExtNodeData {
    prototype: Node,
    absolute_hash: Hash64,
    local_hash: Hash64,
}

/// A one-pass, preorder overlay of a prototype tree: for every node, its
/// parent, left/right siblings, child-offset, and precomputed hashes.
/// Exclusively owns its arena; never aliases or mutates prototypes.
/// Building is `O(n)`.
pub struct ExtIndex {
    arena: Arena<ExtNodeData>,
    root: ExtId,
}

impl ExtIndex {
    /// Build the overlay for `root` in one preorder traversal.
    pub fn build(root: &Node) -> Self {
        let mut arena = Arena::new();
        let root_id = Self::build_node(&mut arena, root);
        Self { arena, root: root_id }
    }

    fn build_node(arena: &mut Arena<ExtNodeData>, node: &Node) -> ExtId {
        let id = arena.new_node(ExtNodeData {
            prototype: node.clone(),
            absolute_hash: absolute_hash(node),
            local_hash: local_hash(node),
        });
        for child in node.children() {
            let child_id = Self::build_node(arena, child);
            id.append(child_id, arena);
        }
        id
    }

    /// The root of this overlay.
    pub fn root(&self) -> ExtId {
        self.root
    }

    /// The prototype node underlying `id`.
    pub fn prototype(&self, id: ExtId) -> &Node {
        &self.arena[id].get().prototype
    }

    /// `id`'s parent, if any.
    pub fn parent(&self, id: ExtId) -> Option<ExtId> {
        id.parent(&self.arena)
    }

    /// `id`'s left sibling, if any.
    pub fn left(&self, id: ExtId) -> Option<ExtId> {
        self.arena.get(id).and_then(|n| n.previous_sibling())
    }

    /// `id`'s right sibling, if any.
    pub fn right(&self, id: ExtId) -> Option<ExtId> {
        self.arena.get(id).and_then(|n| n.next_sibling())
    }

    /// `id`'s 0-based offset among its parent's children (0 for the root).
    pub fn index(&self, id: ExtId) -> u32 {
        match self.parent(id) {
            Some(parent) => parent.children(&self.arena).position(|c| c == id).unwrap_or(0) as u32,
            None => 0,
        }
    }

    /// `id`'s children, in order.
    pub fn children(&self, id: ExtId) -> Vec<ExtId> {
        id.children(&self.arena).collect()
    }

    /// The precomputed absolute hash (§4.1) of `id`'s subtree.
    pub fn absolute_hash(&self, id: ExtId) -> Hash64 {
        self.arena[id].get().absolute_hash
    }

    /// The precomputed local hash (§4.1) of `id` alone.
    pub fn local_hash(&self, id: ExtId) -> Hash64 {
        self.arena[id].get().local_hash
    }

    /// The height of `id` (distance to its furthest leaf; 0 for leaves).
    pub fn height(&self, id: ExtId) -> usize {
        id.children(&self.arena)
            .map(|c| 1 + self.height(c))
            .max()
            .unwrap_or(0)
    }

    /// Iterate `id` and all its descendants, preorder.
    pub fn descendants(&self, id: ExtId) -> impl Iterator<Item = ExtId> + '_ {
        id.descendants(&self.arena)
    }

    /// Iterate every node in the overlay, postorder (children before
    /// parents) — the order the bottom-up algorithm (§4.6) walks in.
    pub fn post_order(&self) -> impl Iterator<Item = ExtId> + '_ {
        let mut stack = vec![(self.root, false)];
        core::iter::from_fn(move || loop {
            let (id, visited) = stack.pop()?;
            if visited {
                return Some(id);
            }
            stack.push((id, true));
            for child in id.children(&self.arena).collect::<Vec<_>>().into_iter().rev() {
                stack.push((child, false));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Fragment, Type};

    fn leaf(name: &str, data: &str) -> Node {
        Type::leaf(name)
            .build(data, Vec::new(), Fragment::empty())
            .unwrap()
    }

    fn branch(name: &str, children: Vec<Node>) -> Node {
        Type::draft(name).build("", children, Fragment::empty()).unwrap()
    }

    #[test]
    fn siblings_and_index() {
        let tree = branch("Root", vec![leaf("A", "a"), leaf("B", "b"), leaf("C", "c")]);
        let ext = ExtIndex::build(&tree);
        let kids = ext.children(ext.root());
        assert_eq!(kids.len(), 3);
        assert_eq!(ext.index(kids[0]), 0);
        assert_eq!(ext.index(kids[1]), 1);
        assert_eq!(ext.left(kids[1]), Some(kids[0]));
        assert_eq!(ext.right(kids[1]), Some(kids[2]));
        assert_eq!(ext.left(kids[0]), None);
        assert_eq!(ext.right(kids[2]), None);
        assert_eq!(ext.parent(kids[0]), Some(ext.root()));
    }

    #[test]
    fn post_order_visits_children_first() {
        let tree = branch(
            "Root",
            vec![branch("Mid", vec![leaf("Leaf1", "1")]), leaf("Leaf2", "2")],
        );
        let ext = ExtIndex::build(&tree);
        let order: Vec<_> = ext.post_order().collect();
        assert_eq!(order.last(), Some(&ext.root()));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn height_of_leaf_is_zero() {
        let tree = branch("Root", vec![leaf("A", "a")]);
        let ext = ExtIndex::build(&tree);
        let child = ext.children(ext.root())[0];
        assert_eq!(ext.height(child), 0);
        assert_eq!(ext.height(ext.root()), 1);
    }
}
