//! `MutableNode` (§4.9): a scoped, single-use editor over an immutable
//! subtree. Used by the `DiffTree` builder and by external adapter-style
//! transformations that need to rewrite a handful of children without
//! hand-rolling a full `Type::build` call.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::node::Node;

struct MutableNodeInner {
    prototype: Node,
    children: RefCell<Vec<MutableNode>>,
    parent: RefCell<Weak<MutableNodeInner>>,
}

/// A scoped editor wrapping one immutable [`Node`] and its (also wrapped)
/// children. Parent back-pointers are weak: they exist for navigation
/// during editing but confer no ownership (§5 shared-resource policy).
#[derive(Clone)]
pub struct MutableNode(Rc<MutableNodeInner>);

impl MutableNode {
    /// Wrap `node` (and, recursively, its whole subtree) for editing.
    pub fn new(node: &Node) -> Self {
        let inner = Rc::new(MutableNodeInner {
            prototype: node.clone(),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
        });
        let children: Vec<MutableNode> = node.children().iter().map(Self::new).collect();
        for child in &children {
            *child.0.parent.borrow_mut() = Rc::downgrade(&inner);
        }
        *inner.children.borrow_mut() = children;
        Self(inner)
    }

    /// The original, unedited prototype this node started from.
    pub fn prototype(&self) -> &Node {
        &self.0.prototype
    }

    /// This node's current (possibly edited) children.
    pub fn children(&self) -> Vec<MutableNode> {
        self.0.children.borrow().clone()
    }

    /// This node's parent, if it has one and the parent is still alive.
    pub fn parent(&self) -> Option<MutableNode> {
        self.0.parent.borrow().upgrade().map(MutableNode)
    }

    /// Replace a child matched by identity (`before`'s `NodeKey` or its
    /// editor wrapper's prototype identity) with `after`. Returns `true` if
    /// a child was found and replaced.
    pub fn replace_child(&self, before: &Node, after: MutableNode) -> bool {
        let mut children = self.0.children.borrow_mut();
        if let Some(slot) = children.iter_mut().find(|c| c.prototype().key() == before.key()) {
            *slot = after;
            true
        } else {
            false
        }
    }

    /// Re-materialize an immutable subtree via the prototype's `Type`,
    /// recursing into (already-rebuilt) children. If the builder rejects
    /// the new child list, yields [`Node::dummy`] rather than panicking
    /// (§7: builder rejection is never an error).
    pub fn rebuild(&self) -> Node {
        let children: Vec<Node> = self.0.children.borrow().iter().map(MutableNode::rebuild).collect();
        self.0
            .prototype
            .ty()
            .build(self.0.prototype.data(), children, self.0.prototype.fragment().clone())
            .unwrap_or_else(|_| Node::dummy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Fragment, Type};

    fn leaf(name: &str, data: &str) -> Node {
        Type::leaf(name).build(data, Vec::new(), Fragment::empty()).unwrap()
    }

    fn branch(name: &str, children: Vec<Node>) -> Node {
        Type::draft(name).build("", children, Fragment::empty()).unwrap()
    }

    #[test]
    fn rebuild_with_no_edits_reproduces_original() {
        let tree = branch("Root", vec![leaf("A", "1"), leaf("B", "2")]);
        let editor = MutableNode::new(&tree);
        assert!(Node::deep_compare(&editor.rebuild(), &tree));
    }

    #[test]
    fn replace_child_changes_rebuild_output() {
        let a = leaf("A", "1");
        let tree = branch("Root", vec![a.clone(), leaf("B", "2")]);
        let editor = MutableNode::new(&tree);
        let replacement = MutableNode::new(&leaf("A", "99"));
        assert!(editor.replace_child(&a, replacement));
        let rebuilt = editor.rebuild();
        assert_eq!(rebuilt.children()[0].data(), "99");
    }

    #[test]
    fn parent_back_pointer_is_weak_navigation_only() {
        let tree = branch("Root", vec![leaf("A", "1")]);
        let editor = MutableNode::new(&tree);
        let child = editor.children().remove(0);
        assert!(child.parent().is_some());
        drop(editor);
        assert!(child.parent().is_none());
    }
}
