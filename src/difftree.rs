//! The DiffTree builder (§4.7): overlays a [`crate::mapping::Mapping`] onto
//! the left tree `L`, producing a [`DiffNode`] tree whose `before()`/
//! `after()` projections reconstruct `L` and `R` respectively.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::action::DiffItem;
use crate::mapping::Mapping;
use crate::node::{Node, NodeKey};

/// An overlay node pairing a prototype (a node of `L`) with an ordered list
/// of [`DiffItem`]s mirroring its children, each either an unchanged
/// (recursively diffed) child or an edit action.
#[derive(Debug, Clone)]
pub struct DiffNode {
    prototype: Node,
    items: Vec<DiffItem>,
}

impl DiffNode {
    /// The `L`-tree node this overlay wraps.
    pub fn prototype(&self) -> &Node {
        &self.prototype
    }

    /// This node's child items, in order.
    pub fn items(&self) -> &[DiffItem] {
        &self.items
    }

    /// Rebuild, via the prototype's `Type`, the node as it was in `L`:
    /// recurses into unchanged children, keeps `Delete`d and `Replace`d
    /// (`before`) children, skips `Insert`ed ones.
    pub fn before(&self) -> Node {
        let children: Vec<Node> = self.items.iter().filter_map(DiffItem::before).collect();
        self.prototype
            .ty()
            .build(self.prototype.data(), children, self.prototype.fragment().clone())
            .unwrap_or_else(|_| Node::dummy())
    }

    /// Rebuild, via the prototype's `Type`, the node as it becomes in `R`:
    /// recurses into unchanged children, keeps `Insert`ed and `Replace`d
    /// (`after`) children, skips `Delete`d ones.
    ///
    /// The resulting node's own type/data come from the prototype, since an
    /// unmapped/unchanged `DiffNode` carries `L`'s type and data forward
    /// unless it is itself wrapped in a `Replace` by its parent.
    pub fn after(&self) -> Node {
        let children: Vec<Node> = self.items.iter().filter_map(DiffItem::after).collect();
        self.prototype
            .ty()
            .build(self.prototype.data(), children, self.prototype.fragment().clone())
            .unwrap_or_else(|_| Node::dummy())
    }
}

#[derive(Clone)]
enum Slot {
    Kept(Node),
    Replace { before: Node, after: Node },
    Delete(Node),
    Insert(Node),
}

type Container = Rc<RefCell<Vec<Slot>>>;

/// Builds a [`DiffNode`] tree from `L` and a [`Mapping`] computed against
/// some `R` (§4.7 steps 1-5).
pub struct DiffTreeBuilder;

impl DiffTreeBuilder {
    /// Build the overlay. `left_root` must be the node the mapping's
    /// `deleted`/`replaced`/mapped entries were computed relative to.
    pub fn build(left_root: &Node, mapping: &Mapping) -> DiffNode {
        trace!(
            replaced = mapping.replaced().count(),
            deleted = mapping.deleted().len(),
            inserted = mapping.inserted().len(),
            "difftree build start"
        );
        let mut containers: HashMap<NodeKey, Container> = HashMap::new();
        let mut prototypes: HashMap<NodeKey, Node> = HashMap::new();
        let mut parent_slot: HashMap<NodeKey, (NodeKey, usize)> = HashMap::new();
        Self::seed(left_root, &mut containers, &mut prototypes, &mut parent_slot);

        for (before, after) in mapping.replaced() {
            if let Some(&(parent, index)) = parent_slot.get(&before.key()) {
                debug!(?before, ?after, "slot -> Replace");
                containers[&parent].borrow_mut()[index] = Slot::Replace {
                    before: before.clone(),
                    after: after.clone(),
                };
            }
        }

        for deleted in mapping.deleted() {
            if let Some(&(parent, index)) = parent_slot.get(&deleted.key()) {
                debug!(?deleted, "slot -> Delete");
                containers[&parent].borrow_mut()[index] = Slot::Delete(deleted.clone());
            }
        }

        // Two-pass insertion fixup (§9): only insertions anchored at an
        // `into` with a left-tree counterpart belong in this overlay —
        // insertions nested inside a freshly inserted subtree are already
        // carried wholesale by that subtree's `Insert` node.
        for insertion in mapping.inserted() {
            let Some(into) = insertion.into.as_ref() else {
                continue;
            };
            let Some(into_left) = mapping.get_left(into) else {
                continue;
            };
            let Some(container) = containers.get(&into_left.key()).cloned() else {
                continue;
            };
            let position = Self::resolve_after_position(&container, insertion.after.as_ref(), mapping);
            debug!(node = ?insertion.node, position, "slot -> Insert");
            container.borrow_mut().insert(position, Slot::Insert(insertion.node.clone()));
        }

        let diff = Self::freeze(&left_root.key(), &containers, &prototypes);
        debug!("difftree build done");
        diff
    }

    fn seed(
        node: &Node,
        containers: &mut HashMap<NodeKey, Container>,
        prototypes: &mut HashMap<NodeKey, Node>,
        parent_slot: &mut HashMap<NodeKey, (NodeKey, usize)>,
    ) {
        let slots: Vec<Slot> = node.children().iter().cloned().map(Slot::Kept).collect();
        containers.insert(node.key(), Rc::new(RefCell::new(slots)));
        prototypes.insert(node.key(), node.clone());
        for (index, child) in node.children().iter().enumerate() {
            parent_slot.insert(child.key(), (node.key(), index));
            Self::seed(child, containers, prototypes, parent_slot);
        }
    }

    /// Position, within `container`, immediately after the slot whose
    /// "right-side identity" matches `after` (`None` anchors at position 0).
    fn resolve_after_position(container: &Container, after: Option<&Node>, mapping: &Mapping) -> usize {
        let Some(after) = after else { return 0 };
        let slots = container.borrow();
        for (i, slot) in slots.iter().enumerate() {
            let right_identity = match slot {
                Slot::Kept(child) => mapping.get_right(child),
                Slot::Replace { after, .. } => Some(after.clone()),
                Slot::Delete(_) => None,
                Slot::Insert(node) => Some(node.clone()),
            };
            if let Some(candidate) = right_identity {
                if Node::ptr_eq(&candidate, after) {
                    return i + 1;
                }
            }
        }
        slots.len()
    }

    fn freeze(key: &NodeKey, containers: &HashMap<NodeKey, Container>, prototypes: &HashMap<NodeKey, Node>) -> DiffNode {
        let prototype = prototypes[key].clone();
        let items = containers[key]
            .borrow()
            .iter()
            .map(|slot| match slot {
                Slot::Kept(child) => DiffItem::Node(Self::freeze(&child.key(), containers, prototypes)),
                Slot::Replace { before, after } => DiffItem::Replace {
                    before: before.clone(),
                    after: after.clone(),
                },
                Slot::Delete(node) => DiffItem::Delete(node.clone()),
                Slot::Insert(node) => DiffItem::Insert(node.clone()),
            })
            .collect();
        DiffNode { prototype, items }
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
    fn before_and_after_roundtrip_unchanged_tree() {
        let tree = branch("Root", vec![leaf("A", "1")]);
        let mapping = Mapping::new();
        let diff = DiffTreeBuilder::build(&tree, &mapping);
        assert!(Node::deep_compare(&diff.before(), &tree));
    }
}
