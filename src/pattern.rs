//! Pattern & Hole (§4.8): a [`Pattern`] mirrors a [`crate::difftree::DiffNode`]
//! tree with some items replaced by numbered, typed [`Hole`]s; [`try_match`]
//! implements the matching contract sketch concretely.

use std::collections::HashMap;

use crate::action::DiffItem;
use crate::difftree::DiffNode;
use crate::node::{Node, NodeKey, Type};

/// A typed wildcard identified by a number. Holes sharing a number must
/// bind to `deepCompare`-equal subtrees (§4.8 condition iii).
#[derive(Debug, Clone)]
pub struct Hole {
    ty: Type,
    number: u32,
}

impl Hole {
    /// A hole of type `ty` identified by `number`.
    pub fn new(ty: Type, number: u32) -> Self {
        Self { ty, number }
    }

    /// The group a candidate subtree's type must belong to.
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// This hole's binding number.
    pub fn number(&self) -> u32 {
        self.number
    }
}

/// One slot of a [`Pattern`]: an unchanged (recursively matched) node, one
/// of the three edit actions carried over from the [`DiffNode`] it was
/// built from, or a [`Hole`].
#[derive(Debug, Clone)]
pub enum PatternItem {
    /// An unchanged prototype node, recursively matched.
    Node(PatternNode),
    /// An action item carried unchanged from the source `DiffNode`.
    Action(DiffItem),
    /// A typed wildcard.
    Hole(Hole),
}

/// A pattern node: a prototype (for its type) plus an ordered list of
/// [`PatternItem`]s mirroring the `DiffNode` it was built from.
#[derive(Debug, Clone)]
pub struct PatternNode {
    prototype: Node,
    items: Vec<PatternItem>,
}

impl PatternNode {
    /// This node's type (taken from its prototype).
    pub fn ty(&self) -> &Type {
        self.prototype.ty()
    }

    /// This node's items, in order.
    pub fn items(&self) -> &[PatternItem] {
        &self.items
    }
}

/// A pattern: a [`PatternNode`] tree with zero or more items replaced by
/// holes via [`PatternBuilder::make_hole`].
#[derive(Debug, Clone)]
pub struct Pattern {
    root: PatternNode,
}

impl Pattern {
    /// The pattern's root node.
    pub fn root(&self) -> &PatternNode {
        &self.root
    }
}

/// Builds a [`Pattern`] from a [`DiffNode`], then lets the caller punch
/// holes into it by prototype identity.
pub struct PatternBuilder {
    root: PatternNode,
    by_prototype: HashMap<NodeKey, Vec<usize>>,
}

impl PatternBuilder {
    /// Mirror `diff` as a pattern with no holes yet.
    pub fn new(diff: &DiffNode) -> Self {
        let root = Self::mirror(diff);
        let mut by_prototype = HashMap::new();
        Self::index(&root, &mut by_prototype, &mut Vec::new());
        Self { root, by_prototype }
    }

    fn mirror(diff: &DiffNode) -> PatternNode {
        let items = diff
            .items()
            .iter()
            .map(|item| match item {
                DiffItem::Node(child) => PatternItem::Node(Self::mirror(child)),
                other => PatternItem::Action(other.clone()),
            })
            .collect();
        PatternNode {
            prototype: diff.prototype().clone(),
            items,
        }
    }

    /// Index every prototype's (possibly nested) position as a path of
    /// item indices from the root, for `make_hole`'s by-identity lookup.
    fn index(node: &PatternNode, by_prototype: &mut HashMap<NodeKey, Vec<usize>>, path: &mut Vec<usize>) {
        by_prototype.insert(node.prototype.key(), path.clone());
        for (i, item) in node.items.iter().enumerate() {
            if let PatternItem::Node(child) = item {
                path.push(i);
                Self::index(child, by_prototype, path);
                path.pop();
            }
        }
    }

    /// Locate the item whose prototype is `node` and replace it with a
    /// [`Hole`] of `node`'s type and the given binding `number`.
    ///
    /// Has no effect (and returns `false`) if `node` is the pattern's own
    /// root or isn't present.
    pub fn make_hole(&mut self, node: &Node, number: u32) -> bool {
        let Some(path) = self.by_prototype.get(&node.key()).cloned() else {
            return false;
        };
        let Some((&last, ancestors)) = path.split_last() else {
            return false;
        };
        let mut current = &mut self.root;
        for &i in ancestors {
            match &mut current.items[i] {
                PatternItem::Node(child) => current = child,
                _ => return false,
            }
        }
        current.items[last] = PatternItem::Hole(Hole::new(node.ty().clone(), number));
        true
    }

    /// Freeze the builder into a [`Pattern`].
    pub fn build(self) -> Pattern {
        Pattern { root: self.root }
    }
}

/// Hole-number -> bound-subtree assignment produced by a successful
/// [`try_match`].
pub type Bindings = HashMap<u32, Node>;

/// Try to match `pattern` against `target` (§4.8's matching contract):
/// the structural skeleton of `pattern` must equal `target`'s outside
/// holes; each hole must bind to a subtree whose type hierarchy contains
/// the hole's type; holes sharing a number must bind to `deepCompare`-equal
/// subtrees.
pub fn try_match(pattern: &Pattern, target: &Node) -> Option<Bindings> {
    let mut bindings = Bindings::new();
    if match_node(pattern.root(), target, &mut bindings) {
        Some(bindings)
    } else {
        None
    }
}

fn match_node(pattern: &PatternNode, target: &Node, bindings: &mut Bindings) -> bool {
    if pattern.prototype.ty().name() != target.ty().name() || pattern.prototype.data() != target.data() {
        return false;
    }

    let mut target_children = target.children().iter();
    for item in &pattern.items {
        match item {
            PatternItem::Node(child) => {
                let Some(t) = target_children.next() else { return false };
                if !match_node(child, t, bindings) {
                    return false;
                }
            }
            PatternItem::Hole(hole) => {
                let Some(t) = target_children.next() else { return false };
                if !t.ty().belongs_to_group(hole.ty().name()) {
                    return false;
                }
                if let Some(existing) = bindings.get(&hole.number()) {
                    if !Node::deep_compare(existing, t) {
                        return false;
                    }
                } else {
                    bindings.insert(hole.number(), t.clone());
                }
            }
            PatternItem::Action(action) => {
                // Action items are change descriptions, not skeleton to
                // match; a target being matched (not diffed) has no
                // action items of its own, so an action item in the
                // pattern only matches a target child equal to its
                // `after()` projection (what the pattern would produce).
                let Some(after) = action.after() else { continue };
                let Some(t) = target_children.next() else { return false };
                if !Node::deep_compare(&after, t) {
                    return false;
                }
            }
        }
    }
    target_children.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difftree::DiffTreeBuilder;
    use crate::mapping::Mapping;
    use crate::node::Fragment;

    fn leaf(name: &str, data: &str) -> Node {
        Type::leaf(name).build(data, Vec::new(), Fragment::empty()).unwrap()
    }

    fn branch(name: &str, children: Vec<Node>) -> Node {
        Type::draft(name).build("", children, Fragment::empty()).unwrap()
    }

    #[test]
    fn hole_binds_and_shared_numbers_require_equal_subtrees() {
        // Two distinct nodes (not two clones of one `Rc`) with equal data,
        // so `make_hole`'s by-identity index sees two separate positions.
        let tree = branch("Pair", vec![leaf("Num", "1"), leaf("Num", "1")]);
        let diff = DiffTreeBuilder::build(&tree, &Mapping::new());
        let mut builder = PatternBuilder::new(&diff);
        builder.make_hole(&tree.children()[0], 1);
        builder.make_hole(&tree.children()[1], 1);
        let pattern = builder.build();

        let good_target = branch("Pair", vec![leaf("Num", "9"), leaf("Num", "9")]);
        assert!(try_match(&pattern, &good_target).is_some());

        let bad_target = branch("Pair", vec![leaf("Num", "9"), leaf("Num", "8")]);
        assert!(try_match(&pattern, &bad_target).is_none());
    }

    #[test]
    fn mismatched_skeleton_fails() {
        let tree = branch("Pair", vec![leaf("Num", "1"), leaf("Num", "2")]);
        let diff = DiffTreeBuilder::build(&tree, &Mapping::new());
        let pattern = PatternBuilder::new(&diff).build();
        let target = branch("Pair", vec![leaf("Num", "1")]);
        assert!(try_match(&pattern, &target).is_none());
    }
}
