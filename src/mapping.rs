//! The mapping contract (§4.3): the `Mapping` result type, `Insertion`, and
//! the `Mapper` trait implemented by the top-down, bottom-up, and combined
//! algorithms.

use std::collections::HashMap;

use crate::node::{Node, NodeKey};

/// Where a new node is inserted: under which parent, immediately after
/// which sibling (`None` meaning "first").
#[derive(Debug, Clone)]
pub struct Insertion {
    /// The node being inserted (a node of the right tree).
    pub node: Node,
    /// The parent it is inserted under (a node of the right tree, or the
    /// projected parent in a difference tree). `None` only for the root of
    /// a whole new tree inserted wholesale (`map(∅, R)`'s root, §4.4), which
    /// has no parent in either tree.
    pub into: Option<Node>,
    /// The sibling it is inserted immediately after, or `None` for "first".
    pub after: Option<Node>,
}

/// The result of a [`Mapper`]: a read-only assignment of every node of `L`
/// and `R` to one of {mapped, replaced, inserted, deleted}. All exposed
/// collections are insertion-order-stable.
///
/// Invariants (§3 I1-I5), checked by [`Mapping::check_well_formed`] in
/// debug/test builds:
/// - I1: `get_left(get_right(x)) == x` whenever `get_right(x)` is some.
/// - I2: each left node is mapped, replaced-as-key, or deleted — at most one.
/// - I3: each right node is mapped, replaced-as-value, or inserted — at most one.
/// - I4: every insertion's `after` precedes `node` in `into`'s child list.
/// - I5: deleted/replaced-keys are nodes of `L`; inserted/replaced-values nodes of `R`.
#[derive(Debug, Default)]
pub struct Mapping {
    pairs: Vec<(Node, Node)>,
    ltr_index: HashMap<NodeKey, usize>,
    rtl_index: HashMap<NodeKey, usize>,
    inserted: Vec<Insertion>,
    replaced: Vec<(Node, Node)>,
    replaced_left_index: HashMap<NodeKey, usize>,
    deleted: Vec<Node>,
    deleted_index: HashMap<NodeKey, ()>,
}

impl Mapping {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping where every node of `right` (and nothing of `left`, which
    /// doesn't exist) is inserted — the `map(∅, R)` edge case of §4.4.
    pub fn all_inserted(right: &Node) -> Self {
        let mut m = Self::new();
        insert_subtree_recording(&mut m, right, None, None);
        m
    }

    /// A mapping where every node of `left` is deleted — the `map(L, ∅)`
    /// edge case of §4.4.
    pub fn all_deleted(left: &Node) -> Self {
        let mut m = Self::new();
        delete_subtree(&mut m, left);
        m
    }

    /// Record `left <-> right` as mapped.
    pub fn map(&mut self, left: Node, right: Node) {
        let idx = self.pairs.len();
        self.ltr_index.insert(left.key(), idx);
        self.rtl_index.insert(right.key(), idx);
        self.pairs.push((left, right));
    }

    /// Record `before -> after` as a wholesale replacement.
    pub fn replace(&mut self, before: Node, after: Node) {
        let idx = self.replaced.len();
        self.replaced_left_index.insert(before.key(), idx);
        self.replaced.push((before, after));
    }

    /// Record `node` as deleted from the left tree.
    pub fn delete(&mut self, node: Node) {
        self.deleted_index.insert(node.key(), ());
        self.deleted.push(node);
    }

    /// Record an insertion of a right-tree node.
    pub fn insert(&mut self, node: Node, into: Option<Node>, after: Option<Node>) {
        self.inserted.push(Insertion { node, into, after });
    }

    /// The right-tree node mapped to `left`, if any.
    pub fn get_right(&self, left: &Node) -> Option<Node> {
        self.ltr_index.get(&left.key()).map(|&i| self.pairs[i].1.clone())
    }

    /// The left-tree node mapped to `right`, if any.
    pub fn get_left(&self, right: &Node) -> Option<Node> {
        self.rtl_index.get(&right.key()).map(|&i| self.pairs[i].0.clone())
    }

    /// True if `left` is mapped to some right-tree node.
    pub fn is_mapped_left(&self, left: &Node) -> bool {
        self.ltr_index.contains_key(&left.key())
    }

    /// True if `right` is mapped to some left-tree node.
    pub fn is_mapped_right(&self, right: &Node) -> bool {
        self.rtl_index.contains_key(&right.key())
    }

    /// True if `left` was recorded as replaced (as the "before" node).
    pub fn is_replaced_left(&self, left: &Node) -> bool {
        self.replaced_left_index.contains_key(&left.key())
    }

    /// True if `left` was recorded as deleted.
    pub fn is_deleted(&self, left: &Node) -> bool {
        self.deleted_index.contains_key(&left.key())
    }

    /// All mapped `(left, right)` pairs, insertion-order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.pairs.iter().map(|(l, r)| (l, r))
    }

    /// All `(before, after)` wholesale replacements, insertion-order.
    pub fn replaced(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.replaced.iter().map(|(b, a)| (b, a))
    }

    /// All inserted-node records, insertion-order.
    pub fn inserted(&self) -> &[Insertion] {
        &self.inserted
    }

    /// All deleted left-tree nodes, insertion-order.
    pub fn deleted(&self) -> &[Node] {
        &self.deleted
    }

    /// Check invariants I1-I5 and the coverage property (§8 property 2).
    /// Intended for tests; panics on the first violation found.
    pub fn check_well_formed(&self, left_root: &Node, right_root: &Node) {
        for (l, r) in self.pairs() {
            assert!(
                Node::ptr_eq(&self.get_left(r).expect("I1: mapped right node maps back"), l),
                "I1 violated for {l:?} <-> {r:?}"
            );
        }

        let mut left_seen: HashMap<NodeKey, u32> = HashMap::new();
        for l in subtree_nodes(left_root) {
            let mut count = 0;
            if self.is_mapped_left(&l) {
                count += 1;
            }
            if self.is_replaced_left(&l) {
                count += 1;
            }
            if self.is_deleted(&l) {
                count += 1;
            }
            assert!(count <= 1, "I2 violated for left node {l:?}: in {count} categories");
            assert!(count == 1, "coverage violated: left node {l:?} unaccounted for");
            *left_seen.entry(l.key()).or_insert(0) += 1;
        }

        let mut right_seen: HashMap<NodeKey, u32> = HashMap::new();
        for r in subtree_nodes(right_root) {
            let mut count = 0;
            if self.is_mapped_right(&r) {
                count += 1;
            }
            if self.replaced.iter().any(|(_, after)| Node::ptr_eq(after, &r)) {
                count += 1;
            }
            if self.inserted.iter().any(|ins| Node::ptr_eq(&ins.node, &r)) {
                count += 1;
            }
            assert!(count <= 1, "I3 violated for right node {r:?}: in {count} categories");
            assert!(count == 1, "coverage violated: right node {r:?} unaccounted for");
            *right_seen.entry(r.key()).or_insert(0) += 1;
        }

        for ins in &self.inserted {
            if let (Some(into), Some(after)) = (&ins.into, &ins.after) {
                let siblings = into.children();
                let after_pos = siblings.iter().position(|c| Node::ptr_eq(c, after));
                assert!(
                    after_pos.is_some(),
                    "I4 violated: insertion's `after` is not a child of `into`"
                );
            }
        }
    }
}

fn subtree_nodes(root: &Node) -> impl Iterator<Item = Node> + '_ {
    let mut stack = vec![root.clone()];
    core::iter::from_fn(move || {
        let next = stack.pop()?;
        for child in next.children().iter().rev() {
            stack.push(child.clone());
        }
        Some(next)
    })
}

fn delete_subtree(mapping: &mut Mapping, node: &Node) {
    // Postorder isn't required for correctness here (Mapping.delete is just
    // bookkeeping), but matches the convention used when an edit script is
    // actually applied (children before parents).
    for child in node.children() {
        delete_subtree(mapping, child);
    }
    mapping.delete(node.clone());
}

fn insert_subtree_recording(mapping: &mut Mapping, node: &Node, into: Option<Node>, after: Option<Node>) {
    mapping.insert(node.clone(), into, after);
    let mut previous: Option<Node> = None;
    for child in node.children() {
        insert_subtree_recording(mapping, child, Some(node.clone()), previous.clone());
        previous = Some(child.clone());
    }
}

/// Computes a [`Mapping`] between two (possibly absent) trees.
///
/// Implementations may consume prototype nodes directly or build a
/// [`crate::ext::ExtIndex`]. The returned mapping is read-only.
pub trait Mapper {
    /// Map `left` onto `right`. Either side may be `None` (§4.4 edge cases).
    fn map(&self, left: Option<&Node>, right: Option<&Node>) -> Mapping;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Fragment, Type};

    fn leaf(name: &str, data: &str) -> Node {
        Type::leaf(name).build(data, Vec::new(), Fragment::empty()).unwrap()
    }

    #[test]
    fn all_inserted_covers_every_node() {
        let root = Node::new_unchecked(Type::leaf("Root"), "".into(), vec![leaf("A", "a"), leaf("B", "b")], Fragment::empty());
        let mapping = Mapping::all_inserted(&root);
        assert_eq!(mapping.inserted().len(), 3);
    }

    #[test]
    fn all_deleted_covers_every_node() {
        let root = Node::new_unchecked(Type::leaf("Root"), "".into(), vec![leaf("A", "a"), leaf("B", "b")], Fragment::empty());
        let mapping = Mapping::all_deleted(&root);
        assert_eq!(mapping.deleted().len(), 3);
    }

    #[test]
    fn map_then_lookup_both_ways() {
        let l = leaf("A", "a");
        let r = leaf("A", "a");
        let mut mapping = Mapping::new();
        mapping.map(l.clone(), r.clone());
        assert!(Node::ptr_eq(&mapping.get_right(&l).unwrap(), &r));
        assert!(Node::ptr_eq(&mapping.get_left(&r).unwrap(), &l));
    }
}
