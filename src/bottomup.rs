//! Bottom-up matching (§4.6): for nodes the top-down phase left unmapped,
//! find matches by structural similarity once enough of their descendants
//! are already mapped — catches large common subtrees buried under a
//! changed root.

use std::collections::{HashMap, HashSet};

use crate::ext::{ExtId, ExtIndex};
use crate::hash::Hash64;
use crate::mapping::Mapping;

/// Minimum subtree height considered for whole-subtree hash matching.
/// Leaves (height 0) are left to top-down's own equality check or to
/// `finalize_leftovers`'s delete/insert fallback — matching them here by
/// hash alone would pair up incidental, same-valued leaves with no
/// structural context, which is what bottom-up is for (catching *large*
/// common subtrees, not individual tokens). Mirrors the teacher's
/// `MatchingConfig::min_height` default of 1.
const MIN_HEIGHT: usize = 1;

/// Runs the bottom-up phase over whatever a prior (typically top-down)
/// pass left unmapped.
pub struct BottomUpMatcher<'a> {
    left: &'a ExtIndex,
    right: &'a ExtIndex,
}

impl<'a> BottomUpMatcher<'a> {
    /// A matcher over `left`/`right`'s overlays.
    pub fn new(left: &'a ExtIndex, right: &'a ExtIndex) -> Self {
        Self { left, right }
    }

    /// Extend `mapping` (produced by a prior pass) with bottom-up matches,
    /// then resolve anything still unaccounted for as inserts/deletes.
    pub fn extend(&self, mut mapping: Mapping) -> Mapping {
        trace!(mapped = mapping.pairs().count(), "bottom-up matching start");
        let mut mapped_left: HashSet<ExtId> = HashSet::new();
        let mut mapped_right: HashSet<ExtId> = HashSet::new();
        for (l, r) in mapping.pairs() {
            mapped_left.insert(self.find_ext(self.left, l));
            mapped_right.insert(self.find_ext(self.right, r));
        }
        for (before, _) in mapping.replaced() {
            mapped_left.insert(self.find_ext(self.left, before));
        }
        for ins in mapping.inserted() {
            mapped_right.insert(self.find_ext(self.right, &ins.node));
        }
        for d in mapping.deleted() {
            mapped_left.insert(self.find_ext(self.left, d));
        }

        self.match_by_hash(&mut mapping, &mut mapped_left, &mut mapped_right);
        self.climb_partially_mapped(&mut mapping, &mut mapped_left, &mut mapped_right);
        self.finalize_leftovers(&mut mapping, &mapped_left, &mapped_right);
        debug!(mapped = mapping.pairs().count(), "bottom-up matching done");
        mapping
    }

    fn find_ext(&self, index: &ExtIndex, node: &crate::node::Node) -> ExtId {
        index
            .descendants(index.root())
            .find(|&id| crate::node::Node::ptr_eq(index.prototype(id), node))
            .expect("node must belong to the indexed tree")
    }

    /// §4.6 steps 1-3: post-order, hash-bucket, depth-first singleton
    /// resolution of whole unmapped subtrees sharing an absolute hash.
    fn match_by_hash(&self, mapping: &mut Mapping, mapped_left: &mut HashSet<ExtId>, mapped_right: &mut HashSet<ExtId>) {
        let mut right_by_hash: HashMap<Hash64, Vec<ExtId>> = HashMap::new();
        for id in self.right.post_order() {
            if !mapped_right.contains(&id) && self.right.height(id) >= MIN_HEIGHT {
                right_by_hash.entry(self.right.absolute_hash(id)).or_default().push(id);
            }
        }

        let mut left_candidates: Vec<ExtId> = self
            .left
            .post_order()
            .filter(|id| !mapped_left.contains(id) && self.left.height(*id) >= MIN_HEIGHT)
            .collect();
        left_candidates.sort_by_key(|&id| std::cmp::Reverse(self.left.height(id)));

        for l in left_candidates {
            if mapped_left.contains(&l) {
                continue;
            }
            let hash = self.left.absolute_hash(l);
            let Some(candidates) = right_by_hash.get(&hash) else { continue };
            let available: Vec<ExtId> = candidates.iter().copied().filter(|r| !mapped_right.contains(r)).collect();
            if available.len() != 1 {
                continue;
            }
            let r = available[0];
            debug!("matched: {:?} -> {:?}", l, r);
            self.map_subtree_marking(mapping, mapped_left, mapped_right, l, r);
        }
    }

    fn map_subtree_marking(
        &self,
        mapping: &mut Mapping,
        mapped_left: &mut HashSet<ExtId>,
        mapped_right: &mut HashSet<ExtId>,
        l: ExtId,
        r: ExtId,
    ) {
        mapping.map(self.left.prototype(l).clone(), self.right.prototype(r).clone());
        mapped_left.insert(l);
        mapped_right.insert(r);
        let lc = self.left.children(l);
        let rc = self.right.children(r);
        debug_assert_eq!(lc.len(), rc.len());
        for (&lchild, &rchild) in lc.iter().zip(rc.iter()) {
            self.map_subtree_marking(mapping, mapped_left, mapped_right, lchild, rchild);
        }
    }

    /// §4.6 steps 4-5: repeatedly find a partially-mapped left node (one
    /// with at least one mapped child but is itself unmapped), map it to
    /// its children's common right-parent if unambiguous, and reconcile
    /// the remaining child lists.
    fn climb_partially_mapped(&self, mapping: &mut Mapping, mapped_left: &mut HashSet<ExtId>, mapped_right: &mut HashSet<ExtId>) {
        loop {
            let candidate = self.left.post_order().find(|&id| {
                !mapped_left.contains(&id)
                    && self
                        .left
                        .children(id)
                        .iter()
                        .any(|c| mapped_left.contains(c))
            });
            let Some(l) = candidate else { break };

            let mut right_parents: HashSet<ExtId> = HashSet::new();
            for lchild in self.left.children(l) {
                if mapped_left.contains(&lchild) {
                    let rchild = self.find_mapped_right(mapping, lchild);
                    if let Some(rp) = self.right.parent(rchild) {
                        right_parents.insert(rp);
                    }
                }
            }

            if right_parents.len() != 1 {
                mapped_left.insert(l);
                continue;
            }
            let r = *right_parents.iter().next().unwrap();
            if mapped_right.contains(&r) {
                mapped_left.insert(l);
                continue;
            }

            let l_proto = self.left.prototype(l);
            let r_proto = self.right.prototype(r);
            if l_proto.ty().name() != r_proto.ty().name() || l_proto.data() != r_proto.data() {
                mapped_left.insert(l);
                continue;
            }

            debug!(?l, ?r, "partially-mapped ancestor climbed to a common parent");
            mapping.map(l_proto.clone(), r_proto.clone());
            mapped_left.insert(l);
            mapped_right.insert(r);
            self.reconcile_children(mapping, mapped_left, mapped_right, l, r);
        }
    }

    fn find_mapped_right(&self, mapping: &Mapping, l: ExtId) -> ExtId {
        let right_node = mapping
            .get_right(self.left.prototype(l))
            .expect("l must already be mapped");
        self.find_ext(self.right, &right_node)
    }

    /// §4.6 step 4's child-list reconciliation once two partially-mapped
    /// parents are themselves mapped.
    fn reconcile_children(
        &self,
        mapping: &mut Mapping,
        mapped_left: &mut HashSet<ExtId>,
        mapped_right: &mut HashSet<ExtId>,
        l: ExtId,
        r: ExtId,
    ) {
        let lc = self.left.children(l).to_vec();
        let rc = self.right.children(r).to_vec();
        let unmatched_left: Vec<ExtId> = lc.iter().copied().filter(|c| !mapped_left.contains(c)).collect();
        let unmatched_right: Vec<ExtId> = rc.iter().copied().filter(|c| !mapped_right.contains(c)).collect();

        if unmatched_left.len() > unmatched_right.len() {
            // More left children than right: the excess is deleted, the
            // rest pairwise replaced at matching position.
            let pairs = unmatched_left.len().min(unmatched_right.len());
            for i in 0..pairs {
                mapping.replace(self.left.prototype(unmatched_left[i]).clone(), self.right.prototype(unmatched_right[i]).clone());
                mapped_left.insert(unmatched_left[i]);
                mapped_right.insert(unmatched_right[i]);
            }
            for &extra in &unmatched_left[pairs..] {
                mapping.delete(self.left.prototype(extra).clone());
                mapped_left.insert(extra);
            }
        } else if unmatched_left.len() == unmatched_right.len() {
            for (&lc_id, &rc_id) in unmatched_left.iter().zip(unmatched_right.iter()) {
                mapping.replace(self.left.prototype(lc_id).clone(), self.right.prototype(rc_id).clone());
                mapped_left.insert(lc_id);
                mapped_right.insert(rc_id);
            }
        } else {
            // Fewer left children than right (Open Question #1): replace
            // pairwise up to the shorter length, then insert the remainder
            // as new children of `r`'s prototype, anchored after the last
            // paired-or-preexisting right child.
            let pairs = unmatched_left.len();
            for i in 0..pairs {
                mapping.replace(self.left.prototype(unmatched_left[i]).clone(), self.right.prototype(unmatched_right[i]).clone());
                mapped_left.insert(unmatched_left[i]);
                mapped_right.insert(unmatched_right[i]);
            }
            let into = self.right.prototype(r).clone();
            let mut after = unmatched_right
                .get(pairs.saturating_sub(1))
                .map(|&id| self.right.prototype(id).clone());
            for &extra in &unmatched_right[pairs..] {
                let node = self.right.prototype(extra).clone();
                mapping.insert(node.clone(), Some(into.clone()), after.clone());
                mapped_right.insert(extra);
                after = Some(node);
            }
        }
    }

    /// Anything left unmapped after both phases is deleted (left) or
    /// inserted (right), per the coverage requirement of §4.3.
    fn finalize_leftovers(&self, mapping: &mut Mapping, mapped_left: &HashSet<ExtId>, mapped_right: &HashSet<ExtId>) {
        for id in self.left.post_order() {
            let node = self.left.prototype(id);
            if !mapped_left.contains(&id) && !mapping.is_deleted(node) && !mapping.is_replaced_left(node) && !mapping.is_mapped_left(node) {
                mapping.delete(node.clone());
            }
        }
        for id in self.right.post_order() {
            let node = self.right.prototype(id);
            let already = mapping.is_mapped_right(node)
                || mapping.replaced().any(|(_, after)| crate::node::Node::ptr_eq(after, node))
                || mapping.inserted().iter().any(|ins| crate::node::Node::ptr_eq(&ins.node, node));
            if !mapped_right.contains(&id) && !already {
                let parent = self.right.parent(id).map(|p| self.right.prototype(p).clone());
                let index = self.right.index(id);
                let after = if index == 0 {
                    None
                } else {
                    self.right.left(id).map(|lid| self.right.prototype(lid).clone())
                };
                mapping.insert(node.clone(), parent, after);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::mapping::Mapper;
    use crate::node::{Fragment, Node, Type};
    use crate::GumTreeMapper;

    fn leaf(name: &str, data: &str) -> Node {
        Type::leaf(name).build(data, Vec::new(), Fragment::empty()).unwrap()
    }

    fn branch(name: &str, children: Vec<Node>) -> Node {
        Type::draft(name).build("", children, Fragment::empty()).unwrap()
    }

    #[test]
    fn deep_common_subtree_survives_a_changed_root() {
        let shared = branch("Block", vec![leaf("Stmt", "x"), leaf("Stmt", "y")]);
        let a = branch("FnA", vec![shared.clone()]);
        let b = branch("FnB", vec![shared]);
        let mapper = GumTreeMapper;
        let mapping = mapper.map(Some(&a), Some(&b));
        assert_eq!(mapping.replaced().count(), 1);
        assert!(mapping.pairs().count() >= 3);
    }
}
