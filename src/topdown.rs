//! Top-down matching (§4.4): map identical subtrees by absolute hash, then
//! align child lists of still-matched-but-unequal pairs via [`Section`] and
//! [`NodePairFinder`].

use crate::ext::{ExtId, ExtIndex};
use crate::mapping::Mapping;
use crate::section::{HashKind, MatchRun, NodePairFinder, Section};

/// Runs the top-down phase of [`crate::GumTreeMapper`] over a single pair
/// of trees, producing a [`Mapping`] that covers every node reachable by
/// hash-identity or type/data equality, with everything else left for the
/// bottom-up phase to pick up.
pub struct TopDownMatcher<'a> {
    left: &'a ExtIndex,
    right: &'a ExtIndex,
}

impl<'a> TopDownMatcher<'a> {
    /// A matcher over `left`/`right`'s overlays.
    pub fn new(left: &'a ExtIndex, right: &'a ExtIndex) -> Self {
        Self { left, right }
    }

    /// Run the algorithm from the roots, returning the resulting mapping.
    pub fn execute(&self) -> Mapping {
        trace!("top-down matching start");
        let mut mapping = Mapping::new();
        if !self.map_pair(&mut mapping, self.left.root(), self.right.root()) {
            debug!("roots incompatible, replacing wholesale");
            mapping.replace(
                self.left.prototype(self.left.root()).clone(),
                self.right.prototype(self.right.root()).clone(),
            );
        }
        debug!(mapped = mapping.pairs().count(), "top-down matching done");
        mapping
    }

    /// Try to map `l ↔ r` (and everything beneath, per §4.4 steps 1-3).
    /// Returns `false` if no alignment is possible at all (root types/data
    /// differ and no deeper identical subtree exists) — the caller then
    /// decides to replace.
    fn map_pair(&self, mapping: &mut Mapping, l: ExtId, r: ExtId) -> bool {
        if self.left.absolute_hash(l) == self.right.absolute_hash(r) {
            self.map_identical_subtrees(mapping, l, r);
            return true;
        }

        let l_proto = self.left.prototype(l);
        let r_proto = self.right.prototype(r);
        if l_proto.ty().name() != r_proto.ty().name() || l_proto.data() != r_proto.data() {
            return false;
        }

        mapping.map(l_proto.clone(), r_proto.clone());
        self.align_children(mapping, l, r);
        true
    }

    /// Map `l` and everything below it onto `r` and its corresponding
    /// descendants, in lockstep — sound because equal absolute hash implies
    /// structurally identical subtrees (§4.1).
    fn map_identical_subtrees(&self, mapping: &mut Mapping, l: ExtId, r: ExtId) {
        mapping.map(self.left.prototype(l).clone(), self.right.prototype(r).clone());
        let l_children = self.left.children(l);
        let r_children = self.right.children(r);
        debug_assert_eq!(l_children.len(), r_children.len());
        for (&lc, &rc) in l_children.iter().zip(r_children.iter()) {
            self.map_identical_subtrees(mapping, lc, rc);
        }
    }

    /// Align `l`'s and `r`'s children (§4.4 step 3): partition the full
    /// child range into `Section`s and resolve them left-to-right.
    fn align_children(&self, mapping: &mut Mapping, l: ExtId, r: ExtId) {
        let left_children = self.left.children(l).to_vec();
        let right_children = self.right.children(r).to_vec();
        let mut queue = vec![Section::whole(left_children, right_children)];

        while let Some(mut section) = queue.pop() {
            let l_size = section.left_size();
            let r_size = section.right_size();

            if l_size == 0 {
                self.insert_remaining(mapping, r, &section, &section.right);
                continue;
            }
            if r_size == 0 {
                self.delete_remaining(mapping, &section.left);
                continue;
            }
            if l_size == 1 && r_size == 1 {
                let (lc, rc) = (section.left[0], section.right[0]);
                if !self.map_pair(mapping, lc, rc) {
                    mapping.replace(self.left.prototype(lc).clone(), self.right.prototype(rc).clone());
                }
                continue;
            }

            if !section.flags.contains(crate::section::SectionFlags::NO_IDENTICAL) {
                let finder = NodePairFinder::new(self.left, self.right, HashKind::Absolute);
                if let Some(run) = finder.find_longest_run(&section) {
                    trace!(l_size, r_size, count = run.count, "phase 1: identical-hash run found");
                    self.resolve_run(mapping, &section, run, &mut queue, true);
                    continue;
                }
                section.flags.insert(crate::section::SectionFlags::NO_IDENTICAL);
            }

            if !section.flags.contains(crate::section::SectionFlags::NO_SIMILAR) {
                let finder = NodePairFinder::new(self.left, self.right, HashKind::Local);
                if let Some(run) = finder.find_longest_run(&section) {
                    trace!(l_size, r_size, count = run.count, "phase 2: local-hash run found");
                    self.resolve_run(mapping, &section, run, &mut queue, false);
                    continue;
                }
                section.flags.insert(crate::section::SectionFlags::NO_SIMILAR);
            }

            // Phase 3: replace the two leading unmatched children and shrink.
            trace!(l_size, r_size, "phase 3: replacing leading pair");
            let lc = section.left[0];
            let rc = section.right[0];
            if !self.map_pair(mapping, lc, rc) {
                mapping.replace(self.left.prototype(lc).clone(), self.right.prototype(rc).clone());
            }
            section.remove_node(lc);
            section.remove_node(rc);
            queue.push(section);
        }
    }

    /// Map (or recurse into) every pair in a matched run, then requeue the
    /// predecessor/successor sub-sections split around it.
    fn resolve_run(
        &self,
        mapping: &mut Mapping,
        section: &Section,
        run: MatchRun,
        queue: &mut Vec<Section>,
        identical: bool,
    ) {
        for i in 0..run.count {
            let lc = section.left[run.left_offset + i];
            let rc = section.right[run.right_offset + i];
            if identical {
                self.map_identical_subtrees(mapping, lc, rc);
            } else if !self.map_pair(mapping, lc, rc) {
                mapping.replace(self.left.prototype(lc).clone(), self.right.prototype(rc).clone());
            }
        }
        let last_left = section.left[run.left_offset + run.count - 1];

        debug!(
            left_offset = run.left_offset,
            right_offset = run.right_offset,
            count = run.count,
            "section split around matched run"
        );

        // `queue` is popped LIFO (§4.4: sections are processed left-to-right),
        // so the successor sub-section is pushed first: the predecessor then
        // ends up on top and is the next one resolved.
        let successor_left = section.left[run.left_offset + run.count..].to_vec();
        let successor_right = section.right[run.right_offset + run.count..].to_vec();
        if !successor_left.is_empty() || !successor_right.is_empty() {
            queue.push(Section {
                previous: Some(last_left),
                left: successor_left,
                right: successor_right,
                flags: crate::section::SectionFlags::empty(),
            });
        }

        let predecessor_left = section.left[..run.left_offset].to_vec();
        let predecessor_right = section.right[..run.right_offset].to_vec();
        if !predecessor_left.is_empty() || !predecessor_right.is_empty() {
            queue.push(Section {
                previous: section.previous,
                left: predecessor_left,
                right: predecessor_right,
                flags: crate::section::SectionFlags::empty(),
            });
        }
    }

    fn insert_remaining(&self, mapping: &mut Mapping, into_ext: ExtId, section: &Section, right: &[ExtId]) {
        trace!(count = right.len(), "section emptied on the left: inserting remainder");
        let into = self.right.prototype(into_ext).clone();
        let mut after = section.previous.map(|id| self.right.prototype(id).clone());
        for &rc in right {
            let node = self.right.prototype(rc).clone();
            self.record_insertion_subtree(mapping, &node, into.clone(), after.clone());
            after = Some(node);
        }
    }

    /// Record `node` (and, recursively, its whole subtree) as inserted.
    fn record_insertion_subtree(&self, mapping: &mut Mapping, node: &crate::node::Node, into: crate::node::Node, after: Option<crate::node::Node>) {
        mapping.insert(node.clone(), Some(into), after);
        let mut previous: Option<crate::node::Node> = None;
        for child in node.children() {
            self.record_insertion_subtree(mapping, child, node.clone(), previous.clone());
            previous = Some(child.clone());
        }
    }

    fn delete_remaining(&self, mapping: &mut Mapping, left: &[ExtId]) {
        trace!(count = left.len(), "section emptied on the right: deleting remainder");
        for &lc in left {
            self.record_deletion_subtree(mapping, lc);
        }
    }

    fn record_deletion_subtree(&self, mapping: &mut Mapping, id: ExtId) {
        for child in self.left.children(id) {
            self.record_deletion_subtree(mapping, child);
        }
        mapping.delete(self.left.prototype(id).clone());
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
    fn identical_trees_map_fully_with_no_diff() {
        let a = branch("Root", vec![leaf("A", "1"), leaf("B", "2")]);
        let b = branch("Root", vec![leaf("A", "1"), leaf("B", "2")]);
        let mapper = GumTreeMapper;
        let mapping = mapper.map(Some(&a), Some(&b));
        assert_eq!(mapping.pairs().count(), 3);
        assert!(mapping.inserted().is_empty());
        assert!(mapping.deleted().is_empty());
    }

    #[test]
    fn appended_child_is_an_insert() {
        let a = branch("Root", vec![leaf("A", "1")]);
        let b = branch("Root", vec![leaf("A", "1"), leaf("B", "2")]);
        let mapper = GumTreeMapper;
        let mapping = mapper.map(Some(&a), Some(&b));
        assert_eq!(mapping.inserted().len(), 1);
        assert_eq!(mapping.inserted()[0].node.data(), "2");
    }

    #[test]
    fn removed_child_is_a_delete() {
        let a = branch("Root", vec![leaf("A", "1"), leaf("B", "2")]);
        let b = branch("Root", vec![leaf("A", "1")]);
        let mapper = GumTreeMapper;
        let mapping = mapper.map(Some(&a), Some(&b));
        assert_eq!(mapping.deleted().len(), 1);
        assert_eq!(mapping.deleted()[0].data(), "2");
    }

    #[test]
    fn changed_leaf_is_a_replace() {
        let a = branch("Root", vec![leaf("A", "1")]);
        let b = branch("Root", vec![leaf("A", "2")]);
        let mapper = GumTreeMapper;
        let mapping = mapper.map(Some(&a), Some(&b));
        assert_eq!(mapping.replaced().count(), 1);
    }
}
