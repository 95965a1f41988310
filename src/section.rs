//! Child-list partitioning for the top-down algorithm's alignment step
//! (§4.5): [`Section`] tracks the still-unmatched child indices on both
//! sides of a pair being aligned; [`NodePairFinder`] searches a section for
//! the longest contiguous run of equal-hash pairs.

use crate::ext::{ExtId, ExtIndex};
use crate::hash::Hash64;

/// Memoizes "no match of this kind exists in this section" across the
/// top-down algorithm's phase 1/phase 2 passes, so a re-queued section
/// doesn't redundantly re-scan a phase that already came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionFlags(u8);

impl SectionFlags {
    /// Phase 1 (absolute-hash identical-subtree matching) found nothing.
    pub const NO_IDENTICAL: Self = Self(0b01);
    /// Phase 2 (local-hash same-shape matching) found nothing.
    pub const NO_SIMILAR: Self = Self(0b10);

    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set `other`'s bits.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// Which hash [`NodePairFinder`] compares candidate pairs by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    /// Absolute hash (§4.1): equal implies structurally identical subtrees.
    Absolute,
    /// Local hash (§4.1): equal implies same type/data/child-count, possibly
    /// different descendants.
    Local,
}

fn hash_of(ext: &ExtIndex, kind: HashKind, id: ExtId) -> Hash64 {
    match kind {
        HashKind::Absolute => ext.absolute_hash(id),
        HashKind::Local => ext.local_hash(id),
    }
}

/// A contiguous, unprocessed slice of `l`'s and `r`'s child lists being
/// aligned, anchored after `previous` (the left sibling of this slice in
/// the *already-resolved* output, or `None` at the very start).
#[derive(Debug, Clone)]
pub struct Section {
    /// The resolved left-tree sibling this section's output should follow,
    /// or `None` if this section starts at the very first position.
    pub previous: Option<ExtId>,
    /// Unmatched left-side child ids, in original order.
    pub left: Vec<ExtId>,
    /// Unmatched right-side child ids, in original order.
    pub right: Vec<ExtId>,
    /// Memoized empty-pass flags.
    pub flags: SectionFlags,
}

impl Section {
    /// A section spanning the full child lists of `l` and `r`.
    pub fn whole(left: Vec<ExtId>, right: Vec<ExtId>) -> Self {
        Self {
            previous: None,
            left,
            right,
            flags: SectionFlags::empty(),
        }
    }

    /// Number of unmatched left children.
    pub fn left_size(&self) -> usize {
        self.left.len()
    }

    /// Number of unmatched right children.
    pub fn right_size(&self) -> usize {
        self.right.len()
    }

    /// Drop `n` from whichever side contains it. If `n` was the leading
    /// element of `left`, advance `previous` to `n` (it is now resolved and
    /// becomes the new anchor for whatever remains).
    pub fn remove_node(&mut self, n: ExtId) {
        if let Some(pos) = self.left.iter().position(|&x| x == n) {
            self.left.remove(pos);
            if pos == 0 {
                self.previous = Some(n);
            }
            return;
        }
        if let Some(pos) = self.right.iter().position(|&x| x == n) {
            self.right.remove(pos);
        }
    }

    /// Split this section around a matched pair `(n_left, n_right)`,
    /// producing up to two sub-sections: the predecessor (covering indices
    /// before the match, inheriting this section's `previous`) and the
    /// successor (covering indices after the match, anchored on `n_left`).
    /// Either half may be empty and is then omitted.
    pub fn remove_nodes(&self, n_left: ExtId, n_right: ExtId) -> Vec<Section> {
        let left_pos = self
            .left
            .iter()
            .position(|&x| x == n_left)
            .expect("n_left must be a member of this section");
        let right_pos = self
            .right
            .iter()
            .position(|&x| x == n_right)
            .expect("n_right must be a member of this section");

        let mut out = Vec::with_capacity(2);

        let pred_left = self.left[..left_pos].to_vec();
        let pred_right = self.right[..right_pos].to_vec();
        if !pred_left.is_empty() || !pred_right.is_empty() {
            out.push(Section {
                previous: self.previous,
                left: pred_left,
                right: pred_right,
                flags: SectionFlags::empty(),
            });
        }

        let succ_left = self.left[left_pos + 1..].to_vec();
        let succ_right = self.right[right_pos + 1..].to_vec();
        if !succ_left.is_empty() || !succ_right.is_empty() {
            out.push(Section {
                previous: Some(n_left),
                left: succ_left,
                right: succ_right,
                flags: SectionFlags::empty(),
            });
        }

        out
    }
}

/// The longest contiguous run of equal-hash pairs found by
/// [`NodePairFinder::find_longest_run`]: `left[left_offset..][..count]` pairs
/// index-for-index with `right[right_offset..][..count]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRun {
    /// Offset into the section's `left` slice where the run starts.
    pub left_offset: usize,
    /// Offset into the section's `right` slice where the run starts.
    pub right_offset: usize,
    /// Number of consecutive pairs in the run.
    pub count: usize,
}

/// Searches a [`Section`] for candidate pairs whose `hash_kind` hash
/// coincides.
pub struct NodePairFinder<'a> {
    ext_left: &'a ExtIndex,
    ext_right: &'a ExtIndex,
    hash_kind: HashKind,
}

impl<'a> NodePairFinder<'a> {
    /// A finder comparing `hash_kind` hashes of nodes from `ext_left`
    /// against nodes from `ext_right`.
    pub fn new(ext_left: &'a ExtIndex, ext_right: &'a ExtIndex, hash_kind: HashKind) -> Self {
        Self {
            ext_left,
            ext_right,
            hash_kind,
        }
    }

    fn hash(&self, side: Side, id: ExtId) -> Hash64 {
        match side {
            Side::Left => hash_of(self.ext_left, self.hash_kind, id),
            Side::Right => hash_of(self.ext_right, self.hash_kind, id),
        }
    }

    /// Find the longest contiguous matching run in `section`: maximizing
    /// run length, then minimizing `|left_offset - right_offset|`, then
    /// minimizing `left_offset`.
    pub fn find_longest_run(&self, section: &Section) -> Option<MatchRun> {
        let mut best: Option<MatchRun> = None;
        for (li, &l_id) in section.left.iter().enumerate() {
            for (ri, &r_id) in section.right.iter().enumerate() {
                if self.hash(Side::Left, l_id) != self.hash(Side::Right, r_id) {
                    continue;
                }
                let mut count = 0;
                loop {
                    let l = li + count;
                    let r = ri + count;
                    if l >= section.left.len() || r >= section.right.len() {
                        break;
                    }
                    if self.hash(Side::Left, section.left[l]) != self.hash(Side::Right, section.right[r]) {
                        break;
                    }
                    count += 1;
                }
                let candidate = MatchRun {
                    left_offset: li,
                    right_offset: ri,
                    count,
                };
                best = Some(match best {
                    None => candidate,
                    Some(current) => pick_better(current, candidate),
                });
            }
        }
        best.filter(|run| run.count > 0)
    }

    /// A single-pair probe: the best (by the same tie-break policy, with
    /// `count` fixed to 1) equal-hash pair in `section`, if any.
    pub fn get_best_pair_of_identical_nodes(&self, section: &Section) -> Option<(ExtId, ExtId)> {
        let mut best: Option<MatchRun> = None;
        for (li, &l_id) in section.left.iter().enumerate() {
            for (ri, &r_id) in section.right.iter().enumerate() {
                if self.hash(Side::Left, l_id) == self.hash(Side::Right, r_id) {
                    let candidate = MatchRun {
                        left_offset: li,
                        right_offset: ri,
                        count: 1,
                    };
                    best = Some(match best {
                        None => candidate,
                        Some(current) => pick_better(current, candidate),
                    });
                }
            }
        }
        best.map(|run| (section.left[run.left_offset], section.right[run.right_offset]))
    }

    /// A single-pair probe anchored on a specific left node `reference`:
    /// the right-side node with equal hash, if any (ties broken by
    /// leftmost right index).
    pub fn get_right_pair_of_identical_nodes(&self, section: &Section, reference: ExtId) -> Option<ExtId> {
        let target = self.hash(Side::Left, reference);
        section
            .right
            .iter()
            .find(|&&r| self.hash(Side::Right, r) == target)
            .copied()
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

fn pick_better(current: MatchRun, candidate: MatchRun) -> MatchRun {
    if candidate.count != current.count {
        return if candidate.count > current.count { candidate } else { current };
    }
    let current_offset = current.left_offset.abs_diff(current.right_offset);
    let candidate_offset = candidate.left_offset.abs_diff(candidate.right_offset);
    if candidate_offset != current_offset {
        return if candidate_offset < current_offset { candidate } else { current };
    }
    if candidate.left_offset < current.left_offset {
        candidate
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Fragment, Node, Type};

    fn leaf(name: &str, data: &str) -> Node {
        Type::leaf(name).build(data, Vec::new(), Fragment::empty()).unwrap()
    }

    fn branch(name: &str, children: Vec<Node>) -> Node {
        Type::draft(name).build("", children, Fragment::empty()).unwrap()
    }

    #[test]
    fn longest_run_prefers_count_then_offset_then_leftmost() {
        let left_tree = branch(
            "Root",
            vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3"), leaf("D", "4")],
        );
        let right_tree = branch(
            "Root",
            vec![leaf("X", "x"), leaf("B", "2"), leaf("C", "3"), leaf("Y", "y")],
        );
        let el = ExtIndex::build(&left_tree);
        let er = ExtIndex::build(&right_tree);
        let section = Section::whole(el.children(el.root()).to_vec(), er.children(er.root()).to_vec());
        let finder = NodePairFinder::new(&el, &er, HashKind::Absolute);
        let run = finder.find_longest_run(&section).unwrap();
        assert_eq!(run.count, 2);
        assert_eq!(run.left_offset, 1);
        assert_eq!(run.right_offset, 1);
    }

    #[test]
    fn remove_nodes_splits_around_match() {
        let left_tree = branch("Root", vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
        let right_tree = branch("Root", vec![leaf("X", "x"), leaf("B", "2"), leaf("Y", "y")]);
        let el = ExtIndex::build(&left_tree);
        let er = ExtIndex::build(&right_tree);
        let section = Section::whole(el.children(el.root()).to_vec(), er.children(er.root()).to_vec());
        let n_left = section.left[1];
        let n_right = section.right[1];
        let parts = section.remove_nodes(n_left, n_right);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].left.len(), 1);
        assert_eq!(parts[0].right.len(), 1);
        assert_eq!(parts[1].previous, Some(n_left));
        assert_eq!(parts[1].left.len(), 1);
        assert_eq!(parts[1].right.len(), 1);
    }

    #[test]
    fn remove_node_advances_previous_when_leading() {
        let left_tree = branch("Root", vec![leaf("A", "1"), leaf("B", "2")]);
        let el = ExtIndex::build(&left_tree);
        let kids = el.children(el.root()).to_vec();
        let mut section = Section {
            previous: None,
            left: kids.clone(),
            right: Vec::new(),
            flags: SectionFlags::empty(),
        };
        section.remove_node(kids[0]);
        assert_eq!(section.previous, Some(kids[0]));
        assert_eq!(section.left, vec![kids[1]]);
    }
}
