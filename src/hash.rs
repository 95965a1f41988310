//! Simple, local, and absolute hashing over [`crate::node::Node`]s (§4.1).
//!
//! - [`simple_hash`] — `h(type, data)` only; clusters identical leaves.
//! - [`local_hash`] — `h(type, data, child_count)`; detects same-shape
//!   candidates for the top-down algorithm's phase 2.
//! - [`absolute_hash`] — deep, recursive hash over `(type, data,
//!   child-hashes in order)`; two subtrees with equal absolute hash are
//!   structurally equal modulo collision. Memoized on the node itself
//!   (nodes are immutable, so the cache can never go stale).

use rapidhash::RapidHasher;
use std::hash::{Hash, Hasher};

use crate::node::Node;

/// A 64-bit structural hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash64(pub u64);

impl Hash64 {
    fn of(parts: impl FnOnce(&mut RapidHasher)) -> Self {
        let mut hasher = RapidHasher::default();
        parts(&mut hasher);
        Hash64(hasher.finish())
    }
}

/// `h(type, data)` — ignores children entirely.
pub fn simple_hash(node: &Node) -> Hash64 {
    Hash64::of(|h| {
        node.ty().name().hash(h);
        node.data().hash(h);
    })
}

/// `h(type, data, child_count)` — same shape, possibly different content.
pub fn local_hash(node: &Node) -> Hash64 {
    Hash64::of(|h| {
        node.ty().name().hash(h);
        node.data().hash(h);
        node.children().len().hash(h);
    })
}

/// Deep structural hash: `(type, data, child-hashes in order)`, recursively.
/// Memoized per node identity.
pub fn absolute_hash(node: &Node) -> Hash64 {
    if let Some(cached) = node.cached_absolute_hash() {
        return cached;
    }
    let hash = Hash64::of(|h| {
        node.ty().name().hash(h);
        node.data().hash(h);
        for child in node.children() {
            absolute_hash(child).hash(h);
        }
    });
    node.set_cached_absolute_hash(hash);
    hash
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

    #[test]
    fn identical_subtrees_hash_equal() {
        let a = leaf("Num", "1");
        let b = leaf("Num", "1");
        assert_eq!(absolute_hash(&a), absolute_hash(&b));
        assert_eq!(simple_hash(&a), simple_hash(&b));
        assert_eq!(local_hash(&a), local_hash(&b));
    }

    #[test]
    fn different_data_hashes_differ() {
        let a = leaf("Num", "1");
        let b = leaf("Num", "2");
        assert_ne!(absolute_hash(&a), absolute_hash(&b));
        assert_ne!(simple_hash(&a), simple_hash(&b));
        // local hash ignores data beyond equality check on (type,data) pair,
        // but data *is* part of local hash, so these legitimately differ.
        assert_ne!(local_hash(&a), local_hash(&b));
    }

    #[test]
    fn local_hash_ignores_descendants() {
        use crate::node::ChildDescriptor;
        let ty = Type::new("Wrap", vec![ChildDescriptor::required("Any")], vec![], Default::default());
        let child_a = leaf("X", "1");
        let child_b = leaf("Y", "2");
        let a = Node::new_unchecked(ty.clone(), "".into(), vec![child_a], Fragment::empty());
        let b = Node::new_unchecked(ty, "".into(), vec![child_b], Fragment::empty());
        assert_eq!(local_hash(&a), local_hash(&b));
        assert_ne!(absolute_hash(&a), absolute_hash(&b));
    }

    #[test]
    fn absolute_hash_is_cached() {
        let a = leaf("Num", "1");
        let first = absolute_hash(&a);
        let second = absolute_hash(&a);
        assert_eq!(first, second);
        assert!(a.cached_absolute_hash().is_some());
    }
}
