//! # quercus-diff
//!
//! Greedy structural diffing for immutable, ordered, labeled trees.
//!
//! Named after the genus *Quercus* (oak), since the trees here are grown
//! once and never bent.
//!
//! ## Algorithm overview
//!
//! quercus-diff computes a [`mapping::Mapping`] between two trees in two
//! phases, GumTree-style (Falleri et al., ASE 2014):
//!
//! 1. **Top-down matching** ([`topdown`]): match identical subtrees by
//!    absolute hash, descending only into still-ambiguous regions.
//! 2. **Bottom-up matching** ([`bottomup`]): for nodes left unmapped, match
//!    by structural similarity (Dice coefficient) once enough of their
//!    descendants are already mapped.
//!
//! The result is not a minimum-edit-distance mapping — it is a greedy
//! heuristic, same as the algorithm it's modeled on. See [`mapping`] for the
//! contract the mapping satisfies regardless.
//!
//! ## Usage
//!
//! ```ignore
//! use quercus_diff::{GumTreeMapper, mapping::Mapper};
//!
//! let mapper = GumTreeMapper::default();
//! let mapping = mapper.map(Some(&left_root), Some(&right_root));
//! for (l, r) in mapping.pairs() {
//!     println!("{l:?} <-> {r:?}");
//! }
//! ```

#![warn(missing_docs)]

#[macro_use]
mod tracing_macros;

pub mod action;
pub mod bottomup;
pub mod difftree;
pub mod error;
pub mod ext;
pub mod hash;
pub mod mapping;
pub mod mutable;
pub mod node;
pub mod pattern;
pub mod section;
pub mod topdown;

#[cfg(feature = "draft")]
pub mod draft;

use crate::bottomup::BottomUpMatcher;
use crate::ext::ExtIndex;
use crate::mapping::{Mapper, Mapping};
use crate::node::Node;
use crate::topdown::TopDownMatcher;

/// The combined top-down-then-bottom-up matcher (§4.4-§4.6): the crate's
/// default [`Mapper`] implementation. Both phases are deterministic greedy
/// procedures (§4.4 steps 1-3, §4.6 steps 1-5) with no tunable thresholds —
/// the spec's algorithms take no parameters beyond the two trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct GumTreeMapper;

impl Mapper for GumTreeMapper {
    fn map(&self, left: Option<&Node>, right: Option<&Node>) -> Mapping {
        match (left, right) {
            (None, None) => Mapping::new(),
            (None, Some(r)) => Mapping::all_inserted(r),
            (Some(l), None) => Mapping::all_deleted(l),
            (Some(l), Some(r)) => {
                let left_ext = ExtIndex::build(l);
                let right_ext = ExtIndex::build(r);
                let mapping = TopDownMatcher::new(&left_ext, &right_ext).execute();
                BottomUpMatcher::new(&left_ext, &right_ext).extend(mapping)
            }
        }
    }
}
