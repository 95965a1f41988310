//! Immutable, reference-counted AST nodes.
//!
//! A [`Node`] pairs a [`Type`], an optional textual `data` payload, an
//! ordered list of children, and a [`Fragment`]. Equality is
//! reference-identity (`Node::ptr_eq`); structural equivalence is
//! [`Node::deep_compare`]. Nodes are produced once by [`Type::build`] and
//! never mutated afterward — see [`crate::mutable`] for the scoped editor
//! used when a tree needs to change.

use core::cell::Cell;
use core::fmt;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::BuildError;
use crate::hash::Hash64;

/// A source position: line/column for humans, byte offset for slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// 0-based byte offset into the source.
    pub offset: u32,
}

impl Position {
    /// Construct a position.
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Something that can regenerate source text between two positions.
pub trait Source {
    /// Return the text of this source between `begin` and `end`.
    fn text(&self, begin: Position, end: Position) -> String;
    /// A human-readable name for this source (file path, buffer name, ...).
    fn name(&self) -> &str;
}

/// A span `[begin, end]` in some [`Source`]. `begin <= end` always.
///
/// [`Fragment::empty`] is the singleton used when no source span exists —
/// the common case for synthetic or built nodes.
#[derive(Clone)]
pub struct Fragment {
    inner: Option<(Position, Position, Rc<dyn Source>)>,
}

impl Fragment {
    /// Build a fragment spanning `[begin, end]` of `source`.
    ///
    /// # Panics
    /// Panics if `end < begin` — fragments are well-ordered by construction.
    pub fn new(begin: Position, end: Position, source: Rc<dyn Source>) -> Self {
        assert!(begin <= end, "fragment begin must not be after end");
        Self {
            inner: Some((begin, end, source)),
        }
    }

    /// The empty fragment: no source span.
    pub fn empty() -> Self {
        Self { inner: None }
    }

    /// True if this is the empty fragment.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// The fragment's start position, if any.
    pub fn begin(&self) -> Option<Position> {
        self.inner.as_ref().map(|(b, _, _)| *b)
    }

    /// The fragment's end position, if any.
    pub fn end(&self) -> Option<Position> {
        self.inner.as_ref().map(|(_, e, _)| *e)
    }

    /// Regenerate the source text this fragment spans, if it has one.
    pub fn text(&self) -> Option<String> {
        self.inner
            .as_ref()
            .map(|(b, e, src)| src.text(*b, *e))
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => write!(f, "Fragment(empty)"),
            Some((b, e, src)) => write!(f, "Fragment({}@{:?}..{:?})", src.name(), b, e),
        }
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::empty()
    }
}

/// A constraint on one child slot of a [`Type`]: the child must belong to
/// `group` (see [`Type::belongs_to_group`]), and may be `optional`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDescriptor {
    /// Name of the type-group this slot accepts.
    pub group: Box<str>,
    /// Whether this slot may be omitted.
    pub optional: bool,
}

impl ChildDescriptor {
    /// A required child slot accepting `group`.
    pub fn required(group: impl Into<Box<str>>) -> Self {
        Self {
            group: group.into(),
            optional: false,
        }
    }

    /// An optional child slot accepting `group`.
    pub fn optional(group: impl Into<Box<str>>) -> Self {
        Self {
            group: group.into(),
            optional: true,
        }
    }
}

/// `setData`-style rejection predicate (§7 "invalid data").
type DataRule = Box<dyn Fn(&str) -> bool>;

struct TypeInner {
    name: Box<str>,
    children: Vec<ChildDescriptor>,
    hierarchy: Vec<Box<str>>,
    properties: BTreeMap<Box<str>, Box<str>>,
    /// Set only by [`Type::draft`]: skips [`Type::validate_children`]
    /// entirely. Draft nodes (§3, §6) carry no a-priori schema.
    unconstrained: bool,
    /// `build` rejects a data payload for which this returns `false`.
    data_rule: Option<DataRule>,
}

/// A node's type: a name, child-arity/shape constraints, a `hierarchy` of
/// ancestor group names (used by [`Type::belongs_to_group`]), and a property
/// map (e.g. `color`, `language`). Cheaply `Clone`-able (reference-counted).
#[derive(Clone)]
pub struct Type(Rc<TypeInner>);

impl Type {
    /// Build a type with no child descriptors (a leaf type) and an empty
    /// hierarchy.
    pub fn leaf(name: impl Into<Box<str>>) -> Self {
        Self::new(name, Vec::new(), Vec::new(), BTreeMap::new())
    }

    /// Build a type from its full constituent parts.
    pub fn new(
        name: impl Into<Box<str>>,
        children: Vec<ChildDescriptor>,
        hierarchy: Vec<Box<str>>,
        properties: BTreeMap<Box<str>, Box<str>>,
    ) -> Self {
        Self(Rc::new(TypeInner {
            name: name.into(),
            children,
            hierarchy,
            properties,
            unconstrained: false,
            data_rule: None,
        }))
    }

    /// Like [`Type::new`], but `build` also rejects any data payload for
    /// which `data_rule` returns `false` (§7 "invalid data", the `setData`
    /// half of the builder-rejection taxonomy).
    pub fn with_data_rule(
        name: impl Into<Box<str>>,
        children: Vec<ChildDescriptor>,
        hierarchy: Vec<Box<str>>,
        properties: BTreeMap<Box<str>, Box<str>>,
        data_rule: impl Fn(&str) -> bool + 'static,
    ) -> Self {
        Self(Rc::new(TypeInner {
            name: name.into(),
            children,
            hierarchy,
            properties,
            unconstrained: false,
            data_rule: Some(Box::new(data_rule)),
        }))
    }

    /// A type with no schema: accepts any number of children of any type,
    /// and never rejects a build (§3 "Draft node", §6). Used by the textual
    /// draft descriptor parser, which has no factory to consult for arity.
    pub fn draft(name: impl Into<Box<str>>) -> Self {
        Self(Rc::new(TypeInner {
            name: name.into(),
            children: Vec::new(),
            hierarchy: Vec::new(),
            properties: BTreeMap::new(),
            unconstrained: true,
            data_rule: None,
        }))
    }

    /// The type's name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The type's child-slot descriptors, in order.
    pub fn child_descriptors(&self) -> &[ChildDescriptor] {
        &self.0.children
    }

    /// The inclusive list of ancestor type-group names.
    pub fn hierarchy(&self) -> &[Box<str>] {
        &self.0.hierarchy
    }

    /// Look up a property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.0.properties.get(key).map(|v| &**v)
    }

    /// True if this type's name or hierarchy includes `group`.
    ///
    /// Used by [`crate::pattern::Hole`] matching: a hole of type `group`
    /// binds to any node whose type hierarchy includes `group`.
    pub fn belongs_to_group(&self, group: &str) -> bool {
        &*self.0.name == group || self.0.hierarchy.iter().any(|g| &**g == group)
    }

    /// Validate and construct a node of this type.
    ///
    /// Checks child count/arity/group against [`Type::child_descriptors`].
    /// On success, produces an immutable [`Node`]; on failure, returns a
    /// [`BuildError`] describing the rejection (the caller may fall back to
    /// [`Node::dummy`]).
    pub fn build(
        &self,
        data: impl Into<Box<str>>,
        children: Vec<Node>,
        fragment: Fragment,
    ) -> Result<Node, BuildError> {
        let data = data.into();
        self.validate_data(&data)?;
        self.validate_children(&children)?;
        Ok(Node(Rc::new(NodeInner {
            ty: self.clone(),
            data,
            children,
            fragment,
            absolute_hash: Cell::new(None),
        })))
    }

    fn validate_data(&self, data: &str) -> Result<(), BuildError> {
        match &self.0.data_rule {
            Some(rule) if !rule(data) => Err(BuildError::InvalidData {
                type_name: self.0.name.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn validate_children(&self, children: &[Node]) -> Result<(), BuildError> {
        if self.0.unconstrained {
            return Ok(());
        }
        let descriptors = &self.0.children;
        let required = descriptors.iter().filter(|d| !d.optional).count();
        if children.len() < required {
            return Err(BuildError::TooFewChildren {
                type_name: self.0.name.clone(),
                required,
                got: children.len(),
            });
        }
        if children.len() > descriptors.len() {
            return Err(BuildError::TooManyChildren {
                type_name: self.0.name.clone(),
                max: descriptors.len(),
                got: children.len(),
            });
        }
        for (index, (descriptor, child)) in descriptors.iter().zip(children.iter()).enumerate() {
            if !child.ty().belongs_to_group(&descriptor.group) {
                return Err(BuildError::WrongChildType {
                    type_name: self.0.name.clone(),
                    index,
                    expected_group: descriptor.group.clone(),
                    actual_type: child.ty().name().into(),
                });
            }
        }
        Ok(())
    }

    /// The sentinel "dummy" type used when a builder rejects its input; see
    /// [`Node::dummy`].
    pub fn dummy() -> Self {
        thread_local! {
            static DUMMY: Type = Type::leaf("Dummy");
        }
        DUMMY.with(|t| t.clone())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.0.name)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}
impl Eq for Type {}

struct NodeInner {
    ty: Type,
    data: Box<str>,
    children: Vec<Node>,
    fragment: Fragment,
    /// Memoized absolute hash (§4.1): nodes are immutable, so caching by
    /// identity is always sound.
    absolute_hash: Cell<Option<Hash64>>,
}

/// An immutable AST node. Cheaply `Clone`-able (reference-counted);
/// equality is reference identity ([`Node::ptr_eq`]), not structural —
/// use [`Node::deep_compare`] for that.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// Identity key for a [`Node`], usable in `HashMap`/`HashSet`. Two keys are
/// equal iff they were derived from the same underlying node (same `Rc`
/// allocation), matching the node model's reference-identity equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(usize);

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({:#x})", self.0)
    }
}

impl Node {
    /// Build a node directly (bypassing [`Type::build`]'s validation). Used
    /// internally by [`crate::mutable`] and the dummy-node fallback; prefer
    /// `Type::build` elsewhere.
    pub(crate) fn new_unchecked(ty: Type, data: Box<str>, children: Vec<Node>, fragment: Fragment) -> Self {
        Self(Rc::new(NodeInner {
            ty,
            data,
            children,
            fragment,
            absolute_hash: Cell::new(None),
        }))
    }

    /// The sentinel node produced when a builder rejects its input. Has the
    /// [`Type::dummy`] type, empty data, and no children.
    pub fn dummy() -> Self {
        Self::new_unchecked(Type::dummy(), "".into(), Vec::new(), Fragment::empty())
    }

    /// This node's type.
    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    /// This node's textual data (possibly empty).
    pub fn data(&self) -> &str {
        &self.0.data
    }

    /// This node's children, in order.
    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    /// This node's source fragment (possibly [`Fragment::empty`]).
    pub fn fragment(&self) -> &Fragment {
        &self.0.fragment
    }

    /// An identity key suitable for `HashMap`/`HashSet` lookups.
    pub fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.0) as usize)
    }

    /// Reference-identity equality: do `a` and `b` point at the same node?
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Structural equivalence: same type name, same data, same properties,
    /// recursively equal children. Does *not* compare fragments (source
    /// spans are not semantic content).
    pub fn deep_compare(a: &Node, b: &Node) -> bool {
        if Node::ptr_eq(a, b) {
            return true;
        }
        if a.ty().name() != b.ty().name() || a.data() != b.data() {
            return false;
        }
        if a.ty().0.properties != b.ty().0.properties {
            return false;
        }
        let ac = a.children();
        let bc = b.children();
        ac.len() == bc.len()
            && ac
                .iter()
                .zip(bc.iter())
                .all(|(x, y)| Node::deep_compare(x, y))
    }

    pub(crate) fn cached_absolute_hash(&self) -> Option<Hash64> {
        self.0.absolute_hash.get()
    }

    pub(crate) fn set_cached_absolute_hash(&self, hash: Hash64) {
        self.0.absolute_hash.set(Some(hash));
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.0.ty.name())
            .field("data", &self.0.data)
            .field("children", &self.0.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, data: &str) -> Node {
        Type::leaf(name).build(data, Vec::new(), Fragment::empty()).unwrap()
    }

    #[test]
    fn ptr_eq_vs_deep_compare() {
        let a = leaf("Num", "1");
        let b = a.clone();
        let c = leaf("Num", "1");
        assert!(Node::ptr_eq(&a, &b));
        assert!(!Node::ptr_eq(&a, &c));
        assert!(Node::deep_compare(&a, &c));
    }

    #[test]
    fn build_validates_arity() {
        let ty = Type::new(
            "Binary",
            vec![ChildDescriptor::required("Expr"), ChildDescriptor::required("Expr")],
            Vec::new(),
            BTreeMap::new(),
        );
        let expr = Type::new("Expr", Vec::new(), vec!["Expr".into()], BTreeMap::new());
        let lhs = expr.build("1", Vec::new(), Fragment::empty()).unwrap();
        let err = ty.build("", vec![lhs.clone()], Fragment::empty()).unwrap_err();
        assert!(matches!(err, BuildError::TooFewChildren { .. }));

        let rhs = expr.build("2", Vec::new(), Fragment::empty()).unwrap();
        let ok = ty.build("+", vec![lhs, rhs], Fragment::empty());
        assert!(ok.is_ok());
    }

    #[test]
    fn build_validates_child_group() {
        let ty = Type::new(
            "Binary",
            vec![ChildDescriptor::required("Expr"), ChildDescriptor::required("Expr")],
            Vec::new(),
            BTreeMap::new(),
        );
        let stmt = Type::new("Stmt", Vec::new(), vec!["Stmt".into()], BTreeMap::new());
        let bad = stmt.build("", Vec::new(), Fragment::empty()).unwrap();
        let expr = Type::new("Expr", Vec::new(), vec!["Expr".into()], BTreeMap::new());
        let ok_child = expr.build("1", Vec::new(), Fragment::empty()).unwrap();
        let err = ty
            .build("", vec![bad, ok_child], Fragment::empty())
            .unwrap_err();
        assert!(matches!(err, BuildError::WrongChildType { .. }));
    }

    #[test]
    fn build_validates_data() {
        let ty = Type::with_data_rule(
            "IntLit",
            Vec::new(),
            Vec::new(),
            BTreeMap::new(),
            |data| data.parse::<i64>().is_ok(),
        );
        let err = ty.build("not-a-number", Vec::new(), Fragment::empty()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidData { .. }));

        let ok = ty.build("42", Vec::new(), Fragment::empty());
        assert!(ok.is_ok());
    }

    #[test]
    fn dummy_node_has_dummy_type() {
        let d = Node::dummy();
        assert_eq!(d.ty().name(), "Dummy");
        assert!(d.children().is_empty());
    }
}
