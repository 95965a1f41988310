//! The literal S1-S6 scenarios and the draft round-trip property from §8,
//! run end to end through the public mapper/difftree surface.

use quercus_diff::difftree::DiffTreeBuilder;
use quercus_diff::draft::{create, serialize};
use quercus_diff::mapping::{Mapper, Mapping};
use quercus_diff::node::Node;
use quercus_diff::GumTreeMapper;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn map(l: &Node, r: &Node) -> Mapping {
    GumTreeMapper.map(Some(l), Some(r))
}

#[test]
fn s1_no_change() {
    init_tracing();
    let l = create("A(B,C)");
    let r = create("A(B,C)");
    let mapping = map(&l, &r);
    assert_eq!(mapping.pairs().count(), 3);
    assert_eq!(mapping.inserted().len(), 0);
    assert_eq!(mapping.replaced().count(), 0);
    assert_eq!(mapping.deleted().len(), 0);
    let diff = DiffTreeBuilder::build(&l, &mapping);
    assert!(Node::deep_compare(&diff.before(), &l));
    assert!(Node::deep_compare(&diff.after(), &r));
}

#[test]
fn s2_insert() {
    init_tracing();
    let l = create("S(a,b)");
    let r = create("S(a,b,c)");
    let mapping = map(&l, &r);
    assert_eq!(mapping.inserted().len(), 1);
    assert_eq!(mapping.inserted()[0].node.ty().name(), "c");
    assert_eq!(mapping.replaced().count(), 0);
    assert_eq!(mapping.deleted().len(), 0);
    assert_eq!(mapping.pairs().count(), 3);
}

#[test]
fn s3_delete() {
    init_tracing();
    let l = create("S(a,b,c)");
    let r = create("S(a,b)");
    let mapping = map(&l, &r);
    assert_eq!(mapping.deleted().len(), 1);
    assert_eq!(mapping.deleted().first().unwrap().ty().name(), "c");
    assert_eq!(mapping.inserted().len(), 0);
    assert_eq!(mapping.replaced().count(), 0);
}

#[test]
fn s4_replace_leaf() {
    init_tracing();
    let l = create(r#"S(x,IntLit<"2">)"#);
    let r = create(r#"S(x,Var<"y">)"#);
    let mapping = map(&l, &r);
    assert_eq!(mapping.replaced().count(), 1);
    let (before, after) = mapping.replaced().next().unwrap();
    assert_eq!(before.ty().name(), "IntLit");
    assert_eq!(after.ty().name(), "Var");
    assert_eq!(mapping.inserted().len(), 0);
    assert_eq!(mapping.deleted().len(), 0);
}

#[test]
fn s5_deep_delete() {
    init_tracing();
    let l = create("P(S(a,b,c))");
    let r = create("P(S(a,b))");
    let mapping = map(&l, &r);
    assert_eq!(mapping.deleted().len(), 1);
    assert_eq!(mapping.deleted().first().unwrap().ty().name(), "c");
    assert_eq!(mapping.pairs().count(), 4);
}

#[test]
fn s6_root_retype() {
    init_tracing();
    let l = create("X(a)");
    let r = create("Y(a)");
    let mapping = map(&l, &r);
    assert_eq!(mapping.replaced().count(), 1);
    let (before, after) = mapping.replaced().next().unwrap();
    assert_eq!(before.ty().name(), "X");
    assert_eq!(after.ty().name(), "Y");
    // `a` is not mapped across: the root replacement is wholesale.
    assert_eq!(mapping.pairs().count(), 0);
}

// Property 8: create-then-serialize round-trips for any tree create could
// have produced.
#[test]
fn draft_round_trip_property() {
    for s in ["A", "S(a,b,c)", r#"IntLit<"2">"#, "P(S(a,b,c),T)", r#"X(Y<"hi">,Z)"#] {
        let n = create(s);
        assert_eq!(serialize(&n), s, "round-trip failed for {s:?}");
    }
}
