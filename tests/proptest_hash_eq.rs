//! Property tests for the hash/equality contract: values that compare equal
//! must hash equally, since any value may be used as a map key.

mod common;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use common::*;
use proptest::prelude::*;

fn compute_hash(val: &LispValue) -> u64 {
    let mut hasher = DefaultHasher::new();
    val.hash(&mut hasher);
    hasher.finish()
}

fn assert_hash_eq_consistent(v1: &LispValue, v2: &LispValue, msg: &str) {
    assert_eq!(v1, v2, "{} - values should be equal", msg);
    assert_eq!(
        compute_hash(v1),
        compute_hash(v2),
        "{} - hashes should be equal",
        msg
    );
    assert_eq!(v1.hash_code(), v2.hash_code(), "{} - hash codes should be equal", msg);
}

fn leaf() -> impl Strategy<Value = LispValue> {
    prop_oneof![
        Just(LispValue::Nil),
        any::<bool>().prop_map(LispValue::Bool),
        any::<i64>().prop_map(LispValue::Integer),
        "[a-z]{0,6}".prop_map(LispValue::from),
        "[a-z][a-z0-9-]{0,5}"
            .prop_filter("reserved word", |s| !matches!(s.as_str(), "nil" | "true" | "false"))
            .prop_map(|s| LispValue::symbol(&s)),
        "[a-z]{1,6}".prop_map(|s| LispValue::keyword(&s)),
    ]
}

fn value() -> impl Strategy<Value = LispValue> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(LispValue::list_from),
            prop::collection::vec(inner.clone(), 0..4).prop_map(LispValue::vector_from),
            prop::collection::vec((inner.clone(), inner), 0..4).prop_map(LispValue::map_from),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn clone_is_equal(v in value()) {
        assert_hash_eq_consistent(&v, &v.clone(), "clone");
    }

    #[test]
    fn equality_is_symmetric(a in value(), b in value()) {
        prop_assert_eq!(a == b, b == a);
        if a == b {
            prop_assert_eq!(compute_hash(&a), compute_hash(&b));
        }
    }

    #[test]
    fn list_and_vector_agree(items in prop::collection::vec(value(), 0..5)) {
        let as_list = LispValue::list_from(items.clone());
        let as_vector = LispValue::vector_from(items.clone());
        let as_seq = LispValue::Seq(LispSeq::from(items.into_iter().collect::<Vector<_>>()));
        assert_hash_eq_consistent(&as_list, &as_vector, "list vs vector");
        assert_hash_eq_consistent(&as_vector, &as_seq, "vector vs seq");
    }

    #[test]
    fn map_insertion_order_is_irrelevant(
        entries in prop::collection::hash_map("[a-z]{1,4}", any::<i64>(), 0..8)
    ) {
        let pairs: Vec<_> = entries
            .into_iter()
            .map(|(k, v)| (LispValue::keyword(&k), LispValue::Integer(v)))
            .collect();
        let forward = LispValue::map_from(pairs.clone());
        let backward = LispValue::map_from(pairs.into_iter().rev());
        assert_hash_eq_consistent(&forward, &backward, "map order");
    }

    #[test]
    fn printed_value_reads_back(v in value()) {
        let printed = v.inspect();
        let read: LispValue = printed.parse().unwrap();
        prop_assert_eq!(read, v);
    }

    #[test]
    fn ranges_match_their_items(lower in -50i64..50, len in 0i64..20, step in 1i64..4) {
        let upper = lower + len * step;
        let range = eval_str(&format!("(range {} {} {})", lower, upper, step)).unwrap();
        let items = LispValue::vector_from((0..len).map(|i| LispValue::Integer(lower + i * step)));
        assert_hash_eq_consistent(&range, &items, "range vs vector");
    }
}

#[test]
fn distinct_kinds_differ() {
    let s = LispValue::from("abc");
    let sym = LispValue::symbol("abc");
    let kw = LispValue::keyword("abc");
    assert_ne!(s, sym);
    assert_ne!(s, kw);
    assert_ne!(sym, kw);
    assert_ne!(LispValue::Nil, LispValue::list_from([]));
    assert_ne!(LispValue::Bool(false), LispValue::Nil);
}
