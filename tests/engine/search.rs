//! Query engine tests

use crate::common::TestDb;
use pongodb::{ContainerHandle, Key, Native, PongoError};

fn people(t: &TestDb) -> ContainerHandle {
    let c = t.db.create_collection("people").unwrap();
    t.db.set(c, "ada", Native::map([("age", Native::Int(36)), ("lang", Native::from("en"))]))
        .unwrap();
    t.db.set(c, "alan", Native::map([("age", Native::Float(41.5))]))
        .unwrap();
    t.db.set(c, "grace", Native::map([("age", Native::from("unknown"))]))
        .unwrap();
    t.db.set(c, "count", 3).unwrap();
    t.db.set(c, "tags", Native::list(["a"])).unwrap();
    c
}

fn keys(hits: &[(Key, ContainerHandle)]) -> Vec<String> {
    hits.iter().map(|(k, _)| k.to_string()).collect()
}

#[test]
fn numeric_comparison_mixes_int_and_float() {
    let t = TestDb::new();
    let c = people(&t);
    assert_eq!(keys(&t.db.search(c, "age", ">", 40).unwrap()), vec!["alan"]);
    assert_eq!(
        keys(&t.db.search(c, "age", ">=", 36.0).unwrap()),
        vec!["ada", "alan"]
    );
}

#[test]
fn incomparable_and_missing_fields_are_excluded() {
    let t = TestDb::new();
    let c = people(&t);
    assert_eq!(keys(&t.db.search(c, "age", "!=", 0).unwrap()), vec!["ada", "alan"]);
    assert_eq!(keys(&t.db.search(c, "lang", "==", "en").unwrap()), vec!["ada"]);
    assert!(t.db.search(c, "nope", "==", 1).unwrap().is_empty());
}

#[test]
fn results_carry_child_handles() {
    let t = TestDb::new();
    let c = people(&t);
    let hits = t.db.search(c, "lang", "==", "en").unwrap();
    let ada = t.db.get(c, "ada").unwrap().as_handle().unwrap();
    assert_eq!(hits[0].1, ada);
}

#[test]
fn invalid_operator_and_field_type() {
    let t = TestDb::new();
    let c = people(&t);
    assert!(matches!(
        t.db.search(c, "age", "=~", 1),
        Err(PongoError::InvalidOperator { .. })
    ));
    assert!(matches!(
        t.db.search(c, 5, "==", 1),
        Err(PongoError::InvalidFieldType { .. })
    ));
}

#[test]
fn search_over_list_children() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.extend(
        l,
        [
            Native::map([("n", 1)]),
            Native::from(7),
            Native::map([("n", 2)]),
        ],
    )
    .unwrap();
    let hits = t.db.search(l, "n", ">=", 1).unwrap();
    assert_eq!(
        hits.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
        vec![Key::from(0), Key::from(2)]
    );
}

#[test]
fn search_path_nested_and_wildcard() {
    let t = TestDb::new();
    let c = t.db.create_collection("orders").unwrap();
    t.db.set(
        c,
        "o1",
        Native::map([
            ("customer", Native::map([("city", "Oslo")])),
            ("lines", Native::list([Native::map([("qty", 1)]), Native::map([("qty", 9)])])),
        ]),
    )
    .unwrap();
    t.db.set(
        c,
        "o2",
        Native::map([
            ("customer", Native::map([("city", "Lima")])),
            ("lines", Native::list([Native::map([("qty", 2)])])),
        ]),
    )
    .unwrap();

    assert_eq!(
        keys(&t.db.search_path(c, "customer.city", "==", "Lima").unwrap()),
        vec!["o2"]
    );
    assert_eq!(
        keys(&t.db.search_path(c, "lines.*.qty", ">", 5).unwrap()),
        vec!["o1"]
    );
    assert_eq!(
        keys(&t.db.search_path(c, "lines.0.qty", "<", 5).unwrap()),
        vec!["o1", "o2"]
    );
    assert!(t.db.search_path(c, "customer.zip", "==", 1).unwrap().is_empty());
}

#[test]
fn empty_containers_give_empty_results() {
    let t = TestDb::new();
    let c = t.db.create_collection("empty").unwrap();
    let d = t.db.create_dict().unwrap();
    let l = t.db.create_list().unwrap();

    for h in [c, d, l] {
        for op in ["==", "!=", "<", "<=", ">", ">="] {
            assert!(t.db.search(h, "age", op, 1).unwrap().is_empty());
        }
        assert!(t.db.search_path(h, "a.b", "==", 1).unwrap().is_empty());
        assert!(t.db.search_path(h, "*.age", ">", 0).unwrap().is_empty());
    }
}
