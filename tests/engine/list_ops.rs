//! List operation tests
//!
//! Index semantics (negative indices, bounds on both sides), removal by
//! value, and the end-to-end list scenario.

use crate::common::TestDb;
use pongodb::{ContainerHandle, Native, PongoError, Value};

fn ints(db: &TestDb, list: ContainerHandle) -> Vec<i64> {
    db.db
        .values(list)
        .unwrap()
        .into_iter()
        .map(|v| v.as_int().unwrap())
        .collect()
}

#[test]
fn scenario_remove_three_and_sum() {
    let t = TestDb::new();
    let db = &t.db;
    let docs = db.create_collection("docs").unwrap();
    db.set(docs, "nums", Native::list([1, 2, 3, 4, 5, 6])).unwrap();
    let list = db.get(docs, "nums").unwrap().as_handle().unwrap();

    db.remove_value(list, &Value::Int(3)).unwrap();
    assert_eq!(ints(&t, list), vec![1, 2, 4, 5, 6]);
    assert_eq!(ints(&t, list).iter().sum::<i64>(), 18);

    // and the same after a reopen
    let mut t = t;
    t.reopen();
    let docs = t.db.collection("docs").unwrap();
    let list = t.db.get(docs, "nums").unwrap().as_handle().unwrap();
    assert_eq!(ints(&t, list), vec![1, 2, 4, 5, 6]);
}

#[test]
fn append_then_pop_last_restores() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.extend(l, [1, 2]).unwrap();
    t.db.append(l, "x").unwrap();
    assert_eq!(t.db.len(l).unwrap(), 3);
    assert_eq!(t.db.pop(l, -1).unwrap(), Value::from("x"));
    assert_eq!(t.db.len(l).unwrap(), 2);
    assert_eq!(ints(&t, l), vec![1, 2]);
}

#[test]
fn pop_bounds_are_symmetric() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.extend(l, [10, 20, 30]).unwrap();

    for bad in [3, -4] {
        assert!(matches!(
            t.db.pop(l, bad),
            Err(PongoError::IndexOutOfRange { .. })
        ));
    }
    assert_eq!(t.db.pop(l, 2).unwrap(), Value::Int(30));
    assert_eq!(t.db.pop(l, -2).unwrap(), Value::Int(10));
    assert_eq!(ints(&t, l), vec![20]);
}

#[test]
fn get_bounds_are_symmetric() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.extend(l, [1, 2]).unwrap();
    assert_eq!(t.db.get(l, -2).unwrap(), Value::Int(1));
    assert!(t.db.get(l, 2).unwrap_err().is_not_found());
    assert!(t.db.get(l, -3).unwrap_err().is_not_found());
}

#[test]
fn insert_at_len_and_negative() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.insert(l, 0, 2).unwrap();
    t.db.insert(l, 1, 4).unwrap();
    t.db.insert(l, -1, 3).unwrap();
    t.db.insert(l, 0, 1).unwrap();
    assert_eq!(ints(&t, l), vec![1, 2, 3, 4]);
    assert!(matches!(
        t.db.insert(l, 9, 0),
        Err(PongoError::IndexOutOfRange { .. })
    ));
}

#[test]
fn remove_value_first_match_only() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.extend(l, [1, 2, 1]).unwrap();
    t.db.remove_value(l, &Value::Int(1)).unwrap();
    assert_eq!(ints(&t, l), vec![2, 1]);
    assert!(matches!(
        t.db.remove_value(l, &Value::Int(7)),
        Err(PongoError::ValueNotFound)
    ));
}

#[test]
fn remove_value_int_never_equals_float() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.append(l, 1).unwrap();
    assert!(matches!(
        t.db.remove_value(l, &Value::Float(1.0)),
        Err(PongoError::ValueNotFound)
    ));
}

#[test]
fn remove_value_container_by_location() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    let a = t.db.create_dict().unwrap();
    let b = t.db.create_dict().unwrap();
    t.db.extend(l, [a, b]).unwrap();
    t.db.remove_value(l, &Value::Ref(b)).unwrap();
    assert_eq!(t.db.values(l).unwrap(), vec![Value::Ref(a)]);
}

#[test]
fn remove_value_ignores_handle_from_other_generation() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    let a = t.db.create_dict().unwrap();
    t.db.append(l, a).unwrap();

    // Same location, as a stale handle would carry after the block is reused
    let other = ContainerHandle::new(a.location, a.generation + 1, a.kind);
    assert!(!t.db.contains(l, other).unwrap());
    assert!(matches!(
        t.db.remove_value(l, &Value::Ref(other)),
        Err(PongoError::ValueNotFound)
    ));
    assert!(t.db.contains(l, a).unwrap());
    assert_eq!(t.db.len(l).unwrap(), 1);
}

#[test]
fn to_native_preserves_order() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.extend(
        l,
        [
            Native::from(3),
            Native::from("b"),
            Native::list([Native::from(true)]),
        ],
    )
    .unwrap();
    assert_eq!(
        t.db.to_native(l).unwrap(),
        Native::list([Native::from(3), Native::from("b"), Native::list([true])])
    );
}

#[test]
fn delete_and_clear() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.extend(l, [1, 2, 3]).unwrap();
    t.db.delete(l, -1).unwrap();
    assert_eq!(ints(&t, l), vec![1, 2]);
    assert!(t.db.delete(l, 5).unwrap_err().is_not_found());
    t.db.clear(l).unwrap();
    assert!(t.db.is_empty(l).unwrap());
}

#[test]
fn growth_across_many_chunks() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    let text = "x".repeat(500);
    for _ in 0..100 {
        t.db.append(l, text.as_str()).unwrap();
    }
    assert_eq!(t.db.len(l).unwrap(), 100);
    assert!(t.db.stats().unwrap().chunks > 1);
}
