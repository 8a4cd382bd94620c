//! Property tests: list operations against a `Vec` model, and primitive
//! values through set/get.

use crate::common::TestDb;
use pongodb::{PongoError, Value};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum ListOp {
    Append(i64),
    Insert(i64, i64),
    Pop(i64),
    Set(i64, i64),
    RemoveValue(i64),
}

fn list_op() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        (-50i64..50).prop_map(ListOp::Append),
        (-8i64..8, -50i64..50).prop_map(|(i, v)| ListOp::Insert(i, v)),
        (-8i64..8).prop_map(ListOp::Pop),
        (-8i64..8, -50i64..50).prop_map(|(i, v)| ListOp::Set(i, v)),
        (-50i64..50).prop_map(ListOp::RemoveValue),
    ]
}

fn resolve(index: i64, len: usize, allow_end: bool) -> Option<usize> {
    let n = len as i64;
    let at = if index < 0 { index + n } else { index };
    let upper = if allow_end { n } else { n - 1 };
    (at >= 0 && at <= upper).then_some(at as usize)
}

fn primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>()
            .prop_filter("NaN never equals itself", |f| !f.is_nan())
            .prop_map(Value::Float),
        ".{0,40}".prop_map(Value::String),
        any::<u128>().prop_map(|n| Value::Uuid(uuid::Uuid::from_u128(n))),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn list_matches_vec_model(ops in prop::collection::vec(list_op(), 1..40)) {
        let t = TestDb::new();
        let l = t.db.create_list().unwrap();
        let mut model: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                ListOp::Append(v) => {
                    t.db.append(l, v).unwrap();
                    model.push(v);
                }
                ListOp::Insert(i, v) => match resolve(i, model.len(), true) {
                    Some(at) => {
                        t.db.insert(l, i, v).unwrap();
                        model.insert(at, v);
                    }
                    None => prop_assert!(t.db.insert(l, i, v).is_err()),
                },
                ListOp::Pop(i) => match resolve(i, model.len(), false) {
                    Some(at) => prop_assert_eq!(t.db.pop(l, i).unwrap(), Value::Int(model.remove(at))),
                    None => {
                        let popped = t.db.pop(l, i);
                        prop_assert!(
                            matches!(popped, Err(PongoError::IndexOutOfRange { .. })),
                            "pop({}) on len {} gave {:?}",
                            i,
                            model.len(),
                            popped
                        );
                    }
                },
                ListOp::Set(i, v) => match resolve(i, model.len(), false) {
                    Some(at) => {
                        t.db.set(l, i, v).unwrap();
                        model[at] = v;
                    }
                    None => prop_assert!(t.db.set(l, i, v).is_err()),
                },
                ListOp::RemoveValue(v) => match model.iter().position(|x| *x == v) {
                    Some(at) => {
                        t.db.remove_value(l, &Value::Int(v)).unwrap();
                        model.remove(at);
                    }
                    None => {
                        let removed = t.db.remove_value(l, &Value::Int(v));
                        prop_assert!(
                            matches!(removed, Err(PongoError::ValueNotFound)),
                            "remove_value({}) gave {:?}",
                            v,
                            removed
                        );
                    }
                },
            }
        }

        let stored: Vec<i64> = t.db.values(l).unwrap().iter().map(|v| v.as_int().unwrap()).collect();
        prop_assert_eq!(stored, model);
    }

    #[test]
    fn primitive_set_get_roundtrip(values in prop::collection::vec(primitive(), 1..20)) {
        let t = TestDb::new();
        let d = t.db.create_dict().unwrap();
        for (i, v) in values.iter().enumerate() {
            t.db.set(d, i as i64, v.clone()).unwrap();
        }
        for (i, v) in values.iter().enumerate() {
            prop_assert_eq!(&t.db.get(d, i as i64).unwrap(), v);
        }
    }
}
