//! Path resolver tests

use crate::common::TestDb;
use pongodb::{Native, PongoError, Value};

#[test]
fn get_path_default_on_every_kind_of_miss() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set(d, "a", Native::map([("b", Native::list([1, 2, 3]))]))
        .unwrap();
    let dflt = Value::from("default");
    for path in ["x", "a.x", "a.b.3", "a.b.-4", "a.b.one", "a.b.0.z", ""] {
        assert_eq!(t.db.get_path(d, path, dflt.clone()).unwrap(), dflt, "{:?}", path);
    }
    assert_eq!(t.db.get_path(d, "a.b.-1", Value::Null).unwrap(), Value::Int(3));
}

#[test]
fn set_path_creates_intermediate_dicts() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    t.db.set_path(c, "user.profile.name", "ada", false).unwrap();
    assert_eq!(
        t.db.get_path(c, "user.profile.name", Value::Null).unwrap(),
        Value::from("ada")
    );
    t.db.set_path(c, "user.profile.age", 36, false).unwrap();
    let profile = t.db.get_path(c, "user.profile", Value::Null).unwrap();
    assert_eq!(t.db.len(profile.as_handle().unwrap()).unwrap(), 2);
}

#[test]
fn set_path_fail_if_exists_modifies_nothing() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set_path(d, "a.b", 1, false).unwrap();
    let before = t.db.to_native(d).unwrap();
    assert!(matches!(
        t.db.set_path(d, "a.b", 2, true),
        Err(PongoError::KeyExists { .. })
    ));
    let after = t.db.to_native(d).unwrap();
    assert_eq!(after.as_map().unwrap(), before.as_map().unwrap());
    t.db.set_path(d, "a.c", 2, true).unwrap();
}

#[test]
fn set_path_through_list_index() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set(d, "rows", Native::list([Native::map([("v", 0)])])).unwrap();
    t.db.set_path(d, "rows.0.v", 5, false).unwrap();
    t.db.set_path(d, "rows.-1.w", 6, false).unwrap();
    assert_eq!(t.db.get_path(d, "rows.0.v", Value::Null).unwrap(), Value::Int(5));
    assert_eq!(t.db.get_path(d, "rows.0.w", Value::Null).unwrap(), Value::Int(6));
    assert!(matches!(
        t.db.set_path(d, "rows.name", 1, false),
        Err(PongoError::InvalidPath { .. })
    ));
    assert!(matches!(
        t.db.set_path(d, "rows.4.v", 1, false),
        Err(PongoError::IndexOutOfRange { .. })
    ));
}

#[test]
fn set_path_through_primitive_is_invalid() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set(d, "leaf", "text").unwrap();
    assert!(matches!(
        t.db.set_path(d, "leaf.child", 1, false),
        Err(PongoError::InvalidPath { .. })
    ));
}

#[test]
fn delete_path_removes_final_segment() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set(d, "a", Native::map([("xs", Native::list([1, 2]))])).unwrap();
    t.db.delete_path(d, "a.xs.0").unwrap();
    assert_eq!(t.db.get_path(d, "a.xs.0", Value::Null).unwrap(), Value::Int(2));
    assert!(matches!(
        t.db.delete_path(d, "a.xs.5"),
        Err(PongoError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        t.db.delete_path(d, "a.nope"),
        Err(PongoError::KeyNotFound { .. })
    ));
}

#[test]
fn custom_delimiter() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set_path_sep(d, "k.1::k.2", "::", "v", false).unwrap();
    assert_eq!(
        t.db.get_path_sep(d, "k.1::k.2", "::", Value::Null).unwrap(),
        Value::from("v")
    );
    t.db.delete_path_sep(d, "k.1::k.2", "::").unwrap();
    assert_eq!(t.db.len(t.db.get(d, "k.1").unwrap().as_handle().unwrap()).unwrap(), 0);
}
