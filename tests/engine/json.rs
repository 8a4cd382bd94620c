//! JSON boundary tests

use crate::common::TestDb;
use chrono::{TimeZone, Utc};
use pongodb::{Key, Native, PongoError, Value};
use uuid::Uuid;

#[test]
fn dict_roundtrip_preserves_order_and_types() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    let text = r#"{"z":1,"a":[true,null,2.5,"s"],"m":{"k":-3}}"#;
    t.db.from_json(d, text).unwrap();
    assert_eq!(t.db.to_json(d).unwrap(), text);
    assert_eq!(t.db.get_path(d, "a.2", Value::Null).unwrap(), Value::Float(2.5));
}

#[test]
fn list_roundtrip() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    t.db.from_json(l, "[1,[2,[3]]]").unwrap();
    assert_eq!(t.db.to_json(l).unwrap(), "[1,[2,[3]]]");
}

#[test]
fn from_json_replaces_contents() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set(d, "old", 1).unwrap();
    t.db.from_json(d, r#"{"new":2}"#).unwrap();
    assert_eq!(t.db.keys(d).unwrap(), vec![Key::from("new")]);
}

#[test]
fn from_json_shape_mismatch() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    assert!(matches!(
        t.db.from_json(d, "[1]"),
        Err(PongoError::WrongKind { .. })
    ));
    assert!(matches!(t.db.from_json(d, "{"), Err(PongoError::Json(_))));
}

#[test]
fn whole_collection_is_not_implemented() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    assert!(matches!(t.db.to_json(c), Err(PongoError::NotImplemented { .. })));
    assert!(matches!(
        t.db.from_json(c, "{}"),
        Err(PongoError::NotImplemented { .. })
    ));
}

#[test]
fn collection_members_roundtrip() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    t.db.from_json_key(c, "doc", r#"{"n":[1,2]}"#).unwrap();
    t.db.from_json_key(c, "num", "7").unwrap();
    assert_eq!(t.db.to_json_key(c, "doc").unwrap(), r#"{"n":[1,2]}"#);
    assert_eq!(t.db.to_json_key(c, "num").unwrap(), "7");
    assert_eq!(t.db.get(c, "num").unwrap(), Value::Int(7));
}

#[test]
fn datetime_and_uuid_keep_their_type() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    let when = Utc.with_ymd_and_hms(2020, 2, 29, 23, 59, 59).unwrap();
    let id = Uuid::from_u128(0xfeed);
    t.db.update(d, [("when", Native::from(when)), ("id", Native::from(id))])
        .unwrap();

    let text = t.db.to_json(d).unwrap();
    assert!(text.contains("$datetime"));

    let copy = t.db.create_dict().unwrap();
    t.db.from_json(copy, &text).unwrap();
    assert_eq!(t.db.get(copy, "when").unwrap(), Value::datetime(when));
    assert_eq!(t.db.get(copy, "id").unwrap(), Value::Uuid(id));
}

#[test]
fn non_finite_float_cannot_be_exported() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set(d, "x", f64::INFINITY).unwrap();
    assert!(matches!(
        t.db.to_json(d),
        Err(PongoError::TypeNotStorable { .. })
    ));
}

#[test]
fn int_keys_export_as_text() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    t.db.set(d, 5, "five").unwrap();
    assert_eq!(t.db.to_json(d).unwrap(), r#"{"5":"five"}"#);
}

#[test]
fn dump_renders_collections() {
    let t = TestDb::new();
    let c = t.db.create_collection("people").unwrap();
    t.db.set(c, "ada", Native::map([("born", 1815)])).unwrap();
    let dump: serde_json::Value = serde_json::from_str(&t.db.dump_json().unwrap()).unwrap();
    assert_eq!(dump["people"]["ada"]["born"], 1815);
}
