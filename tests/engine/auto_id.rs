//! Auto-id insertion tests

use crate::common::TestDb;
use pongodb::{Key, MetaValue, Native, PongoError, Slot};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

fn doc(q: i64) -> Native {
    Native::map([("p", Native::Bool(true)), ("q", Native::Int(q))])
}

#[test]
fn eight_inserts_give_eight_keys_and_search() {
    let t = TestDb::new();
    let c = t.db.create_collection("things").unwrap();
    let keys: HashSet<Key> = (0..8)
        .map(|q| t.db.set(c, Slot::AutoId, doc(q)).unwrap())
        .collect();
    assert_eq!(keys.len(), 8);
    assert_eq!(t.db.len(c).unwrap(), 8);

    assert_eq!(t.db.search(c, "p", "==", true).unwrap().len(), 8);
    assert_eq!(t.db.search(c, "q", "<", 4).unwrap().len(), 4);
    assert_eq!(t.db.search(c, "q", ">", 8).unwrap().len(), 0);
}

#[test]
fn default_keys_are_hyphenated_uuids() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    let key = t.db.insert_auto(c, doc(0)).unwrap();
    let text = key.as_str().unwrap();
    assert_eq!(text.len(), 36);
    assert!(Uuid::parse_str(text).is_ok());
}

#[test]
fn id_field_in_value_is_used() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    let key = t
        .db
        .insert_auto(c, Native::map([("_id", Native::from("ada")), ("n", Native::Int(1))]))
        .unwrap();
    assert_eq!(key, Key::from("ada"));

    let key = t
        .db
        .insert_auto(c, Native::map([("_id", 42)]))
        .unwrap();
    assert_eq!(key, Key::from(42));

    // the stored document keeps its id field
    let ada = t.db.get(c, "ada").unwrap().as_handle().unwrap();
    assert_eq!(t.db.get(ada, "_id").unwrap().as_str(), Some("ada"));
}

#[test]
fn custom_id_field_name() {
    let t = TestDb::new();
    t.db.meta("id", Some(MetaValue::from("oid"))).unwrap();
    let c = t.db.create_collection("c").unwrap();
    let key = t
        .db
        .insert_auto(c, Native::map([("oid", "x1"), ("_id", "ignored")]))
        .unwrap();
    assert_eq!(key, Key::from("x1"));
}

#[test]
fn custom_newkey_generator() {
    let t = TestDb::new();
    let counter = Arc::new(AtomicI64::new(100));
    let next = counter.clone();
    t.db
        .meta(
            ".newkey",
            Some(MetaValue::key_generator(move |_| {
                Key::Int(next.fetch_add(1, Ordering::SeqCst))
            })),
        )
        .unwrap();

    let c = t.db.create_collection("c").unwrap();
    assert_eq!(t.db.insert_auto(c, 1).unwrap(), Key::from(100));
    assert_eq!(t.db.insert_auto(c, 2).unwrap(), Key::from(101));
    assert_eq!(counter.load(Ordering::SeqCst), 102);
}

#[test]
fn uuid_class_and_constructor() {
    let t = TestDb::new();
    t.db.meta(".uuid_class", Some(MetaValue::from("urn"))).unwrap();
    t.db
        .meta(".uuid_constructor", Some(MetaValue::uuid_factory(Uuid::nil)))
        .unwrap();
    let c = t.db.create_collection("c").unwrap();
    let key = t.db.insert_auto(c, 0).unwrap();
    assert_eq!(key, Key::from("urn:uuid:00000000-0000-0000-0000-000000000000"));
}

#[test]
fn auto_id_rejected_on_list() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    assert!(matches!(
        t.db.insert_auto(l, 1),
        Err(PongoError::InvalidKey { .. })
    ));
}

#[test]
fn generated_key_written_into_document() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    let key = t.db.insert_auto(c, Native::map([("p", true)])).unwrap();

    let doc = t.db.get(c, key.clone()).unwrap().as_handle().unwrap();
    assert_eq!(t.db.get(doc, "_id").unwrap().as_str(), key.as_str());
    assert_eq!(
        t.db.keys(doc).unwrap(),
        vec![Key::from("p"), Key::from("_id")]
    );
}

#[test]
fn generated_key_uses_configured_id_field() {
    let t = TestDb::new();
    t.db.meta("id", Some(MetaValue::from("oid"))).unwrap();
    t.db
        .meta(".newkey", Some(MetaValue::key_generator(|_| Key::Int(7))))
        .unwrap();
    let c = t.db.create_collection("c").unwrap();
    let key = t.db.insert_auto(c, Native::map([("n", 1)])).unwrap();
    assert_eq!(key, Key::from(7));

    let doc = t.db.get(c, 7).unwrap().as_handle().unwrap();
    assert_eq!(t.db.get(doc, "oid").unwrap().as_int(), Some(7));
    assert!(t.db.get(doc, "_id").unwrap_err().is_not_found());
}

#[test]
fn non_key_id_value_left_untouched() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    let key = t
        .db
        .insert_auto(c, Native::map([("_id", Native::Bool(true))]))
        .unwrap();
    let doc = t.db.get(c, key).unwrap().as_handle().unwrap();
    assert_eq!(t.db.get(doc, "_id").unwrap().as_bool(), Some(true));
    assert_eq!(t.db.len(doc).unwrap(), 1);
}
