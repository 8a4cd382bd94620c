//! Meta registry tests

use crate::common::TestDb;
use pongodb::{DurabilityMode, MetaValue, PongoError};

#[test]
fn defaults() {
    let t = TestDb::new_strict();
    assert_eq!(t.db.meta("id", None).unwrap(), MetaValue::from("_id"));
    assert_eq!(t.db.meta(".sync", None).unwrap(), MetaValue::Int(1));
    assert_eq!(t.db.meta(".newkey", None).unwrap(), MetaValue::Unset);
    assert_eq!(t.db.meta(".uuid_class", None).unwrap(), MetaValue::from("hyphenated"));
    assert_eq!(t.db.meta("chunksize", None).unwrap(), MetaValue::Int(8192));
}

#[test]
fn set_returns_previous_value() {
    let t = TestDb::new_strict();
    let prev = t.db.meta(".sync", Some(MetaValue::Int(0))).unwrap();
    assert_eq!(prev, MetaValue::Int(1));
    assert_eq!(t.db.durability(), DurabilityMode::Relaxed);
    assert_eq!(t.db.meta(".sync", None).unwrap(), MetaValue::Int(0));
}

#[test]
fn unknown_name_and_bad_values() {
    let t = TestDb::new();
    assert!(matches!(
        t.db.meta("colour", None),
        Err(PongoError::UnknownMeta { .. })
    ));
    for (name, value) in [
        ("chunksize", MetaValue::from("big")),
        ("chunksize", MetaValue::Int(-1)),
        ("id", MetaValue::from("")),
        ("id", MetaValue::from("x".repeat(256))),
        (".sync", MetaValue::from("always")),
        (".uuid_class", MetaValue::from("braced")),
        (".newkey", MetaValue::Int(1)),
    ] {
        assert!(
            matches!(
                t.db.meta(name, Some(value)),
                Err(PongoError::InvalidMetaValue { .. })
            ),
            "{}",
            name
        );
    }
}

#[test]
fn chunksize_and_id_persist_others_do_not() {
    let mut t = TestDb::new();
    t.db.meta("chunksize", Some(MetaValue::Int(20_000))).unwrap();
    t.db.meta("id", Some(MetaValue::from("oid"))).unwrap();
    t.db.meta(".uuid_class", Some(MetaValue::from("simple"))).unwrap();
    t.reopen();
    // rounded up to a whole page
    assert_eq!(t.db.meta("chunksize", None).unwrap(), MetaValue::Int(20_480));
    assert_eq!(t.db.meta("id", None).unwrap(), MetaValue::from("oid"));
    assert_eq!(t.db.meta(".uuid_class", None).unwrap(), MetaValue::from("hyphenated"));
}

#[test]
fn chunksize_applies_to_future_growth() {
    let t = TestDb::new();
    t.db.meta("chunksize", Some(MetaValue::Int(65_536))).unwrap();
    let before = t.db.stats().unwrap();
    let l = t.db.create_list().unwrap();
    t.db.append(l, "y".repeat(6000)).unwrap();
    let after = t.db.stats().unwrap();
    assert_eq!(after.chunks, before.chunks + 1);
    assert_eq!(after.file_size - before.file_size, 65_536);
}
