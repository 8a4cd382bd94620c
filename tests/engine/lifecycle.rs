//! Open/close, locking and persistence tests

use crate::common::{relaxed_options, TestDb};
use pongodb::{Database, Native, OpenOptions, PongoError, Value};
use std::sync::Arc;

#[test]
fn data_survives_close_and_reopen() {
    let mut t = TestDb::new_strict();
    let c = t.db.create_collection("c").unwrap();
    t.db.set(c, "doc", Native::map([("xs", Native::list([1, 2, 3]))]))
        .unwrap();
    t.reopen();
    let c = t.db.collection("c").unwrap();
    assert_eq!(t.db.get_path(c, "doc.xs.2", Value::Null).unwrap(), Value::Int(3));
}

#[test]
fn data_survives_drop_without_close() {
    let t = TestDb::new();
    let path = t.path();
    {
        let c = t.db.create_collection("c").unwrap();
        t.db.set(c, "k", "v").unwrap();
    }
    let TestDb { db, dir, .. } = t;
    drop(db);

    let db = Database::open_with(&path, relaxed_options()).unwrap();
    let c = db.collection("c").unwrap();
    assert_eq!(db.get(c, "k").unwrap(), Value::from("v"));
    drop(dir);
}

#[test]
fn handles_stay_valid_across_reopen() {
    let mut t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    let l = t.db.create_list().unwrap();
    t.db.set(c, "l", l).unwrap();
    t.reopen();
    t.db.append(l, 1).unwrap();
    assert_eq!(t.db.len(l).unwrap(), 1);
}

#[test]
fn operations_after_close_fail() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    t.db.close().unwrap();
    assert!(matches!(t.db.get(c, "x"), Err(PongoError::Closed)));
    assert!(matches!(t.db.gc(), Err(PongoError::Closed)));
}

#[test]
fn second_open_in_process_shares_instance() {
    let t = TestDb::new();
    let again = Database::open_with(t.path(), OpenOptions::default()).unwrap();
    assert!(Arc::ptr_eq(&t.db, &again));
}

#[test]
fn max_file_size_is_resource_exhausted() {
    let options = OpenOptions {
        max_file_size: Some(16_384),
        ..relaxed_options()
    };
    let t = TestDb::with_options(options);
    let l = t.db.create_list().unwrap();
    let err = t.db.append(l, "z".repeat(20_000)).unwrap_err();
    assert!(matches!(err, PongoError::ResourceExhausted { .. }));
    assert!(err.is_storage_error());

    // committed state is intact and smaller writes still succeed
    assert_eq!(t.db.len(l).unwrap(), 0);
    t.db.append(l, "small").unwrap();
    assert_eq!(t.db.len(l).unwrap(), 1);
}

#[test]
fn handle_at_rebuilds_from_header() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    let rebuilt = t.db.handle_at(d.location).unwrap();
    assert_eq!(rebuilt, d);
    assert_eq!(rebuilt.generation, d.generation);
    assert_eq!(rebuilt.kind, d.kind);
    assert!(t.db.handle_at(pongodb::Location(3)).unwrap_err().is_stale());
}

#[test]
fn pidcache_records_current_pid() {
    let t = TestDb::new();
    let d = t.db.create_dict().unwrap();
    let pid = std::process::id();
    let entries = t.db.pidcache();
    assert!(entries.iter().all(|e| e.pid == pid));
    assert!(entries.iter().any(|e| e.location == d.location));
}

#[test]
fn concurrent_appends_from_threads() {
    let t = TestDb::new();
    let l = t.db.create_list().unwrap();
    let threads: Vec<_> = (0..4)
        .map(|i| {
            let db = t.db.clone();
            std::thread::spawn(move || {
                for j in 0..25 {
                    db.append(l, i * 100 + j).unwrap();
                }
            })
        })
        .collect();
    for th in threads {
        th.join().unwrap();
    }
    assert_eq!(t.db.len(l).unwrap(), 100);
}
