//! Garbage collection tests

use crate::common::TestDb;
use pongodb::{Native, Value};

#[test]
fn unreachable_containers_are_reclaimed_and_stale() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    t.db.set(c, "keep", Native::map([("n", 1)])).unwrap();
    t.db.set(c, "drop", Native::map([("xs", Native::list([1, 2]))])).unwrap();
    let keep = t.db.get(c, "keep").unwrap().as_handle().unwrap();
    let dropped = t.db.get(c, "drop").unwrap().as_handle().unwrap();

    t.db.delete(c, "drop").unwrap();
    let stats = t.db.gc().unwrap();
    assert_eq!(stats.containers_reclaimed, 2);
    assert!(stats.bytes_reclaimed() > 0);

    assert!(t.db.get(dropped, "xs").unwrap_err().is_stale());
    assert_eq!(t.db.get(keep, "n").unwrap(), Value::Int(1));
}

#[test]
fn second_gc_is_a_no_op() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    t.db.set(c, "a", Native::list([1])).unwrap();
    t.db.set(c, "a", 0).unwrap();
    assert_eq!(t.db.gc().unwrap().containers_reclaimed, 1);
    let again = t.db.gc().unwrap();
    assert_eq!(again.blocks_reclaimed, 0);
    assert_eq!(again.blocks_before, again.blocks_after);
}

#[test]
fn freed_space_is_reused() {
    let t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    for round in 0..5 {
        t.db.set(c, "big", Native::list(vec![round; 200])).unwrap();
        t.db.gc().unwrap();
    }
    let size_after_rounds = t.db.stats().unwrap().file_size;
    for round in 0..5 {
        t.db.set(c, "big", Native::list(vec![round; 200])).unwrap();
        t.db.gc().unwrap();
    }
    assert_eq!(t.db.stats().unwrap().file_size, size_after_rounds);
}

#[test]
fn gc_survives_reopen() {
    let mut t = TestDb::new();
    let c = t.db.create_collection("c").unwrap();
    t.db.set(c, "doc", Native::map([("deep", Native::map([("x", 1)]))]))
        .unwrap();
    t.reopen();
    t.db.gc().unwrap();
    let c = t.db.collection("c").unwrap();
    assert_eq!(t.db.get_path(c, "doc.deep.x", Value::Null).unwrap(), Value::Int(1));
}

#[test]
fn reclaimed_location_reused_with_new_generation() {
    let t = TestDb::new();
    let a = t.db.create_dict().unwrap();
    t.db.abandon(a).unwrap();
    t.db.gc().unwrap();

    let b = t.db.create_dict().unwrap();
    assert!(b.generation > a.generation);
    assert!(t.db.len(a).unwrap_err().is_stale());
    assert_eq!(t.db.len(b).unwrap(), 0);
}
