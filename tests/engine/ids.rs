//! Storage ID assignment: register separation, singleton IDs, raw ID
//! rewriting and forward references.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::common::*;

const KINDS: [TypeKind; 6] = [
    TypeKind::CDoc,
    TypeKind::CRecord,
    TypeKind::WDoc,
    TypeKind::WRecord,
    TypeKind::ODoc,
    TypeKind::ORecord,
];

fn is_cdoc_kind(kind: TypeKind) -> bool {
    matches!(kind, TypeKind::CDoc | TypeKind::CRecord)
}

// ============================================================================
// Registers
// ============================================================================

proptest! {
    #[test]
    fn cdoc_and_plain_ids_never_overlap(kinds in prop::collection::vec(0..KINDS.len(), 1..200)) {
        let mut gen = StorageIdGenerator::new();
        let mut cdoc = HashSet::new();
        let mut plain = HashSet::new();
        for (raw, k) in kinds.into_iter().enumerate() {
            let kind = KINDS[k];
            let id = gen.next_id(RecordID(raw as u64 + 1), kind).unwrap();
            prop_assert!(!id.is_raw());
            prop_assert!(!id.is_singleton());
            prop_assert_eq!(id.is_cdoc_crecord(), is_cdoc_kind(kind));
            let fresh = if is_cdoc_kind(kind) { cdoc.insert(id) } else { plain.insert(id) };
            prop_assert!(fresh, "ID {} generated twice", id);
        }
        prop_assert!(cdoc.is_disjoint(&plain));
    }
}

#[test]
fn synced_ids_move_counters_past_them() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut gen = StorageIdGenerator::new();
    let mut seen = HashSet::new();
    for _ in 0..500 {
        let kind = KINDS[rng.gen_range(0..KINDS.len())];
        if rng.gen_bool(0.3) {
            let base = rng.gen_range(1..10_000);
            let synced = if is_cdoc_kind(kind) {
                RecordID::new_cdoc_crecord(base)
            } else {
                RecordID::new_record(base)
            };
            gen.update_on_sync(synced, kind);
            seen.insert(synced);
        } else {
            let id = gen.next_id(RecordID(1), kind).unwrap();
            assert!(seen.insert(id), "generated ID {} was already taken", id);
        }
    }
}

#[test]
fn singleton_ids_depend_only_on_name() {
    let first = AppConfig::new(app_name(), 1, app_def());
    let second = AppConfig::new(AppQName::new("test", "other"), 2, app_def());
    let p1 = first.prepare(&MemStorage::new()).unwrap();
    let p2 = second.prepare(&MemStorage::new()).unwrap();

    let id1 = p1.singletons().id(&qn("config")).unwrap();
    let id2 = p2.singletons().id(&qn("config")).unwrap();
    assert_eq!(id1, id2);
    assert!(id1.is_singleton());
    assert!(p1.singletons().id(&qn("doc")).is_err());
}

#[test]
fn prepare_keeps_ids_stable_on_same_storage() {
    let storage = MemStorage::new();
    let p1 = AppConfig::new(app_name(), 1, app_def()).prepare(&storage).unwrap();

    // a later version of the application adds a singleton
    let mut b = app_builder();
    b.add_singleton(qn("another")).add_field("x", DataKind::Int32, false);
    let p2 = AppConfig::new(app_name(), 1, Arc::new(b.build().unwrap()))
        .prepare(&storage)
        .unwrap();

    let config = qn("config");
    assert_eq!(p1.singletons().id(&config).unwrap(), p2.singletons().id(&config).unwrap());
    assert_ne!(
        p2.singletons().id(&qn("another")).unwrap(),
        p2.singletons().id(&config).unwrap()
    );
    assert_eq!(p1.qnames().id(&qn("doc")).unwrap(), p2.qnames().id(&qn("doc")).unwrap());
}

// ============================================================================
// Raw ID rewriting
// ============================================================================

#[test]
fn references_to_raw_id_take_generated_id() {
    const BASE: u64 = 1_000_000;
    let mut app = TestApp::new();
    let mut gen = SeqIdGenerator::starting_at(BASE);

    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 10);
            create_rec(ev, 2, 1).put_record_id("doc", RecordID(1));
        })
        .unwrap();

    assert_eq!(gen.calls, 2);
    assert_eq!(created_ids(&le), vec![RecordID(BASE), RecordID(BASE + 1)]);
    let rec = &le.cud().creates()[1];
    assert_eq!(rec.as_record_id("doc"), RecordID(BASE));
    assert_eq!(rec.parent(), RecordID(BASE));

    let stored = app.get(RecordID(BASE + 1)).unwrap();
    assert_eq!(stored.as_record_id("doc"), RecordID(BASE));
    assert_eq!(stored.container(), "rec");
}

#[test]
fn forward_reference_between_created_records() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();

    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 10);
            // refers to raw ID 3 before it is created
            create_rec(ev, 2, 1).put_record_id("sibling", RecordID(3));
            create_rec(ev, 3, 1).put_record_id("sibling", RecordID(2));
        })
        .unwrap();

    let ids = created_ids(&le);
    let creates = le.cud().creates();
    assert_eq!(creates[1].as_record_id("sibling"), ids[2]);
    assert_eq!(creates[2].as_record_id("sibling"), ids[1]);
    assert!(ids.iter().all(|id| id.is_cdoc_crecord()));
}

#[test]
fn forward_reference_inside_argument_tree() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();

    let le = app
        .commit(qn("order"), &mut gen, |ev| {
            let order = ev.arg_object_builder();
            order.put_record_id(SYS_FIELD_ID, RecordID(1));
            order.put_int32("number", 42);
            let first = order.child_builder("items");
            first.put_record_id(SYS_FIELD_ID, RecordID(2));
            first.put_string("name", "first");
            first.put_record_id("sibling", RecordID(3));
            let second = order.child_builder("items");
            second.put_record_id(SYS_FIELD_ID, RecordID(3));
            second.put_string("name", "second");
        })
        .unwrap();

    let order = le.arg_object();
    assert!(!order.id().is_raw());
    let items: Vec<_> = order.children("items").collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_record_id("sibling"), items[1].id());
    assert!(items.iter().all(|i| i.parent() == order.id()));
    assert!(!items[1].id().is_cdoc_crecord());
}

#[test]
fn dangling_raw_reference_is_rejected() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 10);
            create_rec(ev, 2, 1).put_record_id("sibling", RecordID(77));
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::RecordIDNotFound));
    assert_eq!(gen.next_cdoc_base(), 1);
}
