//! Stored records: sparse updates, system field protection, unique keys,
//! batch reads and replay of stored events.

use proptest::prelude::*;

use appstruct::engine::decode_event;

use crate::common::*;

fn create_task(app: &mut TestApp, gen: &mut StorageIdGenerator, a: i32, b: i32) -> RecordID {
    let le = app
        .commit(QNAME_COMMAND_CUD, gen, |ev| {
            let t = ev.cud_builder().create(qn("task"));
            t.put_record_id(SYS_FIELD_ID, RecordID(1));
            t.put_int32("a", a);
            t.put_int32("b", b);
        })
        .unwrap();
    created_ids(&le)[0]
}

fn create_user(app: &mut TestApp, gen: &mut StorageIdGenerator, login: &str) -> Result<RecordID> {
    let le = app.commit(QNAME_COMMAND_CUD, gen, |ev| {
        let u = ev.cud_builder().create(qn("user"));
        u.put_record_id(SYS_FIELD_ID, RecordID(1));
        u.put_string("login", login);
    })?;
    Ok(created_ids(&le)[0])
}

fn update(app: &mut TestApp, gen: &mut StorageIdGenerator, id: RecordID, fill: impl FnOnce(&mut Row)) -> Result<LogEvent> {
    let origin = app.get(id).expect("record stored");
    app.commit(QNAME_COMMAND_CUD, gen, |ev| fill(ev.cud_builder().update(&origin)))
}

// ============================================================================
// Sparse updates
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn update_touches_only_written_fields(
        a0 in any::<i32>(),
        b0 in any::<i32>(),
        new_a in proptest::option::of(any::<i32>()),
        new_b in proptest::option::of(any::<i32>()),
    ) {
        let mut app = TestApp::new();
        let mut gen = StorageIdGenerator::new();
        let id = create_task(&mut app, &mut gen, a0, b0);

        update(&mut app, &mut gen, id, |changes| {
            if let Some(a) = new_a {
                changes.put_int32("a", a);
            }
            if let Some(b) = new_b {
                changes.put_int32("b", b);
            }
        })
        .unwrap();

        let stored = app.get(id).unwrap();
        prop_assert_eq!(stored.as_int32("a"), new_a.unwrap_or(a0));
        prop_assert_eq!(stored.as_int32("b"), new_b.unwrap_or(b0));
        prop_assert!(stored.is_active());
    }
}

#[test]
fn update_result_is_available_before_storing() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let id = create_task(&mut app, &mut gen, 1, 2);

    let le = update(&mut app, &mut gen, id, |c| c.put_int32("b", 20)).unwrap();
    let u = le.cud().updates().next().unwrap();
    assert_eq!(u.origin().as_int32("b"), 2);
    assert!(!u.changes().has_value("a"));
    assert_eq!(u.result().as_int32("a"), 1);
    assert_eq!(u.result().as_int32("b"), 20);
}

// ============================================================================
// System fields
// ============================================================================

#[test]
fn system_fields_of_stored_record_are_immutable() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 10);
            create_doc(ev, 2, 20);
            create_rec(ev, 3, 1);
        })
        .unwrap();
    let ids = created_ids(&le);
    let (other_doc, rec) = (ids[1], ids[2]);

    let cases: [(&str, Box<dyn FnOnce(&mut Row)>); 3] = [
        ("sys.ID", Box::new(move |c: &mut Row| c.put_record_id(SYS_FIELD_ID, RecordID::new_cdoc_crecord(999)))),
        ("sys.ParentID", Box::new(move |c: &mut Row| c.put_record_id(SYS_FIELD_PARENT_ID, other_doc))),
        ("sys.Container", Box::new(|c: &mut Row| c.put_string(SYS_FIELD_CONTAINER, "other"))),
    ];
    for (field, change) in cases {
        let err = update(&mut app, &mut gen, rec, change).unwrap_err();
        assert!(err.has_kind(ErrorKind::UnableToUpdateSystemField), "{}: {}", field, err);
        assert!(err.to_string().contains(field), "{} not named in «{}»", field, err);
    }

    let stored = app.get(rec).unwrap();
    assert_eq!(stored.parent(), ids[0]);
    assert_eq!(stored.container(), "rec");
}

// ============================================================================
// Uniques
// ============================================================================

#[test]
fn unique_key_taken_by_stored_record() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let alice = create_user(&mut app, &mut gen, "alice").unwrap();

    let err = create_user(&mut app, &mut gen, "alice").unwrap_err();
    assert!(err.has_kind(ErrorKind::UniqueConstraintViolation));
    assert!(err.to_string().contains(&alice.to_string()));

    create_user(&mut app, &mut gen, "bob").unwrap();
}

#[test]
fn unique_key_repeated_in_one_event() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            for raw in [1, 2] {
                let u = ev.cud_builder().create(qn("user"));
                u.put_record_id(SYS_FIELD_ID, RecordID(raw));
                u.put_string("login", "twin");
            }
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::UniqueConstraintViolation));
    assert!(err.to_string().contains("same event"));
}

#[test]
fn deactivation_releases_unique_key() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let first = create_user(&mut app, &mut gen, "alice").unwrap();

    update(&mut app, &mut gen, first, |c| c.put_bool(SYS_FIELD_IS_ACTIVE, false)).unwrap();
    assert!(!app.get(first).unwrap().is_active());

    let second = create_user(&mut app, &mut gen, "alice").unwrap();
    assert_ne!(first, second);

    // the old owner can not take the key back while the new one holds it
    let err = update(&mut app, &mut gen, first, |c| c.put_bool(SYS_FIELD_IS_ACTIVE, true)).unwrap_err();
    assert!(err.has_kind(ErrorKind::UniqueConstraintViolation));
}

#[test]
fn changed_unique_value_moves_the_key() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let id = create_user(&mut app, &mut gen, "alice").unwrap();

    update(&mut app, &mut gen, id, |c| c.put_string("login", "bob")).unwrap();
    // updating other fields keeps the record's own key
    update(&mut app, &mut gen, id, |c| c.put_int32("age", 30)).unwrap();

    assert!(create_user(&mut app, &mut gen, "alice").is_ok());
    let err = create_user(&mut app, &mut gen, "bob").unwrap_err();
    assert!(err.has_kind(ErrorKind::UniqueConstraintViolation));
}

#[test]
fn unique_key_handed_over_in_one_event() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let a = create_user(&mut app, &mut gen, "x").unwrap();
    let origin = app.get(a).unwrap();

    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            ev.cud_builder().update(&origin).put_string("login", "y");
            let b = ev.cud_builder().create(qn("user"));
            b.put_record_id(SYS_FIELD_ID, RecordID(1));
            b.put_string("login", "x");
        })
        .unwrap();
    let b = created_ids(&le)[0];
    assert_eq!(app.get(a).unwrap().as_string("login"), "y");
    assert_eq!(app.get(b).unwrap().as_string("login"), "x");

    // both keys are owned now
    for login in ["x", "y"] {
        let err = create_user(&mut app, &mut gen, login).unwrap_err();
        assert!(err.has_kind(ErrorKind::UniqueConstraintViolation));
    }

    // a record keeping its key does not hand it over
    let origin = app.get(a).unwrap();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            ev.cud_builder().update(&origin).put_int32("age", 40);
            let c = ev.cud_builder().create(qn("user"));
            c.put_record_id(SYS_FIELD_ID, RecordID(1));
            c.put_string("login", "y");
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::UniqueConstraintViolation));
}

// ============================================================================
// Reads and replay
// ============================================================================

#[test]
fn get_batch_keeps_request_order() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 10);
            create_rec(ev, 2, 1).put_int64("f1", 5);
        })
        .unwrap();
    let ids = created_ids(&le);
    let task = create_task(&mut app, &mut gen, 1, 1);

    let missing = RecordID::new_record(4242);
    let rows = app
        .structs
        .records()
        .get_batch(WS, &[ids[1], missing, task, ids[0]])
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].as_ref().unwrap().qname(), &qn("rec"));
    assert!(rows[1].is_none());
    assert_eq!(rows[2].as_ref().unwrap().qname(), &qn("task"));
    assert_eq!(rows[3].as_ref().unwrap().as_int64("f1"), 10);

    assert!(app.structs.records().get(WS + 1, ids[0]).unwrap().is_none());
}

#[test]
fn replaying_stored_events_is_idempotent() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let created = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let u = ev.cud_builder().create(qn("user"));
            u.put_record_id(SYS_FIELD_ID, RecordID(1));
            u.put_string("login", "alice");
            u.put_int32("age", 20);
        })
        .unwrap();
    let id = created_ids(&created)[0];
    let updated = update(&mut app, &mut gen, id, |c| c.put_int32("age", 21)).unwrap();

    let prepared = app.structs.prepared();
    let records = app.structs.records();
    for le in [&created, &updated] {
        let replayed = decode_event(prepared, le.bytes().unwrap()).unwrap();
        // decoded updates carry no origin and load it from storage
        assert!(replayed.cud().updates().all(|u| u.origin().is_empty()));
        let mut seen = Vec::new();
        records.apply_with(&replayed, &mut |r| seen.push(r.id())).unwrap();
        assert_eq!(seen, vec![id]);
    }

    let stored = app.get(id).unwrap();
    assert_eq!(stored.as_string("login"), "alice");
    assert_eq!(stored.as_int32("age"), 21);
    assert!(create_user(&mut app, &mut gen, "alice").is_err());
}
