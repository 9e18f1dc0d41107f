//! Event validation: structural checks, registered validators and checks
//! against stored records.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::*;

struct Counters {
    cud: Arc<AtomicUsize>,
    event: Arc<AtomicUsize>,
}

/// App whose users must not have a negative age and whose events create at
/// most two records
fn app_with_validators() -> (TestApp, Counters) {
    let counters = Counters {
        cud: Arc::new(AtomicUsize::new(0)),
        event: Arc::new(AtomicUsize::new(0)),
    };
    let (cud_calls, event_calls) = (Arc::clone(&counters.cud), Arc::clone(&counters.event));

    let mut configs = configs();
    configs
        .get_config_mut(&app_name())
        .unwrap()
        .add_cud_validator(CudValidator::new([qn("user")], move |rec, _, cmd| {
            cud_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(cmd, &QNAME_COMMAND_CUD);
            if rec.as_int32("age") < 0 {
                return Err(Error::new(ErrorKind::WrongFieldType, "age must not be negative"));
            }
            Ok(())
        }))
        .add_event_validator(EventValidator::new(move |ev, ws| {
            event_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(ws, WS);
            if ev.cud().creates().len() > 2 {
                return Err(Error::new(ErrorKind::Validator, "too many records"));
            }
            Ok(())
        }));
    (TestApp::with_configs(configs), counters)
}

fn create_user(ev: &mut Event, raw: u64, login: &str, age: i32) {
    let u = ev.cud_builder().create(qn("user"));
    u.put_record_id(SYS_FIELD_ID, RecordID(raw));
    if !login.is_empty() {
        u.put_string("login", login);
    }
    u.put_int32("age", age);
}

// ============================================================================
// Registered validators
// ============================================================================

#[test]
fn cud_validator_sees_matching_records_only() {
    let (mut app, calls) = app_with_validators();
    let mut gen = StorageIdGenerator::new();

    app.commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
        create_user(ev, 1, "alice", 30);
        create_doc(ev, 2, 1);
    })
    .unwrap();
    assert_eq!(calls.cud.load(Ordering::SeqCst), 1);
    assert_eq!(calls.event.load(Ordering::SeqCst), 1);

    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| create_user(ev, 1, "bob", -1))
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::Validator));
    assert!(!err.has_kind(ErrorKind::WrongFieldType));
    assert!(err.to_string().contains("age must not be negative"));
}

#[test]
fn cud_validator_sees_update_results() {
    let (mut app, calls) = app_with_validators();
    let mut gen = StorageIdGenerator::new();
    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| create_user(ev, 1, "alice", 30))
        .unwrap();
    let origin = app.get(created_ids(&le)[0]).unwrap();

    // the login is not in the changes but the validator gets the full record
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            ev.cud_builder().update(&origin).put_int32("age", -5);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::Validator));
    assert_eq!(calls.cud.load(Ordering::SeqCst), 2);
    assert_eq!(app.get(origin.id()).unwrap().as_int32("age"), 30);
}

#[test]
fn event_validator_rejects_whole_event() {
    let (mut app, _) = app_with_validators();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 1);
            create_doc(ev, 2, 2);
            create_doc(ev, 3, 3);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::Validator));
    assert!(err.to_string().contains("too many records"));
    assert_eq!(gen.next_cdoc_base(), 1);
}

#[test]
fn validators_do_not_run_on_broken_structure() {
    let (mut app, calls) = app_with_validators();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| create_user(ev, 1, "", -1))
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::FieldIsEmpty));
    assert!(!err.has_kind(ErrorKind::Validator));
    assert_eq!(calls.cud.load(Ordering::SeqCst), 0);
    assert_eq!(calls.event.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn required_fields_are_reported_by_name() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let doc = ev.cud_builder().create(qn("doc"));
            doc.put_record_id(SYS_FIELD_ID, RecordID(1));
            doc.put_string("name", "no f1");
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::FieldIsEmpty));
    assert!(err.to_string().contains("field «f1» is empty"));
}

#[test]
fn created_records_need_raw_ids() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let doc = ev.cud_builder().create(qn("doc"));
            doc.put_record_id(SYS_FIELD_ID, RecordID::new_cdoc_crecord(5));
            doc.put_int64("f1", 1);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::RawRecordIDRequired));

    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 1);
            create_doc(ev, 1, 2);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::RecordIDUniqueViolation));
}

#[test]
fn odoc_and_objects_are_not_cud_records() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let rec = ev.cud_builder().create(qn("order"));
            rec.put_record_id(SYS_FIELD_ID, RecordID(1));
            rec.put_int32("number", 1);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::InvalidTypeKind), "{}", err);

    // objects have no sys.ID at all
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            ev.cud_builder().create(qn("params")).put_int32("n", 1);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::InvalidTypeKind), "{}", err);
}

#[test]
fn contained_record_needs_a_declared_container() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 1);
            create_rec(ev, 2, 1).put_string(SYS_FIELD_CONTAINER, "lines");
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::NameNotFound));
    assert!(err.to_string().contains("lines"));
}

#[test]
fn command_argument_is_checked() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(qn("cmd"), &mut gen, |ev| {
            ev.arg_object_builder().put_string("note", "no n");
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::FieldIsEmpty));
    assert!(err.to_string().contains("field «n»"));

    let le = app
        .commit(qn("cmd"), &mut gen, |ev| {
            ev.arg_object_builder().put_int32("n", 1);
        })
        .unwrap();
    assert!(le.error().valid());
    assert_eq!(le.qname(), qn("cmd"));
}

// ============================================================================
// Stored records
// ============================================================================

#[test]
fn reference_to_stored_record_of_wrong_type() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_doc(ev, 1, 1);
            let u = ev.cud_builder().create(qn("user"));
            u.put_record_id(SYS_FIELD_ID, RecordID(2));
            u.put_string("login", "alice");
        })
        .unwrap();
    let ids = created_ids(&le);
    let (doc, user) = (ids[0], ids[1]);

    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let rec = ev.cud_builder().create(qn("rec"));
            rec.put_record_id(SYS_FIELD_ID, RecordID(1));
            rec.put_record_id(SYS_FIELD_PARENT_ID, doc);
            rec.put_string(SYS_FIELD_CONTAINER, "rec");
            rec.put_record_id("doc", user);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::WrongRecordID));
    assert!(err.to_string().contains("test.user"));

    // the same record with a proper reference is accepted
    app.commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
        let rec = ev.cud_builder().create(qn("rec"));
        rec.put_record_id(SYS_FIELD_ID, RecordID(1));
        rec.put_record_id(SYS_FIELD_PARENT_ID, doc);
        rec.put_string(SYS_FIELD_CONTAINER, "rec");
        rec.put_record_id("doc", doc);
    })
    .unwrap();
}

#[test]
fn stored_parent_must_declare_the_container() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let u = ev.cud_builder().create(qn("user"));
            u.put_record_id(SYS_FIELD_ID, RecordID(1));
            u.put_string("login", "alice");
        })
        .unwrap();
    let user = created_ids(&le)[0];

    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let rec = ev.cud_builder().create(qn("rec"));
            rec.put_record_id(SYS_FIELD_ID, RecordID(1));
            rec.put_record_id(SYS_FIELD_PARENT_ID, user);
            rec.put_string(SYS_FIELD_CONTAINER, "rec");
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::WrongRecordID));
}

#[test]
fn missing_stored_records_are_reported() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();

    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let t = ev.cud_builder().create(qn("task"));
            t.put_record_id(SYS_FIELD_ID, RecordID(1));
            t.put_record_id("owner", RecordID::new_cdoc_crecord(777));
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::RecordIDNotFound));
    assert!(err.to_string().contains("owner"));

    let mut origin = Row::with_qname(Arc::clone(app.structs.app_def()), qn("task"));
    origin.put_record_id(SYS_FIELD_ID, RecordID::new_record(555));
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            ev.cud_builder().update(&origin).put_int32("a", 1);
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::RecordIDNotFound));
    assert!(app.get(origin.id()).is_none());
}
