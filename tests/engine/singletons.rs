//! Singleton CDocs: fixed IDs, updates and repeated creation.

use crate::common::*;

fn create_config(ev: &mut Event, v: i64) {
    let rec = ev.cud_builder().create(qn("config"));
    rec.put_record_id(SYS_FIELD_ID, RecordID(1));
    rec.put_int64("v", v);
}

#[test]
fn sequential_updates_resolve_to_the_singleton_id() {
    let mut app = TestApp::new();
    let mut gen = SeqIdGenerator::starting_at(1_000_000);
    let expected = app.structs.prepared().singletons().id(&qn("config")).unwrap();

    let le = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| create_config(ev, 1))
        .unwrap();
    assert_eq!(created_ids(&le), vec![expected]);

    for v in [2, 3] {
        let origin = app
            .structs
            .records()
            .get_singleton(WS, &qn("config"))
            .unwrap()
            .expect("singleton stored");
        let le = app
            .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
                ev.cud_builder().update(&origin).put_int64("v", v);
            })
            .unwrap();
        let ids: Vec<_> = le.cud().updates().map(|u| u.id()).collect();
        assert_eq!(ids, vec![expected]);
    }

    assert_eq!(gen.calls, 0);
    let stored = app.get(expected).unwrap();
    assert_eq!(stored.as_int64("v"), 3);
    assert_eq!(stored.qname(), &qn("config"));
}

#[test]
fn singleton_is_created_once_per_workspace() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    app.commit(QNAME_COMMAND_CUD, &mut gen, |ev| create_config(ev, 1))
        .unwrap();

    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| create_config(ev, 2))
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::RecordIDUniqueViolation));
    assert!(err.to_string().contains("already exists"));

    // another workspace has its own instance under the same ID
    let mut params = app.params(QNAME_COMMAND_CUD);
    params.workspace = WS + 1;
    let events = app.structs.events();
    let mut ev = events.new_raw_event(params);
    create_config(&mut ev, 5);
    events.build_raw_event(&mut ev).unwrap();
    let le = events.put_plog(ev, None, &mut gen).unwrap();
    app.structs.records().apply(&le).unwrap();

    let records = app.structs.records();
    let mine = records.get_singleton(WS, &qn("config")).unwrap().unwrap();
    let theirs = records.get_singleton(WS + 1, &qn("config")).unwrap().unwrap();
    assert_eq!(mine.id(), theirs.id());
    assert_eq!(mine.as_int64("v"), 1);
    assert_eq!(theirs.as_int64("v"), 5);
}

#[test]
fn singleton_created_twice_in_one_event() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            create_config(ev, 1);
            let again = ev.cud_builder().create(qn("config"));
            again.put_record_id(SYS_FIELD_ID, RecordID(2));
        })
        .unwrap_err();
    assert!(err.to_string().contains("singleton «test.config» created twice"));
    assert!(app
        .structs
        .records()
        .get_singleton(WS, &qn("config"))
        .unwrap()
        .is_none());
}

#[test]
fn get_singleton_of_plain_cdoc_fails() {
    let app = TestApp::new();
    let err = app.structs.records().get_singleton(WS, &qn("doc")).unwrap_err();
    assert!(err.has_kind(ErrorKind::NameNotFound));
}
