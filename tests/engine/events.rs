//! PLog and WLog: storing, point reads, range reads, the PLog cache and
//! shared event handles.

use crate::common::*;

fn commit_doc(app: &mut TestApp, gen: &mut StorageIdGenerator, f1: i64) -> LogEvent {
    app.commit(QNAME_COMMAND_CUD, gen, |ev| create_doc(ev, 1, f1))
        .unwrap()
}

fn app_with_cache(size: usize) -> TestApp {
    let mut configs = configs();
    configs
        .get_config_mut(&app_name())
        .unwrap()
        .set_params(AppConfigParams {
            plog_event_cache_size: size,
        });
    TestApp::with_configs(configs)
}

fn read_plog_offsets(app: &TestApp, from: Offset, count: usize) -> Vec<Offset> {
    let mut out = Vec::new();
    app.structs
        .events()
        .read_plog(PART, from, count, &mut |off, ev| {
            assert_eq!(ev.plog_offset(), off);
            out.push(off);
            Ok(())
        })
        .unwrap();
    out
}

fn read_wlog_offsets(app: &TestApp, ws: WSID, from: Offset, count: usize) -> Vec<Offset> {
    let mut out = Vec::new();
    app.structs
        .events()
        .read_wlog(ws, from, count, &mut |off, ev| {
            assert_eq!(ev.workspace(), ws);
            out.push(off);
            Ok(())
        })
        .unwrap();
    out
}

// ============================================================================
// Logs
// ============================================================================

#[test]
fn stored_event_reads_back_from_plog() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let le = commit_doc(&mut app, &mut gen, 5);

    let events = app.structs.events();
    let got = events.get_plog(PART, le.plog_offset()).unwrap().unwrap();
    assert_eq!(got.plog_offset(), le.plog_offset());
    assert_eq!(got.cud().creates(), le.cud().creates());
    assert!(events.get_plog(PART, 99).unwrap().is_none());
    assert!(events.get_plog(PART + 1, le.plog_offset()).unwrap().is_none());
}

#[test]
fn range_reads_honor_start_and_count() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    for f1 in 1..=5 {
        commit_doc(&mut app, &mut gen, f1);
    }

    assert_eq!(read_plog_offsets(&app, 1, READ_TO_THE_END), vec![1, 2, 3, 4, 5]);
    assert_eq!(read_plog_offsets(&app, 2, 2), vec![2, 3]);
    assert_eq!(read_plog_offsets(&app, 5, 10), vec![5]);
    assert!(read_plog_offsets(&app, 6, READ_TO_THE_END).is_empty());
    assert!(read_plog_offsets(&app, 1, 0).is_empty());

    assert_eq!(read_wlog_offsets(&app, WS, 4, READ_TO_THE_END), vec![4, 5]);
    assert!(read_wlog_offsets(&app, WS + 1, 1, READ_TO_THE_END).is_empty());
}

#[test]
fn range_reads_cross_offset_chunks() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let offsets: Vec<Offset> = vec![4094, 4095, 4096, 4097, 8200];
    for (i, &offset) in offsets.iter().enumerate() {
        let mut params = app.params(QNAME_COMMAND_CUD);
        params.plog_offset = offset;
        params.wlog_offset = offset;
        let events = app.structs.events();
        let mut ev = events.new_raw_event(params);
        create_doc(&mut ev, 1, i as i64);
        events.build_raw_event(&mut ev).unwrap();
        let le = events.put_plog(ev, None, &mut gen).unwrap();
        app.structs.records().apply(&le).unwrap();
        events.put_wlog(&le).unwrap();
    }

    assert_eq!(read_plog_offsets(&app, 4094, READ_TO_THE_END), offsets);
    assert_eq!(read_wlog_offsets(&app, WS, 4095, 3), vec![4095, 4096, 4097]);
}

#[test]
fn read_stops_at_callback_error() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    for f1 in 1..=3 {
        commit_doc(&mut app, &mut gen, f1);
    }

    let mut visited = 0;
    let err = app
        .structs
        .events()
        .read_plog(PART, 1, READ_TO_THE_END, &mut |_, _| {
            visited += 1;
            Err(Error::new(ErrorKind::Validator, "stop"))
        })
        .unwrap_err();
    assert_eq!(visited, 1);
    assert!(err.has_kind(ErrorKind::Validator));
}

#[test]
fn invalid_event_is_logged_and_skipped_by_records() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app
        .commit(QNAME_COMMAND_CUD, &mut gen, |ev| {
            let doc = ev.cud_builder().create(qn("doc"));
            doc.put_record_id(SYS_FIELD_ID, RecordID(1));
        })
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::FieldIsEmpty));

    let events = app.structs.events();
    let stored = events.get_plog(PART, 1).unwrap().unwrap();
    assert!(!stored.error().valid());

    // applying an invalid event stores nothing
    app.structs.records().apply(&stored).unwrap();
    assert!(app.get(RecordID(1)).is_none());
    assert!(app.get(RecordID::new_cdoc_crecord(1)).is_none());
}

#[test]
fn unknown_command_name_fails_build() {
    let mut app = TestApp::new();
    let mut gen = StorageIdGenerator::new();
    let err = app.commit(qn("nope"), &mut gen, |_| {}).unwrap_err();
    assert!(err.has_kind(ErrorKind::NameNotFound));

    let err = app.commit(NULL_QNAME, &mut gen, |_| {}).unwrap_err();
    assert!(err.has_kind(ErrorKind::NameMissed));
}

// ============================================================================
// Cache and handles
// ============================================================================

#[test]
fn cache_keeps_latest_events_up_to_its_size() {
    let mut app = app_with_cache(2);
    let mut gen = StorageIdGenerator::new();
    let first = commit_doc(&mut app, &mut gen, 1);
    assert_eq!(first.ref_count(), 2);

    commit_doc(&mut app, &mut gen, 2);
    commit_doc(&mut app, &mut gen, 3);
    let events = app.structs.events();
    assert_eq!(events.cached_count(), 2);
    // evicted: only the test holds the first event now
    assert_eq!(first.ref_count(), 1);

    // a cached read shares the stored handle
    let third = events.get_plog(PART, 3).unwrap().unwrap();
    assert_eq!(third.ref_count(), 2);

    // an evicted event is decoded and cached again
    let again = events.get_plog(PART, 1).unwrap().unwrap();
    assert_eq!(again.ref_count(), 2);
    assert_eq!(events.cached_count(), 2);
    assert_eq!(again.cud().creates(), first.cud().creates());
}

#[test]
fn zero_sized_cache_decodes_every_read() {
    let mut app = app_with_cache(0);
    let mut gen = StorageIdGenerator::new();
    let le = commit_doc(&mut app, &mut gen, 1);
    assert_eq!(le.ref_count(), 1);

    let events = app.structs.events();
    assert_eq!(events.cached_count(), 0);
    let a = events.get_plog(PART, 1).unwrap().unwrap();
    let b = events.get_plog(PART, 1).unwrap().unwrap();
    assert_eq!(a.ref_count(), 1);
    assert_eq!(b.ref_count(), 1);
    assert_eq!(a.cud().creates(), b.cud().creates());
    assert_eq!(events.cached_count(), 0);
}

#[test]
fn last_released_handle_returns_buffer_to_pool() {
    let mut app = app_with_cache(0);
    let mut gen = StorageIdGenerator::new();
    let le = commit_doc(&mut app, &mut gen, 1);
    let idle = app_pool_len(&app);

    let extra = le.clone();
    assert_eq!(le.ref_count(), 2);
    extra.release();
    assert_eq!(le.ref_count(), 1);
    assert_eq!(app_pool_len(&app), idle);

    le.release();
    assert_eq!(app_pool_len(&app), idle + 1);

    // the next event reuses the idle buffer
    let le = commit_doc(&mut app, &mut gen, 2);
    assert_eq!(app_pool_len(&app), idle);
    drop(le);
}

fn app_pool_len(app: &TestApp) -> usize {
    app.structs.prepared().pool().len()
}
