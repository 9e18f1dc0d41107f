//! Backend and generator failures surface as errors and leave nothing
//! half-written.

use std::sync::Arc;

use appstruct::storage::testing::FaultyStorage;
use appstruct_core::types::REGISTER_FACTOR;

use crate::common::*;

fn faulty_structs(cache_size: usize) -> (Arc<FaultyStorage>, AppStructs) {
    let storage = Arc::new(FaultyStorage::new(Arc::new(MemStorage::new())));
    let mut config = AppConfig::new(app_name(), 1, app_def());
    config.set_params(AppConfigParams {
        plog_event_cache_size: cache_size,
    });
    let structs = AppStructs::new(&config, Arc::clone(&storage) as Arc<dyn Storage>).unwrap();
    (storage, structs)
}

fn doc_event(structs: &AppStructs, offset: Offset) -> Event {
    let mut ev = structs.events().new_raw_event(RawEventParams {
        name: QNAME_COMMAND_CUD,
        handling_partition: PART,
        plog_offset: offset,
        workspace: WS,
        wlog_offset: offset,
        ..Default::default()
    });
    create_doc(&mut ev, 1, 1);
    structs.events().build_raw_event(&mut ev).unwrap();
    ev
}

#[test]
fn preparation_fails_while_storage_rejects_writes() {
    let storage = Arc::new(FaultyStorage::new(Arc::new(MemStorage::new())));
    let config = AppConfig::new(app_name(), 1, app_def());
    storage.fail_writes(true);
    let err = AppStructs::new(&config, Arc::clone(&storage) as Arc<dyn Storage>).unwrap_err();
    assert!(err.has_kind(ErrorKind::Storage));
    assert!(!config.is_prepared());

    // a failed preparation can be retried
    storage.fail_writes(false);
    AppStructs::new(&config, Arc::clone(&storage) as Arc<dyn Storage>).unwrap();
    assert!(config.is_prepared());
}

#[test]
fn failed_plog_write_is_not_cached() {
    let (storage, structs) = faulty_structs(100);
    let mut gen = StorageIdGenerator::new();
    let ev = doc_event(&structs, 1);

    storage.fail_writes(true);
    let err = structs.events().put_plog(ev, None, &mut gen).unwrap_err();
    assert!(err.has_kind(ErrorKind::Storage));
    assert_eq!(structs.events().cached_count(), 0);

    storage.fail_writes(false);
    assert!(structs.events().get_plog(PART, 1).unwrap().is_none());
}

#[test]
fn failed_plog_write_skips_issued_ids() {
    let (storage, structs) = faulty_structs(100);
    let mut gen = StorageIdGenerator::new();

    storage.fail_writes(true);
    assert!(structs.events().put_plog(doc_event(&structs, 1), None, &mut gen).is_err());
    let burnt = gen.next_cdoc_base();
    assert!(burnt > 1);

    storage.fail_writes(false);
    let le = structs.events().put_plog(doc_event(&structs, 1), None, &mut gen).unwrap();
    assert_eq!(created_ids(&le)[0], RecordID::new_cdoc_crecord(burnt));
}

#[test]
fn failed_record_batch_stores_nothing() {
    let (storage, structs) = faulty_structs(100);
    let mut gen = StorageIdGenerator::new();
    let le = structs.events().put_plog(doc_event(&structs, 1), None, &mut gen).unwrap();
    let id = created_ids(&le)[0];

    storage.fail_writes(true);
    assert!(structs.records().apply(&le).unwrap_err().has_kind(ErrorKind::Storage));
    assert!(structs.events().put_wlog(&le).unwrap_err().has_kind(ErrorKind::Storage));

    storage.fail_writes(false);
    assert!(structs.records().get(WS, id).unwrap().is_none());
    structs.records().apply(&le).unwrap();
    assert_eq!(structs.records().get(WS, id).unwrap().unwrap().as_int64("f1"), 1);
}

#[test]
fn read_failures_are_reported() {
    let (storage, structs) = faulty_structs(0);
    let mut gen = StorageIdGenerator::new();
    let le = structs.events().put_plog(doc_event(&structs, 1), None, &mut gen).unwrap();
    structs.records().apply(&le).unwrap();
    let id = created_ids(&le)[0];

    storage.fail_reads(true);
    let events = structs.events();
    assert!(events.get_plog(PART, 1).unwrap_err().has_kind(ErrorKind::Storage));
    assert!(events
        .read_plog(PART, 1, READ_TO_THE_END, &mut |_, _| Ok(()))
        .unwrap_err()
        .has_kind(ErrorKind::Storage));
    assert!(structs.records().get(WS, id).unwrap_err().has_kind(ErrorKind::Storage));
    assert!(structs.records().get_batch(WS, &[id]).is_err());

    storage.fail_reads(false);
    assert!(events.get_plog(PART, 1).unwrap().is_some());
}

#[test]
fn exhausted_generator_stores_nothing() {
    let (_storage, structs) = faulty_structs(100);
    let mut gen = StorageIdGenerator::with_bases(REGISTER_FACTOR, 1);

    let mut ev = structs.events().new_raw_event(RawEventParams {
        name: QNAME_COMMAND_CUD,
        handling_partition: PART,
        plog_offset: 1,
        workspace: WS,
        wlog_offset: 1,
        ..Default::default()
    });
    let task = ev.cud_builder().create(qn("task"));
    task.put_record_id(SYS_FIELD_ID, RecordID(1));
    structs.events().build_raw_event(&mut ev).unwrap();

    let err = structs.events().put_plog(ev, None, &mut gen).unwrap_err();
    assert!(err.has_kind(ErrorKind::IDsExhausted));
    assert!(structs.events().get_plog(PART, 1).unwrap().is_none());

    // the CDoc register is independent
    let le = structs.events().put_plog(doc_event(&structs, 2), None, &mut gen).unwrap();
    assert!(created_ids(&le)[0].is_cdoc_crecord());
}
