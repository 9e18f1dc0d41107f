//! Deployed applications and partition borrowing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use crate::common::*;

fn deployed(parts_count: usize, parts: &[PartitionID]) -> (TestApp, AppPartitions) {
    let app = TestApp::new();
    let partitions = AppPartitions::new(Arc::clone(&app.provider));
    partitions.deploy_app(app_name(), app_def(), parts_count);
    partitions.deploy_app_partitions(&app_name(), parts).unwrap();
    (app, partitions)
}

#[test]
fn borrowed_partition_exposes_app_and_structs() {
    let (app, partitions) = deployed(4, &[0, 1]);
    assert_eq!(partitions.app_parts_count(&app_name()).unwrap(), 4);
    assert!(partitions.app_def(&app_name()).unwrap().cdoc(&qn("doc")).is_some());

    let part = partitions
        .borrow(&app_name(), 1, ProcessorKind::Command)
        .unwrap();
    assert_eq!(part.app(), &app_name());
    assert_eq!(part.partition(), 1);
    assert_eq!(part.kind(), ProcessorKind::Command);
    assert!(part.app_def().singletons().next().is_some());
    assert!(Arc::ptr_eq(part.app_structs(), &app.structs));
}

#[test]
fn one_borrow_per_processor_kind() {
    let (_app, partitions) = deployed(2, &[0]);
    let name = app_name();

    let cmd = partitions.borrow(&name, 0, ProcessorKind::Command).unwrap();
    let err = partitions
        .borrow(&name, 0, ProcessorKind::Command)
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::PartitionBusy));

    // other kinds use the same partition independently
    let query = partitions.borrow(&name, 0, ProcessorKind::Query).unwrap();
    let actualizer = partitions
        .borrow(&name, 0, ProcessorKind::Actualizer)
        .unwrap();

    cmd.release();
    let again = partitions.borrow(&name, 0, ProcessorKind::Command).unwrap();
    drop(again);
    drop(query);
    drop(actualizer);
    partitions.borrow(&name, 0, ProcessorKind::Query).unwrap();
}

#[test]
fn concurrent_borrowers_get_exclusive_access() {
    const THREADS: usize = 8;
    let (_app, partitions) = deployed(1, &[0]);
    let partitions = Arc::new(partitions);
    let start = Arc::new(Barrier::new(THREADS));
    let done = Arc::new(Barrier::new(THREADS));
    let won = Arc::new(AtomicUsize::new(0));
    let busy = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let partitions = Arc::clone(&partitions);
            let start = Arc::clone(&start);
            let done = Arc::clone(&done);
            let won = Arc::clone(&won);
            let busy = Arc::clone(&busy);
            thread::spawn(move || {
                start.wait();
                let res = partitions.borrow(&app_name(), 0, ProcessorKind::Command);
                match &res {
                    Ok(_) => won.fetch_add(1, Ordering::SeqCst),
                    Err(e) => {
                        assert!(e.has_kind(ErrorKind::PartitionBusy));
                        busy.fetch_add(1, Ordering::SeqCst)
                    }
                };
                // hold the borrow until every thread has tried
                done.wait();
                drop(res);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(won.load(Ordering::SeqCst), 1);
    assert_eq!(busy.load(Ordering::SeqCst), THREADS - 1);
    partitions
        .borrow(&app_name(), 0, ProcessorKind::Command)
        .unwrap();
}

#[test]
fn undeployed_apps_and_partitions_are_rejected() {
    let (_app, partitions) = deployed(2, &[0]);
    let name = app_name();

    let err = partitions.borrow(&name, 1, ProcessorKind::Query).unwrap_err();
    assert!(err.has_kind(ErrorKind::PartitionNotFound));

    let err = partitions.deploy_app_partitions(&name, &[1, 2]).unwrap_err();
    assert!(err.has_kind(ErrorKind::PartitionNotFound));
    // nothing from the failed call was deployed
    assert!(partitions.borrow(&name, 1, ProcessorKind::Query).is_err());

    let other = AppQName::new("test", "other");
    assert!(partitions.app_def(&other).unwrap_err().has_kind(ErrorKind::AppNotFound));
    assert!(partitions.app_parts_count(&other).unwrap_err().has_kind(ErrorKind::AppNotFound));
    assert!(partitions
        .deploy_app_partitions(&other, &[0])
        .unwrap_err()
        .has_kind(ErrorKind::AppNotFound));
    assert!(partitions
        .borrow(&other, 0, ProcessorKind::Command)
        .unwrap_err()
        .has_kind(ErrorKind::AppNotFound));
}

#[test]
fn redeploy_keeps_partitions_and_swaps_definition() {
    let (_app, partitions) = deployed(2, &[0, 1]);
    let name = app_name();

    let mut b = app_builder();
    b.add_cdoc(qn("extra"));
    partitions.deploy_app(name.clone(), Arc::new(b.build().unwrap()), 3);

    assert_eq!(partitions.app_parts_count(&name).unwrap(), 3);
    assert!(partitions.app_def(&name).unwrap().cdoc(&qn("extra")).is_some());
    let part = partitions.borrow(&name, 1, ProcessorKind::Command).unwrap();
    assert!(part.app_def().cdoc(&qn("extra")).is_some());
    partitions.deploy_app_partitions(&name, &[2]).unwrap();
}
