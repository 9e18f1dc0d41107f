//! Container and reference checks of `build()`
//!
//! - which structure kinds may contain which
//! - containers of unknown or abstract types
//! - reference fields to non-record types

use crate::common::*;

const STRUCTURES: [TypeKind; 7] = [
    TypeKind::Object,
    TypeKind::CDoc,
    TypeKind::CRecord,
    TypeKind::ODoc,
    TypeKind::ORecord,
    TypeKind::WDoc,
    TypeKind::WRecord,
];

fn add_structure(b: &mut AppDefBuilder, name: QName, kind: TypeKind) {
    let mut s = match kind {
        TypeKind::Object => b.add_object(name),
        TypeKind::CDoc => b.add_cdoc(name),
        TypeKind::CRecord => b.add_crecord(name),
        TypeKind::ODoc => b.add_odoc(name),
        TypeKind::ORecord => b.add_orecord(name),
        TypeKind::WDoc => b.add_wdoc(name),
        TypeKind::WRecord => b.add_wrecord(name),
        other => panic!("{} is not a structure kind", other),
    };
    s.add_field("f", DataKind::Int32, false);
}

fn expected_allowed(owner: TypeKind, target: TypeKind) -> bool {
    matches!(
        (owner, target),
        (TypeKind::CDoc | TypeKind::CRecord, TypeKind::CRecord)
            | (TypeKind::ODoc | TypeKind::ORecord, TypeKind::ORecord)
            | (TypeKind::WDoc | TypeKind::WRecord, TypeKind::WRecord)
            | (TypeKind::Object, TypeKind::Object)
    )
}

// ============================================================================
// Kind compatibility
// ============================================================================

#[test]
fn container_matrix_is_enforced_at_build() {
    for owner in STRUCTURES {
        for target in STRUCTURES {
            let mut b = AppDefBuilder::new();
            add_structure(&mut b, qn("owner"), owner);
            add_structure(&mut b, qn("target"), target);
            b.alter_structure(&qn("owner"))
                .add_container("c", qn("target"), 0, 1);

            let res = b.build();
            if expected_allowed(owner, target) {
                let app = res.unwrap_or_else(|e| panic!("{} → {}: {}", owner, target, e));
                let c = app.structure(&qn("owner")).unwrap().container("c").unwrap();
                assert_eq!(c.qname(), &qn("target"));
            } else {
                let errs = res.expect_err("incompatible container accepted");
                assert!(errs.has_kind(DefErrorKind::InvalidTypeKind), "{} → {}", owner, target);
                let text = errs.to_string();
                assert!(text.contains(&format!("«{}»", owner)), "{}", text);
                assert!(text.contains(&format!("«{}»", target)), "{}", text);
            }
        }
    }
}

#[test]
fn container_of_non_structure_type_is_rejected() {
    let mut b = AppDefBuilder::new();
    b.add_data(qn("str"), DataKind::String, NULL_QNAME);
    b.add_object(qn("obj")).add_container("c", qn("str"), 0, 1);
    let errs = b.build().unwrap_err();
    assert!(errs.has_kind(DefErrorKind::InvalidTypeKind));
    assert!(errs.to_string().contains("«Data»"));
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn cdoc_with_crecord_container_builds() {
    let mut b = AppDefBuilder::new();
    b.add_cdoc(qn("doc"))
        .add_field("f1", DataKind::Int64, true)
        .add_container("rec", qn("rec"), 0, OCCURS_UNBOUNDED);
    b.add_crecord(qn("rec")).add_field("f1", DataKind::Int64, false);

    let app = b.build().unwrap();
    let doc = app.cdoc(&qn("doc")).unwrap();
    let c = doc.container("rec").unwrap();
    assert_eq!(c.min_occurs(), 0);
    assert_eq!(c.max_occurs(), OCCURS_UNBOUNDED);
    assert_eq!(app.type_kind(c.qname()), TypeKind::CRecord);
    assert_eq!(app.container_type(&qn("doc"), "rec").unwrap().kind(), TypeKind::CRecord);
    assert!(doc.field("f1").unwrap().required());
}

#[test]
fn container_of_undeclared_type_fails_build() {
    let mut b = AppDefBuilder::new();
    b.add_cdoc(qn("doc"))
        .add_field("f1", DataKind::Int64, true)
        .add_container("rec", qn("rec"), 0, OCCURS_UNBOUNDED);

    let errs = b.build().unwrap_err();
    assert!(errs.has_kind(DefErrorKind::NameNotFound));
    assert!(errs.to_string().contains("test.rec"));

    // the builder stays usable: declaring the type fixes the build
    b.add_crecord(qn("rec"));
    assert!(b.build().is_ok());
}

#[test]
fn container_of_abstract_type_is_rejected() {
    let mut b = AppDefBuilder::new();
    b.add_cdoc(qn("doc"))
        .add_container("rec", qn("rec"), 0, OCCURS_UNBOUNDED);
    b.add_crecord(qn("rec")).set_abstract();
    let errs = b.build().unwrap_err();
    assert!(errs.has_kind(DefErrorKind::AbstractType));
}

// ============================================================================
// References
// ============================================================================

#[test]
fn reference_targets_are_checked() {
    let mut b = AppDefBuilder::new();
    b.add_object(qn("obj"));
    b.add_cdoc(qn("doc"))
        .add_ref_field("missing", false, &[qn("nowhere")])
        .add_ref_field("object", false, &[qn("obj")]);

    let errs = b.build().unwrap_err();
    assert_eq!(errs.count_kind(DefErrorKind::NameNotFound), 1);
    assert_eq!(errs.count_kind(DefErrorKind::InvalidTypeKind), 1);
    assert!(errs.to_string().contains("test.nowhere"));
}

#[test]
fn reference_to_record_is_accepted() {
    let mut b = AppDefBuilder::new();
    b.add_cdoc(qn("doc"));
    b.add_wdoc(qn("task")).add_ref_field("doc", true, &[qn("doc")]);
    let app = b.build().unwrap();
    let f = app.structure(&qn("task")).unwrap().field("doc").unwrap();
    assert!(f.ref_allowed(&qn("doc")));
    assert!(!f.ref_allowed(&qn("task")));
}
