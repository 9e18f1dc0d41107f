//! Data type constraints: which constraint kinds each data kind accepts,
//! enum value kinds and inherited constraints.

use std::panic::{self, AssertUnwindSafe};

use crate::common::*;

/// A constraint of the kind with an enum of the data kind where one exists
fn sample(kind: ConstraintKind, data: DataKind) -> Constraint {
    match kind {
        ConstraintKind::MinLen => Constraint::min_len(1),
        ConstraintKind::MaxLen => Constraint::max_len(10),
        ConstraintKind::Pattern => Constraint::pattern("^[a-z]+$"),
        ConstraintKind::MinIncl => Constraint::min_incl(0.0),
        ConstraintKind::MinExcl => Constraint::min_excl(0.0),
        ConstraintKind::MaxIncl => Constraint::max_incl(100.0),
        ConstraintKind::MaxExcl => Constraint::max_excl(100.0),
        ConstraintKind::Enum => match data {
            DataKind::Int32 => Constraint::enumeration(vec![1i32, 2]),
            DataKind::Int64 => Constraint::enumeration(vec![1i64, 2]),
            DataKind::Float32 => Constraint::enumeration(vec![1f32, 2.5]),
            DataKind::Float64 => Constraint::enumeration(vec![1f64, 2.5]),
            _ => Constraint::enumeration(vec!["a", "b"]),
        },
    }
}

fn add_constraint_panics(data: DataKind, c: Constraint) -> bool {
    panic::catch_unwind(AssertUnwindSafe(move || {
        let mut b = AppDefBuilder::new();
        b.add_data(qn("d"), data, NULL_QNAME).add_constraints([c]);
    }))
    .is_err()
}

#[test]
fn constraint_support_table() {
    for data in DataKind::SCALARS {
        for kind in ConstraintKind::ALL {
            let panicked = add_constraint_panics(data, sample(kind, data));
            assert_eq!(
                panicked,
                !data.is_supported_constraint(kind),
                "{} with {} constraint",
                data,
                kind
            );
        }
    }
}

#[test]
fn numeric_kinds_reject_length_and_pattern() {
    for data in [DataKind::Int32, DataKind::Int64, DataKind::Float32, DataKind::Float64] {
        for kind in [ConstraintKind::MinLen, ConstraintKind::MaxLen, ConstraintKind::Pattern] {
            assert!(add_constraint_panics(data, sample(kind, data)), "{} {}", data, kind);
        }
    }
}

#[test]
fn bool_qname_and_record_id_accept_nothing() {
    for data in [DataKind::Bool, DataKind::QName, DataKind::RecordID] {
        for kind in ConstraintKind::ALL {
            assert!(add_constraint_panics(data, sample(kind, data)), "{} {}", data, kind);
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

const WEEK: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[test]
fn week_day_enum_of_int32_panics() {
    assert_panics_with(
        || {
            let mut b = AppDefBuilder::new();
            b.add_data(qn("weekDay"), DataKind::String, QName::sys("string"))
                .add_constraints([Constraint::enumeration(vec![1i32, 2, 3, 4, 5, 6, 7])]);
        },
        "incompatible constraints",
    );
}

#[test]
fn week_day_enum_of_strings_builds() {
    let mut b = AppDefBuilder::new();
    b.add_data(qn("weekDay"), DataKind::String, QName::sys("string"))
        .add_constraints([Constraint::enumeration(WEEK.to_vec())]);
    b.add_cdoc(qn("lesson")).add_data_field("day", qn("weekDay"), true);

    let app = b.build().unwrap();
    let day = app.data(&qn("weekDay")).unwrap();
    assert_eq!(day.ancestor(), &QName::sys("string"));
    let constraints = day.constraints(false);
    let values = match constraints[&ConstraintKind::Enum].value() {
        appstruct::appdef::ConstraintValue::Enum(v) => v.clone(),
        other => panic!("unexpected constraint value {:?}", other),
    };
    assert_eq!(values.len(), 7);
    assert!(values.contains_str("Wed"));
    assert!(!values.contains_str("Someday"));

    let field = app.cdoc(&qn("lesson")).unwrap().field("day").unwrap();
    assert_eq!(field.data_kind(), DataKind::String);
    assert!(field.constraint(ConstraintKind::Enum).is_some());
}

#[test]
fn enum_values_are_deduplicated() {
    let mut b = AppDefBuilder::new();
    b.add_data(qn("small"), DataKind::Int64, NULL_QNAME)
        .add_constraints([Constraint::enumeration(vec![3i64, 1, 3, 2, 1])]);
    let app = b.build().unwrap();
    let c = &app.data(&qn("small")).unwrap().constraints(false)[&ConstraintKind::Enum];
    match c.value() {
        appstruct::appdef::ConstraintValue::Enum(v) => {
            assert_eq!(v.len(), 3);
            assert!(v.contains_int64(2));
        }
        other => panic!("unexpected constraint value {:?}", other),
    }
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn data_type_inherits_ancestor_constraints() {
    let mut b = AppDefBuilder::new();
    b.add_data(qn("word"), DataKind::String, NULL_QNAME)
        .add_constraints([Constraint::pattern("^[a-z]+$")]);
    b.add_data(qn("shortWord"), DataKind::String, qn("word"))
        .add_constraints([Constraint::max_len(4)]);
    let app = b.build().unwrap();

    let short = app.data(&qn("shortWord")).unwrap();
    assert_eq!(short.constraints(false).len(), 1);
    let all = short.constraints(true);
    assert!(all.contains_key(&ConstraintKind::Pattern));
    assert!(all.contains_key(&ConstraintKind::MaxLen));
}

#[test]
fn data_ancestor_of_other_kind_panics() {
    assert_panics_with(
        || {
            let mut b = AppDefBuilder::new();
            b.add_data(qn("word"), DataKind::String, NULL_QNAME);
            b.add_data(qn("number"), DataKind::Int32, qn("word"));
        },
        "invalid type kind",
    );
}
