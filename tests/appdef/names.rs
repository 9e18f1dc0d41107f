//! Identifier rules as seen through the builder: invalid type, field and
//! container names panic, valid ones are accepted.

use std::panic::{self, AssertUnwindSafe};

use proptest::prelude::*;

use appstruct_core::{is_valid_ident, limits::MAX_IDENT_LEN};

use crate::common::*;

fn grammar_valid(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.len() <= MAX_IDENT_LEN
        && (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn builder_accepts(f: impl FnOnce(&mut AppDefBuilder)) -> bool {
    panic::catch_unwind(AssertUnwindSafe(move || {
        let mut b = AppDefBuilder::new();
        f(&mut b);
    }))
    .is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn type_entity_accepted_iff_valid_ident(s in "[a-zA-Z0-9_$.\\- ]{0,12}|[a-z][a-z0-9]{250,260}") {
        let expected = grammar_valid(&s);
        prop_assert_eq!(is_valid_ident(&s), expected);
        let entity = s.clone();
        prop_assert_eq!(builder_accepts(move |b| { b.add_cdoc(QName::new("test", entity)); }), expected);
    }

    #[test]
    fn field_name_accepted_iff_valid_ident(s in "[a-zA-Z0-9_$#]{0,10}") {
        let name = s.clone();
        let accepted = builder_accepts(move |b| {
            b.add_object(qn("obj")).add_field(&name, DataKind::Int32, false);
        });
        prop_assert_eq!(accepted, grammar_valid(&s));
    }
}

#[test]
fn ident_length_boundary() {
    let at_limit = "a".repeat(MAX_IDENT_LEN);
    let over = "a".repeat(MAX_IDENT_LEN + 1);
    assert!(builder_accepts(|b| {
        b.add_cdoc(QName::new("test", at_limit));
    }));
    assert!(!builder_accepts(|b| {
        b.add_cdoc(QName::new("test", over));
    }));
}

#[test]
fn invalid_package_panics() {
    assert_panics_with(
        || {
            AppDefBuilder::new().add_cdoc(QName::new("1pkg", "doc"));
        },
        "invalid name",
    );
}

#[test]
fn empty_container_name_panics() {
    assert_panics_with(
        || {
            let mut b = AppDefBuilder::new();
            b.add_cdoc(qn("doc")).add_container("", qn("rec"), 0, 1);
        },
        "name is missed",
    );
}

#[test]
fn duplicate_type_name_panics() {
    assert_panics_with(
        || {
            let mut b = AppDefBuilder::new();
            b.add_cdoc(qn("doc"));
            b.add_wdoc(qn("doc"));
        },
        "name already exists",
    );
}
