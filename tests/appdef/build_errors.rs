//! `build()` collects every problem of the graph at once and leaves the
//! builder reusable.

use crate::common::*;

#[test]
fn independent_errors_are_all_reported() {
    let mut b = AppDefBuilder::new();
    b.add_cdoc(qn("doc"))
        .add_container("rec", qn("missingRec"), 0, 1)
        .add_ref_field("ref", false, &[qn("missingRef")]);
    b.add_command(qn("cmd"))
        .set_param(qn("missingParam"))
        .set_unlogged_param(qn("doc"));
    b.add_query(qn("qry")).set_result(qn("missingResult"));

    let errs = b.build().unwrap_err();
    assert_eq!(errs.count_kind(DefErrorKind::NameNotFound), 4);
    assert_eq!(errs.count_kind(DefErrorKind::InvalidTypeKind), 1);
    assert_eq!(errs.len(), 5);

    let text = errs.to_string();
    assert_eq!(text.lines().count(), 5);
    for name in ["missingRec", "missingRef", "missingParam", "missingResult"] {
        assert!(text.contains(name), "{} not reported in\n{}", name, text);
    }
}

#[test]
fn errors_are_sorted_by_message() {
    let mut b = AppDefBuilder::new();
    b.add_query(qn("zQuery")).set_result(qn("missingResult"));
    b.add_cdoc(qn("aDoc")).add_container("rec", qn("missingRec"), 0, 1);
    b.add_command(qn("mCmd")).set_param(qn("missingParam"));

    let errs = b.build().unwrap_err();
    let messages: Vec<&str> = errs.iter().map(|e| e.message()).collect();
    let mut sorted = messages.clone();
    sorted.sort_unstable();
    assert_eq!(messages, sorted);
    assert_eq!(messages.len(), 3);

    // the same graph reports the same text every time
    assert_eq!(b.build().unwrap_err().to_string(), errs.to_string());
}

#[test]
fn unlogged_param_must_be_object_odoc_or_data() {
    let mut b = AppDefBuilder::new();
    b.add_wdoc(qn("w"));
    b.add_command(qn("cmd")).set_unlogged_param(qn("w"));
    let errs = b.build().unwrap_err();
    assert!(errs.has_kind(DefErrorKind::InvalidTypeKind));
    assert!(errs.to_string().contains("unlogged parameter"));
}

#[test]
fn any_and_data_params_are_accepted() {
    let mut b = AppDefBuilder::new();
    b.add_command(qn("raw")).set_param(QName::sys("ANY"));
    b.add_command(qn("str")).set_param(QName::sys("string"));
    b.add_query(qn("qry"))
        .set_param(QName::sys("int64"))
        .set_result(QName::sys("ANY"));
    let app = b.build().unwrap();
    assert_eq!(app.command(&qn("str")).unwrap().param(), &QName::sys("string"));
    assert_eq!(app.query(&qn("qry")).unwrap().result(), &QName::sys("ANY"));
}

#[test]
fn builder_is_reusable_after_failure() {
    let mut b = AppDefBuilder::new();
    b.add_command(qn("cmd")).set_param(qn("params"));
    assert!(b.build().is_err());

    b.add_object(qn("params")).add_field("n", DataKind::Int32, true);
    let app = b.build().unwrap();
    assert_eq!(app.command(&qn("cmd")).unwrap().param(), &qn("params"));

    // every build freezes its own copy
    let again = b.build().unwrap();
    assert_eq!(app.type_count(), again.type_count());
}

#[test]
fn built_app_lookups_follow_kinds() {
    let app = app_def();
    assert!(app.cdoc(&qn("doc")).is_some());
    assert!(app.crecord(&qn("doc")).is_none());
    assert!(app.crecord(&qn("rec")).is_some());
    assert!(app.wdoc(&qn("task")).is_some());
    assert!(app.odoc(&qn("order")).is_some());
    assert!(app.orecord(&qn("item")).is_some());
    assert!(app.object(&qn("params")).is_some());
    assert!(app.command(&qn("cmd")).is_some());
    assert!(app.structure(&qn("cmd")).is_none());

    let singletons: Vec<_> = app.singletons().map(|s| s.name().clone()).collect();
    assert_eq!(singletons, vec![qn("config")]);

    let user = app.cdoc(&qn("user")).unwrap();
    let unique = user.unique(&qn("userLogin")).unwrap();
    assert_eq!(unique.fields(), ["login".to_string()]);

    assert_eq!(app.type_kind(&qn("nothing")), TypeKind::Null);
    assert!(app.sys_data(DataKind::Int32).is_some());
}

#[test]
fn system_fields_by_kind() {
    let app = app_def();
    let doc = app.cdoc(&qn("doc")).unwrap();
    assert!(doc.field(SYS_FIELD_ID).is_some());
    assert!(doc.field(SYS_FIELD_IS_ACTIVE).is_some());
    assert!(doc.field(SYS_FIELD_PARENT_ID).is_none());

    let rec = app.crecord(&qn("rec")).unwrap();
    assert!(rec.field(SYS_FIELD_PARENT_ID).is_some());
    assert!(rec.field(SYS_FIELD_CONTAINER).is_some());

    let params = app.object(&qn("params")).unwrap();
    assert!(params.field(SYS_FIELD_ID).is_none());
    assert!(params.field(SYS_FIELD_CONTAINER).is_some());
}
