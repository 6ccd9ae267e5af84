/// Derive macro tests
///
/// Statement text produced for `#[derive(Entity)]` types.
/// Run with: cargo test --test derive_entity_tests
use shapesql::{
    DbError, Entity, EntityDescriptor, FieldDescriptor, MetadataCache, MetadataKind, build_insert,
    build_select,
};

#[derive(Debug, Clone, PartialEq, Entity)]
#[entity(rename_all = "PascalCase")]
struct Widget {
    widget_id: i64,
    #[sql(column = "widget_name")]
    name: String,
}

#[allow(non_snake_case)]
#[derive(Debug, Entity)]
struct Invoice {
    InvoiceID: i64,
    Total: f64,
    Paid: bool,
}

#[derive(Debug, Entity)]
struct Gadget {
    id: i64,
    label: String,
}

#[derive(Debug, Entity)]
struct Empty {}

#[derive(Debug, Entity)]
struct Marker;

#[allow(dead_code)]
#[derive(Debug, Default, Entity)]
#[entity(table = "audit_log", key = "EntryId", rename_all = "PascalCase")]
struct AuditEntry {
    entry_id: i64,
    #[sql(rename = "Who")]
    actor: String,
    #[sql(column = "  ")]
    action: String,
    #[sql(skip)]
    cached_summary: Option<String>,
}

#[allow(non_snake_case)]
#[derive(Debug, Entity)]
struct Note {
    NoteId: i64,
    r#type: String,
}

#[test]
fn widget_select_matches_documented_shape() {
    assert_eq!(
        build_select::<Widget>().unwrap(),
        r#"select "WidgetId", widget_name as "Name" from "Widget" where "WidgetId" = @Id"#
    );
}

#[test]
fn widget_insert_matches_documented_shape() {
    assert_eq!(
        build_insert::<Widget>().unwrap(),
        r#"insert into "Widget" ("WidgetId", widget_name) values (@WidgetId, @Name)"#
    );
}

#[test]
fn widget_binds_every_property_by_name() {
    let params = Widget {
        widget_id: 7,
        name: "a".into(),
    }
    .to_params();

    assert_eq!(params.names().collect::<Vec<_>>(), vec!["WidgetId", "Name"]);
    assert_eq!(params.get("WidgetId"), Some(&shapesql::Value::Integer(7)));
    assert_eq!(params.get("Name"), Some(&shapesql::Value::Text("a".into())));
}

#[test]
fn key_match_is_case_insensitive_and_case_preserving() {
    let sql = build_select::<Invoice>().unwrap();
    assert_eq!(
        sql,
        r#"select "InvoiceID", "Total", "Paid" from "Invoice" where "InvoiceID" = @Id"#
    );
}

#[test]
fn missing_key_fails_every_time() {
    let cache = MetadataCache::new();
    for _ in 0..3 {
        let err = cache.build_select::<Gadget>().unwrap_err();
        assert!(matches!(err, DbError::Configuration(ref msg) if msg.contains("GadgetId")));
    }
    assert_eq!(cache.len(MetadataKind::KeyName).unwrap(), 0);

    // insert does not need a key
    assert_eq!(
        cache.build_insert::<Gadget>().unwrap(),
        r#"insert into "Gadget" ("id", "label") values (@id, @label)"#
    );
}

#[test]
fn empty_types_never_produce_sql() {
    for _ in 0..2 {
        assert!(build_select::<Empty>().unwrap_err().is_configuration());
        assert!(build_insert::<Empty>().unwrap_err().is_configuration());
        assert!(build_select::<Marker>().unwrap_err().is_configuration());
        assert!(build_insert::<Marker>().unwrap_err().is_configuration());
    }
}

#[test]
fn builders_are_idempotent() {
    let first = (build_select::<Widget>().unwrap(), build_insert::<Widget>().unwrap());
    for _ in 0..10 {
        assert_eq!(build_select::<Widget>().unwrap(), first.0);
        assert_eq!(build_insert::<Widget>().unwrap(), first.1);
    }
}

#[test]
fn container_and_field_options() {
    let descriptor = AuditEntry::descriptor();
    let names: Vec<_> = descriptor.fields().iter().map(FieldDescriptor::name).collect();
    assert_eq!(names, vec!["EntryId", "Who", "Action"]);
    assert_eq!(descriptor.table_override(), Some("audit_log"));

    assert_eq!(
        build_select::<AuditEntry>().unwrap(),
        r#"select "EntryId", "Who", "Action" from "audit_log" where "EntryId" = @Id"#
    );
    assert_eq!(
        build_insert::<AuditEntry>().unwrap(),
        r#"insert into "audit_log" ("EntryId", "Who", "Action") values (@EntryId, @Who, @Action)"#
    );
    assert!(AuditEntry::default().to_params().get("CachedSummary").is_none());
}

#[test]
fn raw_identifiers_are_unprefixed() {
    assert_eq!(
        build_select::<Note>().unwrap(),
        r#"select "NoteId", "type" from "Note" where "NoteId" = @Id"#
    );
}

#[test]
fn derived_descriptor_equals_builder_descriptor() {
    let expected = EntityDescriptor::builder("Widget")
        .field("WidgetId")
        .column("Name", "widget_name")
        .build();
    assert_eq!(Widget::descriptor(), &expected);
}
