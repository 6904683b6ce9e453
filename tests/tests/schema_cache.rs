use tests::{setup::*, *};

use pretty_assertions::assert_eq;
use quarry::schema::{AbstractType, ColumnSchema, TableSchema};

fn customer_table(name: &str) -> TableSchema {
    let mut table = TableSchema::new(name);
    table.push_column(ColumnSchema::new("id", AbstractType::Integer));
    table.push_column(ColumnSchema::new("name", AbstractType::String));
    table.set_primary_key(["id"]).unwrap();
    table
}

#[tokio::test]
async fn table_schema_is_cached() {
    let introspector = StubIntrospector::new();
    introspector.table(customer_table("customer"));
    let db = shop().introspector(introspector.clone()).build(MockDriver::new()).unwrap();

    let first = db.schema().table_schema("customer", false).await.unwrap().unwrap();
    let second = db.schema().table_schema("customer", false).await.unwrap().unwrap();
    assert_eq!(first.primary_key, ["id"]);
    assert_eq!(first, second);
    assert_eq!(introspector.lookups(), 1);

    db.schema().table_schema("customer", true).await.unwrap();
    assert_eq!(introspector.lookups(), 2);

    db.schema().refresh_table_schema("customer");
    db.schema().table_schema("customer", false).await.unwrap();
    assert_eq!(introspector.lookups(), 3);

    db.schema().refresh();
    db.schema().table_schema("customer", false).await.unwrap();
    assert_eq!(introspector.lookups(), 4);
}

#[tokio::test]
async fn disabled_cache_always_reads() {
    let introspector = StubIntrospector::new();
    introspector.table(customer_table("customer"));
    let db = shop()
        .introspector(introspector.clone())
        .schema_cache(false)
        .build(MockDriver::new())
        .unwrap();

    db.schema().table_schema("customer", false).await.unwrap();
    db.schema().table_schema("customer", false).await.unwrap();
    assert_eq!(introspector.lookups(), 2);
}

#[tokio::test]
async fn missing_tables_are_not_cached() {
    let introspector = StubIntrospector::new();
    let db = shop().introspector(introspector.clone()).build(MockDriver::new()).unwrap();

    assert_none!(db.schema().table_schema("nothing", false).await.unwrap());
    assert_none!(db.schema().table_schema("nothing", false).await.unwrap());
    assert_eq!(introspector.lookups(), 2);

    let err = assert_err!(db.schema().primary_key_of("nothing").await);
    assert!(err.is_invalid_configuration());
}

#[tokio::test]
async fn failed_introspection_reads_as_missing() {
    let introspector = StubIntrospector::new();
    introspector.failing("customer");
    let db = shop().introspector(introspector.clone()).build(MockDriver::new()).unwrap();

    assert_none!(db.schema().table_schema("customer", false).await.unwrap());
}

#[tokio::test]
async fn prefixed_names_resolve_to_raw_names() {
    let introspector = StubIntrospector::new();
    introspector.table(customer_table("tbl_customer"));
    let db = shop()
        .table_prefix("tbl_")
        .introspector(introspector.clone())
        .build(MockDriver::new())
        .unwrap();

    let table = db.schema().table_schema("{{%customer}}", false).await.unwrap().unwrap();
    assert_eq!(table.name, "tbl_customer");

    // Same cache entry under either spelling
    db.schema().table_schema("tbl_customer", false).await.unwrap();
    assert_eq!(introspector.lookups(), 1);
    assert_eq!(db.schema().raw_table_name("{{%customer}}"), "tbl_customer");
}

#[tokio::test]
async fn no_introspector_is_a_configuration_error() {
    let db = connect(&MockDriver::new());

    let err = assert_err!(db.schema().table_schema("customer", false).await);
    assert!(err.is_invalid_configuration());
}

#[tokio::test]
async fn join_dedup_falls_back_to_schema_primary_key() {
    let introspector = StubIntrospector::new();
    introspector.table(customer_table("client"));

    let driver = MockDriver::new();
    driver.on(
        "LEFT JOIN",
        [
            row! { "id" => 1, "name" => "alice" },
            row! { "id" => 1, "name" => "alice" },
        ],
    );

    let mut builder = shop();
    builder
        .register(
            quarry::ModelDef::new("client", "client")
                .has_many("orders", "order", [("customer_id", "id")]),
        )
        .introspector(introspector.clone());
    let db = builder.build(driver.clone()).unwrap();

    let clients = db
        .find("client")
        .unwrap()
        .join_with_options(["orders"], false, "LEFT JOIN")
        .all()
        .await
        .unwrap();

    assert_eq!(clients.len(), 1);
    assert_eq!(introspector.lookups(), 1);
}

#[tokio::test]
async fn reset_sequence_requires_a_sequence() {
    let introspector = StubIntrospector::new();
    introspector.table(customer_table("customer"));
    let db = shop().introspector(introspector).build(MockDriver::new()).unwrap();

    let err = assert_err!(db.reset_sequence("customer", None).await);
    assert!(err.is_invalid_configuration());
}
