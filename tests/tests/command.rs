use tests::{setup::*, *};

use pretty_assertions::assert_eq;

#[tokio::test]
async fn templates_are_expanded_on_creation() {
    let driver = MockDriver::new();
    let db = shop().table_prefix("tbl_").build(driver.clone()).unwrap();

    let command = db.create_command("SELECT [[name]] FROM {{%customer}}");
    assert_eq!(command.sql(), "SELECT `name` FROM `tbl_customer`");
}

#[tokio::test]
async fn raw_sql_inlines_bound_values() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let command = db
        .create_command("SELECT * FROM {{customer}} WHERE id = :qp1 OR id = :qp10 OR name = :name")
        .bind_values([("qp1", Value::from(1)), (":qp10", Value::from(10))])
        .bind_value("name", "o'hara");

    assert_eq!(
        command.raw_sql(),
        "SELECT * FROM `customer` WHERE id = 1 OR id = 10 OR name = 'o\\'hara'"
    );
    assert!(command.params().contains_key(":qp1"));
}

#[tokio::test]
async fn empty_statement_is_rejected() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let err = assert_err!(db.create_command("   ").execute().await);
    assert!(err.is_invalid_condition());
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn driver_failures_carry_the_sql() {
    let driver = MockDriver::new();
    driver.fail("FROM `broken`", "table is gone");
    let db = connect(&driver);

    let err = assert_err!(db.create_command("SELECT * FROM {{broken}}").query_all().await);
    assert!(err.is_sql_execution());
    assert_eq!(err.sql(), Some("SELECT * FROM `broken`"));
}

#[tokio::test]
async fn scalar_and_column_reads() {
    let driver = MockDriver::new();
    driver.on(
        "FROM `customer`",
        [row! { "name" => "alice" }, row! { "name" => "bob" }],
    );
    let db = connect(&driver);

    let command = db.create_command("SELECT [[name]] FROM {{customer}}");
    assert_eq!(command.query_scalar().await.unwrap(), Some(Value::from("alice")));
    assert_eq!(
        command.query_column().await.unwrap(),
        [Value::from("alice"), Value::from("bob")]
    );

    let empty = db.create_command("SELECT [[name]] FROM {{order}}");
    assert_none!(empty.query_scalar().await.unwrap());
}

#[tokio::test]
async fn writes_report_affected_rows() {
    let driver = MockDriver::new();
    driver
        .on_execute("INSERT INTO `order`", 1, Some(Value::from(42)))
        .on_execute("DELETE FROM `order`", 3, None);
    let db = connect(&driver);

    let id = db
        .insert("order", [("customer_id", 1)])
        .await
        .unwrap();
    assert_eq!(id, Some(Value::from(42)));

    let deleted = db
        .delete("order", Some(quarry::stmt::Condition::eq("customer_id", 1)))
        .await
        .unwrap();
    assert_eq!(deleted, 3);

    // An empty batch never reaches the driver
    let inserted = db
        .batch_insert("order", ["customer_id"], Vec::<Vec<Value>>::new())
        .await
        .unwrap();
    assert_eq!(inserted, 0);
    assert_eq!(driver.log().len(), 2);
}
