use tests::{setup::*, *};

use quarry::{Db, ModelDef, RelationDef};

#[test]
fn relation_to_unregistered_model() {
    let mut builder = Db::builder();
    builder.register(customer());

    let err = assert_err!(builder.build(MockDriver::new()));
    assert!(err.is_invalid_configuration());
    assert!(err.to_string().contains("unknown model `order`"));
}

#[test]
fn model_registered_twice() {
    let mut builder = shop();
    builder.register(item());

    let err = assert_err!(builder.build(MockDriver::new()));
    assert!(err.is_invalid_configuration());
}

#[test]
fn via_unknown_relation() {
    let mut builder = shop();
    builder.register(
        ModelDef::new("review", "review")
            .relation(RelationDef::has_many("items", "item", [("id", "item_id")]).via("lines")),
    );

    let err = assert_err!(builder.build(MockDriver::new()));
    assert!(err.is_invalid_configuration());
}

#[test]
fn relation_with_empty_link() {
    let mut builder = shop();
    builder.register(
        ModelDef::new("review", "review")
            .has_one("item", "item", Vec::<(String, String)>::new()),
    );

    let err = assert_err!(builder.build(MockDriver::new()));
    assert!(err.to_string().contains("empty link"));
}

#[test]
fn unknown_model_lookup() {
    let db = connect(&MockDriver::new());

    let err = assert_err!(db.find("invoice"));
    assert!(err.is_invalid_configuration());
    assert!(db.find("customer").is_ok());
}

#[tokio::test]
async fn postgresql_flavor() {
    let driver = MockDriver::new();
    let db = shop().postgresql().build(driver.clone()).unwrap();

    let (sql, _) = db
        .find("customer")
        .unwrap()
        .join_with(["orders"])
        .offset(5)
        .build()
        .await
        .unwrap();

    assert_eq!(
        sql,
        r#"SELECT "customer".* FROM "customer" LEFT JOIN "order" ON "customer"."id" = "order"."customer_id" OFFSET 5"#
    );
}
