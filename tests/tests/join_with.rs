use tests::{setup::*, *};

use pretty_assertions::assert_eq;
use quarry::stmt::Condition;

#[tokio::test]
async fn join_with_builds_left_join() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let query = db.find("customer").unwrap().join_with(["orders"]);
    let (sql, params) = query.build().await.unwrap();

    assert_eq!(
        sql,
        "SELECT `customer`.* FROM `customer` LEFT JOIN `order` ON `customer`.`id` = `order`.`customer_id`"
    );
    assert!(params.is_empty());

    // Nothing was executed
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn building_twice_is_idempotent() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let query = db
        .find("customer")
        .unwrap()
        .inner_join_with(["orders", "orders.items"])
        .where_(Condition::gt("customer.id", 1));

    let first = query.build().await.unwrap();
    let second = query.build().await.unwrap();
    assert_eq!(first, second);

    assert_eq!(
        first.0,
        "SELECT `customer`.* FROM `customer` \
         INNER JOIN `order` ON `customer`.`id` = `order`.`customer_id` \
         INNER JOIN `order_item` ON `order`.`id` = `order_item`.`order_id` \
         INNER JOIN `item` ON `order_item`.`item_id` = `item`.`id` \
         WHERE `customer`.`id` > :qp0"
    );

    // The configured query still has no joins
    assert!(query.query().joins.is_empty());
}

#[tokio::test]
async fn repeated_paths_join_once() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let (sql, _) = db
        .find("customer")
        .unwrap()
        .join_with(["orders"])
        .join_with(["orders"])
        .build()
        .await
        .unwrap();

    assert_eq!(sql.matches("JOIN `order`").count(), 1);
}

#[tokio::test]
async fn joined_relation_conditions_are_merged() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let (sql, params) = db
        .find("customer")
        .unwrap()
        .join_with_fn("orders", |query| query.and_where(Condition::gt("order.id", 10)))
        .build()
        .await
        .unwrap();

    assert_eq!(
        sql,
        "SELECT `customer`.* FROM `customer` LEFT JOIN `order` ON `customer`.`id` = `order`.`customer_id` \
         WHERE `order`.`id` > :qp0"
    );
    assert_eq!(params[":qp0"], Value::from(10));
}

#[tokio::test]
async fn explicit_joins_come_last() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let (sql, _) = db
        .find("customer")
        .unwrap()
        .left_join("profile", "profile.customer_id = customer.id")
        .join_with(["orders"])
        .build()
        .await
        .unwrap();

    let orders = sql.find("JOIN `order`").unwrap();
    let profile = sql.find("JOIN `profile`").unwrap();
    assert!(orders < profile);
}

#[tokio::test]
async fn join_rows_are_collapsed_and_relations_loaded() {
    let driver = MockDriver::new();
    driver
        .on(
            "LEFT JOIN",
            [
                row! { "id" => 1, "name" => "alice" },
                row! { "id" => 1, "name" => "alice" },
                row! { "id" => 2, "name" => "bob" },
            ],
        )
        .on("FROM `order`", orders());
    let db = connect(&driver);

    let customers = db.find("customer").unwrap().join_with(["orders"]).all().await.unwrap();

    assert_eq!(ids!(customers), [1, 2]);
    assert_eq!(ids!(customers[0].related_many("orders")), [10, 11]);

    // The eager query does not carry the join
    assert_eq!(
        driver.log().sql()[1],
        "SELECT * FROM `order` WHERE `customer_id` IN (:qp0, :qp1)"
    );
}

#[tokio::test]
async fn join_without_eager_loading() {
    let driver = MockDriver::new();
    driver.on("LEFT JOIN", customers());
    let db = connect(&driver);

    let customers = db
        .find("customer")
        .unwrap()
        .join_with_options(["orders"], false, "LEFT JOIN")
        .all()
        .await
        .unwrap();

    assert_eq!(customers.len(), 3);
    assert!(!customers[0].is_relation_populated("orders"));
    assert_eq!(driver.log().len(), 1);
}
