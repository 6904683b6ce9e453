use tests::{setup::*, *};

use pretty_assertions::assert_eq;
use quarry::{Record, Related};

#[tokio::test]
async fn has_many_is_loaded_with_one_query() {
    let driver = MockDriver::new();
    driver.on("FROM `customer`", customers()).on("FROM `order`", orders());
    let db = connect(&driver);

    let customers = db.find("customer").unwrap().with(["orders"]).all().await.unwrap();
    assert_eq!(ids!(customers), [1, 2, 3]);

    let log = driver.log();
    assert_eq!(
        log.sql(),
        [
            "SELECT * FROM `customer`",
            "SELECT * FROM `order` WHERE `customer_id` IN (:qp0, :qp1, :qp2)",
        ]
    );

    assert_eq!(ids!(customers[0].related_many("orders")), [10, 11]);
    assert_eq!(ids!(customers[1].related_many("orders")), [12]);

    // Populated, but empty
    assert!(customers[2].is_relation_populated("orders"));
    assert!(customers[2].related_many("orders").is_empty());
}

#[tokio::test]
async fn eager_load_fills_the_inverse_relation() {
    let driver = MockDriver::new();
    driver.on("FROM `customer`", customers()).on("FROM `order`", orders());
    let db = connect(&driver);

    let customers = db.find("customer").unwrap().with(["orders"]).all().await.unwrap();

    for customer in &customers {
        for order in customer.related_many("orders") {
            let owner = order.related_one("customer").unwrap();
            assert!(Record::same(&owner, customer));
        }
    }

    // Reading the inverse never queries
    assert_eq!(driver.log().len(), 2);
}

#[tokio::test]
async fn has_one_is_loaded_for_every_record() {
    let driver = MockDriver::new();
    driver
        .on("FROM `order`", orders())
        .on("FROM `customer`", customers().into_iter().take(2));
    let db = connect(&driver);

    let orders = db.find("order").unwrap().with(["customer"]).all().await.unwrap();

    let log = driver.log();
    log.pop();
    assert_eq!(
        log.pop().sql,
        "SELECT * FROM `customer` WHERE `id` IN (:qp0, :qp1)"
    );

    let owners = orders
        .iter()
        .map(|order| order.related_one("customer").unwrap().get("id").unwrap())
        .collect::<Vec<_>>();
    assert_eq!(owners, [Value::from(1), Value::from(1), Value::from(2)]);

    // Both orders of customer 1 share the same instance
    assert!(Record::same(
        &orders[0].related_one("customer").unwrap(),
        &orders[1].related_one("customer").unwrap(),
    ));
}

#[tokio::test]
async fn has_one_keeps_the_first_of_several_matches() {
    let driver = MockDriver::new();
    driver
        .on("FROM `customer`", customers().into_iter().take(2))
        .on("FROM `order`", orders());
    let db = connect(&driver);

    let customers = db.find("customer").unwrap().with(["first_order"]).all().await.unwrap();
    assert_eq!(ids!(customers), [1, 2]);

    assert_eq!(
        driver.log().sql(),
        [
            "SELECT * FROM `customer`",
            "SELECT * FROM `order` WHERE `customer_id` IN (:qp0, :qp1)",
        ]
    );

    let first = customers
        .iter()
        .map(|customer| customer.related_one("first_order").unwrap().get("id").unwrap())
        .collect::<Vec<_>>();
    assert_eq!(first, [Value::from(10), Value::from(12)]);
    assert!(matches!(customers[0].related("first_order"), Some(Related::One(Some(_)))));
}

#[tokio::test]
async fn has_many_keyed_by_index_column() {
    let driver = MockDriver::new();
    driver.on("FROM `customer`", customers()).on("FROM `order`", orders());
    let db = connect(&driver);

    let customers = db
        .find("customer")
        .unwrap()
        .with(["orders_by_id"])
        .all()
        .await
        .unwrap();

    let Some(Related::Indexed(orders)) = customers[0].related("orders_by_id") else {
        panic!("expected indexed orders");
    };
    assert_eq!(orders.keys().collect::<Vec<_>>(), ["10", "11"]);
}

#[tokio::test]
async fn via_junction_table() {
    let driver = MockDriver::new();
    driver
        .on("FROM `order_item`", order_items())
        .on("FROM `order`", orders().into_iter().take(2))
        .on("FROM `item`", items());
    let db = connect(&driver);

    let orders = db.find("order").unwrap().with(["items"]).all().await.unwrap();

    assert_eq!(
        driver.log().sql(),
        [
            "SELECT * FROM `order`",
            "SELECT * FROM `order_item` WHERE `order_id` IN (:qp0, :qp1)",
            "SELECT * FROM `item` WHERE `id` IN (:qp0, :qp1)",
        ]
    );

    assert_eq!(ids!(orders[0].related_many("items")), [100, 101]);
    assert_eq!(ids!(orders[1].related_many("items")), [101]);

    // One instance per related row, shared between owners
    assert!(Record::same(
        &orders[0].related_many("items")[1],
        &orders[1].related_many("items")[0],
    ));
}

#[tokio::test]
async fn via_another_relation() {
    let driver = MockDriver::new();
    driver
        .on("FROM `order_item`", order_items())
        .on("FROM `order`", orders().into_iter().take(2))
        .on("FROM `item`", items());
    let db = connect(&driver);

    let orders = db.find("order").unwrap().with(["products"]).all().await.unwrap();

    assert_eq!(driver.log().len(), 3);
    assert_eq!(ids!(orders[0].related_many("products")), [100, 101]);
    assert_eq!(ids!(orders[1].related_many("products")), [101]);

    // The intermediate relation is populated along the way
    assert_eq!(orders[0].related_many("order_items").len(), 2);
}

#[tokio::test]
async fn nested_paths_load_level_by_level() {
    let driver = MockDriver::new();
    driver
        .on("FROM `customer`", customers())
        .on("FROM `order_item`", order_items())
        .on("FROM `order`", orders())
        .on("FROM `item`", items());
    let db = connect(&driver);

    let customers = db
        .find("customer")
        .unwrap()
        .with(["orders", "orders.items"])
        .all()
        .await
        .unwrap();

    // customer, order, order_item, item
    assert_eq!(driver.log().len(), 4);

    let orders = customers[0].related_many("orders");
    assert_eq!(ids!(orders[0].related_many("items")), [100, 101]);
    assert_eq!(ids!(orders[1].related_many("items")), [101]);
}

#[tokio::test]
async fn customised_eager_query() {
    let driver = MockDriver::new();
    driver.on("FROM `customer`", customers()).on("FROM `order`", orders());
    let db = connect(&driver);

    db.find("customer")
        .unwrap()
        .with_fn("orders", |query| query.order_by_str("id DESC"))
        .all()
        .await
        .unwrap();

    let log = driver.log();
    log.pop();
    assert_eq!(
        log.pop().sql,
        "SELECT * FROM `order` WHERE `customer_id` IN (:qp0, :qp1, :qp2) ORDER BY `id` DESC"
    );
}

#[tokio::test]
async fn rows_embed_loaded_relations() {
    let driver = MockDriver::new();
    driver.on("FROM `customer`", customers()).on("FROM `order`", orders());
    let db = connect(&driver);

    let rows = db
        .find("customer")
        .unwrap()
        .with(["orders"])
        .all_rows()
        .await
        .unwrap();

    assert_eq!(
        rows[1],
        row! {
            "id" => 2,
            "name" => "bob",
            "orders" => vec![Value::from(row! { "id" => 12, "customer_id" => 2 })],
        }
    );
    assert_eq!(rows[2]["orders"], Value::List(vec![]));
}

#[tokio::test]
async fn after_find_runs_for_records_only() {
    let driver = MockDriver::new();
    driver.on("FROM `customer`", customers());

    let mut builder = quarry::Db::builder();
    builder
        .register(customer().after_find(|record| record.set("seen", true)))
        .register(order())
        .register(item())
        .register(order_item());
    let db = builder.build(driver.clone()).unwrap();

    let records = db.find("customer").unwrap().all().await.unwrap();
    assert!(records.iter().all(|record| record.get("seen") == Some(Value::Bool(true))));

    let rows = db.find("customer").unwrap().all_rows().await.unwrap();
    assert!(rows.iter().all(|row| !row.contains_key("seen")));
}
