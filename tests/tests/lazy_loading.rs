use tests::{setup::*, *};

use pretty_assertions::assert_eq;
use quarry::{stmt::Condition, Record, Related};

#[tokio::test]
async fn lazy_relation_is_cached_on_the_record() {
    let driver = MockDriver::new();
    driver.on("FROM `customer`", customers().into_iter().take(1)).on("FROM `order`", orders().into_iter().take(2));
    let db = connect(&driver);

    let customer = db
        .find("customer")
        .unwrap()
        .where_(Condition::eq("id", 1))
        .one()
        .await
        .unwrap()
        .unwrap();
    assert!(!customer.is_relation_populated("orders"));

    let orders = db.load_relation(&customer, "orders").await.unwrap();
    assert_eq!(ids!(orders.clone().into_vec()), [10, 11]);

    let log = driver.log();
    assert_eq!(log.len(), 2);
    assert_eq!(
        log.sql()[1],
        "SELECT * FROM `order` WHERE `customer_id`=:qp0"
    );

    // Second access is served from the record
    db.load_relation(&customer, "orders").await.unwrap();
    assert_eq!(log.len(), 2);
}

#[tokio::test]
async fn lazy_inverse_points_back_without_querying() {
    let driver = MockDriver::new();
    driver
        .on("FROM `order`", orders().into_iter().take(1))
        .on("FROM `customer`", customers().into_iter().take(1));
    let db = connect(&driver);

    let order = db.find("order").unwrap().one().await.unwrap().unwrap();

    let Related::One(Some(customer)) = db.load_relation(&order, "customer").await.unwrap() else {
        panic!("expected a customer");
    };
    assert_eq!(driver.log().len(), 2);

    // `customer.orders` was filled in from the inverse side
    let orders = db.load_relation(&customer, "orders").await.unwrap().into_vec();
    assert_eq!(driver.log().len(), 2);
    assert_eq!(orders.len(), 1);
    assert!(Record::same(&orders[0], &order));
}

#[tokio::test]
async fn missing_has_one_is_cached_as_none() {
    let driver = MockDriver::new();
    driver.on("FROM `order`", [row! { "id" => 13, "customer_id" => 9 }]);
    let db = connect(&driver);

    let order = db.find("order").unwrap().one().await.unwrap().unwrap();

    let customer = db.load_relation(&order, "customer").await.unwrap();
    assert!(matches!(customer, Related::One(None)));
    assert!(order.is_relation_populated("customer"));
    assert_none!(order.related_one("customer"));
}

#[tokio::test]
async fn lazy_via_junction_table() {
    let driver = MockDriver::new();
    driver
        .on("FROM `order_item`", order_items().into_iter().take(2))
        .on("FROM `order`", orders().into_iter().take(1))
        .on("FROM `item`", items());
    let db = connect(&driver);

    let order = db.find("order").unwrap().one().await.unwrap().unwrap();
    let items = db.load_relation(&order, "items").await.unwrap();

    assert_eq!(ids!(items.into_vec()), [100, 101]);
    assert_eq!(
        driver.log().sql()[1..],
        [
            "SELECT * FROM `order_item` WHERE `order_id`=:qp0",
            "SELECT * FROM `item` WHERE `id` IN (:qp0, :qp1)",
        ]
    );
}

#[tokio::test]
async fn lazy_via_relation_populates_the_intermediate() {
    let driver = MockDriver::new();
    driver
        .on("FROM `order_item`", order_items().into_iter().take(2))
        .on("FROM `order`", orders().into_iter().take(1))
        .on("FROM `item`", items());
    let db = connect(&driver);

    let order = db.find("order").unwrap().one().await.unwrap().unwrap();
    let products = db.load_relation(&order, "products").await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(order.related_many("order_items").len(), 2);
    assert_eq!(driver.log().len(), 3);
}

#[tokio::test]
async fn unknown_relation_is_a_configuration_error() {
    let driver = MockDriver::new();
    driver.on("FROM `order`", orders());
    let db = connect(&driver);

    let order = db.find("order").unwrap().one().await.unwrap().unwrap();
    let err = assert_err!(db.load_relation(&order, "shipments").await);
    assert!(err.is_invalid_configuration());
}
