use tests::{setup::*, *};

use pretty_assertions::assert_eq;
use quarry::{
    stmt::{Condition, Query},
    QueryExt,
};

#[tokio::test]
async fn count_runs_on_a_copy() {
    let driver = MockDriver::new();
    driver.on("COUNT(*)", [row! { "COUNT(*)" => 2 }]);
    let db = connect(&driver);

    let query = db
        .find("customer")
        .unwrap()
        .where_(Condition::gt("id", 1))
        .order_by_str("id")
        .limit(5);

    assert_eq!(query.count().await.unwrap(), 2);
    assert_eq!(
        driver.log().pop().sql,
        "SELECT COUNT(*) FROM `customer` WHERE `id` > :qp0"
    );

    let (sql, _) = query.build().await.unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `customer` WHERE `id` > :qp0 ORDER BY `id` LIMIT 5"
    );
}

#[tokio::test]
async fn exists_selects_a_constant() {
    let driver = MockDriver::new();
    driver.on("SELECT 1 FROM `customer`", [row! { "1" => 1 }]);
    let db = connect(&driver);

    assert!(db.find("customer").unwrap().exists().await.unwrap());
    assert!(!db.find("order").unwrap().exists().await.unwrap());
}

#[tokio::test]
async fn aggregates_on_plain_queries() {
    let driver = MockDriver::new();
    driver
        .on("SUM(", [row! { "s" => 30 }])
        .on("MAX(", [row! { "m" => 12 }])
        .on("COUNT(", [row! { "c" => 3 }]);
    let db = connect(&driver);

    let query = Query::new().from(["order"]);
    assert_eq!(query.count(&db, "*").await.unwrap(), 3);
    assert_eq!(query.sum(&db, "id").await.unwrap(), Some(Value::from(30)));
    assert_eq!(query.max(&db, "id").await.unwrap(), Some(Value::from(12)));

    // No rule: no rows, so no value
    assert_none!(query.min(&db, "id").await.unwrap());

    assert_eq!(
        driver.log().sql(),
        [
            "SELECT COUNT(*) FROM `order`",
            "SELECT SUM(id) FROM `order`",
            "SELECT MAX(id) FROM `order`",
            "SELECT MIN(id) FROM `order`",
        ]
    );
}

#[tokio::test]
async fn offset_without_limit_on_mysql() {
    let driver = MockDriver::new();
    let db = connect(&driver);

    let (sql, _) = db.find("customer").unwrap().offset(10).build().await.unwrap();
    assert_eq!(sql, "SELECT * FROM `customer` LIMIT 10, 18446744073709551615");
}
