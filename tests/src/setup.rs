//! A small shop schema shared by the integration tests.
//!
//! ```text
//! customer 1--* order *--* item   (through order_item)
//! ```

use crate::MockDriver;

use quarry::{db::Builder, row, stmt::Row, Db, ModelDef, RelationDef};

pub fn customer() -> ModelDef {
    ModelDef::new("customer", "customer")
        .primary_key(["id"])
        .relation(RelationDef::has_many("orders", "order", [("customer_id", "id")]).inverse_of("customer"))
        .relation(
            RelationDef::has_many("orders_by_id", "order", [("customer_id", "id")])
                .index_by("id"),
        )
        .relation(RelationDef::has_one("first_order", "order", [("customer_id", "id")]))
}

pub fn order() -> ModelDef {
    ModelDef::new("order", "order")
        .primary_key(["id"])
        .relation(RelationDef::has_one("customer", "customer", [("id", "customer_id")]).inverse_of("orders"))
        .relation(
            RelationDef::has_many("items", "item", [("id", "item_id")])
                .via_table("order_item", [("order_id", "id")]),
        )
        .has_many("order_items", "order_item", [("order_id", "id")])
        .relation(RelationDef::has_many("products", "item", [("id", "item_id")]).via("order_items"))
}

pub fn item() -> ModelDef {
    ModelDef::new("item", "item").primary_key(["id"])
}

pub fn order_item() -> ModelDef {
    ModelDef::new("order_item", "order_item").primary_key(["order_id", "item_id"])
}

/// A builder with every shop model registered.
pub fn shop() -> Builder {
    let mut builder = Db::builder();
    builder
        .register(customer())
        .register(order())
        .register(item())
        .register(order_item());
    builder
}

/// A MySQL handle over the shop schema, backed by `driver`.
pub fn connect(driver: &MockDriver) -> Db {
    shop().mysql().build(driver.clone()).unwrap()
}

pub fn customers() -> Vec<Row> {
    vec![
        row! { "id" => 1, "name" => "alice" },
        row! { "id" => 2, "name" => "bob" },
        row! { "id" => 3, "name" => "carol" },
    ]
}

pub fn orders() -> Vec<Row> {
    vec![
        row! { "id" => 10, "customer_id" => 1 },
        row! { "id" => 11, "customer_id" => 1 },
        row! { "id" => 12, "customer_id" => 2 },
    ]
}

pub fn order_items() -> Vec<Row> {
    vec![
        row! { "order_id" => 10, "item_id" => 100 },
        row! { "order_id" => 10, "item_id" => 101 },
        row! { "order_id" => 11, "item_id" => 101 },
    ]
}

pub fn items() -> Vec<Row> {
    vec![
        row! { "id" => 100, "name" => "pen" },
        row! { "id" => 101, "name" => "ink" },
    ]
}
