use pretty_assertions::assert_eq;
use quarry_core::stmt::{Condition, Expression, Operand, Params, Value};
use quarry_sql::QueryBuilder;

#[test]
fn insert() {
    let mut params = Params::new();
    let sql = QueryBuilder::mysql()
        .insert(
            "user",
            [
                ("name", Operand::from("bob")),
                ("created_at", Operand::from(Expression::new("NOW()"))),
            ],
            &mut params,
        )
        .unwrap();

    assert_eq!(sql, "INSERT INTO `user` (`name`, `created_at`) VALUES (:qp0, NOW())");
    assert_eq!(params[":qp0"], "bob");
}

#[test]
fn insert_without_columns() {
    let columns = Vec::<(&str, Value)>::new;

    let sql = QueryBuilder::mysql()
        .insert("log", columns(), &mut Params::new())
        .unwrap();
    assert_eq!(sql, "INSERT INTO `log` () VALUES ()");

    let sql = QueryBuilder::postgresql()
        .insert("log", columns(), &mut Params::new())
        .unwrap();
    assert_eq!(sql, r#"INSERT INTO "log" DEFAULT VALUES"#);
}

#[test]
fn insert_rejects_lists() {
    let err = QueryBuilder::mysql()
        .insert("user", [("tags", vec!["a", "b"])], &mut Params::new())
        .unwrap_err();
    assert!(err.is_type_conversion());
}

#[test]
fn batch_insert_inlines_literals() {
    let mut params = Params::new();
    let sql = QueryBuilder::mysql()
        .batch_insert(
            "user",
            ["name", "age", "active"],
            vec![
                vec!["o'neil".into(), 30.into(), true.into()],
                vec![Value::Null, 1.into(), false.into()],
            ],
            &mut params,
        )
        .unwrap();

    assert_eq!(
        sql,
        "INSERT INTO `user` (`name`, `age`, `active`) VALUES ('o\\'neil', 30, 1), (NULL, 1, 0)"
    );
    assert!(params.is_empty());
}

#[test]
fn batch_insert_postgresql_quoting() {
    let sql = QueryBuilder::postgresql()
        .batch_insert("user", ["name"], vec![vec!["o'neil".into()]], &mut Params::new())
        .unwrap();
    assert_eq!(sql, r#"INSERT INTO "user" ("name") VALUES ('o''neil')"#);
}

#[test]
fn batch_insert_binds_bytes() {
    let mut params = Params::new();
    let sql = QueryBuilder::mysql()
        .batch_insert("file", ["data"], vec![vec![Value::bytes(vec![1, 2])]], &mut params)
        .unwrap();
    assert_eq!(sql, "INSERT INTO `file` (`data`) VALUES (:qp0)");
    assert_eq!(params[":qp0"], Value::bytes(vec![1, 2]));
}

#[test]
fn batch_insert_without_rows() {
    let sql = QueryBuilder::mysql()
        .batch_insert("user", ["name"], Vec::<Vec<Value>>::new(), &mut Params::new())
        .unwrap();
    assert_eq!(sql, "");
}

#[test]
fn update() {
    let mut params = Params::new();
    let sql = QueryBuilder::mysql()
        .update(
            "user",
            [("status", 2)],
            Some(&Condition::eq("id", 7)),
            &mut params,
        )
        .unwrap();

    assert_eq!(sql, "UPDATE `user` SET `status`=:qp0 WHERE `id` = :qp1");
    assert_eq!(params[":qp0"], 2);
    assert_eq!(params[":qp1"], 7);
}

#[test]
fn update_with_expression_and_no_condition() {
    let sql = QueryBuilder::mysql()
        .update(
            "counter",
            [("hits", Expression::new("hits + 1"))],
            None,
            &mut Params::new(),
        )
        .unwrap();
    assert_eq!(sql, "UPDATE `counter` SET `hits`=hits + 1");
}

#[test]
fn update_requires_columns() {
    let err = QueryBuilder::mysql()
        .update("user", Vec::<(&str, Value)>::new(), None, &mut Params::new())
        .unwrap_err();
    assert!(err.is_invalid_condition());
}

#[test]
fn delete() {
    let mut params = Params::new();
    let sql = QueryBuilder::mysql()
        .delete("user", Some(&Condition::hash([("id", vec![1, 2])])), &mut params)
        .unwrap();
    assert_eq!(sql, "DELETE FROM `user` WHERE `id` IN (:qp0, :qp1)");

    let sql = QueryBuilder::sqlite()
        .delete("user", None, &mut Params::new())
        .unwrap();
    assert_eq!(sql, r#"DELETE FROM "user""#);
}
