use pretty_assertions::assert_eq;
use quarry_core::stmt::{Condition, Direction, Expression, Query};
use quarry_sql::{Dialect, QueryBuilder};

fn build(query: &Query) -> String {
    QueryBuilder::mysql().build(query).unwrap().0
}

#[test]
fn select_star_by_default() {
    assert_eq!(build(&Query::new().from(["user"])), "SELECT * FROM `user`");
}

#[test]
fn columns_aliases_and_expressions() {
    let query = Query::new()
        .select(["id", "name AS n", "u.email mail", "COUNT(*) cnt"])
        .from(["user u"]);

    assert_eq!(
        build(&query),
        "SELECT `id`, `name` AS `n`, `u`.`email` AS `mail`, COUNT(*) cnt FROM `user` `u`"
    );
}

#[test]
fn select_as_and_scalar_sub_query() {
    let orders = Query::new()
        .select([Expression::new("COUNT(*)")])
        .from(["order o"])
        .where_("o.user_id = u.id");
    let query = Query::new()
        .select(["u.id"])
        .select_as(orders, "order_count")
        .from(["user u"]);

    assert_eq!(
        build(&query),
        "SELECT `u`.`id`, (SELECT COUNT(*) FROM `order` `o` WHERE o.user_id = u.id) AS `order_count` FROM `user` `u`"
    );
}

#[test]
fn distinct_and_select_option() {
    let query = Query::new()
        .distinct(true)
        .select_option("SQL_CALC_FOUND_ROWS")
        .select(["id"])
        .from(["t"]);
    assert_eq!(build(&query), "SELECT DISTINCT SQL_CALC_FOUND_ROWS `id` FROM `t`");
}

#[test]
fn derived_table() {
    let paid = Query::new().from(["order"]).where_(Condition::eq("paid", true));
    let query = Query::new().select(["o.id"]).from_query(paid, "o");

    let (sql, params) = QueryBuilder::mysql().build(&query).unwrap();
    assert_eq!(sql, "SELECT `o`.`id` FROM (SELECT * FROM `order` WHERE `paid` = :qp0) `o`");
    assert_eq!(params[":qp0"], true);
}

#[test]
fn joins() {
    let query = Query::new()
        .from(["user u"])
        .left_join("profile p", "p.user_id = u.id")
        .inner_join("order", Condition::raw("order.user_id = u.id"))
        .where_(Condition::eq("u.id", 1));

    assert_eq!(
        build(&query),
        "SELECT * FROM `user` `u` LEFT JOIN `profile` `p` ON p.user_id = u.id \
         INNER JOIN `order` ON order.user_id = u.id WHERE `u`.`id` = :qp0"
    );
}

#[test]
fn join_conditions_are_numbered_before_where() {
    let query = Query::new()
        .from(["user u"])
        .inner_join("order o", Condition::gt("o.total", 10))
        .where_(Condition::eq("u.status", 1));

    let (sql, params) = QueryBuilder::mysql().build(&query).unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `user` `u` INNER JOIN `order` `o` ON `o`.`total` > :qp0 WHERE `u`.`status` = :qp1"
    );
    assert_eq!(params[":qp0"], 10);
    assert_eq!(params[":qp1"], 1);
}

#[test]
fn where_that_compiles_to_nothing_is_omitted() {
    let query = Query::new()
        .from(["user"])
        .where_(Condition::not_like("name", Vec::<String>::new()));
    assert_eq!(build(&query), "SELECT * FROM `user`");

    let query = Query::new()
        .from(["user"])
        .where_(Condition::like("name", Vec::<String>::new()));
    assert_eq!(build(&query), "SELECT * FROM `user` WHERE 0=1");
}

#[test]
fn group_by_and_having() {
    let query = Query::new()
        .select(["status", "COUNT(*) AS cnt"])
        .from(["user"])
        .group_by(["status"])
        .having(Condition::gt("COUNT(*)", 1));

    assert_eq!(
        build(&query),
        "SELECT `status`, COUNT(*) AS cnt FROM `user` GROUP BY `status` HAVING COUNT(*) > :qp0"
    );
}

#[test]
fn order_by() {
    let query = Query::new()
        .from(["user"])
        .order_by_str("created_at DESC, id");
    assert_eq!(build(&query), "SELECT * FROM `user` ORDER BY `created_at` DESC, `id`");

    let query = Query::new()
        .from(["user"])
        .order_by([("id", Direction::Asc)])
        .add_order_by([("id", Direction::Desc)]);
    assert_eq!(build(&query), "SELECT * FROM `user` ORDER BY `id` DESC");

    let query = Query::new()
        .from(["user"])
        .order_by([(Expression::new("FIELD(id, 3, 1, 2)"), Direction::Asc)]);
    assert_eq!(build(&query), "SELECT * FROM `user` ORDER BY FIELD(id, 3, 1, 2)");
}

#[test]
fn union_wraps_base_and_appends_order_and_limit() {
    let query = Query::new()
        .select(["id"])
        .from(["a"])
        .where_(Condition::eq("y", 2))
        .union(Query::new().select(["id"]).from(["b"]))
        .union_all(
            Query::new()
                .select(["id"])
                .from(["c"])
                .where_(Condition::eq("x", 1)),
        )
        .order_by_str("id")
        .limit(5);

    let (sql, params) = QueryBuilder::mysql().build(&query).unwrap();
    assert_eq!(
        sql,
        "(SELECT `id` FROM `a` WHERE `y` = :qp0) UNION ( SELECT `id` FROM `b` ) \
         UNION ALL ( SELECT `id` FROM `c` WHERE `x` = :qp1 ) ORDER BY `id` LIMIT 5"
    );
    assert_eq!(params.len(), 2);
}

// ---------------------------------------------------------------------------
// limit / offset
// ---------------------------------------------------------------------------

#[test]
fn limit_and_offset() {
    let query = Query::new().from(["user"]).limit(10).offset(20);
    assert_eq!(build(&query), "SELECT * FROM `user` LIMIT 10 OFFSET 20");
}

#[test]
fn mysql_offset_without_limit() {
    let query = Query::new().from(["user"]).offset(5);
    assert_eq!(build(&query), "SELECT * FROM `user` LIMIT 5, 18446744073709551615");
}

#[test]
fn offset_without_limit_per_dialect() {
    let query = Query::new().from(["user"]).offset(5);

    let (sql, _) = QueryBuilder::postgresql().build(&query).unwrap();
    assert_eq!(sql, r#"SELECT * FROM "user" OFFSET 5"#);

    let (sql, _) = QueryBuilder::sqlite().build(&query).unwrap();
    assert_eq!(sql, r#"SELECT * FROM "user" LIMIT 9223372036854775807 OFFSET 5"#);
}

#[test]
fn zero_offset_is_ignored() {
    let query = Query::new().from(["user"]).offset(0);
    assert_eq!(build(&query), "SELECT * FROM `user`");
}

// ---------------------------------------------------------------------------
// parameters
// ---------------------------------------------------------------------------

#[test]
fn user_params_are_kept() {
    let query = Query::new()
        .from(["user"])
        .where_(Condition::raw(":qp0 = status"))
        .and_where(Condition::eq("id", 7))
        .params([("qp0", "active")]);

    let (sql, params) = QueryBuilder::mysql().build(&query).unwrap();
    assert_eq!(sql, "SELECT * FROM `user` WHERE (:qp0 = status) AND (`id` = :qp1)");
    assert_eq!(params[":qp0"], "active");
    assert_eq!(params[":qp1"], 7);
}

#[test]
fn building_twice_is_identical() {
    let query = Query::new()
        .from(["user"])
        .where_(Condition::in_list("id", vec![1, 2, 3]))
        .limit(3);

    let builder = QueryBuilder::mysql();
    let first = builder.build(&query).unwrap();
    let second = builder.build(&query).unwrap();

    assert_eq!(first.0, "SELECT * FROM `user` WHERE `id` IN (:qp0, :qp1, :qp2) LIMIT 3");
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// dialects
// ---------------------------------------------------------------------------

#[test]
fn postgresql_quoting() {
    let query = Query::new()
        .select(["u.id"])
        .from(["public.user u"])
        .where_(Condition::eq("u.id", 1));

    let (sql, _) = QueryBuilder::postgresql().build(&query).unwrap();
    assert_eq!(
        sql,
        r#"SELECT "u"."id" FROM "public"."user" "u" WHERE "u"."id" = :qp0"#
    );
}

#[test]
fn table_templates_survive_building() {
    let builder = QueryBuilder::new(Dialect::mysql().with_table_prefix("tbl_"));
    let query = Query::new().select(["[[name]]"]).from(["{{%user}}"]);

    let (sql, _) = builder.build(&query).unwrap();
    assert_eq!(sql, "SELECT [[name]] FROM {{%user}}");
    assert_eq!(builder.dialect().quote_sql(&sql), "SELECT `name` FROM `tbl_user`");
    assert_eq!(builder.dialect().raw_table_name("{{%user}}"), "tbl_user");
}
