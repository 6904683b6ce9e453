use crate::Db;

use async_trait::async_trait;
use quarry_core::{
    stmt::{Expression, Query, Row, Value},
    Result,
};

/// Runs a [`Query`] against a database.
///
/// Aggregates work on a modified clone; the query itself is never touched.
#[async_trait]
pub trait QueryExt {
    async fn all(&self, db: &Db) -> Result<Vec<Row>>;

    async fn one(&self, db: &Db) -> Result<Option<Row>>;

    /// First column of the first row.
    async fn scalar(&self, db: &Db) -> Result<Option<Value>>;

    /// First column of every row.
    async fn column(&self, db: &Db) -> Result<Vec<Value>>;

    /// `COUNT(column)`; pass `"*"` to count rows.
    async fn count(&self, db: &Db, column: &str) -> Result<i64>;

    async fn sum(&self, db: &Db, column: &str) -> Result<Option<Value>>;

    async fn average(&self, db: &Db, column: &str) -> Result<Option<Value>>;

    async fn min(&self, db: &Db, column: &str) -> Result<Option<Value>>;

    async fn max(&self, db: &Db, column: &str) -> Result<Option<Value>>;

    async fn exists(&self, db: &Db) -> Result<bool>;
}

#[async_trait]
impl QueryExt for Query {
    async fn all(&self, db: &Db) -> Result<Vec<Row>> {
        db.query_command(self)?.query_all().await
    }

    async fn one(&self, db: &Db) -> Result<Option<Row>> {
        db.query_command(self)?.query_one().await
    }

    async fn scalar(&self, db: &Db) -> Result<Option<Value>> {
        db.query_command(self)?.query_scalar().await
    }

    async fn column(&self, db: &Db) -> Result<Vec<Value>> {
        db.query_command(self)?.query_column().await
    }

    async fn count(&self, db: &Db, column: &str) -> Result<i64> {
        let count = aggregate(self, db, format!("COUNT({column})")).await?;
        Ok(count.and_then(|count| count.as_i64()).unwrap_or(0))
    }

    async fn sum(&self, db: &Db, column: &str) -> Result<Option<Value>> {
        aggregate(self, db, format!("SUM({column})")).await
    }

    async fn average(&self, db: &Db, column: &str) -> Result<Option<Value>> {
        aggregate(self, db, format!("AVG({column})")).await
    }

    async fn min(&self, db: &Db, column: &str) -> Result<Option<Value>> {
        aggregate(self, db, format!("MIN({column})")).await
    }

    async fn max(&self, db: &Db, column: &str) -> Result<Option<Value>> {
        aggregate(self, db, format!("MAX({column})")).await
    }

    async fn exists(&self, db: &Db) -> Result<bool> {
        let mut query = self.clone();
        query.select = vec![Expression::new("1").into()];
        Ok(query.scalar(db).await?.is_some())
    }
}

async fn aggregate(query: &Query, db: &Db, select: String) -> Result<Option<Value>> {
    scalar_query(query, Expression::new(select)).scalar(db).await
}

/// `query` reduced to a single selected expression.
///
/// Grouped, distinct or unioned queries are wrapped as a derived table so
/// the aggregate sees their rows; otherwise the selection, ordering and
/// limits are simply replaced.
pub(crate) fn scalar_query(query: &Query, select: Expression) -> Query {
    if query.distinct || !query.group_by.is_empty() || query.having.is_some() || !query.unions.is_empty() {
        return Query::new().select([select]).from_query(query.clone(), "c");
    }

    let mut query = query.clone();
    query.select = vec![select.into()];
    query.order_by.clear();
    query.limit = None;
    query.offset = None;
    query
}
