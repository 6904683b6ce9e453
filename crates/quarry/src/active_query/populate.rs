use super::{ActiveQuery, EagerLoad, ViaQuery};
use crate::{record::row_key, Record, Related};

use quarry_core::{
    stmt::{Query, Row, Value},
    Error, Result,
};

use async_recursion::async_recursion;
use futures_util::future::try_join_all;
use indexmap::{map::Entry, IndexMap, IndexSet};
use std::collections::HashSet;

type Buckets = IndexMap<String, Vec<Record>>;

impl ActiveQuery {
    /// Turn fetched rows into records: drop join duplicates, load eager
    /// relations, back-fill the inverse of a lazily loaded relation and run
    /// `after_find` hooks.
    pub(super) async fn populate(&self, query: &Query, rows: Vec<Row>) -> Result<Vec<Record>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let rows = if !query.joins.is_empty() && query.index_by.is_none() {
            self.remove_duplicates(rows).await?
        } else {
            rows
        };

        let records = rows
            .into_iter()
            .map(|row| Record::loaded(self.model.clone(), row))
            .collect::<Vec<_>>();

        let eager = self
            .with
            .iter()
            .chain(self.join_with_eager_loads())
            .cloned()
            .collect::<Vec<_>>();
        if !eager.is_empty() {
            self.find_with(&eager, &records).await?;
        }

        self.add_inverse_relations(&records)?;

        if !self.as_array {
            for record in &records {
                self.model.run_after_find(record);
            }
        }

        Ok(records)
    }

    /// Rows repeated by a join collapse to the first occurrence of each
    /// primary key. Stops at the first row that lacks the key.
    async fn remove_duplicates(&self, rows: Vec<Row>) -> Result<Vec<Row>> {
        let primary_key = match self.model.primary_key.is_empty() {
            true => self.db.schema().primary_key_of(&self.model.table).await?,
            false => self.model.primary_key.clone(),
        };

        if primary_key.is_empty() {
            return Err(Error::invalid_configuration(format!(
                "primary key of model `{}` can not be empty",
                self.model.name
            )));
        }

        let columns = primary_key.iter().map(String::as_str).collect::<Vec<_>>();
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(rows.len());
        let mut rows = rows.into_iter();

        for row in rows.by_ref() {
            if !columns.iter().all(|column| row.contains_key(*column)) {
                unique.push(row);
                break;
            }

            let null_key = columns.len() == 1 && row[columns[0]] == Value::Null;
            if null_key || seen.insert(row_key(&row, &columns)) {
                unique.push(row);
            }
        }

        unique.extend(rows);
        Ok(unique)
    }

    /// Load the eager relations in `with` for `records`. Sibling relations
    /// load concurrently; a dotted path is handed to the first relation as
    /// its own nested `with`.
    async fn find_with(&self, with: &[EagerLoad], records: &[Record]) -> Result<()> {
        let mut relations: IndexMap<String, ActiveQuery> = IndexMap::new();

        for eager in with {
            let (name, child) = match eager.path.split_once('.') {
                Some((name, child)) => (name, Some(child)),
                None => (eager.path.as_str(), None),
            };

            let relation = match relations.entry(name.to_string()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut relation = ActiveQuery::for_relation(&self.db, &self.model, name)?;
                    relation.as_array = self.as_array;
                    entry.insert(relation)
                }
            };

            match (child, &eager.customize) {
                (Some(child), customize) => relation.with.push(EagerLoad {
                    path: child.to_string(),
                    customize: customize.clone(),
                }),
                (None, Some(customize)) => *relation = customize(relation.clone()),
                (None, None) => {}
            }
        }

        try_join_all(
            relations
                .iter()
                .map(|(name, relation)| relation.populate_relation(name, records)),
        )
        .await?;

        Ok(())
    }

    /// Load this relation for every record in `primary` with one query and
    /// attach the results through the link buckets. Returns the related
    /// records.
    #[async_recursion]
    pub(super) async fn populate_relation(&self, name: &str, primary: &[Record]) -> Result<Vec<Record>> {
        let relation = self.relation_state()?;
        let primary_rows = primary.iter().map(Record::attributes).collect::<Vec<_>>();

        // Junction rows and the junction link, when the relation goes via one
        let mut via: Option<(Vec<Row>, IndexMap<String, String>)> = None;

        let filter = match &relation.via {
            Some(ViaQuery::Table(junction)) => {
                let rows = junction.find_junction_rows(&primary_rows).await?;
                let filter = self.link_condition(&relation.link, &rows);
                via = Some((rows, junction.relation_state()?.link.clone()));
                filter
            }
            Some(ViaQuery::Relation(via_name, via_query)) => {
                let mut via_query = via_query.as_ref().clone();
                via_query.as_array = self.as_array;
                let records = via_query.populate_relation(via_name, primary).await?;
                let rows = records.iter().map(Record::attributes).collect::<Vec<_>>();
                let filter = self.link_condition(&relation.link, &rows);
                via = Some((rows, via_query.relation_state()?.link.clone()));
                filter
            }
            None => self.link_condition(&relation.link, &primary_rows),
        };

        let mut query = self.clone().and_where(filter);

        if !relation.multiple && primary.len() == 1 {
            let record = query.one().await?;
            primary[0].populate_relation(name, Related::One(record.clone()));

            let records = record.into_iter().collect::<Vec<_>>();
            self.populate_inverse_relation(primary, &records, name)?;
            return Ok(records);
        }

        // Buckets are keyed before indexing
        let index_by = query.query.index_by.take();
        let records = query.all().await?;

        let buckets = build_buckets(
            &records,
            &relation.link,
            via.as_ref().map(|(rows, via_link)| (rows.as_slice(), via_link)),
        );

        let primary_link = match &via {
            Some((_, via_link)) => via_link.values().map(String::as_str).collect::<Vec<_>>(),
            None => relation.link.values().map(String::as_str).collect(),
        };

        for record in primary {
            let bucket = lookup(&buckets, record, &primary_link);

            let related = match (relation.multiple, &index_by) {
                (false, _) => Related::One(bucket.into_iter().next()),
                (true, Some(index_by)) => Related::Indexed(
                    bucket
                        .into_iter()
                        .map(|related| (index_by.key(&related.attributes()), related))
                        .collect(),
                ),
                (true, None) => Related::Many(bucket),
            };
            record.populate_relation(name, related);
        }

        self.populate_inverse_relation(primary, &records, name)?;
        Ok(records)
    }

    /// Point the related `records` back at their owners in `primary`
    /// through the inverse relation, without querying.
    fn populate_inverse_relation(
        &self,
        primary: &[Record],
        records: &[Record],
        primary_name: &str,
    ) -> Result<()> {
        let relation = self.relation_state()?;
        let Some(inverse) = &relation.inverse_of else {
            return Ok(());
        };

        if records.is_empty() || primary.is_empty() || self.as_array {
            return Ok(());
        }

        let inverse_def = self.model.get_relation(inverse)?;

        if inverse_def.multiple {
            let keys = inverse_def.link.keys().map(String::as_str).collect::<Vec<_>>();
            let values = inverse_def.link.values().map(String::as_str).collect::<Vec<_>>();

            let mut buckets = Buckets::new();
            for owner in primary {
                buckets.entry(owner.key(&keys)).or_default().push(owner.clone());
            }
            for record in records {
                let owners = buckets.get(&record.key(&values)).map(Vec::as_slice).unwrap_or_default();
                record.populate_inverse_many(inverse, owners);
            }
        } else {
            for owner in primary {
                for record in owner.related_many(primary_name) {
                    record.populate_inverse_one(inverse, owner);
                }
            }
        }

        Ok(())
    }

    /// A lazily loaded relation points its records back at the owner.
    fn add_inverse_relations(&self, records: &[Record]) -> Result<()> {
        let Some(relation) = &self.relation else {
            return Ok(());
        };
        let (Some(inverse), Some(owner)) = (&relation.inverse_of, &relation.primary) else {
            return Ok(());
        };
        if self.as_array {
            return Ok(());
        }

        let inverse_def = self.model.get_relation(inverse)?;
        for record in records {
            if inverse_def.multiple {
                record.populate_inverse_many(inverse, std::slice::from_ref(owner));
            } else {
                record.populate_inverse_one(inverse, owner);
            }
        }

        Ok(())
    }
}

/// Group related records by their link key.
///
/// With a junction, the related key is first mapped to the owner keys it
/// is linked to through the junction rows, and each record lands in the
/// bucket of every such owner.
fn build_buckets(
    records: &[Record],
    link: &IndexMap<String, String>,
    via: Option<(&[Row], &IndexMap<String, String>)>,
) -> Buckets {
    let link_keys = link.keys().map(String::as_str).collect::<Vec<_>>();
    let mut buckets = Buckets::new();

    let Some((via_rows, via_link)) = via else {
        for record in records {
            buckets
                .entry(record.key(&link_keys))
                .or_default()
                .push(record.clone());
        }
        return buckets;
    };

    let via_keys = via_link.keys().map(String::as_str).collect::<Vec<_>>();
    let link_values = link.values().map(String::as_str).collect::<Vec<_>>();

    // Related key to owner keys
    let mut owners: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for row in via_rows {
        owners
            .entry(row_key(row, &link_values))
            .or_default()
            .insert(row_key(row, &via_keys));
    }

    for record in records {
        let Some(keys) = owners.get(&record.key(&link_keys)) else {
            continue;
        };
        for key in keys {
            buckets.entry(key.clone()).or_default().push(record.clone());
        }
    }

    buckets
}

/// The bucket of `owner`. A list-valued single-column link collects the
/// buckets of every member.
fn lookup(buckets: &Buckets, owner: &Record, link: &[&str]) -> Vec<Record> {
    if let [column] = link {
        if let Some(Value::List(members)) = owner.get(column) {
            return members
                .iter()
                .filter_map(|member| buckets.get(&member.to_key()))
                .flatten()
                .cloned()
                .collect();
        }
    }

    buckets.get(&owner.key(link)).cloned().unwrap_or_default()
}
