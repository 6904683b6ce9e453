use super::{ActiveQuery, EagerLoad, JoinWith, ViaQuery};

use quarry_core::{
    stmt::{Condition, Join, Query},
    Result,
};

use indexmap::IndexMap;
use std::collections::HashSet;

impl ActiveQuery {
    /// Expand every queued `join_with` into joins on `query`.
    ///
    /// Joins produced by different paths are de-duplicated, first by the
    /// whole clause and then by joined table. Joins added explicitly come
    /// after the relation joins.
    pub(super) fn build_join_with(&self, mut query: Query) -> Result<Query> {
        let explicit = std::mem::take(&mut query.joins);

        for join_with in &self.join_with {
            self.join_with_relations(&mut query, join_with)?;
        }

        let mut clauses = HashSet::new();
        query.joins.retain(|join| clauses.insert(format!("{join:?}")));

        let mut tables = HashSet::new();
        query
            .joins
            .retain(|join| tables.insert(format!("{:?}", join.table)));

        query.joins.extend(explicit);
        Ok(query)
    }

    /// Relation paths the `join_with` entries ask to load eagerly.
    pub(super) fn join_with_eager_loads(&self) -> impl Iterator<Item = &EagerLoad> {
        self.join_with
            .iter()
            .filter(|join_with| join_with.eager_loading)
            .flat_map(|join_with| &join_with.relations)
    }

    fn join_with_relations(&self, query: &mut Query, join_with: &JoinWith) -> Result<()> {
        // Relation queries by full dotted path
        let mut relations: IndexMap<String, ActiveQuery> = IndexMap::new();

        for eager in &join_with.relations {
            let segments = eager.path.split('.').collect::<Vec<_>>();
            let mut parent: Option<String> = None;

            for (i, name) in segments.iter().enumerate() {
                let full_name = match &parent {
                    Some(parent) => format!("{parent}.{name}"),
                    None => name.to_string(),
                };

                if !relations.contains_key(&full_name) {
                    let parent_query = parent
                        .as_ref()
                        .and_then(|parent| relations.get(parent))
                        .unwrap_or(self);

                    let mut relation = ActiveQuery::for_relation(&self.db, &parent_query.model, name)?;
                    if i + 1 == segments.len() {
                        if let Some(customize) = &eager.customize {
                            relation = customize(relation);
                        }
                    }
                    if !relation.join_with.is_empty() {
                        relation.query = relation.build_join_with(relation.query.clone())?;
                        relation.join_with.clear();
                    }

                    self.join_with_relation(query, parent_query, &relation, &join_with.join_type)?;
                    relations.insert(full_name.clone(), relation);
                }

                parent = Some(full_name);
            }
        }

        Ok(())
    }

    /// Join `child` to `parent`. A relation declared via a junction joins
    /// the junction first, then the target.
    fn join_with_relation(
        &self,
        query: &mut Query,
        parent: &ActiveQuery,
        child: &ActiveQuery,
        join_type: &str,
    ) -> Result<()> {
        let state = child.relation_state()?;

        if let Some(via) = &state.via {
            let via = match via {
                ViaQuery::Relation(_, via) => via.as_ref(),
                ViaQuery::Table(junction) => junction.as_ref(),
            };
            self.join_with_relation(query, parent, via, join_type)?;

            let mut child = child.clone();
            if let Some(state) = &mut child.relation {
                state.via = None;
            }
            return self.join_with_relation(query, via, &child, join_type);
        }

        let (_, parent_alias) = parent.table_name_and_alias();
        let (child_table, child_alias) = child.table_name_and_alias();
        let (parent_alias, child_alias) = (templated(parent_alias), templated(child_alias));

        let on = state
            .link
            .iter()
            .map(|(child_column, parent_column)| {
                format!("{parent_alias}.[[{parent_column}]] = {child_alias}.[[{child_column}]]")
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let on = match &state.on {
            Some(extra) => Condition::and([Condition::raw(on), extra.clone()]),
            None => Condition::raw(on),
        };

        let table = child
            .query
            .from
            .first()
            .cloned()
            .unwrap_or_else(|| child_table.into());

        query.joins.push(Join {
            kind: join_type.to_string(),
            table,
            on: Some(on),
        });

        let joined = &child.query;
        if let Some(condition) = &joined.where_ {
            *query = std::mem::take(query).and_where(condition.clone());
        }
        if let Some(condition) = &joined.having {
            *query = std::mem::take(query).and_having(condition.clone());
        }
        query.order_by.extend(joined.order_by.iter().cloned());
        query.group_by.extend(joined.group_by.iter().cloned());
        for (name, value) in &joined.params {
            query.params.insert(name.clone(), value.clone());
        }
        query.joins.extend(joined.joins.iter().cloned());
        query.unions.extend(joined.unions.iter().cloned());

        Ok(())
    }
}

/// Wrap an alias in a `{{...}}` table template unless it already is one.
fn templated(alias: String) -> String {
    if alias.contains("{{") {
        alias
    } else {
        format!("{{{{{alias}}}}}")
    }
}
