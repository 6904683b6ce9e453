use super::{Db, Shared};
use crate::{schema::Schema, ModelDef, Via};

use quarry_core::{schema::Introspect, Driver, Error, Result};
use quarry_sql::{Dialect, Flavor, QueryBuilder};

use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Builder {
    flavor: Option<Flavor>,

    table_prefix: String,

    introspector: Option<Box<dyn Introspect>>,

    /// Models in registration order
    models: Vec<ModelDef>,

    /// `None` means enabled
    schema_cache: Option<bool>,

    log_params: bool,
}

impl Builder {
    /// SQL flavor to compile for. Defaults to MySQL.
    pub fn flavor(&mut self, flavor: Flavor) -> &mut Self {
        self.flavor = Some(flavor);
        self
    }

    pub fn mysql(&mut self) -> &mut Self {
        self.flavor(Flavor::Mysql)
    }

    pub fn postgresql(&mut self) -> &mut Self {
        self.flavor(Flavor::Postgresql)
    }

    pub fn sqlite(&mut self) -> &mut Self {
        self.flavor(Flavor::Sqlite)
    }

    /// Prefix substituted for `%` in `{{%table}}` names.
    pub fn table_prefix(&mut self, prefix: &str) -> &mut Self {
        self.table_prefix = prefix.to_string();
        self
    }

    pub fn introspector(&mut self, introspector: impl Introspect) -> &mut Self {
        self.introspector = Some(Box::new(introspector));
        self
    }

    pub fn register(&mut self, model: ModelDef) -> &mut Self {
        self.models.push(model);
        self
    }

    /// When disabled, every table schema lookup queries the database.
    pub fn schema_cache(&mut self, enabled: bool) -> &mut Self {
        self.schema_cache = Some(enabled);
        self
    }

    /// Emit bound parameter values in `trace` events.
    pub fn log_params(&mut self, enabled: bool) -> &mut Self {
        self.log_params = enabled;
        self
    }

    pub fn build(&mut self, driver: impl Driver) -> Result<Db> {
        let models = self.build_registry()?;
        let flavor = self.flavor.unwrap_or(Flavor::Mysql);
        let dialect = Dialect::new(flavor).with_table_prefix(self.table_prefix.clone());
        let driver: Arc<dyn Driver> = Arc::new(driver);

        let introspector = self.introspector.take().or_else(|| default_introspector(flavor));

        tracing::debug!(?flavor, models = models.len(), "building database handle");

        Ok(Db {
            shared: Arc::new(Shared {
                schema: Schema::new(
                    driver.clone(),
                    introspector,
                    dialect.clone(),
                    self.schema_cache.unwrap_or(true),
                ),
                driver,
                builder: QueryBuilder::new(dialect),
                models,
                log_params: self.log_params,
            }),
        })
    }

    /// Index the registered models by name and check every relation
    /// against the registry.
    fn build_registry(&mut self) -> Result<IndexMap<String, Arc<ModelDef>>> {
        let mut models = IndexMap::new();

        for model in self.models.drain(..) {
            if models.contains_key(&model.name) {
                return Err(Error::invalid_configuration(format!(
                    "model `{}` is registered twice",
                    model.name
                )));
            }
            models.insert(model.name.clone(), Arc::new(model));
        }

        for model in models.values() {
            for relation in model.relations.values() {
                let context = || format!("relation `{}.{}`", model.name, relation.name);

                if !models.contains_key(&relation.target) {
                    return Err(Error::invalid_configuration(format!(
                        "{} targets unknown model `{}`",
                        context(),
                        relation.target
                    )));
                }

                if relation.link.is_empty() {
                    return Err(Error::invalid_configuration(format!(
                        "{} has an empty link",
                        context()
                    )));
                }

                match &relation.via {
                    Some(Via::Relation(via)) if !model.relations.contains_key(via) => {
                        return Err(Error::invalid_configuration(format!(
                            "{} is declared via unknown relation `{via}`",
                            context()
                        )));
                    }
                    Some(Via::Table { table, link }) if link.is_empty() => {
                        return Err(Error::invalid_configuration(format!(
                            "{} has an empty link to junction table `{table}`",
                            context()
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(models)
    }
}

#[cfg(feature = "mysql")]
fn default_introspector(flavor: Flavor) -> Option<Box<dyn Introspect>> {
    match flavor {
        Flavor::Mysql => Some(Box::new(quarry_mysql::MySQL::new())),
        _ => None,
    }
}

#[cfg(not(feature = "mysql"))]
fn default_introspector(_flavor: Flavor) -> Option<Box<dyn Introspect>> {
    None
}
