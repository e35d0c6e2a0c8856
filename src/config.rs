use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Error;
use crate::query::RequestContext;
use crate::store::Record;

pub const DEFAULT_LIMIT: usize = 10;

/// Where an endpoint's records come from. `With` re-evaluates its closure
/// against the request context on every request.
#[derive(Clone)]
pub enum Source {
    /// A fixed collection name (`class` / `class_name` in declarations).
    Name(String),
    /// A resolver evaluated against the current request (`relation`).
    With(Arc<dyn Fn(&RequestContext) -> String + Send + Sync>),
}

impl Source {
    pub fn resolve(&self, ctx: &RequestContext) -> String {
        match self {
            Source::Name(name) => name.clone(),
            Source::With(resolver) => resolver(ctx),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Source::With(_) => f.debug_tuple("With").field(&"<resolver>").finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Sort specification. Defaults to the first search column, ascending.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSpec {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// Hook replacing the default `{id, label, value, ...}` serialization.
pub type SerializerFn = Arc<dyn Fn(&[Record], &EndpointConfig) -> Value + Send + Sync>;

/// Fully resolved configuration for one autocomplete endpoint. Built once
/// at startup and immutable afterwards; every recognized option has an
/// explicit field and default here.
#[derive(Clone)]
pub struct EndpointConfig {
    pub entity: String,
    pub columns: Vec<String>,
    pub action: String,
    pub limit: usize,
    pub order: OrderSpec,
    /// Equality filter intersected after the search match (`where`).
    pub filter: serde_json::Map<String, Value>,
    /// Named pre-filters applied in order before the search match.
    pub scopes: Vec<String>,
    /// Substring match instead of the default prefix match.
    pub full: bool,
    /// Skip projection and return fully materialized records.
    pub full_model: bool,
    /// Field serialized as `label`/`value`. Defaults to the first column.
    pub display_value: String,
    /// Extra fields copied into each serialized record.
    pub extra_data: Vec<String>,
    pub source: Source,
    pub serializer: Option<SerializerFn>,
}

impl EndpointConfig {
    pub fn builder(entity: impl Into<String>, columns: Vec<String>) -> EndpointBuilder {
        EndpointBuilder::new(entity, columns)
    }

    /// Route name the endpoint is registered under.
    pub fn route_name(&self) -> String {
        format!("autocomplete_{}", self.action)
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("entity", &self.entity)
            .field("columns", &self.columns)
            .field("action", &self.action)
            .field("limit", &self.limit)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Builder for programmatic endpoint registration. When several collection
/// sources are supplied, `class_name` wins over `class` wins over
/// `relation`; supplying none is a configuration error.
pub struct EndpointBuilder {
    entity: String,
    columns: Vec<String>,
    action: Option<String>,
    limit: usize,
    order: Option<OrderSpec>,
    filter: serde_json::Map<String, Value>,
    scopes: Vec<String>,
    full: bool,
    full_model: bool,
    display_value: Option<String>,
    extra_data: Vec<String>,
    class: Option<String>,
    class_name: Option<String>,
    relation: Option<Arc<dyn Fn(&RequestContext) -> String + Send + Sync>>,
    serializer: Option<SerializerFn>,
}

impl EndpointBuilder {
    fn new(entity: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            entity: entity.into(),
            columns,
            action: None,
            limit: DEFAULT_LIMIT,
            order: None,
            filter: serde_json::Map::new(),
            scopes: Vec::new(),
            full: false,
            full_model: false,
            display_value: None,
            extra_data: Vec::new(),
            class: None,
            class_name: None,
            relation: None,
            serializer: None,
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn order(mut self, order: OrderSpec) -> Self {
        self.order = Some(order);
        self
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filter.insert(field.into(), value);
        self
    }

    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scopes.push(name.into());
        self
    }

    pub fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    pub fn full_model(mut self, full_model: bool) -> Self {
        self.full_model = full_model;
        self
    }

    pub fn display_value(mut self, field: impl Into<String>) -> Self {
        self.display_value = Some(field.into());
        self
    }

    pub fn extra_data(mut self, fields: Vec<String>) -> Self {
        self.extra_data = fields;
        self
    }

    pub fn class(mut self, name: impl Into<String>) -> Self {
        self.class = Some(name.into());
        self
    }

    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    pub fn relation<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&RequestContext) -> String + Send + Sync + 'static,
    {
        self.relation = Some(Arc::new(resolver));
        self
    }

    pub fn serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&[Record], &EndpointConfig) -> Value + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn build(self) -> Result<EndpointConfig, Error> {
        if self.columns.is_empty() {
            return Err(Error::NoColumns(self.entity));
        }
        if self.limit == 0 {
            return Err(Error::InvalidLimit(self.entity));
        }

        let source = if let Some(name) = self.class_name {
            Source::Name(name)
        } else if let Some(name) = self.class {
            Source::Name(name)
        } else if let Some(resolver) = self.relation {
            Source::With(resolver)
        } else {
            return Err(Error::Configuration(self.entity));
        };

        let first_column = self.columns[0].clone();
        let action = self
            .action
            .unwrap_or_else(|| format!("{}_{}", self.entity, first_column));

        Ok(EndpointConfig {
            entity: self.entity,
            columns: self.columns,
            action,
            limit: self.limit,
            order: self
                .order
                .unwrap_or_else(|| OrderSpec::asc(first_column.clone())),
            filter: self.filter,
            scopes: self.scopes,
            full: self.full,
            full_model: self.full_model,
            display_value: self.display_value.unwrap_or(first_column),
            extra_data: self.extra_data,
            source,
            serializer: self.serializer,
        })
    }
}

/// Declaration form of an endpoint, as it appears in the server config
/// file. Converted into an `EndpointConfig` at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointDecl {
    pub entity: String,
    pub columns: Vec<String>,
    pub action: Option<String>,
    pub limit: Option<usize>,
    pub order: Option<OrderSpec>,
    #[serde(rename = "where", default)]
    pub filter: serde_json::Map<String, Value>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub full: bool,
    #[serde(default)]
    pub full_model: bool,
    pub display_value: Option<String>,
    #[serde(default)]
    pub extra_data: Vec<String>,
    pub class: Option<String>,
    pub class_name: Option<String>,
}

impl EndpointDecl {
    pub fn into_config(self) -> Result<EndpointConfig, Error> {
        let mut builder = EndpointConfig::builder(self.entity, self.columns)
            .full(self.full)
            .full_model(self.full_model)
            .extra_data(self.extra_data);

        if let Some(action) = self.action {
            builder = builder.action(action);
        }
        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }
        if let Some(order) = self.order {
            builder = builder.order(order);
        }
        if let Some(display_value) = self.display_value {
            builder = builder.display_value(display_value);
        }
        if let Some(class) = self.class {
            builder = builder.class(class);
        }
        if let Some(class_name) = self.class_name {
            builder = builder.class_name(class_name);
        }
        for (field, value) in self.filter {
            builder = builder.where_eq(field, value);
        }
        for scope in self.scopes {
            builder = builder.scope(scope);
        }

        builder.build()
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Top-level server configuration: bind address, dataset file, declarative
/// scopes per collection, and the endpoint declarations.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub dataset: PathBuf,
    /// collection name -> scope name -> field equality map
    #[serde(default)]
    pub scopes: HashMap<String, HashMap<String, serde_json::Map<String, Value>>>,
    pub endpoints: Vec<EndpointDecl>,
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: ServerConfig =
            serde_json::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }
}
