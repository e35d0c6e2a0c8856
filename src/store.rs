use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::error::Error;

/// Field holding a record's unique identifier.
pub const ID_FIELD: &str = "id";

/// A single searchable entity: a flat mapping of field name to JSON value.
/// Records are read-only projections of the backing dataset; the store never
/// mutates them after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub serde_json::Map<String, Value>);

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn id(&self) -> Option<&Value> {
        self.0.get(ID_FIELD)
    }

    /// Returns a copy restricted to `fields`.
    pub fn project(&self, fields: &HashSet<&str>) -> Record {
        Record(
            self.0
                .iter()
                .filter(|(name, _)| fields.contains(name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

/// A named pre-filter attached to a collection at startup.
pub type ScopeFn = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// One named set of records plus its registered scopes.
pub struct Collection {
    records: Vec<Record>,
    scopes: HashMap<String, ScopeFn>,
}

impl Collection {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            scopes: HashMap::new(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeFn> {
        self.scopes.get(name)
    }
}

/// In-memory store family: collections keyed by name, loaded once from a
/// JSON dataset file and immutable afterwards. Implements the generic store
/// capability the query builder consumes: resolve collection, apply named
/// scope, filter, order, limit, project.
#[derive(Default)]
pub struct MemoryStore {
    collections: HashMap<String, Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a dataset of the form `{"brands": [{"id": 1, "name": "..."}]}`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file {}", path.display()))?;

        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let collections: HashMap<String, Vec<Record>> =
            serde_json::from_str(data).context("Failed to parse dataset")?;

        let mut store = Self::new();
        for (name, records) in collections {
            store.insert_collection(name, records);
        }

        Ok(store)
    }

    pub fn insert_collection(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.collections.insert(name.into(), Collection::new(records));
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Attaches a named scope to an existing collection.
    pub fn register_scope<F>(&mut self, collection: &str, name: impl Into<String>, pred: F) -> Result<(), Error>
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        let coll = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

        coll.scopes.insert(name.into(), Arc::new(pred));
        Ok(())
    }

    /// Registers a scope that keeps records whose fields equal every entry
    /// of `fields`. This is the declarative scope form used by config files.
    pub fn register_eq_scope(
        &mut self,
        collection: &str,
        name: impl Into<String>,
        fields: serde_json::Map<String, Value>,
    ) -> Result<(), Error> {
        self.register_scope(collection, name, move |record| {
            fields
                .iter()
                .all(|(field, expected)| record.get(field) == Some(expected))
        })
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
