use serde_json::Value;
use std::sync::Arc;

use crate::config::{EndpointConfig, EndpointDecl};
use crate::error::Error;
use crate::query::display_text;
use crate::store::{Record, ID_FIELD};

/// Handler-registration table: route name (`autocomplete_<action>`) to its
/// endpoint configuration, in declaration order. Built once at startup and
/// iterated by the router.
#[derive(Debug, Default)]
pub struct Registry {
    endpoints: Vec<(String, Arc<EndpointConfig>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one endpoint. Fails at definition time, before any request
    /// is served, when the configuration is unusable.
    pub fn register(&mut self, config: EndpointConfig) -> Result<(), Error> {
        let route = config.route_name();
        if self.endpoints.iter().any(|(name, _)| *name == route) {
            return Err(Error::DuplicateRoute(route));
        }

        tracing::debug!("Registered endpoint /{} for entity {}", route, config.entity);
        self.endpoints.push((route, Arc::new(config)));
        Ok(())
    }

    pub fn from_decls(decls: Vec<EndpointDecl>) -> Result<Self, Error> {
        let mut registry = Self::new();
        for decl in decls {
            registry.register(decl.into_config()?)?;
        }
        Ok(registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<EndpointConfig>)> {
        self.endpoints
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Default serialization: one flat object per record with `id` (stringified),
/// `label` and `value` (both the display field), then every search column
/// and extra field under its own name. Accessing a field the record does not
/// carry is a runtime error that propagates to the host error path.
pub fn serialize_records(records: &[Record], config: &EndpointConfig) -> Result<Value, Error> {
    let mut out = Vec::with_capacity(records.len());

    for record in records {
        let id = record
            .id()
            .ok_or_else(|| Error::UnknownField(ID_FIELD.to_string()))?;
        let display = record
            .get(&config.display_value)
            .ok_or_else(|| Error::UnknownField(config.display_value.clone()))?;

        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), Value::String(display_text(id)));
        row.insert("label".to_string(), display.clone());
        row.insert("value".to_string(), display.clone());

        for field in config.columns.iter().chain(config.extra_data.iter()) {
            let value = record
                .get(field)
                .ok_or_else(|| Error::UnknownField(field.clone()))?;
            row.insert(field.clone(), value.clone());
        }

        out.push(Value::Object(row));
    }

    Ok(Value::Array(out))
}
