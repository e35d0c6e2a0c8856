use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::config::{Direction, EndpointConfig, OrderSpec};
use crate::error::Error;
use crate::store::{MemoryStore, Record, ID_FIELD};

/// Request-scoped inputs a collection resolver may inspect. Currently the
/// query-string parameters of the incoming request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Runs an autocomplete query against the store.
///
/// A blank term short-circuits to an empty result before the store is
/// touched. Otherwise: resolve the collection, apply scopes in declared
/// order, keep records where any search column matches the lower-cased
/// term (prefix by default, substring when `full`), intersect the `where`
/// equality filter, sort, truncate to the limit, and project down to
/// {id, columns, extra_data} unless `full_model` is set.
pub fn run(
    store: &MemoryStore,
    ctx: &RequestContext,
    config: &EndpointConfig,
    term: &str,
) -> Result<Vec<Record>, Error> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let name = config.source.resolve(ctx);
    let collection = store
        .collection(&name)
        .ok_or_else(|| Error::UnknownCollection(name.clone()))?;

    let mut records: Vec<&Record> = collection.records().iter().collect();

    for scope in &config.scopes {
        let pred = collection.scope(scope).ok_or_else(|| Error::UnknownScope {
            collection: name.clone(),
            scope: scope.clone(),
        })?;
        records.retain(|record| pred(record));
    }

    let needle = term.to_lowercase();
    records.retain(|record| {
        config
            .columns
            .iter()
            .any(|column| matches_column(record, column, &needle, config.full))
    });

    for (field, expected) in &config.filter {
        records.retain(|record| record.get(field) == Some(expected));
    }

    sort_records(&mut records, &config.order);
    records.truncate(config.limit);

    if config.full_model {
        return Ok(records.into_iter().cloned().collect());
    }

    let mut fields: HashSet<&str> = HashSet::new();
    fields.insert(ID_FIELD);
    fields.extend(config.columns.iter().map(String::as_str));
    fields.extend(config.extra_data.iter().map(String::as_str));

    Ok(records.into_iter().map(|r| r.project(&fields)).collect())
}

fn matches_column(record: &Record, column: &str, needle: &str, full: bool) -> bool {
    let Some(value) = record.get(column) else {
        return false;
    };
    let haystack = display_text(value).to_lowercase();
    if full {
        haystack.contains(needle)
    } else {
        haystack.starts_with(needle)
    }
}

/// Textual form of a field value, as matched and serialized. Strings pass
/// through, null becomes empty, everything else uses its JSON rendering.
pub(crate) fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn sort_records(records: &mut Vec<&Record>, order: &OrderSpec) {
    records.sort_by(|a, b| {
        let ordering = compare_values(a.get(&order.column), b.get(&order.column));
        match order.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    });
}

/// Missing fields sort first; numbers compare numerically, everything else
/// compares as case-insensitive text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => display_text(a)
                .to_lowercase()
                .cmp(&display_text(b).to_lowercase()),
        },
    }
}
