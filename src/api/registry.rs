//! Synthesized operation registry.
//!
//! One entry per schema endpoint, keyed by derived name. The registry is a
//! pure construction over a parsed schema; clients hold it behind an
//! `ArcSwap` so a schema refresh swaps the whole set in one step.

use std::collections::HashMap;

use serde_json::Value;

use super::naming::resolve_names;
use super::schema::{ApiFamily, Endpoint, ParsedSchema};
use super::transport::Payload;

#[derive(Debug, Clone)]
pub struct OperationEntry {
    pub name: String,
    pub endpoint: Endpoint,
}

#[derive(Debug)]
pub struct OperationRegistry {
    base_path: String,
    entries: Vec<OperationEntry>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn build(schema: ParsedSchema, family: ApiFamily) -> Self {
        let names = resolve_names(&schema.endpoints, family);
        let mut entries = Vec::with_capacity(names.len());
        let mut index = HashMap::with_capacity(names.len());
        for (name, endpoint) in names.into_iter().zip(schema.endpoints) {
            index.insert(name.clone(), entries.len());
            entries.push(OperationEntry { name, endpoint });
        }
        Self {
            base_path: schema.base_path,
            entries,
            index,
        }
    }

    pub fn get(&self, name: &str) -> Option<&OperationEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Operation names in schema document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Arguments for one operation call: path substitutions, a pass-through bag
/// of query pairs (insertion order preserved), and an optional body payload.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    path: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<Payload>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path.push((name.into(), value.to_string()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Payload::Json(body));
        self
    }

    pub fn xml(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Payload::Xml(body.into()));
        self
    }

    pub(crate) fn path_value(&self, name: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn has_query(&self, name: &str) -> bool {
        self.query.iter().any(|(key, _)| key == name)
    }

    pub(crate) fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub(crate) fn body(&self) -> Option<&Payload> {
        self.body.as_ref()
    }
}
