use std::collections::BTreeMap;

/// Metadata attached to a [`Block::MetaData`](super::Block::MetaData) node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    entries: BTreeMap<String, String>,
}

impl MetaData {
    /// Serialized reference of the document the content comes from.
    pub const SOURCE: &'static str = "source";
    /// Serialized reference against which relative references resolve.
    pub const BASE: &'static str = "base";
    /// Syntax the content was written in.
    pub const SYNTAX: &'static str = "syntax";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
