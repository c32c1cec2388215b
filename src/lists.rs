//! Named lists referenced from filters as `$name`.

use std::collections::HashMap;

use crate::value::Value;

/// Source of named lists for `$name` references.
///
/// Lists are looked up on every evaluation, so a provider may be swapped
/// between evaluations (for example after reloading a blocklist) without
/// recompiling filters.
pub trait ListProvider: Send + Sync {
    /// Elements of the list called `name`, or `None` if there is no such list.
    fn list(&self, name: &str) -> Option<&[Value]>;
}

/// In-memory [`ListProvider`].
///
/// # Examples
///
/// ```
/// use sift_lang::{ListProvider, MemoryLists, Value};
///
/// let lists = MemoryLists::new()
///     .with_list("admins", vec![Value::from("alice"), Value::from("bob")]);
/// assert_eq!(lists.list("admins").map(|l| l.len()), Some(2));
/// assert!(lists.list("nobody").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLists {
    lists: HashMap<String, Vec<Value>>,
}

impl MemoryLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(mut self, name: impl Into<String>, items: Vec<Value>) -> Self {
        self.insert(name, items);
        self
    }

    /// Add or replace a list.
    pub fn insert(&mut self, name: impl Into<String>, items: Vec<Value>) {
        self.lists.insert(name.into(), items);
    }
}

impl ListProvider for MemoryLists {
    fn list(&self, name: &str) -> Option<&[Value]> {
        self.lists.get(name).map(Vec::as_slice)
    }
}
