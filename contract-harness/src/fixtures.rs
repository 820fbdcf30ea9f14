use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named values captured by one step and read by later steps of the same
/// scenario run.
///
/// The [`ScenarioRunner`](crate::ScenarioRunner) allocates a fresh store for
/// every run and drops it when the run ends, so nothing leaks between
/// scenarios.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureStore {
    values: BTreeMap<String, Value>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the fixture on first write, overwrites it afterwards.
    pub fn set<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) {
        let name = name.into();
        tracing::trace!(fixture = %name, "fixture set");
        self.values.insert(name, value.into());
    }

    pub fn get<S: AsRef<str>>(&self, name: S) -> Result<&Value> {
        self.values
            .get(name.as_ref())
            .ok_or_else(|| Error::FixtureNotFound(name.as_ref().into()))
    }

    pub fn get_str<S: AsRef<str>>(&self, name: S) -> Result<&str> {
        self.get(name.as_ref())?
            .as_str()
            .ok_or_else(|| Error::FixtureType {
                name: name.as_ref().into(),
                expected: "string",
            })
    }

    /// Textual form used when a fixture is substituted into a URL, header or
    /// query value: strings verbatim, everything else as JSON.
    pub fn render<S: AsRef<str>>(&self, name: S) -> Result<String> {
        Ok(match self.get(name)? {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    pub fn contains<S: AsRef<str>>(&self, name: S) -> bool {
        self.values.contains_key(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FixtureStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = FixtureStore::new();
        for (name, value) in iter {
            store.set(name, value);
        }
        store
    }
}
