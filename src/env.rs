use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Environment variables captured from a toolchain setup script.
///
/// Names compare case-insensitively, as they do on Windows. Iteration is
/// sorted by the case-folded name; the spelling of the most recent insert
/// is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentTable {
    vars: BTreeMap<String, (String, String)>,
}

impl EnvironmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.vars.insert(fold(&name), (name, value.into()));
    }

    /// Parse one `NAME=VALUE` line and insert it.
    ///
    /// Returns false, leaving the table untouched, for blank lines and lines
    /// without a name before the first `=`.
    pub fn add_line(&mut self, line: &str) -> bool {
        match parse_line(line) {
            Some((name, value)) => {
                self.insert(name, value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(&fold(name)).map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Overlay every entry of `other` onto this table.
    pub fn extend_from(&mut self, other: &EnvironmentTable) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Render as `NAME=VALUE` lines, the format `set` prints.
    pub fn to_set_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = EnvironmentTable::new();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}

impl Serialize for EnvironmentTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Build a table from `set`-style output lines; later names win.
pub fn parse_env_lines<I, S>(lines: I) -> EnvironmentTable
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut table = EnvironmentTable::new();
    for line in lines {
        table.add_line(line.as_ref());
    }
    table
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (name, value) = line.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

fn fold(name: &str) -> String {
    name.to_ascii_uppercase()
}
