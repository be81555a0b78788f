use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Field entries in submission order. Names may repeat; the last value wins
/// when the entries are flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Reads a form file. `.json` files hold a JSON object, anything else is TOML.
    /// Values must be scalars; numbers and booleans are kept in their textual form.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading form: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            let value: serde_json::Value =
                serde_json::from_str(&raw).with_context(|| "parsing form JSON")?;
            Self::from_json(&value)
        } else {
            let table: toml::Table = toml::from_str(&raw).with_context(|| "parsing form TOML")?;
            Self::from_toml(&table)
        }
    }

    fn from_json(value: &serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow!("form JSON must be an object"))?;
        let mut form = Self::new();
        for (name, v) in obj {
            let text = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => v.to_string(),
                _ => return Err(anyhow!("form field {name} is not a scalar")),
            };
            form.push(name.clone(), text);
        }
        Ok(form)
    }

    fn from_toml(table: &toml::Table) -> Result<Self> {
        let mut form = Self::new();
        for (name, v) in table {
            let text = match v {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                _ => return Err(anyhow!("form field {name} is not a scalar")),
            };
            form.push(name.clone(), text);
        }
        Ok(form)
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Parses a `name=value` override. The value may itself contain `=`.
    pub fn push_assignment(&mut self, raw: &str) -> Result<()> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("expected name=value, got: {raw}"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("empty field name in: {raw}"));
        }
        self.push(name, value);
        Ok(())
    }

    /// Latest value for `name`, if any entry carries it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of non-empty entries; stands in for user input events.
    pub fn filled_count(&self) -> u32 {
        self.entries.iter().filter(|(_, v)| !v.is_empty()).count() as u32
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (k, v) in &self.entries {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}
