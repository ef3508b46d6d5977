//! Engine configuration lookup.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Boolean and string option lookup.
pub trait OptionSource {
    fn get_string(&self, key: &str) -> Option<String>;

    /// Reads a boolean option. Strings like `yes`, `1` or `off` are understood too.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_string(key)
            .and_then(|value| parse_bool(&value))
            .unwrap_or(default)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    String(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(value)
    }
}

/// In-memory options, usually read from a RON map like `{"override": false}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Applies a `key=value` assignment, as given on the command line.
    pub fn set_assignment(&mut self, assignment: &str) -> Result<()> {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("Expected an option in the form key=value, got {:?}", assignment);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Option name is empty in {:?}", assignment);
        }
        self.set(key, value.trim());
        Ok(())
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        let options: Options = ron::from_str(source).context("Parsing options")?;
        // keys are case-insensitive
        Ok(options
            .values
            .into_iter()
            .fold(Options::new(), |mut options, (key, value)| {
                options.set(key, value);
                options
            }))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Reading options from {:?}", path))?;
        Self::from_ron(&source).with_context(|| format!("Parsing options from {:?}", path))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl OptionSource for Options {
    fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(&key.to_ascii_lowercase())? {
            OptionValue::Bool(value) => Some(value.to_string()),
            OptionValue::String(value) => Some(value.clone()),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(&key.to_ascii_lowercase()) {
            Some(OptionValue::Bool(value)) => *value,
            Some(OptionValue::String(value)) => parse_bool(value).unwrap_or(default),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OptionSource as _, Options};

    #[test]
    fn lookup() {
        let mut options = Options::new();
        options.set("ShowFPS", true);
        options.set_assignment("override = no").unwrap();
        options.set_assignment("language=french").unwrap();

        assert!(options.get_bool("showfps", false));
        assert!(!options.get_bool("override", true));
        assert!(options.get_bool("missing", true));
        assert!(options.get_bool("language", true));
        assert_eq!(options.get_string("LANGUAGE").as_deref(), Some("french"));
        assert_eq!(options.get_string("showfps").as_deref(), Some("true"));

        assert!(options.set_assignment("novalue").is_err());
        assert!(options.set_assignment("=x").is_err());
    }

    #[test]
    fn from_ron() {
        let options = Options::from_ron(r#"{"Override": false, "language": "german"}"#).unwrap();
        assert_eq!(options.len(), 2);
        assert!(!options.get_bool("override", true));
        assert_eq!(options.get_string("language").as_deref(), Some("german"));

        assert!(Options::from_ron("[1, 2]").is_err());
    }
}
