//! Decoded input rows
//!
//! A row is an ordered mapping of field name to [`FieldValue`]. Three keys are
//! reserved (`name`, `parent`, `description`); every other key is a candidate
//! custom field that the engine validates against the vocabulary schema.

use std::collections::BTreeMap;
use taxo_common::db::FieldValue;

pub const NAME_KEY: &str = "name";
pub const PARENT_KEY: &str = "parent";
pub const DESCRIPTION_KEY: &str = "description";

/// Keys that never become custom fields
pub const RESERVED_KEYS: [&str; 3] = [NAME_KEY, PARENT_KEY, DESCRIPTION_KEY];

/// One decoded input record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// 1-based source line (CSV record line or XML element line)
    pub line: usize,
    pub values: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Trimmed term name; empty when the row has none
    pub fn name(&self) -> String {
        self.text(NAME_KEY).unwrap_or_default()
    }

    /// Parent name, `None` for root-level rows
    pub fn parent(&self) -> Option<String> {
        self.text(PARENT_KEY)
    }

    /// Description, `None` when the row does not supply one
    pub fn description(&self) -> Option<String> {
        self.values.get(DESCRIPTION_KEY).map(|v| v.to_string())
    }

    /// Candidate custom fields: every non-reserved key, in key order
    pub fn custom_fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
    }

    fn text(&self, key: &str) -> Option<String> {
        let text = self.values.get(key)?.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxo_common::db::GeoPoint;

    #[test]
    fn test_reserved_keys_are_not_custom_fields() {
        let row = Row::new(2)
            .with("name", "Toronto")
            .with("parent", "Ontario")
            .with("description", "Provincial capital")
            .with("field_population", "2731571")
            .with("field_location", GeoPoint::new(43.7, -79.4));

        assert_eq!(row.name(), "Toronto");
        assert_eq!(row.parent().as_deref(), Some("Ontario"));
        assert_eq!(row.description().as_deref(), Some("Provincial capital"));

        let custom: Vec<&str> = row.custom_fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(custom, vec!["field_location", "field_population"]);
    }

    #[test]
    fn test_blank_parent_is_root() {
        let row = Row::new(1).with("name", " Ontario ").with("parent", "   ");
        assert_eq!(row.name(), "Ontario");
        assert_eq!(row.parent(), None);
        assert_eq!(row.description(), None);
    }
}
