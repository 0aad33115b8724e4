//! Database models
//!
//! Terms live in exactly one vocabulary and carry at most one parent. A term
//! with no parent is root-level; [`ROOT_PARENT`] is used wherever a parent id
//! is required and the term has none.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Term identifier (SQLite rowid)
pub type TermId = i64;

/// Vocabulary identifier (SQLite rowid)
pub type VocabularyId = i64;

/// Parent id meaning "no parent"
pub const ROOT_PARENT: TermId = 0;

/// A named collection of terms forming one taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub id: VocabularyId,
    pub machine_name: String,
    pub name: String,
    pub description: String,
}

/// Derive the stable machine key for a vocabulary display name
///
/// Lowercases the name and collapses every run of characters outside
/// `[a-z0-9_]` into a single `_`.
pub fn machine_name(display_name: &str) -> String {
    let mut key = String::with_capacity(display_name.len());
    let mut in_run = false;

    for c in display_name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            key.push(c);
            in_run = false;
        } else if !in_run {
            key.push('_');
            in_run = true;
        }
    }

    key
}

/// Declared kind of a custom field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Geolocation,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Geolocation => "geolocation",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(FieldKind::Text),
            "number" => Ok(FieldKind::Number),
            "geolocation" | "geo" => Ok(FieldKind::Geolocation),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown field kind '{}' (expected text, number or geolocation)",
                other
            ))),
        }
    }
}

/// Declared custom fields of one vocabulary: field name -> kind
pub type FieldSchema = BTreeMap<String, FieldKind>;

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Value of a custom field
///
/// Stored as JSON: geolocation as `{"lat":..,"lng":..}`, numbers as JSON
/// numbers, text as JSON strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Geo(GeoPoint),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Compare two values the way a re-import should
    ///
    /// Geolocation pairs are equal only when both coordinates match. Text and
    /// numbers compare numerically when the text parses as a number.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Geo(a), FieldValue::Geo(b)) => a.lat == b.lat && a.lng == b.lng,
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Number(n), FieldValue::Text(t))
            | (FieldValue::Text(t), FieldValue::Number(n)) => {
                t.trim().parse::<f64>().map(|parsed| parsed == *n).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Text content, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to the declared kind; `None` when the value does not fit
    pub fn coerce(self, kind: FieldKind) -> Option<FieldValue> {
        match (kind, self) {
            (FieldKind::Text, FieldValue::Text(s)) => Some(FieldValue::Text(s)),
            (FieldKind::Text, FieldValue::Number(n)) => Some(FieldValue::Text(n.to_string())),
            (FieldKind::Text, FieldValue::Geo(g)) => Some(FieldValue::Text(g.to_string())),
            (FieldKind::Number, FieldValue::Number(n)) => Some(FieldValue::Number(n)),
            (FieldKind::Number, FieldValue::Text(s)) => {
                s.trim().parse::<f64>().ok().map(FieldValue::Number)
            }
            (FieldKind::Number, FieldValue::Geo(_)) => None,
            (FieldKind::Geolocation, FieldValue::Geo(g)) => Some(FieldValue::Geo(g)),
            (FieldKind::Geolocation, FieldValue::Text(s)) => parse_geo_text(&s).map(FieldValue::Geo),
            (FieldKind::Geolocation, FieldValue::Number(_)) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Geo(g) => write!(f, "{}", g),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<GeoPoint> for FieldValue {
    fn from(value: GeoPoint) -> Self {
        FieldValue::Geo(value)
    }
}

/// Parse `"lat,lng"` (whitespace tolerant)
fn parse_geo_text(text: &str) -> Option<GeoPoint> {
    let (lat, lng) = text.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    Some(GeoPoint::new(lat, lng))
}

/// A persisted taxonomy term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub vocabulary_id: VocabularyId,
    pub name: String,
    pub description: String,
    /// Parent term ids; empty for root-level terms
    pub parents: Vec<TermId>,
    /// Custom field values keyed by declared field name
    pub fields: BTreeMap<String, FieldValue>,
}

impl Term {
    pub fn is_root(&self) -> bool {
        self.parents.iter().all(|p| *p == ROOT_PARENT)
    }
}

/// A term about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewTerm {
    pub vocabulary_id: VocabularyId,
    pub name: String,
    pub description: String,
    /// [`ROOT_PARENT`] for a root-level term
    pub parent_id: TermId,
    pub fields: BTreeMap<String, FieldValue>,
}
