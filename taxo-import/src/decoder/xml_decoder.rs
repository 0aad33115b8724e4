//! XML decoder
//!
//! Each element child of the document root is one row. A row's fields come
//! from its attributes and its element children (children win on conflict):
//!
//! ```xml
//! <terms>
//!   <term parent="Ontario">
//!     <name>Toronto</name>
//!     <field_location lat="43.7" lng="-79.4"/>
//!   </term>
//! </terms>
//! ```
//!
//! A field element carrying `lat`/`lng` (as attributes or child elements)
//! decodes to a geolocation pair.

use super::DecodedRows;
use crate::error::{ImportError, ImportResult};
use crate::rows::Row;
use roxmltree::{Document, Node};
use taxo_common::db::{FieldValue, GeoPoint};

/// Decode an XML document
pub fn decode_xml(content: &str) -> ImportResult<DecodedRows> {
    let doc = Document::parse(content)?;
    let root = doc.root_element();

    let mut candidates = Vec::new();

    for row_node in root.children().filter(|n| n.is_element()) {
        let line = doc.text_pos_at(row_node.range().start).row as usize;
        let mut row = Row::new(line);

        for attr in row_node.attributes() {
            let value = attr.value().trim();
            if !value.is_empty() {
                row.insert(attr.name().to_lowercase(), value);
            }
        }

        for field_node in row_node.children().filter(|n| n.is_element()) {
            let key = field_node.tag_name().name().to_lowercase();
            let field_line = doc.text_pos_at(field_node.range().start).row as usize;
            if let Some(value) = field_value(&field_node, field_line)? {
                row.insert(key, value);
            }
        }

        candidates.push(row);
    }

    DecodedRows::from_candidates(candidates)
}

/// Value of one field element; `None` for empty elements
fn field_value(node: &Node, line: usize) -> ImportResult<Option<FieldValue>> {
    if let (Some(lat), Some(lng)) = (coordinate(node, "lat"), coordinate(node, "lng")) {
        let parse = |name: &str, text: &str| {
            text.trim().parse::<f64>().map_err(|_| ImportError::Decode {
                line,
                message: format!(
                    "<{}> has non-numeric {} '{}'",
                    node.tag_name().name(),
                    name,
                    text
                ),
            })
        };
        let point = GeoPoint::new(parse("lat", &lat)?, parse("lng", &lng)?);
        return Ok(Some(FieldValue::Geo(point)));
    }

    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(FieldValue::Text(text.to_string())))
    }
}

/// Coordinate from an attribute or a same-named child element
fn coordinate(node: &Node, name: &str) -> Option<String> {
    if let Some(value) = node.attribute(name) {
        return Some(value.to_string());
    }
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
        .and_then(|c| c.text())
        .map(|t| t.to_string())
}
