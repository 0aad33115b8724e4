//! Row decoders
//!
//! Turn a CSV or XML source into the ordered row sequence the import engine
//! consumes. Decoding failures are fatal and surface before any term is
//! touched.

mod csv_decoder;
mod xml_decoder;

pub use csv_decoder::decode_csv;
pub use xml_decoder::decode_xml;

use crate::error::{ImportError, ImportResult};
use crate::rows::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xml,
}

impl SourceFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse().map_err(|_| {
            ImportError::UnsupportedFormat(format!(
                "cannot infer format from '{}', pass --format csv|xml",
                path.display()
            ))
        })
    }
}

impl FromStr for SourceFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" | "txt" => Ok(SourceFormat::Csv),
            "xml" => Ok(SourceFormat::Xml),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Rows decoded from one source
#[derive(Debug, Clone, Default)]
pub struct DecodedRows {
    /// Rows with a non-empty name, in source order
    pub rows: Vec<Row>,
    /// Lines of records dropped for lacking a name
    pub dropped_lines: Vec<usize>,
}

impl DecodedRows {
    /// Keep named rows, remember the rest; reject an empty result
    pub(crate) fn from_candidates(candidates: Vec<Row>) -> ImportResult<Self> {
        let mut decoded = DecodedRows::default();

        for row in candidates {
            if row.name().is_empty() {
                warn!(line = row.line, "Dropping record without a name");
                decoded.dropped_lines.push(row.line);
            } else {
                decoded.rows.push(row);
            }
        }

        if decoded.rows.is_empty() {
            return Err(ImportError::EmptyInput);
        }

        Ok(decoded)
    }
}

/// Decode source text in the given format
pub fn decode_str(content: &str, format: SourceFormat) -> ImportResult<DecodedRows> {
    if content.trim().is_empty() {
        return Err(ImportError::EmptyInput);
    }

    match format {
        SourceFormat::Csv => decode_csv(content.as_bytes()),
        SourceFormat::Xml => decode_xml(content),
    }
}

/// Read and decode a file; the format defaults to the file extension
pub fn decode_file(path: &Path, format: Option<SourceFormat>) -> ImportResult<DecodedRows> {
    let format = match format {
        Some(format) => format,
        None => SourceFormat::from_path(path)?,
    };

    let content = std::fs::read_to_string(path)?;
    let decoded = decode_str(&content, format)?;

    info!(
        "Decoded {} rows from {} ({} dropped)",
        decoded.rows.len(),
        path.display(),
        decoded.dropped_lines.len()
    );

    Ok(decoded)
}
