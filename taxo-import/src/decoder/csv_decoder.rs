//! CSV decoder
//!
//! The first record is the header. A `name` column is mandatory; `parent` and
//! `description` are optional; every other column is passed through as a
//! candidate custom field. Header names are matched case-insensitively. Blank
//! cells are omitted so they never overwrite stored values.

use super::DecodedRows;
use crate::error::{ImportError, ImportResult};
use crate::rows::{Row, NAME_KEY};
use csv::{ReaderBuilder, Trim};
use std::io::Read;

/// Decode CSV from any reader
pub fn decode_csv<R: Read>(reader: R) -> ImportResult<DecodedRows> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::EmptyInput);
    }
    if !headers.iter().any(|h| h == NAME_KEY) {
        return Err(ImportError::MissingHeader(NAME_KEY.to_string()));
    }

    let mut candidates = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        // +2: 1-based, plus the header line
        let fallback_line = idx + 2;
        let record = result.map_err(|e| ImportError::Decode {
            line: e
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(fallback_line),
            message: e.to_string(),
        })?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        let mut row = Row::new(line);
        for (header, cell) in headers.iter().zip(record.iter()) {
            if header.is_empty() || cell.is_empty() {
                continue;
            }
            row.insert(header.clone(), cell);
        }
        candidates.push(row);
    }

    DecodedRows::from_candidates(candidates)
}
