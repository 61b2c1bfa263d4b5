//! CSV reading and writing of time-indexed tables.
//!
//! Layout: a header row, then one row per timestamp. The first column is the
//! timestamp (RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` taken as UTC, or integer
//! epoch milliseconds); every further column is a channel. Empty cells and
//! `NaN`/`null` become missing values. Rows are sorted on load; repeated
//! timestamps keep their first row.
//!
//! The writer always emits RFC 3339 timestamps with millisecond precision.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::processing::ProcessingError;
use crate::types::{Table, Timestamp};

/// Errors while loading or saving a table.
#[derive(Error, Debug)]
pub enum TableIoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}: no header row")]
    MissingHeader(String),

    #[error("{source_name}: no valid rows ({errors} rejected)")]
    NoRows { source_name: String, errors: usize },

    #[error(transparent)]
    Table(#[from] ProcessingError),
}

// ============================================================================
// Field parsing
// ============================================================================

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

fn csv_quote(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parse a timestamp cell into epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    None
}

/// RFC 3339 rendering in UTC with milliseconds.
pub fn format_timestamp(ts: Timestamp) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ts) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ts.to_string(),
    }
}

/// Parse a value cell. Blank and textual missing markers become `NaN`.
fn parse_value(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if s.is_empty()
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("na")
    {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .map_err(|_| format!("cannot parse value '{s}'"))
}

fn parse_row(line: &str, width: usize) -> Result<(Timestamp, Vec<f64>), String> {
    let fields = csv_split(line);
    if fields.len() != width {
        return Err(format!("expected {} fields, found {}", width, fields.len()));
    }
    let ts = parse_timestamp(&fields[0])
        .ok_or_else(|| format!("cannot parse timestamp '{}'", fields[0].trim()))?;
    let values = fields[1..]
        .iter()
        .map(|f| parse_value(f))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((ts, values))
}

// ============================================================================
// Reading
// ============================================================================

/// Read a table from any buffered reader. `source_name` only labels errors
/// and log lines.
pub fn parse_table(reader: impl BufRead, source_name: &str) -> Result<Table, TableIoError> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(Ok(line)) => line,
        Some(Err(e)) => {
            return Err(TableIoError::Io {
                path: PathBuf::from(source_name),
                source: e,
            })
        }
        None => return Err(TableIoError::MissingHeader(source_name.to_string())),
    };
    let header = header.trim_start_matches('\u{feff}');
    let columns: Vec<String> = csv_split(header)
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();
    let width = columns.len();

    let mut rows: Vec<(Timestamp, Vec<f64>)> = Vec::new();
    let mut errors = 0usize;
    for (offset, line) in lines.enumerate() {
        let line_num = offset + 2;
        let line = line.map_err(|e| TableIoError::Io {
            path: PathBuf::from(source_name),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(&line, width) {
            Ok(row) => rows.push(row),
            Err(e) => {
                if errors < 10 {
                    tracing::warn!(source = source_name, line = line_num, error = %e, "Skipping row");
                }
                errors += 1;
            }
        }
    }

    if rows.is_empty() {
        return Err(TableIoError::NoRows {
            source_name: source_name.to_string(),
            errors,
        });
    }

    rows.sort_by_key(|(ts, _)| *ts);
    let before = rows.len();
    rows.dedup_by_key(|(ts, _)| *ts);
    if rows.len() < before {
        tracing::warn!(
            source = source_name,
            dropped = before - rows.len(),
            "Dropped rows with repeated timestamps"
        );
    }

    let index: Vec<Timestamp> = rows.iter().map(|(ts, _)| *ts).collect();
    let mut table = Table::new(index)?;
    for (k, name) in columns.iter().enumerate().skip(1) {
        let channel: Vec<f64> = rows.iter().map(|(_, values)| values[k - 1]).collect();
        table.insert(name.as_str(), channel)?;
    }

    tracing::info!(
        source = source_name,
        rows = table.len(),
        channels = width - 1,
        rejected = errors,
        "Table loaded"
    );
    Ok(table)
}

/// Read a CSV file into a table.
pub fn read_table(path: &Path) -> Result<Table, TableIoError> {
    let file = File::open(path).map_err(|e| TableIoError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_table(BufReader::new(file), &path.display().to_string())
}

// ============================================================================
// Writing
// ============================================================================

/// Write `table` as CSV to any writer.
pub fn write_table_to(table: &Table, mut writer: impl Write) -> std::io::Result<()> {
    let names: Vec<&str> = table.channel_names().collect();
    let mut header = String::from("timestamp");
    for name in &names {
        header.push(',');
        header.push_str(&csv_quote(name));
    }
    writeln!(writer, "{header}")?;

    let channels: Vec<&[f64]> = table.channels().map(|(_, values)| values).collect();
    for (row, &ts) in table.index().iter().enumerate() {
        let mut line = format_timestamp(ts);
        for values in &channels {
            line.push(',');
            let v = values[row];
            if v.is_finite() {
                line.push_str(&v.to_string());
            }
        }
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

/// Write `table` to a CSV file.
pub fn write_table(table: &Table, path: &Path) -> Result<(), TableIoError> {
    let file = File::create(path).map_err(|e| TableIoError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_table_to(table, BufWriter::new(file)).map_err(|e| TableIoError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp("1500"), Some(1_500));
        assert_eq!(parse_timestamp("1970-01-01T00:00:01.250Z"), Some(1_250));
        assert_eq!(parse_timestamp("1970-01-01 00:00:02"), Some(2_000));
        assert_eq!(parse_timestamp("1970-01-01T01:00:00+01:00"), Some(0));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(format_timestamp(1_250), "1970-01-01T00:00:01.250Z");
    }

    #[test]
    fn test_csv_split_quotes() {
        assert_eq!(csv_split("a,\"b,c\",d"), vec!["a", "b,c", "d"]);
        assert_eq!(csv_split("\"x \"\"y\"\"\",1"), vec!["x \"y\"", "1"]);
    }

    #[test]
    fn test_parse_sorts_and_marks_gaps() {
        let csv = "timestamp,East-West inclination,Temperature\n\
                   2000,0.5,\n\
                   1000,0.25,12.5\n\
                   3000,NaN,13.0\n\
                   bad,1.0,1.0\n";
        let table = parse_table(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.index(), &[1_000, 2_000, 3_000]);
        let ew = table.get("East-West inclination").unwrap();
        assert_eq!(ew[0], 0.25);
        assert!(ew[2].is_nan());
        assert!(table.get("Temperature").unwrap()[1].is_nan());
    }

    #[test]
    fn test_duplicate_timestamps_keep_first() {
        let csv = "t,x\n1000,1.0\n1000,2.0\n2000,3.0\n";
        let table = parse_table(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.index(), &[1_000, 2_000]);
        assert_eq!(table.get("x").unwrap()[0], 1.0);
    }

    #[test]
    fn test_empty_input_errors() {
        assert!(matches!(
            parse_table("".as_bytes(), "inline"),
            Err(TableIoError::MissingHeader(_))
        ));
        assert!(matches!(
            parse_table("t,x\n".as_bytes(), "inline"),
            Err(TableIoError::NoRows { .. })
        ));
    }

    #[test]
    fn test_written_table_reads_back() {
        let table = Table::new(vec![0, 50, 100])
            .unwrap()
            .with_channel("a, quoted", vec![1.5, f64::NAN, -2.0])
            .unwrap();
        let mut buf = Vec::new();
        write_table_to(&table, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("timestamp,\"a, quoted\"\n1970-01-01T00:00:00.000Z,1.5\n"));

        let back = parse_table(buf.as_slice(), "inline").unwrap();
        assert_eq!(back.index(), table.index());
        let a = back.get("a, quoted").unwrap();
        assert_eq!(a[0], 1.5);
        assert!(a[1].is_nan());
    }
}
