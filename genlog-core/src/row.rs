//! Delimited-text encoding of log rows.
//!
//! Rows are written with the `csv` crate using the usual quoting rules: a
//! field is quoted only if it contains the delimiter, a quote, or a line
//! terminator, and embedded quotes are doubled. Field order is fixed:
//! `timestamp, user, artifact_name, prompt`.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::{LOG_HEADER, LogEntry};

const BOM: char = '\u{feff}';

// ============================================================================
// Line Terminators
// ============================================================================

/// Line terminator used within one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTerminator {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineTerminator {
    /// Returns the terminator text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// Picks the terminator an existing table already uses.
    ///
    /// Only the end of the first line counts. The header never contains
    /// quoted line breaks, while prompts further down may.
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(idx) if text[..idx].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }

    fn to_csv(self) -> csv::Terminator {
        match self {
            Self::Lf => csv::Terminator::Any(b'\n'),
            Self::CrLf => csv::Terminator::CRLF,
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

fn write_record(fields: [&str; 4], terminator: LineTerminator) -> Result<String, CoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(terminator.to_csv())
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| CoreError::Other(format!("flushing row buffer: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CoreError::InvalidData(e.to_string()))
}

/// The header line, terminated.
///
/// # Errors
///
/// Only fails if the in-memory writer fails.
pub fn header_line(terminator: LineTerminator) -> Result<String, CoreError> {
    write_record(LOG_HEADER, terminator)
}

/// Serializes one entry as a terminated row.
///
/// # Errors
///
/// Only fails if the in-memory writer fails.
pub fn serialize_row(entry: &LogEntry, terminator: LineTerminator) -> Result<String, CoreError> {
    let timestamp = entry.timestamp_text();
    write_record(
        [&timestamp, entry.user(), entry.artifact_name(), entry.prompt()],
        terminator,
    )
}

/// Content of a freshly created table: header plus one row.
///
/// # Errors
///
/// Only fails if the in-memory writer fails.
pub fn new_table_content(entry: &LogEntry, terminator: LineTerminator) -> Result<String, CoreError> {
    let mut content = header_line(terminator)?;
    content.push_str(&serialize_row(entry, terminator)?);
    Ok(content)
}

/// Appends one row to existing table text.
///
/// The row uses whatever terminator the table already uses. If the existing
/// text does not end with a terminator one is added first. A table that holds
/// nothing but an optional byte-order mark and blank lines gets its header
/// back.
///
/// # Errors
///
/// Only fails if the in-memory writer fails.
pub fn append_row(existing: &str, entry: &LogEntry) -> Result<String, CoreError> {
    let terminator = LineTerminator::detect(existing);
    let body = existing.strip_prefix(BOM).unwrap_or(existing);

    if body.trim_matches(['\r', '\n']).is_empty() {
        let mut content = String::new();
        if existing.starts_with(BOM) {
            content.push(BOM);
        }
        content.push_str(&new_table_content(entry, terminator)?);
        return Ok(content);
    }

    let row = serialize_row(entry, terminator)?;
    let mut content = String::with_capacity(existing.len() + row.len() + 2);
    content.push_str(existing);
    if !existing.ends_with(['\n', '\r']) {
        content.push_str(terminator.as_str());
    }
    content.push_str(&row);
    Ok(content)
}

/// True if the first line of `text` is the log header.
pub fn has_header(text: &str) -> bool {
    let body = text.strip_prefix(BOM).unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => record.iter().eq(LOG_HEADER.iter().copied()),
        _ => false,
    }
}

// ============================================================================
// Reading
// ============================================================================

fn entry_from_record(record: &csv::StringRecord) -> Result<LogEntry, CoreError> {
    if record.len() != LOG_HEADER.len() {
        return Err(CoreError::InvalidData(format!(
            "expected {} fields, found {}",
            LOG_HEADER.len(),
            record.len()
        )));
    }

    let timestamp = DateTime::parse_from_rfc3339(&record[0])
        .map_err(|e| CoreError::InvalidData(format!("bad timestamp {:?}: {e}", &record[0])))?
        .with_timezone(&Utc);

    Ok(LogEntry::new(timestamp, &record[1], &record[2], &record[3]))
}

/// Parses a single serialized row (with or without its terminator).
///
/// # Errors
///
/// Returns `CoreError::InvalidData` if the text is not exactly one row of four
/// fields with an RFC 3339 timestamp.
pub fn parse_row(text: &str) -> Result<LogEntry, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let record = records
        .next()
        .ok_or_else(|| CoreError::InvalidData("empty row".to_string()))??;
    if records.next().is_some() {
        return Err(CoreError::InvalidData("more than one row".to_string()));
    }
    entry_from_record(&record)
}

/// Parses a whole table, skipping the header line if present.
///
/// # Errors
///
/// Returns an error on the first malformed row.
pub fn parse_table(text: &str) -> Result<Vec<LogEntry>, CoreError> {
    let body = text.strip_prefix(BOM).unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if index == 0 && record.iter().eq(LOG_HEADER.iter().copied()) {
            continue;
        }
        entries.push(entry_from_record(&record)?);
    }
    Ok(entries)
}
