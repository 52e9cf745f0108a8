//! Textual encoding of values, records and batches
//!
//! The same decimal text serves two purposes:
//! - Wire payloads between `ShareTransport` and `ShareSink`: a value, a
//!   record (fields joined by `,`) or a batch (one record per line), every
//!   line terminated by `\n`. There is no framing; the sender closes the
//!   connection to mark the end of the payload.
//! - Record files at the input/output boundary: the same lines, preceded
//!   by an optional header line naming the fields.
//!
//! # Examples
//!
//! ```rust
//! use splitshare::codec::{encode_record, parse_batch, render_batch};
//! use splitshare::domain::{Record, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let record: Record = vec![Value::from_i64(10), "20.5".parse()?].into();
//! assert_eq!(&encode_record(&record)[..], b"10,20.5\n");
//!
//! let batch = parse_batch("X_START,Y_START\n1.0,2.0\n3,4\n")?;
//! assert_eq!(batch.header().map(<[String]>::len), Some(2));
//! assert_eq!(batch.len(), 2);
//! assert_eq!(render_batch(&batch), "X_START,Y_START\n1.0,2.0\n3,4\n");
//! # Ok(())
//! # }
//! ```

use std::fmt::Write as _;

use zeroize::Zeroizing;

use crate::domain::{Batch, Record, Value};
use crate::error::{Result, SplitShareError};

/// Field separator for records
pub const FIELD_SEPARATOR: char = ',';

/// Encodes a single value as one newline-terminated line
#[must_use]
pub fn encode_value(value: &Value) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(format!("{value}\n").into_bytes())
}

/// Encodes a record as one newline-terminated line
#[must_use]
pub fn encode_record(record: &Record) -> Zeroizing<Vec<u8>> {
    let mut line = Zeroizing::new(String::new());
    push_record(&mut line, record);
    Zeroizing::new(line.as_bytes().to_vec())
}

/// Encodes every record of a batch, one line each, without the header
#[must_use]
pub fn encode_batch(batch: &Batch) -> Zeroizing<Vec<u8>> {
    let mut text = Zeroizing::new(String::new());
    for record in batch.records() {
        push_record(&mut text, record);
    }
    Zeroizing::new(text.as_bytes().to_vec())
}

/// Renders a batch as record-file text, header first
#[must_use]
pub fn render_batch(batch: &Batch) -> String {
    let mut text = String::new();
    if let Some(header) = batch.header() {
        text.push_str(&header.join(","));
        text.push('\n');
    }
    for record in batch.records() {
        push_record(&mut text, record);
    }
    text
}

fn push_record(out: &mut String, record: &Record) {
    for (idx, value) in record.iter().enumerate() {
        if idx > 0 {
            out.push(FIELD_SEPARATOR);
        }
        // Writing into a String cannot fail
        let _ = write!(out, "{value}");
    }
    out.push('\n');
}

/// Parses one record line; `line_no` is 1-based and only used in errors
///
/// # Errors
/// Returns `InvalidArgument` naming the line and field that failed
pub fn parse_record_line(line: &str, line_no: usize) -> Result<Record> {
    split_fields(line)
        .enumerate()
        .map(|(idx, field)| {
            field.parse::<Value>().map_err(|e| match e {
                SplitShareError::InvalidArgument(msg) => SplitShareError::invalid(format!(
                    "line {line_no}, field {}: {msg}",
                    idx + 1
                )),
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Record::new)
}

/// Whether a record file starts with a header line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderPolicy {
    /// Header only when no field of the first line is numeric
    #[default]
    Detect,
    /// The first non-blank line is always the header
    Present,
    /// Every line is a record
    Absent,
}

/// Parses record-file text into a batch, detecting the header line
///
/// # Errors
/// Returns `InvalidArgument` for a malformed record line
pub fn parse_batch(text: &str) -> Result<Batch> {
    parse_batch_with(text, HeaderPolicy::Detect)
}

/// Parses record-file text into a batch
///
/// Blank lines are skipped. Under [`HeaderPolicy::Detect`] a first line
/// mixing numeric and non-numeric fields is a malformed record, never a
/// header.
///
/// # Errors
/// Returns `InvalidArgument` for a malformed record line
pub fn parse_batch_with(text: &str, policy: HeaderPolicy) -> Result<Batch> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
        .peekable();

    let has_header = match (policy, lines.peek()) {
        (_, None) | (HeaderPolicy::Absent, _) => false,
        (HeaderPolicy::Present, Some(_)) => true,
        (HeaderPolicy::Detect, Some((_, first))) => {
            split_fields(first).all(|f| f.parse::<Value>().is_err())
        }
    };
    let header: Option<Vec<String>> = if has_header {
        lines
            .next()
            .map(|(_, first)| split_fields(first).map(str::to_string).collect())
    } else {
        None
    };

    let records = lines
        .map(|(line_no, line)| parse_record_line(line, line_no))
        .collect::<Result<Vec<_>>>()?;

    Ok(match header {
        Some(header) => Batch::with_header(header, records),
        None => Batch::new(records),
    })
}

/// Parses a wire payload back into records, header-free
///
/// # Errors
/// Returns `InvalidArgument` if the payload is not UTF-8 or not numeric
pub fn decode_payload(bytes: &[u8]) -> Result<Vec<Record>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| SplitShareError::invalid(format!("payload is not UTF-8: {e}")))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_record_line(line, idx + 1))
        .collect()
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(FIELD_SEPARATOR)
        .map(|field| field.trim().trim_matches('"').trim())
}
