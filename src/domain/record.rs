//! Records, batches and share pairs

use zeroize::Zeroizing;

use super::Value;
use crate::error::{Result, SplitShareError};

/// Field names of a four-field coordinate record
pub const COORDINATE_HEADER: [&str; 4] = ["X_START", "Y_START", "X_END", "Y_END"];

/// Two shares of one value: `share_a = value - mask`, `share_b = mask`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharePair {
    pub share_a: Value,
    pub share_b: Value,
}

/// Fixed-arity row of values
///
/// Field storage is wiped on drop, so shares handed to the transport do not
/// linger in freed memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record(Zeroizing<Vec<Value>>);

impl Record {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(Zeroizing::new(values))
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self::new(Vec::with_capacity(capacity))
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for Record {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The two position-aligned halves of a split record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRecordPair {
    pub record_a: Record,
    pub record_b: Record,
}

/// Ordered sequence of records with an optional header naming the fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    header: Option<Vec<String>>,
    records: Vec<Record>,
}

impl Batch {
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            header: None,
            records,
        }
    }

    #[must_use]
    pub fn with_header(header: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            header: Some(header),
            records,
        }
    }

    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Checks that every record has the batch's arity and returns it
    ///
    /// The header, when present, defines the arity; otherwise the first
    /// record does. An empty batch without header has arity 0.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` naming the first offending record
    pub fn checked_arity(&self) -> Result<usize> {
        let expected = match (&self.header, self.records.first()) {
            (Some(header), _) => header.len(),
            (None, Some(first)) => first.arity(),
            (None, None) => return Ok(0),
        };
        if let Some((index, record)) = self
            .records
            .iter()
            .enumerate()
            .find(|(_, record)| record.arity() != expected)
        {
            return Err(SplitShareError::SchemaMismatch {
                index,
                expected,
                got: record.arity(),
            });
        }
        Ok(expected)
    }
}
