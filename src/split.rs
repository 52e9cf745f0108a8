//! Additive splitting of values, records and batches
//!
//! Every value `v` becomes `(v - m, m)` with a fresh mask `m` drawn from
//! `[0, bound)`. Records are split field by field with independent masks,
//! and batches record by record, keeping both output batches aligned with
//! the input by index.

use tracing::debug;

use crate::domain::{Batch, MaskBound, Record, SharePair, SplitRecordPair, Value};
use crate::error::Result;
use crate::mask::MaskGenerator;

/// Splits one value into a share pair
#[derive(Debug, Clone, Default)]
pub struct ValueSplitter {
    masks: MaskGenerator,
}

impl ValueSplitter {
    #[must_use]
    pub fn new(masks: MaskGenerator) -> Self {
        Self { masks }
    }

    /// Splits `value` so that `share_a + share_b == value` exactly
    ///
    /// `share_a` may be negative or larger in magnitude than `value`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the subtraction overflows
    ///
    /// # Examples
    ///
    /// ```rust
    /// use splitshare::domain::{MaskBound, Value};
    /// use splitshare::mask::MaskGenerator;
    /// use splitshare::split::ValueSplitter;
    ///
    /// let mut splitter = ValueSplitter::new(MaskGenerator::seeded(3));
    /// let value: Value = "41.38".parse().unwrap();
    /// let pair = splitter.split(value, MaskBound::SMALL).unwrap();
    ///
    /// assert_eq!(pair.share_a.checked_add(pair.share_b).unwrap(), value);
    /// ```
    pub fn split(&mut self, value: Value, bound: MaskBound) -> Result<SharePair> {
        let share_b = Value::from(self.masks.next(bound));
        let share_a = value.checked_sub(share_b)?;
        Ok(SharePair { share_a, share_b })
    }
}

/// Splits every field of a record independently
#[derive(Debug, Clone, Default)]
pub struct RecordSplitter {
    values: ValueSplitter,
}

impl RecordSplitter {
    #[must_use]
    pub fn new(values: ValueSplitter) -> Self {
        Self { values }
    }

    /// Splits each field in order with its own mask
    ///
    /// An empty record yields two empty records.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if any field overflows
    pub fn split(&mut self, record: &Record, bound: MaskBound) -> Result<SplitRecordPair> {
        let mut record_a = Record::with_capacity(record.arity());
        let mut record_b = Record::with_capacity(record.arity());
        for &value in record {
            let pair = self.values.split(value, bound)?;
            record_a.push(pair.share_a);
            record_b.push(pair.share_b);
        }
        Ok(SplitRecordPair { record_a, record_b })
    }
}

/// Turns an input batch into two index-aligned share batches
#[derive(Debug, Clone, Default)]
pub struct BatchPipeline {
    records: RecordSplitter,
}

impl BatchPipeline {
    #[must_use]
    pub fn new(masks: MaskGenerator) -> Self {
        Self {
            records: RecordSplitter::new(ValueSplitter::new(masks)),
        }
    }

    /// Splits every record of `batch`, preserving order
    ///
    /// The arity of the whole batch is checked before any record is split,
    /// so a failing batch produces no output at all. Both output batches
    /// carry the input's header.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` for inconsistent arity and `InvalidArgument`
    /// for arithmetic overflow
    pub fn process(&mut self, batch: &Batch, bound: MaskBound) -> Result<(Batch, Batch)> {
        let arity = batch.checked_arity()?;
        debug!(records = batch.len(), arity, bound = *bound, "splitting batch");

        let mut records_a = Vec::with_capacity(batch.len());
        let mut records_b = Vec::with_capacity(batch.len());
        for record in batch.records() {
            let SplitRecordPair { record_a, record_b } = self.records.split(record, bound)?;
            records_a.push(record_a);
            records_b.push(record_b);
        }

        Ok(match batch.header() {
            Some(header) => (
                Batch::with_header(header.to_vec(), records_a),
                Batch::with_header(header.to_vec(), records_b),
            ),
            None => (Batch::new(records_a), Batch::new(records_b)),
        })
    }
}
