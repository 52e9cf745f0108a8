//! Property tests for mask generation and splitting

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use splitshare::domain::{Batch, MAX_SCALE, MaskBound, Record, Value};
use splitshare::mask::MaskGenerator;
use splitshare::split::{BatchPipeline, RecordSplitter, ValueSplitter};

/// Wrapper for decimal values within a realistic coordinate range
#[derive(Clone, Debug)]
struct AnyValue(Value);

impl Arbitrary for AnyValue {
    fn arbitrary(g: &mut Gen) -> Self {
        let mantissa = i128::from(i64::arbitrary(g));
        let scale = u8::arbitrary(g) % (MAX_SCALE + 1);
        AnyValue(Value::from_parts(mantissa, scale).unwrap())
    }
}

/// Wrapper for valid mask bounds, small and large
#[derive(Clone, Copy, Debug)]
struct AnyBound(MaskBound);

impl Arbitrary for AnyBound {
    fn arbitrary(g: &mut Gen) -> Self {
        let raw = match u8::arbitrary(g) % 3 {
            0 => i64::from(u8::arbitrary(g)) + 1,
            1 => i64::from(u32::arbitrary(g)) + 1,
            _ => i64::arbitrary(g).checked_abs().unwrap_or(i64::MAX).max(1),
        };
        AnyBound(MaskBound::new(raw).unwrap())
    }
}

/// Wrapper for batches whose records all share one arity (0..=6)
#[derive(Clone, Debug)]
struct UniformBatch(Batch);

impl Arbitrary for UniformBatch {
    fn arbitrary(g: &mut Gen) -> Self {
        let arity = usize::from(u8::arbitrary(g) % 7);
        let rows = usize::from(u8::arbitrary(g) % 20);
        let records = (0..rows)
            .map(|_| (0..arity).map(|_| AnyValue::arbitrary(g).0).collect::<Record>())
            .collect();
        UniformBatch(Batch::new(records))
    }
}

/// Splitting then summing the shares gives the value back exactly
#[quickcheck]
fn prop_split_identity(value: AnyValue, bound: AnyBound, seed: u64) -> bool {
    let mut splitter = ValueSplitter::new(MaskGenerator::seeded(seed));
    let Ok(pair) = splitter.split(value.0, bound.0) else {
        return false;
    };
    let mask = pair.share_b.mantissa();

    pair.share_b.scale() == 0
        && (0..i128::from(*bound.0)).contains(&mask)
        && pair.share_a.checked_add(pair.share_b).ok() == Some(value.0)
}

/// Masks always land in [0, bound)
#[quickcheck]
fn prop_mask_in_range(bound: AnyBound, seed: u64) -> bool {
    let mut masks = MaskGenerator::seeded(seed);
    (0..64).all(|_| (0..*bound.0).contains(&masks.next(bound.0).get()))
}

/// Splitting the same record twice uses fresh masks
#[quickcheck]
fn prop_repeated_splits_differ(value: AnyValue, seed: u64) -> bool {
    let mut splitter = RecordSplitter::new(ValueSplitter::new(MaskGenerator::seeded(seed)));
    let record = Record::new(vec![value.0; 4]);
    let bound = MaskBound::new(i64::MAX).unwrap();
    let first = splitter.split(&record, bound).unwrap();
    let second = splitter.split(&record, bound).unwrap();
    first.record_b != second.record_b
}

/// Output batches have the input's length and are aligned index by index
#[quickcheck]
fn prop_batch_alignment(batch: UniformBatch, bound: AnyBound, seed: u64) -> bool {
    let UniformBatch(batch) = batch;
    let mut pipeline = BatchPipeline::new(MaskGenerator::seeded(seed));
    let Ok((batch_a, batch_b)) = pipeline.process(&batch, bound.0) else {
        return false;
    };

    if batch_a.len() != batch.len() || batch_b.len() != batch.len() {
        return false;
    }

    batch
        .records()
        .iter()
        .zip(batch_a.records())
        .zip(batch_b.records())
        .all(|((original, a), b)| {
            original.arity() == a.arity()
                && original.arity() == b.arity()
                && original
                    .iter()
                    .zip(a)
                    .zip(b)
                    .all(|((v, x), y)| x.checked_add(*y).ok() == Some(*v))
        })
}

/// A single record of different arity rejects the whole batch
#[quickcheck]
fn prop_mismatched_arity_fails(batch: UniformBatch, seed: u64) -> bool {
    let UniformBatch(batch) = batch;
    let Ok(arity) = batch.checked_arity() else {
        return false;
    };
    if batch.is_empty() {
        return true;
    }

    let mut records = batch.into_records();
    let odd = Record::new(vec![Value::from_i64(1); arity + 1]);
    let position = usize::try_from(seed % records.len() as u64).unwrap_or(0);
    records.insert(position, odd);

    let mut pipeline = BatchPipeline::new(MaskGenerator::seeded(seed));
    matches!(
        pipeline.process(&Batch::new(records), MaskBound::SMALL),
        Err(splitshare::SplitShareError::SchemaMismatch { .. })
    )
}
