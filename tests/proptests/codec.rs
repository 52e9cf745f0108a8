//! Property tests for the textual record format

use quickcheck_macros::quickcheck;
use splitshare::codec;
use splitshare::domain::{Batch, MAX_SCALE, Record, Value};

fn value(mantissa: i64, scale: u8) -> Value {
    Value::from_parts(i128::from(mantissa), scale % (MAX_SCALE + 1)).unwrap()
}

/// Decimal text parses back to the same value
#[quickcheck]
fn prop_value_text_is_exact(mantissa: i64, scale: u8) -> bool {
    let original = value(mantissa, scale);
    original.to_string().parse::<Value>().ok() == Some(original)
}

/// Every record becomes exactly one payload line
#[quickcheck]
fn prop_batch_payload_line_per_record(rows: Vec<(i64, i64)>) -> bool {
    let batch = Batch::new(
        rows.iter()
            .map(|&(x, y)| Record::new(vec![value(x, 2), value(y, 0)]))
            .collect(),
    );
    let payload = codec::encode_batch(&batch);
    let Ok(decoded) = codec::decode_payload(&payload) else {
        return false;
    };
    decoded.len() == rows.len() && decoded == batch.records()
}
