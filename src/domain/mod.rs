//! Domain types for additive value splitting
//!
//! This module contains validated newtypes shared by the splitter, the codec
//! and the network roles:
//! - [`Value`] - Exact signed decimal datum
//! - [`MaskBound`] - Exclusive upper bound of the random mask (> 0)
//! - [`SharePair`] - Two shares summing to a value
//! - [`Record`] / [`Batch`] / [`SplitRecordPair`] - Fixed-arity rows of values
//! - [`Endpoint`] / [`EndpointPair`] - Distinct share recipients

mod bound;
mod endpoint;
mod record;
mod value;

pub use bound::MaskBound;
pub use endpoint::{Endpoint, EndpointPair};
pub use record::{Batch, COORDINATE_HEADER, Record, SharePair, SplitRecordPair};
pub use value::{MAX_SCALE, Value};
