//! Property-based tests for splitshare
//!
//! This test suite uses quickcheck to verify the splitting identities across
//! random values, bounds, seeds and batch shapes.
//!
//! Run with: cargo test --test proptests

#[path = "proptests/codec.rs"]
mod codec;

#[path = "proptests/split.rs"]
mod split;
