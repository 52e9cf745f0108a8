//! `MaskBound` newtype for the random mask range

use crate::error::{Result, SplitShareError};

/// Exclusive upper bound of the random mask (1..=`i64::MAX`)
///
/// Invariant: bound > 0 (enforced at construction). Masks are drawn from
/// `[0, bound)`, so the bound caps the magnitude of the second share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MaskBound(i64);

impl MaskBound {
    /// Bound used when splitting spreadsheet coordinates
    pub const COORDINATE: Self = Self(400_000);

    /// Bound used when splitting CSV route data
    pub const SMALL: Self = Self(8);

    /// Creates a new mask bound
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the bound is zero or negative
    ///
    /// # Examples
    ///
    /// ```rust
    /// use splitshare::domain::MaskBound;
    ///
    /// let bound = MaskBound::new(8).unwrap();
    /// assert_eq!(*bound, 8);
    ///
    /// assert!(MaskBound::new(0).is_err());
    /// assert!(MaskBound::new(-5).is_err());
    /// ```
    pub fn new(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(SplitShareError::invalid(format!(
                "Mask bound must be positive (got {value})"
            )));
        }
        Ok(Self(value))
    }
}

impl Default for MaskBound {
    fn default() -> Self {
        Self::COORDINATE
    }
}

impl std::ops::Deref for MaskBound {
    type Target = i64;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
