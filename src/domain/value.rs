//! Exact decimal `Value` newtype

use std::fmt;
use std::str::FromStr;

use zeroize::DefaultIsZeroes;

use crate::error::{Result, SplitShareError};

/// Largest number of fraction digits a [`Value`] may carry
pub const MAX_SCALE: u8 = 18;

/// A signed decimal number stored as `mantissa / 10^scale`
///
/// Input coordinates arrive as decimal text, so keeping them as scaled
/// integers makes `(value - mask) + mask == value` hold exactly, with no
/// floating-point drift.
#[derive(Debug, Clone, Copy, Default)]
pub struct Value {
    mantissa: i128,
    scale: u8,
}

impl DefaultIsZeroes for Value {}

fn pow10(exp: u8) -> i128 {
    10i128.pow(u32::from(exp))
}

fn overflow() -> SplitShareError {
    SplitShareError::invalid("numeric overflow in decimal arithmetic")
}

impl Value {
    /// Creates a value from its raw mantissa and decimal scale
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `scale` exceeds [`MAX_SCALE`]
    ///
    /// # Examples
    ///
    /// ```rust
    /// use splitshare::domain::Value;
    ///
    /// let v = Value::from_parts(1025, 2).unwrap();
    /// assert_eq!(v.to_string(), "10.25");
    /// assert!(Value::from_parts(1, 19).is_err());
    /// ```
    pub fn from_parts(mantissa: i128, scale: u8) -> Result<Self> {
        if scale > MAX_SCALE {
            return Err(SplitShareError::invalid(format!(
                "scale {scale} exceeds maximum of {MAX_SCALE}"
            )));
        }
        Ok(Self { mantissa, scale })
    }

    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        Self {
            mantissa: value as i128,
            scale: 0,
        }
    }

    #[must_use]
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    #[must_use]
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Adds two values, aligning their scales
    ///
    /// # Errors
    /// Returns `InvalidArgument` on mantissa overflow
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        let scale = self.scale.max(rhs.scale);
        let mantissa = self
            .rescaled(scale)?
            .checked_add(rhs.rescaled(scale)?)
            .ok_or_else(overflow)?;
        Ok(Self { mantissa, scale })
    }

    /// Subtracts `rhs`, aligning scales
    ///
    /// # Errors
    /// Returns `InvalidArgument` on mantissa overflow
    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        let scale = self.scale.max(rhs.scale);
        let mantissa = self
            .rescaled(scale)?
            .checked_sub(rhs.rescaled(scale)?)
            .ok_or_else(overflow)?;
        Ok(Self { mantissa, scale })
    }

    // Caller guarantees scale >= self.scale
    fn rescaled(self, scale: u8) -> Result<i128> {
        self.mantissa
            .checked_mul(pow10(scale - self.scale))
            .ok_or_else(overflow)
    }

    fn normalized(self) -> (i128, u8) {
        let (mut mantissa, mut scale) = (self.mantissa, self.scale);
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        (mantissa, scale)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Value {}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl FromStr for Value {
    type Err = SplitShareError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let malformed = || SplitShareError::invalid(format!("malformed numeric value '{text}'"));

        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            Some(_) => (false, text),
            None => return Err(SplitShareError::invalid("empty numeric value")),
        };

        let (body, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => (
                &unsigned[..pos],
                unsigned[pos + 1..].parse::<i32>().map_err(|_| malformed())?,
            ),
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }

        let mut mantissa: i128 = 0;
        for byte in int_part.bytes().chain(frac_part.bytes()) {
            if !byte.is_ascii_digit() {
                return Err(malformed());
            }
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(byte - b'0')))
                .ok_or_else(overflow)?;
        }

        let mut scale = i64::try_from(frac_part.len()).map_err(|_| malformed())?
            - i64::from(exponent);
        if mantissa == 0 {
            scale = scale.clamp(0, i64::from(MAX_SCALE));
        }
        if scale < 0 {
            let shift = u32::try_from(-scale).map_err(|_| overflow())?;
            mantissa = 10i128
                .checked_pow(shift)
                .and_then(|factor| mantissa.checked_mul(factor))
                .ok_or_else(overflow)?;
            scale = 0;
        }
        while scale > i64::from(MAX_SCALE) && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        if scale > i64::from(MAX_SCALE) {
            return Err(SplitShareError::invalid(format!(
                "'{text}' has more than {MAX_SCALE} fraction digits"
            )));
        }

        if negative {
            mantissa = -mantissa;
        }
        let scale = u8::try_from(scale).map_err(|_| malformed())?;
        Ok(Self { mantissa, scale })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let scale = usize::from(self.scale);
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}
