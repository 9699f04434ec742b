//! Maps a digest onto an inclusive integer range.
//!
//! The seed is the 31-multiplier polynomial hash of the digest's hex
//! rendering, and the result is `min + seed % (max - min + 1)`. The modulo is
//! not uniform when the range size does not divide the seed space; outputs for
//! a given digest and range are kept stable rather than debiased.

use crate::hasher::Digest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("minimum {min} is greater than maximum {max}")]
    Inverted { min: i32, max: i32 },
}

impl Range {
    pub fn new(min: i32, max: i32) -> Result<Self, RangeError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), RangeError> {
        if self.min > self.max {
            return Err(RangeError::Inverted {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Number of integers in the range, zero when inverted
    pub fn len(&self) -> u64 {
        (self.max as i64 - self.min as i64 + 1).max(0) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Non-negative seed derived from the digest's hex rendering.
///
/// The string hash wraps in 32-bit signed arithmetic; its magnitude is taken
/// unsigned so the most negative value maps to 2^31 instead of staying negative.
pub fn seed(digest: &Digest) -> u32 {
    string_hash(&digest.to_hex()).unsigned_abs()
}

fn string_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(unit as i32))
}

pub fn reduce(digest: &Digest, range: Range) -> Result<i32, RangeError> {
    range.validate()?;

    let span = range.len() as i64;
    let value = range.min as i64 + seed(digest) as i64 % span;
    // min <= value <= max, so it fits
    Ok(value as i32)
}
