use crate::error::{MeasursError, Result};

/// Character that stands for zero
pub const BLANK: char = '_';

/// Character that extends the current token instead of ending it
pub const OVERFLOW: char = 'z';

/// Value of the overflow character
pub const OVERFLOW_VALUE: u64 = 26;

/// Numeric value of a single measurement character
/// `_` is 0, `a`..=`z` are 1..=26, case-insensitive
/// `position` is only used to locate the character in the error
pub fn value_of(c: char, position: usize) -> Result<u64> {
    match c.to_ascii_lowercase() {
        BLANK => Ok(0),
        lower @ 'a'..='z' => Ok(lower as u64 - 'a' as u64 + 1),
        _ => Err(MeasursError::InvalidCharacter {
            character: c,
            position,
        }),
    }
}

/// True when `c` is the overflow character (either case)
pub fn is_overflow(c: char) -> bool {
    c.to_ascii_lowercase() == OVERFLOW
}
