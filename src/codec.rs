//! Measurement package codec.
//!
//! An input string is a run of packages. Each package starts with a size
//! character whose value says how many value-tokens follow; the package total
//! is the sum of those tokens. A token is any number of overflow characters
//! (`z`) followed by one terminating character, and is worth the sum of the
//! whole chain.
//!
//! ```text
//! "dz_a_aazzaaa"  ->  d[z_ a _ a]  a[zza]  a[a]  ->  [28, 53, 1]
//! ```

use crate::alphabet::{is_overflow, value_of};
use crate::error::{MeasursError, Result};
use serde::{Deserialize, Serialize};

/// Decoding grammar options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// Single size character, then `n` overflow-chained tokens
    #[default]
    Package,
    /// Whole string cut into slots first; a slot may also be a size
    Slotted,
}

impl std::str::FromStr for Grammar {
    type Err = MeasursError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "package" => Ok(Self::Package),
            "slotted" => Ok(Self::Slotted),
            _ => Err(MeasursError::UnsupportedGrammar(s.to_string())),
        }
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::Slotted => write!(f, "slotted"),
        }
    }
}

/// One validated input character
#[derive(Debug, Clone, Copy)]
struct Symbol {
    value: u64,
    overflow: bool,
}

/// Decode a measurement string into its package totals
/// All-or-nothing: any character outside the alphabet fails the whole call
pub fn decode(input: &str, grammar: Grammar) -> Result<Vec<u64>> {
    let symbols = scan(input)?;
    Ok(match grammar {
        Grammar::Package => decode_packages(&symbols),
        Grammar::Slotted => decode_slots(&symbols),
    })
}

/// Validate every character up front so no partial result can escape
fn scan(input: &str) -> Result<Vec<Symbol>> {
    input
        .chars()
        .enumerate()
        .map(|(position, c)| {
            Ok(Symbol {
                value: value_of(c, position)?,
                overflow: is_overflow(c),
            })
        })
        .collect()
}

/// Read one token starting at `pos`: overflow chain plus terminator
/// Returns (token value, next unread position). A chain cut short by the
/// end of input keeps whatever it accumulated.
fn read_token(symbols: &[Symbol], mut pos: usize) -> (u64, usize) {
    let mut value = 0u64;
    while let Some(symbol) = symbols.get(pos) {
        value = value.saturating_add(symbol.value);
        pos += 1;
        if !symbol.overflow {
            break;
        }
    }
    (value, pos)
}

fn decode_packages(symbols: &[Symbol]) -> Vec<u64> {
    let mut totals = Vec::new();
    let mut pos = 0;

    while pos < symbols.len() {
        let count = symbols[pos].value;
        pos += 1;

        let mut total = 0u64;
        for _ in 0..count {
            // Missing tokens are blanks
            if pos >= symbols.len() {
                break;
            }
            let (value, next) = read_token(symbols, pos);
            total = total.saturating_add(value);
            pos = next;
        }
        totals.push(total);
    }

    totals
}

fn decode_slots(symbols: &[Symbol]) -> Vec<u64> {
    let mut slots = Vec::new();
    let mut pos = 0;
    while pos < symbols.len() {
        let (value, next) = read_token(symbols, pos);
        slots.push(value);
        pos = next;
    }

    let mut totals = Vec::new();
    let mut idx = 0;
    while idx < slots.len() {
        let count = usize::try_from(slots[idx]).unwrap_or(usize::MAX);
        let start = idx + 1;
        let end = start.saturating_add(count).min(slots.len());
        totals.push(slots[start..end].iter().fold(0u64, |acc, v| acc.saturating_add(*v)));
        idx = start.saturating_add(count);
    }

    totals
}
