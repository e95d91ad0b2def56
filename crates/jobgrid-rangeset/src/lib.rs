//! Range-set codec — the compact textual notation for ascending index sets.
//!
//! Encodes an ordered set of non-negative integer indices (cpu ids, memory
//! block ids) as comma-separated runs: `[1, 3, 4, 5, 8]` ⇄ `"1,3-5,8"`.
//! This string is the authoritative wire format handed to affinity
//! enforcement and reporting consumers, so both directions are strict:
//! `encode` expects strictly ascending input, and `decode` rejects anything
//! a prior `encode` could not have produced.
//!
//! Grammar: `digit+ ( '-' digit+ )? ( ',' digit+ ( '-' digit+ )? )*` —
//! ascending, no duplicate values, ranges with `first < last` only.

use std::collections::HashSet;

use thiserror::Error;

/// Result type alias for codec operations.
pub type RangeSetResult<T> = Result<T, RangeSetError>;

/// Errors raised while decoding a range string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeSetError {
    #[error("non-numeric token: {0:?}")]
    NonNumeric(String),

    #[error("invalid range {start}-{end}: ranges require start < end")]
    InvalidRange { start: u64, end: u64 },

    #[error("duplicate index {0}")]
    Duplicate(u64),
}

/// Encode a strictly ascending sequence of indices as a range string.
///
/// Consecutive runs collapse to `first-last`, singletons stay bare, entries
/// are comma-joined. An empty input encodes to the empty string. The input
/// must already be sorted strictly ascending — the codec does not sort.
pub fn encode(indices: &[u64]) -> String {
    debug_assert!(
        indices.windows(2).all(|w| w[0] < w[1]),
        "encode requires strictly ascending input"
    );

    let mut out = String::new();
    let mut i = 0;
    while i < indices.len() {
        let first = indices[i];
        let mut last = first;
        while i + 1 < indices.len() && indices[i + 1] == last + 1 {
            last = indices[i + 1];
            i += 1;
        }
        if !out.is_empty() {
            out.push(',');
        }
        if first == last {
            out.push_str(&first.to_string());
        } else {
            out.push_str(&format!("{first}-{last}"));
        }
        i += 1;
    }
    out
}

/// Decode a range string into individual indices, in encounter order.
///
/// Each comma-separated token is either a bare integer or `a-b` with
/// `a < b`; ranges expand to every contained value. Whitespace around
/// separators is tolerated. Rejects non-numeric tokens, degenerate or
/// reversed ranges, and any value appearing twice anywhere in the set.
/// An empty (or all-whitespace) input decodes to an empty set.
pub fn decode(text: &str) -> RangeSetResult<Vec<u64>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut values = Vec::new();
    let mut seen = HashSet::new();

    for token in text.split(',') {
        let token = token.trim();
        let (first, last) = parse_token(token)?;
        for value in first..=last {
            if !seen.insert(value) {
                return Err(RangeSetError::Duplicate(value));
            }
            values.push(value);
        }
    }

    Ok(values)
}

fn parse_token(token: &str) -> RangeSetResult<(u64, u64)> {
    match token.split_once('-') {
        Some((start, end)) => {
            let start = parse_value(start.trim(), token)?;
            let end = parse_value(end.trim(), token)?;
            if start >= end {
                return Err(RangeSetError::InvalidRange { start, end });
            }
            Ok((start, end))
        }
        None => {
            let value = parse_value(token, token)?;
            Ok((value, value))
        }
    }
}

fn parse_value(text: &str, token: &str) -> RangeSetResult<u64> {
    text.parse()
        .map_err(|_| RangeSetError::NonNumeric(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_empty_is_empty_string() {
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn encode_singleton() {
        assert_eq!(encode(&[5]), "5");
    }

    #[test]
    fn encode_merges_consecutive_run() {
        assert_eq!(encode(&[2, 3, 4]), "2-4");
    }

    #[test]
    fn encode_mixes_singletons_and_runs() {
        assert_eq!(encode(&[1, 3, 4, 5, 8]), "1,3-5,8");
    }

    #[test]
    fn encode_two_element_run_is_a_range() {
        assert_eq!(encode(&[0, 1]), "0-1");
    }

    #[test]
    fn decode_bare_values() {
        assert_eq!(decode("1,5,9").unwrap(), vec![1, 5, 9]);
    }

    #[test]
    fn decode_expands_ranges_in_order() {
        assert_eq!(decode("1,3-5,8").unwrap(), vec![1, 3, 4, 5, 8]);
    }

    #[test]
    fn decode_tolerates_whitespace() {
        assert_eq!(decode(" 1 , 3 - 5 , 8 ").unwrap(), vec![1, 3, 4, 5, 8]);
    }

    #[test]
    fn decode_empty_input() {
        assert_eq!(decode("").unwrap(), Vec::<u64>::new());
        assert_eq!(decode("   ").unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn decode_rejects_reversed_range() {
        assert_eq!(
            decode("3-1"),
            Err(RangeSetError::InvalidRange { start: 3, end: 1 })
        );
    }

    #[test]
    fn decode_rejects_degenerate_range() {
        assert_eq!(
            decode("4-4"),
            Err(RangeSetError::InvalidRange { start: 4, end: 4 })
        );
    }

    #[test]
    fn decode_rejects_duplicate_value() {
        assert_eq!(decode("1,1"), Err(RangeSetError::Duplicate(1)));
    }

    #[test]
    fn decode_rejects_duplicate_via_overlapping_range() {
        assert_eq!(decode("1-3,2"), Err(RangeSetError::Duplicate(2)));
    }

    #[test]
    fn decode_rejects_non_numeric_token() {
        assert_eq!(
            decode("1,x,3"),
            Err(RangeSetError::NonNumeric("x".to_string()))
        );
    }

    #[test]
    fn decode_rejects_negative_value() {
        // "-5" splits as an empty start token, which is not numeric.
        assert!(matches!(decode("-5"), Err(RangeSetError::NonNumeric(_))));
    }

    #[test]
    fn decode_rejects_malformed_range() {
        assert!(matches!(decode("1-2-3"), Err(RangeSetError::NonNumeric(_))));
    }

    #[test]
    fn round_trip_ascending_sets() {
        let cases: Vec<Vec<u64>> = vec![
            vec![0],
            vec![0, 1, 2, 3],
            vec![7, 9, 11],
            vec![0, 1, 4, 5, 6, 20, 22, 23],
            (0..128).collect(),
        ];
        for seq in cases {
            assert_eq!(decode(&encode(&seq)).unwrap(), seq);
        }
    }
}
