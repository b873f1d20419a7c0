//! Order-Preserving Score Codec
//!
//! Sorted-set members live in a map bin as `member -> encoded score`. The
//! store can only order map entries by value, so the encoding must sort
//! the same way the numeric scores do:
//!
//! ```text
//! encode(a) < encode(b)  <=>  a < b
//! ```
//!
//! A score is mapped to a `u64` by flipping the sign bit of non-negative
//! floats and inverting every bit of negative ones, then stored as 8
//! big-endian bytes so that byte-wise comparison matches integer order.
//! `-0.0` is folded into `0.0`. NaN is never a valid score.
//!
//! ## Range Boundaries
//!
//! The store selects values in a half-open range `[begin, end)`. A score
//! interval from the command line (`1`, `(1`, `-inf`, `+inf`, ...) is
//! turned into that range by two encoders:
//!
//! | bound text | `lower_bound`   | `upper_bound`   |
//! |------------|-----------------|-----------------|
//! | `x`        | `encode(x)`     | `encode(x) + 1` |
//! | `(x`       | `encode(x) + 1` | `encode(x)`     |

use crate::store::Value;
use bytes::Bytes;
use thiserror::Error;

/// Errors raised while reading a score or score bound from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("min or max is not a float")]
    InvalidBound,

    #[error("value is not a valid float")]
    InvalidScore,
}

/// One side of a score interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    /// Parses `x` or `(x`, where `x` is a float, `inf`, `+inf` or `-inf`.
    pub fn parse(text: &str) -> Result<Self, ScoreError> {
        match text.strip_prefix('(') {
            Some(rest) => parse_float(rest)
                .map(ScoreBound::Exclusive)
                .ok_or(ScoreError::InvalidBound),
            None => parse_float(text)
                .map(ScoreBound::Inclusive)
                .ok_or(ScoreError::InvalidBound),
        }
    }
}

/// Parses a member score as given to `ZADD`.
pub fn parse_score(text: &str) -> Result<f64, ScoreError> {
    parse_float(text).ok_or(ScoreError::InvalidScore)
}

fn parse_float(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Maps a score onto an unsigned integer with the same ordering.
pub fn encode_score(score: f64) -> u64 {
    // Fold -0.0 into 0.0 so equal scores encode equally.
    let score = if score == 0.0 { 0.0 } else { score };
    let bits = score.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

fn to_value(encoded: u64) -> Value {
    Value::Blob(Bytes::copy_from_slice(&encoded.to_be_bytes()))
}

/// The map value stored for a member with this score.
pub fn score_value(score: f64) -> Value {
    to_value(encode_score(score))
}

/// Inclusive start of the value range for a lower score bound.
pub fn lower_bound(text: &str) -> Result<Value, ScoreError> {
    let encoded = match ScoreBound::parse(text)? {
        ScoreBound::Inclusive(x) => encode_score(x),
        ScoreBound::Exclusive(x) => encode_score(x) + 1,
    };
    Ok(to_value(encoded))
}

/// Exclusive end of the value range for an upper score bound.
pub fn upper_bound(text: &str) -> Result<Value, ScoreError> {
    let encoded = match ScoreBound::parse(text)? {
        ScoreBound::Inclusive(x) => encode_score(x) + 1,
        ScoreBound::Exclusive(x) => encode_score(x),
    };
    Ok(to_value(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn finite_or_infinite() -> impl Strategy<Value = f64> {
        prop_oneof![
            any::<f64>().prop_filter("not NaN", |x| !x.is_nan()),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(0.0),
            Just(-0.0),
        ]
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(ScoreBound::parse("1.5"), Ok(ScoreBound::Inclusive(1.5)));
        assert_eq!(ScoreBound::parse("(2"), Ok(ScoreBound::Exclusive(2.0)));
        assert_eq!(
            ScoreBound::parse("-inf"),
            Ok(ScoreBound::Inclusive(f64::NEG_INFINITY))
        );
        assert_eq!(
            ScoreBound::parse("+inf"),
            Ok(ScoreBound::Inclusive(f64::INFINITY))
        );
        assert_eq!(
            ScoreBound::parse("(inf"),
            Ok(ScoreBound::Exclusive(f64::INFINITY))
        );
        assert_eq!(ScoreBound::parse("abc"), Err(ScoreError::InvalidBound));
        assert_eq!(ScoreBound::parse("nan"), Err(ScoreError::InvalidBound));
        assert_eq!(ScoreBound::parse("("), Err(ScoreError::InvalidBound));
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("3"), Ok(3.0));
        assert_eq!(parse_score("-2.25"), Ok(-2.25));
        assert_eq!(parse_score("x"), Err(ScoreError::InvalidScore));
    }

    #[test]
    fn test_negative_zero_folds_into_zero() {
        assert_eq!(encode_score(-0.0), encode_score(0.0));
    }

    #[test]
    fn test_extremes_are_ordered() {
        let ordered = [
            f64::NEG_INFINITY,
            f64::MIN,
            -1.0,
            -f64::MIN_POSITIVE,
            0.0,
            f64::MIN_POSITIVE,
            1.0,
            f64::MAX,
            f64::INFINITY,
        ];
        for pair in ordered.windows(2) {
            assert!(score_value(pair[0]) < score_value(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_infinite_bounds_cover_everything() {
        let begin = lower_bound("-inf").unwrap();
        let end = upper_bound("+inf").unwrap();
        for score in [f64::NEG_INFINITY, -1e300, 0.0, 7.0, f64::INFINITY] {
            let v = score_value(score);
            assert!(v >= begin && v < end, "{}", score);
        }
    }

    #[test]
    fn test_exclusive_infinite_bounds_are_empty_at_the_edge() {
        assert!(score_value(f64::INFINITY) < lower_bound("(inf").unwrap());
        assert!(score_value(f64::NEG_INFINITY) >= upper_bound("(-inf").unwrap());
    }

    proptest! {
        #[test]
        fn prop_encoding_preserves_order(a in finite_or_infinite(), b in finite_or_infinite()) {
            prop_assert_eq!(encode_score(a) < encode_score(b), a < b);
            prop_assert_eq!(score_value(a) < score_value(b), a < b);
        }

        #[test]
        fn prop_bounds_have_interval_semantics(s in finite_or_infinite(), x in finite_or_infinite()) {
            let v = score_value(s);
            let text = format!("{}", x);
            let excl = format!("({}", x);

            prop_assert_eq!(v >= lower_bound(&text).unwrap(), s >= x);
            prop_assert_eq!(v >= lower_bound(&excl).unwrap(), s > x);
            prop_assert_eq!(v < upper_bound(&text).unwrap(), s <= x);
            prop_assert_eq!(v < upper_bound(&excl).unwrap(), s < x);
        }
    }
}
