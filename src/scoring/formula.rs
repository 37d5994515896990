//! The scoring formula, as pure functions.

use crate::catalog::Comment;
use crate::constants::{
    MAX_RATING, MIN_CONFIDENCE, VALUE_SCALE, WEIGHT_RATING, WEIGHT_RATING_NO_SENTIMENT,
    WEIGHT_SENTIMENT, WEIGHT_VALUE, WEIGHT_VALUE_NO_SENTIMENT,
};

/// Rating per unit price: `rating * 1000 / price` when both are positive, else `0`.
pub fn value_score(rating: Option<f64>, price: Option<f64>) -> f64 {
    match (rating, price) {
        (Some(rating), Some(price)) if rating > 0.0 && price > 0.0 => rating * VALUE_SCALE / price,
        _ => 0.0,
    }
}

/// Min-max normalizes to `[0, 1]`. A constant input maps every entry to `0.5`.
pub fn normalize_min_max(raw: &[f64]) -> Vec<f64> {
    let Some(min) = raw.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = raw.iter().copied().fold(min, f64::max);

    if max == min {
        return vec![0.5; raw.len()];
    }

    let span = max - min;
    raw.iter().map(|v| (v - min) / span).collect()
}

/// `rating / 5` when the rating is positive, else `0`.
pub fn normalized_rating(rating: Option<f64>) -> f64 {
    match rating {
        Some(rating) if rating > 0.0 => rating / MAX_RATING,
        _ => 0.0,
    }
}

/// Mean per-comment sentiment over comments with a complete annotation.
///
/// Returns `None` if no comment qualifies.
pub fn sentiment_score<'a>(comments: impl IntoIterator<Item = &'a Comment>) -> Option<f64> {
    let (sum, count) = comments
        .into_iter()
        .filter_map(Comment::sentiment)
        .fold((0.0, 0usize), |(sum, count), tuple| (sum + tuple.score(), count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Share of the batch's largest comment count, floored at `0.2`.
pub fn confidence(comment_count: usize, max_comment_count: usize) -> f64 {
    if max_comment_count == 0 {
        return MIN_CONFIDENCE;
    }
    (comment_count as f64 / max_comment_count as f64).max(MIN_CONFIDENCE)
}

/// Blends the sub-scores. Without sentiment, rating and value split the weight evenly.
pub fn combine(sentiment: Option<f64>, rating_norm: f64, value_norm: f64) -> f64 {
    match sentiment {
        Some(sentiment) => {
            WEIGHT_SENTIMENT * sentiment + WEIGHT_RATING * rating_norm + WEIGHT_VALUE * value_norm
        }
        None => WEIGHT_RATING_NO_SENTIMENT * rating_norm + WEIGHT_VALUE_NO_SENTIMENT * value_norm,
    }
}

/// Rounds to `places` decimals, ties to even.
///
/// Persisted scores written by earlier tooling used banker's rounding, so `0.125`
/// rounds to `0.12` here as well.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}
