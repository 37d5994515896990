use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Coarse sentiment label.
///
/// Deserialization is lenient: labels are matched case-insensitively after trimming,
/// and anything unrecognized becomes [`SentimentClass::Neutral`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentClass {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl SentimentClass {
    /// Parses a label, defaulting to `Neutral`.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positive" => SentimentClass::Positive,
            "negative" => SentimentClass::Negative,
            _ => SentimentClass::Neutral,
        }
    }

    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentClass::Positive => "positive",
            SentimentClass::Neutral => "neutral",
            SentimentClass::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SentimentClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(label) => SentimentClass::parse_lenient(&label),
            _ => SentimentClass::Neutral,
        })
    }
}

/// A complete sentiment annotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentTuple {
    /// Direction, in `[-1, 1]`.
    pub polarity: f64,
    /// Strength, in `[0, 1]`.
    pub intensity: f64,
    /// Share of opinionated content, in `[0, 1]`.
    pub density: f64,
    #[serde(default)]
    pub sentiment_class: SentimentClass,
}

impl SentimentTuple {
    pub fn new(polarity: f64, intensity: f64, density: f64, sentiment_class: SentimentClass) -> Self {
        Self {
            polarity,
            intensity,
            density,
            sentiment_class,
        }
    }

    /// Clamps every field into its declared range. Non-finite values become `0.0`.
    pub fn clamped(self) -> Self {
        Self {
            polarity: clamp_finite(self.polarity, -1.0, 1.0),
            intensity: clamp_finite(self.intensity, 0.0, 1.0),
            density: clamp_finite(self.density, 0.0, 1.0),
            sentiment_class: self.sentiment_class,
        }
    }

    /// Per-comment sentiment score: `(polarity + intensity + density) / 3`.
    #[inline]
    pub fn score(&self) -> f64 {
        (self.polarity + self.intensity + self.density) / 3.0
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}
