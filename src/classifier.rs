use crate::extractor::Score;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds separating negative, neutral and positive scores.
///
/// `lower <= upper` is expected. An inverted pair is not rejected; every
/// score classifies as neutral under it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Every finite score is neutral.
    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Both ends are needed; with either one missing every score is neutral.
    pub fn from_optional(lower: Option<f64>, upper: Option<f64>) -> Self {
        match (lower, upper) {
            (Some(lower), Some(upper)) => Self { lower, upper },
            _ => Self::unbounded(),
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.lower > self.upper
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Positive,
    Neutral,
    Negative,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Positive => "positive",
            Verdict::Neutral => "neutral",
            Verdict::Negative => "negative",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Verdict::Positive => "/images/score_positive.svg",
            Verdict::Neutral => "/images/score_neutral.svg",
            Verdict::Negative => "/images/score_negative.svg",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a score onto a verdict. Inverted bounds and scores that compare
/// against neither range (NaN) are neutral.
pub fn classify(score: f64, bounds: &Bounds) -> Verdict {
    if bounds.is_inverted() {
        return Verdict::Neutral;
    }

    if score > bounds.upper {
        Verdict::Positive
    } else if score >= bounds.lower && score <= bounds.upper {
        Verdict::Neutral
    } else if score < bounds.lower {
        Verdict::Negative
    } else {
        Verdict::Neutral
    }
}

/// What the presentation side gets for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub verdict: Verdict,
    pub score: Score,
    pub icon: &'static str,
    pub tooltip: String,
    /// Set when the display toggles ask for this verdict's icon to be hidden.
    pub icon_hidden: bool,
}

impl ClassificationResult {
    pub fn new(score: Score, verdict: Verdict, icon_hidden: bool) -> Self {
        Self {
            verdict,
            icon: verdict.icon(),
            tooltip: format!("Spam Score: {}", score.raw),
            score,
            icon_hidden,
        }
    }
}
