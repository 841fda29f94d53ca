use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer score clamped to `0..=100`.
///
/// Every way of building one clamps, so a `Score` read back from a result
/// is always in range.
///
/// ```
/// use kura_llm::types::Score;
///
/// assert_eq!(Score::new(140).get(), 100);
/// assert_eq!(Score::new(-3).get(), 0);
/// assert_eq!(Score::from(72.6).get(), 73);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: Score = Score(0);
    pub const MAX: Score = Score(100);

    pub fn new(value: i64) -> Self {
        Score(value.clamp(0, 100) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            return Score::MIN;
        }
        Score(value.round().clamp(0.0, 100.0) as u8)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Volatile,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Volatile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Volatile => "Volatile",
        }
    }
}

/// Outcome label for a claim-verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    True,
    False,
    Unverified,
    Misleading,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::True => "True",
            Verdict::False => "False",
            Verdict::Unverified => "Unverified",
            Verdict::Misleading => "Misleading",
        }
    }
}

/// A web citation returned alongside a search-grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

impl Source {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

/// Sentiment/risk assessment of a single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: Sentiment,
    pub risk_score: Score,
    pub summary: String,
    pub topics: Vec<String>,
}

impl AnalysisResult {
    pub const FALLBACK_SUMMARY: &'static str = "Could not analyze content.";
    pub const FALLBACK_TOPIC: &'static str = "Error";

    /// Renderable stand-in used when the upstream could not answer.
    pub fn fallback() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            risk_score: Score::new(50),
            summary: Self::FALLBACK_SUMMARY.to_string(),
            topics: vec![Self::FALLBACK_TOPIC.to_string()],
        }
    }
}

/// Verdict on a user-supplied claim, with the sources the model consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub claim: String,
    pub verdict: Verdict,
    pub confidence: Score,
    pub sources: Vec<Source>,
    pub explanation: String,
}

impl VerificationResult {
    pub const FAILED_EXPLANATION: &'static str = "Failed to connect to verification service.";

    /// Stand-in used when verification could not reach or use the upstream.
    pub fn failed(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            verdict: Verdict::Unverified,
            confidence: Score::MIN,
            sources: Vec::new(),
            explanation: Self::FAILED_EXPLANATION.to_string(),
        }
    }
}
