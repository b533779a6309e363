use serde::{Deserialize, Serialize};

use super::types::RecognitionFragment;

/// Fraction thresholds used when grading a recognition run.
pub mod thresholds {
    /// Default keep threshold, as a percentage.
    pub const DEFAULT_PERCENT: u8 = 50;

    /// Mean confidence below this: image is probably blurry.
    pub const BLURRY: f32 = 0.50;

    /// A fragment below this counts toward the handwriting heuristic.
    pub const HANDWRITING_FRAGMENT: f32 = 0.40;
}

/// Minimum confidence a fragment needs to survive filtering, stored as a
/// fraction in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    /// From a 0-100 percentage. Values above 100 clamp.
    pub fn from_percent(percent: u8) -> Self {
        Self(f32::from(percent.min(100)) / 100.0)
    }

    pub fn fraction(&self) -> f32 {
        self.0
    }

    pub fn percent(&self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    /// Whether a 0-100 engine confidence passes.
    pub fn admits(&self, confidence: f32) -> bool {
        confidence / 100.0 >= self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self::from_percent(thresholds::DEFAULT_PERCENT)
    }
}

/// Keep fragments at or above the threshold, in their original order.
pub fn filter(
    fragments: &[RecognitionFragment],
    threshold: ConfidenceThreshold,
) -> Vec<RecognitionFragment> {
    fragments
        .iter()
        .filter(|f| threshold.admits(f.confidence))
        .cloned()
        .collect()
}

/// Join fragment texts with single spaces, skipping blanks.
pub fn join_fragments(fragments: &[RecognitionFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mean fragment confidence as a fraction; 0.0 for no fragments.
pub fn mean_confidence(fragments: &[RecognitionFragment]) -> f32 {
    if fragments.is_empty() {
        return 0.0;
    }
    let sum: f32 = fragments.iter().map(|f| f.confidence).sum();
    sum / fragments.len() as f32 / 100.0
}

/// Quality concerns raised by a local recognition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityFlag {
    BlurryImage,
    HandwritingDetected,
}

impl QualityFlag {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::BlurryImage => "mean recognition confidence is low; image may be blurry",
            Self::HandwritingDetected => {
                "most fragments are low confidence; text may be handwritten"
            }
        }
    }
}

/// Grade the unfiltered fragments of one image.
pub fn assess_quality(fragments: &[RecognitionFragment]) -> Vec<QualityFlag> {
    let mut flags = Vec::new();
    if fragments.is_empty() {
        return flags;
    }

    if mean_confidence(fragments) < thresholds::BLURRY {
        flags.push(QualityFlag::BlurryImage);
    }

    let low = fragments
        .iter()
        .filter(|f| f.confidence / 100.0 < thresholds::HANDWRITING_FRAGMENT)
        .count();
    if low as f64 / fragments.len() as f64 > 0.50 {
        flags.push(QualityFlag::HandwritingDetected);
    }

    flags
}
