//! Prediction data model
//!
//! Wire types exchanged with the prediction backends plus the display-ready
//! shapes produced from them. Everything here is created per user action and
//! discarded on the next one.

use serde::{Deserialize, Serialize};

/// One labeled probability estimate from a vision backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCandidate {
    #[serde(rename = "tagName")]
    pub tag_name: String,
    /// 0.0-1.0
    pub probability: f64,
}

impl PredictionCandidate {
    pub fn new(tag_name: impl Into<String>, probability: f64) -> Self {
        Self {
            tag_name: tag_name.into(),
            probability,
        }
    }
}

/// Raw response body of `/image` and `/url`
///
/// `predictions` is optional so that a missing array is reported as a parse
/// error by the caller rather than as a serde failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisionResponse {
    #[serde(default)]
    pub predictions: Option<Vec<PredictionCandidate>>,
}

/// Display-ready prediction, probability as a whole percentage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub name: String,
    /// 0-100
    pub probability: u8,
}

/// Single deterministic label from the crop model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRecommendation {
    pub name: String,
    pub probability: u8,
}

impl CropRecommendation {
    /// The crop model returns one label, not a distribution
    pub const CERTAIN: u8 = 100;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probability: Self::CERTAIN,
        }
    }
}

/// One message from the advisory chat backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub agent: String,
    pub content: String,
}

/// Full `/chat` response, passed through untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceTranscript {
    pub fruit: String,
    #[serde(default)]
    pub responses: Vec<ChatTurn>,
}

/// Which backend a vision or soil request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Local image classifier (no key)
    Local,
    /// Cloud vision API (`Prediction-Key` header)
    Cloud,
    /// Tabular crop-recommendation model (bearer token)
    Soil,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Local => write!(f, "local"),
            Mode::Cloud => write!(f, "cloud"),
            Mode::Soil => write!(f, "soil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_uses_camel_case_tag_name() {
        let c: PredictionCandidate =
            serde_json::from_str(r#"{"tagName":"Apple","probability":0.83}"#).unwrap();
        assert_eq!(c, PredictionCandidate::new("Apple", 0.83));
    }

    #[test]
    fn vision_response_without_predictions_is_none() {
        let r: VisionResponse = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert!(r.predictions.is_none());
    }

    #[test]
    fn crop_recommendation_is_always_certain() {
        assert_eq!(CropRecommendation::new("rice").probability, 100);
    }

    #[test]
    fn transcript_tolerates_missing_responses() {
        let t: AdviceTranscript = serde_json::from_str(r#"{"fruit":"kiwi"}"#).unwrap();
        assert!(t.responses.is_empty());
    }
}
