//! Result normalization
//!
//! Turns the unordered candidate list returned by a vision backend into the
//! display model: sorted most confident first, low-confidence noise removed,
//! probabilities as whole percentages. Never returns an empty list for a
//! non-empty input.

use crate::types::{NormalizedResult, PredictionCandidate};
use std::cmp::Ordering;

/// Candidates at or below this probability are hidden
pub const MIN_CONFIDENCE: f64 = 0.02;

/// Sort, filter, fall back to top-1, round
pub fn normalize(candidates: &[PredictionCandidate]) -> Vec<NormalizedResult> {
    let mut sorted: Vec<&PredictionCandidate> = candidates.iter().collect();
    // sort_by is stable: equal probabilities keep their source order
    sorted.sort_by(|a, b| descending(effective(a.probability), effective(b.probability)));

    let mut retained: Vec<NormalizedResult> = sorted
        .iter()
        .filter(|c| effective(c.probability) > MIN_CONFIDENCE)
        .map(|c| to_result(c))
        .collect();

    if retained.is_empty() {
        if let Some(best) = sorted.first() {
            retained.push(to_result(best));
        }
    }

    retained
}

/// NaN and infinities rank as zero
fn effective(probability: f64) -> f64 {
    if probability.is_finite() {
        probability
    } else {
        0.0
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn to_result(candidate: &PredictionCandidate) -> NormalizedResult {
    NormalizedResult {
        name: candidate.tag_name.clone(),
        probability: to_percent(candidate.probability),
    }
}

/// Round to the nearest whole percent, clamped to 0-100
pub fn to_percent(probability: f64) -> u8 {
    let pct = (effective(probability) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
