//! Plain-text rendering of results, advice and session state

use crate::controller::{AdvicePhase, Phase, UiState};
use crate::request::Outcome;
use agrivision_common::{AdviceTranscript, CropRecommendation, NormalizedResult};
use std::fmt::Write;

/// Cells in the main confidence bar
pub const BAR_WIDTH: usize = 20;
const OTHERS_BAR_WIDTH: usize = 10;

/// Chat agent whose turns are shown as botanist turns; everyone else is the chef
pub const BOTANIST: &str = "Botanist";

/// `percent` as a bar of `width` cells, rounded to the nearest cell
pub fn bar(percent: u8, width: usize) -> String {
    let percent = usize::from(percent.min(100));
    let filled = (percent * width + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Ranked vision results: top match, badge, caption, then the others
pub fn render_results(results: &[NormalizedResult]) -> String {
    let Some((top, others)) = results.split_first() else {
        return "No prediction returned.\n".to_string();
    };

    let mut out = String::new();
    out.push_str("Analysis Result");
    if top.probability < 100 && !others.is_empty() {
        out.push_str("  [Multiple Matches]");
    }
    out.push('\n');

    let _ = writeln!(out, "{}", top.name);
    let _ = writeln!(out, "Confidence: {}%", top.probability);
    let _ = writeln!(out, "{}", bar(top.probability, BAR_WIDTH));
    let _ = writeln!(
        out,
        "Our AI is {}% sure this is a {}.",
        top.probability, top.name
    );

    if !others.is_empty() {
        out.push_str("\nOther possibilities detected:\n");
        let width = others.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
        for item in others {
            let _ = writeln!(
                out,
                "  {:<width$}  {} {:>3}%",
                item.name,
                bar(item.probability, OTHERS_BAR_WIDTH),
                item.probability,
                width = width
            );
        }
    }
    out
}

pub fn render_crop(rec: &CropRecommendation) -> String {
    format!(
        "Recommended crop: {}\nConfidence: {}%\n{}\n",
        rec.name,
        rec.probability,
        bar(rec.probability, BAR_WIDTH)
    )
}

pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Vision(results) => render_results(results),
        Outcome::Crop(rec) => render_crop(rec),
    }
}

/// Chat transcript, one block per turn
pub fn render_advice(transcript: &AdviceTranscript) -> String {
    let mut out = format!("Expert advice on: {}\n", transcript.fruit);
    if transcript.responses.is_empty() {
        out.push_str("(no responses)\n");
    }
    for turn in &transcript.responses {
        let speaker = if turn.agent == BOTANIST {
            "[Botanist]"
        } else {
            "[Chef]"
        };
        let _ = writeln!(out, "\n{}\n{}", speaker, turn.content.trim());
    }
    out
}

/// Whatever the result area currently shows
pub fn render_state(state: &UiState) -> String {
    let mut out = match state.phase() {
        Phase::Idle => String::new(),
        Phase::Loading(_) => "Analyzing...\n".to_string(),
        Phase::Done(outcome) => render_outcome(outcome),
        Phase::Errored(message) => format!("Error: {}\n", message),
    };
    match state.advice() {
        AdvicePhase::Idle => {}
        AdvicePhase::Loading(_) => out.push_str("\nThe experts are thinking...\n"),
        AdvicePhase::Ready(transcript) => {
            out.push('\n');
            out.push_str(&render_advice(transcript));
        }
        AdvicePhase::Errored(message) => {
            let _ = writeln!(out, "\nAdvice unavailable: {}", message);
        }
    }
    out
}
