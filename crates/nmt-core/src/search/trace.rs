use std::fmt::Write;

use serde::Serialize;

use crate::vocab::Vocabulary;

use super::beam::Hypothesis;

/// Immutable snapshot of the beam after one search step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: usize,
    /// Hypotheses sent to the model this step.
    pub expanded: usize,
    /// Hypotheses carried forward unchanged (finished or at the horizon).
    pub frozen: usize,
    pub beam: Vec<Hypothesis>,
}

impl StepRecord {
    pub(crate) fn new(step: usize, expanded: usize, frozen: usize, beam: &[Hypothesis]) -> Self {
        Self {
            step,
            expanded,
            frozen,
            beam: beam.to_vec(),
        }
    }

    pub fn best_score(&self) -> Option<f64> {
        self.beam.first().map(|h| h.score)
    }
}

/// Per-step history of one decode call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchTrace {
    pub steps: Vec<StepRecord>,
}

/// Render a trace for terminal display, one block per step.
pub fn format_trace(trace: &SearchTrace, target: &Vocabulary) -> String {
    let mut out = String::new();
    for record in &trace.steps {
        let _ = writeln!(
            out,
            "step {:>2}: expanded={} frozen={} best={}",
            record.step,
            record.expanded,
            record.frozen,
            record
                .best_score()
                .map(|s| format!("{s:.4}"))
                .unwrap_or_else(|| "-".to_string())
        );
        for (rank, hyp) in record.beam.iter().enumerate() {
            let tokens: Vec<&str> = hyp
                .tokens
                .iter()
                .map(|&id| target.id_to_token(id).unwrap_or("?"))
                .collect();
            let _ = writeln!(
                out,
                "  #{:>2} {:>8.4}  {}",
                rank + 1,
                hyp.score,
                tokens.join(" ")
            );
        }
    }
    out
}
