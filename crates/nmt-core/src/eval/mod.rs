//! Translation quality scoring and oracle best-of-k selection.
//!
//! The scorer sits behind `SentenceScorer` so the oracle does not depend on
//! a particular metric. `Bleu` is the built-in implementation.

mod bleu;

use serde::Serialize;
use tracing::debug;

pub use bleu::{corpus_bleu, sentence_bleu, Bleu};

pub const DEFAULT_NGRAM_ORDER: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("{candidates} candidate lists but {references} references")]
    LengthMismatch {
        candidates: usize,
        references: usize,
    },

    #[error("n-gram order must be at least 1, got {0}")]
    InvalidOrder(usize),
}

/// Similarity of a candidate translation to a reference, in `[0, 1]`.
pub trait SentenceScorer: Send + Sync {
    fn score(&self, candidate: &str, reference: &str, ngram_order: usize) -> f64;
}

/// The candidate chosen for one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OraclePick {
    /// Beam rank of the chosen candidate (0 = best by model score).
    pub index: usize,
    pub score: f64,
}

/// Outcome of oracle selection over a corpus.
#[derive(Debug, Clone, Serialize)]
pub struct OracleReport {
    /// `None` for sentences that produced no candidates.
    pub picks: Vec<Option<OraclePick>>,
    pub sentence_scores: Vec<f64>,
    /// Arithmetic mean of `sentence_scores`, unrounded.
    pub mean_score: f64,
    /// BLEU of the picked candidates as one corpus.
    pub corpus_bleu: f64,
}

impl OracleReport {
    /// Mean score rounded to two decimals, as displayed and used in file names.
    pub fn rounded_mean(&self) -> f64 {
        round2(self.mean_score)
    }

    /// Text of every pick, empty for sentences without candidates.
    ///
    /// A pick that does not index into `candidates` also yields an empty line.
    pub fn selected<'a, S: AsRef<str>>(&self, candidates: &'a [Vec<S>]) -> Vec<&'a str> {
        self.picks
            .iter()
            .zip(candidates)
            .map(|(pick, cands)| {
                pick.and_then(|p| cands.get(p.index))
                    .map_or("", |c| c.as_ref())
            })
            .collect()
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pick the candidate that scores highest against `reference`.
///
/// Ties keep the lower beam rank. Returns `None` when `candidates` is empty.
pub fn oracle_select<S: AsRef<str>>(
    candidates: &[S],
    reference: &str,
    scorer: &dyn SentenceScorer,
    ngram_order: usize,
) -> Option<OraclePick> {
    let mut best: Option<OraclePick> = None;
    for (index, cand) in candidates.iter().enumerate() {
        let score = scorer.score(cand.as_ref(), reference, ngram_order);
        match best {
            Some(b) if score <= b.score => {}
            _ => best = Some(OraclePick { index, score }),
        }
    }
    best
}

/// Oracle best-of-k over a corpus: one pick per sentence, their mean score,
/// and the corpus BLEU of the picked text.
pub fn oracle_corpus<S: AsRef<str>, R: AsRef<str>>(
    candidates: &[Vec<S>],
    references: &[R],
    scorer: &dyn SentenceScorer,
    ngram_order: usize,
) -> Result<OracleReport, EvalError> {
    if ngram_order == 0 {
        return Err(EvalError::InvalidOrder(ngram_order));
    }
    if candidates.len() != references.len() {
        return Err(EvalError::LengthMismatch {
            candidates: candidates.len(),
            references: references.len(),
        });
    }

    let picks: Vec<Option<OraclePick>> = candidates
        .iter()
        .zip(references)
        .map(|(cands, reference)| oracle_select(cands, reference.as_ref(), scorer, ngram_order))
        .collect();
    let sentence_scores: Vec<f64> = picks
        .iter()
        .map(|p| p.map(|p| p.score).unwrap_or(0.0))
        .collect();
    let mean_score = if sentence_scores.is_empty() {
        0.0
    } else {
        sentence_scores.iter().sum::<f64>() / sentence_scores.len() as f64
    };

    let mut report = OracleReport {
        picks,
        sentence_scores,
        mean_score,
        corpus_bleu: 0.0,
    };
    let selected = report.selected(candidates);
    report.corpus_bleu = corpus_bleu(&selected, references, ngram_order)?;

    debug!(
        sentences = report.picks.len(),
        mean_score = report.mean_score,
        corpus_bleu = report.corpus_bleu,
        "oracle selection done"
    );
    Ok(report)
}
