use std::cmp::Ordering;

use serde::Serialize;

/// One candidate translation under construction.
///
/// `tokens` always starts with `<s>` and is never empty. `score` is the sum
/// of `-ln p` over every appended token, so it never decreases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hypothesis {
    pub tokens: Vec<u32>,
    pub score: f64,
}

impl Hypothesis {
    pub(crate) fn start(start: u32) -> Self {
        Self {
            tokens: vec![start],
            score: 0.0,
        }
    }

    /// Copy of `self` with `token` appended at probability `prob`.
    pub(crate) fn extend(&self, token: u32, prob: f32) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(token);
        Self {
            tokens,
            score: self.score + neg_log(prob),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn last_token(&self) -> Option<u32> {
        self.tokens.last().copied()
    }

    pub fn is_finished(&self, end: u32) -> bool {
        self.last_token() == Some(end)
    }

    /// Probability of the whole sequence, `exp(-score)`.
    pub fn probability(&self) -> f64 {
        (-self.score).exp()
    }
}

/// `-ln p`, clamped at zero so rounding in `p ≈ 1` never lowers a score.
pub(crate) fn neg_log(prob: f32) -> f64 {
    let cost = -(prob as f64).ln();
    if cost > 0.0 {
        cost
    } else {
        0.0
    }
}

/// Ascending score; equal scores order by the last token's id.
fn rank_order(a: &Hypothesis, b: &Hypothesis) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.last_token().cmp(&b.last_token()))
}

/// Sort candidates best-first and keep the first `k`.
///
/// The sort is stable, so candidates that tie on score and last token keep
/// the order of their parents in the previous beam.
pub(crate) fn prune(candidates: &mut Vec<Hypothesis>, k: usize) {
    candidates.sort_by(rank_order);
    candidates.truncate(k);
}
