use std::collections::HashMap;

use crate::text::tokenize;

use super::{EvalError, SentenceScorer};

/// Unsmoothed BLEU: clipped n-gram precisions for orders `1..=n`, combined
/// by geometric mean and scaled by the brevity penalty. Any zero precision
/// makes the whole score zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bleu;

impl SentenceScorer for Bleu {
    fn score(&self, candidate: &str, reference: &str, ngram_order: usize) -> f64 {
        sentence_bleu(candidate, reference, ngram_order)
    }
}

/// Matched and total n-gram counts per order, plus the two lengths the
/// brevity penalty needs. Sums over sentences give corpus BLEU.
#[derive(Debug, Clone, Default)]
struct NgramStats {
    matches: Vec<usize>,
    totals: Vec<usize>,
    candidate_len: usize,
    reference_len: usize,
}

impl NgramStats {
    fn new(order: usize) -> Self {
        Self {
            matches: vec![0; order],
            totals: vec![0; order],
            candidate_len: 0,
            reference_len: 0,
        }
    }

    fn add(&mut self, candidate: &[&str], reference: &[&str]) {
        self.candidate_len += candidate.len();
        self.reference_len += reference.len();
        for n in 1..=self.matches.len() {
            let cand = ngram_counts(candidate, n);
            let refs = ngram_counts(reference, n);
            let clipped: usize = cand
                .iter()
                .map(|(gram, &count)| count.min(refs.get(gram).copied().unwrap_or(0)))
                .sum();
            self.matches[n - 1] += clipped;
            self.totals[n - 1] += candidate.len().saturating_sub(n - 1);
        }
    }

    fn bleu(&self) -> f64 {
        if self.candidate_len == 0 {
            return 0.0;
        }
        let mut log_sum = 0.0;
        for (&m, &t) in self.matches.iter().zip(&self.totals) {
            if m == 0 || t == 0 {
                return 0.0;
            }
            log_sum += (m as f64 / t as f64).ln();
        }
        let order = self.matches.len() as f64;
        let c = self.candidate_len as f64;
        let r = self.reference_len as f64;
        let brevity = if c > r { 1.0 } else { (1.0 - r / c).exp() };
        brevity * (log_sum / order).exp()
    }
}

fn ngram_counts<'a, 'b>(tokens: &'b [&'a str], n: usize) -> HashMap<&'b [&'a str], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// BLEU of one candidate against one reference, both whitespace-tokenized.
/// Returns 0 for `ngram_order == 0`.
pub fn sentence_bleu(candidate: &str, reference: &str, ngram_order: usize) -> f64 {
    if ngram_order == 0 {
        return 0.0;
    }
    let cand: Vec<&str> = tokenize(candidate).collect();
    let refs: Vec<&str> = tokenize(reference).collect();
    let mut stats = NgramStats::new(ngram_order);
    stats.add(&cand, &refs);
    stats.bleu()
}

/// Corpus BLEU: n-gram counts and lengths are summed over all sentence pairs
/// before precisions and the brevity penalty are computed.
pub fn corpus_bleu<C, R>(
    candidates: &[C],
    references: &[R],
    ngram_order: usize,
) -> Result<f64, EvalError>
where
    C: AsRef<str>,
    R: AsRef<str>,
{
    if ngram_order == 0 {
        return Err(EvalError::InvalidOrder(ngram_order));
    }
    if candidates.len() != references.len() {
        return Err(EvalError::LengthMismatch {
            candidates: candidates.len(),
            references: references.len(),
        });
    }
    let mut stats = NgramStats::new(ngram_order);
    for (cand, reference) in candidates.iter().zip(references) {
        let cand: Vec<&str> = tokenize(cand.as_ref()).collect();
        let refs: Vec<&str> = tokenize(reference.as_ref()).collect();
        stats.add(&cand, &refs);
    }
    Ok(stats.bleu())
}
