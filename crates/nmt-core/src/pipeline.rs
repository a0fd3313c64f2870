//! Text in, ranked text out: vocabulary lookup, beam search, and rendering
//! (id → token, BPE reversal) wired together for the command-line driver.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::eval::{oracle_corpus, EvalError, OracleReport, SentenceScorer};
use crate::model::SequenceModel;
use crate::search::{
    BatchProgress, BeamSearch, CorpusDecoder, DecodeError, Hypothesis, SearchConfig,
    SearchLimits, SearchTrace,
};
use crate::settings::Settings;
use crate::text::revert_bpe;
use crate::vocab::Vocabulary;

/// One rendered candidate translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredText {
    pub text: String,
    pub score: f64,
}

/// How a corpus run is batched and bounded.
#[derive(Debug, Clone)]
pub struct CorpusRun {
    pub batch_size: usize,
    pub parallel: bool,
    pub limits: SearchLimits,
}

impl CorpusRun {
    pub fn from_settings(settings: &Settings, limits: SearchLimits) -> Self {
        Self {
            batch_size: settings.batch.batch_size,
            parallel: settings.batch.parallel,
            limits,
        }
    }
}

/// Rendered candidates for every input line, aligned with the input.
#[derive(Debug)]
pub struct CorpusTranslation {
    /// Best first. Empty for failed sentences.
    pub candidates: Vec<Vec<String>>,
    pub failed: Vec<usize>,
    pub elapsed: Duration,
}

pub struct Translator<'a, M: SequenceModel> {
    source: &'a Vocabulary,
    target: &'a Vocabulary,
    engine: BeamSearch<'a, M>,
}

impl<'a, M: SequenceModel> Translator<'a, M> {
    pub fn new(
        model: &'a M,
        source: &'a Vocabulary,
        target: &'a Vocabulary,
        config: SearchConfig,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            source,
            target,
            engine: BeamSearch::new(model, target, config)?,
        })
    }

    pub fn engine(&self) -> &BeamSearch<'a, M> {
        &self.engine
    }

    /// `<s> ids… </s>` for one source line.
    pub fn encode(&self, line: &str) -> Vec<u32> {
        self.source.encode_sentence(line)
    }

    /// Target tokens without reserved symbols, BPE joined.
    pub fn render(&self, hyp: &Hypothesis) -> String {
        revert_bpe(&self.target.decode_ids(&hyp.tokens))
    }

    pub fn translate(&self, line: &str) -> Result<Vec<ScoredText>, DecodeError> {
        let beam = self.engine.decode(&self.encode(line))?;
        Ok(beam
            .iter()
            .map(|hyp| ScoredText {
                text: self.render(hyp),
                score: hyp.score,
            })
            .collect())
    }

    pub fn greedy(&self, line: &str) -> Result<ScoredText, DecodeError> {
        let hyp = self.engine.greedy(&self.encode(line))?;
        Ok(ScoredText {
            text: self.render(&hyp),
            score: hyp.score,
        })
    }

    pub fn explain(&self, line: &str) -> Result<SearchTrace, DecodeError> {
        let (_, trace) = self.engine.decode_traced(&self.encode(line))?;
        Ok(trace)
    }

    /// Decode every line in batches, calling `on_batch` after each one.
    pub fn translate_corpus<S, F>(
        &self,
        lines: &[S],
        run: &CorpusRun,
        on_batch: F,
    ) -> Result<CorpusTranslation, DecodeError>
    where
        S: AsRef<str>,
        F: FnMut(&BatchProgress),
    {
        let sources: Vec<Vec<u32>> = lines.iter().map(|l| self.encode(l.as_ref())).collect();
        let decoder = CorpusDecoder::new(&self.engine, run.batch_size)?
            .parallel(run.parallel)
            .with_limits(run.limits.clone());
        let outcome = decoder.decode_corpus_with(&sources, on_batch);

        let candidates = outcome
            .results
            .iter()
            .map(|beam| beam.iter().map(|hyp| self.render(hyp)).collect())
            .collect();
        Ok(CorpusTranslation {
            candidates,
            failed: outcome.failed_indices(),
            elapsed: outcome.elapsed,
        })
    }
}

/// Oracle best-of-k against references, which are BPE-reverted first so both
/// sides are compared as plain words.
pub fn evaluate_oracle<R: AsRef<str>>(
    translation: &CorpusTranslation,
    references: &[R],
    scorer: &dyn SentenceScorer,
    ngram_order: usize,
) -> Result<OracleReport, EvalError> {
    let references: Vec<String> = references.iter().map(|r| revert_bpe(r.as_ref())).collect();
    let report = oracle_corpus(&translation.candidates, &references, scorer, ngram_order)?;
    info!(
        sentences = references.len(),
        mean_score = report.rounded_mean(),
        corpus_bleu = report.corpus_bleu,
        "oracle evaluation"
    );
    Ok(report)
}
