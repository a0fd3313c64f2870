use std::time::Instant;

use tracing::{debug, debug_span};

use crate::model::{Distribution, ModelError, SequenceModel};
use crate::vocab::{SpecialIds, Vocabulary};

use super::beam::{prune, Hypothesis};
use super::trace::{SearchTrace, StepRecord};
use super::{DecodeError, SearchConfig, SearchLimits};

/// Beam-search engine bound to one model and one target vocabulary.
///
/// Holds no per-sentence state: every `decode*` call owns its beam, so a
/// single engine can be shared across threads.
pub struct BeamSearch<'m, M: SequenceModel> {
    model: &'m M,
    specials: SpecialIds,
    vocab_size: Option<usize>,
    config: SearchConfig,
}

impl<'m, M: SequenceModel> BeamSearch<'m, M> {
    /// Create an engine, reading the reserved ids from the target vocabulary.
    ///
    /// Every distribution the model returns must fit inside that vocabulary.
    pub fn new(
        model: &'m M,
        target: &Vocabulary,
        config: SearchConfig,
    ) -> Result<Self, DecodeError> {
        let mut engine = Self::with_specials(model, target.specials(), config)?;
        engine.vocab_size = Some(target.len());
        Ok(engine)
    }

    pub fn with_specials(
        model: &'m M,
        specials: SpecialIds,
        config: SearchConfig,
    ) -> Result<Self, DecodeError> {
        config.validate()?;
        Ok(Self {
            model,
            specials,
            vocab_size: None,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn specials(&self) -> SpecialIds {
        self.specials
    }

    /// Decode one source sentence. Returns up to `k` hypotheses, best first.
    pub fn decode(&self, source: &[u32]) -> Result<Vec<Hypothesis>, DecodeError> {
        self.run(source, &SearchLimits::default(), None)
    }

    /// Like `decode`, but aborts with `Timeout`/`Cancelled` between steps.
    pub fn decode_with_limits(
        &self,
        source: &[u32],
        limits: &SearchLimits,
    ) -> Result<Vec<Hypothesis>, DecodeError> {
        self.run(source, limits, None)
    }

    /// Like `decode`, also returning a snapshot of the beam after every step.
    pub fn decode_traced(
        &self,
        source: &[u32],
    ) -> Result<(Vec<Hypothesis>, SearchTrace), DecodeError> {
        let mut steps = Vec::with_capacity(self.config.max_length);
        let beam = self.run(source, &SearchLimits::default(), Some(&mut steps))?;
        Ok((beam, SearchTrace { steps }))
    }

    /// Greedy decoding: always take the single most probable next token,
    /// stopping at `</s>` or at the horizon.
    pub fn greedy(&self, source: &[u32]) -> Result<Hypothesis, DecodeError> {
        let _span = debug_span!("greedy_decode", source_len = source.len()).entered();
        self.check_source(source)?;
        let state = self.model.encode(source)?;
        let mut padded = Vec::with_capacity(self.config.max_length);

        let mut hyp = Hypothesis::start(self.specials.start);
        while !self.is_frozen(&hyp) {
            let dist = self.step_distribution(&hyp.tokens, &state, &mut padded)?;
            let (token, prob) = dist.argmax().ok_or(ModelError::NoProbabilityMass)?;
            hyp = hyp.extend(token, prob);
        }
        debug!(len = hyp.len(), score = hyp.score);
        Ok(hyp)
    }

    fn run(
        &self,
        source: &[u32],
        limits: &SearchLimits,
        mut trace: Option<&mut Vec<StepRecord>>,
    ) -> Result<Vec<Hypothesis>, DecodeError> {
        let k = self.config.beam_width;
        let max_length = self.config.max_length;
        let _span = debug_span!("beam_decode", k, max_length, source_len = source.len()).entered();
        let started = Instant::now();

        self.check_source(source)?;
        limits.check(0, started)?;
        let state = self.model.encode(source)?;
        let mut padded = Vec::with_capacity(max_length);

        // Step 0: seed from the distribution after <s>.
        let root = Hypothesis::start(self.specials.start);
        let dist = self.step_distribution(&root.tokens, &state, &mut padded)?;
        let mut beam: Vec<Hypothesis> = dist
            .top_k(k)
            .into_iter()
            .map(|(token, prob)| root.extend(token, prob))
            .collect();
        prune(&mut beam, k);
        if let Some(records) = trace.as_mut() {
            records.push(StepRecord::new(0, 1, 0, &beam));
        }

        for step in 1..max_length {
            limits.check(step, started)?;

            let mut candidates = Vec::with_capacity(beam.len() * k);
            let mut expanded = 0usize;
            let mut frozen = 0usize;
            for hyp in &beam {
                if self.is_frozen(hyp) {
                    candidates.push(hyp.clone());
                    frozen += 1;
                    continue;
                }
                let dist = self.step_distribution(&hyp.tokens, &state, &mut padded)?;
                expanded += 1;
                candidates.extend(
                    dist.top_k(k)
                        .into_iter()
                        .map(|(token, prob)| hyp.extend(token, prob)),
                );
            }
            prune(&mut candidates, k);
            beam = candidates;

            debug!(
                step,
                expanded,
                frozen,
                best_score = beam.first().map(|h| h.score)
            );
            if let Some(records) = trace.as_mut() {
                records.push(StepRecord::new(step, expanded, frozen, &beam));
            }
        }

        debug!(
            result_count = beam.len(),
            best_score = beam.first().map(|h| h.score),
            elapsed_us = started.elapsed().as_micros() as u64
        );
        Ok(beam)
    }

    /// Finished hypotheses, and those already at the horizon, are never expanded.
    fn is_frozen(&self, hyp: &Hypothesis) -> bool {
        hyp.is_finished(self.specials.end) || hyp.len() >= self.config.max_length
    }

    fn check_source(&self, source: &[u32]) -> Result<(), DecodeError> {
        if let Some(limit) = self.config.max_source_length {
            if source.len() > limit {
                return Err(DecodeError::invalid(
                    "source",
                    format!("length {} exceeds max_source_length {limit}", source.len()),
                ));
            }
        }
        Ok(())
    }

    /// Right-pad `prefix` to the horizon and ask the model for the next token.
    fn step_distribution(
        &self,
        prefix: &[u32],
        state: &M::State,
        padded: &mut Vec<u32>,
    ) -> Result<Distribution, DecodeError> {
        padded.clear();
        padded.extend_from_slice(prefix);
        padded.resize(self.config.max_length, self.specials.pad);
        let dist = self.model.decode_step(padded, prefix.len(), state)?;
        if let Some(expected) = self.vocab_size {
            if dist.len() > expected {
                return Err(ModelError::OutputSize {
                    got: dist.len(),
                    expected,
                }
                .into());
            }
        }
        Ok(dist)
    }
}
