use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn};

use crate::model::SequenceModel;

use super::beam::Hypothesis;
use super::engine::BeamSearch;
use super::{DecodeError, SearchLimits};

/// One contiguous slice of the corpus.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a, T> {
    pub index: usize,
    /// Corpus index of `items[0]`.
    pub offset: usize,
    pub items: &'a [T],
}

/// Lazy iterator over fixed-size batches. Cloning restarts from the current position;
/// calling `for_each_batch` again restarts from the beginning.
#[derive(Debug, Clone)]
pub struct Batches<'a, T> {
    corpus: &'a [T],
    batch_size: usize,
    offset: usize,
    index: usize,
}

/// Partition `corpus` into slices of at most `batch_size` items (the last may be shorter).
pub fn for_each_batch<T>(corpus: &[T], batch_size: usize) -> Result<Batches<'_, T>, DecodeError> {
    if batch_size == 0 {
        return Err(DecodeError::invalid("batch_size", "must be positive"));
    }
    Ok(Batches {
        corpus,
        batch_size,
        offset: 0,
        index: 0,
    })
}

impl<'a, T> Iterator for Batches<'a, T> {
    type Item = Batch<'a, T>;

    fn next(&mut self) -> Option<Batch<'a, T>> {
        if self.offset >= self.corpus.len() {
            return None;
        }
        let end = (self.offset + self.batch_size).min(self.corpus.len());
        let batch = Batch {
            index: self.index,
            offset: self.offset,
            items: &self.corpus[self.offset..end],
        };
        self.offset = end;
        self.index += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.corpus.len() - self.offset;
        let n = remaining.div_ceil(self.batch_size);
        (n, Some(n))
    }
}

impl<T> ExactSizeIterator for Batches<'_, T> {}

/// Reported to the caller after every batch.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub batch_index: usize,
    pub batch_count: usize,
    /// Sentences processed so far, including failures.
    pub processed: usize,
    pub total: usize,
    pub failed: usize,
    pub batch_elapsed: Duration,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct FailedSentence {
    pub index: usize,
    pub error: DecodeError,
}

/// Results aligned with the input corpus. Failed sentences have an empty
/// hypothesis list and an entry in `failed`.
#[derive(Debug)]
pub struct CorpusOutcome {
    pub results: Vec<Vec<Hypothesis>>,
    pub failed: Vec<FailedSentence>,
    pub elapsed: Duration,
}

impl CorpusOutcome {
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.index).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len() - self.failed.len()
    }
}

/// Drives a `BeamSearch` over a corpus, one batch at a time.
///
/// A failure in one sentence is logged and recorded; the run continues with
/// the next sentence.
pub struct CorpusDecoder<'e, 'm, M: SequenceModel> {
    engine: &'e BeamSearch<'m, M>,
    batch_size: usize,
    parallel: bool,
    limits: SearchLimits,
}

impl<'e, 'm, M: SequenceModel> CorpusDecoder<'e, 'm, M> {
    pub fn new(engine: &'e BeamSearch<'m, M>, batch_size: usize) -> Result<Self, DecodeError> {
        if batch_size == 0 {
            return Err(DecodeError::invalid("batch_size", "must be positive"));
        }
        Ok(Self {
            engine,
            batch_size,
            parallel: false,
            limits: SearchLimits::default(),
        })
    }

    /// Decode sentences within a batch concurrently (needs the `parallel` feature;
    /// otherwise ignored). Output order is unaffected.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn is_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }

    pub fn decode_corpus(&self, corpus: &[Vec<u32>]) -> CorpusOutcome {
        self.decode_corpus_with(corpus, |_| {})
    }

    /// Decode `corpus`, calling `on_batch` after each batch completes.
    pub fn decode_corpus_with<F>(&self, corpus: &[Vec<u32>], mut on_batch: F) -> CorpusOutcome
    where
        F: FnMut(&BatchProgress),
    {
        let started = Instant::now();
        let mut results = Vec::with_capacity(corpus.len());
        let mut failed = Vec::new();

        // batch_size was validated in `new`
        let batches = Batches {
            corpus,
            batch_size: self.batch_size,
            offset: 0,
            index: 0,
        };
        let batch_count = batches.len();

        for batch in batches {
            let _span = info_span!("decode_batch", index = batch.index, size = batch.items.len())
                .entered();
            let batch_started = Instant::now();

            for (i, outcome) in self.decode_batch(batch.items).into_iter().enumerate() {
                match outcome {
                    Ok(beam) => results.push(beam),
                    Err(error) => {
                        let index = batch.offset + i;
                        warn!(index, %error, "sentence failed, continuing");
                        failed.push(FailedSentence { index, error });
                        results.push(Vec::new());
                    }
                }
            }

            let progress = BatchProgress {
                batch_index: batch.index,
                batch_count,
                processed: results.len(),
                total: corpus.len(),
                failed: failed.len(),
                batch_elapsed: batch_started.elapsed(),
                elapsed: started.elapsed(),
            };
            debug!(
                processed = progress.processed,
                total = progress.total,
                failed = progress.failed,
                batch_ms = progress.batch_elapsed.as_millis() as u64,
                "batch decoded"
            );
            on_batch(&progress);
        }

        let elapsed = started.elapsed();
        info!(
            sentences = corpus.len(),
            failed = failed.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "corpus decoded"
        );
        CorpusOutcome {
            results,
            failed,
            elapsed,
        }
    }

    fn decode_batch(&self, items: &[Vec<u32>]) -> Vec<Result<Vec<Hypothesis>, DecodeError>> {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                use rayon::prelude::*;
                return items
                    .par_iter()
                    .map(|source| self.engine.decode_with_limits(source, &self.limits))
                    .collect();
            }
        }
        items
            .iter()
            .map(|source| self.engine.decode_with_limits(source, &self.limits))
            .collect()
    }
}
