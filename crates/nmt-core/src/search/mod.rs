//! Beam-search decoding over a `SequenceModel`.
//!
//! Seeds a beam from the first-step distribution, then expands every live
//! hypothesis with its top-k continuations for a fixed number of steps,
//! keeping the k cheapest (lowest cumulative negative log-probability)
//! candidates after each step. Finished hypotheses are carried forward
//! unchanged. `CorpusDecoder` drives the engine over a corpus in batches.

mod batch;
mod beam;
mod engine;
#[cfg(test)]
pub(crate) mod testutil;
mod trace;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::ModelError;

pub use batch::{
    for_each_batch, Batch, BatchProgress, Batches, CorpusDecoder, CorpusOutcome, FailedSentence,
};
pub use beam::Hypothesis;
pub use engine::BeamSearch;
pub use trace::{format_trace, SearchTrace, StepRecord};

/// Shortest horizon that can hold `<s>` plus one token and still expand.
pub const MIN_MAX_LENGTH: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid value for {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("model inference failed: {0}")]
    Model(#[from] ModelError),

    #[error("decode timed out at step {step} after {elapsed:?}")]
    Timeout { step: usize, elapsed: Duration },

    #[error("decode cancelled at step {step}")]
    Cancelled { step: usize },
}

impl DecodeError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Search parameters for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Beam width `k`.
    pub beam_width: usize,
    /// Fixed horizon `L`: number of steps, and the padded prefix length.
    pub max_length: usize,
    /// Longest accepted source sentence (ids, including `<s>`/`</s>`).
    pub max_source_length: Option<usize>,
}

impl SearchConfig {
    pub fn new(beam_width: usize, max_length: usize) -> Self {
        Self {
            beam_width,
            max_length,
            max_source_length: None,
        }
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.beam_width < 1 {
            return Err(DecodeError::invalid("beam_width", "must be at least 1"));
        }
        if self.max_length < MIN_MAX_LENGTH {
            return Err(DecodeError::invalid(
                "max_length",
                format!(
                    "must be at least {MIN_MAX_LENGTH} to hold <s> plus one token, got {}",
                    self.max_length
                ),
            ));
        }
        if self.max_source_length == Some(0) {
            return Err(DecodeError::invalid("max_source_length", "must be positive"));
        }
        Ok(())
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-sentence robustness limits, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelFlag>,
}

impl SearchLimits {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    pub(crate) fn check(&self, step: usize, started: Instant) -> Result<(), DecodeError> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(DecodeError::Cancelled { step });
        }
        if let Some(timeout) = self.timeout {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(DecodeError::Timeout { step, elapsed });
            }
        }
        Ok(())
    }
}
