//! Sequence-model interface consumed by the search engine, plus adapters.
//!
//! The engine only ever sees `encode` and `decode_step`. Everything behind
//! them (weights, architecture, caches) belongs to the adapter.

#[cfg(feature = "neural")]
mod candle;
mod lexical;
#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::io;

#[cfg(feature = "neural")]
pub use candle::{CandleModel, LogitsBackend};
pub use lexical::{LexicalModel, LexicalState};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("model file parse error: {0}")]
    Parse(String),

    #[error("empty distribution")]
    EmptyDistribution,

    #[error("distribution has no probability mass")]
    NoProbabilityMass,

    #[error("distribution covers {got} tokens but the target vocabulary has {expected}")]
    OutputSize { got: usize, expected: usize },

    #[error("invalid probability {value} for token {id}")]
    InvalidProbability { id: u32, value: f32 },

    #[error("token id {id} outside vocabulary of size {size}")]
    TokenOutOfRange { id: u32, size: usize },

    #[error("prefix length {prefix_len} does not fit padded input of length {padded_len}")]
    PrefixLength {
        prefix_len: usize,
        padded_len: usize,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

/// A source-conditioned next-token predictor.
///
/// `State` is produced once per source sentence and shared read-only by
/// every hypothesis decoded against it.
pub trait SequenceModel: Send + Sync {
    type State: Send + Sync;

    fn encode(&self, source: &[u32]) -> Result<Self::State, ModelError>;

    /// Distribution over the token following `padded[..prefix_len]`.
    ///
    /// `padded` is right-padded with the pad id to the configured decode
    /// horizon; `prefix_len` is always at least 1.
    fn decode_step(
        &self,
        padded: &[u32],
        prefix_len: usize,
        state: &Self::State,
    ) -> Result<Distribution, ModelError>;
}

/// Dense next-token probabilities indexed by token id.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    probs: Vec<f32>,
}

impl Distribution {
    /// Wrap a probability vector. Values must be finite and non-negative,
    /// with at least one positive entry.
    pub fn new(probs: Vec<f32>) -> Result<Self, ModelError> {
        if probs.is_empty() {
            return Err(ModelError::EmptyDistribution);
        }
        if let Some((id, &value)) = probs
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(ModelError::InvalidProbability {
                id: id as u32,
                value,
            });
        }
        if !probs.iter().any(|&p| p > 0.0) {
            return Err(ModelError::NoProbabilityMass);
        }
        Ok(Self { probs })
    }

    /// Build a `size`-entry distribution that is zero except at the given ids.
    pub fn from_pairs(size: usize, pairs: &[(u32, f32)]) -> Result<Self, ModelError> {
        let mut probs = vec![0.0; size];
        for &(id, p) in pairs {
            let slot = probs
                .get_mut(id as usize)
                .ok_or(ModelError::TokenOutOfRange { id, size })?;
            *slot = p;
        }
        Self::new(probs)
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn prob(&self, id: u32) -> f32 {
        self.probs.get(id as usize).copied().unwrap_or(0.0)
    }

    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    /// The `k` most probable tokens, most probable first.
    ///
    /// Equal probabilities order by ascending id. Zero-probability tokens are
    /// never returned, so fewer than `k` entries may come back.
    pub fn top_k(&self, k: usize) -> Vec<(u32, f32)> {
        if k == 0 {
            return Vec::new();
        }
        let mut ranked: Vec<(u32, f32)> = self
            .probs
            .iter()
            .enumerate()
            .filter(|(_, &p)| p > 0.0)
            .map(|(id, &p)| (id as u32, p))
            .collect();
        if ranked.len() > k {
            ranked.select_nth_unstable_by(k - 1, rank_order);
            ranked.truncate(k);
        }
        ranked.sort_by(rank_order);
        ranked
    }

    pub fn argmax(&self) -> Option<(u32, f32)> {
        self.top_k(1).into_iter().next()
    }
}

fn rank_order(a: &(u32, f32), b: &(u32, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}
