//! Scripted models and a tiny vocabulary shared by the search tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::model::{Distribution, ModelError, SequenceModel};
use crate::vocab::Vocabulary;

pub(crate) const START: u32 = 1;
pub(crate) const END: u32 = 2;
pub(crate) const A: u32 = 3;
pub(crate) const B: u32 = 4;
pub(crate) const C: u32 = 5;

/// `{<pad>:0, <s>:1, </s>:2, a:3, b:4, c:5}`
pub(crate) fn test_vocab() -> Vocabulary {
    Vocabulary::from_tokens(
        ["<pad>", "<s>", "</s>", "a", "b", "c"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
    .unwrap()
}

/// Model whose next-token distribution is a closure of the unpadded prefix.
///
/// Counts `decode_step` calls, records the padded input lengths, and rejects
/// any input whose padding is not all pad ids.
pub(crate) struct ScriptedModel<F> {
    size: usize,
    script: F,
    poison: Option<u32>,
    calls: AtomicUsize,
    padded_lens: Mutex<Vec<usize>>,
}

impl<F> ScriptedModel<F>
where
    F: Fn(&[u32]) -> Vec<(u32, f32)> + Send + Sync,
{
    pub fn new(script: F) -> Self {
        Self {
            size: 6,
            script,
            poison: None,
            calls: AtomicUsize::new(0),
            padded_lens: Mutex::new(Vec::new()),
        }
    }

    /// Report distributions over `size` tokens instead of the test vocabulary's 6.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Fail `encode` for any source containing `id`.
    pub fn poisoned_by(mut self, id: u32) -> Self {
        self.poison = Some(id);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn padded_lens(&self) -> Vec<usize> {
        self.padded_lens.lock().unwrap().clone()
    }
}

impl<F> SequenceModel for ScriptedModel<F>
where
    F: Fn(&[u32]) -> Vec<(u32, f32)> + Send + Sync,
{
    type State = ();

    fn encode(&self, source: &[u32]) -> Result<(), ModelError> {
        match self.poison {
            Some(bad) if source.contains(&bad) => {
                Err(ModelError::Backend("poisoned source".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn decode_step(
        &self,
        padded: &[u32],
        prefix_len: usize,
        _state: &(),
    ) -> Result<Distribution, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.padded_lens.lock().unwrap().push(padded.len());
        if padded[prefix_len..].iter().any(|&t| t != 0) {
            return Err(ModelError::Backend("prefix not right-padded".to_string()));
        }
        Distribution::from_pairs(self.size, &(self.script)(&padded[..prefix_len]))
    }
}

/// Step-indexed model: `a` with certainty after `<s>`, then `</s>` with certainty.
pub(crate) fn a_then_end() -> ScriptedModel<impl Fn(&[u32]) -> Vec<(u32, f32)> + Send + Sync> {
    ScriptedModel::new(|prefix: &[u32]| {
        if prefix.len() == 1 {
            vec![(A, 1.0)]
        } else {
            vec![(END, 1.0)]
        }
    })
}

/// `{a: 0.6, b: 0.4}` after `<s>`, then always `</s>`.
pub(crate) fn a_or_b_then_end() -> ScriptedModel<impl Fn(&[u32]) -> Vec<(u32, f32)> + Send + Sync>
{
    ScriptedModel::new(|prefix: &[u32]| {
        if prefix.len() == 1 {
            vec![(A, 0.6), (B, 0.4)]
        } else {
            vec![(END, 1.0)]
        }
    })
}

/// The greedy first choice `a` leads to an expensive continuation; `b` does not.
pub(crate) fn garden_path() -> ScriptedModel<impl Fn(&[u32]) -> Vec<(u32, f32)> + Send + Sync> {
    ScriptedModel::new(|prefix: &[u32]| match prefix.last() {
        Some(&START) => vec![(A, 0.6), (B, 0.4)],
        Some(&A) => vec![(END, 0.25), (A, 0.25), (B, 0.25), (C, 0.25)],
        _ => vec![(END, 1.0)],
    })
}

/// Deterministic pseudo-random model: every distribution is a hash of the
/// source and the full prefix. Integer weights make probability ties common.
pub(crate) struct HashedModel {
    pub size: usize,
}

fn mix(h: u64, x: u64) -> u64 {
    h.wrapping_mul(6364136223846793005)
        .wrapping_add(x.wrapping_add(1442695040888963407))
}

impl SequenceModel for HashedModel {
    type State = u64;

    fn encode(&self, source: &[u32]) -> Result<u64, ModelError> {
        Ok(source.iter().fold(17, |h, &t| mix(h, t as u64)))
    }

    fn decode_step(
        &self,
        padded: &[u32],
        prefix_len: usize,
        state: &u64,
    ) -> Result<Distribution, ModelError> {
        let mut h = padded[..prefix_len]
            .iter()
            .fold(*state, |h, &t| mix(h, t as u64));
        let mut probs = vec![0.0f32; self.size];
        for p in probs.iter_mut().skip(1) {
            h = mix(h, 7);
            *p = ((h >> 33) % 8 + 1) as f32;
        }
        let total: f32 = probs.iter().sum();
        probs.iter_mut().for_each(|p| *p /= total);
        Distribution::new(probs)
    }
}
