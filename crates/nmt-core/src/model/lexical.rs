//! Table-driven translation model: lexical translation probabilities mixed
//! with a target-side bigram model.
//!
//! ```text
//! p(e | prev, src) = λ · mean_f t(e | f) + (1 - λ) · b(e | prev)
//! ```
//!
//! The source-side mixture `mean_f t(e | f)` is computed once in `encode`
//! and reused for every step. Every entry is floored before renormalizing,
//! so no token ever gets exactly zero probability, except pad and `<s>`,
//! which are never predicted.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::vocab::Vocabulary;

use super::{Distribution, ModelError, SequenceModel};

fn default_lambda() -> f32 {
    0.5
}

fn default_floor() -> f32 {
    1e-6
}

/// On-disk JSON layout. Tokens are given as strings and resolved against
/// the source/target vocabularies at load time.
#[derive(Debug, Deserialize)]
struct LexicalModelFile {
    #[serde(default = "default_lambda")]
    lambda: f32,
    #[serde(default = "default_floor")]
    floor: f32,
    /// `(source token, target token, t(e|f))`
    #[serde(default)]
    translations: Vec<(String, String, f32)>,
    /// `(previous target token, next target token, b(e|prev))`
    #[serde(default)]
    bigrams: Vec<(String, String, f32)>,
}

#[derive(Debug)]
pub struct LexicalModel {
    lambda: f32,
    floor: f32,
    target_size: usize,
    /// Target pad and `<s>` ids.
    suppressed: [u32; 2],
    translations: HashMap<u32, Vec<(u32, f32)>>,
    bigrams: HashMap<u32, Vec<(u32, f32)>>,
}

/// Per-sentence source summary: `mean_f t(e | f)` over the target vocabulary.
#[derive(Debug, Clone)]
pub struct LexicalState {
    lexical: Vec<f32>,
}

impl LexicalModel {
    /// Load a JSON model file, resolving tokens through both vocabularies.
    pub fn open(
        path: &Path,
        source: &Vocabulary,
        target: &Vocabulary,
    ) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content, source, target)
    }

    pub fn from_json_str(
        json: &str,
        source: &Vocabulary,
        target: &Vocabulary,
    ) -> Result<Self, ModelError> {
        let file: LexicalModelFile =
            serde_json::from_str(json).map_err(|e| ModelError::Parse(e.to_string()))?;

        if !(0.0..=1.0).contains(&file.lambda) {
            return Err(ModelError::Parse(format!(
                "lambda must be in [0, 1], got {}",
                file.lambda
            )));
        }
        if !(file.floor > 0.0 && file.floor.is_finite()) {
            return Err(ModelError::Parse(format!(
                "floor must be positive, got {}",
                file.floor
            )));
        }

        let resolve = |vocab: &Vocabulary, side: &str, token: &str| {
            vocab
                .id(token)
                .ok_or_else(|| ModelError::Parse(format!("unknown {side} token {token:?}")))
        };
        let check_prob = |p: f32, what: &str| {
            if p.is_finite() && p >= 0.0 {
                Ok(p)
            } else {
                Err(ModelError::Parse(format!("invalid {what} probability {p}")))
            }
        };

        let mut translations: HashMap<u32, Vec<(u32, f32)>> = HashMap::new();
        for (f, e, p) in &file.translations {
            let p = check_prob(*p, "translation")?;
            translations
                .entry(resolve(source, "source", f)?)
                .or_default()
                .push((resolve(target, "target", e)?, p));
        }

        let mut bigrams: HashMap<u32, Vec<(u32, f32)>> = HashMap::new();
        for (prev, next, p) in &file.bigrams {
            let p = check_prob(*p, "bigram")?;
            bigrams
                .entry(resolve(target, "target", prev)?)
                .or_default()
                .push((resolve(target, "target", next)?, p));
        }

        debug!(
            translations = file.translations.len(),
            bigrams = file.bigrams.len(),
            target_size = target.len(),
            "loaded lexical model"
        );
        Ok(Self {
            lambda: file.lambda,
            floor: file.floor,
            target_size: target.len(),
            suppressed: [target.specials().pad, target.specials().start],
            translations,
            bigrams,
        })
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// One-line description for CLI output.
    pub fn config_summary(&self) -> String {
        format!(
            "lexical model: target_size={}, lambda={}, floor={}, source entries={}, bigram contexts={}",
            self.target_size,
            self.lambda,
            self.floor,
            self.translations.len(),
            self.bigrams.len()
        )
    }

    fn scatter(&self, dst: &mut [f32], entries: &[(u32, f32)], weight: f32) {
        for &(id, p) in entries {
            if let Some(slot) = dst.get_mut(id as usize) {
                *slot += weight * p;
            }
        }
    }
}

impl SequenceModel for LexicalModel {
    type State = LexicalState;

    fn encode(&self, source: &[u32]) -> Result<LexicalState, ModelError> {
        let mut lexical = vec![0.0f32; self.target_size];
        let mut covered = 0usize;
        for f in source {
            if let Some(entries) = self.translations.get(f) {
                self.scatter(&mut lexical, entries, 1.0);
                covered += 1;
            }
        }
        if covered == 0 {
            lexical.fill(1.0 / self.target_size as f32);
        } else {
            let inv = 1.0 / covered as f32;
            lexical.iter_mut().for_each(|p| *p *= inv);
        }
        Ok(LexicalState { lexical })
    }

    fn decode_step(
        &self,
        padded: &[u32],
        prefix_len: usize,
        state: &LexicalState,
    ) -> Result<Distribution, ModelError> {
        if prefix_len == 0 || prefix_len > padded.len() {
            return Err(ModelError::PrefixLength {
                prefix_len,
                padded_len: padded.len(),
            });
        }
        let prev = padded[prefix_len - 1];
        if prev as usize >= self.target_size {
            return Err(ModelError::TokenOutOfRange {
                id: prev,
                size: self.target_size,
            });
        }

        let mut probs: Vec<f32> = state.lexical.iter().map(|p| self.lambda * p).collect();
        let bigram_weight = 1.0 - self.lambda;
        match self.bigrams.get(&prev) {
            Some(entries) => self.scatter(&mut probs, entries, bigram_weight),
            None => {
                let uniform = bigram_weight / self.target_size as f32;
                probs.iter_mut().for_each(|p| *p += uniform);
            }
        }

        let mut total = 0.0f32;
        for (id, p) in probs.iter_mut().enumerate() {
            if self.suppressed.contains(&(id as u32)) {
                *p = 0.0;
                continue;
            }
            *p += self.floor;
            total += *p;
        }
        probs.iter_mut().for_each(|p| *p /= total);
        Distribution::new(probs)
    }
}
