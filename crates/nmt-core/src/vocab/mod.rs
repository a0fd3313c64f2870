//! Token ↔ id mapping with reserved symbols.
//!
//! Id 0 is always the pad symbol. `<s>` and `</s>` are looked up once when
//! the vocabulary is built and handed to the search engine as `SpecialIds`,
//! so no decoder code hard-codes their integer values.

mod io;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::tokenize;

pub use io::{MAGIC, VERSION};

pub const PAD_ID: u32 = 0;
pub const START_TOKEN: &str = "<s>";
pub const END_TOKEN: &str = "</s>";
pub const DEFAULT_UNKNOWN_TOKEN: &str = "<unk>";

/// Error type for building, loading, and saving vocabularies.
#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected NMTV)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("vocabulary is empty")]
    Empty,

    #[error("duplicate token {token:?} (ids {first} and {second})")]
    Duplicate {
        token: String,
        first: u32,
        second: u32,
    },

    #[error("missing reserved symbol {0:?}")]
    MissingSymbol(String),

    #[error("reserved symbol {0:?} must not occupy the pad id 0")]
    PadConflict(String),
}

/// Reserved ids the decoder needs, resolved at vocabulary build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialIds {
    pub pad: u32,
    pub start: u32,
    pub end: u32,
    pub unknown: Option<u32>,
}

impl SpecialIds {
    /// Pad, start, and end never appear in rendered output.
    pub fn is_reserved(&self, id: u32) -> bool {
        id == self.pad || id == self.start || id == self.end
    }
}

/// What to do with a token that is not in the vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OovPolicy {
    /// Substitute the unknown-token id.
    #[default]
    Unknown,
    /// Drop the token from the encoded sentence.
    Skip,
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, u32>,
    specials: SpecialIds,
    oov: OovPolicy,
}

impl Vocabulary {
    /// Build from tokens listed in id order. The token at index 0 is the pad symbol.
    ///
    /// `<s>` and `</s>` must be present; `<unk>` is picked up when present.
    /// Without `<unk>` the OOV policy starts as `Skip`.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, VocabError> {
        if tokens.is_empty() {
            return Err(VocabError::Empty);
        }
        let mut index = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            let id = id as u32;
            if let Some(first) = index.insert(token.clone(), id) {
                return Err(VocabError::Duplicate {
                    token: token.clone(),
                    first,
                    second: id,
                });
            }
        }

        let lookup = |symbol: &str| -> Result<u32, VocabError> {
            match index.get(symbol) {
                Some(&PAD_ID) => Err(VocabError::PadConflict(symbol.to_string())),
                Some(&id) => Ok(id),
                None => Err(VocabError::MissingSymbol(symbol.to_string())),
            }
        };
        let specials = SpecialIds {
            pad: PAD_ID,
            start: lookup(START_TOKEN)?,
            end: lookup(END_TOKEN)?,
            unknown: index.get(DEFAULT_UNKNOWN_TOKEN).copied(),
        };

        let oov = match specials.unknown {
            Some(_) => OovPolicy::Unknown,
            None => OovPolicy::Skip,
        };
        Ok(Self {
            tokens,
            index,
            specials,
            oov,
        })
    }

    /// Select the OOV policy. `Unknown` requires `unknown_token` to be in the vocabulary.
    pub fn with_oov_policy(
        mut self,
        policy: OovPolicy,
        unknown_token: &str,
    ) -> Result<Self, VocabError> {
        if policy == OovPolicy::Unknown {
            let id = self
                .index
                .get(unknown_token)
                .copied()
                .ok_or_else(|| VocabError::MissingSymbol(unknown_token.to_string()))?;
            if id == PAD_ID {
                return Err(VocabError::PadConflict(unknown_token.to_string()));
            }
            self.specials.unknown = Some(id);
        }
        self.oov = policy;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn specials(&self) -> SpecialIds {
        self.specials
    }

    pub fn oov_policy(&self) -> OovPolicy {
        self.oov
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Exact lookup without applying the OOV policy.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }

    /// Lookup applying the OOV policy. `None` means the token is skipped.
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        if let Some(id) = self.id(token) {
            return Some(id);
        }
        match self.oov {
            OovPolicy::Unknown => self.specials.unknown,
            OovPolicy::Skip => None,
        }
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Encode a whitespace-tokenized sentence as `<s> ids… </s>`.
    pub fn encode_sentence(&self, text: &str) -> Vec<u32> {
        let mut ids = vec![self.specials.start];
        let mut misses = 0usize;
        for token in tokenize(text) {
            if !self.index.contains_key(token) {
                misses += 1;
            }
            if let Some(id) = self.token_to_id(token) {
                ids.push(id);
            }
        }
        ids.push(self.specials.end);
        if misses > 0 {
            debug!(misses, policy = ?self.oov, "out-of-vocabulary tokens");
        }
        ids
    }

    /// Render ids as a space-joined sentence, dropping pad, start, and end.
    ///
    /// Ids outside the vocabulary are dropped too.
    pub fn decode_ids(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter(|&&id| !self.specials.is_reserved(id))
            .filter_map(|&id| self.id_to_token(id))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
