use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{VocabError, Vocabulary};

pub const MAGIC: &[u8; 4] = b"NMTV";
pub const VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct VocabularyData {
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Parse the plain-text format: one token per line, id = line number.
    ///
    /// Only the first whitespace-separated field of a line is used, so
    /// `token count` listings load unchanged.
    pub fn from_text(text: &str) -> Result<Self, VocabError> {
        let mut tokens = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let token = line.split_whitespace().next().ok_or_else(|| {
                VocabError::Parse(format!("line {}: empty token", lineno + 1))
            })?;
            tokens.push(token.to_string());
        }
        Self::from_tokens(tokens)
    }

    /// Serialize to bytes (NMTV format).
    pub fn to_bytes(&self) -> Result<Vec<u8>, VocabError> {
        let data = VocabularyData {
            tokens: self.tokens.clone(),
        };
        let body = bincode::serialize(&data).map_err(VocabError::Serialize)?;

        let mut buf = Vec::with_capacity(5 + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize from bytes (NMTV format).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VocabError> {
        if bytes.len() < 5 {
            return Err(VocabError::InvalidHeader);
        }
        if &bytes[0..4] != MAGIC {
            return Err(VocabError::InvalidMagic);
        }
        if bytes[4] != VERSION {
            return Err(VocabError::UnsupportedVersion(bytes[4]));
        }
        let data: VocabularyData =
            bincode::deserialize(&bytes[5..]).map_err(VocabError::Deserialize)?;
        Self::from_tokens(data.tokens)
    }

    /// Open either format, detected by the magic bytes.
    pub fn open(path: &Path) -> Result<Self, VocabError> {
        let bytes = fs::read(path)?;
        if bytes.starts_with(MAGIC) {
            return Self::from_bytes(&bytes);
        }
        let text = String::from_utf8(bytes)
            .map_err(|e| VocabError::Parse(format!("not UTF-8 text: {e}")))?;
        Self::from_text(&text)
    }

    /// Atomic write: write to .tmp then rename.
    pub fn save(&self, path: &Path) -> Result<(), VocabError> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
