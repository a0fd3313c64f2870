//! Decoder settings loaded from TOML.
//!
//! - Defaults are embedded via `include_str!("default_settings.toml")` and
//!   checked at compile time by `build.rs`
//! - `parse_settings_toml` parses and validates a custom file
//! - Settings are plain values handed to whoever needs them; there is no
//!   process-wide instance

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::eval::DEFAULT_NGRAM_ORDER;
use crate::output::DEFAULT_EXTENSION;
use crate::search::{CancelFlag, SearchConfig, SearchLimits, MIN_MAX_LENGTH};
use crate::vocab::{OovPolicy, DEFAULT_UNKNOWN_TOKEN};

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub search: SearchSettings,
    pub batch: BatchSettings,
    pub vocab: VocabSettings,
    pub eval: EvalSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub beam_width: usize,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub max_source_length: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    pub batch_size: usize,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabSettings {
    pub oov_policy: OovPolicy,
    pub unknown_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSettings {
    pub ngram_order: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub extension: String,
}

impl Default for Settings {
    /// Same values as the embedded `default_settings.toml`.
    fn default() -> Self {
        Self {
            search: SearchSettings {
                beam_width: 5,
                max_length: None,
                max_source_length: None,
                timeout_ms: None,
            },
            batch: BatchSettings {
                batch_size: 200,
                parallel: false,
            },
            vocab: VocabSettings {
                oov_policy: OovPolicy::Unknown,
                unknown_token: DEFAULT_UNKNOWN_TOKEN.to_string(),
            },
            eval: EvalSettings {
                ngram_order: DEFAULT_NGRAM_ORDER,
            },
            output: OutputSettings {
                extension: DEFAULT_EXTENSION.to_string(),
            },
        }
    }
}

impl Settings {
    /// Read and validate a settings file.
    pub fn open(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        parse_settings_toml(&content)
    }

    /// Engine configuration. `fallback_max_length` is used when no horizon is
    /// configured, typically `text::horizon_for` over the input, raised to
    /// `MIN_MAX_LENGTH` if shorter.
    pub fn search_config(&self, fallback_max_length: usize) -> SearchConfig {
        SearchConfig {
            beam_width: self.search.beam_width,
            max_length: self
                .search
                .max_length
                .unwrap_or(fallback_max_length.max(MIN_MAX_LENGTH)),
            max_source_length: self.search.max_source_length,
        }
    }

    pub fn limits(&self, cancel: Option<CancelFlag>) -> SearchLimits {
        SearchLimits {
            timeout: self.search.timeout_ms.map(Duration::from_millis),
            cancel,
        }
    }

    /// Serialize back to TOML, e.g. after command-line overrides.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        validate(self)
    }
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive_opt {
        ($section:ident . $field:ident) => {
            if s.$section.$field == Some(0) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive when set".to_string(),
                });
            }
        };
    }
    macro_rules! check_non_empty {
        ($section:ident . $field:ident) => {
            if s.$section.$field.trim().is_empty() {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        };
    }

    check_positive!(search.beam_width);
    check_positive_opt!(search.max_source_length);
    check_positive_opt!(search.timeout_ms);
    if let Some(l) = s.search.max_length {
        if l < MIN_MAX_LENGTH {
            return Err(SettingsError::InvalidValue {
                field: "search.max_length".to_string(),
                reason: format!("must be at least {MIN_MAX_LENGTH}, got {l}"),
            });
        }
    }

    check_positive!(batch.batch_size);
    check_non_empty!(vocab.unknown_token);
    check_positive!(eval.ngram_order);

    check_non_empty!(output.extension);
    if s.output.extension.contains(['.', '/', '\\']) {
        return Err(SettingsError::InvalidValue {
            field: "output.extension".to_string(),
            reason: "must be a bare extension like \"en\"".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[search]
beam_width = 3

[batch]
batch_size = 50

[vocab]
oov_policy = "skip"
unknown_token = "<unk>"

[eval]
ngram_order = 2

[output]
extension = "de"
"#;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.search.beam_width, 5);
        assert_eq!(s.search.max_length, None);
        assert_eq!(s.batch.batch_size, 200);
        assert!(!s.batch.parallel);
        assert_eq!(s.vocab.oov_policy, OovPolicy::Unknown);
        assert_eq!(s.eval.ngram_order, 4);
        assert_eq!(s.output.extension, "en");
    }

    #[test]
    fn parse_valid_custom_toml() {
        let s = parse_settings_toml(MINIMAL).unwrap();
        assert_eq!(s.search.beam_width, 3);
        assert_eq!(s.vocab.oov_policy, OovPolicy::Skip);
        assert_eq!(s.output.extension, "de");
    }

    #[test]
    fn search_config_uses_fallback_horizon() {
        let mut s = Settings::default();
        assert_eq!(s.search_config(17), SearchConfig::new(5, 17));
        assert_eq!(s.search_config(2).max_length, MIN_MAX_LENGTH);

        s.search.max_length = Some(40);
        s.search.max_source_length = Some(100);
        let config = s.search_config(17);
        assert_eq!(config.max_length, 40);
        assert_eq!(config.max_source_length, Some(100));
    }

    #[test]
    fn limits_from_timeout() {
        let mut s = Settings::default();
        assert_eq!(s.limits(None).timeout, None);
        s.search.timeout_ms = Some(250);
        assert_eq!(s.limits(None).timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn to_toml_round_trips() {
        let mut s = Settings::default();
        s.search.max_length = Some(12);
        let text = s.to_toml().unwrap();
        assert_eq!(parse_settings_toml(&text).unwrap(), s);
    }

    #[test]
    fn error_zero_beam_width() {
        let toml = MINIMAL.replace("beam_width = 3", "beam_width = 0");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("search.beam_width"));
    }

    #[test]
    fn error_short_horizon() {
        let toml = MINIMAL.replace("beam_width = 3", "beam_width = 3\nmax_length = 2");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("search.max_length"));
    }

    #[test]
    fn error_zero_batch_size() {
        let toml = MINIMAL.replace("batch_size = 50", "batch_size = 0");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("batch.batch_size"));
    }

    #[test]
    fn error_bad_extension() {
        let toml = MINIMAL.replace("extension = \"de\"", "extension = \".de\"");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("output.extension"));
    }

    #[test]
    fn error_unknown_oov_policy() {
        let toml = MINIMAL.replace("\"skip\"", "\"random\"");
        assert!(matches!(
            parse_settings_toml(&toml),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn error_missing_section() {
        let toml = MINIMAL.replace("[eval]\nngram_order = 2\n", "");
        assert!(matches!(
            parse_settings_toml(&toml),
            Err(SettingsError::Parse(_))
        ));
    }
}
