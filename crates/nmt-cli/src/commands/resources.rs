//! Loading everything a decode run needs: settings, vocabularies, model, input text.

use std::fs;
use std::path::Path;

use nmt_core::model::LexicalModel;
use nmt_core::settings::Settings;
use nmt_core::vocab::Vocabulary;

/// File locations shared by every decoding command.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub source_vocab: String,
    pub target_vocab: String,
    pub model: String,
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub settings_file: Option<String>,
    pub beam_width: Option<usize>,
    pub max_length: Option<usize>,
    pub batch_size: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub parallel: bool,
    pub ngram_order: Option<usize>,
    pub extension: Option<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(k) = self.beam_width {
            settings.search.beam_width = k;
        }
        if let Some(l) = self.max_length {
            settings.search.max_length = Some(l);
        }
        if let Some(b) = self.batch_size {
            settings.batch.batch_size = b;
        }
        if let Some(ms) = self.timeout_ms {
            settings.search.timeout_ms = Some(ms);
        }
        if self.parallel {
            settings.batch.parallel = true;
        }
        if let Some(n) = self.ngram_order {
            settings.eval.ngram_order = n;
        }
        if let Some(ref ext) = self.extension {
            settings.output.extension = ext.clone();
        }
    }
}

pub struct Resources {
    pub settings: Settings,
    pub source: Vocabulary,
    pub target: Vocabulary,
    pub model: LexicalModel,
}

/// Settings file (or defaults) with overrides applied and re-validated.
pub fn load_settings(overrides: &Overrides) -> Settings {
    let mut settings = match overrides.settings_file {
        Some(ref file) => die!(
            Settings::open(Path::new(file)),
            "Error loading settings {file}: {}"
        ),
        None => Settings::default(),
    };
    overrides.apply(&mut settings);
    die!(settings.validate(), "Error: {}");
    settings
}

pub fn open_resources(paths: &ModelPaths, overrides: &Overrides) -> Resources {
    let settings = load_settings(overrides);

    let source = die!(
        Vocabulary::open(Path::new(&paths.source_vocab)),
        "Failed to open source vocabulary at {}: {}",
        paths.source_vocab
    );
    let source = die!(
        source.with_oov_policy(settings.vocab.oov_policy, &settings.vocab.unknown_token),
        "Source vocabulary cannot use the configured OOV policy: {}"
    );
    let target = die!(
        Vocabulary::open(Path::new(&paths.target_vocab)),
        "Failed to open target vocabulary at {}: {}",
        paths.target_vocab
    );
    let model = die!(
        LexicalModel::open(Path::new(&paths.model), &source, &target),
        "Failed to load model at {}: {}",
        paths.model
    );
    tracing::info!(
        source_vocab = source.len(),
        target_vocab = target.len(),
        beam_width = settings.search.beam_width,
        "resources loaded"
    );

    Resources {
        settings,
        source,
        target,
        model,
    }
}

/// Every line of a corpus file, trailing whitespace removed. Empty lines are
/// kept so line numbers stay aligned with a parallel reference file.
pub fn read_lines(file: &str) -> Vec<String> {
    let content = die!(
        fs::read_to_string(file),
        "Failed to read input file {}: {}",
        file
    );
    parse_lines(&content)
}

fn parse_lines(content: &str) -> Vec<String> {
    content.lines().map(|l| l.trim_end().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence() {
        let mut s = Settings::default();
        let o = Overrides {
            beam_width: Some(12),
            max_length: Some(30),
            parallel: true,
            extension: Some("de".to_string()),
            ..Overrides::default()
        };
        o.apply(&mut s);
        assert_eq!(s.search.beam_width, 12);
        assert_eq!(s.search.max_length, Some(30));
        assert!(s.batch.parallel);
        assert_eq!(s.output.extension, "de");
        assert_eq!(s.batch.batch_size, 200);
    }

    #[test]
    fn empty_overrides_change_nothing() {
        let mut s = Settings::default();
        Overrides::default().apply(&mut s);
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn lines_keep_alignment() {
        assert_eq!(
            parse_lines("ein hund  \n\ndie katze\r\n"),
            vec!["ein hund", "", "die katze"]
        );
    }

    #[test]
    fn load_settings_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let text = nmt_core::settings::default_toml().replace("beam_width = 5", "beam_width = 8");
        fs::write(&path, text).unwrap();

        let o = Overrides {
            settings_file: Some(path.to_string_lossy().into_owned()),
            batch_size: Some(10),
            ..Overrides::default()
        };
        let s = load_settings(&o);
        assert_eq!(s.search.beam_width, 8);
        assert_eq!(s.batch.batch_size, 10);
    }
}
