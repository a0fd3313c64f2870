use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use nmt_cli::commands::resources::{ModelPaths, Overrides};
use nmt_cli::commands::{config_ops, decode_ops, eval_ops, vocab_ops};
use nmt_cli::trace_init::init_tracing;

#[derive(Parser)]
#[command(name = "nmtdecode", about = "Beam-search decoding for German→English translation")]
struct Cli {
    /// Write JSON trace lines to this directory instead of logging to stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ModelArgs {
    /// Source (German) vocabulary, text or NMTV binary
    #[arg(long)]
    source_vocab: String,
    /// Target (English) vocabulary, text or NMTV binary
    #[arg(long)]
    target_vocab: String,
    /// Lexical model JSON file
    #[arg(long)]
    model: String,
}

#[derive(Args)]
struct SearchArgs {
    /// Settings TOML file (defaults are embedded)
    #[arg(long)]
    settings: Option<String>,
    /// Beam width k
    #[arg(short = 'k', long)]
    beam_width: Option<usize>,
    /// Decode horizon; derived from the input when omitted
    #[arg(long)]
    max_length: Option<usize>,
    /// Sentences per batch
    #[arg(long)]
    batch_size: Option<usize>,
    /// Per-sentence deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Decode sentences of a batch concurrently (needs --features parallel)
    #[arg(long)]
    parallel: bool,
    /// BLEU n-gram order
    #[arg(long)]
    ngram_order: Option<usize>,
    /// Output file extension
    #[arg(long)]
    extension: Option<String>,
}

impl From<ModelArgs> for ModelPaths {
    fn from(a: ModelArgs) -> Self {
        ModelPaths {
            source_vocab: a.source_vocab,
            target_vocab: a.target_vocab,
            model: a.model,
        }
    }
}

impl From<SearchArgs> for Overrides {
    fn from(a: SearchArgs) -> Self {
        Overrides {
            settings_file: a.settings,
            beam_width: a.beam_width,
            max_length: a.max_length,
            batch_size: a.batch_size,
            timeout_ms: a.timeout_ms,
            parallel: a.parallel,
            ngram_order: a.ngram_order,
            extension: a.extension,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Decode a source file and write one output file per beam rank
    Decode {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Source file, one sentence per line
        input_file: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: String,
    },
    /// Decode, pick the oracle best-of-k against references, and report BLEU
    Evaluate {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Source file, one sentence per line
        source_file: String,
        /// Reference file, line-aligned with the source file
        reference_file: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: String,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Translate one sentence and print the ranked candidates
    Translate {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Source sentence
        sentence: String,
        /// Greedy decoding instead of beam search
        #[arg(long)]
        greedy: bool,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the beam after every search step for one sentence
    Explain {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Source sentence
        sentence: String,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show vocabulary info (format auto-detected by magic bytes)
    VocabInfo {
        /// Vocabulary file
        file: String,
    },
    /// Compile a text vocabulary to the binary format
    VocabCompile {
        /// Input text file, one token per line
        input_txt: String,
        /// Output binary file
        output_file: String,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref(), cli.verbose);

    match cli.command {
        Command::Decode {
            model,
            search,
            input_file,
            output_dir,
        } => decode_ops::decode_cmd(&model.into(), &search.into(), &input_file, &output_dir),
        Command::Evaluate {
            model,
            search,
            source_file,
            reference_file,
            output_dir,
            json,
        } => eval_ops::evaluate_cmd(
            &model.into(),
            &search.into(),
            &source_file,
            &reference_file,
            &output_dir,
            json,
        ),
        Command::Translate {
            model,
            search,
            sentence,
            greedy,
            json,
        } => decode_ops::translate_cmd(&model.into(), &search.into(), &sentence, greedy, json),
        Command::Explain {
            model,
            search,
            sentence,
            json,
        } => decode_ops::explain_cmd(&model.into(), &search.into(), &sentence, json),
        Command::VocabInfo { file } => vocab_ops::info(&file),
        Command::VocabCompile {
            input_txt,
            output_file,
        } => vocab_ops::compile(&input_txt, &output_file),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
