use std::path::Path;

use nmt_core::settings::{self, Settings};

pub fn settings_export() {
    print!("{}", settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let s = die!(Settings::open(Path::new(file)), "Error: {}");
    println!(
        "OK: search.beam_width={}, search.max_length={}, batch.batch_size={}, vocab.oov_policy={:?}, eval.ngram_order={}",
        s.search.beam_width,
        s.search
            .max_length
            .map_or_else(|| "auto".to_string(), |l| l.to_string()),
        s.batch.batch_size,
        s.vocab.oov_policy,
        s.eval.ngram_order
    );
}
