use std::path::Path;

use nmt_core::pipeline::{CorpusRun, CorpusTranslation, Translator};
use nmt_core::search::{format_trace, BatchProgress};
use nmt_core::output;
use nmt_core::text::{horizon_for, revert_bpe};

use super::resources::{open_resources, read_lines, ModelPaths, Overrides, Resources};

pub(crate) fn print_progress(p: &BatchProgress) {
    eprintln!(
        "batch {}/{}: {}/{} sentences ({} failed) in {:.2}s, total {:.2}s",
        p.batch_index + 1,
        p.batch_count,
        p.processed,
        p.total,
        p.failed,
        p.batch_elapsed.as_secs_f64(),
        p.elapsed.as_secs_f64()
    );
}

/// Decode `lines` in batches with the horizon derived from the input when unset.
pub(crate) fn translate_lines(res: &Resources, lines: &[String]) -> CorpusTranslation {
    let config = res.settings.search_config(horizon_for(lines));
    let translator = die!(
        Translator::new(&res.model, &res.source, &res.target, config),
        "Error: {}"
    );
    let run = CorpusRun::from_settings(&res.settings, res.settings.limits(None));
    eprintln!(
        "decoding {} sentences: k={}, max_length={}, batch_size={}",
        lines.len(),
        config.beam_width,
        config.max_length,
        run.batch_size
    );
    die!(
        translator.translate_corpus(lines, &run, print_progress),
        "Error: {}"
    )
}

pub fn decode_cmd(paths: &ModelPaths, overrides: &Overrides, input_file: &str, output_dir: &str) {
    let res = open_resources(paths, overrides);
    let lines = read_lines(input_file);
    let result = translate_lines(&res, &lines);

    let k = res.settings.search.beam_width;
    let files = die!(
        output::save_beam_ranks(
            Path::new(output_dir),
            k,
            &result.candidates,
            &res.settings.output.extension
        ),
        "Error writing output: {}"
    );

    println!(
        "beam search took {:.2}s for {} sentences ({} failed)",
        result.elapsed.as_secs_f64(),
        lines.len(),
        result.failed.len()
    );
    if !result.failed.is_empty() {
        println!("failed lines: {:?}", one_based(&result.failed));
    }
    for f in &files {
        println!("wrote {}", f.display());
    }
}

pub fn translate_cmd(
    paths: &ModelPaths,
    overrides: &Overrides,
    sentence: &str,
    greedy: bool,
    json: bool,
) {
    let res = open_resources(paths, overrides);
    let config = res
        .settings
        .search_config(horizon_for(std::slice::from_ref(&sentence)));
    let translator = die!(
        Translator::new(&res.model, &res.source, &res.target, config),
        "Error: {}"
    );

    let candidates = if greedy {
        vec![die!(translator.greedy(sentence), "Error: {}")]
    } else {
        die!(translator.translate(sentence), "Error: {}")
    };

    if json {
        println!(
            "{}",
            die!(serde_json::to_string_pretty(&candidates), "Error: {}")
        );
        return;
    }
    println!("{}", revert_bpe(sentence));
    for (i, c) in candidates.iter().enumerate() {
        println!("#{:>2} {:>8.4}  {}", i + 1, c.score, c.text);
    }
}

pub fn explain_cmd(paths: &ModelPaths, overrides: &Overrides, sentence: &str, json: bool) {
    let res = open_resources(paths, overrides);
    let config = res
        .settings
        .search_config(horizon_for(std::slice::from_ref(&sentence)));
    let translator = die!(
        Translator::new(&res.model, &res.source, &res.target, config),
        "Error: {}"
    );
    let trace = die!(translator.explain(sentence), "Error: {}");

    if json {
        println!("{}", die!(serde_json::to_string_pretty(&trace), "Error: {}"));
    } else {
        println!("{}", res.model.config_summary());
        println!(
            "source ids: {:?}  (k={}, max_length={})",
            translator.encode(sentence),
            config.beam_width,
            config.max_length
        );
        print!("{}", format_trace(&trace, &res.target));
    }
}

fn one_based(indices: &[usize]) -> Vec<usize> {
    indices.iter().map(|i| i + 1).collect()
}
