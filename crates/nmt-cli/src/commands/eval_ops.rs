use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use nmt_core::eval::Bleu;
use nmt_core::output;
use nmt_core::pipeline::evaluate_oracle;

use super::decode_ops::translate_lines;
use super::resources::{open_resources, read_lines, ModelPaths, Overrides};

#[derive(Debug, Serialize)]
struct EvalSummary {
    sentences: usize,
    failed: Vec<usize>,
    beam_width: usize,
    ngram_order: usize,
    oracle_mean: f64,
    corpus_bleu: f64,
    decode_secs: f64,
    total_secs: f64,
    output: String,
}

/// Decode a source file, pick the best-of-k candidate per sentence against
/// the reference file, report the scores, and save the picks.
pub fn evaluate_cmd(
    paths: &ModelPaths,
    overrides: &Overrides,
    source_file: &str,
    reference_file: &str,
    output_dir: &str,
    json: bool,
) {
    let started = Instant::now();
    let res = open_resources(paths, overrides);
    let sources = read_lines(source_file);
    let references = read_lines(reference_file);
    if sources.len() != references.len() {
        eprintln!(
            "Error: {source_file} has {} lines but {reference_file} has {}",
            sources.len(),
            references.len()
        );
        std::process::exit(1);
    }

    let result = translate_lines(&res, &sources);
    let ngram_order = res.settings.eval.ngram_order;
    let report = die!(
        evaluate_oracle(&result, &references, &Bleu, ngram_order),
        "Error: {}"
    );
    let picks = report.selected(&result.candidates);
    let path = die!(
        output::save_oracle(
            Path::new(output_dir),
            report.mean_score,
            &picks,
            &res.settings.output.extension
        ),
        "Error writing output: {}"
    );

    let summary = EvalSummary {
        sentences: sources.len(),
        failed: result.failed.clone(),
        beam_width: res.settings.search.beam_width,
        ngram_order,
        oracle_mean: report.rounded_mean(),
        corpus_bleu: report.corpus_bleu,
        decode_secs: result.elapsed.as_secs_f64(),
        total_secs: started.elapsed().as_secs_f64(),
        output: path.display().to_string(),
    };
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&summary), "Error: {}"));
        return;
    }
    println!("corpus BLEU of oracle picks: {:.4}", summary.corpus_bleu);
    println!(
        "oracle best-of-{} mean BLEU-{}: {}",
        summary.beam_width, summary.ngram_order, summary.oracle_mean
    );
    if !summary.failed.is_empty() {
        println!("{} sentences failed to decode", summary.failed.len());
    }
    println!(
        "beam search took {:.2}s, total {:.2}s",
        summary.decode_secs, summary.total_secs
    );
    println!("wrote {}", summary.output);
}
