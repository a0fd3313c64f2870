use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nmt_core::model::LexicalModel;
use nmt_core::search::{BeamSearch, SearchConfig};
use nmt_core::vocab::Vocabulary;

const WORDS: usize = 400;

fn bench_vocab(prefix: &str) -> Vocabulary {
    let mut tokens: Vec<String> = ["<pad>", "<s>", "</s>", "<unk>"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    tokens.extend((0..WORDS).map(|i| format!("{prefix}{i}")));
    Vocabulary::from_tokens(tokens).unwrap()
}

/// Each source word translates to three target words; each target word has
/// four likely successors plus `</s>`.
fn bench_model(source: &Vocabulary, target: &Vocabulary) -> LexicalModel {
    let mut translations = Vec::new();
    let mut bigrams = Vec::new();
    for i in 0..WORDS {
        for (j, p) in [(0, 0.6), (7, 0.3), (31, 0.1)] {
            translations.push(serde_json::json!([
                format!("de{i}"),
                format!("en{}", (i + j) % WORDS),
                p
            ]));
        }
        for (j, p) in [(1, 0.4), (2, 0.25), (5, 0.15), (11, 0.1)] {
            bigrams.push(serde_json::json!([
                format!("en{i}"),
                format!("en{}", (i + j) % WORDS),
                p
            ]));
        }
        bigrams.push(serde_json::json!([format!("en{i}"), "</s>", 0.1]));
    }
    let json = serde_json::json!({
        "lambda": 0.6,
        "floor": 1e-6,
        "translations": translations,
        "bigrams": bigrams,
    });
    LexicalModel::from_json_str(&json.to_string(), source, target).unwrap()
}

static INPUTS: &[(&str, &str)] = &[
    ("short", "de1 de2 de3"),
    ("medium", "de10 de20 de30 de40 de50 de60 de70 de80"),
    (
        "long",
        "de5 de15 de25 de35 de45 de55 de65 de75 de85 de95 de105 de115 de125 de135 de145 de155",
    ),
];

fn bench_beam_width(c: &mut Criterion) {
    let source = bench_vocab("de");
    let target = bench_vocab("en");
    let model = bench_model(&source, &target);
    let mut group = c.benchmark_group("beam/width");
    for k in [1, 5, 10] {
        let engine = BeamSearch::new(&model, &target, SearchConfig::new(k, 20)).unwrap();
        let ids = source.encode_sentence(INPUTS[1].1);
        group.bench_with_input(BenchmarkId::from_parameter(k), &ids, |b, ids| {
            b.iter(|| engine.decode(ids).unwrap());
        });
    }
    group.finish();
}

fn bench_sentence_length(c: &mut Criterion) {
    let source = bench_vocab("de");
    let target = bench_vocab("en");
    let model = bench_model(&source, &target);
    let mut group = c.benchmark_group("beam/length");
    for &(label, line) in INPUTS {
        let ids = source.encode_sentence(line);
        let engine =
            BeamSearch::new(&model, &target, SearchConfig::new(5, ids.len() + 2)).unwrap();
        group.bench_with_input(BenchmarkId::new(label, ids.len()), &ids, |b, ids| {
            b.iter(|| engine.decode(ids).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_beam_width, bench_sentence_length);
criterion_main!(benches);
