use super::*;
use crate::vocab::Vocabulary;

// --- Distribution ---

#[test]
fn test_top_k_orders_by_probability() {
    let dist = Distribution::new(vec![0.0, 0.1, 0.5, 0.15, 0.25]).unwrap();
    let top: Vec<u32> = dist.top_k(3).into_iter().map(|(id, _)| id).collect();
    assert_eq!(top, vec![2, 4, 3]);
}

#[test]
fn test_top_k_ties_break_by_ascending_id() {
    let dist = Distribution::new(vec![0.0, 0.25, 0.25, 0.25, 0.25]).unwrap();
    let top: Vec<u32> = dist.top_k(2).into_iter().map(|(id, _)| id).collect();
    assert_eq!(top, vec![1, 2]);
    for _ in 0..10 {
        assert_eq!(dist.top_k(2), dist.top_k(2));
    }
}

#[test]
fn test_top_k_skips_zero_probability() {
    let dist = Distribution::from_pairs(5, &[(3, 1.0)]).unwrap();
    assert_eq!(dist.top_k(4), vec![(3, 1.0)]);
    assert!(dist.top_k(0).is_empty());
}

#[test]
fn test_argmax() {
    let dist = Distribution::new(vec![0.2, 0.4, 0.4]).unwrap();
    assert_eq!(dist.argmax(), Some((1, 0.4)));
}

#[test]
fn test_invalid_distributions() {
    assert!(matches!(
        Distribution::new(Vec::new()),
        Err(ModelError::EmptyDistribution)
    ));
    assert!(matches!(
        Distribution::new(vec![0.5, f32::NAN]),
        Err(ModelError::InvalidProbability { id: 1, .. })
    ));
    assert!(matches!(
        Distribution::new(vec![-0.1, 1.1]),
        Err(ModelError::InvalidProbability { id: 0, .. })
    ));
    assert!(matches!(
        Distribution::from_pairs(2, &[(7, 1.0)]),
        Err(ModelError::TokenOutOfRange { id: 7, size: 2 })
    ));
}

#[test]
fn test_distribution_without_mass_is_rejected() {
    assert!(matches!(
        Distribution::new(vec![0.0, 0.0, 0.0]),
        Err(ModelError::NoProbabilityMass)
    ));
    assert!(matches!(
        Distribution::from_pairs(4, &[]),
        Err(ModelError::NoProbabilityMass)
    ));
    assert!(Distribution::from_pairs(4, &[(3, 0.0), (2, 1.0)]).is_ok());
}

// --- LexicalModel ---

fn vocab(tokens: &[&str]) -> Vocabulary {
    Vocabulary::from_tokens(tokens.iter().map(|s| s.to_string()).collect()).unwrap()
}

fn source_vocab() -> Vocabulary {
    vocab(&["<pad>", "<s>", "</s>", "hund", "katze"])
}

fn target_vocab() -> Vocabulary {
    vocab(&["<pad>", "<s>", "</s>", "dog", "cat", "the"])
}

const MODEL_JSON: &str = r#"{
    "lambda": 0.5,
    "floor": 1e-6,
    "translations": [
        ["hund", "dog", 0.9],
        ["hund", "the", 0.1],
        ["katze", "cat", 1.0]
    ],
    "bigrams": [
        ["<s>", "the", 1.0],
        ["the", "dog", 0.5],
        ["the", "cat", 0.5],
        ["dog", "</s>", 1.0],
        ["cat", "</s>", 1.0]
    ]
}"#;

fn lexical() -> LexicalModel {
    LexicalModel::from_json_str(MODEL_JSON, &source_vocab(), &target_vocab()).unwrap()
}

#[test]
fn test_lexical_distribution_is_normalized_and_positive() {
    let model = lexical();
    let state = model.encode(&[1, 3, 2]).unwrap();
    let dist = model.decode_step(&[1, 0, 0, 0], 1, &state).unwrap();
    assert_eq!(dist.len(), 6);
    let total: f32 = dist.probs().iter().sum();
    assert!((total - 1.0).abs() < 1e-5);
    // pad and <s> are never predicted; everything else stays reachable.
    assert_eq!(dist.prob(0), 0.0);
    assert_eq!(dist.prob(1), 0.0);
    assert!(dist.probs()[2..].iter().all(|&p| p > 0.0));
}

#[test]
fn test_lexical_mixes_source_and_bigram() {
    let model = lexical();
    let tgt = target_vocab();
    let the = tgt.id("the").unwrap();
    let dog = tgt.id("dog").unwrap();
    let cat = tgt.id("cat").unwrap();

    let hund = model.encode(&[1, 3, 2]).unwrap();
    // After <s>: 0.5 * lexical + 0.5 * bigram(the | <s>) → "the" wins.
    let first = model.decode_step(&[1, 0, 0, 0], 1, &hund).unwrap();
    assert_eq!(first.argmax().map(|(id, _)| id), Some(the));

    // After "the": bigram is split between dog and cat, the source decides.
    let second = model.decode_step(&[1, the, 0, 0], 2, &hund).unwrap();
    assert_eq!(second.argmax().map(|(id, _)| id), Some(dog));

    let katze = model.encode(&[1, 4, 2]).unwrap();
    let second = model.decode_step(&[1, the, 0, 0], 2, &katze).unwrap();
    assert_eq!(second.argmax().map(|(id, _)| id), Some(cat));
}

#[test]
fn test_lexical_uncovered_source_is_uniform() {
    let model = lexical();
    let state = model.encode(&[1, 2]).unwrap();
    // No bigram row for </s> either: everything uniform.
    let dist = model.decode_step(&[1, 2, 0], 2, &state).unwrap();
    let first = dist.probs()[2];
    assert!((first - 0.25).abs() < 1e-6);
    assert!(dist.probs()[2..].iter().all(|&p| (p - first).abs() < 1e-6));
}

#[test]
fn test_lexical_prefix_length_errors() {
    let model = lexical();
    let state = model.encode(&[1, 3, 2]).unwrap();
    assert!(matches!(
        model.decode_step(&[1, 0], 0, &state),
        Err(ModelError::PrefixLength { .. })
    ));
    assert!(matches!(
        model.decode_step(&[1, 0], 3, &state),
        Err(ModelError::PrefixLength { .. })
    ));
    assert!(matches!(
        model.decode_step(&[42, 0], 1, &state),
        Err(ModelError::TokenOutOfRange { id: 42, .. })
    ));
}

#[test]
fn test_lexical_rejects_unknown_tokens() {
    let json = r#"{ "translations": [["vogel", "dog", 1.0]] }"#;
    let err = LexicalModel::from_json_str(json, &source_vocab(), &target_vocab()).unwrap_err();
    assert!(matches!(err, ModelError::Parse(msg) if msg.contains("vogel")));
}

#[test]
fn test_lexical_rejects_bad_parameters() {
    let src = source_vocab();
    let tgt = target_vocab();
    assert!(LexicalModel::from_json_str(r#"{ "lambda": 1.5 }"#, &src, &tgt).is_err());
    assert!(LexicalModel::from_json_str(r#"{ "floor": 0.0 }"#, &src, &tgt).is_err());
    assert!(LexicalModel::from_json_str(
        r#"{ "bigrams": [["dog", "cat", -1.0]] }"#,
        &src,
        &tgt
    )
    .is_err());
    assert!(LexicalModel::from_json_str("not json", &src, &tgt).is_err());
}

#[test]
fn test_lexical_defaults() {
    let model = LexicalModel::from_json_str("{}", &source_vocab(), &target_vocab()).unwrap();
    assert_eq!(model.target_size(), 6);
    assert!(model.config_summary().contains("lambda=0.5"));
}
