//! Plain-text helpers shared by the vocabulary, evaluation, and output code.

/// Subword joiner emitted by the BPE segmenter (`zerklüft@@ eten`).
pub const BPE_JOINER: &str = "@@";

/// Split a sentence into whitespace-separated tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// Undo BPE segmentation by gluing every `@@`-terminated piece to its successor.
///
/// A dangling joiner on the final token is dropped.
pub fn revert_bpe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut glue = false;
    for token in tokenize(text) {
        if !out.is_empty() && !glue {
            out.push(' ');
        }
        match token.strip_suffix(BPE_JOINER) {
            Some(piece) => {
                out.push_str(piece);
                glue = true;
            }
            None => {
                out.push_str(token);
                glue = false;
            }
        }
    }
    out
}

/// Length in tokens of the longest line, plus room for `<s>` and `</s>`.
///
/// Used to derive the decode horizon from a corpus when none is configured.
pub fn horizon_for<S: AsRef<str>>(lines: &[S]) -> usize {
    lines
        .iter()
        .map(|l| tokenize(l.as_ref()).count())
        .max()
        .unwrap_or(0)
        + 2
}
