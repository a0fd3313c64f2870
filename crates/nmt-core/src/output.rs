//! Writing decoded translations to disk.
//!
//! One sentence per line, UTF-8, no framing. File names carry the beam
//! width or the oracle score so runs can be told apart.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::eval::round2;

pub const DEFAULT_EXTENSION: &str = "en";

/// `beam_k={k}_prediction{rank}.{ext}`
pub fn beam_rank_file_name(k: usize, rank: usize, extension: &str) -> String {
    format!("beam_k={k}_prediction{rank}.{extension}")
}

/// `beam_bleu={score}_prediction.{ext}`, score rounded to two decimals.
pub fn oracle_file_name(score: f64, extension: &str) -> String {
    format!("beam_bleu={:?}_prediction.{extension}", round2(score))
}

/// Atomic write: lines go to a .tmp sibling which is then renamed over `path`.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<(), io::Error> {
    let mut body = String::new();
    for line in lines {
        body.push_str(line.as_ref());
        body.push('\n');
    }
    let tmp = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&tmp, body.as_bytes())?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Write one file per beam rank `0..k`. Line `j` of file `i` is the rank-`i`
/// candidate of sentence `j`, or empty when that sentence has fewer candidates.
pub fn save_beam_ranks<S: AsRef<str>>(
    dir: &Path,
    k: usize,
    candidates: &[Vec<S>],
    extension: &str,
) -> Result<Vec<PathBuf>, io::Error> {
    let mut written = Vec::with_capacity(k);
    for rank in 0..k {
        let lines: Vec<&str> = candidates
            .iter()
            .map(|cands| cands.get(rank).map_or("", |c| c.as_ref()))
            .collect();
        let path = dir.join(beam_rank_file_name(k, rank, extension));
        write_lines(&path, &lines)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "saved beam ranks");
    Ok(written)
}

/// Write the oracle picks, one per sentence.
pub fn save_oracle<S: AsRef<str>>(
    dir: &Path,
    score: f64,
    picks: &[S],
    extension: &str,
) -> Result<PathBuf, io::Error> {
    let path = dir.join(oracle_file_name(score, extension));
    write_lines(&path, picks)?;
    info!(path = %path.display(), sentences = picks.len(), "saved oracle picks");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(beam_rank_file_name(5, 0, "en"), "beam_k=5_prediction0.en");
        assert_eq!(oracle_file_name(0.2083, "en"), "beam_bleu=0.21_prediction.en");
        assert_eq!(oracle_file_name(0.0, "de"), "beam_bleu=0.0_prediction.de");
    }

    #[test]
    fn test_write_lines_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.en");
        write_lines(&path, &["old"]).unwrap();
        write_lines(&path, &["a dog", "the cat"]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a dog\nthe cat\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_save_beam_ranks_pads_short_lists() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![vec!["a dog", "the dog"], vec!["a cat"]];
        let paths = save_beam_ranks(dir.path(), 2, &candidates, "en").unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("beam_k=2_prediction1.en"));
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "a dog\na cat\n");
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "the dog\n\n");
    }

    #[test]
    fn test_save_oracle_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("runs").join("dev");
        let path = save_oracle(&nested, 0.456, &["x", "y"], "en").unwrap();
        assert!(path.ends_with("beam_bleu=0.46_prediction.en"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "x\ny\n");
    }
}
