use std::fs;
use std::path::Path;

use nmt_core::vocab::{Vocabulary, MAGIC, VERSION};

/// Show vocabulary info; the format is detected by the magic bytes.
pub fn info(file: &str) {
    let bytes = die!(fs::read(file), "Error reading file {file}: {}");
    let format = if bytes.starts_with(MAGIC) {
        format!("binary (NMTV v{})", bytes.get(4).copied().unwrap_or(0))
    } else {
        "text".to_string()
    };
    let vocab = die!(
        Vocabulary::open(Path::new(file)),
        "Error opening vocabulary: {}"
    );
    let specials = vocab.specials();

    println!("Vocabulary: {file}");
    println!("Format:     {format}");
    println!("File size:  {:.1} KB", bytes.len() as f64 / 1024.0);
    println!("Tokens:     {}", vocab.len());
    println!(
        "Reserved:   pad={} <s>={} </s>={} <unk>={}",
        specials.pad,
        specials.start,
        specials.end,
        specials
            .unknown
            .map_or_else(|| "-".to_string(), |id| id.to_string())
    );

    let sample: Vec<String> = vocab
        .tokens()
        .iter()
        .enumerate()
        .filter(|(id, _)| !specials.is_reserved(*id as u32))
        .take(10)
        .map(|(id, t)| format!("{id}:{t}"))
        .collect();
    println!("Sample:     {}", sample.join(" "));
}

/// Convert a text vocabulary (one token per line) to the binary format.
pub fn compile(input_txt: &str, output_file: &str) {
    let content = die!(
        fs::read_to_string(input_txt),
        "Error reading {input_txt}: {}"
    );
    let vocab = die!(Vocabulary::from_text(&content), "Error: {}");
    die!(
        vocab.save(Path::new(output_file)),
        "Error writing {output_file}: {}"
    );
    println!(
        "Wrote {} tokens to {output_file} (NMTV v{VERSION})",
        vocab.len()
    );
}
