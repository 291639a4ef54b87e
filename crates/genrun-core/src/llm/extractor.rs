//! Extraction of source files from a raw model response.
//!
//! A response may carry several fenced code blocks, one plain fenced
//! block, or no fences at all; all three shapes must yield a usable
//! filename-to-source mapping. Tagged blocks win over untagged ones, and
//! only the two supported language tags are recognized.

use regex::Regex;

/// Parse a raw model response into ordered (filename, source) pairs.
///
/// Priority order:
/// 1. Every fenced block tagged `go` or `python`. The first block gets
///    `default_file` unchanged; later blocks get a numeric disambiguator
///    before the extension (`main.go` -> `main2.go`).
/// 2. Otherwise the first untagged fenced block, under `default_file`.
/// 3. Otherwise the whole trimmed response, under `default_file`.
///
/// Block contents are always trimmed. A prose-only response still
/// produces one entry under rule 3; deciding that a non-source result is
/// unusable is the caller's job.
pub fn extract_code_files(content: &str, default_file: &str) -> Vec<(String, String)> {
    let mut files = Vec::new();

    let tagged = Regex::new(r"(?s)```(go|python)\n(.*?)```").expect("static regex");
    let matches: Vec<_> = tagged.captures_iter(content).collect();
    if !matches.is_empty() {
        for (i, caps) in matches.iter().enumerate() {
            let code = caps[2].trim().to_string();
            files.push((numbered_file_name(default_file, i), code));
        }
        return files;
    }

    let untagged = Regex::new(r"(?s)```\n(.*?)```").expect("static regex");
    if let Some(caps) = untagged.captures(content) {
        files.push((default_file.to_string(), caps[1].trim().to_string()));
        return files;
    }

    files.push((default_file.to_string(), content.trim().to_string()));
    files
}

/// `main.go` stays `main.go` for the first block; the i-th block after
/// that becomes `main2.go`, `main3.go`, ... with the number inserted
/// immediately before the extension.
fn numbered_file_name(default_file: &str, index: usize) -> String {
    if index == 0 {
        return default_file.to_string();
    }
    match default_file.rfind('.') {
        Some(dot) if dot > 0 => format!(
            "{}{}{}",
            &default_file[..dot],
            index + 1,
            &default_file[dot..]
        ),
        _ => format!("{}{}", default_file, index + 1),
    }
}
