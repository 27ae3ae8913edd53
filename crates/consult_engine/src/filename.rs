use sha2::{Digest, Sha256};
use url::Url;

/// Stem for a downloaded attachment: the second-to-last path segment of its
/// url (`/.../{id}/download` -> `{id}`), or a short url hash when the url has
/// no usable segment.
pub fn attachment_stem(url: &str) -> String {
    let segment = Url::parse(url).ok().and_then(|parsed| {
        let segments: Vec<String> = parsed
            .path_segments()?
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        segments.len().checked_sub(2).map(|i| segments[i].clone())
    });
    match segment.map(|s| sanitize(&s)) {
        Some(stem) if !stem.is_empty() => stem,
        _ => short_hash(url),
    }
}

/// `{stem}.{extension}` for an attachment.
pub fn attachment_filename(url: &str, extension: &str) -> String {
    format!("{}.{}", attachment_stem(url), extension.trim_start_matches('.'))
}

/// File name for a saved consultation page: the url relative to `base`,
/// with `/` replaced by `_` and leading underscores dropped.
pub fn html_snapshot_name(url: &str, base: &str) -> String {
    let relative = url
        .strip_prefix(base.trim_end_matches('/'))
        .unwrap_or(url)
        .replace('/', "_");
    let name = sanitize(relative.trim_start_matches('_'));
    if name.is_empty() {
        format!("{}.html", short_hash(url))
    } else {
        format!("{name}.html")
    }
}

fn sanitize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&[' ', '.'][..]);

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    if compacted.len() > 120 {
        let mut cut = 120;
        while !compacted.is_char_boundary(cut) {
            cut -= 1;
        }
        compacted.truncate(cut);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(6).fold(String::with_capacity(12), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    })
}
