use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub lossy: bool,
}

/// Decodes a fetched body to UTF-8.
///
/// Order of evidence: BOM, then the Content-Type charset, then chardetng
/// detection. Never fails; malformed input is decoded lossily and flagged,
/// since a page with a few bad bytes still carries usable fields.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });

    let (text, _, lossy) = encoding.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: encoding.name().to_string(),
        lossy,
    }
}

/// Media type without parameters, lower-cased: `"Text/HTML; charset=x"` -> `"text/html"`.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_header_is_respected() {
        let decoded = decode_text(b"caf\xe9", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.text, "caf\u{e9}");
        assert!(!decoded.lossy);
    }

    #[test]
    fn bom_wins_over_header() {
        let decoded = decode_text(b"\xEF\xBB\xBFhello", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn quoted_and_uppercase_charset_parameters_parse() {
        assert_eq!(
            charset_label("text/plain; CHARSET=\"utf-8\"").as_deref(),
            Some("utf-8")
        );
        assert_eq!(charset_label("text/plain"), None);
    }

    #[test]
    fn media_type_strips_parameters() {
        assert_eq!(media_type("Text/Plain; charset=utf-8"), "text/plain");
    }
}
