use crate::Record;

/// Picks the text body that represents a record: attachment text wins over
/// inline text; blank candidates count as absent.
pub fn canonical_text(record: &Record) -> Option<&str> {
    non_blank(record.attachment_text.as_deref()).or_else(|| non_blank(record.inline_text.as_deref()))
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}
