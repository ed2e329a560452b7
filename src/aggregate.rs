//! Merging of extracted content into one text blob.

use crate::record::ExtractionRecord;

const SEPARATOR: &str = "\n\n";

/// Joins the record's text, images, documents and videos, in that order,
/// skipping blank entries.
///
/// The result depends only on the record's contents.
pub fn aggregate(record: &ExtractionRecord) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(single(&record.text));
    parts.extend(many(&record.images));
    parts.extend(single(&record.documents));
    parts.extend(many(&record.videos));

    parts.join(SEPARATOR).trim().to_string()
}

fn single(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.trim().is_empty())
}

fn many(values: &[String]) -> impl Iterator<Item = &str> {
    values
        .iter()
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}
