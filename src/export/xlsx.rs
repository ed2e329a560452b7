//! Spreadsheet output.

use crate::error::ExportError;
use crate::parsers::text::truncate_chars;
use crate::record::{ClassificationResult, TopicGroups};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::HashSet;

/// Longest text a spreadsheet cell can hold
pub const MAX_CELL_CHARS: usize = 32_767;

/// Topic sheet names are cut to this many characters
pub const MAX_SHEET_NAME_CHARS: usize = 30;

const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

const RESULT_COLUMNS: [&str; 5] = ["id", "urn", "url", "description", "topic"];

/// One `Notes` column with the combined notes in a single cell
pub fn notes_workbook(combined: &str) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Notes")?;
    sheet.write_string_with_format(0, 0, "Notes", &header)?;
    sheet.write_string(1, 0, cell_text(combined))?;
    sheet.set_column_width(0, 120)?;

    Ok(workbook.save_to_buffer()?)
}

/// One row per classified post
pub fn classified_workbook(results: &[ClassificationResult]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    write_results(sheet, results, &header)?;

    Ok(workbook.save_to_buffer()?)
}

/// One sheet per topic, in topic order
pub fn grouped_workbook(groups: &TopicGroups) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let mut used = HashSet::new();

    for (topic, results) in groups {
        let name = unique_sheet_name(topic, &mut used);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        write_results(sheet, results, &header)?;
    }

    if groups.is_empty() {
        let sheet = workbook.add_worksheet();
        write_results(sheet, &[], &header)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_results(
    sheet: &mut Worksheet,
    results: &[ClassificationResult],
    header: &Format,
) -> Result<(), ExportError> {
    for (col, title) in RESULT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, header)?;
    }

    for (index, result) in results.iter().enumerate() {
        let row = (index + 1) as u32;
        sheet.write_number(row, 0, f64::from(result.id))?;
        sheet.write_string(row, 1, cell_text(&result.urn))?;
        sheet.write_string(row, 2, cell_text(&result.url))?;
        sheet.write_string(row, 3, cell_text(&result.description))?;
        sheet.write_string(row, 4, cell_text(&result.topic))?;
    }
    Ok(())
}

fn cell_text(text: &str) -> &str {
    let truncated = truncate_chars(text, MAX_CELL_CHARS);
    if truncated.len() < text.len() {
        ::log::warn!("Cell text truncated to {} characters", MAX_CELL_CHARS);
    }
    truncated
}

/// Valid sheet name for `topic`: illegal characters replaced, cut to
/// [`MAX_SHEET_NAME_CHARS`], blank names become `Unknown`
pub fn sheet_name(topic: &str) -> String {
    let cleaned: String = topic
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let name = trim_sheet_name(truncate_chars(trim_sheet_name(&cleaned), MAX_SHEET_NAME_CHARS));

    if name.is_empty() || name.eq_ignore_ascii_case("history") {
        "Unknown".to_string()
    } else {
        name.to_string()
    }
}

/// Excel rejects names that start or end with an apostrophe
fn trim_sheet_name(name: &str) -> &str {
    name.trim_matches(|c: char| c == '\'' || c.is_whitespace())
}

/// Sheet names compare case-insensitively, so collisions get a numeric suffix
fn unique_sheet_name(topic: &str, used: &mut HashSet<String>) -> String {
    let base = sheet_name(topic);
    let mut candidate = base.clone();
    let mut n = 2;

    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let room = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
        candidate = format!("{}{}", trim_sheet_name(truncate_chars(&base, room)), suffix);
        n += 1;
    }
    candidate
}
