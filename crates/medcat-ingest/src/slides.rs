//! Slide-deck exports.
//!
//! Text extraction from the deck happens upstream; this module reads the two
//! JSON exports it produces: per-slide content (text plus tables) and
//! per-slide product payloads.

use std::path::Path;

use medcat_core::PackagingInformation;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// A table lifted from a slide. `rows[0]` is the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideTable {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub markdown: String,
}

impl SlideTable {
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let headers = rows.first().cloned().unwrap_or_default();
        let mut table = Self {
            headers,
            rows,
            markdown: String::new(),
        };
        table.markdown = table.to_markdown();
        table
    }

    /// Render as a pipe grid: header row, `---` separator row, then body.
    ///
    /// Short rows are padded to the header width; pipes inside cells are
    /// escaped and line breaks flattened so each row stays on one line.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let Some(header) = self.rows.first() else {
            return String::new();
        };
        let width = header.len();
        if width == 0 {
            return String::new();
        }

        let render = |cells: &[String]| -> String {
            let padded = (0..width).map(|i| cells.get(i).map_or("", String::as_str));
            let escaped: Vec<String> = padded.map(escape_cell).collect();
            format!("| {} |", escaped.join(" | "))
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(render(header));
        lines.push(format!("|{}", " --- |".repeat(width)));
        for row in &self.rows[1..] {
            lines.push(render(row));
        }
        lines.join("\n")
    }
}

fn escape_cell(cell: &str) -> String {
    cell.trim()
        .replace('|', "\\|")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything extracted from one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    pub slide_number: u32,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub tables: Vec<SlideTable>,
}

impl SlideContent {
    /// Markdown for all tables on the slide, blank-line separated.
    #[must_use]
    pub fn tables_markdown(&self) -> String {
        tables_markdown(&self.tables)
    }
}

fn tables_markdown(tables: &[SlideTable]) -> String {
    tables
        .iter()
        .map(SlideTable::to_markdown)
        .filter(|md| !md.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Product fields extracted from a slide. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reference_string: Option<String>,
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub table_in_md: Option<String>,
    #[serde(
        rename = "PackagingInformation",
        alias = "packagingInformation",
        default
    )]
    pub packaging_information: Option<PackagingInformation>,
    #[serde(default)]
    pub images: Vec<i64>,
}

impl SlidePayload {
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.reference_string
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

/// One entry of the slide-extraction export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    pub slide_number: u32,
    #[serde(default)]
    pub data: SlidePayload,
    #[serde(default)]
    pub tables: Vec<SlideTable>,
}

impl SlideRecord {
    /// Payload with `tableInMd` filled from the slide's own tables, or from
    /// `content` when given, if the extractor left it blank.
    #[must_use]
    pub fn payload(&self, content: Option<&SlideContent>) -> SlidePayload {
        let mut payload = self.data.clone();
        let blank = payload
            .table_in_md
            .as_deref()
            .is_none_or(|md| md.trim().is_empty());
        if blank {
            let mut md = tables_markdown(&self.tables);
            if md.is_empty() {
                md = content.map(SlideContent::tables_markdown).unwrap_or_default();
            }
            if !md.is_empty() {
                payload.table_in_md = Some(md);
            }
        }
        payload
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, IngestError> {
    let raw = std::fs::read_to_string(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| IngestError::Deserialize {
        context: path.display().to_string(),
        source: e,
    })
}

/// Load the slide-extraction export (array of [`SlideRecord`]).
///
/// # Errors
///
/// Returns [`IngestError::Io`] or [`IngestError::Deserialize`].
pub fn load_slide_records(path: &Path) -> Result<Vec<SlideRecord>, IngestError> {
    load_json(path)
}

/// Load the slide-content export (array of [`SlideContent`]).
///
/// # Errors
///
/// Returns [`IngestError::Io`] or [`IngestError::Deserialize`].
pub fn load_slide_content(path: &Path) -> Result<Vec<SlideContent>, IngestError> {
    load_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn markdown_has_header_separator_and_body() {
        let table = SlideTable::from_rows(vec![
            strings(&["Size", "Pcs/Box"]),
            strings(&["18G", "100"]),
            strings(&["20G"]),
        ]);
        assert_eq!(
            table.markdown,
            "| Size | Pcs/Box |\n| --- | --- |\n| 18G | 100 |\n| 20G |  |"
        );
        assert_eq!(table.headers, strings(&["Size", "Pcs/Box"]));
    }

    #[test]
    fn markdown_escapes_pipes_and_flattens_newlines() {
        let table = SlideTable::from_rows(vec![strings(&["Note"]), strings(&["a|b\nc"])]);
        assert_eq!(table.to_markdown(), "| Note |\n| --- |\n| a\\|b c |");
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(SlideTable::default().to_markdown(), "");
    }

    #[test]
    fn payload_fills_blank_table_from_slide_tables() {
        let record = SlideRecord {
            slide_number: 4,
            data: SlidePayload {
                reference_string: Some(" 4.1.1 ".to_string()),
                table_in_md: Some("   ".to_string()),
                ..SlidePayload::default()
            },
            tables: vec![SlideTable::from_rows(vec![strings(&["A"]), strings(&["1"])])],
        };
        let payload = record.payload(None);
        assert_eq!(payload.reference(), Some("4.1.1"));
        assert_eq!(payload.table_in_md.as_deref(), Some("| A |\n| --- |\n| 1 |"));
    }

    #[test]
    fn payload_falls_back_to_content_tables() {
        let record = SlideRecord {
            slide_number: 2,
            ..SlideRecord::default()
        };
        let content = SlideContent {
            slide_number: 2,
            raw_text: "Gloves".to_string(),
            tables: vec![SlideTable::from_rows(vec![strings(&["Size"]), strings(&["M"])])],
        };
        let payload = record.payload(Some(&content));
        assert_eq!(payload.table_in_md.as_deref(), Some("| Size |\n| --- |\n| M |"));
    }

    #[test]
    fn existing_table_is_kept() {
        let record = SlideRecord {
            slide_number: 1,
            data: SlidePayload {
                table_in_md: Some("| X |".to_string()),
                ..SlidePayload::default()
            },
            tables: vec![SlideTable::from_rows(vec![strings(&["A"])])],
        };
        assert_eq!(record.payload(None).table_in_md.as_deref(), Some("| X |"));
    }

    #[test]
    fn loads_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slides.json");
        std::fs::write(
            &path,
            r#"[{"slide_number": 3, "data": {"referenceString": "2.1", "description": "Sterile"}}]"#,
        )
        .unwrap();
        let records = load_slide_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data.description.as_deref(), Some("Sterile"));
        assert!(records[0].tables.is_empty());
    }

    #[test]
    fn malformed_file_is_a_deserialize_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_slide_content(&path),
            Err(IngestError::Deserialize { .. })
        ));
    }
}
