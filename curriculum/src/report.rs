//! Report export.
//!
//! [`ReportDocument::build`] lays a read-only snapshot out as pages of
//! headings, paragraphs and tables. Renderers implement [`DocumentExporter`];
//! the core ships a Markdown renderer and leaves PDF layout to the page.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::plo_catalog;
use crate::mapping::query;
use crate::persistence::Snapshot;

/// Error types for report export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Writing the rendered document failed
    #[error("Export write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Document cannot be laid out, e.g. a table row with the wrong width
    #[error("Export failed: {0}")]
    Render(String),
}

/// A block of report content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReportBlock {
    Title(String),
    Heading(String),
    Paragraph(String),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// One page of the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPage {
    pub blocks: Vec<ReportBlock>,
}

/// The full CLO report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Course code the report is named after
    pub course_code: String,
    pub generated_at: DateTime<Utc>,
    /// Fingerprint of the snapshot the report was built from
    pub snapshot_fingerprint: String,
    pub pages: Vec<ReportPage>,
}

impl ReportDocument {
    /// Lay out `snapshot` as a two-page report.
    ///
    /// Page one carries the course details and the CLO table; page two the
    /// mapping matrix followed by the achievement table when there are
    /// evaluations.
    pub fn build(snapshot: &Snapshot) -> Self {
        let course = &snapshot.course;
        let plos = plo_catalog();

        let overview = ReportPage {
            blocks: vec![
                ReportBlock::Title("Course Learning Outcome (CLO) Report".to_string()),
                ReportBlock::Paragraph(format!("Course: {} ({})", course.name, course.code)),
                ReportBlock::Paragraph(format!("Credits: {}", course.credits)),
                ReportBlock::Paragraph(format!("Description: {}", course.description)),
                ReportBlock::Heading("Course Learning Outcomes (CLOs)".to_string()),
                ReportBlock::Table {
                    headers: strings(&["ID", "Description", "Bloom's Level", "Skill Type"]),
                    rows: snapshot
                        .clos
                        .iter()
                        .map(|clo| {
                            vec![
                                clo.id.to_string(),
                                clo.description.clone(),
                                clo.bloom_level.to_string(),
                                clo.skill_type.to_string(),
                            ]
                        })
                        .collect(),
                },
            ],
        };

        let mut headers = vec!["CLO ID".to_string()];
        headers.extend(plos.iter().map(|plo| plo.id.to_string()));

        let mut matrix = ReportPage {
            blocks: vec![
                ReportBlock::Heading("CLO-PLO Mapping Matrix".to_string()),
                ReportBlock::Table {
                    headers,
                    rows: snapshot
                        .clos
                        .iter()
                        .map(|clo| {
                            let mut row = vec![clo.id.to_string()];
                            row.extend(plos.iter().map(|plo| {
                                if query(&snapshot.mapping, &clo.id, &plo.id) {
                                    "X".to_string()
                                } else {
                                    String::new()
                                }
                            }));
                            row
                        })
                        .collect(),
                },
            ],
        };

        if !snapshot.evaluations.is_empty() {
            matrix
                .blocks
                .push(ReportBlock::Heading("CLO Achievement Evaluation".to_string()));
            matrix.blocks.push(ReportBlock::Table {
                headers: strings(&["CLO ID", "Description", "Achievement (%)"]),
                rows: snapshot
                    .evaluations
                    .iter()
                    .map(|ev| {
                        let description = snapshot
                            .clos
                            .iter()
                            .find(|c| c.id == ev.clo_id)
                            .map(|c| c.description.clone())
                            .unwrap_or_else(|| "N/A".to_string());
                        vec![ev.clo_id.to_string(), description, ev.achievement.to_string()]
                    })
                    .collect(),
            });
        }

        Self {
            course_code: course.code.clone(),
            generated_at: Utc::now(),
            snapshot_fingerprint: snapshot.fingerprint(),
            pages: vec![overview, matrix],
        }
    }

    /// `<code>_CLO_Report.<extension>`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}_CLO_Report.{}", self.course_code, extension)
    }
}

/// Renders a [`ReportDocument`] into some output format.
pub trait DocumentExporter {
    /// File extension for rendered output.
    fn extension(&self) -> &str;

    /// Render `document` into `out`.
    fn export(&self, document: &ReportDocument, out: &mut dyn Write) -> Result<(), ExportError>;
}

/// Build the report for `snapshot` and render it with `exporter`.
///
/// Returns the suggested file name.
pub fn export_snapshot(
    exporter: &dyn DocumentExporter,
    snapshot: &Snapshot,
    out: &mut dyn Write,
) -> Result<String, ExportError> {
    let document = ReportDocument::build(snapshot);
    exporter.export(&document, out)?;
    tracing::info!(
        course = %document.course_code,
        pages = document.pages.len(),
        "Exported CLO report"
    );
    Ok(document.file_name(exporter.extension()))
}

/// Markdown renderer; pages are separated by horizontal rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

impl DocumentExporter for MarkdownExporter {
    fn extension(&self) -> &str {
        "md"
    }

    fn export(&self, document: &ReportDocument, out: &mut dyn Write) -> Result<(), ExportError> {
        check_table_widths(document)?;

        for (index, page) in document.pages.iter().enumerate() {
            if index > 0 {
                writeln!(out, "\n---\n")?;
            }
            for block in &page.blocks {
                match block {
                    ReportBlock::Title(text) => writeln!(out, "# {}\n", text)?,
                    ReportBlock::Heading(text) => writeln!(out, "## {}\n", text)?,
                    ReportBlock::Paragraph(text) => writeln!(out, "{}\n", text)?,
                    ReportBlock::Table { headers, rows } => {
                        write_row(out, headers)?;
                        let rule: Vec<String> = headers.iter().map(|_| "---".to_string()).collect();
                        write_row(out, &rule)?;
                        for row in rows {
                            write_row(out, row)?;
                        }
                        writeln!(out)?;
                    }
                }
            }
        }

        writeln!(
            out,
            "\n---\nGenerated {} · Snapshot {}",
            document.generated_at.format("%Y-%m-%d %H:%M UTC"),
            document.snapshot_fingerprint.chars().take(12).collect::<String>()
        )?;
        Ok(())
    }
}

/// Every table row must have one cell per header; nothing is written otherwise.
fn check_table_widths(document: &ReportDocument) -> Result<(), ExportError> {
    let tables = document.pages.iter().flat_map(|page| &page.blocks).filter_map(|block| match block {
        ReportBlock::Table { headers, rows } => Some((headers, rows)),
        _ => None,
    });
    for (headers, rows) in tables {
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != headers.len()) {
            return Err(ExportError::Render(format!(
                "table row {} has {} cells, expected {}",
                index,
                row.len(),
                headers.len()
            )));
        }
    }
    Ok(())
}

fn write_row(out: &mut dyn Write, cells: &[String]) -> std::io::Result<()> {
    let escaped: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
    writeln!(out, "| {} |", escaped.join(" | "))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleBundle;
    use crate::types::{CloId, Evaluation};

    fn sample() -> Snapshot {
        SampleBundle::preset("SE305").unwrap().into_snapshot()
    }

    #[test]
    fn test_build_pages() {
        let document = ReportDocument::build(&sample());
        assert_eq!(document.pages.len(), 2);
        assert_eq!(document.file_name("pdf"), "SE305_CLO_Report.pdf");
        assert!(document.pages[0]
            .blocks
            .contains(&ReportBlock::Paragraph("Course: Software Engineering Principles (SE305)".to_string())));

        let ReportBlock::Table { headers, rows } = &document.pages[1].blocks[1] else {
            panic!("expected mapping table");
        };
        assert_eq!(headers.len(), 8);
        // CLO3 maps to PLO6 only
        assert_eq!(rows[2], strings(&["CLO3", "", "", "", "", "", "X", ""]));
    }

    #[test]
    fn test_evaluation_table_marks_missing_description() {
        let mut snapshot = sample();
        snapshot.evaluations.push(Evaluation::empty(CloId::from("CLO99")));

        let document = ReportDocument::build(&snapshot);
        let ReportBlock::Table { rows, .. } = document.pages[1].blocks.last().unwrap() else {
            panic!("expected evaluation table");
        };
        assert_eq!(rows[0], strings(&["CLO1", "Define software requirements and create specification documents.", "92%"]));
        assert_eq!(rows.last().unwrap(), &strings(&["CLO99", "N/A", "0%"]));
    }

    #[test]
    fn test_no_evaluation_section_without_evaluations() {
        let mut snapshot = sample();
        snapshot.evaluations.clear();
        let document = ReportDocument::build(&snapshot);
        assert_eq!(document.pages[1].blocks.len(), 2);
    }

    #[test]
    fn test_markdown_export() {
        let mut out = Vec::new();
        let file_name = export_snapshot(&MarkdownExporter, &sample(), &mut out).unwrap();
        assert_eq!(file_name, "SE305_CLO_Report.md");

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("# Course Learning Outcome (CLO) Report"));
        assert!(text.contains("| CLO ID | PLO1 | PLO2 | PLO3 | PLO4 | PLO5 | PLO6 | PLO7 |"));
        assert!(text.contains("| CLO5 | Recognize ethical responsibilities in software development scenarios. | 94% |"));
    }

    #[test]
    fn test_ragged_table_is_not_rendered() {
        let mut document = ReportDocument::build(&sample());
        if let ReportBlock::Table { rows, .. } = &mut document.pages[1].blocks[1] {
            rows[0].pop();
        }

        let mut out = Vec::new();
        let err = MarkdownExporter.export(&document, &mut out).unwrap_err();
        assert!(matches!(err, ExportError::Render(ref msg) if msg.contains("row 0")));
        assert!(out.is_empty());
    }
}
