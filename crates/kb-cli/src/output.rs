//! Command output formatting.
//!
//! Everything here returns strings; `main` decides where they go. Logs are
//! on stderr, so stdout only ever carries these.

use crate::list::ListEntry;
use clap::ValueEnum;
use kb_sync::{PullReport, PushReport};

/// Output format for `kb list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for humans
    #[default]
    Table,
    /// Pretty-printed JSON
    Structured,
}

const HEADERS: [&str; 5] = ["SLUG", "TITLE", "TYPE", "STATUS", "STATE"];

pub fn render_list(entries: &[ListEntry], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(entries)),
        OutputFormat::Structured => serde_json::to_string_pretty(entries),
    }
}

fn render_table(entries: &[ListEntry]) -> String {
    if entries.is_empty() {
        return "No documents\n".to_string();
    }

    let rows: Vec<[&str; 5]> = entries
        .iter()
        .map(|e| {
            [
                e.slug.as_str(),
                e.title.as_str(),
                e.doc_type.as_str(),
                e.status.as_str(),
                e.state.as_str(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&HEADERS).chain(rows.iter()) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn prefix(dry_run: bool) -> &'static str {
    if dry_run { "[dry run] " } else { "" }
}

pub fn format_pull_report(report: &PullReport) -> String {
    let mut out = format!(
        "{}Pulled {} document(s), {} unchanged\n",
        prefix(report.dry_run),
        report.written.len(),
        report.unchanged.len()
    );
    for file in &report.written {
        out.push_str(&format!("  ↓ {file}\n"));
    }
    out
}

pub fn format_push_report(report: &PushReport) -> String {
    let mut out = format!(
        "{}Created {}, pushed {}, unchanged {}, orphaned {}, conflicts {}\n",
        prefix(report.dry_run),
        report.created.len(),
        report.pushed.len(),
        report.unchanged.len(),
        report.orphaned.len(),
        report.conflicts.len()
    );
    for file in &report.created {
        out.push_str(&format!("  + {file}\n"));
    }
    for file in &report.pushed {
        out.push_str(&format!("  ↑ {file}\n"));
    }
    for file in &report.orphaned {
        out.push_str(&format!("  ? {file} (not in ledger, skipped)\n"));
    }
    for conflict in &report.conflicts {
        out.push_str(&format!("  ! {} (conflict)\n", conflict.file));
    }
    if !report.conflicts.is_empty() && !report.dry_run {
        out.push_str(&format!(
            "See {} for details\n",
            kb_sync::conflicts::CONFLICTS_PATH
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_sync::{ConflictRecord, Fingerprint};

    fn entry(slug: &str, title: &str, state: &str) -> ListEntry {
        ListEntry {
            slug: slug.to_string(),
            title: title.to_string(),
            doc_type: "note".to_string(),
            status: String::new(),
            state: state.to_string(),
            id: None,
            url: None,
        }
    }

    #[test]
    fn test_table_is_aligned() {
        let entries = vec![
            entry("alpha", "Alpha", "synced"),
            entry("reading-list", "Reading List", "modified"),
        ];
        let table = render_list(&entries, OutputFormat::Table).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("SLUG          TITLE"));
        assert!(lines[1].starts_with("alpha         Alpha"));
        let state_column = lines[0].find("STATE").unwrap();
        assert_eq!(&lines[2][state_column..], "modified");
    }

    #[test]
    fn test_structured_output_is_json() {
        let entries = vec![entry("alpha", "Alpha", "new")];
        let json = render_list(&entries, OutputFormat::Structured).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["slug"], "alpha");
        assert_eq!(value[0]["type"], "note");
        assert!(value[0].get("id").is_none());
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_list(&[], OutputFormat::Table).unwrap(), "No documents\n");
    }

    #[test]
    fn test_push_report_lists_conflicts() {
        let report = PushReport {
            pushed: vec!["alpha.md".to_string()],
            conflicts: vec![ConflictRecord {
                file: "beta.md".to_string(),
                remote_id: "b".to_string(),
                current_local: Fingerprint::from_stored("h4"),
                synced_local: Fingerprint::from_stored("h2"),
                synced_remote: Fingerprint::from_stored("h3"),
                url: String::new(),
            }],
            ..Default::default()
        };
        let text = format_push_report(&report);
        assert!(text.starts_with("Created 0, pushed 1, unchanged 0, orphaned 0, conflicts 1\n"));
        assert!(text.contains("  ↑ alpha.md\n"));
        assert!(text.contains("  ! beta.md (conflict)\n"));
        assert!(text.contains(".sync/conflicts.md"));
    }

    #[test]
    fn test_dry_run_pull_report() {
        let report = PullReport {
            written: vec!["alpha.md".to_string()],
            unchanged: Vec::new(),
            dry_run: true,
        };
        assert_eq!(
            format_pull_report(&report),
            "[dry run] Pulled 1 document(s), 0 unchanged\n  ↓ alpha.md\n"
        );
    }
}
