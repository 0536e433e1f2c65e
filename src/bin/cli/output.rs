//! Output formatting for CLI operations.

use serde_json::json;
use std::path::Path;
use vocabvault::codec;
use vocabvault::format::CentralDirectoryRecord;
use vocabvault::progress::format_bytes_iec;
use vocabvault::{ReconciledState, Snapshot};

/// Outcome of importing several sources
#[derive(Default)]
pub struct ImportSummary {
    /// Source path and the topic files it produced
    pub imported: Vec<(String, Vec<String>)>,
    /// Source path and the error it failed with
    pub failures: Vec<(String, String)>,
}

impl ImportSummary {
    fn topic_count(&self) -> usize {
        self.imported.iter().map(|(_, files)| files.len()).sum()
    }
}

/// Outcome of an archive integrity test
#[derive(Default)]
pub struct TestSummary {
    pub tested: usize,
    pub passed: usize,
    pub failures: Vec<(String, String)>,
}

/// One line of the topic listing
pub struct TopicRow {
    pub id: String,
    pub name: String,
    pub user: bool,
    pub entries: usize,
    pub completed: usize,
    pub completion_count: u32,
    pub active: usize,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats import results
    fn format_import(&self, summary: &ImportSummary) -> String;

    /// Formats a central directory listing
    fn format_records(&self, records: &[CentralDirectoryRecord]) -> String;

    /// Formats archive test results
    fn format_test(&self, summary: &TestSummary) -> String;

    /// Formats the topic listing
    fn format_topics(&self, rows: &[TopicRow]) -> String;

    /// Formats a written snapshot
    fn format_export(&self, path: &Path, snapshot: &Snapshot) -> String;

    /// Formats a restore
    fn format_restore(&self, restored_files: &[String], state: &ReconciledState) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_import(&self, summary: &ImportSummary) -> String {
        let mut output = String::new();
        for (source, files) in &summary.imported {
            output.push_str(&format!("{}:\n", source));
            for file in files {
                output.push_str(&format!("  + {}\n", file));
            }
        }
        for (source, error) in &summary.failures {
            output.push_str(&format!("{}: FAILED - {}\n", source, error));
        }
        output.push_str(&format!(
            "Imported {} topic file(s) from {} source(s)\n",
            summary.topic_count(),
            summary.imported.len()
        ));
        output
    }

    fn format_records(&self, records: &[CentralDirectoryRecord]) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{:>12} {:>12} {:>8} {:>10} {}\n",
            "Size", "Packed", "Method", "CRC", "Name"
        ));
        output.push_str(&"-".repeat(70));
        output.push('\n');

        let mut total_size: u64 = 0;
        let mut file_count = 0;
        let mut dir_count = 0;

        for record in records {
            if record.is_directory() {
                dir_count += 1;
                output.push_str(&format!(
                    "{:>12} {:>12} {:>8} {:>10} {}\n",
                    "", "", "", "", record.name
                ));
                continue;
            }
            file_count += 1;
            total_size += u64::from(record.uncompressed_size);
            output.push_str(&format!(
                "{:>12} {:>12} {:>8} {:>10} {}\n",
                format_bytes_iec(u64::from(record.uncompressed_size)),
                format_bytes_iec(u64::from(record.compressed_size)),
                record.method.name(),
                format!("{:08X}", record.crc32),
                record.name
            ));
        }

        output.push_str(&"-".repeat(70));
        output.push('\n');
        output.push_str(&format!(
            "{} files, {} directories, {} total\n",
            file_count,
            dir_count,
            format_bytes_iec(total_size)
        ));
        output
    }

    fn format_test(&self, summary: &TestSummary) -> String {
        let mut output = String::new();
        if summary.failures.is_empty() {
            output.push_str(&format!(
                "OK - {} entries tested, all passed\n",
                summary.tested
            ));
        } else {
            output.push_str("Test completed with errors:\n");
            output.push_str(&format!("  Tested: {}\n", summary.tested));
            output.push_str(&format!("  Passed: {}\n", summary.passed));
            output.push_str(&format!("  Failed: {}\n", summary.failures.len()));
            output.push_str("\nFailures:\n");
            for (name, error) in &summary.failures {
                output.push_str(&format!("  {}: {}\n", name, error));
            }
        }
        output
    }

    fn format_topics(&self, rows: &[TopicRow]) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{:<30} {:>4} {:>8} {:>10} {:>7} {:>7}\n",
            "Topic", "Kind", "Entries", "Completed", "Rounds", "Active"
        ));
        output.push_str(&"-".repeat(70));
        output.push('\n');
        for row in rows {
            output.push_str(&format!(
                "{:<30} {:>4} {:>8} {:>10} {:>7} {:>7}\n",
                row.name,
                if row.user { "user" } else { "bndl" },
                row.entries,
                row.completed,
                row.completion_count,
                row.active
            ));
        }
        output.push_str(&format!("{} topics\n", rows.len()));
        output
    }

    fn format_export(&self, path: &Path, snapshot: &Snapshot) -> String {
        format!(
            "Wrote {} ({} practice states, {} topic progress states, {} user topics)\n",
            path.display(),
            snapshot.practice_states.len(),
            snapshot.topic_progress_states.len(),
            snapshot.user_topics.len()
        )
    }

    fn format_restore(&self, restored_files: &[String], state: &ReconciledState) -> String {
        let mut output = String::new();
        for file in restored_files {
            output.push_str(&format!("  + {}\n", file));
        }
        output.push_str(&format!(
            "Restored {} practice and {} progress states\n",
            state.practice_states.len(),
            state.progress_states.len()
        ));
        if state.dropped_practice + state.dropped_progress > 0 {
            output.push_str(&format!(
                "Dropped {} practice and {} progress states with no matching topic\n",
                state.dropped_practice, state.dropped_progress
            ));
        }
        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_import(&self, summary: &ImportSummary) -> String {
        let obj = json!({
            "success": summary.failures.is_empty(),
            "imported": summary.imported.iter().map(|(s, f)| json!({"source": s, "filenames": f, "count": f.len()})).collect::<Vec<_>>(),
            "failures": summary.failures.iter().map(|(s, e)| json!({"source": s, "error": e})).collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_records(&self, records: &[CentralDirectoryRecord]) -> String {
        let items: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "method": r.method.name(),
                    "compressed_size": r.compressed_size,
                    "uncompressed_size": r.uncompressed_size,
                    "crc32": r.crc32,
                    "local_header_offset": r.local_header_offset,
                    "is_directory": r.is_directory(),
                    "supported": codec::is_supported(r.method),
                })
            })
            .collect();
        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_test(&self, summary: &TestSummary) -> String {
        let obj = json!({
            "success": summary.failures.is_empty(),
            "entries_tested": summary.tested,
            "entries_passed": summary.passed,
            "failures": summary.failures.iter().map(|(p, e)| json!({"path": p, "error": e})).collect::<Vec<_>>(),
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_topics(&self, rows: &[TopicRow]) -> String {
        let items: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "name": r.name,
                    "user": r.user,
                    "entries": r.entries,
                    "completed": r.completed,
                    "completion_count": r.completion_count,
                    "active": r.active,
                })
            })
            .collect();
        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_export(&self, path: &Path, snapshot: &Snapshot) -> String {
        let obj = json!({
            "path": path.display().to_string(),
            "saved_at": snapshot.saved_at.to_rfc3339(),
            "practice_states": snapshot.practice_states.len(),
            "topic_progress_states": snapshot.topic_progress_states.len(),
            "user_topics": snapshot.user_topics.len(),
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_restore(&self, restored_files: &[String], state: &ReconciledState) -> String {
        let obj = json!({
            "restored_files": restored_files,
            "practice_states": state.practice_states.len(),
            "progress_states": state.progress_states.len(),
            "dropped_practice": state.dropped_practice,
            "dropped_progress": state.dropped_progress,
        });
        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
