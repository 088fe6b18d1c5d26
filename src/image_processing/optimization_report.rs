/// Report generation for `--report`
///
/// Collects one entry per processed file and prints a table with the frame
/// counts and durations before and after sequence optimization.
use prettytable::{format, Cell, Row, Table};
use std::path::Path;
use std::time::Duration;

use super::{OutputKind, ProcessingResult};
use crate::utils::format_duration;

/// Single file entry for the report
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub input_filename: String,
    pub output_filename: String,
    pub animated: bool,
    pub frames_in: usize,
    pub frames_out: usize,
    pub duplicates_removed: usize,
    pub frames_merged: usize,
    pub trailing_dropped: usize,
    pub duration_before_ms: u64,
    pub duration_after_ms: u64,
    pub colors_quantized: bool,
    pub processing_time: Duration,
}

impl ReportEntry {
    pub fn from_result(result: &ProcessingResult) -> Self {
        let (animated, frames_in, frames_out) = match result.kind {
            OutputKind::Still => (false, 1, 1),
            OutputKind::Animation {
                frames_in,
                frames_out,
            } => (true, frames_in, frames_out),
        };
        let stats = result.optimization.clone().unwrap_or_default();

        Self {
            input_filename: extract_filename(&result.input_path),
            output_filename: extract_filename(&result.output_path),
            animated,
            frames_in,
            frames_out,
            duplicates_removed: stats.duplicates_removed,
            frames_merged: stats.frames_merged,
            trailing_dropped: stats.trailing_frames_dropped,
            duration_before_ms: stats.duration_before_ms,
            duration_after_ms: stats.duration_after_ms,
            colors_quantized: stats.colors_quantized,
            processing_time: result.processing_time,
        }
    }
}

/// Complete processing report
#[derive(Debug, Default)]
pub struct ProcessingReport {
    pub still_entries: Vec<ReportEntry>,
    pub animation_entries: Vec<ReportEntry>,
    pub failures: Vec<(String, String)>,
}

impl ProcessingReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: &ProcessingResult) {
        let entry = ReportEntry::from_result(result);
        if entry.animated {
            self.animation_entries.push(entry);
        } else {
            self.still_entries.push(entry);
        }
    }

    pub fn add_failure(&mut self, path: &Path, error: &str) {
        self.failures
            .push((extract_filename(path), error.to_string()));
    }

    pub fn total(&self) -> usize {
        self.still_entries.len() + self.animation_entries.len() + self.failures.len()
    }

    pub fn still_table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(Row::new(vec![
            Cell::new("Input"),
            Cell::new("Output"),
            Cell::new("Time"),
        ]));

        for entry in &self.still_entries {
            table.add_row(Row::new(vec![
                Cell::new(&truncate(&entry.input_filename, 30)),
                Cell::new(&truncate(&entry.output_filename, 30)),
                Cell::new(&format_duration(entry.processing_time)),
            ]));
        }
        table
    }

    pub fn animation_table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(Row::new(vec![
            Cell::new("Input"),
            Cell::new("Output"),
            Cell::new("Frames"),
            Cell::new("Dupes"),
            Cell::new("Merged"),
            Cell::new("Tail"),
            Cell::new("Duration"),
            Cell::new("Quant."),
            Cell::new("Time"),
        ]));

        for entry in &self.animation_entries {
            let quantized = if entry.colors_quantized { "✓" } else { "✗" };
            table.add_row(Row::new(vec![
                Cell::new(&truncate(&entry.input_filename, 25)),
                Cell::new(&truncate(&entry.output_filename, 25)),
                Cell::new(&format!("{} → {}", entry.frames_in, entry.frames_out)),
                Cell::new(&entry.duplicates_removed.to_string()),
                Cell::new(&entry.frames_merged.to_string()),
                Cell::new(&entry.trailing_dropped.to_string()),
                Cell::new(&format!(
                    "{}ms → {}ms",
                    entry.duration_before_ms, entry.duration_after_ms
                )),
                Cell::new(quantized),
                Cell::new(&format_duration(entry.processing_time)),
            ]));
        }
        table
    }

    /// Print the complete report as formatted tables
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════════╗");
        println!("║                             REPORT                             ║");
        println!("╚════════════════════════════════════════════════════════════════╝\n");

        if !self.still_entries.is_empty() {
            println!("🖼️  STILL IMAGES ({} total)\n", self.still_entries.len());
            self.still_table().printstd();
            println!();
        }

        if !self.animation_entries.is_empty() {
            println!("🎞️  ANIMATIONS ({} total)\n", self.animation_entries.len());
            self.animation_table().printstd();
            println!();
        }

        if !self.failures.is_empty() {
            println!("❌ FAILED ({} total)\n", self.failures.len());
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BOX_CHARS);
            table.set_titles(Row::new(vec![Cell::new("Input"), Cell::new("Error")]));
            for (name, error) in &self.failures {
                table.add_row(Row::new(vec![
                    Cell::new(&truncate(name, 30)),
                    Cell::new(&truncate(error, 60)),
                ]));
            }
            table.printstd();
            println!();
        }

        let frames_saved: usize = self
            .animation_entries
            .iter()
            .map(|e| e.frames_in.saturating_sub(e.frames_out))
            .sum();

        println!("📊 Summary:");
        println!("   • Total files: {}", self.total());
        println!("   • Still images: {}", self.still_entries.len());
        println!("   • Animations: {}", self.animation_entries.len());
        println!("   • Frames removed by optimizer: {}", frames_saved);
        println!("   • Failed: {}", self.failures.len());
        println!();
    }
}

/// Truncate string to fit in column
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// Helper to extract filename from path
pub fn extract_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unknown")
        .to_string()
}
