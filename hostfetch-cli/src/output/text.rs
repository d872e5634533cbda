//! Text output formatting with colors.

use chrono::{DateTime, Utc};
use hostfetch_core::{SnmpRawData, SnmpTable};

use super::{CacheReport, FetchOutcome, FetchReport, Payload, SectionReport};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Separator between cells of an SNMP row.
const CELL_SEPARATOR: &str = " | ";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn color(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// Formats the result of a fetch.
    pub fn format_fetch(&self, report: &FetchReport) -> String {
        let status = match &report.outcome {
            FetchOutcome::Payload(_) => self.color(GREEN, "OK"),
            FetchOutcome::Fault { kind, message } => {
                self.color(RED, &format!("FAILED {kind}: {message}"))
            }
            FetchOutcome::Cancelled(reason) => self.color(YELLOW, &format!("CANCELLED {reason}")),
        };
        let header = format!(
            "{} ({}, {}, {} trigger): {status}",
            self.color(BOLD, report.hostname.as_str()),
            report.fetcher,
            report.mode,
            report.trigger,
        );

        match &report.outcome {
            FetchOutcome::Payload(Payload::Agent(raw)) => {
                let text = raw.to_text_lossy();
                if text.is_empty() {
                    format!("{header}\n{}", self.color(DIM, "(empty payload)"))
                } else {
                    format!("{header}\n{}", text.trim_end_matches('\n'))
                }
            }
            FetchOutcome::Payload(Payload::Snmp(raw)) => {
                format!("{header}\n{}", self.format_snmp(raw))
            }
            FetchOutcome::Fault { .. } | FetchOutcome::Cancelled(_) => header,
        }
    }

    /// Formats SNMP sections, one block per section.
    pub fn format_snmp(&self, raw: &SnmpRawData) -> String {
        if raw.is_empty() {
            return self.color(DIM, "(no sections)");
        }

        let mut lines = Vec::new();
        for (marker, tables) in raw {
            lines.push(self.color(CYAN, &format!("[{marker}]")));
            for (index, table) in tables.iter().enumerate() {
                if tables.len() > 1 {
                    lines.push(self.color(DIM, &format!("  table {}", index + 1)));
                }
                lines.extend(format_table(table));
            }
        }
        lines.join("\n")
    }

    /// Formats the cache listing of a host.
    pub fn format_cache(&self, report: &CacheReport) -> String {
        let mut lines = vec![self.color(BOLD, report.hostname.as_str())];

        lines.push(format!(
            "Walk cache: {} ({})",
            report.walk_cache_dir.display(),
            count(report.walks.len(), "entry", "entries")
        ));
        for key in &report.walks {
            lines.push(format!(
                "  {}  {}",
                key.fetchoid,
                self.color(DIM, &format!("context {}", key.context_hash))
            ));
        }

        lines.push(format!(
            "Section cache: {} ({})",
            report.section_cache_dir.display(),
            count(report.sections.len(), "entry", "entries")
        ));
        for section in &report.sections {
            lines.push(self.format_section(section));
        }

        lines.join("\n")
    }

    fn format_section(&self, section: &SectionReport) -> String {
        let validity = match (section.valid, section.valid_until) {
            (Some(true), Some(until)) => self.color(GREEN, &format!("valid until {}", timestamp(until))),
            (Some(true), None) => self.color(GREEN, "valid"),
            (Some(false), _) => self.color(RED, "expired"),
            (None, _) => self.color(DIM, "no interval configured"),
        };
        format!(
            "  {}  captured {}  {}  {validity}",
            section.entry.section,
            timestamp(section.entry.captured_at),
            count(section.entry.tables, "table", "tables"),
        )
    }
}

fn format_table(table: &SnmpTable) -> Vec<String> {
    table
        .iter()
        .map(|row| {
            let cells: Vec<_> = row.iter().map(|value| value.as_text()).collect();
            format!("  {}", cells.join(CELL_SEPARATOR))
        })
        .collect()
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    format!("{n} {}", if n == 1 { singular } else { plural })
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
