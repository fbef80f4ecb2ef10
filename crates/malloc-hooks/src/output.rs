use colored::*;
use prettytable::{color, Attr, Cell, Row, Table};
use serde::{Deserialize, Serialize};

use crate::config::Format;
use crate::counters::Snapshot;

/// What a [`HooksGuard`](crate::HooksGuard) hands to its [`Reporter`] when it
/// is dropped.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub caller_name: String,
    /// Nanoseconds the guard was alive.
    pub total_elapsed: u64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

/// Trait for implementing custom report output.
///
/// Implement this to send the outstanding-allocation figures somewhere other
/// than stdout, e.g. a log, a metrics pipeline or a file.
///
/// ```rust
/// use malloc_hooks::{Report, Reporter};
///
/// struct LogReporter;
///
/// impl Reporter for LogReporter {
///     fn report(&self, report: &Report) -> Result<(), Box<dyn std::error::Error>> {
///         eprintln!("{}: {}", report.caller_name, report.snapshot);
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter: Send + Sync {
    fn report(&self, report: &Report) -> Result<(), Box<dyn std::error::Error>>;
}

pub(crate) fn reporter_for(format: Format) -> Box<dyn Reporter> {
    match format {
        Format::Table => Box::new(TableReporter),
        Format::Json => Box::new(JsonReporter),
        Format::JsonPretty => Box::new(JsonPrettyReporter),
    }
}

pub(crate) struct TableReporter;

impl Reporter for TableReporter {
    fn report(&self, report: &Report) -> Result<(), Box<dyn std::error::Error>> {
        let use_colors = std::env::var("NO_COLOR").is_err();

        let mut table = Table::new();
        let header_cells: Vec<Cell> = ["Metric", "Value"]
            .into_iter()
            .map(|header| {
                if use_colors {
                    Cell::new(header)
                        .with_style(Attr::Bold)
                        .with_style(Attr::ForegroundColor(color::CYAN))
                } else {
                    Cell::new(header).with_style(Attr::Bold)
                }
            })
            .collect();
        table.add_row(Row::new(header_cells));

        table.add_row(Row::new(vec![
            Cell::new("allocation_count"),
            Cell::new(&report.snapshot.allocation_count.to_string()),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("heap_allocated_memory_in_bytes"),
            Cell::new(&format_bytes(report.snapshot.heap_allocated_memory_in_bytes)),
        ]));

        println!(
            "{} outstanding allocations - {} (Total time: {})",
            "[malloc-hooks]".blue().bold(),
            report.caller_name.yellow().bold(),
            format_duration(report.total_elapsed)
        );
        table.printstd();
        Ok(())
    }
}

pub(crate) struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, report: &Report) -> Result<(), Box<dyn std::error::Error>> {
        println!("{}", serde_json::to_string(report)?);
        Ok(())
    }
}

pub(crate) struct JsonPrettyReporter;

impl Reporter for JsonPrettyReporter {
    fn report(&self, report: &Report) -> Result<(), Box<dyn std::error::Error>> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log(THRESHOLD).floor() as usize).min(UNITS.len() - 1);
    let unit_value = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", unit_value, UNITS[unit_index])
    }
}

pub fn format_duration(ns: u64) -> String {
    if ns < 1_000 {
        format!("{} ns", ns)
    } else if ns < 1_000_000 {
        format!("{:.2} µs", ns as f64 / 1_000.0)
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", ns as f64 / 1_000_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(192), "192 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(999), "999 ns");
        assert_eq!(format_duration(1_500_000), "1.50 ms");
        assert_eq!(format_duration(2_000_000_000), "2.00 s");
    }

    #[test]
    fn test_report_json_is_flat() {
        let report = Report {
            caller_name: "app::main".to_string(),
            total_elapsed: 42,
            snapshot: Snapshot {
                allocation_count: 2,
                heap_allocated_memory_in_bytes: 192,
            },
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["caller_name"], "app::main");
        assert_eq!(json["allocation_count"], 2);
        assert_eq!(json["heap_allocated_memory_in_bytes"], 192);

        let back: Report = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
