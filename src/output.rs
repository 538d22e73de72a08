use crate::models::ExperimentReport;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print the experiment summary in the specified format
pub fn print_report(report: &ExperimentReport, format: OutputFormat) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = match format {
        OutputFormat::Plain => write_plain(&mut out, report),
        OutputFormat::Json => write_json(&mut out, report),
    };

    if let Err(e) = written {
        eprintln!("Error writing summary: {}", e);
    }
}

/// Human-readable summary: one block per strategy followed by the winner
fn write_plain<W: Write>(out: &mut W, report: &ExperimentReport) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "EXPERIMENT RESULTS")?;
    writeln!(out, "{}", "=".repeat(60))?;

    if report.strategies.is_empty() {
        writeln!(out)?;
        writeln!(out, "No results collected.")?;
        return Ok(());
    }

    for (kind, summary) in &report.strategies {
        writeln!(out)?;
        writeln!(out, "{}: {}", kind.code(), summary.display_name)?;
        writeln!(out, "  Latency: {:.2}ms", summary.avg_latency_ms)?;
        writeln!(out, "  Relevance: {:.1}%", summary.avg_relevance_score * 100.0)?;
        writeln!(out, "  Accuracy: {:.1}%", summary.avg_accuracy_score * 100.0)?;
        writeln!(out, "  Errors: {}/{}", summary.error_count, summary.test_count)?;
    }

    writeln!(out)?;
    match report.winner {
        Some(winner) => writeln!(out, "Winner: {}", winner)?,
        None => writeln!(out, "Winner: none")?,
    }

    Ok(())
}

/// Report as indented JSON
fn write_json<W: Write>(out: &mut W, report: &ExperimentReport) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    writeln!(out, "{}", json)
}
