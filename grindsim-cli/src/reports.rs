use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use grindsim_engine::{RunOutcome, TailWindow, TrialFamily};
use serde::Serialize;

/// Everything a front end needs to present one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub family: TrialFamily,
    pub generated_at: String,
    pub outcome: RunOutcome,
    pub tail_window: TailWindow,
    pub wall_time_ms: u128,
    /// `None` when no trial completed.
    pub summary: Option<serde_json::Value>,
    /// The plain-text summary block.
    #[serde(skip)]
    pub text: String,
}

impl RunReport {
    fn title(&self) -> &'static str {
        match self.family {
            TrialFamily::Fighting => "Fighting Simulation Results",
            TrialFamily::Thieving => "Thieving Simulation Results",
        }
    }
}

pub fn generate_console_report(out: &mut dyn Write, report: &RunReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", format!("📊 {}", report.title()).bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;
    writeln!(out, "{}", report.text)?;
    writeln!(out)?;

    let outcome = &report.outcome;
    let completed = format!("{}/{}", outcome.completed, outcome.requested);
    if outcome.cancelled {
        writeln!(
            out,
            "Trials: {} {}",
            completed.yellow(),
            "(cancelled)".yellow().bold()
        )?;
    } else {
        writeln!(out, "Trials: {}", completed.green())?;
    }
    writeln!(out, "Seed: {}", outcome.seed)?;
    writeln!(out, "Random draws: {}", outcome.total_draws)?;
    writeln!(out, "🏁 Wall time: {} ms", report.wall_time_ms)?;
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, report: &RunReport) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &RunReport) -> Result<()> {
    writeln!(out, "# {}\n", report.title())?;
    writeln!(out, "- **Generated**: {}", report.generated_at)?;
    writeln!(
        out,
        "- **Trials**: {}/{}{}",
        report.outcome.completed,
        report.outcome.requested,
        if report.outcome.cancelled {
            " (cancelled)"
        } else {
            ""
        }
    )?;
    writeln!(out, "- **Seed**: {}\n", report.outcome.seed)?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "| Statistic | Value |")?;
    writeln!(out, "|---|---|")?;
    let rows = report
        .text
        .lines()
        .filter_map(|line| line.split_once(": "));
    for (label, value) in rows {
        writeln!(out, "| {label} | {value} |")?;
    }
    if report.summary.is_none() {
        writeln!(out, "\n_{}._", report.text)?;
    }
    Ok(())
}
