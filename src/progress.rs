//! Terminal progress for sequencer runs

use colored::Colorize;
use converge::{ProgressCallback, RunReport, StepOutcome};
use std::io::Write;

/// Prints one line per step to any writer
///
/// Write errors are ignored; progress output must never abort a run.
pub struct Reporter<W: Write> {
    out: W,
    quiet: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, quiet: bool) -> Self {
        Self { out, quiet }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressCallback for Reporter<W> {
    fn on_run_start(&mut self, total: usize, dry_run: bool) {
        if self.quiet {
            return;
        }
        let mode = if dry_run { " (dry run)" } else { "" };
        let _ = writeln!(self.out, "  {} steps{}", total.to_string().bold(), mode);
        let _ = writeln!(self.out);
    }

    fn on_step_start(&mut self, index: usize, total: usize, _name: &str, description: &str) {
        if self.quiet {
            return;
        }
        let _ = writeln!(
            self.out,
            "{} {}",
            format!("[{index}/{total}]").blue().bold(),
            description
        );
    }

    fn on_step_complete(&mut self, name: &str, outcome: &StepOutcome) {
        let line = match outcome {
            StepOutcome::Skipped => format!("  {} {} already in place", "·".dimmed(), name),
            StepOutcome::Applied => format!("  {} {} applied", "✓".green(), name),
            StepOutcome::Planned => format!("  {} {} would be applied", "→".cyan(), name),
            StepOutcome::Failed { error } => {
                format!("  {} {} failed: {}", "✗".red(), name, error)
            }
        };
        if self.quiet && outcome.is_success() {
            return;
        }
        let _ = writeln!(self.out, "{line}");
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        if self.quiet {
            return;
        }
        let _ = writeln!(self.out);
        let summary = format!(
            "{} applied, {} already in place, {} planned",
            report.applied(),
            report.skipped(),
            report.planned()
        );
        match report.failure() {
            None => {
                let _ = writeln!(self.out, "{} {}", "✓".green(), summary);
            }
            Some(failed) => {
                let _ = writeln!(
                    self.out,
                    "{} stopped at {} ({})",
                    "✗".red(),
                    failed.name.bold(),
                    summary
                );
            }
        }
    }
}
