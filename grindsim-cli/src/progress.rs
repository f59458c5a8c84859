use std::io::Write;

use colored::Colorize;
use grindsim_engine::Progress;

const MILESTONES: usize = 10;

/// Prints a line to stderr each time the run crosses another 10 %, followed
/// by the summary of the results gathered so far.
#[derive(Debug)]
pub struct ProgressMeter<W: Write> {
    out: W,
    label: &'static str,
    requested: usize,
    next_milestone: usize,
    enabled: bool,
}

impl ProgressMeter<std::io::Stderr> {
    pub fn stderr(label: &'static str, requested: usize, enabled: bool) -> Self {
        Self::new(std::io::stderr(), label, requested, enabled)
    }
}

impl<W: Write> ProgressMeter<W> {
    pub fn new(out: W, label: &'static str, requested: usize, enabled: bool) -> Self {
        Self {
            out,
            label,
            requested,
            next_milestone: 1,
            enabled,
        }
    }

    /// `partial` renders the running summary; it is only called when a
    /// milestone short of the final one was crossed.
    pub fn observe(&mut self, progress: Progress, partial: impl FnOnce() -> String) {
        if !self.enabled || self.requested == 0 {
            return;
        }
        let wide = |value: usize| u128::try_from(value).unwrap_or(u128::MAX);
        let completed = wide(progress.completed) * wide(MILESTONES);
        let mut reached = None;
        while self.next_milestone <= MILESTONES
            && completed >= wide(self.next_milestone) * wide(self.requested)
        {
            reached = Some(self.next_milestone);
            self.next_milestone += 1;
        }
        if let Some(step) = reached {
            let percent = step * 100 / MILESTONES;
            let line = format!(
                "⏳ {} {percent:>3}% ({}/{})",
                self.label, progress.completed, progress.requested
            );
            // progress output is best effort
            let _ = writeln!(self.out, "{}", line.cyan());
            if step < MILESTONES {
                let _ = writeln!(self.out, "{}", partial().dimmed());
            }
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
