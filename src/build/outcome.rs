use super::Stage;
use crate::ui::Table;
use colored::*;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a stage failed for one unit.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("error testing {unit}: {status}. Logs created")]
    TestsFailed {
        unit: String,
        status: String,
        logs: Vec<PathBuf>,
    },

    #[error("error building for {platform}/{arch}: {status}\n{stdout}\n{stderr}")]
    BuildFailed {
        platform: String,
        arch: String,
        status: String,
        stdout: String,
        stderr: String,
    },
}

#[derive(Debug)]
pub enum StageOutcome {
    Passed { elapsed: Duration },
    Failed(StageError),
    /// An earlier stage of the same unit failed.
    Skipped,
}

impl StageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

/// Outcome of every enabled stage for one unit, in run order.
#[derive(Debug)]
pub struct UnitReport {
    pub unit: String,
    pub stages: Vec<(Stage, StageOutcome)>,
}

impl UnitReport {
    pub fn new(unit: &str) -> Self {
        Self {
            unit: unit.to_string(),
            stages: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push((stage, outcome));
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, outcome)| outcome)
    }

    pub fn failed(&self) -> bool {
        self.stages.iter().any(|(_, outcome)| outcome.is_failure())
    }
}

/// Per-unit reports in discovery order.
///
/// No overall pass/fail verdict is computed; callers decide what a failed
/// unit means for them.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub reports: Vec<UnitReport>,
}

impl BuildSummary {
    pub fn get(&self, unit: &str) -> Option<&UnitReport> {
        self.reports.iter().find(|r| r.unit == unit)
    }

    pub fn failed_units(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.failed())
            .map(|r| r.unit.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn print_table(&self) {
        let mut table = Table::new(&["Unit", "Test", "Build", "Hash"]);
        let mut reports: Vec<&UnitReport> = self.reports.iter().collect();
        reports.sort_by(|a, b| a.unit.cmp(&b.unit));

        for report in reports {
            let mut row = vec![report.unit.bold().to_string()];
            for stage in Stage::ALL {
                row.push(cell(report.outcome(stage)));
            }
            table.add_row(row);
        }
        table.print();
    }
}

fn cell(outcome: Option<&StageOutcome>) -> String {
    match outcome {
        None => "-".dimmed().to_string(),
        Some(StageOutcome::Passed { elapsed }) => {
            format!("{} {:.1}s", "✓".green(), elapsed.as_secs_f64())
        }
        Some(StageOutcome::Failed(_)) => "x failed".red().to_string(),
        Some(StageOutcome::Skipped) => "skipped".yellow().to_string(),
    }
}
