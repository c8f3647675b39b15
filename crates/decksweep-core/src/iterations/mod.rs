//! Solver effort totals read from a simulator print file.

use crate::deck::read_text;
use crate::domain::SweepResult;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

static NEWTON_ITERATIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\s+ITS\)").expect("ITS pattern is valid"));
static LINEAR_ITERATIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"LINIT=\s*(\d+)\b").expect("LINIT pattern is valid"));
static TIME_STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bSTEP\s+\d+\b").expect("STEP pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationSummary {
    pub newton_iterations: u64,
    pub linear_iterations: u64,
    pub time_steps: u64,
}

impl IterationSummary {
    /// Each line contributes at most one match per counter.
    pub fn from_text(text: &str) -> Self {
        text.lines().fold(Self::default(), |mut summary, line| {
            summary.newton_iterations += first_count(&NEWTON_ITERATIONS, line);
            summary.linear_iterations += first_count(&LINEAR_ITERATIONS, line);
            if TIME_STEP.is_match(line) {
                summary.time_steps += 1;
            }
            summary
        })
    }

    pub fn render_human(&self) -> String {
        [
            format!("Non-linear iterations (ITS): {}", self.newton_iterations),
            format!("Linear iterations (LINIT): {}", self.linear_iterations),
            format!("Time steps (STEP lines): {}", self.time_steps),
        ]
        .join("\n")
    }
}

fn first_count(pattern: &Regex, line: &str) -> u64 {
    pattern
        .captures(line)
        .and_then(|captures| captures[1].parse::<u64>().ok())
        .unwrap_or(0)
}

pub fn summarize_print_file(path: &Path) -> SweepResult<IterationSummary> {
    let source = read_text(path, "print file")?;
    Ok(IterationSummary::from_text(&source.text))
}
