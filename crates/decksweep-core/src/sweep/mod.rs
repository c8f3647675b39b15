//! End-to-end sweep: design expansion, case naming checks, materialization and
//! the run report.

mod config;

pub use config::SweepConfig;

use crate::domain::{ParameterSet, SweepError, SweepResult};
use crate::grid::expand;
use crate::materialize::{CaseMaterializer, FieldMatch};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseStatus {
    Written,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFailure {
    pub category: String,
    pub placeholder: String,
    pub message: String,
}

impl From<&SweepError> for CaseFailure {
    fn from(error: &SweepError) -> Self {
        Self {
            category: error.category().as_str().to_string(),
            placeholder: error.placeholder().to_string(),
            message: error.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub ordinal: usize,
    pub name: String,
    pub parameters: ParameterSet,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    pub fields: Vec<FieldMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CaseFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub output_root: PathBuf,
    pub expected_case_count: usize,
    pub written_case_count: usize,
    pub failed_case_count: usize,
    pub unmatched_field_count: usize,
    pub cases: Vec<CaseReport>,
}

impl SweepReport {
    /// True when every expected case was written.
    pub fn succeeded(&self) -> bool {
        self.failed_case_count == 0 && self.written_case_count == self.expected_case_count
    }
}

/// Expands the design and writes one case per parameter set.
///
/// Configuration problems, including two parameter sets mapping to the same
/// case name, are reported before anything is written. A case that fails
/// afterwards is logged, recorded in the report and skipped.
pub fn run_sweep(config: &SweepConfig) -> SweepResult<SweepReport> {
    config.validate()?;
    let expected_case_count = config.design.expected_count()?;
    let parameter_sets = expand(&config.design)?;
    let materializer = CaseMaterializer::new(config.materializer.clone())?;

    let names = parameter_sets
        .iter()
        .enumerate()
        .map(|(index, parameters)| materializer.case_name(index + 1, parameters))
        .collect::<Vec<_>>();
    check_unique_names(&names)?;

    let output_root = &config.materializer.output_root;
    fs::create_dir_all(output_root).map_err(|source| {
        SweepError::io_system(
            "IO.OUTPUT_ROOT",
            format!(
                "failed to create output root '{}': {}",
                output_root.display(),
                source
            ),
        )
    })?;

    let mut cases = Vec::with_capacity(parameter_sets.len());
    for ((index, parameters), name) in parameter_sets.into_iter().enumerate().zip(names) {
        let ordinal = index + 1;
        let report = match materializer.materialize(ordinal, &parameters) {
            Ok(case) => CaseReport {
                ordinal,
                name: case.name,
                parameters,
                status: CaseStatus::Written,
                directory: Some(case.directory),
                fields: case.fields,
                failure: None,
            },
            Err(case_error) if case_error.category().aborts_run() => return Err(case_error),
            Err(case_error) => {
                error!(case = %name, error = %case_error, "case failed; skipped");
                CaseReport {
                    ordinal,
                    name,
                    parameters,
                    status: CaseStatus::Failed,
                    directory: None,
                    fields: Vec::new(),
                    failure: Some(CaseFailure::from(&case_error)),
                }
            }
        };
        cases.push(report);
    }

    let written_case_count = cases
        .iter()
        .filter(|case| case.status == CaseStatus::Written)
        .count();
    let unmatched_field_count = cases
        .iter()
        .flat_map(|case| &case.fields)
        .filter(|field| field.match_count.is_zero())
        .count();

    Ok(SweepReport {
        output_root: output_root.clone(),
        expected_case_count,
        written_case_count,
        failed_case_count: cases.len() - written_case_count,
        unmatched_field_count,
        cases,
    })
}

fn check_unique_names(names: &[String]) -> SweepResult<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(SweepError::configuration(
                "CONFIG.DUPLICATE_CASE_NAME",
                format!(
                    "case name '{}' is produced by more than one parameter set",
                    name
                ),
            ));
        }
    }
    Ok(())
}

pub fn write_report(report_path: &Path, report: &SweepReport) -> SweepResult<()> {
    if let Some(parent_dir) = report_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|source| {
            SweepError::io_system(
                "IO.REPORT_DIRECTORY",
                format!(
                    "failed to create report directory '{}': {}",
                    parent_dir.display(),
                    source
                ),
            )
        })?;
    }

    let report_json = serde_json::to_string_pretty(report).map_err(|source| {
        SweepError::internal(
            "SYS.REPORT_SERIALIZE",
            format!("failed to serialize sweep report: {}", source),
        )
    })?;
    fs::write(report_path, report_json).map_err(|source| {
        SweepError::io_system(
            "IO.REPORT_WRITE",
            format!(
                "failed to write sweep report '{}': {}",
                report_path.display(),
                source
            ),
        )
    })
}

pub fn render_human_summary(report: &SweepReport) -> String {
    let mut lines = Vec::new();
    let status = if report.succeeded() { "OK" } else { "FAILED" };
    lines.push(format!("Sweep status: {}", status));
    lines.push(format!(
        "Cases: {} expected, {} written, {} failed",
        report.expected_case_count, report.written_case_count, report.failed_case_count
    ));
    lines.push(format!("Unmatched fields: {}", report.unmatched_field_count));
    lines.push(format!("Output root: {}", report.output_root.display()));

    for case in &report.cases {
        if let Some(failure) = &case.failure {
            lines.push(format!(
                "  {}: FAILED [{}] {}",
                case.name, failure.placeholder, failure.message
            ));
        }
        for field in case.fields.iter().filter(|field| field.match_count.is_zero()) {
            lines.push(format!(
                "  {}: no match for {} ({})",
                case.name, field.locator, field.dimension
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{CaseStatus, SweepConfig, render_human_summary, run_sweep, write_report};
    use crate::domain::{Dimension, SweepErrorCategory};
    use crate::grid::{Design, DimensionSpec};
    use crate::materialize::{CaseNaming, MaterializerConfig};
    use serde_json::Value;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const DATA: &str = "WCONPROD\n  'PROD1' 'OPEN' 'BHP' 5* 395 /\n/\nCOMPDAT\n  'PROD1' 16 43 1 7 'OPEN' 1* 1* 0.2 1* 0 /\n/\nEND\n";

    fn config(root: &Path, design: Design) -> SweepConfig {
        fs::write(root.join("EGG.DATA"), DATA).expect("template written");
        SweepConfig {
            materializer: MaterializerConfig::new(root.join("EGG.DATA"), root.join("cases")),
            design,
        }
    }

    fn factorial() -> Design {
        Design::FullFactorial {
            dimensions: vec![
                DimensionSpec::new(Dimension::Bhp, vec![350.0, 395.0]),
                DimensionSpec::new(Dimension::Skin, vec![-2.0, 0.0, 2.0]),
            ],
        }
    }

    #[test]
    fn full_factorial_sweep_writes_every_case() {
        let temp = TempDir::new().expect("tempdir should be created");
        let report = run_sweep(&config(temp.path(), factorial())).expect("sweep runs");

        assert!(report.succeeded());
        assert_eq!(report.expected_case_count, 6);
        assert_eq!(report.written_case_count, 6);
        assert_eq!(report.cases[5].name, "run_006");
        let last = fs::read_to_string(temp.path().join("cases/run_006/EGG.DATA"))
            .expect("last case written");
        assert!(last.contains("'BHP' 5* 395 /"));
        assert!(last.contains("1* 1* 0.2 1* 2 /"));
    }

    #[test]
    fn colliding_case_names_abort_before_writing() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut config = config(temp.path(), factorial());
        config.materializer.naming = CaseNaming::ParameterValue;

        let error = run_sweep(&config).expect_err("names collide");

        assert_eq!(error.category(), SweepErrorCategory::Configuration);
        assert_eq!(error.placeholder(), "CONFIG.DUPLICATE_CASE_NAME");
        assert!(!temp.path().join("cases").exists());
    }

    #[test]
    fn failed_cases_are_reported_and_the_rest_still_written() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut config = config(
            temp.path(),
            Design::FullFactorial {
                dimensions: vec![DimensionSpec::new(Dimension::OilRate, vec![100.0, 120.0])],
            },
        );
        config.materializer.strict_matches = true;

        let report = run_sweep(&config).expect("sweep runs");

        assert!(!report.succeeded());
        assert_eq!(report.failed_case_count, 2);
        assert!(report.cases.iter().all(|case| case.status == CaseStatus::Failed));
        let summary = render_human_summary(&report);
        assert!(summary.starts_with("Sweep status: FAILED"));
        assert!(summary.contains("run_001: FAILED [PATCH.NO_MATCH]"));
    }

    #[test]
    fn report_file_carries_counts_and_match_results() {
        let temp = TempDir::new().expect("tempdir should be created");
        let report = run_sweep(&config(temp.path(), factorial())).expect("sweep runs");
        let report_path = temp.path().join("reports/sweep.json");

        write_report(&report_path, &report).expect("report written");

        let parsed: Value = serde_json::from_str(
            &fs::read_to_string(&report_path).expect("report readable"),
        )
        .expect("report should parse");
        assert_eq!(parsed["expectedCaseCount"], 6);
        assert_eq!(parsed["cases"][0]["status"], "written");
        assert_eq!(parsed["cases"][0]["parameters"][0]["dimension"], "bhp");
        assert_eq!(parsed["cases"][0]["fields"][0]["matchCount"], "one");
    }
}
