use crate::domain::{Dimension, SweepError, SweepResult};
use crate::grid::Design;
use crate::materialize::{CaseNaming, MaterializerConfig, ScheduleTemplate};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A sweep as read from its JSON document, with every path already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub materializer: MaterializerConfig,
    pub design: Design,
}

impl SweepConfig {
    pub fn load(config_path: &Path) -> SweepResult<Self> {
        if !config_path.is_file() {
            return Err(SweepError::missing_resource(
                "IO.CONFIG_MISSING",
                format!("sweep config '{}' was not found", config_path.display()),
            ));
        }
        let content = fs::read_to_string(config_path).map_err(|source| {
            SweepError::io_system(
                "IO.CONFIG_READ",
                format!(
                    "failed to read sweep config '{}': {}",
                    config_path.display(),
                    source
                ),
            )
        })?;
        let base_dir = config_path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&content, base_dir)
    }

    /// Parses a config document; relative paths are taken from `base_dir`.
    pub fn from_json(content: &str, base_dir: &Path) -> SweepResult<Self> {
        let raw: RawSweepConfig = serde_json::from_str(content).map_err(|source| {
            SweepError::configuration(
                "CONFIG.PARSE",
                format!("failed to parse sweep config: {}", source),
            )
        })?;
        let config = raw.resolve(base_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SweepResult<()> {
        if self.materializer.case_prefix.trim().is_empty() {
            return Err(SweepError::configuration(
                "CONFIG.CASE_PREFIX",
                "casePrefix must not be empty",
            ));
        }

        if let Some(schedule) = &self.materializer.schedule {
            if self.materializer.include_subdir.is_none() {
                return Err(SweepError::configuration(
                    "CONFIG.SCHEDULE_INCLUDE_DIR",
                    "a schedule template requires includeSubdir",
                ));
            }
            if !self.design.dimensions().contains(&schedule.dimension) {
                return Err(SweepError::configuration(
                    "CONFIG.SCHEDULE_DIMENSION",
                    format!(
                        "schedule dimension '{}' is not part of the design",
                        schedule.dimension
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawSweepConfig {
    template_deck: PathBuf,
    output_root: PathBuf,
    #[serde(default)]
    fixed_includes: Vec<PathBuf>,
    #[serde(default)]
    include_subdir: Option<String>,
    #[serde(default = "default_case_prefix")]
    case_prefix: String,
    #[serde(default)]
    naming: CaseNaming,
    #[serde(default)]
    strict_matches: bool,
    #[serde(default = "default_well_prefix")]
    production_well_prefix: String,
    design: Design,
    #[serde(default)]
    schedule: Option<RawSchedule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchedule {
    template: PathBuf,
    dimension: Dimension,
}

fn default_case_prefix() -> String {
    "run".to_string()
}

fn default_well_prefix() -> String {
    "PROD".to_string()
}

impl RawSweepConfig {
    fn resolve(self, base_dir: &Path) -> SweepConfig {
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        SweepConfig {
            materializer: MaterializerConfig {
                template_deck: resolve(self.template_deck),
                fixed_includes: self.fixed_includes.into_iter().map(resolve).collect(),
                include_subdir: self.include_subdir,
                output_root: resolve(self.output_root),
                case_prefix: self.case_prefix,
                naming: self.naming,
                production_well_prefix: self.production_well_prefix,
                strict_matches: self.strict_matches,
                schedule: self.schedule.map(|schedule| ScheduleTemplate {
                    template_path: resolve(schedule.template),
                    dimension: schedule.dimension,
                }),
            },
            design: self.design,
        }
    }
}
