//! Turns one parameter set into a self-contained case directory.
//!
//! A case is assembled in a hidden staging directory next to its final
//! location and renamed into place only after every file has been written. A
//! failed case leaves no case directory behind.

use crate::deck::{Deck, IncludeRewrite, field_patches, patch, rewrite_include_references};
use crate::domain::{Dimension, MatchCount, ParameterSet, SweepError, SweepResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseNaming {
    /// `<prefix>_<NNN>` from the 1-based case ordinal.
    #[default]
    Ordinal,
    /// `<prefix>_<NNN>_<digest>`; the digest covers the rendered parameters.
    OrdinalDigest,
    /// `<prefix>_<value>` from the first parameter, e.g. `BHP_390`.
    ParameterValue,
}

impl CaseNaming {
    pub fn case_name(self, prefix: &str, ordinal: usize, parameters: &ParameterSet) -> String {
        match self {
            Self::Ordinal => format!("{}_{:03}", prefix, ordinal),
            Self::OrdinalDigest => format!(
                "{}_{:03}_{:08x}",
                prefix,
                ordinal,
                parameters.digest() & 0xffff_ffff
            ),
            Self::ParameterValue => match parameters.values().first() {
                Some(entry) => format!("{}_{}", prefix, value_label(entry.dimension, entry.value)),
                None => format!("{}_{:03}", prefix, ordinal),
            },
        }
    }
}

/// `390` -> `390`, `7` -> `007`, `0.25` -> `0p25`.
fn value_label(dimension: Dimension, value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:03}", value as i64)
    } else {
        dimension.field_value(value).render().replace('.', "p")
    }
}

/// Generated schedule file named after the schedule parameter, independent of
/// the case naming, e.g. `schedule_BHP_390.inc`.
pub fn schedule_file_name(prefix: &str, dimension: Dimension, value: f64) -> String {
    format!("schedule_{}_{}.inc", prefix, value_label(dimension, value))
}

/// Second template rewritten per case, e.g. a schedule include holding the
/// well pressure limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTemplate {
    pub template_path: PathBuf,
    pub dimension: Dimension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializerConfig {
    pub template_deck: PathBuf,
    pub fixed_includes: Vec<PathBuf>,
    /// Subdirectory of each case that receives the includes, e.g. `INCLUDE`.
    pub include_subdir: Option<String>,
    pub output_root: PathBuf,
    pub case_prefix: String,
    pub naming: CaseNaming,
    pub production_well_prefix: String,
    /// Treat a locator that matches nothing as a case failure.
    pub strict_matches: bool,
    pub schedule: Option<ScheduleTemplate>,
}

impl MaterializerConfig {
    pub fn new(template_deck: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            template_deck: template_deck.into(),
            fixed_includes: Vec::new(),
            include_subdir: None,
            output_root: output_root.into(),
            case_prefix: "run".to_string(),
            naming: CaseNaming::Ordinal,
            production_well_prefix: "PROD".to_string(),
            strict_matches: false,
            schedule: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchTarget {
    Deck,
    Schedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMatch {
    pub dimension: Dimension,
    pub target: PatchTarget,
    pub locator: String,
    pub match_count: MatchCount,
    pub replaced_fields: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedCase {
    pub name: String,
    pub directory: PathBuf,
    pub deck_path: PathBuf,
    pub schedule_path: Option<PathBuf>,
    pub fields: Vec<FieldMatch>,
}

impl MaterializedCase {
    pub fn unmatched_fields(&self) -> impl Iterator<Item = &FieldMatch> {
        self.fields.iter().filter(|field| field.match_count.is_zero())
    }
}

#[derive(Debug, Clone)]
struct LoadedSchedule {
    file_name: String,
    template: Deck,
    dimension: Dimension,
}

/// Holds the template texts in memory and writes one case per call.
#[derive(Debug, Clone)]
pub struct CaseMaterializer {
    config: MaterializerConfig,
    deck_file_name: String,
    template: Deck,
    schedule: Option<LoadedSchedule>,
}

impl CaseMaterializer {
    pub fn new(config: MaterializerConfig) -> SweepResult<Self> {
        let deck_file_name = file_name_of(&config.template_deck, "template deck")?;
        if config.schedule.is_some() && config.include_subdir.is_none() {
            return Err(SweepError::configuration(
                "CONFIG.SCHEDULE_INCLUDE_DIR",
                "a schedule template requires an include subdirectory",
            ));
        }

        let template = Deck::read(&config.template_deck)?;
        let schedule = match &config.schedule {
            Some(schedule) => Some(LoadedSchedule {
                file_name: file_name_of(&schedule.template_path, "schedule template")?,
                template: Deck::read(&schedule.template_path)?,
                dimension: schedule.dimension,
            }),
            None => None,
        };

        Ok(Self {
            config,
            deck_file_name,
            template,
            schedule,
        })
    }

    pub fn config(&self) -> &MaterializerConfig {
        &self.config
    }

    pub fn case_name(&self, ordinal: usize, parameters: &ParameterSet) -> String {
        self.config
            .naming
            .case_name(&self.config.case_prefix, ordinal, parameters)
    }

    pub fn materialize(
        &self,
        ordinal: usize,
        parameters: &ParameterSet,
    ) -> SweepResult<MaterializedCase> {
        let name = self.case_name(ordinal, parameters);
        let mut fields = Vec::new();

        let schedule_dimension = self.schedule.as_ref().map(|schedule| schedule.dimension);
        let mut deck_parameters = parameters
            .values()
            .iter()
            .filter(|entry| Some(entry.dimension) != schedule_dimension)
            .collect::<Vec<_>>();
        deck_parameters.sort_by_key(|entry| entry.dimension);

        let mut deck = self.template.clone();
        for entry in deck_parameters {
            deck = self.apply_patches(
                &name,
                deck,
                entry.dimension,
                entry.value,
                PatchTarget::Deck,
                &mut fields,
            )?;
        }

        let generated_schedule = match &self.schedule {
            Some(schedule) => {
                let value = parameters.get(schedule.dimension).ok_or_else(|| {
                    SweepError::configuration(
                        "CONFIG.SCHEDULE_DIMENSION",
                        format!(
                            "case '{}' has no value for schedule dimension '{}'",
                            name, schedule.dimension
                        ),
                    )
                })?;
                let patched = self.apply_patches(
                    &name,
                    schedule.template.clone(),
                    schedule.dimension,
                    value,
                    PatchTarget::Schedule,
                    &mut fields,
                )?;
                let file_name =
                    schedule_file_name(&self.config.case_prefix, schedule.dimension, value);
                Some((file_name, patched))
            }
            None => None,
        };

        if let Some(include_dir) = self.config.include_subdir.as_deref() {
            deck = rewrite_include_references(
                &deck,
                &IncludeRewrite {
                    include_dir,
                    template_name: self
                        .schedule
                        .as_ref()
                        .map(|schedule| schedule.file_name.as_str()),
                    generated_name: generated_schedule
                        .as_ref()
                        .map(|(file_name, _)| file_name.as_str()),
                },
            );
        }

        for include in &self.config.fixed_includes {
            if !include.is_file() {
                return Err(SweepError::missing_resource(
                    "IO.FIXED_INCLUDE",
                    format!(
                        "fixed include '{}' for case '{}' was not found",
                        include.display(),
                        name
                    ),
                ));
            }
        }

        let directory = self.config.output_root.join(&name);
        let staging = self.config.output_root.join(format!(".{}.staging", name));
        let written = self.write_staged(&staging, &deck, generated_schedule.as_ref());
        if let Err(error) = written {
            let _ = fs::remove_dir_all(&staging);
            return Err(error);
        }
        publish(&staging, &directory)?;

        let include_dir = self.include_dir(&directory);
        let case = MaterializedCase {
            deck_path: directory.join(&self.deck_file_name),
            schedule_path: generated_schedule
                .as_ref()
                .map(|(file_name, _)| include_dir.join(file_name)),
            directory,
            name,
            fields,
        };
        info!(case = %case.name, parameters = %parameters.label(), "materialized case");
        Ok(case)
    }

    fn apply_patches(
        &self,
        case_name: &str,
        mut deck: Deck,
        dimension: Dimension,
        value: f64,
        target: PatchTarget,
        fields: &mut Vec<FieldMatch>,
    ) -> SweepResult<Deck> {
        for field in field_patches(dimension, value, &self.config.production_well_prefix) {
            let outcome = patch(&deck, &field.locator, &field.value)?;
            let locator = field.locator.describe();
            if outcome.match_count.is_zero() {
                warn!(case = %case_name, field = %locator, "locator matched nothing; value left unchanged");
                if self.config.strict_matches {
                    return Err(SweepError::patch_no_match(
                        "PATCH.NO_MATCH",
                        format!(
                            "case '{}': {} not found while setting {}",
                            case_name, locator, dimension
                        ),
                    ));
                }
            }
            fields.push(FieldMatch {
                dimension,
                target,
                locator,
                match_count: outcome.match_count,
                replaced_fields: outcome.replaced_fields,
            });
            deck = outcome.deck;
        }
        Ok(deck)
    }

    fn include_dir(&self, case_dir: &Path) -> PathBuf {
        match self.config.include_subdir.as_deref() {
            Some(subdir) => case_dir.join(subdir),
            None => case_dir.to_path_buf(),
        }
    }

    fn write_staged(
        &self,
        staging: &Path,
        deck: &Deck,
        schedule: Option<&(String, Deck)>,
    ) -> SweepResult<()> {
        if staging.exists() {
            remove_dir(staging)?;
        }
        let include_dir = self.include_dir(staging);
        fs::create_dir_all(&include_dir).map_err(|source| {
            SweepError::io_system(
                "IO.CASE_DIRECTORY",
                format!(
                    "failed to create case directory '{}': {}",
                    include_dir.display(),
                    source
                ),
            )
        })?;

        for include in &self.config.fixed_includes {
            let file_name = file_name_of(include, "fixed include")?;
            let destination = include_dir.join(file_name);
            fs::copy(include, &destination).map_err(|source| {
                SweepError::io_system(
                    "IO.FIXED_INCLUDE_COPY",
                    format!(
                        "failed to copy '{}' to '{}': {}",
                        include.display(),
                        destination.display(),
                        source
                    ),
                )
            })?;
        }

        deck.write(&staging.join(&self.deck_file_name))?;
        if let Some((file_name, schedule)) = schedule {
            schedule.write(&include_dir.join(file_name))?;
        }
        Ok(())
    }
}

fn publish(staging: &Path, directory: &Path) -> SweepResult<()> {
    if directory.exists() {
        remove_dir(directory)?;
    }
    fs::rename(staging, directory).map_err(|source| {
        SweepError::io_system(
            "IO.CASE_PUBLISH",
            format!(
                "failed to move '{}' to '{}': {}",
                staging.display(),
                directory.display(),
                source
            ),
        )
    })
}

fn remove_dir(path: &Path) -> SweepResult<()> {
    fs::remove_dir_all(path).map_err(|source| {
        SweepError::io_system(
            "IO.CASE_DIRECTORY",
            format!("failed to remove '{}': {}", path.display(), source),
        )
    })
}

fn file_name_of(path: &Path, role: &str) -> SweepResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            SweepError::configuration(
                "CONFIG.FILE_NAME",
                format!("{} path '{}' has no file name", role, path.display()),
            )
        })
}
