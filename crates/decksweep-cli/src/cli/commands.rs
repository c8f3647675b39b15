use super::CliError;
use super::helpers::{finish_sweep, parse_dimension};
use decksweep_core::domain::Dimension;
use decksweep_core::grid::{Design, TimeStepWindow, ValueRange};
use decksweep_core::iterations::summarize_print_file;
use decksweep_core::materialize::{CaseNaming, MaterializerConfig, ScheduleTemplate};
use decksweep_core::schedule::{ScheduleRamp, write_ramp};
use decksweep_core::sweep::{SweepConfig, run_sweep};
use decksweep_core::timestep::{FolderOutcome, FolderSweep, sweep_folders};
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct SweepArgs {
    /// Sweep config (JSON)
    #[arg(long)]
    config: PathBuf,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Fail a case when any locator matches nothing
    #[arg(long)]
    strict: bool,
}

#[derive(clap::Args)]
pub(super) struct ScheduleCasesArgs {
    /// Primary deck copied into every case
    #[arg(long)]
    data: PathBuf,

    /// Schedule include template receiving the swept value
    #[arg(long)]
    schedule_template: PathBuf,

    /// Directory receiving the case folders
    #[arg(long, default_value = ".")]
    out_root: PathBuf,

    /// Include file copied verbatim into every case (repeatable)
    #[arg(long = "include")]
    includes: Vec<PathBuf>,

    /// Case subdirectory holding the includes
    #[arg(long, default_value = "INCLUDE")]
    include_subdir: String,

    /// Case folder prefix
    #[arg(long, default_value = "BHP")]
    prefix: String,

    /// Swept field
    #[arg(long, default_value = "BHP", value_parser = parse_dimension)]
    dimension: Dimension,

    #[arg(long, default_value_t = 390, allow_negative_numbers = true)]
    start: i64,

    /// Inclusive
    #[arg(long, default_value_t = 399, allow_negative_numbers = true)]
    stop: i64,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    step: i64,

    /// Fail a case when any locator matches nothing
    #[arg(long)]
    strict: bool,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl ScheduleCasesArgs {
    fn into_config(self) -> SweepConfig {
        let mut materializer = MaterializerConfig::new(self.data, self.out_root);
        materializer.fixed_includes = self.includes;
        materializer.include_subdir = Some(self.include_subdir);
        materializer.case_prefix = self.prefix;
        materializer.naming = CaseNaming::ParameterValue;
        materializer.strict_matches = self.strict;
        materializer.schedule = Some(ScheduleTemplate {
            template_path: self.schedule_template,
            dimension: self.dimension,
        });

        SweepConfig {
            materializer,
            design: Design::ExplicitRange {
                dimension: self.dimension,
                range: ValueRange::new(self.start, self.stop, self.step),
            },
        }
    }
}

#[derive(clap::Args)]
pub(super) struct TstepArgs {
    /// Directory holding the `<prefix>_<NNN>` case folders
    #[arg(long)]
    base: PathBuf,

    #[arg(long, default_value = "QINJ")]
    folder_prefix: String,

    /// First folder number
    #[arg(long, default_value_t = 10)]
    start: i64,

    /// Last folder number (inclusive)
    #[arg(long, default_value_t = 120)]
    stop: i64,

    /// Sum of the first two TSTEP values
    #[arg(long, default_value_t = 3000, allow_negative_numbers = true)]
    total_days: i64,

    /// Smallest first TSTEP value
    #[arg(long, default_value_t = 1100, allow_negative_numbers = true)]
    a_min: i64,

    /// Largest first TSTEP value
    #[arg(long, default_value_t = 2700, allow_negative_numbers = true)]
    a_max: i64,

    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    a_step: i64,

    /// Subdirectory of each folder for the variants (empty: next to the base deck)
    #[arg(long, default_value = "")]
    out_subdir: String,
}

impl TstepArgs {
    fn into_sweep(self) -> FolderSweep {
        FolderSweep {
            base_dir: self.base,
            folder_prefix: self.folder_prefix,
            folders: ValueRange::new(self.start, self.stop, 1),
            window: TimeStepWindow::new(self.total_days, self.a_min, self.a_max, self.a_step),
            out_subdir: Some(self.out_subdir).filter(|subdir| !subdir.is_empty()),
        }
    }
}

#[derive(clap::Args)]
pub(super) struct RampArgs {
    /// Schedule include template
    #[arg(long)]
    template: PathBuf,

    #[arg(long)]
    out_dir: PathBuf,

    /// Quoted token whose value is replaced
    #[arg(long, default_value = "ORAT")]
    token: String,

    #[arg(long, default_value_t = 180, allow_negative_numbers = true)]
    start: i64,

    /// Inclusive
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    stop: i64,

    #[arg(long, default_value_t = -5, allow_negative_numbers = true)]
    step: i64,
}

#[derive(clap::Args)]
pub(super) struct IterationsArgs {
    /// Simulator print file (.PRT)
    #[arg(long)]
    prt: PathBuf,

    /// Print the totals as JSON
    #[arg(long)]
    json: bool,
}

pub(super) fn run_sweep_command(args: SweepArgs) -> Result<i32, CliError> {
    let mut config = SweepConfig::load(&args.config)?;
    info!(config = %args.config.display(), cases = config.design.expected_count()?, "loaded sweep config");
    if args.strict {
        config.materializer.strict_matches = true;
    }
    let report = run_sweep(&config)?;
    finish_sweep(&report, args.report.as_deref())
}

pub(super) fn run_schedule_cases_command(args: ScheduleCasesArgs) -> Result<i32, CliError> {
    let report_path = args.report.clone();
    let config = args.into_config();
    let report = run_sweep(&config)?;
    finish_sweep(&report, report_path.as_deref())
}

pub(super) fn run_tstep_command(args: TstepArgs) -> Result<i32, CliError> {
    let sweep = args.into_sweep();
    let outcomes = sweep_folders(&sweep)?;

    for outcome in &outcomes {
        match outcome {
            FolderOutcome::Written { folder, files } => {
                println!("[OK] {}: {} files", folder.display(), files.len());
            }
            FolderOutcome::MissingFolder { folder } => {
                println!("[SKIP] {}: folder not found", folder.display());
            }
            FolderOutcome::MissingDeck { folder } => {
                println!("[SKIP] {}: no base .DATA file", folder.display());
            }
        }
    }
    let written = outcomes.iter().map(FolderOutcome::written_files).sum::<usize>();
    println!("Variants written: {}", written);
    Ok(0)
}

pub(super) fn run_ramp_command(args: RampArgs) -> Result<i32, CliError> {
    let ramp = ScheduleRamp {
        template: args.template,
        output_dir: args.out_dir,
        token: args.token,
        range: ValueRange::new(args.start, args.stop, args.step),
    };
    let files = write_ramp(&ramp)?;
    let unmatched = files
        .iter()
        .filter(|file| file.match_count.is_zero())
        .count();

    println!(
        "Schedule files written: {} ({})",
        files.len(),
        ramp.output_dir.display()
    );
    if unmatched > 0 {
        println!("Token '{}' not found in {} files", ramp.token, unmatched);
        return Ok(1);
    }
    Ok(0)
}

pub(super) fn run_iterations_command(args: IterationsArgs) -> Result<i32, CliError> {
    let summary = summarize_print_file(&args.prt)?;
    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|source| anyhow::anyhow!("failed to serialize iteration totals: {}", source))?;
        println!("{}", json);
    } else {
        println!("{}", summary.render_human());
    }
    Ok(0)
}
