//! Time-step split variants of an existing case deck.
//!
//! Only the first two integers of the first `TSTEP` record are rewritten; the
//! third integer, the separators and the rest of the deck are kept verbatim.

use crate::deck::read_text;
use crate::domain::{SweepError, SweepResult, TimeStepSplit};
use crate::grid::{TimeStepWindow, ValueRange, expand_time_step_splits};
use globset::{GlobBuilder, GlobMatcher};
use regex::{Captures, Regex};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};

/// File-name marker carried by every generated variant.
pub const GENERATED_MARKER: &str = "_TSTEP_";

static TSTEP_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(TSTEP\s*\n\s*)(\d+)(\s+)(\d+)(\s+\d+\s*/)")
        .expect("TSTEP record pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeStepVariant {
    pub split: TimeStepSplit,
    pub text: String,
}

/// Produces one deck text per split of `window`. Window errors are reported
/// before the record lookup; a deck without a three-integer `TSTEP` record is
/// a missing resource.
pub fn split_deck(text: &str, window: &TimeStepWindow) -> SweepResult<Vec<TimeStepVariant>> {
    window.validate()?;
    let record = TSTEP_RECORD.captures(text).ok_or_else(|| {
        SweepError::missing_resource(
            "DECK.TSTEP_RECORD",
            "no TSTEP record with three integers terminated by '/' was found",
        )
    })?;

    let splits = expand_time_step_splits(window)?;
    Ok(splits
        .into_iter()
        .map(|split| TimeStepVariant {
            split,
            text: replace_record(text, &record, split),
        })
        .collect())
}

fn replace_record(text: &str, record: &Captures<'_>, split: TimeStepSplit) -> String {
    let whole = record.get(0).map_or(0..0, |found| found.range());
    let mut replaced = String::with_capacity(text.len() + 8);
    replaced.push_str(&text[..whole.start]);
    replaced.push_str(&record[1]);
    replaced.push_str(&split.first.to_string());
    replaced.push_str(&record[3]);
    replaced.push_str(&split.second.to_string());
    replaced.push_str(&record[5]);
    replaced.push_str(&text[whole.end..]);
    replaced
}

pub fn variant_file_name(stem: &str, extension: &str, split: TimeStepSplit) -> String {
    format!(
        "{}{}{:03}_{:03}{}",
        stem, GENERATED_MARKER, split.first, split.second, extension
    )
}

fn data_matcher() -> SweepResult<GlobMatcher> {
    GlobBuilder::new("*.DATA")
        .case_insensitive(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| {
            SweepError::internal("SYS.DECK_GLOB", format!("invalid deck pattern: {}", source))
        })
}

/// Picks the first `*.DATA` file in name order that is not a generated
/// variant. Returns `None` when the folder holds no such file.
pub fn find_base_deck(folder: &Path) -> SweepResult<Option<PathBuf>> {
    let matcher = data_matcher()?;
    let entries = fs::read_dir(folder).map_err(|source| {
        SweepError::io_system(
            "IO.FOLDER_READ",
            format!("failed to list '{}': {}", folder.display(), source),
        )
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            SweepError::io_system(
                "IO.FOLDER_READ",
                format!("failed to list '{}': {}", folder.display(), source),
            )
        })?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if path.is_file() && matcher.is_match(name) && !name.contains(GENERATED_MARKER) {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Writes every variant of `base_deck` into `out_subdir` of its folder, or
/// next to it when no subdirectory is given. Nothing is written when the
/// window or the deck is rejected.
pub fn write_variants(
    base_deck: &Path,
    window: &TimeStepWindow,
    out_subdir: Option<&str>,
) -> SweepResult<Vec<PathBuf>> {
    let base = read_text(base_deck, "base deck")?;
    let variants = split_deck(&base.text, window)?;

    let folder = base_deck.parent().unwrap_or_else(|| Path::new("."));
    let out_dir = match out_subdir.filter(|subdir| !subdir.is_empty()) {
        Some(subdir) => folder.join(subdir),
        None => folder.to_path_buf(),
    };
    fs::create_dir_all(&out_dir).map_err(|source| {
        SweepError::io_system(
            "IO.VARIANT_DIRECTORY",
            format!("failed to create '{}': {}", out_dir.display(), source),
        )
    })?;

    let stem = base_deck
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let extension = base_deck
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| format!(".{}", extension))
        .unwrap_or_default();

    let mut written = Vec::with_capacity(variants.len());
    for variant in variants {
        let path = out_dir.join(variant_file_name(stem, &extension, variant.split));
        fs::write(&path, base.encoding.encode(&variant.text)).map_err(|source| {
            SweepError::io_system(
                "IO.VARIANT_WRITE",
                format!("failed to write '{}': {}", path.display(), source),
            )
        })?;
        written.push(path);
    }
    Ok(written)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSweep {
    pub base_dir: PathBuf,
    pub folder_prefix: String,
    pub folders: ValueRange,
    pub window: TimeStepWindow,
    pub out_subdir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FolderOutcome {
    Written { folder: PathBuf, files: Vec<PathBuf> },
    MissingFolder { folder: PathBuf },
    MissingDeck { folder: PathBuf },
}

impl FolderOutcome {
    pub fn folder(&self) -> &Path {
        match self {
            Self::Written { folder, .. }
            | Self::MissingFolder { folder }
            | Self::MissingDeck { folder } => folder,
        }
    }

    pub fn written_files(&self) -> usize {
        match self {
            Self::Written { files, .. } => files.len(),
            Self::MissingFolder { .. } | Self::MissingDeck { .. } => 0,
        }
    }
}

/// Runs [`write_variants`] over `<prefix>_<NNN>` folders. Absent folders and
/// folders without a base deck are skipped; a deck without a `TSTEP` record
/// stops the sweep.
pub fn sweep_folders(sweep: &FolderSweep) -> SweepResult<Vec<FolderOutcome>> {
    sweep.window.validate()?;
    let numbers = sweep.folders.values()?;
    if !sweep.base_dir.is_dir() {
        return Err(SweepError::missing_resource(
            "IO.BASE_DIRECTORY",
            format!("base directory '{}' was not found", sweep.base_dir.display()),
        ));
    }

    let mut outcomes = Vec::with_capacity(numbers.len());
    for number in numbers {
        let folder = sweep
            .base_dir
            .join(format!("{}_{:03}", sweep.folder_prefix, number));
        if !folder.is_dir() {
            warn!(folder = %folder.display(), "case folder is missing; skipped");
            outcomes.push(FolderOutcome::MissingFolder { folder });
            continue;
        }
        let Some(base_deck) = find_base_deck(&folder)? else {
            warn!(folder = %folder.display(), "no base deck found; skipped");
            outcomes.push(FolderOutcome::MissingDeck { folder });
            continue;
        };

        let files = write_variants(&base_deck, &sweep.window, sweep.out_subdir.as_deref())?;
        info!(folder = %folder.display(), written = files.len(), "wrote time-step variants");
        outcomes.push(FolderOutcome::Written { folder, files });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::{find_base_deck, split_deck, variant_file_name, write_variants};
    use crate::domain::{SweepErrorCategory, TimeStepSplit};
    use crate::grid::TimeStepWindow;
    use std::fs;
    use tempfile::TempDir;

    const DECK: &str = "SCHEDULE\nTSTEP\n  1500   1500 10 /\nTSTEP\n  100 200 3 /\nEND\n";

    #[test]
    fn only_the_first_two_integers_of_the_first_record_change() {
        let variants =
            split_deck(DECK, &TimeStepWindow::new(3000, 1100, 1140, 20)).expect("deck splits");

        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].split, TimeStepSplit { first: 1100, second: 1900 });
        assert_eq!(
            variants[0].text,
            "SCHEDULE\nTSTEP\n  1100   1900 10 /\nTSTEP\n  100 200 3 /\nEND\n"
        );
        assert_eq!(variants[2].split.first, 1140);
    }

    #[test]
    fn window_errors_precede_record_lookup() {
        let error = split_deck("END\n", &TimeStepWindow::new(1, 1, 1, 1))
            .expect_err("total of one is rejected");
        assert_eq!(error.category(), SweepErrorCategory::Configuration);

        let error = split_deck("END\n", &TimeStepWindow::new(3000, 1100, 2700, 20))
            .expect_err("missing record is fatal");
        assert_eq!(error.category(), SweepErrorCategory::MissingResource);
        assert_eq!(error.placeholder(), "DECK.TSTEP_RECORD");
    }

    #[test]
    fn record_with_two_integers_is_not_accepted() {
        let error = split_deck("TSTEP\n 1500 1500 /\n", &TimeStepWindow::new(3000, 1, 10, 1))
            .expect_err("two-integer record is rejected");
        assert_eq!(error.placeholder(), "DECK.TSTEP_RECORD");
    }

    #[test]
    fn variant_names_encode_both_parts() {
        assert_eq!(
            variant_file_name("EGG", ".DATA", TimeStepSplit { first: 40, second: 2960 }),
            "EGG_TSTEP_040_2960.DATA"
        );
    }

    #[test]
    fn base_deck_skips_generated_variants() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::write(temp.path().join("A_TSTEP_100_200.DATA"), DECK).expect("variant written");
        fs::write(temp.path().join("B.DATA"), DECK).expect("base written");
        fs::write(temp.path().join("notes.txt"), "x").expect("notes written");

        let found = find_base_deck(temp.path()).expect("folder lists");
        assert_eq!(found, Some(temp.path().join("B.DATA")));

        fs::remove_file(temp.path().join("B.DATA")).expect("base removed");
        assert_eq!(find_base_deck(temp.path()).expect("folder lists"), None);
    }

    #[test]
    fn variants_land_in_the_requested_subdirectory() {
        let temp = TempDir::new().expect("tempdir should be created");
        let base = temp.path().join("EGG.DATA");
        fs::write(&base, DECK).expect("base written");

        let written = write_variants(&base, &TimeStepWindow::new(3000, 2680, 2700, 20), Some("tstep"))
            .expect("variants written");

        assert_eq!(
            written,
            vec![
                temp.path().join("tstep/EGG_TSTEP_2680_320.DATA"),
                temp.path().join("tstep/EGG_TSTEP_2700_300.DATA"),
            ]
        );
        assert!(
            fs::read_to_string(&written[1])
                .expect("variant readable")
                .contains("  2700   300 10 /")
        );
    }

    #[test]
    fn missing_record_writes_nothing() {
        let temp = TempDir::new().expect("tempdir should be created");
        let base = temp.path().join("EGG.DATA");
        fs::write(&base, "SCHEDULE\nEND\n").expect("base written");

        write_variants(&base, &TimeStepWindow::new(3000, 1100, 2700, 20), Some("out"))
            .expect_err("no TSTEP record");

        assert!(!temp.path().join("out").exists());
        assert_eq!(fs::read_dir(temp.path()).expect("dir lists").count(), 1);
    }

    #[test]
    fn variants_keep_non_utf8_comment_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let base = temp.path().join("EGG.DATA");
        let mut bytes = b"-- \xcf\xf0\xee\xe1\xe0\n".to_vec();
        bytes.extend_from_slice(DECK.as_bytes());
        fs::write(&base, &bytes).expect("base written");

        let written = write_variants(&base, &TimeStepWindow::new(3000, 2680, 2680, 20), None)
            .expect("variants written");

        let variant = fs::read(&written[0]).expect("variant readable");
        assert!(variant.starts_with(b"-- \xcf\xf0\xee\xe1\xe0\n"));
        assert!(variant.windows(11).any(|window| window == b"  2680   32"));
    }
}
