//! Rate ramps: one schedule include per value of an integer range.

use crate::deck::{Deck, FieldLocator, patch};
use crate::domain::{FieldValue, MatchCount, SweepError, SweepResult};
use crate::grid::ValueRange;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRamp {
    pub template: PathBuf,
    pub output_dir: PathBuf,
    /// Quoted token whose value is replaced, e.g. `ORAT`.
    pub token: String,
    pub range: ValueRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RampFile {
    pub value: i64,
    pub path: PathBuf,
    pub match_count: MatchCount,
}

pub fn ramp_file_name(token: &str, value: i64) -> String {
    format!("schedule_{}_{:03}.inc", token, value)
}

/// Writes `schedule_<TOKEN>_<NNN>.inc` for every value of the ramp. The range
/// and template are checked before the output directory is created.
pub fn write_ramp(ramp: &ScheduleRamp) -> SweepResult<Vec<RampFile>> {
    if ramp.token.trim().is_empty() {
        return Err(SweepError::configuration(
            "CONFIG.RAMP_TOKEN",
            "ramp token must not be empty",
        ));
    }
    let values = ramp.range.values()?;
    let template = Deck::read(&ramp.template)?;
    let locator = FieldLocator::inline_token(ramp.token.as_str());

    fs::create_dir_all(&ramp.output_dir).map_err(|source| {
        SweepError::io_system(
            "IO.RAMP_DIRECTORY",
            format!(
                "failed to create '{}': {}",
                ramp.output_dir.display(),
                source
            ),
        )
    })?;

    let mut files = Vec::with_capacity(values.len());
    for value in values {
        let outcome = patch(&template, &locator, &FieldValue::Integer(value))?;
        if outcome.match_count.is_zero() {
            warn!(token = %ramp.token, value, "ramp token not found; template written unchanged");
        }
        let path = ramp.output_dir.join(ramp_file_name(&ramp.token, value));
        outcome.deck.write(&path)?;
        files.push(RampFile {
            value,
            path,
            match_count: outcome.match_count,
        });
    }
    info!(files = files.len(), dir = %ramp.output_dir.display(), "wrote schedule ramp");
    Ok(files)
}
