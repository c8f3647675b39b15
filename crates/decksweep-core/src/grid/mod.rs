//! Expansion of sweep designs into ordered parameter sets.

use crate::domain::{Dimension, ParameterSet, SweepError, SweepResult, TimeStepSplit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DimensionSpec {
    pub dimension: Dimension,
    pub candidates: Vec<f64>,
    /// Index into `candidates`; required by one-factor-at-a-time designs.
    #[serde(default)]
    pub baseline: Option<usize>,
}

impl DimensionSpec {
    pub fn new(dimension: Dimension, candidates: Vec<f64>) -> Self {
        Self {
            dimension,
            candidates,
            baseline: None,
        }
    }

    pub fn with_baseline(mut self, baseline: usize) -> Self {
        self.baseline = Some(baseline);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum Design {
    FullFactorial { dimensions: Vec<DimensionSpec> },
    OneFactorAtATime { dimensions: Vec<DimensionSpec> },
    ExplicitRange { dimension: Dimension, range: ValueRange },
}

impl Design {
    pub fn dimensions(&self) -> Vec<Dimension> {
        match self {
            Self::FullFactorial { dimensions } | Self::OneFactorAtATime { dimensions } => {
                dimensions.iter().map(|spec| spec.dimension).collect()
            }
            Self::ExplicitRange { dimension, .. } => vec![*dimension],
        }
    }

    /// Case count the design must produce, computed without expanding it.
    pub fn expected_count(&self) -> SweepResult<usize> {
        match self {
            Self::FullFactorial { dimensions } => Ok(dimensions
                .iter()
                .map(|spec| spec.candidates.len())
                .product()),
            Self::OneFactorAtATime { dimensions } => Ok(1 + dimensions
                .iter()
                .map(|spec| spec.candidates.len().saturating_sub(1))
                .sum::<usize>()),
            Self::ExplicitRange { range, .. } => range.expected_count(),
        }
    }
}

/// Inclusive integer range `start..=stop` walked by a signed, non-zero step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValueRange {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl ValueRange {
    pub fn new(start: i64, stop: i64, step: i64) -> Self {
        Self { start, stop, step }
    }

    pub fn expected_count(&self) -> SweepResult<usize> {
        let span = self.validate()?;
        span.checked_div(self.step)
            .and_then(|steps| steps.checked_add(1))
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| self.span_overflow())
    }

    pub fn values(&self) -> SweepResult<Vec<i64>> {
        let expected = self.expected_count()?;
        (0..expected)
            .map(|index| {
                i64::try_from(index)
                    .ok()
                    .and_then(|index| index.checked_mul(self.step))
                    .and_then(|offset| self.start.checked_add(offset))
                    .ok_or_else(|| self.span_overflow())
            })
            .collect()
    }

    /// Returns `stop - start` once the step is known to reach `stop`.
    fn validate(&self) -> SweepResult<i64> {
        if self.step == 0 {
            return Err(SweepError::configuration(
                "CONFIG.RANGE_STEP",
                format!(
                    "range {}..={} has a zero step",
                    self.start, self.stop
                ),
            ));
        }
        let span = self
            .stop
            .checked_sub(self.start)
            .ok_or_else(|| self.span_overflow())?;
        if span != 0 && span.signum() != self.step.signum() {
            return Err(SweepError::configuration(
                "CONFIG.RANGE_DIRECTION",
                format!(
                    "range {}..={} is never reached with step {}",
                    self.start, self.stop, self.step
                ),
            ));
        }
        Ok(span)
    }

    fn span_overflow(&self) -> SweepError {
        SweepError::configuration(
            "CONFIG.RANGE_DIRECTION",
            format!(
                "range {}..={} with step {} exceeds the integer range",
                self.start, self.stop, self.step
            ),
        )
    }
}

/// Window over the first TSTEP duration; the second is `total - first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStepWindow {
    pub total: i64,
    pub first_min: i64,
    pub first_max: i64,
    pub step: i64,
}

impl TimeStepWindow {
    pub fn new(total: i64, first_min: i64, first_max: i64, step: i64) -> Self {
        Self {
            total,
            first_min,
            first_max,
            step,
        }
    }

    pub fn validate(&self) -> SweepResult<()> {
        if self.step <= 0 {
            return Err(SweepError::configuration(
                "CONFIG.TSTEP_STEP",
                format!("time-step window step must be positive, got {}", self.step),
            ));
        }
        if self.total <= 1 {
            return Err(SweepError::configuration(
                "CONFIG.TSTEP_TOTAL",
                format!("time-step total must be greater than 1, got {}", self.total),
            ));
        }
        Ok(())
    }

    /// Window bounds clamped to `1..=total-1`.
    pub fn clamped_bounds(&self) -> (i64, i64) {
        (self.first_min.max(1), self.first_max.min(self.total - 1))
    }
}

pub fn expand(design: &Design) -> SweepResult<Vec<ParameterSet>> {
    let sets = match design {
        Design::FullFactorial { dimensions } => {
            validate_dimensions(dimensions)?;
            full_factorial(dimensions)
        }
        Design::OneFactorAtATime { dimensions } => {
            validate_dimensions(dimensions)?;
            one_factor_at_a_time(dimensions)?
        }
        Design::ExplicitRange { dimension, range } => range
            .values()?
            .into_iter()
            .map(|value| ParameterSet::new([(*dimension, value as f64)]))
            .collect(),
    };

    let expected = design.expected_count()?;
    if sets.len() != expected {
        return Err(SweepError::internal(
            "SYS.GRID_COUNT",
            format!(
                "design produced {} parameter sets but {} were expected",
                sets.len(),
                expected
            ),
        ));
    }
    Ok(sets)
}

pub fn expand_time_step_splits(window: &TimeStepWindow) -> SweepResult<Vec<TimeStepSplit>> {
    window.validate()?;
    let (first_min, first_max) = window.clamped_bounds();
    if first_min > first_max {
        return Ok(Vec::new());
    }

    let splits = (first_min..=first_max)
        .step_by(window.step as usize)
        .map(|first| TimeStepSplit {
            first,
            second: window.total - first,
        })
        .filter(|split| split.first > 0 && split.second > 0)
        .collect::<Vec<_>>();

    let expected = ((first_max - first_min) / window.step) as usize + 1;
    if splits.len() != expected {
        return Err(SweepError::internal(
            "SYS.TSTEP_COUNT",
            format!(
                "time-step window produced {} splits but {} were expected",
                splits.len(),
                expected
            ),
        ));
    }
    Ok(splits)
}

fn validate_dimensions(dimensions: &[DimensionSpec]) -> SweepResult<()> {
    if dimensions.is_empty() {
        return Err(SweepError::configuration(
            "CONFIG.EMPTY_DESIGN",
            "design declares no dimensions",
        ));
    }

    let mut seen = BTreeSet::new();
    for spec in dimensions {
        if !seen.insert(spec.dimension) {
            return Err(SweepError::configuration(
                "CONFIG.DUPLICATE_DIMENSION",
                format!("dimension '{}' is declared more than once", spec.dimension),
            ));
        }
        if spec.candidates.is_empty() {
            return Err(SweepError::configuration(
                "CONFIG.EMPTY_CANDIDATES",
                format!("dimension '{}' has no candidate values", spec.dimension),
            ));
        }
        if let Some(value) = spec.candidates.iter().find(|value| !value.is_finite()) {
            return Err(SweepError::configuration(
                "CONFIG.CANDIDATE_VALUE",
                format!(
                    "dimension '{}' has non-finite candidate {}",
                    spec.dimension, value
                ),
            ));
        }
        if spec.dimension.is_integral()
            && let Some(value) = spec.candidates.iter().find(|value| value.fract() != 0.0)
        {
            return Err(SweepError::configuration(
                "CONFIG.INTEGER_DIMENSION",
                format!(
                    "dimension '{}' only accepts integers, got {}",
                    spec.dimension, value
                ),
            ));
        }
    }
    Ok(())
}

fn full_factorial(dimensions: &[DimensionSpec]) -> Vec<ParameterSet> {
    let mut rows: Vec<Vec<(Dimension, f64)>> = vec![Vec::new()];
    for spec in dimensions {
        rows = rows
            .into_iter()
            .flat_map(|prefix| {
                spec.candidates.iter().map(move |value| {
                    let mut row = prefix.clone();
                    row.push((spec.dimension, *value));
                    row
                })
            })
            .collect();
    }
    rows.into_iter().map(ParameterSet::new).collect()
}

fn one_factor_at_a_time(dimensions: &[DimensionSpec]) -> SweepResult<Vec<ParameterSet>> {
    let mut baseline = Vec::with_capacity(dimensions.len());
    for spec in dimensions {
        let index = spec.baseline.ok_or_else(|| {
            SweepError::configuration(
                "CONFIG.OFAT_BASELINE",
                format!("dimension '{}' has no baseline index", spec.dimension),
            )
        })?;
        let value = spec.candidates.get(index).ok_or_else(|| {
            SweepError::configuration(
                "CONFIG.OFAT_BASELINE",
                format!(
                    "baseline index {} for '{}' is out of range (0..{})",
                    index,
                    spec.dimension,
                    spec.candidates.len() - 1
                ),
            )
        })?;
        baseline.push((spec.dimension, *value));
    }

    let base_set = ParameterSet::new(baseline.iter().copied());
    let mut sets = vec![base_set.clone()];
    for (position, spec) in dimensions.iter().enumerate() {
        for (index, value) in spec.candidates.iter().enumerate() {
            if Some(index) == spec.baseline {
                continue;
            }

            let mut row = baseline.clone();
            row[position].1 = *value;
            let set = ParameterSet::new(row);
            if set.differing_positions(&base_set) != 1 {
                return Err(SweepError::configuration(
                    "CONFIG.OFAT_DUPLICATE_BASELINE",
                    format!(
                        "candidate {} of '{}' repeats the baseline value {}",
                        index, spec.dimension, value
                    ),
                ));
            }
            sets.push(set);
        }
    }
    Ok(sets)
}
