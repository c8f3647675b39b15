use crate::domain::{Dimension, FieldValue};

/// Where a single perturbed value lives inside a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLocator {
    /// Value that follows a quoted token on the same record, optionally after
    /// a repeat count: `'BHP' 5* 450`. First occurrence only.
    InlineToken { token: String },
    /// Value on the line after a keyword line: `SOIL` / `400* 0.90 /`.
    /// First occurrence only.
    KeywordValue { keyword: String },
    /// Every qualifying row of a slash-terminated block has its last numeric
    /// field before the trailing `/` rewritten. Only the first block counts
    /// toward the match; later blocks of the same keyword are left alone.
    BlockRows { keyword: String, rows: RowFilter },
}

impl FieldLocator {
    pub fn inline_token(token: impl Into<String>) -> Self {
        Self::InlineToken {
            token: token.into(),
        }
    }

    pub fn keyword_value(keyword: impl Into<String>) -> Self {
        Self::KeywordValue {
            keyword: keyword.into(),
        }
    }

    pub fn block_rows(keyword: impl Into<String>, rows: RowFilter) -> Self {
        Self::BlockRows {
            keyword: keyword.into(),
            rows,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::InlineToken { token } => format!("'{}' value", token),
            Self::KeywordValue { keyword } => format!("{} record", keyword),
            Self::BlockRows { keyword, rows } => match rows {
                RowFilter::All => format!("{} block rows", keyword),
                RowFilter::Containing(marker) => {
                    format!("{} block rows containing {}", keyword, marker)
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    All,
    /// Case-insensitive substring that a row must contain, e.g. `'PROD`.
    Containing(String),
}

impl RowFilter {
    pub fn accepts(&self, line: &str) -> bool {
        match self {
            Self::All => true,
            Self::Containing(marker) => line
                .to_ascii_uppercase()
                .contains(&marker.to_ascii_uppercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPatch {
    pub locator: FieldLocator,
    pub value: FieldValue,
}

/// Patches that realize one parameter value. Oil saturation also writes its
/// water complement.
pub fn field_patches(dimension: Dimension, value: f64, well_prefix: &str) -> Vec<FieldPatch> {
    let field_value = dimension.field_value(value);
    match dimension {
        Dimension::OilSaturation => vec![
            FieldPatch {
                locator: FieldLocator::keyword_value("SOIL"),
                value: field_value,
            },
            FieldPatch {
                locator: FieldLocator::keyword_value("SWAT"),
                value: FieldValue::Saturation(1.0 - value),
            },
        ],
        Dimension::InitialPressure => vec![FieldPatch {
            locator: FieldLocator::block_rows("PRESSURE", RowFilter::All),
            value: field_value,
        }],
        Dimension::Bhp => vec![FieldPatch {
            locator: FieldLocator::inline_token("BHP"),
            value: field_value,
        }],
        Dimension::InjectionRate => vec![FieldPatch {
            locator: FieldLocator::inline_token("RATE"),
            value: field_value,
        }],
        Dimension::Skin => vec![FieldPatch {
            locator: FieldLocator::block_rows(
                "COMPDAT",
                RowFilter::Containing(format!("'{}", well_prefix)),
            ),
            value: field_value,
        }],
        Dimension::OilRate => vec![FieldPatch {
            locator: FieldLocator::inline_token("ORAT"),
            value: field_value,
        }],
    }
}
