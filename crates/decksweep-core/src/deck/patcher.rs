use super::locator::{FieldLocator, RowFilter};
use super::scanner::{BlockScanner, LineState};
use super::{Deck, split_terminator};
use crate::domain::{FieldValue, MatchCount, SweepError, SweepResult};
use regex::Regex;
use tracing::debug;

const NUMBER_PATTERN: &str = r"-?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub deck: Deck,
    pub match_count: MatchCount,
    /// Number of individual values rewritten (rows for block locators).
    pub replaced_fields: usize,
}

/// Rewrites the field named by `locator`. A locator that matches nothing
/// returns the deck unchanged with [`MatchCount::Zero`].
pub fn patch(deck: &Deck, locator: &FieldLocator, value: &FieldValue) -> SweepResult<PatchOutcome> {
    let rendered = value.render();
    let outcome = match locator {
        FieldLocator::InlineToken { token } => {
            splice_first_match(deck, &inline_token_regex(token)?, &rendered)
        }
        FieldLocator::KeywordValue { keyword } => {
            splice_first_match(deck, &keyword_value_regex(keyword)?, &rendered)
        }
        FieldLocator::BlockRows { keyword, rows } => {
            patch_block_rows(deck, keyword, rows, &rendered)
        }
    };

    debug!(
        locator = %locator.describe(),
        value = %rendered,
        replaced = outcome.replaced_fields,
        "applied field patch"
    );
    Ok(outcome)
}

pub fn patch_text(
    text: &str,
    locator: &FieldLocator,
    value: &FieldValue,
) -> SweepResult<(String, MatchCount)> {
    let outcome = patch(&Deck::from_text(text), locator, value)?;
    Ok((outcome.deck.to_text(), outcome.match_count))
}

/// Replaces the last numeric field of `line` that precedes its final `/`
/// (or the end of the line when there is none). A `<n>*<value>` token keeps
/// its repeat count. Returns `None` when that field is not numeric.
pub fn replace_last_numeric_before_slash(line: &str, value: &str) -> Option<String> {
    let (body, terminator) = split_terminator(line);
    let (head, tail) = match body.rfind('/') {
        Some(index) => body.split_at(index),
        None => (body, ""),
    };

    let token_end = head.trim_end().len();
    let token_start = head[..token_end]
        .rfind(|ch: char| ch.is_ascii_whitespace())
        .map_or(0, |index| index + 1);
    let token = &head[token_start..token_end];

    let value_start = match token.find('*') {
        Some(star) if is_repeat_count(&token[..star]) => token_start + star + 1,
        Some(_) => return None,
        None => token_start,
    };
    if !is_numeric_field(&head[value_start..token_end]) {
        return None;
    }

    Some(format!(
        "{}{}{}{}{}",
        &head[..value_start],
        value,
        &head[token_end..],
        tail,
        terminator
    ))
}

fn inline_token_regex(token: &str) -> SweepResult<Regex> {
    compile(&format!(
        r"(?i)'{}'\s+(?:\d+\*\s*)?(?P<value>{})(?:[\s/]|$)",
        regex::escape(token),
        NUMBER_PATTERN
    ))
}

fn keyword_value_regex(keyword: &str) -> SweepResult<Regex> {
    compile(&format!(
        r"(?im)^[ \t]*{}[ \t]*\r?\n\s*(?:\d+\*[ \t]*)?(?P<value>\d+(?:\.\d*)?|\.\d+)[ \t]*/",
        regex::escape(keyword)
    ))
}

fn compile(pattern: &str) -> SweepResult<Regex> {
    Regex::new(pattern).map_err(|source| {
        SweepError::internal(
            "SYS.LOCATOR_PATTERN",
            format!("failed to compile locator pattern '{}': {}", pattern, source),
        )
    })
}

fn splice_first_match(deck: &Deck, pattern: &Regex, rendered: &str) -> PatchOutcome {
    let text = deck.to_text();
    let Some(value) = pattern
        .captures(&text)
        .and_then(|captures| captures.name("value"))
    else {
        return PatchOutcome {
            deck: deck.clone(),
            match_count: MatchCount::Zero,
            replaced_fields: 0,
        };
    };

    let mut patched = String::with_capacity(text.len() + rendered.len());
    patched.push_str(&text[..value.start()]);
    patched.push_str(rendered);
    patched.push_str(&text[value.end()..]);
    PatchOutcome {
        deck: deck.with_text(&patched),
        match_count: MatchCount::One,
        replaced_fields: 1,
    }
}

fn patch_block_rows(deck: &Deck, keyword: &str, rows: &RowFilter, rendered: &str) -> PatchOutcome {
    let mut lines = Vec::with_capacity(deck.line_count());
    let mut replaced_fields = 0;
    let mut first_block_closed = false;

    for (line, state) in BlockScanner::new(deck, keyword) {
        let eligible = !first_block_closed
            && state == LineState::Inside
            && !line.trim_start().starts_with("--")
            && rows.accepts(line);

        match eligible
            .then(|| replace_last_numeric_before_slash(line, rendered))
            .flatten()
        {
            Some(patched) => {
                replaced_fields += 1;
                lines.push(patched);
            }
            None => lines.push(line.to_owned()),
        }

        if state == LineState::Closing {
            first_block_closed = true;
        }
    }

    PatchOutcome {
        deck: deck.with_lines(lines),
        match_count: MatchCount::from_found(replaced_fields > 0),
        replaced_fields,
    }
}

fn is_repeat_count(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit())
}

fn is_numeric_field(token: &str) -> bool {
    let starts_like_number = token
        .bytes()
        .next()
        .is_some_and(|byte| byte.is_ascii_digit() || matches!(byte, b'-' | b'+' | b'.'));
    starts_like_number && token.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::{patch, patch_text, replace_last_numeric_before_slash};
    use crate::deck::{Deck, FieldLocator, RowFilter};
    use crate::domain::{FieldValue, MatchCount};

    const SCHEDULE: &str = "WCONPROD\n  'PROD1' 'OPEN' 'BHP' 5* 395 /\n  'PROD2' 'OPEN' 'BHP' 5* 395 /\n/\nWCONINJE\n  'INJECT1' 'WATER' 'OPEN' 'RATE' 79.5 1* 420 /\n/\n";

    fn differing_line_indices(left: &str, right: &str) -> Vec<usize> {
        let left: Vec<&str> = left.split_inclusive('\n').collect();
        let right: Vec<&str> = right.split_inclusive('\n').collect();
        assert_eq!(left.len(), right.len(), "line count must be preserved");
        left.iter()
            .zip(&right)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(index, _)| index)
            .collect()
    }

    #[test]
    fn inline_token_replaces_first_value_after_repeat_count() {
        let (patched, matches) = patch_text(
            SCHEDULE,
            &FieldLocator::inline_token("BHP"),
            &FieldValue::Integer(350),
        )
        .expect("patch should run");

        assert_eq!(matches, MatchCount::One);
        assert!(patched.contains("'PROD1' 'OPEN' 'BHP' 5* 350 /"));
        assert!(patched.contains("'PROD2' 'OPEN' 'BHP' 5* 395 /"));
        assert_eq!(differing_line_indices(SCHEDULE, &patched), vec![1]);
    }

    #[test]
    fn inline_token_is_case_insensitive_and_accepts_missing_repeat_count() {
        let source = "  'P1' 'open' 'bhp' 450 /\n";
        let (patched, matches) = patch_text(
            source,
            &FieldLocator::inline_token("BHP"),
            &FieldValue::Integer(120),
        )
        .expect("patch should run");

        assert_eq!(matches, MatchCount::One);
        assert_eq!(patched, "  'P1' 'open' 'bhp' 120 /\n");
    }

    #[test]
    fn inline_token_does_not_mistake_a_defaulted_repeat_count_for_a_value() {
        let source = "  'P1' 'OPEN' 'BHP' 1* /\n";
        let (patched, matches) = patch_text(
            source,
            &FieldLocator::inline_token("BHP"),
            &FieldValue::Integer(120),
        )
        .expect("patch should run");

        assert_eq!(matches, MatchCount::Zero);
        assert_eq!(patched, source);
    }

    #[test]
    fn injection_rate_keeps_source_style_decimal() {
        let (patched, _) = patch_text(
            SCHEDULE,
            &FieldLocator::inline_token("RATE"),
            &FieldValue::Decimal(120.0),
        )
        .expect("patch should run");

        assert!(patched.contains("'RATE' 120 1* 420 /"));
        assert_eq!(differing_line_indices(SCHEDULE, &patched), vec![5]);
    }

    #[test]
    fn keyword_value_preserves_repeat_count_spacing_and_slash() {
        let source = "SOLUTION\nSOIL\n  18553*   0.90  /\nSWAT\n  18553*0.10 /\n";
        let (patched, matches) = patch_text(
            source,
            &FieldLocator::keyword_value("SOIL"),
            &FieldValue::Saturation(0.84),
        )
        .expect("patch should run");
        let (patched, _) = patch_text(
            &patched,
            &FieldLocator::keyword_value("SWAT"),
            &FieldValue::Saturation(1.0 - 0.84),
        )
        .expect("patch should run");

        assert_eq!(matches, MatchCount::One);
        assert_eq!(
            patched,
            "SOLUTION\nSOIL\n  18553*   0.84  /\nSWAT\n  18553*0.16 /\n"
        );
    }

    #[test]
    fn keyword_value_does_not_match_longer_keywords() {
        let source = "SWATINIT\n  100*0.2 /\n";
        let (patched, matches) = patch_text(
            source,
            &FieldLocator::keyword_value("SWAT"),
            &FieldValue::Saturation(0.5),
        )
        .expect("patch should run");

        assert_eq!(matches, MatchCount::Zero);
        assert_eq!(patched, source);
    }

    #[test]
    fn pressure_block_rewrites_every_row_and_leaves_other_blocks() {
        let source = "PRESSURE\n  9000*400 /\n  -- comment 12\n  9553* 400\n/\nPORO\n  18553*0.2 /\n";
        let outcome = patch(
            &Deck::from_text(source),
            &FieldLocator::block_rows("PRESSURE", RowFilter::All),
            &FieldValue::Decimal(350.0),
        )
        .expect("patch should run");

        assert_eq!(outcome.match_count, MatchCount::One);
        assert_eq!(outcome.replaced_fields, 2);
        assert_eq!(
            outcome.deck.to_text(),
            "PRESSURE\n  9000*350 /\n  -- comment 12\n  9553* 350\n/\nPORO\n  18553*0.2 /\n"
        );
    }

    #[test]
    fn compdat_skin_patch_is_scoped_to_production_wells() {
        let source = "COMPDAT\n  'INJECT1' 5 57 1 7 'OPEN' 1* 1* 0.2 1* 0 /\n  'PROD1' 16 43 1 7 'OPEN' 1* 1* 0.2 1* 0  / -- skin row\n/\n";
        let outcome = patch(
            &Deck::from_text(source),
            &FieldLocator::block_rows("COMPDAT", RowFilter::Containing("'PROD".to_string())),
            &FieldValue::Decimal(-2.0),
        )
        .expect("patch should run");

        assert_eq!(outcome.replaced_fields, 1);
        let patched = outcome.deck.to_text();
        assert_eq!(differing_line_indices(source, &patched), vec![2]);
        assert!(patched.contains("'INJECT1' 5 57 1 7 'OPEN' 1* 1* 0.2 1* 0 /"));
        assert!(patched.contains("'PROD1' 16 43 1 7 'OPEN' 1* 1* 0.2 1* -2  / -- skin row\n"));
    }

    #[test]
    fn only_the_first_block_of_a_keyword_is_patched() {
        let source = "COMPDAT\n 'PROD1' 1 1 1 1 'OPEN' 1* 1* 0.2 1* 0 /\n/\nCOMPDAT\n 'PROD2' 1 1 1 1 'OPEN' 1* 1* 0.2 1* 0 /\n/\n";
        let outcome = patch(
            &Deck::from_text(source),
            &FieldLocator::block_rows("COMPDAT", RowFilter::Containing("'PROD".to_string())),
            &FieldValue::Decimal(2.0),
        )
        .expect("patch should run");

        assert_eq!(outcome.replaced_fields, 1);
        assert!(outcome.deck.to_text().contains("'PROD2' 1 1 1 1 'OPEN' 1* 1* 0.2 1* 0 /"));
    }

    #[test]
    fn unterminated_pressure_block_runs_to_end_of_deck() {
        let source = "PRESSURE\n  18553*400 /\nSOIL\n  18553*0.90 /\n";
        let outcome = patch(
            &Deck::from_text(source),
            &FieldLocator::block_rows("PRESSURE", RowFilter::All),
            &FieldValue::Decimal(450.0),
        )
        .expect("patch should run");

        assert_eq!(outcome.replaced_fields, 2);
        assert_eq!(
            outcome.deck.to_text(),
            "PRESSURE\n  18553*450 /\nSOIL\n  18553*450 /\n"
        );
    }

    #[test]
    fn absent_locator_returns_input_unchanged() {
        let deck = Deck::from_text("RUNSPEC\nDIMENS\n 60 60 7 /\n");
        let outcome = patch(
            &deck,
            &FieldLocator::block_rows("COMPDAT", RowFilter::All),
            &FieldValue::Decimal(1.0),
        )
        .expect("patch should run");

        assert_eq!(outcome.match_count, MatchCount::Zero);
        assert_eq!(outcome.deck, deck);
    }

    #[test]
    fn last_numeric_replacement_keeps_terminators_and_rejects_non_numeric_tails() {
        assert_eq!(
            replace_last_numeric_before_slash("  100*400 /\r\n", "350").as_deref(),
            Some("  100*350 /\r\n")
        );
        assert_eq!(
            replace_last_numeric_before_slash("  1 2 3\n", "9").as_deref(),
            Some("  1 2 9\n")
        );
        assert_eq!(replace_last_numeric_before_slash("  'OPEN' /\n", "9"), None);
        assert_eq!(replace_last_numeric_before_slash("  2* /\n", "9"), None);
        assert_eq!(replace_last_numeric_before_slash("/\n", "9"), None);
    }
}
