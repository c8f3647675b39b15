use super::{Deck, split_terminator};
use regex::Regex;
use std::sync::LazyLock;

static BARE_INCLUDE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)'?([A-Za-z0-9._-]+\.(?:INC|inc))'?(\s.*|/.*)?$")
        .expect("include reference pattern is valid")
});

/// How include references inside a primary deck are redirected for one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeRewrite<'a> {
    /// Directory prefix every include reference must carry, e.g. `INCLUDE`.
    pub include_dir: &'a str,
    /// File name of the schedule template referenced by the deck.
    pub template_name: Option<&'a str>,
    /// File name of the generated schedule that replaces the template reference.
    pub generated_name: Option<&'a str>,
}

/// Points the template reference at the generated schedule and prefixes every
/// other `*.INC` reference with the include directory when it is missing.
pub fn rewrite_include_references(deck: &Deck, rewrite: &IncludeRewrite<'_>) -> Deck {
    let prefix = format!("{}/", rewrite.include_dir.trim_end_matches('/'));
    let lines = deck
        .lines()
        .iter()
        .map(|line| {
            let (body, terminator) = split_terminator(line);
            if let (Some(template), Some(generated)) =
                (rewrite.template_name, rewrite.generated_name)
                && body.contains(template)
            {
                let indent = &body[..body.len() - body.trim_start().len()];
                let tail = if body.contains('/') { " /" } else { "" };
                return format!("{}'{}{}'{}{}", indent, prefix, generated, tail, terminator);
            }

            if body.contains(&prefix) {
                return line.clone();
            }
            match BARE_INCLUDE_LINE.captures(body) {
                Some(captures) => format!(
                    "{}'{}{}'{}{}",
                    &captures[1],
                    prefix,
                    &captures[2],
                    captures.get(3).map_or("", |tail| tail.as_str()),
                    terminator
                ),
                None => line.clone(),
            }
        })
        .collect::<Vec<_>>();
    deck.with_lines(lines)
}

#[cfg(test)]
mod tests {
    use super::{IncludeRewrite, rewrite_include_references};
    use crate::deck::Deck;

    const DATA: &str = "GRID\nINCLUDE\n  ACTIVE.INC /\nINCLUDE\n 'mDARCY.INC' /\nINCLUDE\n  'INCLUDE/PERMX.INC' /\nSCHEDULE\nINCLUDE\n  'schedule_test.inc' /\nEND\n";

    #[test]
    fn schedule_reference_is_redirected_and_other_includes_prefixed() {
        let rewrite = IncludeRewrite {
            include_dir: "INCLUDE",
            template_name: Some("schedule_test.inc"),
            generated_name: Some("schedule_BHP_390.inc"),
        };
        let patched = rewrite_include_references(&Deck::from_text(DATA), &rewrite).to_text();

        assert_eq!(
            patched,
            "GRID\nINCLUDE\n  'INCLUDE/ACTIVE.INC' /\nINCLUDE\n 'INCLUDE/mDARCY.INC' /\nINCLUDE\n  'INCLUDE/PERMX.INC' /\nSCHEDULE\nINCLUDE\n  'INCLUDE/schedule_BHP_390.inc' /\nEND\n"
        );
    }

    #[test]
    fn rewriting_without_schedule_only_normalizes_prefixes() {
        let rewrite = IncludeRewrite {
            include_dir: "INCLUDE/",
            template_name: None,
            generated_name: None,
        };
        let deck = Deck::from_text("INCLUDE\r\nACTIVE.INC\r\n'schedule_test.inc' /\r\n");
        let patched = rewrite_include_references(&deck, &rewrite).to_text();

        assert_eq!(
            patched,
            "INCLUDE\r\n'INCLUDE/ACTIVE.INC'\r\n'INCLUDE/schedule_test.inc' /\r\n"
        );
    }
}
