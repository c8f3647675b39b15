use super::Deck;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Outside,
    /// The keyword line that opens a block.
    Opening,
    Inside,
    /// The `/` line that closes a block. Still part of the block.
    Closing,
}

impl LineState {
    pub const fn in_block(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// Walks deck lines tracking entry and exit of one keyword block at a time.
///
/// A block opens on any line whose left-trimmed, upper-cased content starts
/// with the keyword and closes on the first later line whose trimmed content
/// starts with `/`. Nesting is not validated. A block with no terminator stays
/// open through the end of the deck, and a keyword line seen while a block is
/// open does not start a new one.
pub struct BlockScanner<'a> {
    keyword: String,
    lines: std::slice::Iter<'a, String>,
    inside: bool,
}

impl<'a> BlockScanner<'a> {
    pub fn new(deck: &'a Deck, keyword: &str) -> Self {
        Self {
            keyword: keyword.trim().to_ascii_uppercase(),
            lines: deck.lines().iter(),
            inside: false,
        }
    }
}

impl<'a> Iterator for BlockScanner<'a> {
    type Item = (&'a str, LineState);

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        let state = if self.inside {
            if line.trim().starts_with('/') {
                self.inside = false;
                LineState::Closing
            } else {
                LineState::Inside
            }
        } else if line
            .trim_start()
            .to_ascii_uppercase()
            .starts_with(&self.keyword)
        {
            self.inside = true;
            LineState::Opening
        } else {
            LineState::Outside
        };
        Some((line.as_str(), state))
    }
}

pub fn block_mask(deck: &Deck, keyword: &str) -> Vec<bool> {
    BlockScanner::new(deck, keyword)
        .map(|(_, state)| state.in_block())
        .collect()
}
