//! Line-preserving deck model and the narrow-grammar patching built on it.
//!
//! A deck is never parsed into records. Locators find one field by pattern and
//! every byte outside that field is carried through untouched, including line
//! terminators.

mod includes;
mod locator;
mod patcher;
mod scanner;

pub use includes::{IncludeRewrite, rewrite_include_references};
pub use locator::{FieldLocator, FieldPatch, RowFilter, field_patches};
pub use patcher::{PatchOutcome, patch, patch_text, replace_last_numeric_before_slash};
pub use scanner::{BlockScanner, LineState, block_mask};

use crate::domain::{SweepError, SweepResult};
use std::fs;
use std::path::Path;
use tracing::debug;

/// How a source file's bytes map onto text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    /// Not valid UTF-8 (e.g. cp1251 comments); each byte is held as the char
    /// with the same code point and written back as that byte.
    RawBytes,
}

impl SourceEncoding {
    pub fn decode(bytes: Vec<u8>) -> (String, Self) {
        match String::from_utf8(bytes) {
            Ok(text) => (text, Self::Utf8),
            Err(error) => (
                error.into_bytes().into_iter().map(char::from).collect(),
                Self::RawBytes,
            ),
        }
    }

    /// Chars above U+00FF in a raw-byte text can only come from inserted
    /// values; they are written as UTF-8.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::RawBytes => {
                let mut bytes = Vec::with_capacity(text.len());
                for ch in text.chars() {
                    match u8::try_from(ch) {
                        Ok(byte) => bytes.push(byte),
                        Err(_) => {
                            let mut buffer = [0; 4];
                            bytes.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
                        }
                    }
                }
                bytes
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    pub encoding: SourceEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deck {
    lines: Vec<String>,
    encoding: SourceEncoding,
}

impl Deck {
    pub fn from_text(text: &str) -> Self {
        Self::from_source(text, SourceEncoding::Utf8)
    }

    pub fn from_source(text: &str, encoding: SourceEncoding) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(ToOwned::to_owned).collect(),
            encoding,
        }
    }

    pub fn read(path: &Path) -> SweepResult<Self> {
        read_text(path, "deck").map(|source| Self::from_source(&source.text, source.encoding))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    pub fn to_text(&self) -> String {
        self.lines.concat()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.encoding.encode(&self.to_text())
    }

    /// A deck with new content and this deck's encoding.
    pub(crate) fn with_text(&self, text: &str) -> Self {
        Self::from_source(text, self.encoding)
    }

    pub(crate) fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            encoding: self.encoding,
        }
    }

    pub fn write(&self, path: &Path) -> SweepResult<()> {
        write_bytes(path, &self.to_bytes())
    }
}

/// Reads a text input, reporting an absent file as a missing resource.
/// Input that is not valid UTF-8 is kept byte for byte as
/// [`SourceEncoding::RawBytes`].
pub fn read_text(path: &Path, role: &str) -> SweepResult<SourceText> {
    if !path.is_file() {
        return Err(SweepError::missing_resource(
            "IO.MISSING_INPUT",
            format!("{} '{}' was not found", role, path.display()),
        ));
    }

    let bytes = fs::read(path).map_err(|source| {
        SweepError::io_system(
            "IO.INPUT_READ",
            format!("failed to read {} '{}': {}", role, path.display(), source),
        )
    })?;
    let (text, encoding) = SourceEncoding::decode(bytes);
    if encoding == SourceEncoding::RawBytes {
        debug!(path = %path.display(), "input is not UTF-8; kept as raw bytes");
    }
    Ok(SourceText { text, encoding })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> SweepResult<()> {
    fs::write(path, bytes).map_err(|source| {
        SweepError::io_system(
            "IO.DECK_WRITE",
            format!("failed to write deck '{}': {}", path.display(), source),
        )
    })
}

/// Splits a line into its content and its terminator (`\n`, `\r\n`, or empty).
pub(crate) fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
mod tests {
    use super::{Deck, SourceEncoding, read_text, split_terminator};
    use crate::domain::SweepErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn deck_round_trips_text_with_mixed_terminators() {
        let text = "RUNSPEC\r\nTITLE\n  egg model\nEND";
        let deck = Deck::from_text(text);

        assert_eq!(deck.line_count(), 4);
        assert_eq!(deck.lines()[0], "RUNSPEC\r\n");
        assert_eq!(deck.lines()[3], "END");
        assert_eq!(deck.to_text(), text);
    }

    #[test]
    fn split_terminator_keeps_carriage_returns_with_the_terminator() {
        assert_eq!(split_terminator("1* 0.2 /\r\n"), ("1* 0.2 /", "\r\n"));
        assert_eq!(split_terminator("/\n"), ("/", "\n"));
        assert_eq!(split_terminator("END"), ("END", ""));
    }

    #[test]
    fn missing_deck_is_a_missing_resource() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = read_text(&temp.path().join("absent.DATA"), "template deck")
            .expect_err("absent file should fail");

        assert_eq!(error.category(), SweepErrorCategory::MissingResource);
        assert_eq!(error.placeholder(), "IO.MISSING_INPUT");
    }

    #[test]
    fn non_utf8_comment_survives_a_read_write_cycle() {
        let temp = TempDir::new().expect("tempdir should be created");
        let source = temp.path().join("CP1251.DATA");
        let bytes = b"-- \xcf\xf0\xee\xe1\xe0\r\nWCONPROD\n 'PROD1' 'OPEN' 'BHP' 5* 395 /\n".to_vec();
        fs::write(&source, &bytes).expect("deck written");

        let deck = Deck::read(&source).expect("non-UTF-8 deck should load");
        assert_eq!(deck.encoding(), SourceEncoding::RawBytes);
        assert_eq!(deck.line_count(), 3);

        let copy = temp.path().join("COPY.DATA");
        deck.write(&copy).expect("deck written back");
        assert_eq!(fs::read(&copy).expect("copy readable"), bytes);
    }

    #[test]
    fn utf8_input_stays_utf8() {
        let (text, encoding) = SourceEncoding::decode("-- Скважина\n".as_bytes().to_vec());
        assert_eq!(encoding, SourceEncoding::Utf8);
        assert_eq!(text, "-- Скважина\n");
        assert_eq!(SourceEncoding::RawBytes.encode("\u{cf}\u{2014}"), vec![0xcf, 0xe2, 0x80, 0x94]);
    }
}
