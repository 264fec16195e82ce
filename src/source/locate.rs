// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Record boundary location.
//!
//! Find where a record starts and ends inside the source file given its id.
//! Locating is hidden behind [`RecordLocator`] so that brace scanning can be
//! swapped for a grammar-aware parser without touching the splice engine or
//! the commit orchestrator.
//!
//! # Brace Scanning
//!
//! [`BraceScanner`] finds the first `id: "<slug>"` key that sits outside of
//! string, template, and comment text, walks backward to the nearest `{` to
//! get the opening brace, then walks forward from that brace counting depth
//! until it returns to zero. Braces inside literal and comment text do not
//! count toward depth either. The backward walk is a plain scan, which is only
//! correct because `id` is the first key of every record and records never
//! nest.
//!
//! All offsets are byte offsets into the source text. A [`Span`] is inclusive
//! of its closing brace.

use regex::Regex;
use std::ops::RangeInclusive;
use tracing::debug;

/// Byte range of a record, inclusive of both braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Offset of the opening `{`.
    pub start: usize,

    /// Offset of the closing `}`, or of the last separator byte for deletion
    /// spans.
    pub end: usize,
}

impl Span {
    /// Span as an inclusive range.
    pub fn range(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Text covered by this span.
    pub fn extract<'a>(&self, text: &'a str) -> &'a str {
        &text[self.range()]
    }
}

/// Locate records inside source text.
pub trait RecordLocator {
    /// Locate record with target id.
    ///
    /// # Errors
    ///
    /// - Return [`LocateError::NotFound`] if no record has the id.
    /// - Return [`LocateError::Malformed`] if the record's braces cannot be
    ///   balanced.
    fn locate(&self, text: &str, id: &str) -> Result<Span>;

    /// Locate record with target id, plus the separator that follows it.
    ///
    /// Removing the returned span leaves no orphaned comma behind. At most one
    /// comma is consumed, along with any whitespace before it. Scanning stops
    /// at the first comma or the first byte that is neither whitespace nor a
    /// comma.
    ///
    /// # Errors
    ///
    /// - Same as [`RecordLocator::locate`].
    fn deletion_span(&self, text: &str, id: &str) -> Result<Span> {
        let span = self.locate(text, id)?;
        let mut end = span.end;
        for byte in text.as_bytes()[span.end + 1..].iter() {
            match byte {
                b',' => {
                    end += 1;
                    break;
                }
                b' ' | b'\t' | b'\r' | b'\n' => end += 1,
                _ => break,
            }
        }

        Ok(Span {
            start: span.start,
            end,
        })
    }

    /// Check if a record with target id exists.
    fn contains(&self, text: &str, id: &str) -> bool {
        self.locate(text, id).is_ok()
    }
}

/// Brace-counting record locator.
#[derive(Debug, Default, Clone, Copy)]
pub struct BraceScanner;

impl BraceScanner {
    /// Construct new brace scanner.
    pub fn new() -> Self {
        Self
    }

    /// Spans of every top-level record inside an array body.
    ///
    /// Starts right after the array's opening `[`, and stops at its closing
    /// `]`. Whitespace, commas, and comments between records are skipped.
    ///
    /// # Errors
    ///
    /// - Return [`LocateError::Malformed`] if the array holds something other
    ///   than object literals, a record is unbalanced, or the array never
    ///   closes.
    pub fn record_spans(&self, text: &str, array_start: usize) -> Result<Vec<Span>> {
        let bytes = text.as_bytes();
        let mut spans = Vec::new();
        let mut offset = array_start;

        while offset < bytes.len() {
            match bytes[offset] {
                b' ' | b'\t' | b'\r' | b'\n' | b',' => offset += 1,
                b'/' if bytes.get(offset + 1).is_some_and(|&b| matches!(b, b'/' | b'*')) => {
                    offset = skip_comment(bytes, offset);
                }
                b'{' => {
                    let end = closing_brace(bytes, offset).ok_or_else(|| LocateError::Malformed {
                        reason: format!("record at byte {offset} is never closed"),
                    })?;
                    spans.push(Span { start: offset, end });
                    offset = end + 1;
                }
                b']' => return Ok(spans),
                other => {
                    return Err(LocateError::Malformed {
                        reason: format!(
                            "unexpected {:?} at byte {offset} inside records array",
                            other as char
                        ),
                    })
                }
            }
        }

        Err(LocateError::Malformed {
            reason: "records array is never closed".into(),
        })
    }
}

impl RecordLocator for BraceScanner {
    fn locate(&self, text: &str, id: &str) -> Result<Span> {
        let pattern = id_pattern(id)?;
        let bytes = text.as_bytes();
        let mut cursor = 0;
        let found = pattern
            .find_iter(text)
            .find(|found| {
                // INVARIANT: Id literals quoted inside another record's text
                // never count as a key.
                cursor = skip_to_code(bytes, cursor, found.start());
                cursor == found.start()
            })
            .ok_or_else(|| LocateError::NotFound { id: id.to_string() })?;

        let start = text[..found.start()]
            .rfind('{')
            .ok_or_else(|| LocateError::Malformed {
                reason: format!("record {id:?} has no opening brace"),
            })?;

        let end = closing_brace(text.as_bytes(), start).ok_or_else(|| LocateError::Malformed {
            reason: format!("record {id:?} has unbalanced braces"),
        })?;

        // INVARIANT: The id literal must sit inside the record we balanced.
        if end < found.end() {
            return Err(LocateError::Malformed {
                reason: format!("record {id:?} closes before its id"),
            });
        }

        debug!("located record {id:?} at bytes {start}..={end}");
        Ok(Span { start, end })
    }
}

fn id_pattern(id: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r#"\bid\s*:\s*["']{}["']"#,
        regex::escape(id)
    ))?)
}

/// Walk from `offset` to `target`, jumping over literals and comments whole.
///
/// Lands on `target` only if it is code, otherwise past the literal or comment
/// covering it.
fn skip_to_code(bytes: &[u8], mut offset: usize, target: usize) -> usize {
    while offset < target {
        offset = match bytes[offset] {
            quote @ (b'"' | b'\'' | b'`') => {
                skip_literal(bytes, offset, quote).unwrap_or(bytes.len())
            }
            b'/' if bytes.get(offset + 1).is_some_and(|&b| matches!(b, b'/' | b'*')) => {
                skip_comment(bytes, offset)
            }
            _ => offset + 1,
        };
    }

    offset
}

/// Offset of the `}` balancing the `{` at `open`.
fn closing_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut offset = open;

    while offset < bytes.len() {
        match bytes[offset] {
            quote @ (b'"' | b'\'' | b'`') => {
                offset = skip_literal(bytes, offset, quote)?;
                continue;
            }
            b'/' if bytes.get(offset + 1).is_some_and(|&b| matches!(b, b'/' | b'*')) => {
                offset = skip_comment(bytes, offset);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
        offset += 1;
    }

    None
}

/// Offset just past the literal opened by `quote` at `open`.
fn skip_literal(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut offset = open + 1;
    while offset < bytes.len() {
        match bytes[offset] {
            b'\\' => offset += 2,
            byte if byte == quote => return Some(offset + 1),
            _ => offset += 1,
        }
    }

    None
}

/// Offset just past the comment starting at `open`.
fn skip_comment(bytes: &[u8], open: usize) -> usize {
    let rest = &bytes[open + 2..];
    if bytes[open + 1] == b'/' {
        rest.iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |pos| open + 2 + pos + 1)
    } else {
        rest.windows(2)
            .position(|pair| pair == b"*/")
            .map_or(bytes.len(), |pos| open + 2 + pos + 2)
    }
}

/// Record location error types.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// No record carries the target id.
    #[error("record {id:?} not found in source file")]
    NotFound { id: String },

    /// Record boundaries cannot be balanced.
    #[error("malformed source file: {reason}")]
    Malformed { reason: String },

    /// Id search pattern cannot be built.
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Friendly result alias :3
pub type Result<T, E = LocateError> = std::result::Result<T, E>;
