// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Splice engine.
//!
//! Compute the new text of the source file for one insert, replace, or
//! delete of a record. The engine is a pure function of the old text and the
//! operation. It never reads or writes the remote file itself.

use crate::source::locate::{BraceScanner, LocateError, RecordLocator};

use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::debug;

/// Opening of the records array.
///
/// Matches the declaration tolerantly, so that `ARTICLES = [`,
/// `ARTICLES: Article[] = [`, and `ARTICLES : Array<Article> =\n[` all work.
#[derive(Debug, Clone)]
pub struct Marker {
    name: String,
    pattern: Regex,
}

impl Marker {
    /// Construct new marker for the array declared under `name`.
    ///
    /// # Errors
    ///
    /// - Return [`SpliceError::Pattern`] if the marker pattern cannot be
    ///   built.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let pattern = Regex::new(&format!(
            r"\b{}\s*(?::\s*[^=]+)?\s*=\s*\[",
            regex::escape(&name)
        ))?;

        Ok(Self { name, pattern })
    }

    /// Name of the array declaration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset right after the array's opening `[`.
    pub fn find_end(&self, text: &str) -> Option<usize> {
        self.pattern.find(text).map(|found| found.end())
    }
}

/// Text-level operation on one record.
#[derive(Debug, Clone)]
pub enum SpliceOp {
    /// Insert record text at the top of the records array.
    InsertAfterMarker { marker: Marker, record: String },

    /// Replace the record carrying `id` with new record text.
    ReplaceRecord { id: String, record: String },

    /// Delete the record carrying `id` along with its separator.
    DeleteRecord { id: String },
}

impl Display for SpliceOp {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::InsertAfterMarker { marker, .. } => write!(fmt, "insert after {}", marker.name()),
            Self::ReplaceRecord { id, .. } => write!(fmt, "replace {id:?}"),
            Self::DeleteRecord { id } => write!(fmt, "delete {id:?}"),
        }
    }
}

/// Apply splice operations through a [`RecordLocator`].
#[derive(Debug, Default, Clone)]
pub struct Splicer<L = BraceScanner>
where
    L: RecordLocator,
{
    locator: L,
}

impl<L> Splicer<L>
where
    L: RecordLocator,
{
    /// Construct new splicer.
    pub fn new(locator: L) -> Self {
        Self { locator }
    }

    /// Record locator in use.
    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Compute new source text.
    ///
    /// Text outside of the touched record is kept byte-for-byte.
    ///
    /// # Errors
    ///
    /// - Return [`SpliceError::MarkerNotFound`] if an insert cannot find the
    ///   records array.
    /// - Return [`SpliceError::Locate`] if a replace or delete cannot locate
    ///   its record.
    pub fn apply(&self, text: &str, op: &SpliceOp) -> Result<String> {
        match op {
            SpliceOp::InsertAfterMarker { marker, record } => {
                let at = marker
                    .find_end(text)
                    .ok_or_else(|| SpliceError::MarkerNotFound(marker.name().to_string()))?;

                let record = record.trim_end();
                let separator = if record.ends_with(',') { "" } else { "," };
                debug!("insert record after byte {at}");

                let mut out = String::with_capacity(text.len() + record.len() + 2);
                out.push_str(&text[..at]);
                out.push('\n');
                out.push_str(record);
                out.push_str(separator);
                out.push_str(&text[at..]);
                Ok(out)
            }
            SpliceOp::ReplaceRecord { id, record } => {
                let span = self.locator.locate(text, id)?;
                let record = record.trim();
                debug!("replace bytes {}..={} with {} bytes", span.start, span.end, record.len());

                let mut out = String::with_capacity(text.len() + record.len());
                out.push_str(&text[..span.start]);
                out.push_str(record);
                out.push_str(&text[span.end + 1..]);
                Ok(out)
            }
            SpliceOp::DeleteRecord { id } => {
                let span = self.locator.deletion_span(text, id)?;
                debug!("delete bytes {}..={}", span.start, span.end);

                let mut out = String::with_capacity(text.len());
                out.push_str(&text[..span.start]);
                out.push_str(&text[span.end + 1..]);
                Ok(out)
            }
        }
    }
}

/// Compute new source text with the default brace scanner.
///
/// # Errors
///
/// - Same as [`Splicer::apply`].
pub fn apply(text: &str, op: &SpliceOp) -> Result<String> {
    Splicer::new(BraceScanner::new()).apply(text, op)
}

/// Splice engine error types.
#[derive(Debug, thiserror::Error)]
pub enum SpliceError {
    /// Records array declaration cannot be found.
    #[error("records array {0:?} not found in source file")]
    MarkerNotFound(String),

    /// Record cannot be located.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Marker pattern cannot be built.
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SpliceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use simple_test_case::test_case;

    const SOURCE: &str = indoc! {r#"
        import { Article } from './types';

        export const ARTICLES: Article[] = [
          {
            id: "a",
            title: `A`
          },
          {
            id: "b",
            title: `B`
          },
        ];
    "#};

    #[test_case("export const ARTICLES = [", Some(25); "plain")]
    #[test_case("export const ARTICLES: Article[] = [", Some(36); "type annotation")]
    #[test_case("const ARTICLES : Array<Article> =\n[", Some(35); "generic over lines")]
    #[test_case("const MY_ARTICLES = [", None; "different name")]
    #[test_case("const ARTICLES = {", None; "not an array")]
    #[test]
    fn marker_matches_declarations(text: &str, expect: Option<usize>) {
        let marker = Marker::new("ARTICLES").unwrap();
        assert_eq!(marker.find_end(text), expect);
    }

    #[test]
    fn insert_after_marker() -> anyhow::Result<()> {
        let op = SpliceOp::InsertAfterMarker {
            marker: Marker::new("ARTICLES")?,
            record: "  {\n    id: \"c\"\n  }".into(),
        };

        let result = apply("export const ARTICLES = [\n];", &op)?;
        assert_eq!(result, "export const ARTICLES = [\n  {\n    id: \"c\"\n  },\n];");

        Ok(())
    }

    #[test]
    fn insert_without_marker() -> anyhow::Result<()> {
        let op = SpliceOp::InsertAfterMarker {
            marker: Marker::new("ARTICLES")?,
            record: "{ id: \"c\" }".into(),
        };

        let result = apply("export const PAPERS = [];", &op);
        assert!(matches!(result, Err(SpliceError::MarkerNotFound(name)) if name == "ARTICLES"));

        Ok(())
    }

    #[test]
    fn replace_keeps_surroundings() -> anyhow::Result<()> {
        let op = SpliceOp::ReplaceRecord {
            id: "a".into(),
            record: "\n  {\n    id: \"a\",\n    title: `A2`\n  }\n".into(),
        };

        let expect = indoc! {r#"
            import { Article } from './types';

            export const ARTICLES: Article[] = [
              {
                id: "a",
                title: `A2`
              },
              {
                id: "b",
                title: `B`
              },
            ];
        "#};
        assert_eq!(apply(SOURCE, &op)?, expect);

        Ok(())
    }

    #[test]
    fn delete_consumes_one_separator() -> anyhow::Result<()> {
        let op = SpliceOp::DeleteRecord { id: "a".into() };
        let expect = SOURCE.replace("{\n    id: \"a\",\n    title: `A`\n  },", "");
        assert_eq!(apply(SOURCE, &op)?, expect);
        assert!(expect.contains("= [\n  \n  {\n    id: \"b\""));

        let op = SpliceOp::DeleteRecord { id: "b".into() };
        let result = apply(SOURCE, &op)?;
        assert!(result.contains("title: `A`\n  },\n  \n];"));

        Ok(())
    }

    #[test]
    fn replace_missing_record() {
        let op = SpliceOp::ReplaceRecord {
            id: "zzz".into(),
            record: "{}".into(),
        };
        assert!(matches!(
            apply(SOURCE, &op),
            Err(SpliceError::Locate(LocateError::NotFound { .. }))
        ));
    }
}
