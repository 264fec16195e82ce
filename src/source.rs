// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Source file manipulation.
//!
//! The __source file__ is a human-authored TypeScript file that doubles as
//! the site's data store. Somewhere inside of it sits an array declaration,
//! e.g., `export const ARTICLES: Article[] = [`, whose elements are object
//! literals, one per article. Each of those object literals is a __record__.
//!
//! # Surgical Edits
//!
//! Dan Papers never parses the source file as TypeScript. Instead it treats
//! the file as a stream of text with exactly two pieces of structure:
//!
//! 1. Records are found by their `id: "<slug>"` literal.
//! 2. Records are brace-balanced, and never nested inside other object
//!    literals.
//!
//! Everything outside of the record being touched is left byte-for-byte
//! intact, so hand-written declarations, comments, and formatting survive
//! every publish, edit, or delete.
//!
//! The trade off is robustness. A hand-edited file with mismatched braces
//! cannot be spliced safely, so it is reported as malformed and left alone
//! until someone fixes it by hand.
//!
//! # See Also
//!
//! 1. [`codec`] for the textual shape of a record.
//! 2. [`locate`] for finding record boundaries.
//! 3. [`splice`] for insert, replace, and delete.

pub mod codec;
pub mod locate;
pub mod splice;

use crate::{
    article::Article,
    source::{
        codec::{decode, CodecError},
        locate::{BraceScanner, LocateError},
        splice::Marker,
    },
};

/// Decode every record in the records array, in file order.
///
/// # Errors
///
/// - Return [`SourceError::MarkerNotFound`] if the records array cannot be
///   found.
/// - Return [`SourceError::Locate`] if the array is not brace-balanced.
/// - Return [`SourceError::Codec`] if a record cannot be decoded.
pub fn records(text: &str, marker: &Marker) -> Result<Vec<Article>> {
    let array_start = marker
        .find_end(text)
        .ok_or_else(|| SourceError::MarkerNotFound(marker.name().to_string()))?;

    BraceScanner::new()
        .record_spans(text, array_start)?
        .into_iter()
        .map(|span| Ok(decode(span.extract(text))?))
        .collect()
}

/// Source file error types.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Records array declaration is missing.
    #[error("records array {0:?} not found in source file")]
    MarkerNotFound(String),

    /// Record boundaries cannot be determined.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Record text cannot be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Friendly result alias :3
pub type Result<T, E = SourceError> = std::result::Result<T, E>;
