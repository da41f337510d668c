//! Error location resolver
//!
//! Maps an engine error message back to a position in the schema text that
//! produced it. The engine only tells us the offending token (`near "x"`), so
//! this is a textual search: the first line containing the token wins. A token
//! that also appears earlier in the text (a comment, a string literal) will be
//! reported at that earlier spot.

use crate::model::{ErrorLocation, SourceDocument};

const NEAR_PREFIX: &str = "near \"";

/// Extract the token quoted after `near "` in an engine error message.
///
/// The token runs up to the `":` that closes it, so quoted identifiers
/// (`near ""w"": syntax error`) keep their quotes. Without that delimiter
/// the first closing quote ends the token. Returns `None` when the pattern
/// is missing, unterminated, or empty.
pub fn near_token(message: &str) -> Option<&str> {
    let start = message.find(NEAR_PREFIX)? + NEAR_PREFIX.len();
    let rest = &message[start..];
    let end = rest.find("\":").or_else(|| rest.find('"'))?;
    let token = &rest[..end];
    (!token.is_empty()).then_some(token)
}

/// Resolve the position of an engine error inside `source`.
///
/// Columns are 1-based and counted in characters.
pub fn resolve(message: &str, source: &SourceDocument) -> Option<ErrorLocation> {
    let token = near_token(message)?;

    source.lines().enumerate().find_map(|(idx, line)| {
        line.find(token).map(|byte_idx| {
            let column = line[..byte_idx].chars().count() + 1;
            ErrorLocation::new(idx + 1, column)
        })
    })
}
