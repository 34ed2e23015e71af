//! Text repair for feed strings.

/// The Unicode replacement character left behind by a historical encoding
/// mismatch in the feed.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// The character the replacement artifact originally stood for.
pub const RIGHT_SINGLE_QUOTE: char = '\u{2019}';

/// Replaces every replacement-character artifact with a right single quote.
///
/// Returns the input unchanged when it contains no artifact.
pub fn repair_text(text: &str) -> String {
    text.replace(REPLACEMENT_CHAR, &RIGHT_SINGLE_QUOTE.to_string())
}
