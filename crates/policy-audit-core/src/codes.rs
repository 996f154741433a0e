//! Extraction of fixed-width codes from a mapping's identifier blob.

use lazy_static::lazy_static;
use regex::Regex;

/// Width of a single code.
pub const CODE_WIDTH: usize = 8;

lazy_static! {
    static ref CODE_PATTERN: Regex = Regex::new(r"[0-9]{8}").unwrap();
}

/// Scan `identifier_values` left to right for non-overlapping runs of eight
/// ASCII digits.
///
/// Anything between codes is accepted, including letters glued to a code
/// (`"JUNK99999999"` yields `"99999999"`). A run of sixteen digits yields two
/// codes; a run shorter than eight yields none.
pub fn extract_codes(identifier_values: &str) -> Vec<&str> {
    CODE_PATTERN
        .find_iter(identifier_values)
        .map(|m| m.as_str())
        .collect()
}
