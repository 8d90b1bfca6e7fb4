//! Percent-encoding of query parameter values.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except `[0-9A-Za-z._~-]` is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Encode `value` for use as a query parameter value.
///
/// Works on the UTF-8 byte sequence of each character, so a multi-byte
/// character becomes one `%XX` escape per byte with uppercase hex digits.
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
