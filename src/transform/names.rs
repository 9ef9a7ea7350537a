//! Station display-name cleanup.

/// Values the feed uses in place of a missing name.
const NULL_MARKERS: [&str; 3] = ["", "N", "\\N"];

/// Splits off one leading `<digits> - ` code, returning the remainder.
///
/// The separator needs whitespace on both sides, so `"3-D Printing"` is a name
/// and not a code.
fn strip_code_prefix(name: &str) -> Option<&str> {
    let rest = name.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == name.len() || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('-')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

/// Normalizes a raw station name.
///
/// Removes leading numeric codes such as `"12345 - "` (repeatedly, so the
/// result is stable under a second pass) and trims whitespace. Null markers
/// yield `None`.
pub fn normalize_name(raw: &str) -> Option<String> {
    let mut name = raw.trim();
    while let Some(rest) = strip_code_prefix(name) {
        name = rest;
    }
    let name = name.trim();

    if NULL_MARKERS.contains(&name) {
        None
    } else {
        Some(name.to_string())
    }
}
