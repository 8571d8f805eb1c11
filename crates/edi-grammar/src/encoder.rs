//! Conversion of free-text names into structural tags

/// Encode a free-text name as a structural tag.
///
/// Runs of characters that are not letters or digits collapse into a single
/// `_`; leading and trailing separators are dropped, and a tag that would start
/// with a digit is prefixed with `_`. Encoding an already encoded tag is a no-op.
pub fn encode_tag(name: &str) -> String {
    let mut tag = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !tag.is_empty() {
                tag.push('_');
            }
            pending_separator = false;
            tag.push(c);
        } else {
            pending_separator = true;
        }
    }

    // An explicit leading underscore survives re-encoding
    if name.trim().starts_with('_') || tag.starts_with(|c: char| c.is_ascii_digit()) {
        tag.insert(0, '_');
    }

    if tag.is_empty() {
        tag.push('_');
    }

    tag
}
