/// Canonical component name: the raw body label with the machining-state
/// marker and everything after it removed. Labels without the marker are only
/// trimmed.
pub fn canonical_name(raw: &str, suffix_marker: &str) -> String {
    let raw = raw.trim();
    if suffix_marker.is_empty() {
        return raw.to_string();
    }
    match raw.find(suffix_marker) {
        Some(at) => {
            let base = raw[..at].trim_end();
            if base.is_empty() {
                // Nothing left to name the part by.
                raw.to_string()
            } else {
                base.to_string()
            }
        }
        None => raw.to_string(),
    }
}
