/// Matching form of an attendee name: every whitespace character removed,
/// including the ideographic space (U+3000). Case and punctuation are kept.
pub fn normalize_name(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
