//! Masking helpers for identifiers that end up in logs

/// Mask the middle of an identifier, keeping the first and last four characters.
///
/// Values of eight characters or fewer are returned unchanged; empty or
/// whitespace-only values become an empty string.
pub fn mask_identifier(value: &str) -> String {
    let value = value.trim();
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return value.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

/// Keep a fixed-length prefix of a value and star out the remainder.
pub fn mask_after(value: &str, keep: usize) -> String {
    let total = value.chars().count();
    if total <= keep {
        return value.to_string();
    }
    let head: String = value.chars().take(keep).collect();
    format!("{}{}", head, "*".repeat(total - keep))
}
