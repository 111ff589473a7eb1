//! Masking of sensitive directory data before it is logged.

/// Mask a sensitive value, keeping only the first and last two characters.
///
/// Values of four characters or fewer are fully masked.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}****{}", head, tail)
}

/// Mask an optional value, rendering `-` when absent.
pub fn mask_opt(value: Option<&str>) -> String {
    value.map(mask).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_values_fully_masked() {
        assert_eq!(mask(""), "****");
        assert_eq!(mask("1234"), "****");
    }

    #[test]
    fn test_keeps_edges() {
        assert_eq!(mask("12345678901"), "12****01");
        assert_eq!(mask("user@example.com"), "us****om");
    }

    #[test]
    fn test_multibyte_safe() {
        assert_eq!(mask("joão@exemplo.br"), "jo****br");
        assert_eq!(mask_opt(None), "-");
    }
}
