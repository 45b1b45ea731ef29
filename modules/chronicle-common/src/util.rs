/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// URL-safe slug: lowercase ASCII alphanumerics joined by single hyphens.
///
/// Apostrophes are dropped rather than turned into separators, so
/// "Hannibal's Oath" becomes `hannibals-oath`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else if ch == '\'' || ch == '\u{2019}' {
            continue;
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Canonical matching key for a title: lowercase with every
/// non-alphanumeric character removed.
pub fn title_key(title: &str) -> String {
    title
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Human-readable year: negative years render as BCE.
pub fn format_year(year: i32) -> String {
    if year < 0 {
        format!("{} BCE", year.unsigned_abs())
    } else {
        year.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_truncate_within_bounds() {
        assert_eq!(truncate_to_char_boundary("Hello", 100), "Hello");
    }

    #[test]
    fn slugify_collapses_punctuation_runs() {
        assert_eq!(slugify("Battle of Cannae"), "battle-of-cannae");
        assert_eq!(slugify("  The Fall -- of Rome (476)  "), "the-fall-of-rome-476");
        assert_eq!(slugify("Hannibal's Oath"), "hannibals-oath");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn title_key_ignores_case_spacing_and_punctuation() {
        assert_eq!(title_key("Battle of Cannae"), "battleofcannae");
        assert_eq!(
            title_key("the Battle of Cannae (216 BCE)"),
            "thebattleofcannae216bce"
        );
        assert_eq!(title_key("  "), "");
    }

    #[test]
    fn format_year_marks_bce() {
        assert_eq!(format_year(-216), "216 BCE");
        assert_eq!(format_year(1066), "1066");
    }
}
