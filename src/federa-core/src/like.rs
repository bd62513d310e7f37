//! SQL `LIKE` pattern matching.

/// Match `text` against a SQL `LIKE` pattern.
///
/// `%` matches any sequence of characters, `_` exactly one, and `\` escapes
/// the following character. Matching is case-sensitive.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_impl(&text, &pattern)
}

fn like_match_impl(s: &[char], p: &[char]) -> bool {
    let Some((&head, rest)) = p.split_first() else {
        return s.is_empty();
    };

    match head {
        '%' => {
            // Collapse runs of '%' before trying every split point
            let rest = rest
                .iter()
                .position(|&c| c != '%')
                .map_or(&rest[rest.len()..], |i| &rest[i..]);
            (0..=s.len()).any(|i| like_match_impl(&s[i..], rest))
        }
        '_' => !s.is_empty() && like_match_impl(&s[1..], rest),
        '\\' if !rest.is_empty() => {
            !s.is_empty() && s[0] == rest[0] && like_match_impl(&s[1..], &rest[1..])
        }
        c => !s.is_empty() && s[0] == c && like_match_impl(&s[1..], rest),
    }
}
