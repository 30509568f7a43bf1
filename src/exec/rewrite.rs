//! Cross-dialect placeholder rewriting
//!
//! Some engines take `?` positional markers instead of `$n`. The rewrite
//! touches statement text only; argument lists are already positional
//! and stay as they are.

/// Rewrites every `$n` placeholder in the statement to `?`.
///
/// A `$` not followed by a digit is left alone, so literal dollar signs
/// inside identifiers survive.
pub fn rewrite_cross_update(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            while chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                chars.next();
            }
            out.push('?');
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_each_placeholder_once() {
        let sql = "UPDATE accounts SET owner = $1, balance = $2 WHERE id = $3";
        assert_eq!(
            rewrite_cross_update(sql),
            "UPDATE accounts SET owner = ?, balance = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_multi_digit_placeholders_collapse() {
        assert_eq!(rewrite_cross_update("a = $10 AND b = $11"), "a = ? AND b = ?");
    }

    #[test]
    fn test_bare_dollar_is_preserved() {
        assert_eq!(rewrite_cross_update("price$ = $1"), "price$ = ?");
    }

    #[test]
    fn test_no_placeholders_is_identity() {
        assert_eq!(rewrite_cross_update("DELETE FROM t"), "DELETE FROM t");
    }
}
