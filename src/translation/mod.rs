use std::borrow::Cow;

mod scanner;

use scanner::keyword_at;

/// The only placeholder form accepted from callers.
pub const PORTABLE_PLACEHOLDER: char = '?';

/// Rewrite portable SQL into the text actually submitted to the backend.
///
/// Applies [`translate_placeholders`] first and [`rewrite_like`] second. Feeding the
/// result back through again is not supported.
///
/// ```rust
/// use catalog_sql::translation::translate;
///
/// let sql = translate("SELECT * FROM t WHERE x = ? AND y LIKE ?");
/// assert_eq!(sql, "SELECT * FROM t WHERE x = $1 AND y SIMILAR TO $2");
/// ```
#[must_use]
pub fn translate(sql: &str) -> Cow<'_, str> {
    match translate_placeholders(sql) {
        Cow::Borrowed(untouched) => rewrite_like(untouched),
        Cow::Owned(numbered) => Cow::Owned(rewrite_like(&numbered).into_owned()),
    }
}

/// Replace every `?` with `$1`, `$2`, ... in left-to-right order.
///
/// Numbering is per occurrence, not per distinct value, and quoted text is not
/// special-cased: catalog SQL never carries a literal `?`.
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn translate_placeholders(sql: &str) -> Cow<'_, str> {
    if !sql.contains(PORTABLE_PLACEHOLDER) {
        return Cow::Borrowed(sql);
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = 1usize;
    for piece in sql.split_inclusive(PORTABLE_PLACEHOLDER) {
        match piece.strip_suffix(PORTABLE_PLACEHOLDER) {
            Some(head) => {
                out.push_str(head);
                out.push('$');
                out.push_str(&next.to_string());
                next += 1;
            }
            None => out.push_str(piece),
        }
    }
    Cow::Owned(out)
}

/// Rewrite the standalone keyword `LIKE` (any case) to `SIMILAR TO`.
///
/// The replacement follows the case of the keyword's first letter; the surrounding
/// text is copied through untouched. Words that merely contain "like", such as
/// `UNLIKELY` or `ILIKE`, are left alone.
#[must_use]
pub fn rewrite_like(sql: &str) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        if (bytes[idx] == b'l' || bytes[idx] == b'L') && keyword_at(bytes, idx, b"like") {
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 16));
            buf.push_str(&sql[copied_to..idx]);
            buf.push_str(if bytes[idx] == b'l' {
                "similar to"
            } else {
                "SIMILAR TO"
            });
            idx += 4;
            copied_to = idx;
        } else {
            idx += 1;
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_left_to_right() {
        let res = translate_placeholders("insert into r_coll_main values (?, ?, ?)");
        assert_eq!(res, "insert into r_coll_main values ($1, $2, $3)");
    }

    #[test]
    fn repeated_markers_get_fresh_numbers() {
        let res = translate_placeholders("select 1 where a = ? or b = ? or a = ?");
        assert_eq!(res, "select 1 where a = $1 or b = $2 or a = $3");
    }

    #[test]
    fn adjacent_and_trailing_markers() {
        assert_eq!(translate_placeholders("??"), "$1$2");
        assert_eq!(translate_placeholders("x=?"), "x=$1");
        assert_eq!(translate_placeholders("?"), "$1");
    }

    #[test]
    fn no_question_mark_left_for_many_markers() {
        let sql = "select ?".to_string() + &", ?".repeat(11);
        let res = translate_placeholders(&sql);
        assert!(!res.contains('?'));
        let expected: Vec<String> = (1..=12).map(|n| format!("${n}")).collect();
        assert_eq!(res, format!("select {}", expected.join(", ")));
    }

    #[test]
    fn untouched_sql_is_borrowed() {
        let sql = "select coll_id from r_coll_main";
        assert!(matches!(translate_placeholders(sql), Cow::Borrowed(_)));
        assert!(matches!(rewrite_like(sql), Cow::Borrowed(_)));
        assert!(matches!(translate(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn like_is_rewritten_in_either_case() {
        assert_eq!(
            rewrite_like("where a LIKE 'x%' and b like 'y%'"),
            "where a SIMILAR TO 'x%' and b similar to 'y%'"
        );
        assert_eq!(rewrite_like("where a Like $1"), "where a SIMILAR TO $1");
    }

    #[test]
    fn like_inside_words_is_not_rewritten() {
        let sql = "select unlikely, likes, ilike_col, dislike from t where a ILIKE $1";
        assert_eq!(rewrite_like(sql), sql);
    }

    #[test]
    fn like_at_edges_and_next_to_punctuation() {
        assert_eq!(rewrite_like("like"), "similar to");
        assert_eq!(rewrite_like("(a)LIKE(b)"), "(a)SIMILAR TO(b)");
        assert_eq!(rewrite_like("a NOT LIKE\n$1"), "a NOT SIMILAR TO\n$1");
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            translate("select 'é' where name like ? and n = ?"),
            "select 'é' where name similar to $1 and n = $2"
        );
    }

    #[test]
    fn full_translation_matches_backend_syntax() {
        assert_eq!(
            translate("SELECT * FROM t WHERE x = ? AND y LIKE ?"),
            "SELECT * FROM t WHERE x = $1 AND y SIMILAR TO $2"
        );
    }
}
