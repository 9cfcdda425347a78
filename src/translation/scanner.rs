pub(super) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || !b.is_ascii()
}

/// True when `keyword` (lowercase ASCII) sits at `idx` case-insensitively and is not
/// glued to a neighbouring identifier character on either side.
pub(super) fn keyword_at(bytes: &[u8], idx: usize, keyword: &[u8]) -> bool {
    let end = idx + keyword.len();
    if end > bytes.len() || !bytes[idx..end].eq_ignore_ascii_case(keyword) {
        return false;
    }
    let before_ok = idx == 0 || !is_word_byte(bytes[idx - 1]);
    let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
    before_ok && after_ok
}
