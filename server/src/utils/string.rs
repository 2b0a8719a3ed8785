//! String utility functions

/// Byte limit for low-cardinality fields (span and event names)
pub const LOW_CARDINALITY_MAX_BYTES: usize = 200;

/// Byte limit for short display fields (display name, system)
pub const SMALL_MAX_BYTES: usize = 255;

/// Truncate to at most `max` bytes without splitting a UTF-8 character
pub fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate in place to the low-cardinality limit
pub fn trunc_low_cardinality(s: &mut String) {
    let len = truncate_bytes(s, LOW_CARDINALITY_MAX_BYTES).len();
    s.truncate(len);
}

/// Truncate in place to the small-field limit
pub fn trunc_small(s: &mut String) {
    let len = truncate_bytes(s, SMALL_MAX_BYTES).len();
    s.truncate(len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_bytes_short() {
        assert_eq!(truncate_bytes("hello", 10), "hello");
        assert_eq!(truncate_bytes("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_bytes_ascii() {
        assert_eq!(truncate_bytes("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_bytes_multibyte_boundary() {
        // "é" is two bytes, cutting at 2 would split it
        assert_eq!(truncate_bytes("aé", 2), "a");
        assert_eq!(truncate_bytes("aé", 3), "aé");
        assert_eq!(truncate_bytes("日本", 4), "日");
    }

    #[test]
    fn test_trunc_low_cardinality() {
        let mut s = "x".repeat(300);
        trunc_low_cardinality(&mut s);
        assert_eq!(s.len(), LOW_CARDINALITY_MAX_BYTES);
    }

    #[test]
    fn test_trunc_small_keeps_utf8() {
        let mut s = "é".repeat(200);
        trunc_small(&mut s);
        assert!(s.len() <= SMALL_MAX_BYTES);
        assert_eq!(s.len() % 2, 0);
        assert!(s.chars().all(|c| c == 'é'));
    }
}
