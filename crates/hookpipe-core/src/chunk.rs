//! Split text into message-sized pieces.
//!
//! The service counts its message limit in characters, so boundaries fall on `char`
//! (code point) boundaries, never inside a UTF-8 sequence. Concatenating the pieces in
//! order reproduces the input exactly.

/// Maximum message length the service accepts, in characters.
pub const MESSAGE_CHAR_LIMIT: usize = 2000;

/// Lazy iterator over consecutive slices of at most `limit` characters.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    limit: usize,
}

impl<'a> Chunks<'a> {
    /// # Panics
    ///
    /// Panics if `limit` is zero.
    pub fn new(text: &'a str, limit: usize) -> Self {
        assert!(limit > 0, "chunk limit must be positive");
        Self { rest: text, limit }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let cut = self
            .rest
            .char_indices()
            .nth(self.limit)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(cut);
        self.rest = tail;
        Some(head)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.rest.is_empty() {
            return (0, Some(0));
        }
        // Each char is 1..=4 bytes.
        let bytes = self.rest.len();
        (
            bytes.div_ceil(4).div_ceil(self.limit),
            Some(bytes.div_ceil(self.limit)),
        )
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

/// Split `text` into chunks of at most `limit` characters. Empty input yields no chunks.
///
/// # Panics
///
/// Panics if `limit` is zero.
pub fn chunk(text: &str, limit: usize) -> Vec<&str> {
    Chunks::new(text, limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", MESSAGE_CHAR_LIMIT).is_empty());
        assert!(chunk("", 1).is_empty());
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        assert_eq!(chunk("hello", MESSAGE_CHAR_LIMIT), vec!["hello"]);
    }

    #[test]
    fn splits_4500_chars_into_2000_2000_500() {
        let text = "x".repeat(4500);
        let lens: Vec<usize> = chunk(&text, 2000)
            .iter()
            .map(|c| c.chars().count())
            .collect();
        assert_eq!(lens, vec![2000, 2000, 500]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let text = "y".repeat(4000);
        let parts = chunk(&text, 2000);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.chars().count() == 2000));
    }

    #[test]
    fn counts_code_points_not_bytes() {
        // Each of these is multi-byte in UTF-8.
        let text = "é€😀".repeat(1000);
        let parts = chunk(&text, 2000);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].chars().count(), 2000);
        assert_eq!(parts[1].chars().count(), 1000);
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn combining_sequences_split_at_code_point_granularity() {
        // "e" + COMBINING ACUTE ACCENT is one grapheme but two code points.
        let text = "e\u{301}e\u{301}";
        assert_eq!(chunk(text, 1), vec!["e", "\u{301}", "e", "\u{301}"]);
    }

    #[test]
    #[should_panic(expected = "chunk limit must be positive")]
    fn zero_limit_panics() {
        let _ = chunk("abc", 0);
    }

    #[test]
    fn size_hint_brackets_actual_count() {
        let text = "ab😀cd".repeat(37);
        let it = Chunks::new(&text, 7);
        let (lo, hi) = it.size_hint();
        let n = it.count();
        assert!(lo <= n && n <= hi.unwrap(), "{lo} <= {n} <= {hi:?}");
    }

    proptest! {
        #[test]
        fn chunks_reassemble_losslessly_within_limit(text in any::<String>(), limit in 1usize..64) {
            let parts = chunk(&text, limit);
            prop_assert_eq!(parts.concat(), text.clone());
            for p in &parts {
                let n = p.chars().count();
                prop_assert!(n >= 1 && n <= limit);
            }
            let total = text.chars().count();
            prop_assert_eq!(parts.len(), total.div_ceil(limit));
        }

        #[test]
        fn only_the_last_chunk_may_be_short(text in "\\PC{0,300}", limit in 1usize..50) {
            let parts = chunk(&text, limit);
            if let Some((_, init)) = parts.split_last() {
                for p in init {
                    prop_assert_eq!(p.chars().count(), limit);
                }
            }
        }
    }
}
