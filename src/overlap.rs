//! Overlap aligner: finds the span a model re-emitted when resuming a
//! truncated file, so the reassembler can drop it exactly once.
//!
//! A model continuing a cut-off file often repeats some trailing context
//! from the previous part before writing new content. The repeated span has
//! unknown, variable length and may start mid-line, so alignment is a
//! greedy maximal exact suffix/prefix match over a bounded window.

use crate::config::OverlapConfig;

/// A part annotated with how many leading bytes to drop before appending.
/// The first part of a file always has `trim_prefix_len == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPart {
    pub trim_prefix_len: usize,
}

/// Length in bytes of the longest exact overlap between the tail of `prev`
/// and the head of `next`, searched from `max_window` down to `min_len`.
///
/// Comparison is exact, byte for byte, whitespace and line endings
/// included: normalizing would corrupt files where whitespace matters.
/// Candidates that would split a UTF-8 code point are skipped. Returns 0
/// when nothing matches, the common case when the model split cleanly at a
/// line boundary.
pub fn find_overlap(prev: &str, next: &str, cfg: &OverlapConfig) -> usize {
    let cap = prev.len().min(next.len()).min(cfg.max_window);
    let floor = cfg.min_len.max(1);

    // Greedy maximal: a shorter accidental match nested inside the true
    // overlap must not win and leave a partial duplicate behind.
    for len in (floor..=cap).rev() {
        if !next.is_char_boundary(len) || !prev.is_char_boundary(prev.len() - len) {
            continue;
        }
        if prev[prev.len() - len..] == next[..len] {
            return len;
        }
    }
    0
}

/// Compute trim lengths for an ordered part list. Each part after the first
/// is aligned against the *accumulated* content so far, not just the
/// immediately preceding part, since an overlap can reach back across a
/// short part.
pub fn align_parts(parts: &[&str], cfg: &OverlapConfig) -> Vec<AlignedPart> {
    let mut aligned = Vec::with_capacity(parts.len());
    let mut accumulated = String::new();

    for (i, part) in parts.iter().enumerate() {
        let trim = if i == 0 {
            0
        } else {
            find_overlap(&accumulated, part, cfg)
        };
        aligned.push(AlignedPart {
            trim_prefix_len: trim,
        });
        accumulated.push_str(&part[trim..]);
    }

    aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> OverlapConfig {
        OverlapConfig::default()
    }

    #[test]
    fn exact_overlap_found() {
        assert_eq!(find_overlap("abcdef", "defghi", &cfg()), 3);
        assert_eq!(find_overlap("    return 1\n", "    return 1\n\ndef bar():\n", &cfg()), 13);
    }

    #[test]
    fn no_overlap_returns_zero() {
        assert_eq!(find_overlap("abc\n", "def\n", &cfg()), 0);
        assert_eq!(find_overlap("", "anything", &cfg()), 0);
        assert_eq!(find_overlap("anything", "", &cfg()), 0);
    }

    #[test]
    fn short_coincidental_match_ignored() {
        // "n" suffix == "n" prefix, but 1-2 byte matches are noise.
        assert_eq!(find_overlap("fn main\n", "n was the answer", &cfg()), 0);
    }

    #[test]
    fn greedy_maximal_wins_over_nested_match() {
        // Suffix "aba" matches prefix "aba"; the shorter "a" must not win.
        assert_eq!(find_overlap("xxaba", "abayy", &cfg()), 3);
    }

    #[test]
    fn window_caps_the_search() {
        let big = "z".repeat(1000);
        let cfg = OverlapConfig {
            max_window: 100,
            min_len: 3,
        };
        // True overlap is 1000 bytes but the window only admits 100.
        assert_eq!(find_overlap(&big, &big, &cfg), 100);
    }

    #[test]
    fn comparison_is_whitespace_exact() {
        assert_eq!(find_overlap("end \n", "end\n more", &cfg()), 0);
    }

    #[test]
    fn utf8_boundaries_respected() {
        // 'é' is two bytes; candidates splitting it are skipped, and the
        // full three-byte overlap " é" is still found.
        let prev = "caf\u{e9} \u{e9}";
        let next = " \u{e9} au lait";
        let found = find_overlap(prev, next, &cfg());
        assert_eq!(found, 3);
        assert!(next.is_char_boundary(found));
    }

    #[test]
    fn first_part_never_trimmed() {
        let aligned = align_parts(&["abcdef", "defghi"], &cfg());
        assert_eq!(aligned[0].trim_prefix_len, 0);
        assert_eq!(aligned[1].trim_prefix_len, 3);
    }

    #[test]
    fn alignment_uses_accumulated_content() {
        // Part 3's overlap reaches back past the short part 2.
        let p1 = "line one\nline two\n";
        let p2 = "tail";
        let p3 = "two\ntail and more\n";
        let aligned = align_parts(&[p1, p2, p3], &cfg());
        assert_eq!(aligned[2].trim_prefix_len, "two\ntail".len());
    }

    #[test]
    fn clean_split_alignment_is_zero() {
        let aligned = align_parts(&["first half\n", "second half\n"], &cfg());
        assert_eq!(aligned[1].trim_prefix_len, 0);
    }
}
