//! Byte-range patching of immutable source text.
//!
//! All offsets refer to the original text. Callers collect replacements in
//! one pass and apply them together, so earlier patches never shift the
//! offsets of later ones.

/// One patch: replace `source[start..end]` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Text written in place of the range.
    pub text: String,
}

impl Replacement {
    /// Create a replacement for `start..end`.
    #[must_use]
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Apply `replacements` to `source`.
///
/// # Panics
///
/// Panics if the replacements are not sorted by start offset, overlap, fall
/// outside `source`, or split a UTF-8 character. Those are bugs in the
/// caller, never properties of user input.
#[must_use]
pub fn apply(source: &str, replacements: &[Replacement]) -> String {
    let extra: usize = replacements.iter().map(|r| r.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;

    for r in replacements {
        assert!(
            r.start >= cursor && r.start <= r.end && r.end <= source.len(),
            "malformed replacement {}..{} (previous end {cursor}, source length {})",
            r.start,
            r.end,
            source.len()
        );
        assert!(
            source.is_char_boundary(r.start) && source.is_char_boundary(r.end),
            "replacement {}..{} splits a character",
            r.start,
            r.end
        );

        out.push_str(&source[cursor..r.start]);
        out.push_str(&r.text);
        cursor = r.end;
    }

    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_disjoint_replacements() {
        let out = apply(
            "abcdef",
            &[Replacement::new(1, 2, "X"), Replacement::new(4, 5, "Y")],
        );
        assert_eq!(out, "aXcdYf");
    }

    #[test]
    fn test_growing_and_shrinking_replacements() {
        let out = apply(
            "import a from 'vue'; import b from 'x';",
            &[Replacement::new(15, 18, "/@modules/vue"), Replacement::new(36, 37, "")],
        );
        assert_eq!(out, "import a from '/@modules/vue'; import b from '';");
    }

    #[test]
    fn test_adjacent_and_edge_replacements() {
        let out = apply(
            "abc",
            &[
                Replacement::new(0, 1, "<"),
                Replacement::new(1, 2, "-"),
                Replacement::new(3, 3, ">"),
            ],
        );
        assert_eq!(out, "<-c>");
    }

    #[test]
    fn test_no_replacements_copies_source() {
        assert_eq!(apply("unchanged", &[]), "unchanged");
    }

    #[test]
    #[should_panic(expected = "malformed replacement")]
    fn test_overlapping_replacements_panic() {
        let _ = apply(
            "abcdef",
            &[Replacement::new(1, 4, "X"), Replacement::new(3, 5, "Y")],
        );
    }

    #[test]
    #[should_panic(expected = "malformed replacement")]
    fn test_unsorted_replacements_panic() {
        let _ = apply(
            "abcdef",
            &[Replacement::new(4, 5, "Y"), Replacement::new(1, 2, "X")],
        );
    }

    #[test]
    #[should_panic(expected = "malformed replacement")]
    fn test_out_of_bounds_panics() {
        let _ = apply("abc", &[Replacement::new(2, 9, "X")]);
    }

    #[test]
    #[should_panic(expected = "splits a character")]
    fn test_char_boundary_panics() {
        let _ = apply("é", &[Replacement::new(1, 2, "X")]);
    }
}
