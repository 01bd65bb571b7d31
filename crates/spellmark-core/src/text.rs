//! Text storage behind the reference surface, and token search.

use std::ops::Range;

/// Char-indexed text storage.
///
/// All offsets are in Unicode scalar values (chars), not bytes or UTF-16.
pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Replace char range with text.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    fn to_string(&self) -> String;
}

/// Ropey-backed buffer.
#[derive(Clone, Debug, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

/// Find every non-overlapping, case-sensitive occurrence of `needle`.
///
/// Returned ranges are char offsets into `haystack`, in document order.
pub fn find_occurrences(haystack: &str, needle: &str) -> Vec<Range<usize>> {
    if needle.is_empty() {
        return Vec::new();
    }
    let needle_chars = needle.chars().count();
    let mut found = Vec::new();
    let mut last_byte = 0;
    let mut last_char = 0;
    for (byte, _) in haystack.match_indices(needle) {
        last_char += haystack[last_byte..byte].chars().count();
        last_byte = byte;
        found.push(last_char..last_char + needle_chars);
    }
    found
}
