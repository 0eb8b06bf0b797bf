use crate::error::ControllerError;

/// Editable field content plus a single cursor.
///
/// Every mutator updates text and cursor together, so a reader holding
/// `&TextBuffer` never sees one without the other. The cursor is a char index
/// (0 = before the first char) and always satisfies `cursor <= len()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns (before_cursor, cursor_char, after_cursor) for styled rendering.
    /// When cursor is at end of text, cursor_char is None.
    pub fn render_parts(&self) -> (&str, Option<char>, &str) {
        let byte_offset = self.char_to_byte(self.cursor);
        match self.text[byte_offset..].chars().next() {
            Some(ch) => {
                let next_byte = byte_offset + ch.len_utf8();
                (&self.text[..byte_offset], Some(ch), &self.text[next_byte..])
            }
            None => (&self.text, None, ""),
        }
    }

    pub fn insert(&mut self, ch: char) {
        let byte_offset = self.char_to_byte(self.cursor);
        self.text.insert(byte_offset, ch);
        self.cursor += 1;
    }

    /// Removes the char before the cursor. Returns false (and leaves the
    /// buffer untouched) when the cursor is at the start.
    pub fn delete_before_cursor(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let byte_offset = self.char_to_byte(self.cursor - 1);
        if let Some(ch) = self.text[byte_offset..].chars().next() {
            self.text
                .replace_range(byte_offset..byte_offset + ch.len_utf8(), "");
        }
        self.cursor -= 1;
        true
    }

    /// Empties the buffer. Returns false if it was already empty.
    pub fn clear(&mut self) -> bool {
        if self.text.is_empty() && self.cursor == 0 {
            return false;
        }
        self.text.clear();
        self.cursor = 0;
        true
    }

    /// Places the cursor at `pos`. Out-of-range positions are clamped to the
    /// end of the text; the clamp is reported as `InvalidCursorState` but the
    /// cursor has already been moved when the error is returned.
    pub fn set_cursor(&mut self, pos: usize) -> Result<(), ControllerError> {
        let len = self.len();
        if pos > len {
            self.cursor = len;
            return Err(ControllerError::InvalidCursorState {
                requested: pos,
                len,
            });
        }
        self.cursor = pos;
        Ok(())
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.len();
    }

    /// Convert char index to byte offset.
    fn char_to_byte(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }
}
