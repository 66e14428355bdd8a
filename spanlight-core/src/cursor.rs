/// Keyboard cursor over a field's text, in logical lines
///
/// Offsets are char offsets into the whole text, matching span offsets.
#[derive(Debug, Clone)]
pub struct CursorState {
    pub row: usize,
    pub col: usize,
    /// Char offset where each line starts
    line_starts: Vec<usize>,
    /// Lines of content, without their newline
    lines: Vec<Vec<char>>,
}

impl CursorState {
    pub fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            line_starts: vec![0],
            lines: vec![Vec::new()],
        }
    }

    /// Load content and compute line offsets
    pub fn set_content(&mut self, content: &str) {
        self.lines = content.split('\n').map(|line| line.chars().collect()).collect();
        self.line_starts.clear();

        let mut start = 0;
        for line in &self.lines {
            self.line_starts.push(start);
            start += line.len() + 1;
        }

        self.row = 0;
        self.col = 0;
    }

    /// Get current cursor position as (row, col)
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Char offset of the cursor
    pub fn offset(&self) -> usize {
        self.cursor_to_offset(self.row, self.col)
    }

    /// Convert (row, col) to char offset, clamping to the content
    pub fn cursor_to_offset(&self, row: usize, col: usize) -> usize {
        let row = row.min(self.lines.len() - 1);
        self.line_starts[row] + col.min(self.line_len(row))
    }

    /// Convert char offset to (row, col)
    pub fn offset_to_cursor(&self, offset: usize) -> (usize, usize) {
        for (i, &start) in self.line_starts.iter().enumerate().rev() {
            if offset >= start {
                return (i, (offset - start).min(self.line_len(i)));
            }
        }
        (0, 0)
    }

    /// Set cursor to char offset
    pub fn set_cursor_offset(&mut self, offset: usize) {
        let (row, col) = self.offset_to_cursor(offset);
        self.row = row;
        self.col = col;
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map(Vec::len).unwrap_or(0)
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            // Move to end of previous line
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            // Move to start of next line
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_to_start(&mut self) {
        self.col = 0;
    }

    pub fn move_to_end(&mut self) {
        self.col = self.line_len(self.row);
    }

    pub fn move_to_top(&mut self) {
        self.row = 0;
        self.col = 0;
    }

    pub fn move_to_bottom(&mut self) {
        self.row = self.lines.len() - 1;
        self.col = 0;
    }

    pub fn move_word_forward(&mut self) {
        let chars = &self.lines[self.row];
        let mut col = self.col;

        // Skip current word, then the whitespace after it
        while col < chars.len() && !chars[col].is_whitespace() {
            col += 1;
        }
        while col < chars.len() && chars[col].is_whitespace() {
            col += 1;
        }

        if col >= chars.len() && self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        } else {
            self.col = col;
        }
    }

    pub fn move_word_back(&mut self) {
        if self.col == 0 {
            if self.row > 0 {
                self.row -= 1;
                self.col = self.line_len(self.row);
            }
            return;
        }

        let chars = &self.lines[self.row];
        let mut col = self.col.min(chars.len());
        while col > 0 && chars[col - 1].is_whitespace() {
            col -= 1;
        }
        while col > 0 && !chars[col - 1].is_whitespace() {
            col -= 1;
        }
        self.col = col;
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_movement() {
        let mut cursor = CursorState::new();
        cursor.set_content("Hello\nWorld\nTest");

        assert_eq!(cursor.cursor(), (0, 0));

        cursor.move_down();
        assert_eq!(cursor.cursor(), (1, 0));

        cursor.move_right();
        cursor.move_right();
        assert_eq!(cursor.cursor(), (1, 2));

        cursor.move_up();
        assert_eq!(cursor.cursor(), (0, 2));
    }

    #[test]
    fn test_offsets_count_chars() {
        let mut cursor = CursorState::new();
        cursor.set_content("Héllo\nWörld");

        assert_eq!(cursor.cursor_to_offset(0, 5), 5);
        assert_eq!(cursor.cursor_to_offset(1, 0), 6);
        assert_eq!(cursor.cursor_to_offset(1, 5), 11);
        assert_eq!(cursor.cursor_to_offset(1, 50), 11);

        assert_eq!(cursor.offset_to_cursor(6), (1, 0));
        assert_eq!(cursor.offset_to_cursor(8), (1, 2));
    }

    #[test]
    fn test_word_motion() {
        let mut cursor = CursorState::new();
        cursor.set_content("one two  three");

        cursor.move_word_forward();
        assert_eq!(cursor.offset(), 4);
        cursor.move_word_forward();
        assert_eq!(cursor.offset(), 9);
        cursor.move_word_back();
        assert_eq!(cursor.offset(), 4);
    }
}
