// Software screen position tracking
//
// The Minitel has no usable reverse channel to report its cursor position,
// so every byte that moves the cursor on the device must be mirrored here
// with the exact same width/height constants. The pager depends on these
// counters being accurate at all times.

/// Screen width in columns (videotex mode).
pub const WIDTH: usize = 40;
/// Screen height in rows.
pub const HEIGHT: usize = 24;
/// Bottom row (1-based) reserved for the "press SUITE" prompt.
pub const STATUS_ROW: usize = 24;
/// Default row at which output pauses for a page break.
pub const DEFAULT_PAGE_BREAK_ROW: usize = 22;

/// Software cursor tracker, mirroring what the physical display does.
///
/// `line` and `col` are 0-based. `col` stays in [0, WIDTH); `line` may
/// reach HEIGHT transiently before the pager intervenes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub line: usize,
    pub col: usize,
    page_break_row: usize,
}

impl Screen {
    pub fn new() -> Self {
        Self::with_page_break(DEFAULT_PAGE_BREAK_ROW)
    }

    pub fn with_page_break(page_break_row: usize) -> Self {
        Screen {
            line: 0,
            col: 0,
            page_break_row,
        }
    }

    /// Account for one printable character echoed or emitted at the
    /// current position. Soft-wraps at the right edge: the device wraps
    /// by itself, no control byte is sent, only the counters move.
    pub fn advance(&mut self) {
        self.col += 1;
        if self.col >= WIDTH {
            self.col = 0;
            self.line += 1;
        }
    }

    /// Account for an explicit CR+LF pair sent to the device.
    pub fn newline(&mut self) {
        self.line += 1;
        self.col = 0;
    }

    /// Account for a one-cell visual erase (backspace, space, backspace).
    /// The device cannot step back across a soft wrap, so neither do we.
    pub fn step_back(&mut self) {
        self.col = self.col.saturating_sub(1);
    }

    /// Counters after a clear-screen / cursor-home.
    pub fn home(&mut self) {
        self.line = 0;
        self.col = 0;
    }

    /// Counters after an absolute cursor move (row/col are 1-based,
    /// matching the device's positioning command).
    pub fn set_position(&mut self, row: usize, col: usize) {
        self.line = row.saturating_sub(1);
        self.col = col.saturating_sub(1);
    }

    /// Counters after a header redraw: content resumes on `line`.
    pub fn reset_to(&mut self, line: usize) {
        self.line = line;
        self.col = 0;
    }

    /// True when the next character would land past the page threshold.
    pub fn needs_break(&self) -> bool {
        self.line >= self.page_break_row
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}
