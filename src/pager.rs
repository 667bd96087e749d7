// Display output pagination
//
// Output to the Minitel is an unbounded stream but the screen holds 24
// rows. The pager emits text character by character against the software
// cursor and, whenever the page-break row is reached, parks the cursor on
// the status row, asks for SUITE, and only resumes once the key arrives.

use crate::decoder::ControlSignal;
use crate::link::Link;
use crate::minitel::{Interrupt, Minitel, CYAN_TEXT, WHITE_TEXT};
use crate::screen::STATUS_ROW;
use anyhow::Result;

const CONTINUE_PROMPT: &str = "Appuyez sur SUITE pour continuer";

/// Outcome of an emit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paged {
    Complete,
    Interrupted(Interrupt),
}

/// Standing header redrawn at the top of every chat page.
#[derive(Debug, Clone)]
pub struct ChatHeader {
    pub title: String,
}

impl ChatHeader {
    pub fn new(title: impl Into<String>) -> Self {
        ChatHeader {
            title: title.into(),
        }
    }

    /// Clear the screen and draw the header. Leaves the cursor (and the
    /// counters) on the first content row.
    pub fn draw<L: Link>(&self, term: &mut Minitel<L>) -> Result<()> {
        term.clear_screen()?;
        term.send_raw(CYAN_TEXT)?;
        term.send_text(&format!("--- {} ---\n", self.title))?;
        term.send_raw(WHITE_TEXT)?;
        term.send_text("Posez votre question ci-dessous :\n")?;
        term.send_text(&format!("{}\n", "-".repeat(40)))?;
        Ok(())
    }
}

pub struct Pager<'a, L: Link> {
    term: &'a mut Minitel<L>,
    header: &'a ChatHeader,
}

impl<'a, L: Link> Pager<'a, L> {
    pub fn new(term: &'a mut Minitel<L>, header: &'a ChatHeader) -> Self {
        Pager { term, header }
    }

    /// Emit text through page-break control.
    ///
    /// Splitting a text across multiple calls emits exactly the same
    /// payload bytes as one call: the software cursor is the only state
    /// carried between characters.
    pub fn emit(&mut self, text: &str) -> Result<Paged> {
        for ch in text.chars() {
            if ch == '\n' {
                self.term.newline()?;
                match self.break_if_needed()? {
                    Paged::Complete => {}
                    interrupted => return Ok(interrupted),
                }
            } else {
                for &b in crate::minitel::to_videotex(ch).as_bytes() {
                    self.term.put_byte(b)?;
                    match self.break_if_needed()? {
                        Paged::Complete => {}
                        interrupted => return Ok(interrupted),
                    }
                }
            }
        }
        Ok(Paged::Complete)
    }

    fn break_if_needed(&mut self) -> Result<Paged> {
        if self.term.screen.needs_break() {
            self.wait_for_continue()
        } else {
            Ok(Paged::Complete)
        }
    }

    /// Audible alert, passed through so callers holding the pager can
    /// signal end-of-response or an error.
    pub fn beep(&mut self) -> Result<()> {
        self.term.beep()
    }

    /// Drain whatever the keyboard has queued, acting only on signals
    /// that abort output. Lets a caller streaming text notice a
    /// power-off or reset between emits, not just at page breaks.
    pub fn poll_interrupt(&mut self) -> Result<Option<Interrupt>> {
        while let Some(signal) = self.term.read_signal()? {
            match signal {
                ControlSignal::PowerOff => return Ok(Some(Interrupt::PowerOff)),
                ControlSignal::Repeat => return Ok(Some(Interrupt::Reset)),
                // Typing mid-stream has no meaning, dropped.
                _ => {}
            }
        }
        Ok(None)
    }

    /// Park on the status row, ask for SUITE, then clear and redraw the
    /// header so the remaining text lands on a fresh page.
    fn wait_for_continue(&mut self) -> Result<Paged> {
        self.term.move_cursor(STATUS_ROW, 1)?;
        self.term.send_raw(WHITE_TEXT)?;
        self.term.send_text(CONTINUE_PROMPT)?;

        loop {
            match self.term.read_signal()? {
                Some(ControlSignal::Continue) => break,
                Some(ControlSignal::PowerOff) => {
                    return Ok(Paged::Interrupted(Interrupt::PowerOff));
                }
                Some(ControlSignal::Repeat) => {
                    return Ok(Paged::Interrupted(Interrupt::Reset));
                }
                // Typing, Envoi, Sommaire: meaningless mid-page, ignored.
                Some(_) | None => continue,
            }
        }

        self.header.draw(self.term)?;
        Ok(Paged::Complete)
    }
}
