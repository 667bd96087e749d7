// Minitel device handle
//
// Owns the serial link and the software cursor. Everything written to the
// device goes through one of two operations: send_raw for control byte
// sequences and send_text for payload text, which is filtered down to the
// 7-bit set the device can display.

use crate::decoder::{read_signal, ControlSignal};
use crate::link::Link;
use crate::screen::Screen;
use anyhow::Result;

// Videotex control codes (CEPT2).
pub const CLEAR_SCREEN: &[u8] = b"\x0C";
pub const CURSOR_HOME: &[u8] = b"\x1E";
pub const BEEP: &[u8] = b"\x07";
pub const GREEN_TEXT: &[u8] = b"\x1B\x42";
pub const CYAN_TEXT: &[u8] = b"\x1B\x46";
pub const WHITE_TEXT: &[u8] = b"\x1B\x47";
pub const BOLD_TEXT: &[u8] = b"\x1B\x45";

/// Backspace, space, backspace: visually erases one cell.
pub const ERASE_CELL: &[u8] = b"\x08 \x08";

/// Why an input or output operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Repetition key: restart the session from the power-on wait.
    Reset,
    /// Device powered off or disconnected: shut down.
    PowerOff,
}

/// Outcome of collecting one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// Envoi pressed: the completed line.
    Line(String),
    /// Sommaire pressed: back to the chat menu.
    Menu,
    Interrupted(Interrupt),
}

pub struct Minitel<L: Link> {
    link: L,
    pub screen: Screen,
}

impl<L: Link> Minitel<L> {
    pub fn new(link: L) -> Self {
        Minitel {
            link,
            screen: Screen::new(),
        }
    }

    pub fn with_screen(link: L, screen: Screen) -> Self {
        Minitel { link, screen }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Write a raw control sequence. The caller is responsible for any
    /// cursor accounting (most control codes do not move the cursor).
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.link.send(bytes)
    }

    /// Write payload text: each character is filtered to the displayable
    /// 7-bit set and the cursor counters advance exactly as the device's
    /// own cursor will. Embedded '\n' becomes CR+LF.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            if ch == '\n' {
                self.newline()?;
                continue;
            }
            for &b in to_videotex(ch).as_bytes() {
                self.put_byte(b)?;
            }
        }
        Ok(())
    }

    /// Emit one displayable byte and account for the cell it occupies.
    pub fn put_byte(&mut self, b: u8) -> Result<()> {
        self.link.send(&[b])?;
        self.screen.advance();
        Ok(())
    }

    /// Send CR+LF and mirror it in the counters.
    pub fn newline(&mut self) -> Result<()> {
        self.link.send(b"\r\n")?;
        self.screen.newline();
        Ok(())
    }

    /// Absolute cursor move. Row 1-24, column 1-40; the device wants each
    /// coordinate offset by 0x1F.
    pub fn move_cursor(&mut self, row: usize, col: usize) -> Result<()> {
        let seq = [0x1B, 0x59, (row as u8) + 0x1F, (col as u8) + 0x1F];
        self.link.send(&seq)?;
        self.screen.set_position(row, col);
        Ok(())
    }

    pub fn clear_screen(&mut self) -> Result<()> {
        self.link.send(CLEAR_SCREEN)?;
        self.screen.home();
        Ok(())
    }

    pub fn beep(&mut self) -> Result<()> {
        self.link.send(BEEP)
    }

    pub fn clear_input(&mut self) -> Result<()> {
        self.link.clear_input()
    }

    /// One decode step against the link.
    pub fn read_signal(&mut self) -> Result<Option<ControlSignal>> {
        read_signal(&mut self.link)
    }

    /// Collect one line of input, blocking (in the polling sense) until
    /// Envoi or an aborting key.
    ///
    /// The Minitel echoes typed characters locally, so nothing is written
    /// back per keystroke; only the cursor counters are updated, which
    /// keeps the pager's accounting right even while the user types.
    pub fn collect_line(&mut self) -> Result<LineRead> {
        let mut buffer = String::new();
        loop {
            let signal = match self.read_signal()? {
                Some(s) => s,
                None => continue,
            };
            match signal {
                ControlSignal::Char(b) => {
                    buffer.push(b as char);
                    self.screen.advance();
                }
                ControlSignal::EraseLast => {
                    // Erasing an empty buffer is a no-op.
                    if buffer.pop().is_some() {
                        self.send_raw(ERASE_CELL)?;
                        self.screen.step_back();
                    }
                }
                ControlSignal::Submit => {
                    self.newline()?;
                    return Ok(LineRead::Line(buffer));
                }
                ControlSignal::ReturnToMenu => {
                    self.newline()?;
                    return Ok(LineRead::Menu);
                }
                ControlSignal::Repeat => {
                    return Ok(LineRead::Interrupted(Interrupt::Reset));
                }
                ControlSignal::PowerOff => {
                    return Ok(LineRead::Interrupted(Interrupt::PowerOff));
                }
                ControlSignal::Continue => {
                    // Suite has no meaning while typing.
                }
            }
        }
    }
}

/// Reduce a character to what the videotex display can show: pass the
/// printable 7-bit range, fold common French accents to their base
/// letter, drop everything else.
pub fn to_videotex(ch: char) -> &'static str {
    // Static str return lets "œ" expand to two cells.
    match ch {
        '\u{20}'..='\u{7E}' => {
            const ASCII: &str = " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";
            let idx = ch as usize - 0x20;
            &ASCII[idx..idx + 1]
        }
        'à' | 'â' | 'ä' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'î' | 'ï' => "i",
        'ô' | 'ö' => "o",
        'ù' | 'û' | 'ü' => "u",
        'ç' => "c",
        'À' | 'Â' | 'Ä' => "A",
        'É' | 'È' | 'Ê' | 'Ë' => "E",
        'Î' | 'Ï' => "I",
        'Ô' | 'Ö' => "O",
        'Ù' | 'Û' | 'Ü' => "U",
        'Ç' => "C",
        'œ' => "oe",
        'Œ' => "OE",
        '’' | '‘' => "'",
        '“' | '”' | '«' | '»' => "\"",
        '…' => "...",
        '—' | '–' => "-",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(to_videotex('A'), "A");
        assert_eq!(to_videotex(' '), " ");
        assert_eq!(to_videotex('~'), "~");
    }

    #[test]
    fn test_accents_fold_to_base_letters() {
        assert_eq!(to_videotex('é'), "e");
        assert_eq!(to_videotex('à'), "a");
        assert_eq!(to_videotex('ç'), "c");
        assert_eq!(to_videotex('É'), "E");
        assert_eq!(to_videotex('œ'), "oe");
    }

    #[test]
    fn test_undisplayable_is_dropped() {
        assert_eq!(to_videotex('\u{7F}'), "");
        assert_eq!(to_videotex('中'), "");
        assert_eq!(to_videotex('\t'), "");
    }
}
