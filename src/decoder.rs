// Function-key and control-byte decoder
//
// The Minitel keyboard sends function keys as two-byte sequences: the SEP
// byte 0x13 followed by one discriminator byte. A lone 0x00 means the
// device was switched off or unplugged and overrides everything else.

use crate::link::Link;
use anyhow::Result;

/// SEP prefix introducing a function key.
pub const SEP: u8 = 0x13;
/// Sent when the Minitel powers off or the line drops.
pub const POWER_OFF_BYTE: u8 = 0x00;

const KEY_ENVOI: u8 = 0x41;
const KEY_RETOUR: u8 = 0x42;
const KEY_REPETITION: u8 = 0x43;
const KEY_GUIDE: u8 = 0x44;
const KEY_ANNULATION: u8 = 0x45;
const KEY_SOMMAIRE: u8 = 0x46;
const KEY_CORRECTION: u8 = 0x47;
const KEY_SUITE: u8 = 0x48;

/// Maximum polls spent waiting for the discriminator after a SEP byte.
/// At 1200 baud the second byte follows within ~8ms, so this is generous.
const SEP_FOLLOW_POLLS: usize = 8;

/// Everything the rest of the program needs to know about one decoded
/// keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Envoi - submit the pending line.
    Submit,
    /// Correction - erase the last character.
    EraseLast,
    /// Sommaire - back to the chat menu.
    ReturnToMenu,
    /// Repetition - restart the whole session.
    Repeat,
    /// Suite - acknowledge a page break.
    Continue,
    /// Device switched off or disconnected.
    PowerOff,
    /// A printable 7-bit character.
    Char(u8),
}

/// Map a SEP discriminator byte to its signal. Unknown keys (Retour,
/// Guide, Annulation, anything else) decode to nothing and are dropped.
pub fn classify_function_key(discriminator: u8) -> Option<ControlSignal> {
    match discriminator {
        KEY_ENVOI => Some(ControlSignal::Submit),
        KEY_CORRECTION => Some(ControlSignal::EraseLast),
        KEY_SOMMAIRE => Some(ControlSignal::ReturnToMenu),
        KEY_REPETITION => Some(ControlSignal::Repeat),
        KEY_SUITE => Some(ControlSignal::Continue),
        KEY_RETOUR | KEY_GUIDE | KEY_ANNULATION => None,
        _ => None,
    }
}

/// One decode step: read at most one keyboard event from the link.
///
/// `Ok(None)` covers both "no byte arrived this poll" and "byte arrived
/// but is noise" (unprintable, unknown function key, orphan SEP). The
/// caller just polls again.
pub fn read_signal<L: Link + ?Sized>(link: &mut L) -> Result<Option<ControlSignal>> {
    let byte = match link.poll_byte()? {
        Some(b) => b,
        None => return Ok(None),
    };

    if byte == POWER_OFF_BYTE {
        return Ok(Some(ControlSignal::PowerOff));
    }

    if byte == SEP {
        // The discriminator can lag by a character time; poll briefly.
        for _ in 0..SEP_FOLLOW_POLLS {
            match link.poll_byte()? {
                Some(POWER_OFF_BYTE) => return Ok(Some(ControlSignal::PowerOff)),
                Some(d) => return Ok(classify_function_key(d)),
                None => continue,
            }
        }
        tracing::debug!("SEP byte with no discriminator, dropped");
        return Ok(None);
    }

    if (0x20..=0x7E).contains(&byte) {
        return Ok(Some(ControlSignal::Char(byte)));
    }

    // Unrecognized control byte: never echoed, never buffered.
    tracing::trace!(byte, "discarding unprintable byte");
    Ok(None)
}
