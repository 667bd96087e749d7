mod common;
use common::MemoryLink;

use lechat::decoder::{read_signal, ControlSignal};

fn decode_one(script: &[u8]) -> Option<ControlSignal> {
    let mut link = MemoryLink::with_script(script);
    read_signal(&mut link).expect("decode failed")
}

#[test]
fn test_printable_bytes_decode_as_chars() {
    assert_eq!(decode_one(b"A"), Some(ControlSignal::Char(b'A')));
    assert_eq!(decode_one(b" "), Some(ControlSignal::Char(b' ')));
    assert_eq!(decode_one(b"~"), Some(ControlSignal::Char(b'~')));
}

#[test]
fn test_function_key_sequences() {
    assert_eq!(decode_one(&[0x13, 0x41]), Some(ControlSignal::Submit));
    assert_eq!(decode_one(&[0x13, 0x47]), Some(ControlSignal::EraseLast));
    assert_eq!(decode_one(&[0x13, 0x46]), Some(ControlSignal::ReturnToMenu));
    assert_eq!(decode_one(&[0x13, 0x43]), Some(ControlSignal::Repeat));
    assert_eq!(decode_one(&[0x13, 0x48]), Some(ControlSignal::Continue));
}

#[test]
fn test_power_off_byte_decodes_unconditionally() {
    assert_eq!(decode_one(&[0x00]), Some(ControlSignal::PowerOff));
}

#[test]
fn test_power_off_short_circuits_a_pending_sequence() {
    // 0x00 arriving where the discriminator should be still wins.
    assert_eq!(decode_one(&[0x13, 0x00]), Some(ControlSignal::PowerOff));
}

#[test]
fn test_unknown_discriminator_is_discarded() {
    assert_eq!(decode_one(&[0x13, 0x42]), None); // Retour: not mapped
    assert_eq!(decode_one(&[0x13, 0x7A]), None);
}

#[test]
fn test_unprintable_bytes_are_discarded() {
    assert_eq!(decode_one(&[0x01]), None);
    assert_eq!(decode_one(&[0x0A]), None);
    assert_eq!(decode_one(&[0x1B]), None);
    assert_eq!(decode_one(&[0x7F]), None);
}

#[test]
fn test_empty_poll_is_not_an_error() {
    let mut link = MemoryLink::new();
    assert_eq!(read_signal(&mut link).expect("poll failed"), None);
}

#[test]
fn test_orphan_prefix_gives_up_silently() {
    // SEP with no discriminator ever arriving: decoder yields control.
    assert_eq!(decode_one(&[0x13]), None);
}

#[test]
fn test_discriminator_may_lag_the_prefix() {
    // An empty poll between the two bytes must not lose the key. The
    // script cannot express a delay, but a discarded byte in between can:
    // here the decoder consumes SEP+Envoi first, then the stray 'x'.
    let mut link = MemoryLink::with_script(&[0x13, 0x41, b'x']);
    assert_eq!(read_signal(&mut link).unwrap(), Some(ControlSignal::Submit));
    assert_eq!(read_signal(&mut link).unwrap(), Some(ControlSignal::Char(b'x')));
}
