#![allow(dead_code)]

// Shared test doubles: an in-memory serial link driven by a byte script,
// and a model backend that replays canned fragments.

use anyhow::{bail, Result};
use lechat::link::Link;
use lechat::ollama::{FragmentStream, ModelBackend, ModelRequest};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// How many consecutive empty polls the link tolerates before failing the
/// test. Keeps a buggy poll loop from hanging the suite.
const MAX_IDLE_POLLS: usize = 64;

/// Consecutive empty polls before a delayed segment becomes readable,
/// standing in for the time a user spends reading before typing.
const SEGMENT_DELAY_POLLS: usize = 8;

/// In-memory stand-in for the serial port: input comes from a pre-written
/// script, output is captured for assertions.
pub struct MemoryLink {
    input: VecDeque<u8>,
    delayed: VecDeque<Vec<u8>>,
    pub sent: Vec<u8>,
    pub clears: usize,
    idle_polls: usize,
}

impl MemoryLink {
    pub fn new() -> Self {
        MemoryLink {
            input: VecDeque::new(),
            delayed: VecDeque::new(),
            sent: Vec::new(),
            clears: 0,
            idle_polls: 0,
        }
    }

    pub fn with_script(script: &[u8]) -> Self {
        let mut link = Self::new();
        link.feed(script);
        link
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Queue bytes that stay out of reach until the reader has polled
    /// empty a few times, like a line typed after a reply has landed.
    pub fn feed_after_idle(&mut self, bytes: &[u8]) {
        self.delayed.push_back(bytes.to_vec());
    }

    pub fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }
}

impl Link for MemoryLink {
    fn poll_byte(&mut self) -> Result<Option<u8>> {
        match self.input.pop_front() {
            Some(b) => {
                self.idle_polls = 0;
                Ok(Some(b))
            }
            None => {
                self.idle_polls += 1;
                if !self.delayed.is_empty() {
                    if self.idle_polls >= SEGMENT_DELAY_POLLS {
                        if let Some(segment) = self.delayed.pop_front() {
                            self.input.extend(segment);
                        }
                        self.idle_polls = 0;
                    }
                } else if self.idle_polls > MAX_IDLE_POLLS {
                    bail!("input script exhausted");
                }
                Ok(None)
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent.extend_from_slice(bytes);
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        // The script stands in for bytes that are still in flight, so a
        // flush is recorded but does not drop it.
        self.clears += 1;
        Ok(())
    }
}

// Function key sequences as the device sends them.
pub const ENVOI: [u8; 2] = [0x13, 0x41];
pub const REPETITION: [u8; 2] = [0x13, 0x43];
pub const SOMMAIRE: [u8; 2] = [0x13, 0x46];
pub const CORRECTION: [u8; 2] = [0x13, 0x47];
pub const SUITE: [u8; 2] = [0x13, 0x48];
pub const POWER_OFF: [u8; 1] = [0x00];

/// Keystrokes for typing `text` then pressing Envoi.
pub fn type_line(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.extend_from_slice(&ENVOI);
    bytes
}

/// Model backend replaying a fixed fragment list, or failing outright.
pub struct FakeBackend {
    fragments: Vec<String>,
    fail_connect: bool,
    pub calls: Cell<usize>,
    pub last_request: RefCell<Option<ModelRequest>>,
}

impl FakeBackend {
    pub fn with_fragments(fragments: &[&str]) -> Self {
        FakeBackend {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            fail_connect: false,
            calls: Cell::new(0),
            last_request: RefCell::new(None),
        }
    }

    pub fn unreachable() -> Self {
        FakeBackend {
            fragments: Vec::new(),
            fail_connect: true,
            calls: Cell::new(0),
            last_request: RefCell::new(None),
        }
    }
}

impl ModelBackend for FakeBackend {
    fn generate(&self, request: &ModelRequest) -> Result<FragmentStream> {
        self.calls.set(self.calls.get() + 1);
        *self.last_request.borrow_mut() = Some(request.clone());
        if self.fail_connect {
            bail!("connection refused");
        }
        let fragments = self.fragments.clone();
        Ok(Box::new(fragments.into_iter().map(Ok)))
    }
}
