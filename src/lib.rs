// 3615 LeChat
//
// Bridges a Minitel videotex terminal, dialed over a slow serial link, to
// a locally hosted language model. The terminal never reports its cursor
// position, so all screen accounting is replicated in software.

pub mod decoder;
pub mod link;
pub mod minitel;
pub mod ollama;
pub mod pager;
pub mod screen;
pub mod session;

pub use decoder::ControlSignal;
pub use link::{Link, SerialLink};
pub use minitel::{Interrupt, LineRead, Minitel};
pub use ollama::{ModelBackend, ModelRequest, OllamaClient};
pub use pager::{ChatHeader, Paged, Pager};
pub use screen::Screen;
pub use session::{run_session, SessionConfig, SessionEnd};
