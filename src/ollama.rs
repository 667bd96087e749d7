// Streaming client for the local Ollama generate API
//
// One exchange is one POST to /api/generate; the body comes back as
// newline-delimited JSON chunks, each carrying a text fragment and a done
// flag. Fragments are pulled one at a time so a slow Minitel naturally
// back-pressures the model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One outbound exchange with the model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Ordered text fragments, ending at the model's done marker. Dropping
/// the iterator early closes the underlying exchange.
pub type FragmentStream = Box<dyn Iterator<Item = Result<String>>>;

/// Seam between the session controller and the model service, so tests
/// can script responses without a network.
pub trait ModelBackend {
    fn generate(&self, request: &ModelRequest) -> Result<FragmentStream>;
}

pub struct OllamaClient {
    agent: ureq::Agent,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(REQUEST_TIMEOUT)
            .timeout_read(REQUEST_TIMEOUT)
            .build();
        OllamaClient {
            agent,
            base_url: base_url.into(),
        }
    }
}

impl ModelBackend for OllamaClient {
    fn generate(&self, request: &ModelRequest) -> Result<FragmentStream> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        tracing::debug!(model = %request.model, "sending generate request");

        let response = self
            .agent
            .post(&url)
            .send_json(request)
            .context("Ollama request failed")?;

        let reader = BufReader::new(response.into_reader());
        Ok(Box::new(Fragments {
            lines: Box::new(reader),
            finished: false,
        }))
    }
}

struct Fragments {
    lines: Box<dyn BufRead>,
    finished: bool,
}

impl Iterator for Fragments {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let mut line = String::new();
            match self.lines.read_line(&mut line) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e).context("reading model stream"));
                }
            }
            if line.trim().is_empty() {
                continue;
            }
            let chunk: GenerateChunk = match serde_json::from_str(line.trim()) {
                Ok(c) => c,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e).context("malformed model stream chunk"));
                }
            };
            if chunk.done {
                self.finished = true;
            }
            if !chunk.response.is_empty() {
                return Some(Ok(chunk.response));
            }
        }
        None
    }
}
