// 3615 LeChat - a Minitel front-end for a locally hosted language model

use anyhow::Result;
use clap::Parser;
use lechat::link::{scan_ports, SerialLink};
use lechat::minitel::Minitel;
use lechat::ollama::OllamaClient;
use lechat::session::{run_session, SessionConfig, SessionEnd};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "lechat")]
#[command(about = "3615 LeChat - connect a Minitel to a local language model", long_about = None)]
struct Cli {
    /// Serial port of the Minitel (auto-detected if not specified)
    #[arg(long)]
    port: Option<String>,

    /// Baud rate (videotex mode is 1200)
    #[arg(long, default_value_t = 1200)]
    baud: u32,

    /// Base URL of the Ollama server
    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Override the model selected by the service code
    #[arg(long)]
    model: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let port = match cli.port {
        Some(port) => port,
        None => scan_ports()?,
    };

    let link = SerialLink::open(&port, cli.baud)?;
    let mut term = Minitel::new(link);

    let backend = OllamaClient::new(cli.ollama_url);
    let config = SessionConfig {
        model_override: cli.model,
        ..SessionConfig::default()
    };

    // One iteration per session. A reset (Repetition key) restarts from
    // the power-on wait on the same open link.
    loop {
        match run_session(&mut term, &backend, &config)? {
            SessionEnd::Reset => {
                tracing::info!("session reset, starting over");
            }
            SessionEnd::PowerOff => {
                tracing::info!("disconnecting");
                break;
            }
        }
    }

    // `term` drops here, releasing the serial port exactly once.
    Ok(())
}
