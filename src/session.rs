// Session controller
//
// Drives the device through power-on wait, service code, username and the
// chat loop. Session-reset and session-terminate are ordinary return
// values propagated up through the polling loops, never unwinding.

use crate::link::Link;
use crate::minitel::{
    Interrupt, LineRead, Minitel, CURSOR_HOME, CYAN_TEXT, GREEN_TEXT, WHITE_TEXT,
};
use crate::ollama::{ModelBackend, ModelRequest};
use crate::pager::{ChatHeader, Paged, Pager};
use anyhow::Result;
use std::thread;
use std::time::Duration;

/// A dialable service: the code the user types and the model identity
/// behind it.
#[derive(Debug, Clone)]
pub struct Service {
    pub code: String,
    pub title: String,
    pub model: String,
    pub system: String,
}

/// Everything one session needs, built fresh on every reset. No globals.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub services: Vec<Service>,
    pub exit_keyword: String,
    pub clear_keyword: String,
    /// Overrides the service table's model when set (--model).
    pub model_override: Option<String>,
    /// Delay after the first byte from a freshly powered-on device.
    pub power_on_settle: Duration,
    /// Cosmetic pause during the fake dial-up banter.
    pub connect_delay: Duration,
    /// Exact question strings answered without the model.
    pub fixed_responses: Vec<(String, String)>,
}

const SITUATION_RESPONSE: &str = "Mais, vous savez, moi je ne crois pas qu'il y ait de bonne ou de mauvaise situation. Moi, si je devais resumer ma vie aujourd'hui avec vous, je dirais que c'est d'abord des rencontres, des gens qui m'ont tendu la main, peut-etre a un moment ou je ne pouvais pas, ou j'etais seul chez moi. Et c'est assez curieux de se dire que les hasards, les rencontres forgent une destinee... Parce que quand on a le gout de la chose, quand on a le gout de la chose bien faite, le beau geste, parfois on ne trouve pas l'interlocuteur en face, je dirais, le miroir qui vous aide a avancer. Alors ce n'est pas mon cas, comme je le disais la, puisque moi au contraire, j'ai pu ; et je dis merci a la vie, je lui dis merci, je chante la vie, je danse la vie... Je ne suis qu'amour ! Et finalement, quand beaucoup de gens aujourd'hui me disent : STOP pitie";

const DEFAULT_SYSTEM: &str = "Tu es un service Minitel des annees 80. Reponds en francais, en texte brut, sans mise en forme, de facon concise.";

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            services: vec![Service {
                code: "3615 LECHAT".to_string(),
                title: "3615 LeChat".to_string(),
                model: "mistral".to_string(),
                system: DEFAULT_SYSTEM.to_string(),
            }],
            exit_keyword: "exit".to_string(),
            clear_keyword: "clear".to_string(),
            model_override: None,
            power_on_settle: Duration::from_secs(3),
            connect_delay: Duration::from_secs(1),
            fixed_responses: vec![("SITUATION".to_string(), SITUATION_RESPONSE.to_string())],
        }
    }
}

impl SessionConfig {
    fn find_service(&self, code: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.code == code)
    }

    fn find_fixed_response(&self, question: &str) -> Option<&str> {
        self.fixed_responses
            .iter()
            .find(|(key, _)| key == question)
            .map(|(_, answer)| answer.as_str())
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Start over from the power-on wait; the link stays open.
    Reset,
    /// Release the link and stop the process.
    PowerOff,
}

enum State<'a> {
    AwaitPowerOn,
    AwaitServiceCode,
    AwaitUsername { service: &'a Service },
    Chatting { service: &'a Service, username: String },
    ShuttingDown,
}

/// Run one complete session. Returns whenever the session must be torn
/// down, either to restart (Repetition key) or to stop (power-off or the
/// exit keyword).
pub fn run_session<L: Link>(
    term: &mut Minitel<L>,
    backend: &dyn ModelBackend,
    config: &SessionConfig,
) -> Result<SessionEnd> {
    let mut state = State::AwaitPowerOn;

    loop {
        state = match state {
            State::AwaitPowerOn => {
                wait_for_power_on(term, config)?;
                State::AwaitServiceCode
            }

            State::AwaitServiceCode => match prompt_service_code(term, config)? {
                Flow::Next(next) => next,
                Flow::End(end) => return Ok(end),
            },

            State::AwaitUsername { service } => match prompt_username(term, service)? {
                Flow::Next(next) => next,
                Flow::End(end) => return Ok(end),
            },

            State::Chatting { service, username } => {
                match chat_loop(term, backend, config, service, &username)? {
                    Flow::Next(next) => next,
                    Flow::End(end) => return Ok(end),
                }
            }

            State::ShuttingDown => {
                farewell(term)?;
                tracing::info!("session over, powering off");
                return Ok(SessionEnd::PowerOff);
            }
        };
    }
}

enum Flow<'a> {
    Next(State<'a>),
    End(SessionEnd),
}

fn interrupt_end(interrupt: Interrupt) -> SessionEnd {
    match interrupt {
        Interrupt::Reset => SessionEnd::Reset,
        Interrupt::PowerOff => SessionEnd::PowerOff,
    }
}

/// Block until the device sends anything at all, then let it stabilize.
fn wait_for_power_on<L: Link>(term: &mut Minitel<L>, config: &SessionConfig) -> Result<()> {
    tracing::info!("waiting for the Minitel to power on");
    term.clear_input()?;
    loop {
        if let Some(byte) = term.link_mut().poll_byte()? {
            tracing::info!(byte = %format!("{:02x}", byte), "signal received, Minitel ready");
            break;
        }
    }
    thread::sleep(config.power_on_settle);
    term.clear_input()?;
    Ok(())
}

fn prompt_service_code<'a, L: Link>(
    term: &mut Minitel<L>,
    config: &'a SessionConfig,
) -> Result<Flow<'a>> {
    // Explicit reprompt loop; a bad code must never grow the stack.
    // Each retry starts from a clean screen with the full prompt.
    loop {
        term.clear_screen()?;
        term.send_text("Entrez votre requete minitel\n")?;

        let line = match term.collect_line()? {
            LineRead::Line(line) => line,
            LineRead::Menu => continue,
            LineRead::Interrupted(i) => return Ok(Flow::End(interrupt_end(i))),
        };
        let code = line.trim();

        if code.eq_ignore_ascii_case(&config.exit_keyword) {
            return Ok(Flow::Next(State::ShuttingDown));
        }

        if let Some(service) = config.find_service(code) {
            tracing::info!(code = %service.code, model = %service.model, "service selected");
            term.send_text(&format!("\nConnexion au {}...\n", service.title))?;
            thread::sleep(config.connect_delay);
            term.send_text("\nConnexion etablie !\n")?;
            thread::sleep(config.connect_delay / 2);
            return Ok(Flow::Next(State::AwaitUsername { service }));
        }

        tracing::debug!(code, "unknown service code");
        term.send_text("\nNumero inconnu. Veuillez reessayer.\n")?;
        thread::sleep(config.connect_delay);
    }
}

fn prompt_username<'a, L: Link>(
    term: &mut Minitel<L>,
    service: &'a Service,
) -> Result<Flow<'a>> {
    term.clear_screen()?;
    term.send_raw(CYAN_TEXT)?;
    term.send_text(&format!("--- BIENVENUE SUR {} ---\n", service.code))?;
    term.send_raw(WHITE_TEXT)?;
    term.send_text("Veuillez entrer votre nom pour commencer :\n")?;
    term.send_text(&format!("{}\n", "-".repeat(40)))?;
    term.send_raw(GREEN_TEXT)?;
    term.send_text("NOM : ")?;

    loop {
        match term.collect_line()? {
            LineRead::Line(line) => {
                let name = line.trim();
                let username = if name.is_empty() {
                    "Anonyme".to_string()
                } else {
                    name.to_string()
                };
                tracing::info!(username = %username, "user identified");
                return Ok(Flow::Next(State::Chatting { service, username }));
            }
            LineRead::Menu => continue,
            LineRead::Interrupted(i) => return Ok(Flow::End(interrupt_end(i))),
        }
    }
}

fn chat_loop<'a, L: Link>(
    term: &mut Minitel<L>,
    backend: &dyn ModelBackend,
    config: &SessionConfig,
    service: &'a Service,
    username: &str,
) -> Result<Flow<'a>> {
    let header = ChatHeader::new(service.title.clone());
    header.draw(term)?;

    loop {
        term.send_raw(GREEN_TEXT)?;
        term.send_text(&format!("{} > ", username))?;

        let line = match term.collect_line()? {
            LineRead::Line(line) => line,
            LineRead::Menu => {
                header.draw(term)?;
                continue;
            }
            LineRead::Interrupted(i) => return Ok(Flow::End(interrupt_end(i))),
        };
        let question = line.trim();

        if question.eq_ignore_ascii_case(&config.exit_keyword) {
            return Ok(Flow::Next(State::ShuttingDown));
        }

        if question.eq_ignore_ascii_case(&config.clear_keyword) {
            header.draw(term)?;
            continue;
        }

        if let Some(answer) = config.find_fixed_response(question) {
            // Canned answer, the model never sees it.
            term.send_raw(WHITE_TEXT)?;
            let mut pager = Pager::new(term, &header);
            match pager.emit(&format!("\nMINITEL > {}\n\n", answer))? {
                Paged::Complete => continue,
                Paged::Interrupted(i) => return Ok(Flow::End(interrupt_end(i))),
            }
        }

        let model = config
            .model_override
            .clone()
            .unwrap_or_else(|| service.model.clone());
        let request = ModelRequest {
            model,
            prompt: format!("{} demande : {}", username, question),
            system: Some(service.system.clone()),
        };

        match ask_model(term, backend, &header, &request)? {
            Paged::Complete => {}
            Paged::Interrupted(i) => return Ok(Flow::End(interrupt_end(i))),
        }
    }
}

/// Stream one model exchange through the pager, fragment by fragment.
/// Each fragment is fully paged out (including any SUITE wait) before the
/// next one is pulled off the wire.
fn ask_model<L: Link>(
    term: &mut Minitel<L>,
    backend: &dyn ModelBackend,
    header: &ChatHeader,
    request: &ModelRequest,
) -> Result<Paged> {
    term.send_raw(WHITE_TEXT)?;
    let mut pager = Pager::new(term, header);
    match pager.emit("\nMINITEL > ")? {
        Paged::Complete => {}
        interrupted => return Ok(interrupted),
    }

    let mut fragments = match backend.generate(request) {
        Ok(fragments) => fragments,
        Err(e) => {
            tracing::warn!(error = %e, "model backend unreachable");
            return deliver_model_error(&mut pager);
        }
    };

    loop {
        // A queued power-off or reset must not wait for the next page
        // break; dropping `fragments` closes the exchange, so nothing
        // keeps buffering behind a dead session.
        if let Some(interrupt) = pager.poll_interrupt()? {
            return Ok(Paged::Interrupted(interrupt));
        }
        let text = match fragments.next() {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "model stream failed mid-exchange");
                return deliver_model_error(&mut pager);
            }
            None => break,
        };
        match pager.emit(&text)? {
            Paged::Complete => {}
            interrupted => return Ok(interrupted),
        }
    }

    pager.beep()?;
    pager.emit("\n\n")
}

/// One exchange failed; tell the user and stay in the chat.
fn deliver_model_error<L: Link>(pager: &mut Pager<'_, L>) -> Result<Paged> {
    pager.beep()?;
    pager.emit("\nErreur : Impossible de joindre le serveur.\n\n")
}

fn farewell<L: Link>(term: &mut Minitel<L>) -> Result<()> {
    term.send_text("\nAu revoir !")?;
    thread::sleep(Duration::from_millis(500));
    term.clear_screen()?;
    term.send_raw(CURSOR_HOME)?;
    term.send_raw(WHITE_TEXT)?;
    term.send_text("\nCerveau non disponible, je suis juste un minitel...\n")?;
    Ok(())
}
