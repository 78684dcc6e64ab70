use crate::{
    chat::{ChatSession, Submission},
    command::{Command, HELP_LINES},
    input::InputLine,
    intro::{Intro, IntroOptions},
    modal::{Modal, ModalAction, Modals},
    view::{self, ChatSnap, Screen},
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    event::{Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parlor_actors::{
    FetchCmd, QueueEvent,
    actor::{Actor, Addr, Context},
    responder::ResponderActor,
    system::ShutdownHandle,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};
use tokio::sync::oneshot;
use tracing::{info, warn};

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// What a key press asks of the actor beyond redrawing.
enum KeyIntent {
    Submit(String),
    Quit,
}

pub enum TuiMsg {
    /// Kick off the intro animation once the actor is running.
    Start,
    InputEvent(CtEvent),
    Tick,
    IntroReady,
    FetchDone { seq: u64 },
    Queue(QueueEvent),
    OpError(String),
}

/// Settings the binary passes in from configuration.
#[derive(Debug, Clone)]
pub struct TuiOptions {
    pub intro: Option<IntroOptions>,
    /// Shown in the header.
    pub endpoint: String,
}

pub struct TuiActor {
    // deps
    responder: Addr<ResponderActor>,

    // terminal
    term: Terminal<CrosstermBackend<Stdout>>,
    tick_rate: Duration,
    last_tick: Instant,

    // screens
    intro: Option<Intro>,
    modals: Modals,
    endpoint: String,

    // chat state
    input: InputLine,
    chat: ChatSession,
    typing: Option<u64>,
    notice: Option<(String, Instant)>,
    dirty: bool,
    spin_idx: usize,

    // shutdown coordination
    shutdown: ShutdownHandle,
}

impl TuiActor {
    pub fn new(
        options: TuiOptions,
        responder: Addr<ResponderActor>,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut term = Terminal::new(backend)?;
        term.clear()?;

        Ok(Self {
            responder,
            term,
            tick_rate: Duration::from_millis(80),
            last_tick: Instant::now(),
            intro: options.intro.map(Intro::new),
            modals: Modals::default(),
            endpoint: options.endpoint,
            input: InputLine::default(),
            chat: ChatSession::new(),
            typing: None,
            notice: None,
            dirty: true,
            spin_idx: 0,
            shutdown,
        })
    }

    fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now()));
        self.dirty = true;
    }

    fn open_modal(&mut self, modal: Modal) {
        self.modals.open(modal);
        self.dirty = true;
    }

    fn open_chat(&mut self) {
        if let Some(intro) = self.intro.take() {
            intro.stop();
            info!("intro dismissed");
        }
        self.dirty = true;
    }

    fn new_chat(&mut self) {
        self.chat.clear();
        self.typing = None;
        self.input.clear();
        info!("chat cleared");
        self.dirty = true;
    }

    fn spinner(&self) -> &'static str {
        if self.chat.is_sending() || self.typing.is_some() {
            BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()]
        } else {
            " "
        }
    }

    fn step_spinner(&mut self) {
        if self.chat.is_sending() || self.typing.is_some() {
            self.spin_idx = (self.spin_idx + 1) % BRAILLE_FRAMES.len();
            self.dirty = true;
        }
        if self
            .notice
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() >= NOTICE_TTL)
        {
            self.notice = None;
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let screen = match &self.intro {
            Some(intro) => Screen::Intro {
                slogan: intro.slogan_text(),
                ready: intro.is_ready(),
            },
            None => Screen::Chat(ChatSnap {
                input: self.input.text().to_string(),
                input_cursor: self.input.caret(),
                messages: self.chat.transcript().snapshot(),
                scroll: self.chat.transcript().scroll(),
                sending: self.chat.is_sending(),
                typing: self.typing.is_some(),
                spinner: self.spinner(),
                endpoint: self.endpoint.clone(),
                modals: self.modals.all().to_vec(),
                notice: self.notice.as_ref().map(|(text, _)| text.clone()),
            }),
        };
        let max_scroll = view::draw(&mut self.term, &screen)?;
        self.chat.transcript_mut().clamp_scroll(max_scroll);
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<KeyIntent> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if let (KeyCode::Char('c') | KeyCode::Char('q'), KeyModifiers::CONTROL) =
            (key.code, key.modifiers)
        {
            return Some(KeyIntent::Quit);
        }

        if let Some(intro) = &self.intro {
            if intro.opens_chat(&key) {
                self.open_chat();
            }
            return None;
        }

        if self.modals.is_open() {
            let action = self.modals.key_action(&key);
            self.modals.apply(action);
            if action == ModalAction::ConfirmNewChat {
                self.new_chat();
            }
            self.dirty = true;
            return None;
        }

        match key.code {
            KeyCode::PageUp => self.chat.transcript_mut().scroll_up(5),
            KeyCode::PageDown => self.chat.transcript_mut().scroll_down(5),
            KeyCode::Up => self.chat.transcript_mut().scroll_up(1),
            KeyCode::Down => self.chat.transcript_mut().scroll_down(1),
            _ => return self.chat_key(key),
        }
        self.dirty = true;
        None
    }

    fn chat_key(&mut self, key: KeyEvent) -> Option<KeyIntent> {
        match (key.code, key.modifiers) {
            (KeyCode::F(1), _) => self.open_modal(Modal::Info),
            (KeyCode::Char('n'), KeyModifiers::CONTROL) => self.open_modal(Modal::NewChat),
            (KeyCode::Char('o'), KeyModifiers::CONTROL) => self.open_modal(Modal::ComingSoon),
            (KeyCode::Enter, _) => {
                let line = self.input.submit(self.chat.is_sending())?;
                self.dirty = true;
                return Some(KeyIntent::Submit(line));
            }
            (code, modifiers) => {
                if self.input.edit(code, modifiers) {
                    self.dirty = true;
                }
            }
        }
        None
    }

    /// Returns `true` when the line asked to quit.
    fn route_submit(&mut self, line: &str, me: Addr<TuiActor>) -> bool {
        match self.chat.submit(line) {
            Submission::Ignored => false,
            Submission::Command(cmd) => self.handle_command(cmd),
            Submission::Send { cmd, done } => {
                self.dispatch(cmd, done, me);
                false
            }
        }
    }

    fn dispatch(&mut self, cmd: FetchCmd, done: oneshot::Receiver<()>, me: Addr<TuiActor>) {
        let seq = cmd.seq;
        self.dirty = true;
        if let Err(cmd) = self.responder.try_send(cmd) {
            warn!(seq, "responder mailbox unavailable");
            self.chat.send_failed(cmd);
            return;
        }

        tokio::spawn(async move {
            if done.await.is_err() {
                let _ = me
                    .send(TuiMsg::OpError("reply task ended early".into()))
                    .await;
            }
            let _ = me.send(TuiMsg::FetchDone { seq }).await;
        });
    }

    /// Returns `true` for `/quit`.
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Quit => return true,
            Command::Help => {
                let width = HELP_LINES.iter().map(|(v, _)| v.len()).max().unwrap_or(0);
                let text = HELP_LINES
                    .iter()
                    .map(|(verb, what)| format!("{verb:<width$}  {what}"))
                    .collect::<Vec<_>>()
                    .join("  |  ");
                self.notify(text);
            }
            Command::Info => self.open_modal(Modal::Info),
            Command::NewChat => self.open_modal(Modal::NewChat),
            Command::Menu | Command::Image | Command::Mic => self.open_modal(Modal::ComingSoon),
            Command::Unknown(s) => self.notify(format!("Unknown command: {s}. Try /help.")),
        }
        false
    }

    fn quit(&mut self, ctx: &mut Context<Self>) {
        self.restore_terminal();
        self.shutdown.signal();
        ctx.stop();
    }

    fn on_queue_event(&mut self, event: QueueEvent) {
        match event {
            QueueEvent::Started { seq, .. } => self.typing = Some(seq),
            QueueEvent::Completed { seq, .. }
            | QueueEvent::Replaced { seq, .. }
            | QueueEvent::Detached { seq, .. } => {
                if self.typing == Some(seq) {
                    self.typing = None;
                }
            }
        }
        self.dirty = true;
    }

    fn restore_terminal(&mut self) {
        disable_raw_mode().ok();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = self.term.show_cursor();
    }
}

#[async_trait]
impl Actor for TuiActor {
    type Msg = TuiMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            TuiMsg::Start => {
                if let Some(intro) = &self.intro {
                    let run = intro.run();
                    let me = ctx.addr();
                    tokio::spawn(async move {
                        if run.await {
                            let _ = me.send(TuiMsg::IntroReady).await;
                        }
                    });
                }
            }
            TuiMsg::InputEvent(ev) => {
                if let CtEvent::Key(k) = ev {
                    let quit = match self.handle_key(k) {
                        Some(KeyIntent::Submit(line)) => self.route_submit(&line, ctx.addr()),
                        Some(KeyIntent::Quit) => true,
                        None => false,
                    };
                    if quit {
                        self.quit(ctx);
                    }
                }
            }
            TuiMsg::IntroReady => {
                if let Some(intro) = self.intro.as_mut() {
                    intro.mark_ready();
                    self.dirty = true;
                }
            }
            TuiMsg::FetchDone { seq } => {
                self.chat.fetch_done(seq);
                self.dirty = true;
            }
            TuiMsg::Queue(event) => self.on_queue_event(event),
            TuiMsg::OpError(e) => {
                warn!(error = %e, "ui operation failed");
                self.notify(format!("Error: {e}"));
            }
            TuiMsg::Tick => {
                self.step_spinner();
                if self.dirty || self.last_tick.elapsed() >= self.tick_rate {
                    self.draw()?;
                    self.last_tick = Instant::now();
                    self.dirty = false;
                }
            }
        }

        Ok(())
    }
}

impl Drop for TuiActor {
    fn drop(&mut self) {
        self.restore_terminal();
    }
}
