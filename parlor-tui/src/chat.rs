use crate::command::{Command, parse_command};
use crate::transcript::Transcript;
use parlor_actors::FetchCmd;
use parlor_common::{FALLBACK_REPLY, HistoryEntry, Role};
use parlor_markup::Content;
use tokio::sync::oneshot;
use tracing::debug;

/// What a submitted line turned into.
pub enum Submission {
    /// Blank, or chat text while a reply is still pending.
    Ignored,
    Command(Command),
    /// Both messages are already in the transcript; `cmd` goes to the responder.
    Send {
        cmd: FetchCmd,
        done: oneshot::Receiver<()>,
    },
}

/// Chat-screen state that doesn't need a terminal: the log, the history
/// mirror and the send guard.
#[derive(Default)]
pub struct ChatSession {
    transcript: Transcript,
    history: Vec<HistoryEntry>,
    next_seq: u64,
    sending: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// A fetch is in flight.
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn submit(&mut self, line: &str) -> Submission {
        let text = line.trim();
        if text.is_empty() {
            return Submission::Ignored;
        }
        if text.starts_with('/') {
            return Submission::Command(parse_command(text));
        }
        if self.sending {
            debug!("submit ignored; reply still pending");
            return Submission::Ignored;
        }

        self.transcript.render(text, Role::User);
        self.history.push(HistoryEntry {
            role: Role::User,
            content: text.to_string(),
        });
        let bot = self.transcript.render(text, Role::Bot);
        debug!(turns = self.history.len(), "message sent");

        let seq = self.next_seq;
        self.next_seq += 1;
        self.sending = true;

        let (tx, done) = oneshot::channel();
        Submission::Send {
            cmd: FetchCmd {
                user_text: text.to_string(),
                target: bot.content,
                seq,
                done: Some(tx),
            },
            done,
        }
    }

    /// The command never reached the responder: show the fallback in place.
    pub fn send_failed(&mut self, cmd: FetchCmd) {
        cmd.target.set(Content::Text(FALLBACK_REPLY.to_string()));
        self.sending = false;
    }

    pub fn fetch_done(&mut self, seq: u64) {
        debug!(seq, "fetch finished");
        self.sending = false;
    }

    /// Forget every message. Replies still queued for them become detached.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_actors::actor::spawn_actor_reserved;
    use parlor_actors::responder::ResponderActor;
    use parlor_common::THINKING_PLACEHOLDER;

    fn sent(submission: Submission) -> FetchCmd {
        match submission {
            Submission::Send { cmd, .. } => cmd,
            Submission::Ignored => panic!("expected a send, got Ignored"),
            Submission::Command(c) => panic!("expected a send, got {c:?}"),
        }
    }

    fn log(chat: &ChatSession) -> Vec<(Role, String)> {
        chat.transcript()
            .messages()
            .iter()
            .map(|m| (m.role, m.content.plain_text()))
            .collect()
    }

    #[test]
    fn hello_shows_user_then_thinking_and_fetches() {
        let mut chat = ChatSession::new();
        let cmd = sent(chat.submit("Hello"));

        assert_eq!(
            log(&chat),
            vec![
                (Role::User, "Hello".to_string()),
                (Role::Bot, THINKING_PLACEHOLDER.to_string()),
            ]
        );
        assert_eq!(cmd.seq, 0);
        assert_eq!(cmd.user_text, "Hello");
        assert_eq!(cmd.target.id(), chat.transcript().messages()[1].content.id());
        assert!(cmd.done.is_some());
        assert!(chat.is_sending());
        assert_eq!(
            chat.history(),
            [HistoryEntry {
                role: Role::User,
                content: "Hello".into()
            }]
        );
    }

    #[test]
    fn second_send_is_ignored_until_the_fetch_finishes() {
        let mut chat = ChatSession::new();
        let first = sent(chat.submit("one"));
        assert!(matches!(chat.submit("two"), Submission::Ignored));
        assert_eq!(chat.transcript().len(), 2);

        chat.fetch_done(first.seq);
        let second = sent(chat.submit("two"));
        assert_eq!(second.seq, 1);
        assert_eq!(chat.transcript().len(), 4);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut chat = ChatSession::new();
        assert!(matches!(chat.submit("  \t "), Submission::Ignored));
        assert!(matches!(chat.submit(""), Submission::Ignored));
        assert!(chat.transcript().is_empty());
        assert!(!chat.is_sending());
    }

    #[test]
    fn commands_pass_while_sending() {
        let mut chat = ChatSession::new();
        sent(chat.submit("Hello"));
        assert!(matches!(
            chat.submit(" /new "),
            Submission::Command(Command::NewChat)
        ));
        assert_eq!(chat.transcript().len(), 2);
    }

    #[test]
    fn full_responder_mailbox_falls_back_in_place() {
        let reserved = spawn_actor_reserved::<ResponderActor>("responder", 1);
        let responder = reserved.addr();
        let mut chat = ChatSession::new();

        let first = sent(chat.submit("one"));
        assert!(responder.try_send(first).is_ok());
        chat.fetch_done(0);

        let second = sent(chat.submit("two"));
        let rejected = responder.try_send(second).err().expect("mailbox is full");
        chat.send_failed(rejected);

        assert!(!chat.is_sending());
        assert_eq!(chat.transcript().messages()[3].content.plain_text(), FALLBACK_REPLY);
    }

    #[test]
    fn clear_drops_log_and_history() {
        let mut chat = ChatSession::new();
        let cmd = sent(chat.submit("Hello"));
        let weak = cmd.target.downgrade();
        drop(cmd);

        chat.clear();
        assert!(chat.transcript().is_empty());
        assert!(chat.history().is_empty());
        assert!(weak.is_detached());
    }
}
