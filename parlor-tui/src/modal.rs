use crossterm::event::{KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    Info,
    NewChat,
    ComingSoon,
}

impl Modal {
    pub fn title(&self) -> &'static str {
        match self {
            Modal::Info => " About Parlor ",
            Modal::NewChat => " New Chat ",
            Modal::ComingSoon => " Coming Soon ",
        }
    }

    pub fn body(&self) -> &'static [&'static str] {
        match self {
            Modal::Info => &[
                "Parlor answers your questions in plain language.",
                "Replies come from the configured chat endpoint",
                "and are typed out as they arrive.",
                "",
                "Type /help for commands.",
            ],
            Modal::NewChat => &[
                "Start a new chat?",
                "The current conversation will be cleared.",
            ],
            Modal::ComingSoon => &["This feature is coming soon."],
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Modal::NewChat => "[Enter/y] confirm   [n] cancel   [Esc] close",
            _ => "[Enter] close   [Esc] close all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    None,
    /// Close the top modal.
    Close,
    /// Close every open modal.
    CloseAll,
    ConfirmNewChat,
}

/// Open modals, topmost last. Each kind appears at most once.
#[derive(Debug, Default)]
pub struct Modals {
    open: Vec<Modal>,
}

impl Modals {
    pub fn open(&mut self, modal: Modal) {
        self.open.retain(|m| *m != modal);
        self.open.push(modal);
    }

    pub fn close(&mut self, modal: Modal) {
        self.open.retain(|m| *m != modal);
    }

    pub fn close_all(&mut self) {
        self.open.clear();
    }

    pub fn top(&self) -> Option<Modal> {
        self.open.last().copied()
    }

    pub fn is_open(&self) -> bool {
        !self.open.is_empty()
    }

    pub fn all(&self) -> &[Modal] {
        &self.open
    }

    /// Map a key to an action for the topmost modal.
    pub fn key_action(&self, key: &KeyEvent) -> ModalAction {
        let Some(top) = self.top() else {
            return ModalAction::None;
        };
        match (top, key.code) {
            (_, KeyCode::Esc) => ModalAction::CloseAll,
            (Modal::NewChat, KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y')) => {
                ModalAction::ConfirmNewChat
            }
            (Modal::NewChat, KeyCode::Char('n') | KeyCode::Char('N')) => ModalAction::Close,
            (Modal::Info | Modal::ComingSoon, KeyCode::Enter | KeyCode::Char(' ')) => {
                ModalAction::Close
            }
            _ => ModalAction::None,
        }
    }

    pub fn apply(&mut self, action: ModalAction) {
        match action {
            ModalAction::None => {}
            ModalAction::Close => {
                self.open.pop();
            }
            ModalAction::CloseAll | ModalAction::ConfirmNewChat => self.close_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn escape_closes_every_modal() {
        let mut m = Modals::default();
        m.open(Modal::Info);
        m.open(Modal::ComingSoon);
        let action = m.key_action(&key(KeyCode::Esc));
        assert_eq!(action, ModalAction::CloseAll);
        m.apply(action);
        assert!(!m.is_open());
    }

    #[test]
    fn new_chat_confirm_and_cancel() {
        let mut m = Modals::default();
        m.open(Modal::NewChat);
        assert_eq!(m.key_action(&key(KeyCode::Enter)), ModalAction::ConfirmNewChat);
        assert_eq!(m.key_action(&key(KeyCode::Char('y'))), ModalAction::ConfirmNewChat);
        assert_eq!(m.key_action(&key(KeyCode::Char('n'))), ModalAction::Close);
        assert_eq!(m.key_action(&key(KeyCode::Char('x'))), ModalAction::None);
    }

    #[test]
    fn reopening_moves_modal_to_top() {
        let mut m = Modals::default();
        m.open(Modal::Info);
        m.open(Modal::NewChat);
        m.open(Modal::Info);
        assert_eq!(m.all(), &[Modal::NewChat, Modal::Info]);
        m.apply(ModalAction::Close);
        assert_eq!(m.top(), Some(Modal::NewChat));
    }

    #[test]
    fn no_modal_means_no_action() {
        let m = Modals::default();
        assert_eq!(m.key_action(&key(KeyCode::Esc)), ModalAction::None);
    }
}
