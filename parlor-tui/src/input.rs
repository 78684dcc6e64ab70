use crossterm::event::{KeyCode, KeyModifiers};

/// Single-line draft with a caret kept on a char boundary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputLine {
    text: String,
    caret: usize, // byte offset
}

impl InputLine {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Drafts starting with `/` are routed as commands.
    pub fn is_command(&self) -> bool {
        self.text.trim_start().starts_with('/')
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.caret = 0;
    }

    /// Hand the draft over and leave an empty line behind.
    pub fn take(&mut self) -> String {
        self.caret = 0;
        std::mem::take(&mut self.text)
    }

    /// Enter: hand the draft over, unless a reply is pending and the draft
    /// is chat text. The draft stays put in that case.
    pub fn submit(&mut self, sending: bool) -> Option<String> {
        if sending && !self.is_command() {
            return None;
        }
        Some(self.take())
    }

    /// Apply an editing key. Returns `false` for keys that don't edit.
    pub fn edit(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                self.text.insert(self.caret, ch);
                self.caret += ch.len_utf8();
            }
            KeyCode::Left => self.caret = self.prev_boundary(),
            KeyCode::Right => self.caret = self.next_boundary(),
            KeyCode::Home => self.caret = 0,
            KeyCode::End => self.caret = self.text.len(),
            KeyCode::Backspace => {
                let start = self.prev_boundary();
                self.text.replace_range(start..self.caret, "");
                self.caret = start;
            }
            KeyCode::Delete => {
                let end = self.next_boundary();
                self.text.replace_range(self.caret..end, "");
            }
            KeyCode::Esc => self.clear(),
            _ => return false,
        }
        true
    }

    fn prev_boundary(&self) -> usize {
        self.text[..self.caret]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i)
    }

    fn next_boundary(&self) -> usize {
        self.text[self.caret..]
            .chars()
            .next()
            .map_or(self.caret, |c| self.caret + c.len_utf8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> InputLine {
        let mut line = InputLine::default();
        for ch in s.chars() {
            line.edit(KeyCode::Char(ch), KeyModifiers::NONE);
        }
        line
    }

    #[test]
    fn caret_steps_over_multibyte_chars() {
        let mut line = typed("aé😀");
        assert_eq!(line.caret(), line.text().len());
        line.edit(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(line.caret(), 3);
        line.edit(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(line.caret(), 1);
        line.edit(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(line.caret(), 3);
    }

    #[test]
    fn backspace_and_delete_remove_whole_chars() {
        let mut line = typed("héllo");
        line.edit(KeyCode::Home, KeyModifiers::NONE);
        line.edit(KeyCode::Right, KeyModifiers::NONE);
        line.edit(KeyCode::Delete, KeyModifiers::NONE);
        assert_eq!(line.text(), "hllo");
        line.edit(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(line.text(), "llo");
        assert_eq!(line.caret(), 0);
        line.edit(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(line.text(), "llo");
    }

    #[test]
    fn control_chords_are_not_text() {
        let mut line = typed("hi");
        assert!(!line.edit(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert!(!line.edit(KeyCode::PageUp, KeyModifiers::NONE));
        assert_eq!(line.text(), "hi");
    }

    #[test]
    fn take_and_escape_leave_an_empty_line() {
        let mut line = typed(" /help");
        assert!(line.is_command());
        assert_eq!(line.take(), " /help");
        assert_eq!(line, InputLine::default());

        let mut line = typed("draft");
        line.edit(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(line.text(), "");
    }

    #[test]
    fn pending_reply_keeps_chat_drafts_but_not_commands() {
        let mut line = typed("next question");
        assert_eq!(line.submit(true), None);
        assert_eq!(line.text(), "next question");
        assert_eq!(line.submit(false).as_deref(), Some("next question"));
        assert_eq!(line.text(), "");

        let mut line = typed("/new");
        assert_eq!(line.submit(true).as_deref(), Some("/new"));
    }
}
