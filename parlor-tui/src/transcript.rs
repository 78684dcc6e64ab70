use parlor_common::Role;
use parlor_markup::{Content, ContentHandle};
use uuid::Uuid;

/// One entry in the chat log.
#[derive(Clone)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: ContentHandle,
    /// Local `HH:MM` at render time.
    pub rendered_at: String,
}

/// What [`Transcript::render`] hands back: the new entry's id and the handle
/// the animator writes into.
#[derive(Clone)]
pub struct RenderedMessage {
    pub id: Uuid,
    pub content: ContentHandle,
}

/// Read-only copy of a message taken for drawing.
#[derive(Clone, Debug)]
pub struct MessageView {
    pub role: Role,
    pub rendered_at: String,
    pub content: Content,
}

#[derive(Default)]
pub struct Transcript {
    messages: Vec<Message>,
    scroll: usize, // lines from bottom
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and jump to the newest entry.
    ///
    /// User messages show `text` as typed; bot messages start as the
    /// placeholder until a reply is typed into them.
    pub fn render(&mut self, text: &str, role: Role) -> RenderedMessage {
        let content = ContentHandle::text(role.placeholder(text));
        let message = Message {
            id: Uuid::new_v4(),
            role,
            content: content.clone(),
            rendered_at: chrono::Local::now().format("%H:%M").to_string(),
        };
        let id = message.id;
        self.messages.push(message);
        self.scroll = 0;
        RenderedMessage { id, content }
    }

    /// Drop every message. Replies still queued for them become detached.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.scroll = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_add(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    /// Pull the offset back to `max` once the view knows how far it can go.
    pub fn clamp_scroll(&mut self, max: usize) {
        self.scroll = self.scroll.min(max);
    }

    pub fn snapshot(&self) -> Vec<MessageView> {
        self.messages
            .iter()
            .map(|m| MessageView {
                role: m.role,
                rendered_at: m.rendered_at.clone(),
                content: m.content.snapshot(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_common::THINKING_PLACEHOLDER;

    #[test]
    fn user_text_is_literal_and_bot_starts_thinking() {
        let mut t = Transcript::new();
        let user = t.render("**not bold**", Role::User);
        let bot = t.render("**not bold**", Role::Bot);
        assert_eq!(user.content.snapshot(), Content::Text("**not bold**".into()));
        assert_eq!(bot.content.plain_text(), THINKING_PLACEHOLDER);
        assert_ne!(user.id, bot.id);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn render_scrolls_to_newest() {
        let mut t = Transcript::new();
        t.render("a", Role::User);
        t.scroll_up(7);
        assert_eq!(t.scroll(), 7);
        t.render("b", Role::User);
        assert_eq!(t.scroll(), 0);
    }

    #[test]
    fn clamped_scroll_comes_back_in_one_step() {
        let mut t = Transcript::new();
        t.render("a", Role::User);
        t.scroll_up(40);
        t.clamp_scroll(3);
        assert_eq!(t.scroll(), 3);
        t.scroll_down(3);
        assert_eq!(t.scroll(), 0);
        t.clamp_scroll(10);
        assert_eq!(t.scroll(), 0);
    }

    #[test]
    fn timestamp_is_hours_and_minutes() {
        let mut t = Transcript::new();
        t.render("a", Role::User);
        let stamp = &t.messages()[0].rendered_at;
        assert_eq!(stamp.len(), 5);
        assert_eq!(&stamp[2..3], ":");
        assert!(stamp.chars().filter(|c| *c != ':').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn clear_detaches_returned_handles() {
        let mut t = Transcript::new();
        let weak = t.render("hi", Role::Bot).content.downgrade();
        assert!(!weak.is_detached());
        t.clear();
        assert!(t.is_empty());
        assert!(weak.is_detached());
    }

    #[test]
    fn snapshot_sees_in_place_updates() {
        let mut t = Transcript::new();
        let bot = t.render("hi", Role::Bot);
        bot.content.set(Content::Text("done".into()));
        assert_eq!(t.snapshot()[0].content, Content::Text("done".into()));
    }
}
