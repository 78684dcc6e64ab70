//! Opening splash: the slogan is typed out after a short delay, then a
//! prompt invites the user into the chat.

use crossterm::event::{KeyCode, KeyEvent};
use parlor_markup::{Animation, ContentHandle, MarkupTree, animate};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct IntroOptions {
    pub slogan: String,
    pub delay: Duration,
    pub char_interval: Duration,
}

pub struct Intro {
    options: IntroOptions,
    slogan: ContentHandle,
    ready: bool,
    cancel: CancellationToken,
}

impl Intro {
    pub fn new(options: IntroOptions) -> Self {
        Self {
            options,
            slogan: ContentHandle::text(""),
            ready: false,
            cancel: CancellationToken::new(),
        }
    }

    /// The delayed slogan animation. Resolves to `true` if the slogan was
    /// typed out in full, `false` if the intro was stopped first.
    pub fn run(&self) -> impl Future<Output = bool> + Send + 'static {
        let slogan = self.slogan.clone();
        let tree = MarkupTree::plain(self.options.slogan.clone());
        let delay = self.options.delay;
        let interval = self.options.char_interval;
        let cancel = self.cancel.clone();
        async move {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }
            matches!(
                animate(&slogan, tree, interval, &cancel).await,
                Animation::Completed { .. }
            )
        }
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn slogan_text(&self) -> String {
        self.slogan.plain_text()
    }

    /// Enter always skips ahead; any other key only once the prompt is showing.
    pub fn opens_chat(&self, key: &KeyEvent) -> bool {
        key.code == KeyCode::Enter || self.ready
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Intro {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
