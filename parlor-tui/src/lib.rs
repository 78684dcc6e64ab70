mod chat;
mod command;
mod feeders;
mod input;
mod intro;
mod modal;
mod styles;
mod transcript;
mod tui;
mod view;

pub use feeders::spawn_tui_feeders;
pub use intro::IntroOptions;
pub use transcript::{Message, RenderedMessage, Transcript};
pub use tui::{TuiActor, TuiMsg, TuiOptions};
