use anyhow::{Context as _, Result};
use parlor_common::ParlorError;
use parlor_actors::{
    actor::Addr,
    builder::Builder,
    reply_queue::{ReplyQueue, ReplyQueueActor},
    responder::ResponderActor,
};
use parlor_config::ParlorConfig;
use parlor_http::reply::HttpReplyFetcher;
use parlor_tui::{IntroOptions, TuiActor, TuiMsg, TuiOptions, spawn_tui_feeders};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAILBOX: usize = 1024;

pub struct Tether {
    builder: Builder,
}

impl Tether {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
        }
    }
    pub fn builder_mut(&mut self) -> &mut Builder {
        &mut self.builder
    }
    pub async fn run(self) -> Result<()> {
        self.builder.run_until_ctrl_c().await
    }
}

fn tui_options(cfg: &ParlorConfig) -> TuiOptions {
    let intro = cfg.intro.enabled.then(|| IntroOptions {
        slogan: cfg.intro.slogan.clone(),
        delay: Duration::from_millis(cfg.intro.delay_ms),
        char_interval: Duration::from_millis(cfg.intro.char_interval_ms),
    });
    TuiOptions {
        intro,
        endpoint: cfg.endpoint.url.clone(),
    }
}

pub async fn build_from_config(t: &mut Tether, cfg: ParlorConfig) -> Result<()> {
    let b = t.builder_mut();
    let shutdown = b.shutdown_handle();

    // -------- PHASE 1: RESERVE EVERYTHING --------
    let r_queue = b.reserve::<ReplyQueueActor>("reply-queue", DEFAULT_MAILBOX);
    let r_responder = b.reserve::<ResponderActor>("responder", DEFAULT_MAILBOX);
    // ui (start last)
    let r_tui = b.reserve::<TuiActor>("tui:main", 256);

    // -------- PHASE 2: START BACKEND ACTORS --------
    let queue = ReplyQueueActor::new(
        ReplyQueue::new(cfg.typewriter.same_target, cfg.typewriter.ordering),
        cfg.typewriter.char_interval(),
    );
    let queue_events = queue.events().subscribe();
    b.start_reserved(r_queue, queue);

    let fetcher = HttpReplyFetcher::for_endpoint(
        &cfg.endpoint.url,
        cfg.endpoint.auth_token.clone(),
        cfg.endpoint.timeout(),
        cfg.endpoint.retries,
    )
    .map_err(|e| ParlorError::Config(format!("chat endpoint {:?}: {e}", cfg.endpoint.url)))?;
    let queue_addr: Addr<ReplyQueueActor> = b
        .addr::<ReplyQueueActor>("reply-queue")
        .context("reply queue address missing")?;
    b.start_reserved(r_responder, ResponderActor::new(Arc::new(fetcher), queue_addr));

    tracing::info!(
        endpoint = %cfg.endpoint.url,
        interval_ms = cfg.typewriter.char_interval_ms,
        same_target = ?cfg.typewriter.same_target,
        ordering = ?cfg.typewriter.ordering,
        "backend actors started"
    );

    // -------- PHASE 3: START TUI LAST --------
    let responder_addr: Addr<ResponderActor> = b
        .addr("responder")
        .context("responder address missing")?;
    let tui = TuiActor::new(tui_options(&cfg), responder_addr, shutdown.clone())?;
    let tui_addr = r_tui.addr();
    b.start_reserved(r_tui, tui);
    tui_addr
        .send(TuiMsg::Start)
        .await
        .map_err(|_| ParlorError::MailboxClosed("tui:main"))?;

    for feeder in spawn_tui_feeders(tui_addr, queue_events, shutdown) {
        b.track(async move {
            feeder.await?;
            Ok(())
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intro_options_follow_config() {
        let mut cfg = ParlorConfig::default();
        let opts = tui_options(&cfg);
        let intro = opts.intro.expect("intro on by default");
        assert_eq!(intro.delay, Duration::from_millis(2200));
        assert_eq!(intro.char_interval, Duration::from_millis(70));
        assert_eq!(opts.endpoint, parlor_config::DEFAULT_ENDPOINT);

        cfg.intro.enabled = false;
        assert!(tui_options(&cfg).intro.is_none());
    }
}
