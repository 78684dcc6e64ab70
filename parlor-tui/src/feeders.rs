use crate::tui::{TuiActor, TuiMsg};
use parlor_actors::QueueEvent;
use parlor_actors::actor::Addr;
use parlor_actors::system::ShutdownHandle;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::{self, time};

/// Spawn the terminal input reader, the redraw ticker and the reply-queue
/// event forwarder. All three stop on shutdown.
pub fn spawn_tui_feeders(
    tui: Addr<TuiActor>,
    queue_events: broadcast::Receiver<QueueEvent>,
    shutdown: ShutdownHandle,
) -> Vec<JoinHandle<()>> {
    let tui_in = tui.clone();
    let mut shutdown_input = shutdown.subscribe();
    let input = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_input.recv() => break,
                ev = tokio::task::spawn_blocking(|| -> std::io::Result<Option<crossterm::event::Event>> {
                    // poll so the blocking thread notices shutdown within a tick
                    if crossterm::event::poll(Duration::from_millis(100))? {
                        crossterm::event::read().map(Some)
                    } else {
                        Ok(None)
                    }
                }) => {
                    match ev {
                        Ok(Ok(Some(e))) => {
                            if tui_in.send(TuiMsg::InputEvent(e)).await.is_err() {
                                break;
                            }
                        }
                        Ok(Ok(None)) => {}
                        Ok(Err(e)) => {
                            let _ = tui_in.send(TuiMsg::OpError(format!("input: {e}"))).await;
                        }
                        Err(_) => break,
                    }
                }
            }
        }
    });

    let tui_tick = tui.clone();
    let mut shutdown_tick = shutdown.subscribe();
    let ticker = tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_millis(80));
        loop {
            tokio::select! {
                _ = shutdown_tick.recv() => break,
                _ = interval.tick() => {
                    let _ = tui_tick.try_send(TuiMsg::Tick);
                }
            }
        }
    });

    let forwarder = tokio::spawn(forward_queue_events(
        queue_events,
        tui,
        shutdown.subscribe(),
    ));

    vec![input, ticker, forwarder]
}

async fn forward_queue_events(
    mut events: broadcast::Receiver<QueueEvent>,
    tui: Addr<TuiActor>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if tui.send(TuiMsg::Queue(event)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "queue events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
