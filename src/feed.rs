use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::BoardConfig;
use crate::engine::Engine;
use crate::match_fetch::{DataSource, FetchError, HttpFeedSource};
use crate::render::ChannelRenderer;
use crate::state::{Delta, Slot};

// Upper bound on one sleep, so stop requests and fetch results are noticed promptly.
const MAX_IDLE: Duration = Duration::from_millis(100);

pub struct BoardHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl BoardHandle {
    /// Asks the runtime thread to tear down and waits for it.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for BoardHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

pub fn spawn_board(cfg: BoardConfig, slots: Vec<Slot>, tx: Sender<Delta>) -> BoardHandle {
    let source = HttpFeedSource::new(cfg.feed_url.clone(), cfg.request_timeout);
    spawn_board_with(cfg, slots, source, tx)
}

/// Runs the engine on its own thread. Fetches happen on short-lived worker
/// threads so the one-second tick keeps running while a request is out; the
/// engine's cycle guard keeps at most one of them alive.
pub fn spawn_board_with<S>(cfg: BoardConfig, slots: Vec<Slot>, source: S, tx: Sender<Delta>) -> BoardHandle
where
    S: DataSource + Clone + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();
    let join = thread::spawn(move || {
        let mut renderer = ChannelRenderer::new(tx);
        let mut engine = Engine::new(slots, &cfg);
        let (done_tx, done_rx) = mpsc::channel();
        let started = Instant::now();

        if engine.start(&mut renderer, Utc::now()) {
            spawn_fetch(source.clone(), done_tx.clone());
        }

        while !thread_stop.load(Ordering::SeqCst) {
            if let Some(fetched) = recv_fetch(&done_rx) {
                let _ = engine.finish_cycle(fetched, &mut renderer, Utc::now());
            }

            if engine.advance(started.elapsed(), Utc::now(), &mut renderer) {
                spawn_fetch(source.clone(), done_tx.clone());
            }

            let wait = engine
                .next_due()
                .map(|due| due.saturating_sub(started.elapsed()))
                .unwrap_or(MAX_IDLE)
                .min(MAX_IDLE);
            thread::sleep(wait);
        }

        engine.shutdown();
        renderer.send(Delta::Stopped);
        info!("board runtime exited");
    });

    BoardHandle {
        stop,
        join: Some(join),
    }
}

fn spawn_fetch<S>(mut source: S, done: Sender<Result<Value, FetchError>>)
where
    S: DataSource + Send + 'static,
{
    thread::spawn(move || {
        debug!("fetch worker started");
        let _ = done.send(source.fetch_matches());
    });
}

fn recv_fetch(rx: &Receiver<Result<Value, FetchError>>) -> Option<Result<Value, FetchError>> {
    rx.try_recv().ok()
}
