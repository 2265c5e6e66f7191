//! The debounced overlay engine task.
//!
//! One dedicated tokio task owns the [`OverlayStore`] and with it every
//! piece of mutable reload state. Viewport changes arrive over an mpsc
//! channel and are debounced with a LOD-adaptive delay; each change resets
//! the timer, so only the resting viewport triggers a reload. Fetch
//! fan-outs run on spawned tasks that hold no store reference and report
//! back over a completion channel, keeping the store single-writer without
//! a single lock.
//!
//! Published feature sets go out over a `watch` channel (late subscribers
//! see the latest state); user-facing failure notices go out over a small
//! bounded mpsc and are dropped with a warning if nobody drains them.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::feature::Feature;
use crate::fetch::LayerFetcher;
use crate::geo::Viewport;
use crate::lod::LodLevel;
use crate::store::{run_fetches, BeginLoad, FetchResults, LoadOutcome, LoadTicket, OverlayStore};

/// One published state: the viewport it answers and its feature set.
#[derive(Debug, Clone)]
pub struct Publication {
    pub viewport: Viewport,
    pub lod: LodLevel,
    pub features: Arc<Vec<Feature>>,
}

/// User-facing degradation notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

/// Handle to a running engine. Dropping it shuts the engine down.
pub struct EngineHandle {
    viewport_tx: mpsc::Sender<Viewport>,
    publication_rx: watch::Receiver<Option<Publication>>,
    notice_rx: mpsc::Receiver<Notice>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Submits a viewport change. Returns false if the engine is gone.
    pub async fn send_viewport(&self, viewport: Viewport) -> bool {
        self.viewport_tx.send(viewport).await.is_ok()
    }

    /// Subscribes to published feature sets.
    pub fn publications(&self) -> watch::Receiver<Option<Publication>> {
        self.publication_rx.clone()
    }

    /// Receives the next degradation notice.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notice_rx.recv().await
    }

    /// Stops the engine and waits for its task to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Spawns the engine task.
pub struct OverlayEngine;

impl OverlayEngine {
    pub fn spawn(config: EngineConfig, fetchers: Vec<Arc<dyn LayerFetcher>>) -> EngineHandle {
        let (viewport_tx, viewport_rx) = mpsc::channel(config.viewport_buffer);
        let (publication_tx, publication_rx) = watch::channel(None);
        let (notice_tx, notice_rx) = mpsc::channel(config.notice_buffer);
        let (completion_tx, completion_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        let task = EngineTask {
            store: OverlayStore::new(config.tile_cache_capacity),
            fetchers: Arc::from(fetchers),
            viewport_rx,
            publication_tx,
            notice_tx,
            completion_tx,
            completion_rx,
            shutdown: shutdown.clone(),
            pending: None,
            deadline: None,
        };
        let task = tokio::spawn(task.run());

        EngineHandle {
            viewport_tx,
            publication_rx,
            notice_rx,
            shutdown,
            task: Some(task),
        }
    }
}

struct Completion {
    viewport: Viewport,
    ticket: LoadTicket,
    results: FetchResults,
}

struct EngineTask {
    store: OverlayStore,
    fetchers: Arc<[Arc<dyn LayerFetcher>]>,
    viewport_rx: mpsc::Receiver<Viewport>,
    publication_tx: watch::Sender<Option<Publication>>,
    notice_tx: mpsc::Sender<Notice>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    shutdown: CancellationToken,
    /// Latest viewport waiting out its debounce window.
    pending: Option<Viewport>,
    deadline: Option<Instant>,
}

impl EngineTask {
    async fn run(mut self) {
        info!("overlay engine started");
        loop {
            let debounce_armed = self.deadline.is_some();
            let deadline = self.deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                _ = self.shutdown.cancelled() => break,

                maybe = self.viewport_rx.recv() => match maybe {
                    Some(viewport) => self.on_viewport(viewport),
                    None => break,
                },

                _ = sleep_until(deadline), if debounce_armed => {
                    self.deadline = None;
                    if let Some(viewport) = self.pending.take() {
                        self.start_reload(viewport);
                    }
                },

                Some(completion) = self.completion_rx.recv() => {
                    self.finish_reload(completion);
                },
            }
        }
        info!("overlay engine stopped");
    }

    /// Re-arms the debounce timer for the newest viewport. Every event
    /// resets the window, so a continuous pan produces no reload until the
    /// map comes to rest.
    fn on_viewport(&mut self, viewport: Viewport) {
        let lod = LodLevel::for_span(viewport.span);
        self.deadline = Some(Instant::now() + lod.debounce());
        self.pending = Some(viewport);
        debug!(lod = %lod, "viewport change debounced");
    }

    fn start_reload(&mut self, viewport: Viewport) {
        let (ticket, cached) = match self.store.begin_load(&viewport) {
            BeginLoad::SanityRejected => return,
            BeginLoad::Start { ticket, cached } => (ticket, cached),
        };

        // Optimistic publish: the cached tile goes up immediately while the
        // refresh runs in the background.
        if let Some(features) = cached {
            self.publish(viewport, features);
        }

        let fetchers = Arc::clone(&self.fetchers);
        let completion_tx = self.completion_tx.clone();
        let bbox = ticket.bbox;
        let cancel = ticket.cancel.clone();
        tokio::spawn(async move {
            let results = run_fetches(&fetchers, bbox, cancel).await;
            let _ = completion_tx
                .send(Completion {
                    viewport,
                    ticket,
                    results,
                })
                .await;
        });
    }

    fn finish_reload(&mut self, completion: Completion) {
        let Completion {
            viewport,
            ticket,
            results,
        } = completion;

        match self.store.complete_load(ticket, results) {
            LoadOutcome::Published { features, notice } => {
                self.publish(viewport, features);
                self.notify(notice);
            }
            LoadOutcome::KeptLastGood { notice } => self.notify(notice),
            LoadOutcome::Stale | LoadOutcome::DiscardedCancelled => {}
        }
    }

    fn publish(&self, viewport: Viewport, features: Arc<Vec<Feature>>) {
        let lod = LodLevel::for_span(viewport.span);
        self.publication_tx.send_replace(Some(Publication {
            viewport,
            lod,
            features,
        }));
    }

    fn notify(&self, notice: Option<String>) {
        if let Some(message) = notice {
            if self.notice_tx.try_send(Notice { message }).is_err() {
                warn!("notice channel full, dropping degradation notice");
            }
        }
    }
}
