//! Render service - hosts the worker thread and the retry timers
//!
//! The service is the host side of [`EditorSession`]: it performs the
//! [`Effect`]s the session emits and feeds worker responses and expired
//! timers back into it. Timers the session no longer honours are dropped
//! whenever the service next sees the session.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::overlay::engine::RenderEngine;
use crate::overlay::render::{Effect, RenderPhase, RetryToken};
use crate::overlay::session::EditorSession;

use super::engine::MupdfEngine;
use super::request::{RenderRequest, RenderResponse};
use super::worker::render_worker;

/// Runs renders on a worker thread on behalf of an [`EditorSession`]
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    timers: Vec<(Instant, RetryToken)>,
    /// Bytes for the next `StartLoad` effect
    pending_bytes: Option<Arc<Vec<u8>>>,
    editor_width_px: f32,
    worker: Option<JoinHandle<()>>,
}

impl RenderService {
    /// Spawn a worker backed by mupdf
    #[must_use]
    pub fn new(editor_width_px: f32, text_cache_size: usize) -> Self {
        Self::spawn(move || MupdfEngine::new(text_cache_size), editor_width_px)
    }

    /// Spawn a worker running the engine built by `factory`.
    ///
    /// The engine is constructed on the worker thread, so it need not be `Send`.
    #[must_use]
    pub fn spawn<E, F>(factory: F, editor_width_px: f32) -> Self
    where
        E: RenderEngine + 'static,
        F: FnOnce() -> E + Send + 'static,
    {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let worker = std::thread::Builder::new()
            .name("render-worker".to_string())
            .spawn(move || render_worker(factory(), request_rx, response_tx));
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to spawn render worker: {e}");
                None
            }
        };

        Self {
            request_tx,
            response_rx,
            timers: Vec::new(),
            pending_bytes: None,
            editor_width_px,
            worker,
        }
    }

    /// Start loading `bytes` as the session's new document
    pub fn open(&mut self, session: &mut EditorSession, bytes: Vec<u8>) {
        self.timers.clear();
        self.pending_bytes = Some(Arc::new(bytes));
        let effects = session.begin_load();
        self.execute(effects);
    }

    /// Carry out effects returned by the session
    pub fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartLoad(load) => match self.pending_bytes.take() {
                    Some(bytes) => {
                        let _ = self.request_tx.send(RenderRequest::Load { load, bytes });
                    }
                    None => warn!("Load {load:?} started without document bytes"),
                },

                Effect::StartRender { session, target } => {
                    let _ = self.request_tx.send(RenderRequest::Render {
                        session,
                        target,
                        editor_width_px: self.editor_width_px,
                    });
                }

                Effect::CancelRender(session) => {
                    let _ = self.request_tx.send(RenderRequest::Cancel(session));
                }

                Effect::ScheduleRetry { token, delay } => {
                    self.timers.push((Instant::now() + delay, token));
                }

                Effect::AcceptPage(session) | Effect::DiscardPage(session) => {
                    debug!("Page effect for {session:?} reached the host; ignoring");
                }
            }
        }
    }

    /// Fire due timers and drain worker responses without blocking.
    /// Returns the number of events handed to the session.
    pub fn poll(&mut self, session: &mut EditorSession) -> usize {
        self.drop_stale_timers(session);
        let mut handled = self.fire_due_timers(session);
        while let Ok(response) = self.response_rx.try_recv() {
            self.dispatch(session, response);
            handled += 1;
        }
        handled
    }

    /// Block for up to `timeout` until at least one event is handled
    pub fn wait(&mut self, session: &mut EditorSession, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let handled = self.poll(session);
            if handled > 0 {
                return handled;
            }
            let now = Instant::now();
            if now >= deadline {
                return 0;
            }
            let until = self
                .next_timer()
                .map_or(deadline, |due| due.min(deadline));
            match self
                .response_rx
                .recv_timeout(until.saturating_duration_since(now))
            {
                Ok(response) => {
                    self.dispatch(session, response);
                    return 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Render worker disconnected");
                    return self.fire_due_timers(session);
                }
            }
        }
    }

    /// Run until the session has no render in flight and no retry pending
    pub fn run_until_settled(&mut self, session: &mut EditorSession, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.drop_stale_timers(session);
        while !self.is_settled(session) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait(session, deadline - now);
        }
        true
    }

    /// No render in flight and no retry timer the session would still honour
    #[must_use]
    pub fn is_settled(&self, session: &EditorSession) -> bool {
        let lifecycle = session.lifecycle();
        !self.timers.iter().any(|(_, token)| lifecycle.is_retry_live(*token))
            && !matches!(session.phase(), RenderPhase::Loading | RenderPhase::Rendering)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Forget timers armed for a request that has since been superseded
    fn drop_stale_timers(&mut self, session: &EditorSession) {
        let lifecycle = session.lifecycle();
        let before = self.timers.len();
        self.timers.retain(|(_, token)| lifecycle.is_retry_live(*token));
        let dropped = before - self.timers.len();
        if dropped > 0 {
            debug!("Dropped {dropped} superseded retry timers");
        }
    }

    fn next_timer(&self) -> Option<Instant> {
        self.timers.iter().map(|(due, _)| *due).min()
    }

    fn fire_due_timers(&mut self, session: &mut EditorSession) -> usize {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|(at, _)| *at <= now);
        self.timers = pending;

        let fired = due.len();
        for (_, token) in due {
            let effects = session.on_retry_due(token);
            self.execute(effects);
        }
        fired
    }

    fn dispatch(&mut self, session: &mut EditorSession, response: RenderResponse) {
        let effects = match response {
            RenderResponse::DocumentLoaded { load, page_count } => {
                session.document_loaded(load, page_count)
            }
            RenderResponse::LoadFailed { load, error } => session.load_failed(load, &error),
            RenderResponse::Page { session: id, page } => session.on_render_complete(id, *page),
            RenderResponse::Error { session: id, error } => session.on_render_failed(id, &error),
            RenderResponse::Cancelled(id) => {
                session.on_render_cancelled(id);
                vec![]
            }
        };
        self.execute(effects);
    }

    /// Stop the worker thread
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Render worker panicked");
            }
        }
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
