//! Render lifecycle management
//!
//! Owns the single current page-render session. Every request gets a fresh
//! [`SessionId`]; completions and failures are honoured only when they carry
//! the current id, so a superseded render can never overwrite newer results
//! no matter which finishes first.
//!
//! The lifecycle is a pure state machine: commands go in, [`Effect`]s come
//! out, and the host (see `crate::pdf::RenderService`) performs them.

use std::time::Duration;

use log::debug;

/// Delays after the first successful render at which it is reissued
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(100),
    Duration::from_millis(500),
    Duration::from_millis(1000),
];

/// Unique identifier for render sessions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl SessionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Identifies one document load. Answers to an older load are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadId(pub u64);

/// The `(page, zoom)` pair a session rasterizes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    /// 1-based page number
    pub page: usize,
    pub zoom: f32,
}

impl RenderTarget {
    #[must_use]
    pub const fn new(page: usize, zoom: f32) -> Self {
        Self { page, zoom }
    }
}

/// Whether a successful render is followed by stabilization retries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// One render, no follow-up
    Single,
    /// Reissue the render at each configured delay after the first success
    Stabilize,
}

/// Identifies one scheduled retry. Tokens from an older request are stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RetryToken {
    pub sequence: u64,
    pub attempt: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPhase {
    /// No document
    Idle,
    /// Document bytes are being parsed
    Loading,
    /// Document open, nothing rendering
    Ready,
    /// A render is in flight or stabilization retries are pending
    Rendering,
    /// The displayed page is final until the next request
    Stable,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    session: SessionId,
    target: RenderTarget,
    policy: RetryPolicy,
}

/// Current render lifecycle state for one document
#[derive(Clone, Debug)]
pub struct RenderLifecycle {
    phase: RenderPhase,
    page_count: usize,
    in_flight: Option<InFlight>,
    current: Option<SessionId>,
    last_target: Option<RenderTarget>,
    /// Bumped by every new request; retry tokens from older values are stale
    sequence: u64,
    retries_pending: usize,
    retry_delays: Vec<Duration>,
    next_session: u64,
    /// Load awaiting the engine's answer
    loading: Option<LoadId>,
    next_load: u64,
}

impl Default for RenderLifecycle {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAYS.to_vec())
    }
}

impl RenderLifecycle {
    #[must_use]
    pub fn new(retry_delays: Vec<Duration>) -> Self {
        Self {
            phase: RenderPhase::Idle,
            page_count: 0,
            in_flight: None,
            current: None,
            last_target: None,
            sequence: 0,
            retries_pending: 0,
            retry_delays,
            next_session: 1,
            loading: None,
            next_load: 1,
        }
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Session whose results will be accepted
    pub fn current_session(&self) -> Option<SessionId> {
        self.current
    }

    /// Target of the most recent request
    pub fn last_target(&self) -> Option<RenderTarget> {
        self.last_target
    }

    pub fn in_flight_target(&self) -> Option<RenderTarget> {
        self.in_flight.map(|f| f.target)
    }

    pub fn retries_pending(&self) -> usize {
        self.retries_pending
    }

    /// Load whose answer will be accepted
    pub fn pending_load(&self) -> Option<LoadId> {
        self.loading
    }

    /// Whether a timer armed with `token` would still start a retry
    pub fn is_retry_live(&self, token: RetryToken) -> bool {
        token.sequence == self.sequence && self.retries_pending > 0
    }

    pub fn has_document(&self) -> bool {
        !matches!(self.phase, RenderPhase::Idle | RenderPhase::Loading)
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::BeginLoad => {
                let mut effects = self.drop_in_flight();
                self.reset_to(RenderPhase::Loading);
                let load = LoadId(self.next_load);
                self.next_load += 1;
                self.loading = Some(load);
                effects.push(Effect::StartLoad(load));
                effects
            }

            Command::DocumentLoaded { load, page_count } => {
                if self.loading != Some(load) {
                    debug!("Ignoring answer to superseded load {load:?}");
                    return vec![];
                }
                self.loading = None;
                self.page_count = page_count;
                self.phase = RenderPhase::Ready;
                vec![]
            }

            Command::LoadFailed(load) => {
                if self.loading != Some(load) {
                    debug!("Ignoring failure of superseded load {load:?}");
                    return vec![];
                }
                let effects = self.drop_in_flight();
                self.reset_to(RenderPhase::Idle);
                effects
            }

            Command::RequestRender { target, policy } => {
                if !self.has_document() {
                    debug!("Render of {target:?} requested without a document");
                    return vec![];
                }
                self.sequence += 1;
                self.retries_pending = 0;
                self.last_target = Some(target);
                self.start(target, policy)
            }

            Command::RetryDue(token) => {
                if !self.is_retry_live(token) {
                    debug!("Dropping stale retry {token:?}");
                    return vec![];
                }
                let Some(target) = self.last_target else {
                    return vec![];
                };
                self.retries_pending -= 1;
                debug!(
                    "Stabilization retry {} for page {} ({} left)",
                    token.attempt, target.page, self.retries_pending
                );
                self.start(target, RetryPolicy::Single)
            }

            Command::Completed(session) => {
                let Some(flight) = self.take_current(session) else {
                    debug!("Ignoring completion of superseded session {session:?}");
                    return vec![];
                };

                let mut effects = vec![Effect::AcceptPage(session)];
                if flight.policy == RetryPolicy::Stabilize {
                    self.retries_pending = self.retry_delays.len();
                    effects.extend(self.retry_delays.iter().enumerate().map(|(i, &delay)| {
                        Effect::ScheduleRetry {
                            token: RetryToken {
                                sequence: self.sequence,
                                attempt: i + 1,
                            },
                            delay,
                        }
                    }));
                }
                self.phase = if self.retries_pending > 0 {
                    RenderPhase::Rendering
                } else {
                    RenderPhase::Stable
                };
                effects
            }

            Command::Failed(session) => {
                if self.take_current(session).is_none() {
                    debug!("Ignoring failure of superseded session {session:?}");
                    return vec![];
                }
                // Render failures are not transient; stop any stabilization
                self.sequence += 1;
                self.retries_pending = 0;
                self.phase = RenderPhase::Ready;
                vec![Effect::DiscardPage(session)]
            }

            Command::Cancelled(session) => {
                debug!("Render session {session:?} cancelled");
                vec![]
            }
        }
    }

    fn start(&mut self, target: RenderTarget, policy: RetryPolicy) -> Vec<Effect> {
        let mut effects = vec![];
        if let Some(previous) = self.in_flight.take() {
            if previous.target != target {
                effects.push(Effect::CancelRender(previous.session));
            }
        }

        let session = SessionId::new(self.next_session);
        self.next_session += 1;
        self.in_flight = Some(InFlight {
            session,
            target,
            policy,
        });
        self.current = Some(session);
        self.phase = RenderPhase::Rendering;
        effects.push(Effect::StartRender { session, target });
        effects
    }

    fn take_current(&mut self, session: SessionId) -> Option<InFlight> {
        if self.current != Some(session) {
            return None;
        }
        let flight = self.in_flight.filter(|f| f.session == session)?;
        self.in_flight = None;
        Some(flight)
    }

    fn drop_in_flight(&mut self) -> Vec<Effect> {
        self.in_flight
            .take()
            .map(|f| vec![Effect::CancelRender(f.session)])
            .unwrap_or_default()
    }

    fn reset_to(&mut self, phase: RenderPhase) {
        self.phase = phase;
        self.page_count = 0;
        self.current = None;
        self.last_target = None;
        self.loading = None;
        self.sequence += 1;
        self.retries_pending = 0;
    }
}

/// Commands that drive the render lifecycle
#[derive(Clone, Debug)]
pub enum Command {
    /// A new document is being opened
    BeginLoad,
    /// The engine parsed the document opened by `load`
    DocumentLoaded { load: LoadId, page_count: usize },
    /// The engine rejected the document opened by `load`
    LoadFailed(LoadId),
    /// Render a page, superseding whatever is current
    RequestRender {
        target: RenderTarget,
        policy: RetryPolicy,
    },
    /// A scheduled stabilization retry fired
    RetryDue(RetryToken),
    /// The engine finished a session
    Completed(SessionId),
    /// The engine failed a session
    Failed(SessionId),
    /// The engine acknowledged a cancellation
    Cancelled(SessionId),
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Hand the new document's bytes to the engine under `LoadId`
    StartLoad(LoadId),
    /// Ask the engine to render `target` under `session`
    StartRender {
        session: SessionId,
        target: RenderTarget,
    },
    /// Ask the engine to abandon a session
    CancelRender(SessionId),
    /// Fire [`Command::RetryDue`] with `token` after `delay`
    ScheduleRetry { token: RetryToken, delay: Duration },
    /// Results of `session` are current: replace runs and masks
    AcceptPage(SessionId),
    /// `session` failed: clear runs and masks
    DiscardPage(SessionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin_load(lifecycle: &mut RenderLifecycle) -> LoadId {
        let _ = lifecycle.apply(Command::BeginLoad);
        lifecycle.pending_load().expect("load pending")
    }

    fn ready_lifecycle() -> RenderLifecycle {
        let mut lifecycle = RenderLifecycle::default();
        let load = begin_load(&mut lifecycle);
        let _ = lifecycle.apply(Command::DocumentLoaded {
            load,
            page_count: 3,
        });
        lifecycle
    }

    fn started(effects: &[Effect]) -> SessionId {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::StartRender { session, .. } => Some(*session),
                _ => None,
            })
            .expect("render started")
    }

    fn request(lifecycle: &mut RenderLifecycle, page: usize, policy: RetryPolicy) -> Vec<Effect> {
        lifecycle.apply(Command::RequestRender {
            target: RenderTarget::new(page, 1.0),
            policy,
        })
    }

    #[test]
    fn idle_lifecycle_ignores_render_requests() {
        let mut lifecycle = RenderLifecycle::default();
        assert!(request(&mut lifecycle, 1, RetryPolicy::Single).is_empty());
        assert_eq!(lifecycle.phase(), RenderPhase::Idle);
    }

    #[test]
    fn load_moves_through_loading_to_ready() {
        let mut lifecycle = RenderLifecycle::default();
        let effects = lifecycle.apply(Command::BeginLoad);
        let load = lifecycle.pending_load().unwrap();
        assert_eq!(effects, vec![Effect::StartLoad(load)]);
        assert_eq!(lifecycle.phase(), RenderPhase::Loading);
        let _ = lifecycle.apply(Command::DocumentLoaded {
            load,
            page_count: 3,
        });
        assert_eq!(lifecycle.phase(), RenderPhase::Ready);
        assert_eq!(lifecycle.page_count(), 3);
        assert_eq!(lifecycle.pending_load(), None);
    }

    #[test]
    fn answers_to_superseded_loads_are_ignored() {
        let mut lifecycle = RenderLifecycle::default();
        let first = begin_load(&mut lifecycle);
        let second = begin_load(&mut lifecycle);
        assert_ne!(first, second);

        assert!(lifecycle.apply(Command::LoadFailed(first)).is_empty());
        assert_eq!(lifecycle.phase(), RenderPhase::Loading);
        let _ = lifecycle.apply(Command::DocumentLoaded {
            load: first,
            page_count: 9,
        });
        assert_eq!(lifecycle.phase(), RenderPhase::Loading);

        let _ = lifecycle.apply(Command::DocumentLoaded {
            load: second,
            page_count: 4,
        });
        assert_eq!(lifecycle.phase(), RenderPhase::Ready);
        assert_eq!(lifecycle.page_count(), 4);
    }

    #[test]
    fn different_target_cancels_in_flight_session() {
        let mut lifecycle = ready_lifecycle();
        let first = started(&request(&mut lifecycle, 1, RetryPolicy::Single));
        let effects = request(&mut lifecycle, 2, RetryPolicy::Single);
        let second = started(&effects);

        assert_eq!(effects[0], Effect::CancelRender(first));
        assert_ne!(first, second);
        assert_eq!(lifecycle.current_session(), Some(second));
    }

    #[test]
    fn same_target_supersedes_without_cancel() {
        let mut lifecycle = ready_lifecycle();
        let first = started(&request(&mut lifecycle, 1, RetryPolicy::Single));
        let effects = request(&mut lifecycle, 1, RetryPolicy::Single);
        let second = started(&effects);

        assert_eq!(effects.len(), 1);
        assert!(lifecycle.apply(Command::Completed(first)).is_empty());
        assert_eq!(
            lifecycle.apply(Command::Completed(second)),
            vec![Effect::AcceptPage(second)]
        );
    }

    #[test]
    fn late_completion_of_superseded_session_is_ignored() {
        let mut lifecycle = ready_lifecycle();
        let first = started(&request(&mut lifecycle, 1, RetryPolicy::Single));
        let second = started(&request(&mut lifecycle, 2, RetryPolicy::Single));

        assert_eq!(
            lifecycle.apply(Command::Completed(second)),
            vec![Effect::AcceptPage(second)]
        );
        assert!(lifecycle.apply(Command::Completed(first)).is_empty());
        assert!(lifecycle.apply(Command::Failed(first)).is_empty());
        assert_eq!(lifecycle.phase(), RenderPhase::Stable);
    }

    #[test]
    fn stabilize_schedules_retries_after_first_success() {
        let mut lifecycle = ready_lifecycle();
        let session = started(&request(&mut lifecycle, 1, RetryPolicy::Stabilize));

        let effects = lifecycle.apply(Command::Completed(session));
        assert_eq!(effects[0], Effect::AcceptPage(session));
        let delays: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::ScheduleRetry { delay, .. } => Some(*delay),
                _ => None,
            })
            .collect();
        assert_eq!(delays, DEFAULT_RETRY_DELAYS.to_vec());
        assert_eq!(lifecycle.phase(), RenderPhase::Rendering);
        assert_eq!(lifecycle.retries_pending(), 3);
    }

    #[test]
    fn retries_run_to_stable_without_rescheduling() {
        let mut lifecycle = ready_lifecycle();
        let session = started(&request(&mut lifecycle, 1, RetryPolicy::Stabilize));
        let tokens: Vec<_> = lifecycle
            .apply(Command::Completed(session))
            .into_iter()
            .filter_map(|e| match e {
                Effect::ScheduleRetry { token, .. } => Some(token),
                _ => None,
            })
            .collect();

        for token in tokens {
            let retry = started(&lifecycle.apply(Command::RetryDue(token)));
            let effects = lifecycle.apply(Command::Completed(retry));
            assert_eq!(effects, vec![Effect::AcceptPage(retry)]);
        }
        assert_eq!(lifecycle.phase(), RenderPhase::Stable);
    }

    #[test]
    fn new_request_invalidates_pending_retries() {
        let mut lifecycle = ready_lifecycle();
        let session = started(&request(&mut lifecycle, 1, RetryPolicy::Stabilize));
        let token = lifecycle
            .apply(Command::Completed(session))
            .into_iter()
            .find_map(|e| match e {
                Effect::ScheduleRetry { token, .. } => Some(token),
                _ => None,
            })
            .unwrap();

        assert!(lifecycle.is_retry_live(token));
        let _ = request(&mut lifecycle, 2, RetryPolicy::Single);
        assert!(!lifecycle.is_retry_live(token));
        assert!(lifecycle.apply(Command::RetryDue(token)).is_empty());
        assert_eq!(lifecycle.retries_pending(), 0);
    }

    #[test]
    fn failure_discards_page_and_returns_to_ready() {
        let mut lifecycle = ready_lifecycle();
        let session = started(&request(&mut lifecycle, 1, RetryPolicy::Stabilize));
        assert_eq!(
            lifecycle.apply(Command::Failed(session)),
            vec![Effect::DiscardPage(session)]
        );
        assert_eq!(lifecycle.phase(), RenderPhase::Ready);
        assert_eq!(lifecycle.retries_pending(), 0);
    }

    #[test]
    fn new_load_cancels_in_flight_render() {
        let mut lifecycle = ready_lifecycle();
        let session = started(&request(&mut lifecycle, 1, RetryPolicy::Single));
        let effects = lifecycle.apply(Command::BeginLoad);
        assert_eq!(effects[0], Effect::CancelRender(session));
        assert!(matches!(effects[1], Effect::StartLoad(_)));
        assert!(lifecycle.apply(Command::Completed(session)).is_empty());
        assert_eq!(lifecycle.phase(), RenderPhase::Loading);
    }

    #[test]
    fn cancellation_ack_is_a_no_op() {
        let mut lifecycle = ready_lifecycle();
        let first = started(&request(&mut lifecycle, 1, RetryPolicy::Single));
        let second = started(&request(&mut lifecycle, 2, RetryPolicy::Single));
        assert!(lifecycle.apply(Command::Cancelled(first)).is_empty());
        assert_eq!(lifecycle.current_session(), Some(second));
        assert_eq!(lifecycle.phase(), RenderPhase::Rendering);
    }
}
