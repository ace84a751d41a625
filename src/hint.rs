//! Per-round hint bookkeeping.
//!
//! Every state change triggers a speculative solver request so a hint can
//! usually be served from cache. Replies are matched against the id of the
//! newest request; anything older is dropped.
//!
//! ```text
//! idle -> awaiting-computation -> ready -> (consumed | expired) -> idle
//!                          any -> exhausted once no hints remain
//! ```

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::WorkerError;
use crate::puzzle::{Direction, Move, PuzzleState};
use crate::solver::SearchPath;
use crate::worker::{RequestId, SolverBackend, SolverReply};

/// Upper bound on the optimal solution length for a grid size.
pub fn max_solution_estimate(size: usize) -> usize {
    match size {
        0 | 1 => 0,
        2 => 6,
        3 => 31,
        4 => 80,
        5 => 205,
        n => n * n * n,
    }
}

/// Hints granted for a round: `percentage` of the solution-length bound,
/// rounded up.
pub fn hint_budget(size: usize, percentage: u8) -> usize {
    let percentage = percentage.min(100) as usize;
    (max_solution_estimate(size) * percentage).div_ceil(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintSettings {
    /// How long the cue stays on screen if the player ignores it.
    pub timeout: Duration,
    /// Leading moves of a path shown per hint.
    pub moves_per_hint: usize,
}

impl Default for HintSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            moves_per_hint: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintPhase {
    Idle,
    AwaitingComputation,
    Ready,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// The move currently cued on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub tile_id: usize,
    pub tile_position: usize,
    pub direction: Direction,
    /// Length of the full solution, when one was found.
    pub solution_length: Option<usize>,
}

impl Hint {
    pub fn as_move(&self) -> Move {
        Move {
            tile_id: self.tile_id,
            direction: self.direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    Shown(Hint),
    /// The computation is still running; the hint arrives as an event.
    Pending,
    Refused,
    AlreadySolved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintEvent {
    Ready(Hint),
    Failed(String),
    Followed(Progress),
    Invalidated,
    Expired,
}

/// Answer for the newest request. It stays cached until the board changes,
/// so a hint can be served again after the cue expires.
#[derive(Debug, Clone)]
enum Cached {
    Path(SearchPath),
    Failed,
}

#[derive(Debug, Clone)]
struct ActiveHint {
    hint: Hint,
    remaining: VecDeque<Move>,
    exposed: usize,
    visible: bool,
    expires_at: Instant,
}

pub struct HintSessionManager<B> {
    backend: B,
    settings: HintSettings,
    hints_remaining: usize,
    next_request: RequestId,
    latest_request: Option<RequestId>,
    cached: Option<Cached>,
    pending: bool,
    unavailable: bool,
    active: Option<ActiveHint>,
    progress: Option<Progress>,
    events: Vec<HintEvent>,
}

impl<B: SolverBackend> HintSessionManager<B> {
    pub fn new(backend: B, hints: usize, settings: HintSettings) -> Self {
        Self {
            backend,
            settings,
            hints_remaining: hints,
            next_request: 1,
            latest_request: None,
            cached: None,
            pending: false,
            unavailable: false,
            active: None,
            progress: None,
            events: Vec::new(),
        }
    }

    /// Start a fresh round on `state` with a new budget.
    pub fn reset(&mut self, state: &PuzzleState, hints: usize) {
        self.hints_remaining = hints;
        self.cached = None;
        self.pending = false;
        self.active = None;
        self.progress = None;
        self.events.clear();
        self.state_changed(state);
    }

    pub fn hints_remaining(&self) -> usize {
        self.hints_remaining
    }

    pub fn phase(&self) -> HintPhase {
        if self.pending {
            HintPhase::AwaitingComputation
        } else if self.active.as_ref().is_some_and(|a| a.visible) {
            HintPhase::Ready
        } else if self.hints_remaining == 0 {
            HintPhase::Exhausted
        } else {
            HintPhase::Idle
        }
    }

    /// The cue to draw, if any.
    pub fn visible_hint(&self) -> Option<Hint> {
        self.active
            .as_ref()
            .filter(|a| a.visible)
            .map(|a| a.hint)
    }

    /// Moves of the hinted path the player has not played yet.
    pub fn active_path(&self) -> Option<Vec<Move>> {
        self.active
            .as_ref()
            .map(|a| a.remaining.iter().copied().collect())
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    /// True while a reply for the current state is outstanding.
    pub fn is_computing(&self) -> bool {
        self.latest_request.is_some() && self.cached.is_none() && !self.unavailable
    }

    pub fn drain_events(&mut self) -> Vec<HintEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ask for a fresh path for `state`; older computations become stale.
    pub fn state_changed(&mut self, state: &PuzzleState) {
        let id = self.next_request;
        self.next_request += 1;
        self.latest_request = Some(id);
        self.cached = None;

        match self.backend.submit(id, state) {
            Ok(()) => {
                self.unavailable = false;
                debug!("Submitted solver request {id}");
            }
            Err(err) => {
                warn!("Could not submit solver request {id}: {err}");
                self.unavailable = true;
            }
        }
    }

    /// Record an accepted move (`state` is the board after it) and refresh
    /// the speculative computation.
    pub fn on_move(&mut self, state: &PuzzleState, mv: Move, now: Instant) {
        if let Some(active) = self.active.as_mut() {
            if active.remaining.front() == Some(&mv) {
                active.remaining.pop_front();
                let progress = self.progress.get_or_insert(Progress {
                    current: 0,
                    total: 0,
                });
                progress.current += 1;
                let progress = *progress;
                self.events.push(HintEvent::Followed(progress));

                active.exposed = active.exposed.saturating_sub(1);
                if active.visible {
                    match active.remaining.front() {
                        Some(&next) if active.exposed > 0 => {
                            if let Some(tile_position) = state.position_of(next.tile_id) {
                                active.hint = Hint {
                                    tile_id: next.tile_id,
                                    tile_position,
                                    direction: next.direction,
                                    solution_length: active.hint.solution_length,
                                };
                                active.expires_at = now + self.settings.timeout;
                                self.events.push(HintEvent::Ready(active.hint));
                            }
                        }
                        _ => active.visible = false,
                    }
                }
                if active.remaining.is_empty() {
                    self.active = None;
                    self.progress = None;
                }
            } else {
                debug!("Move {mv} deviates from the hinted path");
                self.active = None;
                self.progress = None;
                self.events.push(HintEvent::Invalidated);
            }
        }

        self.state_changed(state);
    }

    pub fn request_hint(&mut self, state: &PuzzleState, now: Instant) -> HintOutcome {
        if self.hints_remaining == 0 {
            info!("Hint refused: budget exhausted");
            return HintOutcome::Refused;
        }
        if let Some(hint) = self.visible_hint() {
            return HintOutcome::Shown(hint);
        }
        if self.pending {
            return HintOutcome::Pending;
        }
        if state.is_solved() {
            return HintOutcome::AlreadySolved;
        }

        match self.cached.clone() {
            Some(Cached::Path(path)) => self.serve(path, state, now),
            Some(Cached::Failed) => {
                self.fail(state, "the solver could not find a move".to_string())
            }
            None => {
                if self.unavailable || self.latest_request.is_none() {
                    self.state_changed(state);
                }
                if self.unavailable {
                    return self.fail(state, WorkerError::Disconnected.to_string());
                }
                debug!("Hint requested while computing");
                self.pending = true;
                HintOutcome::Pending
            }
        }
    }

    /// Collect solver replies and expire an ignored cue. Never blocks.
    pub fn pump(&mut self, state: &PuzzleState, now: Instant) {
        loop {
            match self.backend.try_reply() {
                Ok(Some(reply)) => self.accept(reply, state, now),
                Ok(None) => break,
                Err(err) => {
                    self.disconnected(state, err);
                    break;
                }
            }
        }
        self.expire(now);
    }

    /// Block for at most `timeout` until the newest request is answered.
    /// Returns whether a reply for the current state is available.
    pub fn wait_for_reply(&mut self, state: &PuzzleState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_computing() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            match self.backend.wait_reply(left) {
                Ok(Some(reply)) => self.accept(reply, state, Instant::now()),
                Ok(None) => return false,
                Err(err) => {
                    self.disconnected(state, err);
                    return false;
                }
            }
        }
        !self.unavailable
    }

    fn accept(&mut self, reply: SolverReply, state: &PuzzleState, now: Instant) {
        if self.latest_request != Some(reply.request_id) {
            debug!("Dropping stale reply {}", reply.request_id);
            return;
        }

        self.cached = Some(match reply.search_path() {
            Some(path) => Cached::Path(path),
            None => Cached::Failed,
        });

        if self.pending {
            self.pending = false;
            let _ = self.request_hint(state, now);
        }
    }

    fn serve(&mut self, path: SearchPath, state: &PuzzleState, now: Instant) -> HintOutcome {
        let Some(first) = path.first() else {
            return HintOutcome::AlreadySolved;
        };
        let Some(tile_position) = state
            .position_of(first.tile_id)
            .filter(|_| state.apply(first).is_some())
        else {
            return self.fail(state, format!("hint {first} does not fit the board"));
        };

        let hint = Hint {
            tile_id: first.tile_id,
            tile_position,
            direction: first.direction,
            solution_length: path.found.then(|| path.len()),
        };
        let total = if path.found { path.len() } else { 1 };

        self.hints_remaining -= 1;
        self.progress = Some(Progress { current: 0, total });
        self.active = Some(ActiveHint {
            hint,
            remaining: path.moves.into_iter().collect(),
            exposed: self.settings.moves_per_hint.max(1),
            visible: true,
            expires_at: now + self.settings.timeout,
        });
        info!("Hint: {} ({} left)", hint.as_move(), self.hints_remaining);
        self.events.push(HintEvent::Ready(hint));
        HintOutcome::Shown(hint)
    }

    /// Budget stays untouched; a fresh computation is queued for the retry.
    fn fail(&mut self, state: &PuzzleState, reason: String) -> HintOutcome {
        warn!("Hint failed: {reason}");
        self.pending = false;
        self.events.push(HintEvent::Failed(reason));
        self.state_changed(state);
        HintOutcome::Failed
    }

    fn disconnected(&mut self, state: &PuzzleState, err: WorkerError) {
        warn!("Solver lost: {err}");
        self.unavailable = true;
        self.cached = None;
        if self.pending {
            let _ = self.fail(state, err.to_string());
        }
    }

    fn expire(&mut self, now: Instant) {
        if let Some(active) = self.active.as_mut() {
            if active.visible && now >= active.expires_at {
                active.visible = false;
                debug!("Hint for tile {} expired", active.hint.tile_id);
                self.events.push(HintEvent::Expired);
            }
        }
    }
}
