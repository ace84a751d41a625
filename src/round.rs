//! One round of the sliding-puzzle game: the board, the move counter, the
//! clock and the hint session, plus the events the UI reacts to.

use log::info;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::GameConfig;
use crate::error::PuzzleError;
use crate::hint::{self, HintEvent, HintOutcome, HintSessionManager};
use crate::puzzle::{Direction, Move, PuzzleState};
use crate::shuffle::Shuffler;
use crate::worker::SolverBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Playing,
    Won,
    TimeUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Moved { mv: Move, moves: usize },
    Hint(HintEvent),
    Won { moves: usize, elapsed: Duration },
    TimeUp,
}

pub struct Round<B> {
    state: PuzzleState,
    hints: HintSessionManager<B>,
    hint_budget: usize,
    moves: usize,
    started: Instant,
    time_limit: Option<Duration>,
    status: RoundStatus,
    events: VecDeque<GameEvent>,
}

impl<B: SolverBackend> Round<B> {
    /// Shuffle a board and start the first round.
    pub fn start(
        config: &GameConfig,
        shuffler: &mut Shuffler,
        backend: B,
        now: Instant,
    ) -> Result<Self, PuzzleError> {
        let state = shuffler.shuffle(config.grid_size)?;
        Self::with_state(state, config, backend, now)
    }

    /// Start a round on a given board.
    pub fn with_state(
        state: PuzzleState,
        config: &GameConfig,
        backend: B,
        now: Instant,
    ) -> Result<Self, PuzzleError> {
        if !state.is_solvable() {
            return Err(PuzzleError::Unsolvable);
        }

        let hint_budget = hint::hint_budget(state.size(), config.hint_percentage());
        let mut hints = HintSessionManager::new(backend, hint_budget, config.hint_settings());
        hints.state_changed(&state);
        info!(
            "Round started on a {0}x{0} board with {1} hints",
            state.size(),
            hint_budget
        );

        Ok(Self {
            state,
            hints,
            hint_budget,
            moves: 0,
            started: now,
            time_limit: config.time_limit(),
            status: RoundStatus::Playing,
            events: VecDeque::new(),
        })
    }

    /// Discard the current board and start over on a fresh shuffle, keeping
    /// the solver backend.
    pub fn restart(&mut self, shuffler: &mut Shuffler, now: Instant) -> Result<(), PuzzleError> {
        let state = shuffler.shuffle(self.state.size())?;
        self.hints.reset(&state, self.hint_budget);
        self.state = state;
        self.moves = 0;
        self.started = now;
        self.status = RoundStatus::Playing;
        self.events.clear();
        info!("Round restarted");
        Ok(())
    }

    pub fn state(&self) -> &PuzzleState {
        &self.state
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn hints(&self) -> &HintSessionManager<B> {
        &self.hints
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.time_limit
            .map(|limit| limit.saturating_sub(self.elapsed(now)))
    }

    /// Click on the tile at `position`. Returns whether the board changed.
    pub fn click(&mut self, position: usize, now: Instant) -> bool {
        if self.status != RoundStatus::Playing {
            return false;
        }
        match self.state.move_tile(position) {
            Some((next, mv)) => {
                self.commit(next, mv, now);
                true
            }
            None => false,
        }
    }

    /// Slide whichever tile can move in `direction`.
    pub fn slide(&mut self, direction: Direction, now: Instant) -> bool {
        if self.status != RoundStatus::Playing {
            return false;
        }
        match self.state.slide(direction) {
            Some((next, mv)) => {
                self.commit(next, mv, now);
                true
            }
            None => false,
        }
    }

    pub fn request_hint(&mut self, now: Instant) -> HintOutcome {
        if self.status != RoundStatus::Playing {
            return HintOutcome::Refused;
        }
        let outcome = self.hints.request_hint(&self.state, now);
        self.collect_hint_events();
        outcome
    }

    /// Poll the solver, expire hints and check the clock.
    pub fn tick(&mut self, now: Instant) {
        self.hints.pump(&self.state, now);
        self.collect_hint_events();

        if self.status == RoundStatus::Playing && self.time_left(now) == Some(Duration::ZERO) {
            self.status = RoundStatus::TimeUp;
            info!("Time is up after {} moves", self.moves);
            self.events.push_back(GameEvent::TimeUp);
        }
    }

    /// Block for at most `timeout` until the solver has answered for the
    /// current board.
    pub fn wait_for_solver(&mut self, timeout: Duration) -> bool {
        let ready = self.hints.wait_for_reply(&self.state, timeout);
        self.collect_hint_events();
        ready
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    fn commit(&mut self, next: PuzzleState, mv: Move, now: Instant) {
        self.state = next;
        self.moves += 1;
        self.events.push_back(GameEvent::Moved {
            mv,
            moves: self.moves,
        });

        self.hints.on_move(&self.state, mv, now);
        self.collect_hint_events();

        if self.state.is_solved() {
            self.status = RoundStatus::Won;
            let elapsed = self.elapsed(now);
            info!("Solved in {} moves ({:.1}s)", self.moves, elapsed.as_secs_f32());
            self.events.push_back(GameEvent::Won {
                moves: self.moves,
                elapsed,
            });
        }
    }

    fn collect_hint_events(&mut self) {
        self.events
            .extend(self.hints.drain_events().into_iter().map(GameEvent::Hint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::worker::{RequestId, SolverReply};

    /// Solves synchronously at submit time.
    #[derive(Default)]
    struct Inline {
        replies: VecDeque<SolverReply>,
    }

    impl SolverBackend for Inline {
        fn submit(&mut self, request_id: RequestId, state: &PuzzleState) -> Result<(), WorkerError> {
            let tiles: Vec<_> = state.tiles().collect();
            let config = crate::solver::SolverConfig::default();
            if let Some(reply) =
                crate::worker::answer(request_id, &tiles, state.size(), &config, &|| false)
            {
                self.replies.push_back(reply);
            }
            Ok(())
        }

        fn try_reply(&mut self) -> Result<Option<SolverReply>, WorkerError> {
            Ok(self.replies.pop_front())
        }
    }

    fn two_move_round(config: &GameConfig, now: Instant) -> Round<Inline> {
        let state = PuzzleState::from_ids(3, &[0, 1, 2, 3, 8, 4, 6, 7, 5]).unwrap();
        Round::with_state(state, config, Inline::default(), now).unwrap()
    }

    #[test]
    fn test_win_by_clicks() {
        let now = Instant::now();
        let mut round = two_move_round(&GameConfig::default(), now);

        assert!(!round.click(0, now), "diagonal click must be ignored");
        assert_eq!(round.moves(), 0);

        assert!(round.click(5, now));
        assert!(round.click(8, now));
        assert_eq!(round.status(), RoundStatus::Won);
        assert_eq!(round.moves(), 2);

        let events = round.drain_events();
        assert!(matches!(
            events.last(),
            Some(GameEvent::Won { moves: 2, .. })
        ));
        assert!(!round.click(7, now), "no moves after a win");
    }

    #[test]
    fn test_hint_then_follow() {
        let now = Instant::now();
        let config = GameConfig {
            grid_size: 3,
            ..GameConfig::default()
        };
        let mut round = two_move_round(&config, now);
        let budget = round.hints().hints_remaining();
        round.tick(now);

        let HintOutcome::Shown(hint) = round.request_hint(now) else {
            panic!("expected a cached hint");
        };
        assert_eq!(hint.tile_id, 4);
        assert_eq!(hint.direction, Direction::Left);
        assert_eq!(round.hints().hints_remaining(), budget - 1);

        assert!(round.slide(hint.direction, now));
        let events = round.drain_events();
        assert!(events.contains(&GameEvent::Hint(HintEvent::Followed(
            crate::hint::Progress {
                current: 1,
                total: 2
            }
        ))));
    }

    #[test]
    fn test_restart_resets_round() {
        let now = Instant::now();
        let mut round = two_move_round(&GameConfig::default(), now);
        round.click(5, now);
        let mut shuffler = Shuffler::with_seed(8);
        round.restart(&mut shuffler, now).unwrap();
        assert_eq!(round.moves(), 0);
        assert_eq!(round.status(), RoundStatus::Playing);
        assert_eq!(round.hints().hints_remaining(), hint::hint_budget(3, 10));
        assert!(round.drain_events().is_empty());
    }

    #[test]
    fn test_time_limit() {
        let now = Instant::now();
        let config = GameConfig {
            time_limit_secs: Some(30),
            ..GameConfig::default()
        };
        let mut round = two_move_round(&config, now);
        round.tick(now + Duration::from_secs(10));
        assert_eq!(round.status(), RoundStatus::Playing);
        assert_eq!(
            round.time_left(now + Duration::from_secs(10)),
            Some(Duration::from_secs(20))
        );

        round.tick(now + Duration::from_secs(31));
        assert_eq!(round.status(), RoundStatus::TimeUp);
        assert!(round.drain_events().contains(&GameEvent::TimeUp));
        assert!(!round.click(5, now + Duration::from_secs(32)));
        assert_eq!(
            round.request_hint(now + Duration::from_secs(32)),
            HintOutcome::Refused
        );
    }

    #[test]
    fn test_unsolvable_board_rejected() {
        let state = PuzzleState::from_ids(3, &[1, 0, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert!(matches!(
            Round::with_state(state, &GameConfig::default(), Inline::default(), Instant::now()),
            Err(PuzzleError::Unsolvable)
        ));
    }
}
