//! Background solver context.
//!
//! The interactive side and the solver thread share nothing but two channels
//! and a "latest request" counter used as a cancellation token. Requests are
//! immutable snapshots; every reply carries the id of the request it answers
//! so the caller can drop stale ones.

use async_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{SolveError, WorkerError};
use crate::puzzle::{Move, PuzzleState, Tile};
use crate::solver::{self, SearchPath, SolverConfig};

pub type RequestId = u64;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SolverRequest {
    #[serde(rename_all = "camelCase")]
    Solve {
        request_id: RequestId,
        tiles: Vec<Tile>,
        grid_size: usize,
    },
    Shutdown,
}

impl SolverRequest {
    pub fn solve(request_id: RequestId, state: &PuzzleState) -> Self {
        SolverRequest::Solve {
            request_id,
            tiles: state.tiles().collect(),
            grid_size: state.size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverReply {
    pub request_id: RequestId,
    pub success: bool,
    pub found: bool,
    pub path: Vec<Move>,
}

impl SolverReply {
    pub fn failure(request_id: RequestId) -> Self {
        Self {
            request_id,
            success: false,
            found: false,
            path: Vec::new(),
        }
    }

    pub fn search_path(&self) -> Option<SearchPath> {
        self.success.then(|| SearchPath {
            found: self.found,
            moves: self.path.clone(),
        })
    }
}

/// Solve one request. Returns `None` when the search was cancelled.
pub fn answer(
    request_id: RequestId,
    tiles: &[Tile],
    grid_size: usize,
    config: &SolverConfig,
    cancelled: &dyn Fn() -> bool,
) -> Option<SolverReply> {
    let state = match PuzzleState::from_tiles(grid_size, tiles) {
        Ok(state) => state,
        Err(err) => {
            warn!("Request {request_id} rejected: {err}");
            return Some(SolverReply::failure(request_id));
        }
    };

    match solver::solve_with_cancel(&state, config, cancelled) {
        Ok(path) => Some(SolverReply {
            request_id,
            success: true,
            found: path.found,
            path: path.moves,
        }),
        Err(SolveError::Cancelled) => None,
        Err(err) => {
            warn!("Request {request_id} failed: {err}");
            Some(SolverReply::failure(request_id))
        }
    }
}

/// Where hint computations run. The interactive side only ever submits
/// snapshots and collects replies.
pub trait SolverBackend {
    /// Queue a computation; it supersedes anything submitted earlier.
    fn submit(&mut self, request_id: RequestId, state: &PuzzleState) -> Result<(), WorkerError>;

    /// Next reply, if one has arrived. Never blocks.
    fn try_reply(&mut self) -> Result<Option<SolverReply>, WorkerError>;

    /// Wait at most `timeout` for the next reply.
    fn wait_reply(&mut self, timeout: Duration) -> Result<Option<SolverReply>, WorkerError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(reply) = self.try_reply()? {
                return Ok(Some(reply));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Solver running on its own thread.
pub struct BackgroundSolver {
    requests: Sender<SolverRequest>,
    replies: Receiver<SolverReply>,
    latest: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl BackgroundSolver {
    pub fn spawn(config: SolverConfig) -> Result<Self, WorkerError> {
        let (request_tx, request_rx) = async_channel::unbounded::<SolverRequest>();
        let (reply_tx, reply_rx) = async_channel::unbounded::<SolverReply>();
        let latest = Arc::new(AtomicU64::new(0));

        let worker_latest = Arc::clone(&latest);
        let thread = thread::Builder::new()
            .name("puzzle-solver".to_string())
            .spawn(move || run(request_rx, reply_tx, worker_latest, config))
            .map_err(|err| WorkerError::Spawn(err.to_string()))?;

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            latest,
            thread: Some(thread),
        })
    }
}

impl SolverBackend for BackgroundSolver {
    fn submit(&mut self, request_id: RequestId, state: &PuzzleState) -> Result<(), WorkerError> {
        self.latest.store(request_id, Ordering::Relaxed);
        self.requests
            .try_send(SolverRequest::solve(request_id, state))
            .map_err(|_| WorkerError::Disconnected)
    }

    fn try_reply(&mut self) -> Result<Option<SolverReply>, WorkerError> {
        match self.replies.try_recv() {
            Ok(reply) => Ok(Some(reply)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(WorkerError::Disconnected),
        }
    }
}

impl Drop for BackgroundSolver {
    fn drop(&mut self) {
        // ids start at 1, so 0 cancels whatever is running
        self.latest.store(0, Ordering::Relaxed);
        let _ = self.requests.try_send(SolverRequest::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Solver thread panicked");
            }
        }
    }
}

fn run(
    requests: Receiver<SolverRequest>,
    replies: Sender<SolverReply>,
    latest: Arc<AtomicU64>,
    config: SolverConfig,
) {
    info!("Solver thread started");

    while let Ok(mut request) = requests.recv_blocking() {
        // Only the newest queued snapshot matters
        while !matches!(request, SolverRequest::Shutdown) {
            match requests.try_recv() {
                Ok(newer) => request = newer,
                Err(_) => break,
            }
        }

        let (request_id, tiles, grid_size) = match request {
            SolverRequest::Shutdown => break,
            SolverRequest::Solve {
                request_id,
                tiles,
                grid_size,
            } => (request_id, tiles, grid_size),
        };

        let cancelled = || latest.load(Ordering::Relaxed) != request_id;
        if cancelled() {
            debug!("Request {request_id} superseded before start");
            continue;
        }

        debug!("Solving request {request_id} ({grid_size}x{grid_size})");
        match answer(request_id, &tiles, grid_size, &config, &cancelled) {
            Some(reply) => {
                if replies.send_blocking(reply).is_err() {
                    break;
                }
            }
            None => debug!("Request {request_id} cancelled"),
        }
    }

    info!("Solver thread stopped");
}
