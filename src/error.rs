use std::io;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("grid size {0} is outside the supported range {min}..={max}", min = crate::puzzle::MIN_GRID_SIZE, max = crate::puzzle::MAX_GRID_SIZE)]
    InvalidGridSize(usize),
    #[error("expected {expected} tiles, found {found}")]
    WrongTileCount { expected: usize, found: usize },
    #[error("tiles do not form a permutation of 0..{0}")]
    NotAPermutation(usize),
    #[error("arrangement is not solvable")]
    Unsolvable,
    #[error("shuffle produced an unsolvable board")]
    InvalidShuffle,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("puzzle is not solvable")]
    Unsolvable,
    #[error("no legal move available")]
    NoMoves,
    #[error("search superseded by a newer request")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("could not start solver thread: {0}")]
    Spawn(String),
    #[error("solver is unavailable")]
    Disconnected,
}
