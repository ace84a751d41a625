//! slider-puzzle-engine: the sliding-puzzle core of the mini-game platform
//!
//! This crate provides:
//! - `PuzzleState` with move validation and application (`puzzle` module)
//! - The parity-based solvability test (`solvability`) and solvable shuffles (`shuffle`)
//! - A bounded IDA* hint solver (`solver`) that runs on a background thread (`worker`)
//! - Per-round hint budget and lifecycle (`hint`), wrapped together with the board in `round`
//!
//! Quick start:
//! ```
//! use slider_puzzle_engine::puzzle::PuzzleState;
//! use slider_puzzle_engine::shuffle::Shuffler;
//! use slider_puzzle_engine::solver::{self, SolverConfig};
//!
//! let start = Shuffler::with_seed(42).shuffle(3).unwrap();
//! assert!(start.is_solvable());
//!
//! let path = solver::solve(&start, &SolverConfig::default()).unwrap();
//! assert!(path.found);
//! let end = path
//!     .moves
//!     .iter()
//!     .fold(start, |state, &mv| state.apply(mv).unwrap());
//! assert!(end.is_solved());
//! ```
//!
pub mod config;
pub mod error;
pub mod hint;
pub mod puzzle;
pub mod round;
pub mod shuffle;
pub mod solvability;
pub mod solver;
pub mod worker;
