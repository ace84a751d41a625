//! Bounded heuristic search for the sliding puzzle.
//!
//! The search is IDA* guided by Manhattan distance plus linear conflicts.
//! Every call carries a node budget. When the budget runs out before the goal
//! is reached, the solver falls back to a short lookahead and returns the
//! single most promising move with `found == false`.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::puzzle::{coords, neighbour, Direction, Move, PuzzleState, MAX_GRID_SIZE};

/// How often (in expanded nodes) the cancellation hook is consulted.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    /// Maximum number of node expansions for the full search.
    pub node_budget: u64,
    /// Depth of the fallback lookahead used when the budget runs out.
    pub lookahead_depth: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_budget: 2_000_000,
            lookahead_depth: 8,
        }
    }
}

/// Moves toward the goal. With `found` the moves reach the goal; otherwise
/// the single move is only the best next step the budget allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPath {
    pub found: bool,
    pub moves: Vec<Move>,
}

impl SearchPath {
    pub fn first(&self) -> Option<Move> {
        self.moves.first().copied()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

pub fn solve(state: &PuzzleState, config: &SolverConfig) -> Result<SearchPath, SolveError> {
    solve_with_cancel(state, config, &|| false)
}

/// Like [`solve`], but gives up with [`SolveError::Cancelled`] once
/// `cancelled` returns true.
pub fn solve_with_cancel(
    state: &PuzzleState,
    config: &SolverConfig,
    cancelled: &dyn Fn() -> bool,
) -> Result<SearchPath, SolveError> {
    if !state.is_solvable() {
        return Err(SolveError::Unsolvable);
    }
    if state.is_solved() {
        return Ok(SearchPath {
            found: true,
            moves: Vec::new(),
        });
    }

    let mut search = Search {
        board: Board::new(state),
        path: Vec::new(),
        nodes: 0,
        budget: config.node_budget,
        cancelled,
    };
    let mut bound = search.board.heuristic();

    loop {
        match search.probe(0, bound, None) {
            Probe::Found => {
                info!(
                    "Solved {0}x{0} in {1} moves ({2} nodes)",
                    state.size(),
                    search.path.len(),
                    search.nodes
                );
                return Ok(SearchPath {
                    found: true,
                    moves: search.path,
                });
            }
            Probe::Deeper(u32::MAX) => return Err(SolveError::NoMoves),
            Probe::Deeper(next) => {
                debug!("Bound {bound} exhausted, next bound {next}");
                bound = next;
            }
            Probe::Stopped(Stop::Cancelled) => return Err(SolveError::Cancelled),
            Probe::Stopped(Stop::Budget) => {
                info!(
                    "Node budget of {} exhausted at bound {bound}, falling back to lookahead",
                    config.node_budget
                );
                break;
            }
        }
    }

    let step = best_next_move(state, config.lookahead_depth).ok_or(SolveError::NoMoves)?;
    Ok(SearchPath {
        found: false,
        moves: vec![step],
    })
}

/// Admissible estimate of the remaining number of moves.
pub fn heuristic(state: &PuzzleState) -> u32 {
    Board::new(state).heuristic()
}

pub fn manhattan_distance(state: &PuzzleState) -> u32 {
    Board::new(state).manhattan
}

pub fn linear_conflicts(state: &PuzzleState) -> u32 {
    Board::new(state).conflicts
}

/// Legal move whose subtree (to `depth` plies) reaches the lowest heuristic,
/// ties broken by the heuristic right after the move.
fn best_next_move(state: &PuzzleState, depth: usize) -> Option<Move> {
    let mut board = Board::new(state);
    let mut best: Option<((u32, u32), Move)> = None;

    for &dir in &Direction::ALL {
        let Some(mv) = board.slide(dir) else {
            continue;
        };
        let immediate = board.heuristic();
        let reachable = lookahead(&mut board, depth.saturating_sub(1), dir);
        board.undo(dir);

        let key = (reachable, immediate);
        if best.map_or(true, |(best_key, _)| key < best_key) {
            best = Some((key, mv));
        }
    }

    best.map(|(key, mv)| {
        debug!("Lookahead picked {mv} (reachable h {}, next h {})", key.0, key.1);
        mv
    })
}

fn lookahead(board: &mut Board, depth: usize, last: Direction) -> u32 {
    let h = board.heuristic();
    if depth == 0 || h == 0 {
        return h;
    }

    let mut min = h;
    for &dir in &Direction::ALL {
        if dir == last.opposite() {
            continue;
        }
        if board.slide(dir).is_some() {
            min = min.min(lookahead(board, depth - 1, dir));
            board.undo(dir);
        }
    }
    min
}

enum Stop {
    Budget,
    Cancelled,
}

enum Probe {
    Found,
    Deeper(u32),
    Stopped(Stop),
}

struct Search<'a> {
    board: Board,
    path: Vec<Move>,
    nodes: u64,
    budget: u64,
    cancelled: &'a dyn Fn() -> bool,
}

impl Search<'_> {
    fn probe(&mut self, g: u32, bound: u32, last: Option<Direction>) -> Probe {
        let h = self.board.heuristic();
        let f = g + h;
        if f > bound {
            return Probe::Deeper(f);
        }
        if h == 0 {
            return Probe::Found;
        }

        self.nodes += 1;
        if self.nodes > self.budget {
            return Probe::Stopped(Stop::Budget);
        }
        if self.nodes % CANCEL_CHECK_INTERVAL == 0 && (self.cancelled)() {
            return Probe::Stopped(Stop::Cancelled);
        }

        let mut min = u32::MAX;
        for &dir in &Direction::ALL {
            if let Some(last) = last {
                if dir == last.opposite() {
                    continue;
                }
            }

            let Some(mv) = self.board.slide(dir) else {
                continue;
            };
            self.path.push(mv);

            match self.probe(g + 1, bound, Some(dir)) {
                Probe::Found => return Probe::Found,
                Probe::Deeper(t) => min = min.min(t),
                stopped @ Probe::Stopped(_) => return stopped,
            }

            self.path.pop();
            self.board.undo(dir);
        }

        Probe::Deeper(min)
    }
}

/// Mutable scratch board with incrementally maintained heuristic terms.
struct Board {
    size: usize,
    cells: Vec<u8>,
    blank: usize,
    manhattan: u32,
    row_conflicts: Vec<u32>,
    col_conflicts: Vec<u32>,
    conflicts: u32,
}

impl Board {
    fn new(state: &PuzzleState) -> Self {
        let size = state.size();
        let mut board = Self {
            size,
            cells: state.cells().to_vec(),
            blank: state.blank_position(),
            manhattan: 0,
            row_conflicts: vec![0; size],
            col_conflicts: vec![0; size],
            conflicts: 0,
        };

        let blank_id = board.blank_id();
        board.manhattan = board
            .cells
            .iter()
            .enumerate()
            .filter(|&(_, &id)| id != blank_id)
            .map(|(pos, &id)| distance(size, id as usize, pos))
            .sum();

        for line in 0..size {
            board.row_conflicts[line] = board.line_conflicts(line, true);
            board.col_conflicts[line] = board.line_conflicts(line, false);
        }
        board.conflicts =
            board.row_conflicts.iter().sum::<u32>() + board.col_conflicts.iter().sum::<u32>();
        board
    }

    fn blank_id(&self) -> u8 {
        (self.cells.len() - 1) as u8
    }

    fn heuristic(&self) -> u32 {
        self.manhattan + 2 * self.conflicts
    }

    fn slide(&mut self, direction: Direction) -> Option<Move> {
        let tile_pos = neighbour(self.size, self.blank, direction)?;
        let old_blank = self.blank;
        let id = self.cells[tile_pos];

        self.manhattan = self.manhattan + distance(self.size, id as usize, old_blank)
            - distance(self.size, id as usize, tile_pos);
        self.cells.swap(tile_pos, old_blank);
        self.blank = tile_pos;

        let vertical = matches!(direction, Direction::Up | Direction::Down);
        let (a, b) = if vertical {
            (tile_pos / self.size, old_blank / self.size)
        } else {
            (tile_pos % self.size, old_blank % self.size)
        };
        self.refresh_line(a, vertical);
        self.refresh_line(b, vertical);

        Some(Move {
            tile_id: id as usize,
            direction,
        })
    }

    fn undo(&mut self, direction: Direction) {
        let _ = self.slide(direction.opposite());
    }

    /// A vertical slide moves a tile between rows, so only row conflicts can
    /// change; a horizontal slide likewise only touches columns.
    fn refresh_line(&mut self, line: usize, row: bool) {
        let value = self.line_conflicts(line, row);
        let slot = if row {
            &mut self.row_conflicts[line]
        } else {
            &mut self.col_conflicts[line]
        };
        self.conflicts = self.conflicts - *slot + value;
        *slot = value;
    }

    /// Tiles sitting in their goal line that must leave it to let the others
    /// pass: line length minus the longest increasing run of goal offsets.
    fn line_conflicts(&self, line: usize, row: bool) -> u32 {
        let mut goals = [0u8; MAX_GRID_SIZE];
        let mut len = 0;
        let blank_id = self.blank_id();

        for offset in 0..self.size {
            let pos = if row {
                line * self.size + offset
            } else {
                offset * self.size + line
            };
            let id = self.cells[pos];
            if id == blank_id {
                continue;
            }
            let (goal_row, goal_col) = coords(self.size, id as usize);
            let (goal_line, goal_offset) = if row {
                (goal_row, goal_col)
            } else {
                (goal_col, goal_row)
            };
            if goal_line == line {
                goals[len] = goal_offset as u8;
                len += 1;
            }
        }

        (len - longest_increasing(&goals[..len])) as u32
    }
}

fn distance(size: usize, a: usize, b: usize) -> u32 {
    crate::puzzle::manhattan(size, a, b) as u32
}

fn longest_increasing(seq: &[u8]) -> usize {
    let mut best = [0usize; MAX_GRID_SIZE];
    let mut longest = 0;
    for i in 0..seq.len() {
        best[i] = 1;
        for j in 0..i {
            if seq[j] < seq[i] && best[j] + 1 > best[i] {
                best[i] = best[j] + 1;
            }
        }
        longest = longest.max(best[i]);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shuffle::Shuffler;
    use std::collections::{HashMap, VecDeque};

    fn state(size: usize, ids: &[usize]) -> PuzzleState {
        PuzzleState::from_ids(size, ids).unwrap()
    }

    fn replay(start: &PuzzleState, moves: &[Move]) -> PuzzleState {
        moves.iter().fold(start.clone(), |s, &mv| {
            s.apply(mv)
                .unwrap_or_else(|| panic!("illegal move {mv} on\n{s}"))
        })
    }

    /// Exact distances from the goal for every 3x3 state within `depth` moves.
    fn bfs_from_goal(depth: u32) -> HashMap<PuzzleState, u32> {
        let goal = PuzzleState::solved(3).unwrap();
        let mut seen = HashMap::from([(goal.clone(), 0)]);
        let mut queue = VecDeque::from([goal]);
        while let Some(s) = queue.pop_front() {
            let d = seen[&s];
            if d == depth {
                continue;
            }
            for mv in s.legal_moves() {
                let next = s.apply(mv).unwrap();
                if !seen.contains_key(&next) {
                    seen.insert(next.clone(), d + 1);
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    #[test]
    fn test_two_move_scenario() {
        // blank in the centre; tile 4 slides left, then tile 5 slides up
        let start = state(3, &[0, 1, 2, 3, 8, 4, 6, 7, 5]);
        let path = solve(&start, &SolverConfig::default()).unwrap();
        assert!(path.found);
        assert_eq!(
            path.moves,
            vec![
                Move {
                    tile_id: 4,
                    direction: Direction::Left
                },
                Move {
                    tile_id: 5,
                    direction: Direction::Up
                },
            ]
        );
        assert!(replay(&start, &path.moves).is_solved());
    }

    #[test]
    fn test_solved_board_has_empty_path() {
        let goal = PuzzleState::solved(4).unwrap();
        let path = solve(&goal, &SolverConfig::default()).unwrap();
        assert!(path.found);
        assert!(path.is_empty());
    }

    #[test]
    fn test_unsolvable_is_rejected() {
        let s = state(3, &[1, 0, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            solve(&s, &SolverConfig::default()),
            Err(SolveError::Unsolvable)
        );
    }

    #[test]
    fn test_found_paths_reach_goal() {
        let mut shuffler = Shuffler::with_seed(2024);
        let config = SolverConfig {
            node_budget: 20_000_000,
            ..SolverConfig::default()
        };
        for _ in 0..15 {
            let start = shuffler.shuffle(3).unwrap();
            let path = solve(&start, &config).unwrap();
            assert!(path.found, "no solution for\n{start}");
            assert!(path.len() <= 31);
            assert!(replay(&start, &path.moves).is_solved());
        }
    }

    #[test]
    fn test_found_paths_are_optimal() {
        let distances = bfs_from_goal(14);
        let mut checked = 0;
        for (s, &d) in distances.iter().filter(|&(_, &d)| d >= 8) {
            let path = solve(s, &SolverConfig::default()).unwrap();
            assert!(path.found);
            assert_eq!(path.len() as u32, d, "suboptimal path for\n{s}");
            checked += 1;
            if checked == 40 {
                break;
            }
        }
        assert_eq!(checked, 40);

        // a harder 4x4 board built by walking away from the goal
        let mut s = PuzzleState::solved(4).unwrap();
        let mut last: Option<Move> = None;
        for i in 0..20 {
            let moves: Vec<Move> = s
                .legal_moves()
                .into_iter()
                .filter(|m| last.map_or(true, |l| m.tile_id != l.tile_id))
                .collect();
            let mv = moves[(i * 7 + 3) % moves.len()];
            s = s.apply(mv).unwrap();
            last = Some(mv);
        }
        let path = solve(&s, &SolverConfig::default()).unwrap();
        assert!(path.found);
        assert!(path.len() <= 20);
        assert!(replay(&s, &path.moves).is_solved());
    }

    #[test]
    fn test_heuristic_is_admissible() {
        for (s, d) in bfs_from_goal(12) {
            assert!(
                heuristic(&s) <= d,
                "h={} exceeds true distance {d} for\n{s}",
                heuristic(&s)
            );
        }
    }

    #[test]
    fn test_linear_conflicts() {
        // tiles 1 and 0 swapped in their goal row: one must leave the row
        let s = state(3, &[1, 0, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(manhattan_distance(&s), 2);
        assert_eq!(linear_conflicts(&s), 1);
        assert_eq!(heuristic(&s), 4);

        // top row reads 3 1 2: only the 3 has to leave
        let s = state(3, &[2, 0, 1, 3, 4, 5, 6, 7, 8]);
        assert_eq!(linear_conflicts(&s), 1);

        assert_eq!(longest_increasing(&[3, 0, 1, 2]), 3);
        assert_eq!(longest_increasing(&[2, 1, 0]), 1);
        assert_eq!(longest_increasing(&[]), 0);
    }

    #[test]
    fn test_incremental_heuristic_matches_fresh() {
        let mut shuffler = Shuffler::with_seed(11);
        for size in 3..=6 {
            let start = shuffler.shuffle(size).unwrap();
            let mut board = Board::new(&start);
            let mut current = start.clone();
            for i in 0..60 {
                let dir = Direction::ALL[(i * 5 + size) % 4];
                if let Some(mv) = board.slide(dir) {
                    current = current.apply(mv).unwrap();
                    let fresh = Board::new(&current);
                    assert_eq!(board.manhattan, fresh.manhattan);
                    assert_eq!(board.conflicts, fresh.conflicts);
                }
            }
        }
    }

    #[test]
    fn test_budget_exhaustion_returns_best_step() {
        let mut shuffler = Shuffler::with_seed(99);
        let start = shuffler.shuffle(6).unwrap();
        let config = SolverConfig {
            node_budget: 5_000,
            lookahead_depth: 4,
        };
        let path = solve(&start, &config).unwrap();
        assert!(!path.found);
        assert_eq!(path.len(), 1);
        assert!(start.apply(path.moves[0]).is_some());
    }

    #[test]
    fn test_fallback_prefers_reducing_move() {
        // one slide from the goal; even a depth-1 lookahead must pick it
        let s = state(3, &[0, 1, 2, 3, 4, 5, 6, 8, 7]);
        let mv = best_next_move(&s, 1).unwrap();
        assert_eq!(
            mv,
            Move {
                tile_id: 7,
                direction: Direction::Left
            }
        );
    }

    #[test]
    fn test_cancellation() {
        let mut shuffler = Shuffler::with_seed(3);
        let start = shuffler.shuffle(5).unwrap();
        let config = SolverConfig {
            node_budget: u64::MAX,
            ..SolverConfig::default()
        };
        assert_eq!(
            solve_with_cancel(&start, &config, &|| true),
            Err(SolveError::Cancelled)
        );
    }
}
