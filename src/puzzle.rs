use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PuzzleError;
use crate::solvability;

pub const MIN_GRID_SIZE: usize = 2;
pub const MAX_GRID_SIZE: usize = 10;

/// Direction a tile slides into the blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Left,
    Down,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Offset from the blank to the tile that slides in this direction.
    pub fn as_offset(&self) -> (isize, isize) {
        match self {
            Direction::Up => (1, 0),
            Direction::Left => (0, 1),
            Direction::Down => (-1, 0),
            Direction::Right => (0, -1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Direction::Up => "up",
            Direction::Left => "left",
            Direction::Down => "down",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// A tile and the slot it currently occupies. `id` is also its goal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: usize,
    pub position: usize,
}

/// "The tile with this id slides in this direction into the blank."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub tile_id: usize,
    pub direction: Direction,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile {} {}", self.tile_id, self.direction)
    }
}

/// Row and column of a slot on an `size`x`size` grid.
pub fn coords(size: usize, position: usize) -> (usize, usize) {
    (position / size, position % size)
}

pub fn manhattan(size: usize, a: usize, b: usize) -> usize {
    let (ar, ac) = coords(size, a);
    let (br, bc) = coords(size, b);
    ar.abs_diff(br) + ac.abs_diff(bc)
}

/// Slot of the tile that would slide in `direction` into the blank at
/// `blank_position`, if that tile is on the board.
pub fn neighbour(size: usize, blank_position: usize, direction: Direction) -> Option<usize> {
    let (dr, dc) = direction.as_offset();
    let (row, col) = coords(size, blank_position);
    let row = row.checked_add_signed(dr).filter(|&r| r < size)?;
    let col = col.checked_add_signed(dc).filter(|&c| c < size)?;
    Some(row * size + col)
}

/// A tile may slide only when it is orthogonally adjacent to the blank.
pub fn can_move(size: usize, tile_position: usize, blank_position: usize) -> bool {
    manhattan(size, tile_position, blank_position) == 1
}

/// Immutable tile arrangement. `cells[position]` holds the id of the tile in
/// that slot; the blank is id `size * size - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PuzzleState {
    size: usize,
    cells: Vec<u8>,
    blank: usize,
}

impl PuzzleState {
    /// The goal arrangement.
    pub fn solved(size: usize) -> Result<Self, PuzzleError> {
        check_size(size)?;
        let len = size * size;
        Ok(Self {
            size,
            cells: (0..len as u8).collect(),
            blank: len - 1,
        })
    }

    /// Build from tile ids listed in position order.
    pub fn from_ids(size: usize, ids: &[usize]) -> Result<Self, PuzzleError> {
        check_size(size)?;
        let len = size * size;
        if ids.len() != len {
            return Err(PuzzleError::WrongTileCount {
                expected: len,
                found: ids.len(),
            });
        }

        let mut seen = vec![false; len];
        for &id in ids {
            if id >= len || seen[id] {
                return Err(PuzzleError::NotAPermutation(len));
            }
            seen[id] = true;
        }

        let blank = ids
            .iter()
            .position(|&id| id == len - 1)
            .ok_or(PuzzleError::NotAPermutation(len))?;

        Ok(Self {
            size,
            cells: ids.iter().map(|&id| id as u8).collect(),
            blank,
        })
    }

    /// Build from `{id, position}` pairs in any order.
    pub fn from_tiles(size: usize, tiles: &[Tile]) -> Result<Self, PuzzleError> {
        check_size(size)?;
        let len = size * size;
        if tiles.len() != len {
            return Err(PuzzleError::WrongTileCount {
                expected: len,
                found: tiles.len(),
            });
        }

        let mut ids = vec![usize::MAX; len];
        for tile in tiles {
            if tile.position >= len || ids[tile.position] != usize::MAX {
                return Err(PuzzleError::NotAPermutation(len));
            }
            ids[tile.position] = tile.id;
        }
        Self::from_ids(size, &ids)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn blank_id(&self) -> usize {
        self.cells.len() - 1
    }

    pub fn blank_position(&self) -> usize {
        self.blank
    }

    pub fn id_at(&self, position: usize) -> Option<usize> {
        self.cells.get(position).map(|&id| id as usize)
    }

    pub fn position_of(&self, id: usize) -> Option<usize> {
        self.cells.iter().position(|&cell| cell as usize == id)
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn ids(&self) -> Vec<usize> {
        self.cells.iter().map(|&id| id as usize).collect()
    }

    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.cells.iter().enumerate().map(|(position, &id)| Tile {
            id: id as usize,
            position,
        })
    }

    pub fn is_solved(&self) -> bool {
        self.cells
            .iter()
            .enumerate()
            .all(|(position, &id)| id as usize == position)
    }

    pub fn is_solvable(&self) -> bool {
        solvability::is_solvable(&self.cells, self.size)
    }

    pub fn can_move(&self, tile_position: usize) -> bool {
        tile_position < self.cells.len() && can_move(self.size, tile_position, self.blank)
    }

    /// Direction the tile at `tile_position` would slide, if it is movable.
    pub fn direction_of(&self, tile_position: usize) -> Option<Direction> {
        if !self.can_move(tile_position) {
            return None;
        }
        let (tr, tc) = coords(self.size, tile_position);
        let (br, bc) = coords(self.size, self.blank);
        let direction = if tr > br {
            Direction::Up
        } else if tr < br {
            Direction::Down
        } else if tc > bc {
            Direction::Left
        } else {
            Direction::Right
        };
        Some(direction)
    }

    /// Slide the tile at `tile_position` into the blank. Illegal clicks are a
    /// no-op and return `None`.
    pub fn move_tile(&self, tile_position: usize) -> Option<(Self, Move)> {
        let direction = self.direction_of(tile_position)?;
        let tile_id = self.cells[tile_position] as usize;

        let mut next = self.clone();
        next.cells.swap(tile_position, self.blank);
        next.blank = tile_position;

        Some((next, Move { tile_id, direction }))
    }

    /// Slide whichever tile can move in `direction`.
    pub fn slide(&self, direction: Direction) -> Option<(Self, Move)> {
        let position = neighbour(self.size, self.blank, direction)?;
        self.move_tile(position)
    }

    /// Apply a move, checking that it names the tile that actually sits next
    /// to the blank on that side.
    pub fn apply(&self, movement: Move) -> Option<Self> {
        let position = neighbour(self.size, self.blank, movement.direction)?;
        if self.cells[position] as usize != movement.tile_id {
            return None;
        }
        self.move_tile(position).map(|(next, _)| next)
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        Direction::ALL
            .iter()
            .filter_map(|&direction| {
                neighbour(self.size, self.blank, direction).map(|position| Move {
                    tile_id: self.cells[position] as usize,
                    direction,
                })
            })
            .collect()
    }
}

fn check_size(size: usize) -> Result<(), PuzzleError> {
    if (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(PuzzleError::InvalidGridSize(size))
    }
}

impl fmt::Display for PuzzleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blank = self.blank_id();
        for row in self.cells.chunks(self.size) {
            for &id in row {
                if id as usize == blank {
                    write!(f, "   ")?;
                } else {
                    write!(f, "{:2} ", id as usize + 1)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
