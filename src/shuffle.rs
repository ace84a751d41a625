use log::debug;
use rand::rngs::StdRng;
use rand::{seq::SliceRandom, SeedableRng};

use crate::error::PuzzleError;
use crate::puzzle::PuzzleState;
use crate::solvability;

/// Produces random, always-solvable starting boards.
pub struct Shuffler {
    rng: StdRng,
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::new()
    }
}

impl Shuffler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform permutation, then a parity repair if it landed in the
    /// unreachable half of the permutation space.
    pub fn shuffle(&mut self, size: usize) -> Result<PuzzleState, PuzzleError> {
        let goal = PuzzleState::solved(size)?;
        let mut ids: Vec<u8> = goal.cells().to_vec();
        ids.shuffle(&mut self.rng);

        if !solvability::is_solvable(&ids, size) {
            repair_parity(&mut ids);
            debug!("Shuffle repaired by swapping the two lowest non-blank slots");
        }

        if !solvability::is_solvable(&ids, size) {
            return Err(PuzzleError::InvalidShuffle);
        }

        let ids: Vec<usize> = ids.into_iter().map(usize::from).collect();
        PuzzleState::from_ids(size, &ids)
    }
}

/// Swapping any two non-blank tiles changes the inversion count by an odd
/// amount and leaves the blank row alone.
fn repair_parity(ids: &mut [u8]) {
    let blank = (ids.len() - 1) as u8;
    let mut slots = ids
        .iter()
        .enumerate()
        .filter(|&(_, &id)| id != blank)
        .map(|(slot, _)| slot);

    if let (Some(a), Some(b)) = (slots.next(), slots.next()) {
        ids.swap(a, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffles_are_solvable() {
        for size in 3..=6 {
            let mut shuffler = Shuffler::with_seed(42 + size as u64);
            for _ in 0..1000 {
                let state = shuffler.shuffle(size).unwrap();
                assert!(state.is_solvable(), "unsolvable {size}x{size}:\n{state}");
                assert_eq!(state.len(), size * size);
            }
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = Shuffler::with_seed(7).shuffle(4).unwrap();
        let b = Shuffler::with_seed(7).shuffle(4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shuffles_vary() {
        let mut shuffler = Shuffler::with_seed(1);
        let first = shuffler.shuffle(4).unwrap();
        let differs = (0..10).any(|_| shuffler.shuffle(4).unwrap() != first);
        assert!(differs);
    }

    #[test]
    fn test_repair_parity_skips_blank() {
        let mut ids = vec![8, 1, 0, 2, 3, 4, 5, 6, 7];
        assert!(!solvability::is_solvable(&ids, 3));
        repair_parity(&mut ids);
        assert_eq!(ids, vec![8, 0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(solvability::is_solvable(&ids, 3));
    }

    #[test]
    fn test_invalid_size() {
        assert_eq!(
            Shuffler::with_seed(0).shuffle(0),
            Err(PuzzleError::InvalidGridSize(0))
        );
    }
}
