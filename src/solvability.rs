//! Parity test for N-puzzle arrangements.
//!
//! Tile ids are listed in position order and the blank is the largest id.
//! Legal moves never change the parity class, so an arrangement is reachable
//! from the goal exactly when it has the goal's parity.

pub fn count_inversions(ids: &[u8]) -> usize {
    let blank = blank_id(ids);
    ids.iter()
        .enumerate()
        .filter(|&(_, &val)| Some(val) != blank)
        .map(|(i, &val)| {
            ids[i + 1..]
                .iter()
                .filter(|&&next| Some(next) != blank && next < val)
                .count()
        })
        .sum()
}

pub fn is_solvable(ids: &[u8], size: usize) -> bool {
    let Some(blank) = blank_id(ids) else {
        return false;
    };
    let Some(blank_row) = ids.iter().position(|&id| id == blank).map(|p| p / size) else {
        return false;
    };
    let inversions = count_inversions(ids);

    if size % 2 == 1 {
        inversions % 2 == 0
    } else {
        (inversions + blank_row) % 2 == 1
    }
}

fn blank_id(ids: &[u8]) -> Option<u8> {
    ids.len().checked_sub(1).map(|last| last as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::PuzzleState;
    use crate::shuffle::Shuffler;

    #[test]
    fn test_goal_is_solvable() {
        for size in 2..=6 {
            let goal = PuzzleState::solved(size).unwrap();
            assert_eq!(count_inversions(goal.cells()), 0);
            assert!(is_solvable(goal.cells(), size), "size {size}");
        }
    }

    #[test]
    fn test_single_swap_is_unsolvable() {
        // classic 15-puzzle with 14 and 15 swapped
        let mut ids: Vec<u8> = (0..16).collect();
        ids.swap(13, 14);
        assert_eq!(count_inversions(&ids), 1);
        assert!(!is_solvable(&ids, 4));

        let mut ids: Vec<u8> = (0..9).collect();
        ids.swap(0, 1);
        assert!(!is_solvable(&ids, 3));
    }

    #[test]
    fn test_blank_is_ignored_in_inversions() {
        // blank (8) at the front must not count against the other tiles
        let ids = [8, 0, 1, 2, 3, 4, 5, 6, 7];
        assert_eq!(count_inversions(&ids), 0);
        assert!(is_solvable(&ids, 3));
    }

    #[test]
    fn test_even_grid_uses_blank_row() {
        // blank slid up two rows from the goal: six inversions, blank row 1
        let ids = [0, 1, 2, 3, 4, 5, 6, 15, 8, 9, 10, 7, 12, 13, 14, 11];
        assert!(is_solvable(&ids, 4));
        let state = PuzzleState::from_ids(4, &ids.map(|id| id as usize)).unwrap();
        assert!(state.is_solvable());
    }

    #[test]
    fn test_legal_moves_preserve_parity() {
        for size in 3..=6 {
            let mut shuffler = Shuffler::with_seed(size as u64);
            for _ in 0..50 {
                let state = shuffler.shuffle(size).unwrap();
                for mv in state.legal_moves() {
                    let next = state.apply(mv).unwrap();
                    assert!(next.is_solvable());
                }
            }
        }
    }

    #[test]
    fn test_unsolvable_stays_unsolvable() {
        let mut ids: Vec<usize> = (0..9).collect();
        ids.swap(0, 1);
        let mut state = PuzzleState::from_ids(3, &ids).unwrap();
        for step in 0..40 {
            let moves = state.legal_moves();
            state = state.apply(moves[step % moves.len()]).unwrap();
            assert!(!state.is_solvable());
        }
    }
}
