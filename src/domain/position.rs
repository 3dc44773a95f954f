/// Position given to the first card of an empty list.
pub const BASE_POSITION: f64 = 100.0;

/// Spacing used when appending and when renumbering.
pub const POSITION_GAP: f64 = 100.0;

/// Smallest gap between two bounding positions that still admits a midpoint.
pub const MIN_GAP: f64 = 1e-6;

/// Result of placing one card. Positions are sparse reals, so most moves
/// touch a single row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Allocation {
    At(f64),
    /// No room left between the neighbours (or they are out of order).
    /// The whole list must be renumbered with [`renumbered`].
    Renumber,
}

impl Allocation {
    pub fn position(self) -> Option<f64> {
        match self {
            Allocation::At(p) => Some(p),
            Allocation::Renumber => None,
        }
    }
}

/// Computes the position for an item inserted at `target_index` among
/// `positions`, which must be in display order and must not contain the
/// item being placed.
pub fn allocate(positions: &[f64], target_index: usize) -> Allocation {
    let Some(&last) = positions.last() else {
        return Allocation::At(BASE_POSITION);
    };

    if target_index >= positions.len() {
        let next = last + POSITION_GAP;
        return if next.is_finite() && next > last {
            Allocation::At(next)
        } else {
            Allocation::Renumber
        };
    }

    let (lo, hi) = if target_index == 0 {
        (0.0, positions[0])
    } else {
        (positions[target_index - 1], positions[target_index])
    };

    // Written so NaN also lands on Renumber.
    if !(hi - lo > MIN_GAP) {
        return Allocation::Renumber;
    }

    let mid = if target_index == 0 {
        hi / 2.0
    } else {
        lo + (hi - lo) / 2.0
    };

    // At large magnitudes one ulp exceeds MIN_GAP and the midpoint can round
    // onto a neighbour.
    if lo < mid && mid < hi {
        Allocation::At(mid)
    } else {
        Allocation::Renumber
    }
}

/// Position for a newly created card appended to a list.
pub fn next_position(positions: &[f64]) -> f64 {
    positions
        .last()
        .map_or(BASE_POSITION, |last| last + POSITION_GAP)
}

/// Fresh, evenly spaced positions for `count` items: 100, 200, 300, ...
pub fn renumbered(count: usize) -> Vec<f64> {
    (1..=count).map(|i| i as f64 * POSITION_GAP).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [f64; 3] = [100.0, 200.0, 300.0];

    #[test]
    fn empty_list_gets_base_position() {
        assert_eq!(allocate(&[], 0), Allocation::At(100.0));
        assert_eq!(allocate(&[], 5), Allocation::At(100.0));
    }

    #[test]
    fn insert_at_front_halves_first_position() {
        assert_eq!(allocate(&SAMPLE, 0), Allocation::At(50.0));
    }

    #[test]
    fn insert_at_end_adds_gap() {
        assert_eq!(allocate(&SAMPLE, 3), Allocation::At(400.0));
        assert_eq!(allocate(&SAMPLE, 42), Allocation::At(400.0));
    }

    #[test]
    fn insert_between_is_strictly_inside() {
        for (p1, p2) in [(100.0, 200.0), (1.0, 1.5), (0.25, 0.2500101), (-50.0, 10.0)] {
            let positions = [p1, p2];
            let m = allocate(&positions, 1).position().unwrap();
            assert!(p1 < m && m < p2, "{} < {} < {}", p1, m, p2);
        }
        assert_eq!(allocate(&SAMPLE, 1), Allocation::At(150.0));
        assert_eq!(allocate(&SAMPLE, 2), Allocation::At(250.0));

        // Adjacent floats far from zero: the gap passes MIN_GAP, the midpoint does not fit.
        let lo = 1e10_f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        assert!(hi - lo > MIN_GAP);
        assert_eq!(allocate(&[lo, hi], 1), Allocation::Renumber);
    }

    #[test]
    fn repeated_inserts_at_same_boundary_eventually_require_renumber() {
        let mut positions = vec![100.0, 200.0];
        let mut inserts = 0;
        loop {
            match allocate(&positions, 1) {
                Allocation::At(p) => {
                    assert!(positions[0] < p && p < positions[1]);
                    positions.insert(1, p);
                    inserts += 1;
                    assert!(inserts < 200, "gap never collapsed");
                }
                Allocation::Renumber => break,
            }
        }
        assert!(inserts > 20);
    }

    #[test]
    fn repeated_inserts_at_front_eventually_require_renumber() {
        let mut positions = vec![100.0];
        let mut saw_renumber = false;
        for _ in 0..200 {
            match allocate(&positions, 0) {
                Allocation::At(p) => {
                    assert!(p > 0.0 && p < positions[0]);
                    positions.insert(0, p);
                }
                Allocation::Renumber => {
                    saw_renumber = true;
                    break;
                }
            }
        }
        assert!(saw_renumber);
    }

    #[test]
    fn duplicate_neighbours_require_renumber() {
        assert_eq!(allocate(&[100.0, 150.0, 150.0], 2), Allocation::Renumber);
        assert_eq!(allocate(&[300.0, 200.0], 1), Allocation::Renumber);
    }

    #[test]
    fn renumbered_spacing() {
        assert_eq!(renumbered(0), Vec::<f64>::new());
        assert_eq!(renumbered(3), vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn next_position_follows_creation_rule() {
        assert_eq!(next_position(&[]), 100.0);
        assert_eq!(next_position(&SAMPLE), 400.0);
        assert_eq!(next_position(&[12.5]), 112.5);
    }
}
