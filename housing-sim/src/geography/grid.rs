// Offset hexagonal grid: odd rows are shifted half a cell to the right

use std::collections::{BTreeSet, VecDeque};

use crate::types::Position;

// Neighbor offsets as (d_row, d_col), keyed by row parity
const EVEN_ROW_OFFSETS: [(isize, isize); 6] = [
    (-1, -1), // upper left
    (-1, 0),  // upper right
    (0, -1),  // left
    (0, 1),   // right
    (1, -1),  // bottom left
    (1, 0),   // bottom right
];

const ODD_ROW_OFFSETS: [(isize, isize); 6] = [
    (-1, 0), // upper left
    (-1, 1), // upper right
    (0, -1), // left
    (0, 1),  // right
    (1, 0),  // bottom left
    (1, 1),  // bottom right
];

/// 2D euclidean distance between grid coordinates
pub fn distance(a: Position, b: Position) -> f64 {
    let dr = a.0 as f64 - b.0 as f64;
    let dc = a.1 as f64 - b.1 as f64;
    (dr * dr + dc * dc).sqrt()
}

/// Fixed-size hex grid holding optional cells
#[derive(Debug, Clone)]
pub struct HexGrid<T> {
    pub rows: usize,
    pub cols: usize,
    cells: Vec<Option<T>>,
}

impl<T> HexGrid<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        cells.resize_with(rows * cols, || None);
        Self { rows, cols, cells }
    }

    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.0 < self.rows && pos.1 < self.cols
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos).then(|| pos.0 * self.cols + pos.1)
    }

    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index(pos).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.index(pos).and_then(|i| self.cells[i].as_mut())
    }

    /// Place a value; out-of-bounds positions are ignored
    pub fn set(&mut self, pos: Position, value: T) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = Some(value);
        }
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.get(pos).is_some()
    }

    /// Occupied cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, c)| c.as_ref().map(|v| ((i / cols, i % cols), v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Position, &mut T)> {
        let cols = self.cols;
        self.cells
            .iter_mut()
            .enumerate()
            .filter_map(move |(i, c)| c.as_mut().map(|v| ((i / cols, i % cols), v)))
    }

    /// Up to six in-bounds neighbors of `pos`, whether occupied or not
    pub fn adjacent(&self, pos: Position) -> Vec<Position> {
        if !self.in_bounds(pos) {
            return Vec::new();
        }
        let offsets = if pos.0 % 2 == 0 {
            &EVEN_ROW_OFFSETS
        } else {
            &ODD_ROW_OFFSETS
        };
        offsets
            .iter()
            .filter_map(|&(dr, dc)| {
                let r = pos.0.checked_add_signed(dr)?;
                let c = pos.1.checked_add_signed(dc)?;
                self.in_bounds((r, c)).then_some((r, c))
            })
            .collect()
    }

    /// Neighbors of `pos` that hold a value
    pub fn occupied_adjacent(&self, pos: Position) -> Vec<Position> {
        self.adjacent(pos)
            .into_iter()
            .filter(|p| self.is_occupied(*p))
            .collect()
    }

    /// Every cell within `r` adjacency hops of `pos`, including `pos`
    pub fn radius(&self, pos: Position, r: usize) -> BTreeSet<Position> {
        let mut seen = BTreeSet::new();
        if !self.in_bounds(pos) {
            return seen;
        }
        seen.insert(pos);
        let mut frontier = vec![pos];
        for _ in 0..r {
            let mut next = Vec::new();
            for p in frontier {
                for q in self.adjacent(p) {
                    if seen.insert(q) {
                        next.push(q);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        seen
    }

    /// Breadth-first search from `start` to `end` through cells accepted by
    /// `valid`. Steps are uniform so the first path found is a shortest one.
    /// `end` itself must pass `valid` to be reachable.
    pub fn path(
        &self,
        start: Position,
        end: Position,
        valid: impl Fn(Position) -> bool,
    ) -> Option<Vec<Position>> {
        if !self.in_bounds(start) || !self.in_bounds(end) {
            return None;
        }
        let mut came_from: Vec<Option<Position>> = vec![None; self.capacity()];
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(pos) = queue.pop_front() {
            if pos == end {
                let mut path = vec![end];
                let mut cur = end;
                while let Some(prev) = self.index(cur).and_then(|i| came_from[i]) {
                    path.push(prev);
                    cur = prev;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.adjacent(pos) {
                if !valid(next) || !seen.insert(next) {
                    continue;
                }
                if let Some(i) = self.index(next) {
                    came_from[i] = Some(pos);
                }
                queue.push_back(next);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_interior_has_six() {
        let grid: HexGrid<()> = HexGrid::new(5, 5);
        assert_eq!(grid.adjacent((2, 2)).len(), 6);
        assert_eq!(grid.adjacent((1, 2)).len(), 6);
    }

    #[test]
    fn test_adjacent_uses_row_parity() {
        let grid: HexGrid<()> = HexGrid::new(5, 5);
        let even = grid.adjacent((2, 2));
        assert!(even.contains(&(1, 1)) && even.contains(&(3, 1)));
        let odd = grid.adjacent((1, 2));
        assert!(odd.contains(&(0, 3)) && odd.contains(&(2, 3)));
    }

    #[test]
    fn test_adjacent_filters_bounds() {
        let grid: HexGrid<()> = HexGrid::new(3, 3);
        assert_eq!(grid.adjacent((0, 0)), vec![(0, 1), (1, 0)]);
        assert!(grid.adjacent((7, 7)).is_empty());
    }

    #[test]
    fn test_radius() {
        let grid: HexGrid<()> = HexGrid::new(9, 9);
        assert_eq!(grid.radius((4, 4), 0).len(), 1);
        assert_eq!(grid.radius((4, 4), 1).len(), 7);
        assert_eq!(grid.radius((4, 4), 2).len(), 19);
    }

    #[test]
    fn test_path_around_wall() {
        let mut grid: HexGrid<bool> = HexGrid::new(5, 5);
        for r in 0..5 {
            for c in 0..5 {
                // column 2 is a wall except the bottom row
                grid.set((r, c), !(c == 2 && r < 4));
            }
        }
        let path = grid
            .path((0, 0), (0, 4), |p| grid.get(p).copied().unwrap_or(false))
            .expect("path exists");
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(0, 4)));
        assert!(path.contains(&(4, 2)));
        for pair in path.windows(2) {
            assert!(grid.adjacent(pair[0]).contains(&pair[1]));
        }
    }

    #[test]
    fn test_path_blocked() {
        let grid: HexGrid<()> = HexGrid::new(4, 4);
        assert!(grid.path((0, 0), (3, 3), |p| p.1 != 2).is_none());
        assert_eq!(grid.path((1, 1), (1, 1), |_| true), Some(vec![(1, 1)]));
    }

    #[test]
    fn test_iter_row_major() {
        let mut grid: HexGrid<u8> = HexGrid::new(2, 3);
        grid.set((1, 0), 2);
        grid.set((0, 2), 1);
        let cells: Vec<_> = grid.iter().collect();
        assert_eq!(cells, vec![((0, 2), &1), ((1, 0), &2)]);
    }
}
