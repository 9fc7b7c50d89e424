// Randomized region growing used by procedural map generation

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::{IndexedRandom, IteratorRandom};

use super::grid::HexGrid;
use crate::types::Position;

/// Random frontier that remembers membership so cells are queued once
#[derive(Debug, Default)]
struct Frontier {
    cells: Vec<Position>,
    queued: BTreeSet<Position>,
}

impl Frontier {
    fn push(&mut self, pos: Position) {
        if self.queued.insert(pos) {
            self.cells.push(pos);
        }
    }

    fn pop_random<R: Rng>(&mut self, rng: &mut R) -> Option<Position> {
        if self.cells.is_empty() {
            return None;
        }
        let pos = self.cells.swap_remove(rng.random_range(0..self.cells.len()));
        self.queued.remove(&pos);
        Some(pos)
    }

    fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Grow a connected blob of `count` cells from the grid center by
/// repeatedly placing a uniformly random frontier cell.
/// Returns cells in placement order.
pub fn grow_blob<T, R: Rng>(grid: &HexGrid<T>, count: usize, rng: &mut R) -> Vec<Position> {
    let count = count.min(grid.capacity());
    let mut placed = BTreeSet::new();
    let mut order = Vec::with_capacity(count);
    let mut frontier = Frontier::default();
    if count == 0 {
        return order;
    }
    frontier.push((grid.rows / 2, grid.cols / 2));

    while order.len() < count {
        let Some(pos) = frontier.pop_random(rng) else {
            break;
        };
        placed.insert(pos);
        order.push(pos);
        for next in grid.adjacent(pos) {
            if !placed.contains(&next) {
                frontier.push(next);
            }
        }
    }
    order
}

/// Partition `cells` into `regions` contiguous regions by randomized flood
/// fill: each step picks a random unassigned cell bordering the assigned
/// area and copies the region of a random assigned neighbor.
/// Cells unreachable from every seed are reseeded into a random region.
pub fn flood_fill<T, R: Rng>(
    grid: &HexGrid<T>,
    cells: &BTreeSet<Position>,
    regions: usize,
    rng: &mut R,
) -> BTreeMap<Position, usize> {
    let mut assigned: BTreeMap<Position, usize> = BTreeMap::new();
    if regions == 0 || cells.is_empty() {
        return assigned;
    }

    let mut frontier = Frontier::default();
    let seeds: Vec<Position> = cells.iter().copied().choose_multiple(rng, regions);
    for (region, seed) in seeds.into_iter().enumerate() {
        assigned.insert(seed, region);
    }
    for pos in assigned.keys().copied().collect::<Vec<_>>() {
        queue_unassigned(grid, cells, &assigned, &mut frontier, pos);
    }

    while assigned.len() < cells.len() {
        let pos = match frontier.pop_random(rng) {
            Some(pos) => pos,
            None => {
                // Disconnected island: start it from a random region
                let Some(pos) = cells
                    .iter()
                    .filter(|p| !assigned.contains_key(p))
                    .copied()
                    .choose(rng)
                else {
                    break;
                };
                assigned.insert(pos, rng.random_range(0..regions));
                queue_unassigned(grid, cells, &assigned, &mut frontier, pos);
                continue;
            }
        };
        let neighbors: Vec<usize> = grid
            .adjacent(pos)
            .into_iter()
            .filter_map(|p| assigned.get(&p).copied())
            .collect();
        let Some(&region) = neighbors.choose(rng) else {
            continue;
        };
        assigned.insert(pos, region);
        queue_unassigned(grid, cells, &assigned, &mut frontier, pos);
    }
    assigned
}

fn queue_unassigned<T>(
    grid: &HexGrid<T>,
    cells: &BTreeSet<Position>,
    assigned: &BTreeMap<Position, usize>,
    frontier: &mut Frontier,
    pos: Position,
) {
    for next in grid.adjacent(pos) {
        if cells.contains(&next) && !assigned.contains_key(&next) {
            frontier.push(next);
        }
    }
}

/// Take up to `count` cells out of `available` as local clusters. A
/// cluster starts at a random available cell and grows through adjacent
/// available cells; when it is boxed in a new cluster is seeded.
pub fn grow_clusters<T, R: Rng>(
    grid: &HexGrid<T>,
    available: &mut BTreeSet<Position>,
    count: usize,
    rng: &mut R,
) -> Vec<Position> {
    let mut taken = Vec::with_capacity(count);
    let mut frontier = Frontier::default();

    while taken.len() < count && !available.is_empty() {
        if frontier.is_empty() {
            if let Some(&seed) = available.iter().choose(rng) {
                frontier.push(seed);
            }
        }
        let Some(pos) = frontier.pop_random(rng) else {
            break;
        };
        if !available.remove(&pos) {
            continue;
        }
        taken.push(pos);
        for next in grid.adjacent(pos) {
            if available.contains(&next) {
                frontier.push(next);
            }
        }
    }
    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn is_connected(grid: &HexGrid<()>, cells: &BTreeSet<Position>) -> bool {
        let Some(&start) = cells.iter().next() else {
            return true;
        };
        let mut seen = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(pos) = stack.pop() {
            for next in grid.adjacent(pos) {
                if cells.contains(&next) && seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen.len() == cells.len()
    }

    #[test]
    fn test_blob_is_connected_and_sized() {
        let grid: HexGrid<()> = HexGrid::new(12, 12);
        let mut rng = StdRng::seed_from_u64(1);
        let blob = grow_blob(&grid, 60, &mut rng);
        let cells: BTreeSet<_> = blob.iter().copied().collect();
        assert_eq!(blob.len(), 60);
        assert_eq!(cells.len(), 60);
        assert!(is_connected(&grid, &cells));
    }

    #[test]
    fn test_blob_can_fill_grid() {
        let grid: HexGrid<()> = HexGrid::new(5, 4);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(grow_blob(&grid, 20, &mut rng).len(), 20);
    }

    #[test]
    fn test_flood_fill_covers_with_contiguous_regions() {
        let grid: HexGrid<()> = HexGrid::new(15, 15);
        let mut rng = StdRng::seed_from_u64(3);
        let cells: BTreeSet<_> = grow_blob(&grid, 120, &mut rng).into_iter().collect();
        let regions = flood_fill(&grid, &cells, 4, &mut rng);

        assert_eq!(regions.len(), cells.len());
        for region in 0..4 {
            let members: BTreeSet<_> = regions
                .iter()
                .filter(|(_, r)| **r == region)
                .map(|(p, _)| *p)
                .collect();
            assert!(!members.is_empty(), "region {region} is empty");
            assert!(is_connected(&grid, &members), "region {region} is split");
        }
    }

    #[test]
    fn test_clusters_respect_availability() {
        let grid: HexGrid<()> = HexGrid::new(8, 8);
        let mut rng = StdRng::seed_from_u64(4);
        let mut available: BTreeSet<Position> = (0..4).flat_map(|r| (0..8).map(move |c| (r, c))).collect();
        let taken = grow_clusters(&grid, &mut available, 10, &mut rng);
        assert_eq!(taken.len(), 10);
        assert_eq!(available.len(), 22);
        assert!(taken.iter().all(|p| p.0 < 4 && !available.contains(p)));

        let rest = grow_clusters(&grid, &mut available, 100, &mut rng);
        assert_eq!(rest.len(), 22);
        assert!(available.is_empty());
    }

    #[test]
    fn test_zero_count_takes_nothing() {
        let grid: HexGrid<()> = HexGrid::new(3, 3);
        let mut rng = StdRng::seed_from_u64(5);
        let mut available: BTreeSet<Position> = [(0, 0), (1, 1)].into();
        assert!(grow_clusters(&grid, &mut available, 0, &mut rng).is_empty());
        assert_eq!(available.len(), 2);
    }
}
