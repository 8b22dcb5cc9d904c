//! Priority-queue traversals over the cell graph.
//!
//! One engine serves both pathfinding (A*, cost to goal) and visibility (range-limited
//! flood fill). All per-search state lives in a caller-owned [`SearchContext`], so a
//! grid can be searched through a shared reference and results remain valid for as
//! long as the caller keeps them.
//!
//! Cells are never reset between searches. Instead each search advances the context's
//! phase by two and stamps every cell it touches: a stamp below the current phase means
//! "not seen this search", equal means "in the frontier", and one above means "finalized".

use log::debug;

use super::{cell::CellIndex, HexGrid};
use crate::{
    data_structures::{BucketQueue, QueueLinks},
    geometry::Direction,
};

#[derive(Clone, Copy, Debug, Default)]
struct SearchState {
    distance: u32,
    heuristic: u32,
    predecessor: Option<CellIndex>,
    phase: u32,
    next_with_same_priority: Option<CellIndex>,
}

impl SearchState {
    fn priority(&self) -> u32 {
        self.distance.saturating_add(self.heuristic)
    }
}

impl QueueLinks for Vec<SearchState> {
    fn priority(&self, item: usize) -> u32 {
        self[item].priority()
    }

    fn next_with_same_priority(&self, item: usize) -> Option<usize> {
        self[item].next_with_same_priority
    }

    fn set_next_with_same_priority(&mut self, item: usize, next: Option<usize>) {
        self[item].next_with_same_priority = next;
    }
}

/// Reusable scratch space for searches over a [`HexGrid`].
///
/// A context can serve any number of searches, on any grid, one at a time.
#[derive(Clone, Debug, Default)]
pub struct SearchContext {
    queue: BucketQueue,
    states: Vec<SearchState>,
    phase: u32,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for a new search over `cell_count` cells and return its phase.
    fn begin(&mut self, cell_count: usize) -> u32 {
        if self.states.len() != cell_count {
            self.states.clear();
            self.states.resize(cell_count, SearchState::default());
        }

        // the finalized stamp, phase + 1, must stay representable
        if self.phase > u32::MAX - 3 {
            debug!("search phase exhausted; resetting all cell stamps");
            self.states
                .iter_mut()
                .for_each(|state| *state = SearchState::default());
            self.phase = 0;
        }
        self.phase += 2;
        self.queue.clear();
        self.phase
    }

    /// Find the cheapest path from `from` to `to`.
    ///
    /// `move_cost(grid, current, neighbor, direction)` gives the cost of stepping from
    /// `current` into its `neighbor`, or `None` when that step is impossible.
    ///
    /// Movement is planned in turns of `speed` points: a step which would run past the
    /// end of the current turn instead starts at the beginning of the next one, so the
    /// points left unspent in the current turn are added to the path's cost.
    /// A `speed` of `0` disables turn bookkeeping.
    ///
    /// Returns `None` when `to` cannot be reached.
    pub fn find_path<F>(
        &mut self,
        grid: &HexGrid,
        from: CellIndex,
        to: CellIndex,
        speed: u32,
        mut move_cost: F,
    ) -> Option<Path>
    where
        F: FnMut(&HexGrid, CellIndex, CellIndex, Direction) -> Option<u32>,
    {
        let phase = self.begin(grid.cell_count());
        if from >= grid.cell_count() || to >= grid.cell_count() {
            return None;
        }
        let goal = grid[to].coordinate();

        self.states[from] = SearchState {
            distance: 0,
            heuristic: grid[from].coordinate().distance_to(goal),
            predecessor: None,
            phase,
            next_with_same_priority: None,
        };
        self.queue.enqueue(&mut self.states, from);

        while let Some(current) = self.queue.dequeue(&mut self.states) {
            self.states[current].phase = phase + 1;
            if current == to {
                let path = self.reconstruct(from, to);
                debug!(
                    "found path from {} to {}: {} steps, cost {}",
                    from,
                    to,
                    path.steps(),
                    path.cost()
                );
                return Some(path);
            }

            let current_distance = self.states[current].distance;
            let current_turn = turn(current_distance, speed);
            for (direction, neighbor) in grid[current].neighbors() {
                let state = self.states[neighbor];
                if state.phase > phase {
                    continue;
                }
                let Some(cost) = move_cost(grid, current, neighbor, direction) else {
                    continue;
                };

                let mut distance = current_distance.saturating_add(cost);
                let next_turn = turn(distance, speed);
                if next_turn > current_turn {
                    distance = next_turn.saturating_mul(speed).saturating_add(cost);
                }

                if state.phase < phase {
                    self.states[neighbor] = SearchState {
                        distance,
                        heuristic: grid[neighbor].coordinate().distance_to(goal),
                        predecessor: Some(current),
                        phase,
                        next_with_same_priority: None,
                    };
                    self.queue.enqueue(&mut self.states, neighbor);
                } else if distance < state.distance {
                    let old_priority = state.priority();
                    self.states[neighbor].distance = distance;
                    self.states[neighbor].predecessor = Some(current);
                    self.queue.change(&mut self.states, neighbor, old_priority);
                }
            }
        }

        debug!("no path from {} to {}", from, to);
        None
    }

    fn reconstruct(&self, from: CellIndex, to: CellIndex) -> Path {
        let mut cells = vec![to];
        let mut current = to;
        while current != from {
            match self.states[current].predecessor {
                Some(predecessor) => {
                    cells.push(predecessor);
                    current = predecessor;
                }
                None => break,
            }
        }
        cells.reverse();
        Path {
            cells,
            cost: self.states[to].distance,
        }
    }

    /// Find every cell visible from `from` within `range`.
    ///
    /// Height extends sight: the range grows by the viewer's view elevation, and each
    /// cell's own view elevation counts against it. A cell is only seen along a path no
    /// longer than its hex distance from the viewer, so sight never bends around
    /// obstacles.
    ///
    /// The viewer's own cell is always visible. Cells are returned nearest first.
    pub fn visible_cells(&mut self, grid: &HexGrid, from: CellIndex, range: u32) -> Vec<CellIndex> {
        let phase = self.begin(grid.cell_count());
        let mut visible = Vec::new();
        if from >= grid.cell_count() {
            return visible;
        }

        let origin = grid[from].coordinate();
        let range = i64::from(range) + i64::from(grid[from].view_elevation());

        self.states[from] = SearchState {
            distance: 0,
            heuristic: 0,
            predecessor: None,
            phase,
            next_with_same_priority: None,
        };
        self.queue.enqueue(&mut self.states, from);

        while let Some(current) = self.queue.dequeue(&mut self.states) {
            self.states[current].phase = phase + 1;
            visible.push(current);

            let distance = self.states[current].distance + 1;
            for (_, neighbor) in grid[current].neighbors() {
                let state = self.states[neighbor];
                if state.phase > phase {
                    continue;
                }
                if i64::from(distance) + i64::from(grid[neighbor].view_elevation()) > range
                    || distance > origin.distance_to(grid[neighbor].coordinate())
                {
                    continue;
                }

                if state.phase < phase {
                    self.states[neighbor] = SearchState {
                        distance,
                        heuristic: 0,
                        predecessor: Some(current),
                        phase,
                        next_with_same_priority: None,
                    };
                    self.queue.enqueue(&mut self.states, neighbor);
                } else if distance < state.distance {
                    let old_priority = state.priority();
                    self.states[neighbor].distance = distance;
                    self.states[neighbor].predecessor = Some(current);
                    self.queue.change(&mut self.states, neighbor, old_priority);
                }
            }
        }

        visible
    }
}

/// The turn during which a unit with `speed` points per turn has spent `distance`.
fn turn(distance: u32, speed: u32) -> u32 {
    match speed {
        0 => 0,
        speed => distance.saturating_sub(1) / speed,
    }
}

/// A route through the grid, from its first cell to its last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellIndex>,
    cost: u32,
}

impl Path {
    /// Every cell along the path, including both endpoints.
    pub fn cells(&self) -> &[CellIndex] {
        &self.cells
    }

    /// Total movement cost, including points forfeited at turn boundaries.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Number of moves between cells.
    pub fn steps(&self) -> usize {
        self.cells.len() - 1
    }

    pub fn start(&self) -> CellIndex {
        self.cells[0]
    }

    pub fn end(&self) -> CellIndex {
        self.cells[self.cells.len() - 1]
    }

    /// Number of turns a unit with `speed` points per turn needs to complete this path.
    pub fn turns(&self, speed: u32) -> u32 {
        match speed {
            0 => 0,
            speed => self.cost.div_ceil(speed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(_: &HexGrid, _: CellIndex, _: CellIndex, _: Direction) -> Option<u32> {
        Some(1)
    }

    #[test]
    fn test_turn() {
        assert_eq!(turn(0, 24), 0);
        assert_eq!(turn(24, 24), 0);
        assert_eq!(turn(25, 24), 1);
        assert_eq!(turn(100, 0), 0);
    }

    #[test]
    fn test_path_to_self() {
        let grid = HexGrid::new(5, 5).unwrap();
        let mut context = SearchContext::new();
        let path = context.find_path(&grid, 6, 6, 0, uniform).unwrap();
        assert_eq!(path.cells(), &[6]);
        assert_eq!(path.steps(), 0);
        assert_eq!(path.cost(), 0);
    }

    #[test]
    fn test_path_follows_neighbors() {
        let grid = HexGrid::new(10, 10).unwrap();
        let mut context = SearchContext::new();
        let from = grid.cell_at_offset(1, 8).unwrap();
        let to = grid.cell_at_offset(9, 0).unwrap();
        let path = context.find_path(&grid, from, to, 0, uniform).unwrap();
        assert_eq!(path.start(), from);
        assert_eq!(path.end(), to);
        for pair in path.cells().windows(2) {
            assert!(grid[pair[0]].neighbors().any(|(_, n)| n == pair[1]));
        }
        assert_eq!(
            path.steps() as u32,
            grid[from].coordinate().distance_to(grid[to].coordinate())
        );
    }

    #[test]
    fn test_turn_boundary_inflates_cost() {
        let grid = HexGrid::new(5, 5).unwrap();
        let mut context = SearchContext::new();
        let from = grid.cell_at_offset(0, 0).unwrap();
        let to = grid.cell_at_offset(3, 0).unwrap();

        let free = context.find_path(&grid, from, to, 0, |_, _, _, _| Some(4)).unwrap();
        assert_eq!(free.cost(), 12);

        // speed 10: steps cost 4 and 8, then the third step spills into turn two
        let turned = context.find_path(&grid, from, to, 10, |_, _, _, _| Some(4)).unwrap();
        assert_eq!(turned.steps(), 3);
        assert_eq!(turned.cost(), 14);
        assert_eq!(turned.turns(10), 2);
    }

    #[test]
    fn test_prefers_cheaper_detour() {
        let grid = HexGrid::new(5, 5).unwrap();
        let mut context = SearchContext::new();
        let from = grid.cell_at_offset(0, 2).unwrap();
        let to = grid.cell_at_offset(2, 2).unwrap();
        let expensive = grid.cell_at_offset(1, 2).unwrap();

        let path = context
            .find_path(&grid, from, to, 0, |_, _, neighbor, _| {
                Some(if neighbor == expensive { 10 } else { 1 })
            })
            .unwrap();
        assert!(!path.cells().contains(&expensive));
        assert_eq!(path.steps(), 3);
        assert_eq!(path.cost(), 3);
    }

    #[test]
    fn test_context_reuse_across_grids() {
        let small = HexGrid::new(5, 5).unwrap();
        let large = HexGrid::new(10, 10).unwrap();
        let mut context = SearchContext::new();

        let first = context.find_path(&small, 0, 24, 0, uniform).unwrap();
        let second = context.find_path(&large, 0, 99, 0, uniform).unwrap();
        let third = context.find_path(&small, 0, 24, 0, uniform).unwrap();
        assert_eq!(first, third);
        assert_eq!(second.end(), 99);
    }

    #[test]
    fn test_phase_exhaustion_resets() {
        let grid = HexGrid::new(5, 5).unwrap();
        let mut context = SearchContext::new();
        let expected = context.find_path(&grid, 0, 24, 0, uniform).unwrap();

        context.phase = u32::MAX - 1;
        let path = context.find_path(&grid, 0, 24, 0, uniform).unwrap();
        assert_eq!(path, expected);
        assert_eq!(context.phase, 2);
    }

    #[test]
    fn test_large_costs_keep_queue_small() {
        let grid = HexGrid::new(5, 5).unwrap();
        let mut context = SearchContext::new();
        let path = context
            .find_path(&grid, 0, 24, 0, |_, _, _, _| Some(1 << 22))
            .unwrap();
        assert_eq!(path.cost(), 6 << 22);
        assert!(context.queue.bucket_count() <= BucketQueue::MAX_BUCKET_COUNT);

        context.find_path(&grid, 0, 24, 0, uniform).unwrap();
        assert_eq!(
            context.queue.bucket_count(),
            BucketQueue::DEFAULT_BUCKET_COUNT
        );
    }

    #[test]
    fn test_out_of_range_cells() {
        let grid = HexGrid::new(5, 5).unwrap();
        let mut context = SearchContext::new();
        assert_eq!(context.find_path(&grid, 0, 25, 0, uniform), None);
        assert!(context.visible_cells(&grid, 25, 3).is_empty());
    }

    #[test]
    fn test_visible_range_on_flat_ground() {
        let grid = HexGrid::new(10, 10).unwrap();
        let mut context = SearchContext::new();
        let from = grid.cell_at_offset(5, 5).unwrap();
        let origin = grid[from].coordinate();

        let visible = context.visible_cells(&grid, from, 2);
        assert_eq!(visible[0], from);
        // a full hexagon of radius 2
        assert_eq!(visible.len(), 19);
        assert!(visible
            .iter()
            .all(|&cell| origin.distance_to(grid[cell].coordinate()) <= 2));
    }

    #[test]
    fn test_height_blocks_and_extends_sight() {
        let mut grid = HexGrid::new(10, 10).unwrap();
        let mut context = SearchContext::new();
        let from = grid.cell_at_offset(5, 5).unwrap();
        let east = grid.neighbor(from, Direction::E).unwrap();
        let beyond = grid.neighbor(east, Direction::E).unwrap();

        grid.set_elevation(east, 2);
        let visible = context.visible_cells(&grid, from, 2);
        assert!(!visible.contains(&east));
        assert!(!visible.contains(&beyond));

        grid.set_elevation(from, 2);
        let visible = context.visible_cells(&grid, from, 2);
        assert!(visible.contains(&east));
        assert!(visible.contains(&beyond));
    }
}
