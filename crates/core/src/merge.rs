//! Merge resolver - connected-group detection, merging, and gravity
//!
//! One pass scans rows 2-7 in row-major order and flood-fills every maximal
//! 4-connected group of equal nonzero values. Each group of `n >= 2` tiles of value
//! `v` collapses into a single tile `v * 2^(n-1)` worth `v * 2^(n-1) * n` points,
//! placed on the group's lowest row, at the first member the flood fill reached
//! there. Affected columns are then compacted.
//!
//! Every pass with merges strictly lowers the number of tiles, so a cascade of
//! passes ends within `rows * cols` passes.

use arrayvec::ArrayVec;

use crate::grid::{Grid, GRID_SIZE};
use crate::types::{FIRST_PLAYABLE_ROW, GRID_HEIGHT, GRID_WIDTH, MERGE_PASS_DELAY_MS, PLAYABLE_ROWS};

/// Playable cells on the grid
pub const PLAYABLE_CELLS: usize = (PLAYABLE_ROWS as usize) * (GRID_WIDTH as usize);

/// Upper bound on groups in one pass (every group has two or more cells)
pub const MAX_GROUPS: usize = PLAYABLE_CELLS / 2;

/// A maximal set of connected equal tiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub value: u64,
    /// Members as `(row, column)` in discovery order
    pub cells: ArrayVec<(u8, u8), PLAYABLE_CELLS>,
}

impl MergeGroup {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// `value * 2^(size-1)`, saturating
    pub fn merged_value(&self) -> u64 {
        let shift = self.size().saturating_sub(1) as u32;
        self.value.saturating_mul(1u64.checked_shl(shift).unwrap_or(u64::MAX))
    }

    pub fn points(&self) -> u64 {
        self.merged_value().saturating_mul(self.size() as u64)
    }

    /// Cell receiving the merged tile: the first member found on the lowest row
    pub fn anchor(&self) -> (u8, u8) {
        let first = self.cells.first().copied().unwrap_or((0, 0));
        self.cells
            .iter()
            .copied()
            .fold(first, |best, cell| if cell.0 > best.0 { cell } else { best })
    }
}

/// One applied merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRecord {
    /// Where the merged tile was written (before compaction)
    pub row: u8,
    pub column: u8,
    /// Value of the merged tile
    pub value: u64,
    /// Tiles consumed
    pub size: u8,
    pub points: u64,
}

/// Outcome of one cascade pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// 1-based pass number within the current cascade; 0 when nothing merged
    pub pass: u32,
    pub merges: ArrayVec<MergeRecord, MAX_GROUPS>,
    pub points: u64,
    /// Column whose compaction reached the death row
    pub overflow_column: Option<u8>,
}

impl PassReport {
    pub fn is_settled(&self) -> bool {
        self.merges.is_empty()
    }
}

/// All merge groups currently on the grid, in row-major discovery order
pub fn find_groups(grid: &Grid) -> ArrayVec<MergeGroup, MAX_GROUPS> {
    let mut groups = ArrayVec::new();
    let mut visited = [false; GRID_SIZE];
    let width = GRID_WIDTH as usize;

    for row in FIRST_PLAYABLE_ROW..GRID_HEIGHT {
        for column in 0..GRID_WIDTH {
            let idx = row as usize * width + column as usize;
            if visited[idx] {
                continue;
            }
            let value = grid.get(row, column).unwrap_or(0);
            if value == 0 {
                continue;
            }

            let group = flood(grid, row, column, value, &mut visited);
            if group.size() >= 2 && !groups.is_full() {
                groups.push(group);
            }
        }
    }

    groups
}

/// BFS over 4-neighbours holding `value`
fn flood(grid: &Grid, row: u8, column: u8, value: u64, visited: &mut [bool; GRID_SIZE]) -> MergeGroup {
    let width = GRID_WIDTH as usize;
    let mut cells: ArrayVec<(u8, u8), PLAYABLE_CELLS> = ArrayVec::new();
    let mut head = 0;

    visited[row as usize * width + column as usize] = true;
    cells.push((row, column));

    while head < cells.len() {
        let (r, c) = cells[head];
        head += 1;

        // Right, left, down, up. Member order decides the anchor.
        let neighbours = [
            (Some(r), Some(c + 1)),
            (Some(r), c.checked_sub(1)),
            (Some(r + 1), Some(c)),
            (r.checked_sub(1), Some(c)),
        ];
        for (nr, nc) in neighbours {
            let (Some(nr), Some(nc)) = (nr, nc) else {
                continue;
            };
            if nr < FIRST_PLAYABLE_ROW || nr >= GRID_HEIGHT || nc >= GRID_WIDTH {
                continue;
            }
            let idx = nr as usize * width + nc as usize;
            if visited[idx] || grid.get(nr, nc) != Some(value) {
                continue;
            }
            visited[idx] = true;
            cells.push((nr, nc));
        }
    }

    MergeGroup { value, cells }
}

/// Runs cascades pass by pass with a delay between passes
#[derive(Debug, Clone)]
pub struct MergeResolver {
    pass_delay_ms: u32,
    pass_count: u32,
    delay_remaining_ms: u32,
    resolving: bool,
}

impl MergeResolver {
    pub fn new(pass_delay_ms: u32) -> Self {
        Self {
            pass_delay_ms,
            pass_count: 0,
            delay_remaining_ms: 0,
            resolving: false,
        }
    }

    /// Passes with merges in the current (or last) cascade
    pub fn pass_count(&self) -> u32 {
        self.pass_count
    }

    pub fn is_resolving(&self) -> bool {
        self.resolving
    }

    /// Milliseconds until the next pass may run
    pub fn delay_remaining_ms(&self) -> u32 {
        self.delay_remaining_ms
    }

    /// Start a cascade after a landing
    pub fn begin(&mut self) {
        self.pass_count = 0;
        self.delay_remaining_ms = 0;
        self.resolving = true;
    }

    pub fn reset(&mut self) {
        self.pass_count = 0;
        self.delay_remaining_ms = 0;
        self.resolving = false;
    }

    /// Count down the inter-pass delay; true once the next pass is due
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if !self.resolving {
            return false;
        }
        self.delay_remaining_ms = self.delay_remaining_ms.saturating_sub(elapsed_ms);
        self.delay_remaining_ms == 0
    }

    /// Apply every group on the grid, then compact the affected columns
    ///
    /// A settled grid ends the cascade. Otherwise the pass counter advances and the
    /// inter-pass delay is armed.
    pub fn run_pass(&mut self, grid: &mut Grid) -> PassReport {
        let groups = find_groups(grid);
        if groups.is_empty() {
            self.resolving = false;
            self.delay_remaining_ms = 0;
            return PassReport::default();
        }

        let mut report = PassReport::default();
        let mut affected = [false; GRID_WIDTH as usize];

        for group in &groups {
            for &(row, column) in &group.cells {
                grid.set(row, column, 0);
                affected[column as usize] = true;
            }
            let (row, column) = group.anchor();
            let record = MergeRecord {
                row,
                column,
                value: group.merged_value(),
                size: group.size() as u8,
                points: group.points(),
            };
            grid.set(row, column, record.value);
            report.points = report.points.saturating_add(record.points);
            report.merges.push(record);
        }

        for (column, _) in affected.iter().enumerate().filter(|(_, a)| **a) {
            if !grid.compact_column(column as u8) && report.overflow_column.is_none() {
                report.overflow_column = Some(column as u8);
            }
        }

        self.pass_count += 1;
        self.delay_remaining_ms = self.pass_delay_ms;
        report.pass = self.pass_count;
        report
    }

    /// Run passes back to back until the grid settles or overflows
    pub fn resolve_all(&mut self, grid: &mut Grid) -> ArrayVec<PassReport, GRID_SIZE> {
        let mut reports = ArrayVec::new();
        self.begin();
        while !reports.is_full() {
            let report = self.run_pass(grid);
            if report.is_settled() {
                break;
            }
            let overflow = report.overflow_column.is_some();
            reports.push(report);
            if overflow {
                self.resolving = false;
                break;
            }
        }
        reports
    }
}

impl Default for MergeResolver {
    fn default() -> Self {
        Self::new(MERGE_PASS_DELAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(cells: &[(u8, u8, u64)]) -> Grid {
        let mut grid = Grid::new();
        for &(row, column, value) in cells {
            grid.set(row, column, value);
        }
        grid
    }

    #[test]
    fn single_tiles_do_not_merge() {
        let grid = grid_with(&[(7, 0, 2), (7, 1, 4), (6, 0, 8)]);
        assert!(find_groups(&grid).is_empty());
    }

    #[test]
    fn l_shaped_group_is_found_whole() {
        let grid = grid_with(&[(5, 0, 4), (6, 0, 4), (7, 0, 4), (7, 1, 4), (7, 3, 4)]);
        let groups = find_groups(&grid);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].size(), 4);
        assert_eq!(groups[0].merged_value(), 32);
        assert_eq!(groups[0].points(), 128);
        assert_eq!(groups[0].anchor(), (7, 0));
    }

    #[test]
    fn anchor_is_first_bottom_member_reached() {
        // Reached from (6,1): down to (7,1) before left to (7,0).
        let mut grid = grid_with(&[(6, 1, 4), (7, 1, 4), (7, 0, 4)]);
        let groups = find_groups(&grid);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].anchor(), (7, 1));

        let mut resolver = MergeResolver::new(0);
        resolver.begin();
        let report = resolver.run_pass(&mut grid);
        assert_eq!(report.merges[0].column, 1);
        assert_eq!(grid.get(7, 1), Some(16));
        assert_eq!(grid.get(7, 0), Some(0));
        assert_eq!(grid.get(6, 1), Some(0));
    }

    #[test]
    fn diagonal_tiles_are_not_connected() {
        let grid = grid_with(&[(7, 0, 2), (6, 1, 2)]);
        assert!(find_groups(&grid).is_empty());
    }

    #[test]
    fn death_row_tiles_never_join_groups() {
        let grid = grid_with(&[(1, 0, 2), (2, 0, 2)]);
        assert!(find_groups(&grid).is_empty());
    }

    #[test]
    fn pass_merges_and_compacts() {
        // Two 8s side by side with a 2 on top of the right one.
        let mut grid = grid_with(&[(7, 2, 8), (7, 3, 8), (6, 3, 2)]);
        let mut resolver = MergeResolver::new(0);
        resolver.begin();
        let report = resolver.run_pass(&mut grid);

        assert_eq!(report.pass, 1);
        assert_eq!(report.merges.len(), 1);
        assert_eq!(report.merges[0].value, 16);
        assert_eq!(report.merges[0].column, 2);
        assert_eq!(report.points, 32);
        assert_eq!(grid.get(7, 2), Some(16));
        // The 2 falls into the vacated cell.
        assert_eq!(grid.get(7, 3), Some(2));
        assert_eq!(grid.get(6, 3), Some(0));
    }

    #[test]
    fn cascade_counts_passes() {
        // 2+2 -> 4 lands next to an existing 4.
        let mut grid = grid_with(&[(7, 0, 4), (7, 1, 2), (6, 1, 2)]);
        let mut resolver = MergeResolver::new(0);
        let reports = resolver.resolve_all(&mut grid);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].merges[0].value, 8);
        assert_eq!(resolver.pass_count(), 2);
        assert_eq!(grid.nonzero_count(), 1);
        assert_eq!(grid.get(7, 0), Some(8));
    }

    #[test]
    fn pass_delay_gates_next_pass() {
        let mut grid = grid_with(&[(7, 0, 2), (7, 1, 2)]);
        let mut resolver = MergeResolver::new(300);
        resolver.begin();
        assert!(resolver.tick(0));
        resolver.run_pass(&mut grid);
        assert!(!resolver.tick(200));
        assert!(resolver.tick(100));
        assert!(resolver.run_pass(&mut grid).is_settled());
        assert!(!resolver.is_resolving());
    }

    #[test]
    fn huge_values_saturate() {
        let group = MergeGroup {
            value: u64::MAX / 2,
            cells: [(7, 0), (7, 1), (7, 2)].into_iter().collect(),
        };
        assert_eq!(group.merged_value(), u64::MAX);
        assert_eq!(group.points(), u64::MAX);
    }
}
