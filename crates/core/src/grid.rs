//! Grid module - owns the tile array
//!
//! The grid is 8 rows x 6 columns stored as a flat row-major array of `u64`
//! values, `0` meaning empty. Coordinates are `(row, column)` with row 0 at the top.
//!
//! Only rows 2-7 are ever written by merges, gravity, and progression. Rows 0-1
//! are tested for emptiness but stay empty: the sliding lane holds no grid data
//! and a tile that would rest in the death row ends the game instead.

use arrayvec::ArrayVec;

use crate::types::{DANGER_THRESHOLD, DEATH_ROW, FIRST_PLAYABLE_ROW, GRID_HEIGHT, GRID_WIDTH};

/// Total number of cells on the grid
pub const GRID_SIZE: usize = (GRID_WIDTH as usize) * (GRID_HEIGHT as usize);

/// The tile grid - 6 columns x 8 rows using flat array storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    /// Row-major cells (row * WIDTH + column)
    cells: [u64; GRID_SIZE],
}

impl Grid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self {
            cells: [0; GRID_SIZE],
        }
    }

    #[inline(always)]
    fn index(row: u8, column: u8) -> Option<usize> {
        if row >= GRID_HEIGHT || column >= GRID_WIDTH {
            return None;
        }
        Some((row as usize) * (GRID_WIDTH as usize) + (column as usize))
    }

    pub fn width(&self) -> u8 {
        GRID_WIDTH
    }

    pub fn height(&self) -> u8 {
        GRID_HEIGHT
    }

    /// Get the value at `(row, column)`
    /// Returns None if out of bounds
    pub fn get(&self, row: u8, column: u8) -> Option<u64> {
        Self::index(row, column).map(|idx| self.cells[idx])
    }

    /// Set the value at `(row, column)`
    /// Returns false if out of bounds
    pub fn set(&mut self, row: u8, column: u8, value: u64) -> bool {
        match Self::index(row, column) {
            Some(idx) => {
                self.cells[idx] = value;
                true
            }
            None => false,
        }
    }

    /// True if the cell is in bounds and empty
    pub fn is_empty_at(&self, row: u8, column: u8) -> bool {
        matches!(self.get(row, column), Some(0))
    }

    /// Reset every cell to empty
    pub fn clear(&mut self) {
        self.cells = [0; GRID_SIZE];
    }

    /// Raw row-major cells
    pub fn cells(&self) -> &[u64; GRID_SIZE] {
        &self.cells
    }

    /// Copy of the grid as `[row][column]`
    pub fn rows(&self) -> [[u64; GRID_WIDTH as usize]; GRID_HEIGHT as usize] {
        let mut out = [[0u64; GRID_WIDTH as usize]; GRID_HEIGHT as usize];
        for (row, chunk) in self.cells.chunks_exact(GRID_WIDTH as usize).enumerate() {
            out[row].copy_from_slice(chunk);
        }
        out
    }

    /// Whether a tile may be sent into `column`
    ///
    /// The death row of the column must be empty and the tile's landing row must lie
    /// in the playable field. A column whose rows 2-7 are all occupied is blocked
    /// even though its death row is still empty. Out-of-range columns are blocked.
    pub fn is_column_drop_ready(&self, column: u8) -> bool {
        if !self.is_empty_at(DEATH_ROW, column) {
            return false;
        }
        matches!(self.lowest_empty_row(column), Some(row) if row >= FIRST_PLAYABLE_ROW)
    }

    /// First empty row scanning from the bottom (row 7) up to the death row
    ///
    /// Returns None when rows 1-7 are all occupied or the column is out of range.
    pub fn lowest_empty_row(&self, column: u8) -> Option<u8> {
        if column >= GRID_WIDTH {
            return None;
        }
        (DEATH_ROW..GRID_HEIGHT)
            .rev()
            .find(|&row| self.is_empty_at(row, column))
    }

    /// Apply gravity to one column of the playable field
    ///
    /// Nonzero values in rows 2-7 keep their relative order and are packed against
    /// the bottom. Returns false if the death row of the column is occupied
    /// afterwards, which the engine treats as an overflow.
    pub fn compact_column(&mut self, column: u8) -> bool {
        if column >= GRID_WIDTH {
            return false;
        }

        let mut write = GRID_HEIGHT;
        for read in (FIRST_PLAYABLE_ROW..GRID_HEIGHT).rev() {
            let value = self.get(read, column).unwrap_or(0);
            if value == 0 {
                continue;
            }
            write -= 1;
            if write != read {
                self.set(write, column, value);
                self.set(read, column, 0);
            }
        }

        self.is_empty_at(DEATH_ROW, column)
    }

    /// Compact every column; returns the first column that overflowed
    pub fn compact_all(&mut self) -> Option<u8> {
        let mut overflow = None;
        for column in 0..GRID_WIDTH {
            if !self.compact_column(column) && overflow.is_none() {
                overflow = Some(column);
            }
        }
        overflow
    }

    /// Zero every playable cell holding `value`; returns how many were cleared
    pub fn clear_value(&mut self, value: u64) -> usize {
        if value == 0 {
            return 0;
        }
        let start = (FIRST_PLAYABLE_ROW as usize) * (GRID_WIDTH as usize);
        let mut cleared = 0;
        for cell in &mut self.cells[start..] {
            if *cell == value {
                *cell = 0;
                cleared += 1;
            }
        }
        cleared
    }

    /// Occupied playable cells in a column
    pub fn occupied_in_column(&self, column: u8) -> u8 {
        (FIRST_PLAYABLE_ROW..GRID_HEIGHT)
            .filter(|&row| matches!(self.get(row, column), Some(v) if v != 0))
            .count() as u8
    }

    /// Columns holding at least five playable tiles
    pub fn dangerous_columns(&self) -> [bool; GRID_WIDTH as usize] {
        let mut out = [false; GRID_WIDTH as usize];
        for (column, flag) in out.iter_mut().enumerate() {
            *flag = self.occupied_in_column(column as u8) >= DANGER_THRESHOLD;
        }
        out
    }

    /// Columns that currently accept a tile, left to right
    pub fn drop_ready_columns(&self) -> ArrayVec<u8, { GRID_WIDTH as usize }> {
        (0..GRID_WIDTH)
            .filter(|&c| self.is_column_drop_ready(c))
            .collect()
    }

    /// Number of nonzero cells on the whole grid
    pub fn nonzero_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v != 0).count()
    }

    /// Nonzero values of one column's playable rows, top to bottom
    pub fn column_values(&self, column: u8) -> ArrayVec<u64, { GRID_HEIGHT as usize }> {
        (FIRST_PLAYABLE_ROW..GRID_HEIGHT)
            .filter_map(|row| self.get(row, column))
            .filter(|&v| v != 0)
            .collect()
    }

    /// Build a grid from `[row][column]` values
    pub fn from_rows(rows: [[u64; GRID_WIDTH as usize]; GRID_HEIGHT as usize]) -> Self {
        let mut grid = Self::new();
        for (row, values) in rows.iter().enumerate() {
            for (column, &value) in values.iter().enumerate() {
                grid.set(row as u8, column as u8, value);
            }
        }
        grid
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}
