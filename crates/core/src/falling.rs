//! Drop controller - vertical fall of a redirected tile
//!
//! A falling tile starts at the death row and eases into its target row. The grid
//! is only written when the fall completes.

use crate::grid::Grid;
use crate::types::{DEATH_ROW, FALL_SPEED_PER_MS};

/// A selected column cannot take another tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnBlocked {
    pub column: u8,
}

/// Where a tile came to rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Landing {
    pub value: u64,
    pub row: u8,
    pub column: u8,
}

/// Outcome of advancing a moving tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStep {
    /// Nothing in flight
    Idle,
    /// Still moving
    InFlight,
    /// Written to the grid
    Landed(Landing),
    /// Would rest in the death row; the grid was not touched
    DeathRow { column: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallingTile {
    pub value: u64,
    pub column: u8,
    pub target_row: u8,
    pub progress: f32,
}

impl FallingTile {
    /// Row position for drawing, eased from the death row to the target
    pub fn visual_row(&self) -> f32 {
        let start = DEATH_ROW as f32;
        let end = self.target_row as f32;
        start + (end - start) * ease_out_bounce(self.progress)
    }
}

/// Bounce easing; maps 0 to 0 and 1 to 1
pub fn ease_out_bounce(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    let t = t.clamp(0.0, 1.0);
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

#[derive(Debug, Clone)]
pub struct DropController {
    tile: Option<FallingTile>,
    speed: f32,
}

impl DropController {
    /// `speed` is fall progress per millisecond
    pub fn new(speed: f32) -> Self {
        Self { tile: None, speed }
    }

    pub fn tile(&self) -> Option<&FallingTile> {
        self.tile.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.tile.is_some()
    }

    pub fn clear(&mut self) {
        self.tile = None;
    }

    /// Begin a fall into `column`
    ///
    /// Fails when rows 1-7 of the column are all occupied.
    pub fn start(&mut self, grid: &Grid, column: u8, value: u64) -> Result<FallingTile, ColumnBlocked> {
        let target_row = grid.lowest_empty_row(column).ok_or(ColumnBlocked { column })?;
        let tile = FallingTile {
            value,
            column,
            target_row,
            progress: 0.0,
        };
        self.tile = Some(tile);
        Ok(tile)
    }

    /// Move the tile; on completion write it to the grid
    pub fn advance(&mut self, dt_ms: f32, grid: &mut Grid) -> TileStep {
        let Some(tile) = self.tile.as_mut() else {
            return TileStep::Idle;
        };

        tile.progress += self.speed * dt_ms;
        if tile.progress < 1.0 {
            return TileStep::InFlight;
        }

        let FallingTile {
            value,
            column,
            target_row,
            ..
        } = *tile;
        self.tile = None;

        if target_row <= DEATH_ROW {
            return TileStep::DeathRow { column };
        }
        grid.set(target_row, column, value);
        TileStep::Landed(Landing {
            value,
            row: target_row,
            column,
        })
    }
}

impl Default for DropController {
    fn default() -> Self {
        Self::new(FALL_SPEED_PER_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_hits_endpoints() {
        assert_eq!(ease_out_bounce(0.0), 0.0);
        assert!((ease_out_bounce(1.0) - 1.0).abs() < 1e-6);
        assert!((ease_out_bounce(2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fall_lands_on_lowest_empty_row() {
        let mut grid = Grid::new();
        grid.set(7, 2, 8);
        let mut drop = DropController::default();
        let tile = drop.start(&grid, 2, 4).unwrap();
        assert_eq!(tile.target_row, 6);

        // 0.03/ms: not done after 16ms, done after two more ticks.
        assert_eq!(drop.advance(16.0, &mut grid), TileStep::InFlight);
        assert_eq!(grid.get(6, 2), Some(0));
        assert_eq!(drop.advance(16.0, &mut grid), TileStep::InFlight);
        assert_eq!(
            drop.advance(16.0, &mut grid),
            TileStep::Landed(Landing { value: 4, row: 6, column: 2 })
        );
        assert_eq!(grid.get(6, 2), Some(4));
        assert!(!drop.is_active());
    }

    #[test]
    fn landing_in_death_row_leaves_grid_untouched() {
        let mut grid = Grid::new();
        for row in 2..8 {
            grid.set(row, 0, 2u64 << row);
        }
        let before = grid.clone();
        let mut drop = DropController::default();
        let tile = drop.start(&grid, 0, 2).unwrap();
        assert_eq!(tile.target_row, 1);
        assert_eq!(drop.advance(1000.0, &mut grid), TileStep::DeathRow { column: 0 });
        assert_eq!(grid, before);
    }

    #[test]
    fn start_fails_on_completely_full_column() {
        let mut grid = Grid::new();
        for row in 1..8 {
            grid.set(row, 4, 2u64 << row);
        }
        let mut drop = DropController::default();
        assert_eq!(drop.start(&grid, 4, 2), Err(ColumnBlocked { column: 4 }));
        assert!(!drop.is_active());
    }

    #[test]
    fn visual_row_moves_from_death_row_to_target() {
        let tile = FallingTile {
            value: 2,
            column: 0,
            target_row: 7,
            progress: 0.0,
        };
        assert_eq!(tile.visual_row(), 1.0);
        let done = FallingTile { progress: 1.0, ..tile };
        assert!((done.visual_row() - 7.0).abs() < 1e-5);
    }
}
