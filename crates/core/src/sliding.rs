//! Sliding controller - horizontal travel of the incoming tile
//!
//! A slide carries the next queued value along row 0 from the last drop column
//! toward a target column. Left alone it lands in the target column's lowest
//! empty row. Selecting a column mid-slide redirects it into a fast vertical fall
//! handled by [`DropController`].

use crate::falling::{ColumnBlocked, DropController, FallingTile, Landing, TileStep};
use crate::grid::Grid;
use crate::queue::TileQueue;
use crate::types::DEATH_ROW;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingTile {
    pub value: u64,
    pub source_column: u8,
    pub target_column: u8,
    pub progress: f32,
}

impl SlidingTile {
    /// Column position for drawing, interpolated between source and target
    pub fn visual_column(&self) -> f32 {
        let from = self.source_column as f32;
        let to = self.target_column as f32;
        from + (to - from) * self.progress.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlidingController {
    tile: Option<SlidingTile>,
}

impl SlidingController {
    pub fn new() -> Self {
        Self { tile: None }
    }

    pub fn tile(&self) -> Option<&SlidingTile> {
        self.tile.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.tile.is_some()
    }

    pub fn clear(&mut self) {
        self.tile = None;
    }

    /// Pop the next value and slide it from `source_column` toward `target_column`
    ///
    /// The queue is left untouched when the target is blocked.
    pub fn start(
        &mut self,
        grid: &Grid,
        queue: &mut TileQueue,
        source_column: u8,
        target_column: u8,
    ) -> Result<SlidingTile, ColumnBlocked> {
        if !grid.is_column_drop_ready(target_column) {
            return Err(ColumnBlocked {
                column: target_column,
            });
        }

        let tile = SlidingTile {
            value: queue.pop(),
            source_column,
            target_column,
            progress: 0.0,
        };
        self.tile = Some(tile);
        Ok(tile)
    }

    /// Move the tile at `speed` progress per millisecond
    ///
    /// On completion the tile is written to the target column's lowest empty row.
    pub fn advance(&mut self, dt_ms: f32, speed: f32, grid: &mut Grid) -> TileStep {
        let Some(tile) = self.tile.as_mut() else {
            return TileStep::Idle;
        };

        tile.progress += speed * dt_ms;
        if tile.progress < 1.0 {
            return TileStep::InFlight;
        }

        let SlidingTile {
            value,
            target_column: column,
            ..
        } = *tile;
        self.tile = None;

        match grid.lowest_empty_row(column) {
            Some(row) if row > DEATH_ROW => {
                grid.set(row, column, value);
                TileStep::Landed(Landing { value, row, column })
            }
            _ => TileStep::DeathRow { column },
        }
    }

    /// Turn the sliding tile into a fall down `column`
    ///
    /// Returns Ok(None) when nothing is sliding. A blocked column discards the tile.
    pub fn redirect(
        &mut self,
        grid: &Grid,
        column: u8,
        drop: &mut DropController,
    ) -> Result<Option<FallingTile>, ColumnBlocked> {
        let Some(tile) = self.tile.take() else {
            return Ok(None);
        };
        if !grid.is_column_drop_ready(column) {
            return Err(ColumnBlocked { column });
        }
        drop.start(grid, column, tile.value).map(Some)
    }
}
