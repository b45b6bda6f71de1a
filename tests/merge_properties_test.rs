//! Property tests for merge cascades and gravity

use proptest::prelude::*;

use merge_drop::core::{find_groups, Grid, MergeResolver};
use merge_drop::types::{FIRST_PLAYABLE_ROW, GRID_HEIGHT, GRID_WIDTH, PLAYABLE_ROWS};

/// Playable rows filled from a flat list (0 = empty), gaps left in place.
fn arb_loose_grid() -> impl Strategy<Value = Grid> {
    let cell = prop_oneof![
        3 => Just(0u64),
        2 => Just(2u64),
        2 => Just(4u64),
        1 => Just(8u64),
        1 => Just(16u64),
    ];
    prop::collection::vec(cell, (PLAYABLE_ROWS as usize) * (GRID_WIDTH as usize)).prop_map(
        |cells| {
            let mut grid = Grid::new();
            for (i, value) in cells.into_iter().enumerate() {
                let row = FIRST_PLAYABLE_ROW + (i / GRID_WIDTH as usize) as u8;
                let column = (i % GRID_WIDTH as usize) as u8;
                grid.set(row, column, value);
            }
            grid
        },
    )
}

/// Like `arb_loose_grid`, packed down.
fn arb_grid() -> impl Strategy<Value = Grid> {
    arb_loose_grid().prop_map(|mut grid| {
        grid.compact_all();
        grid
    })
}

fn is_packed(grid: &Grid) -> bool {
    (0..GRID_WIDTH).all(|column| {
        let mut seen_gap = false;
        for row in (FIRST_PLAYABLE_ROW..GRID_HEIGHT).rev() {
            let empty = grid.is_empty_at(row, column);
            if empty {
                seen_gap = true;
            } else if seen_gap {
                return false;
            }
        }
        true
    })
}

proptest! {
    #[test]
    fn compacting_a_column_keeps_its_values_in_order(
        grid in arb_loose_grid(),
        column in 0..GRID_WIDTH,
    ) {
        let mut packed = grid.clone();
        prop_assert!(packed.compact_column(column));

        prop_assert_eq!(packed.column_values(column), grid.column_values(column));
        let count = grid.column_values(column).len() as u8;
        for row in 0..GRID_HEIGHT {
            let filled = row >= GRID_HEIGHT - count;
            prop_assert_eq!(!packed.is_empty_at(row, column), filled);
        }
        for other in (0..GRID_WIDTH).filter(|&c| c != column) {
            for row in 0..GRID_HEIGHT {
                prop_assert_eq!(packed.get(row, other), grid.get(row, other));
            }
        }
    }

    #[test]
    fn cascade_terminates_with_no_groups_left(mut grid in arb_grid()) {
        let before = grid.nonzero_count();
        let mut resolver = MergeResolver::new(0);
        let reports = resolver.resolve_all(&mut grid);

        prop_assert!(find_groups(&grid).is_empty());
        prop_assert!(reports.iter().all(|r| r.overflow_column.is_none()));
        prop_assert_eq!(reports.len() as u32, resolver.pass_count());
        prop_assert!(resolver.pass_count() as usize <= before);
        prop_assert!(is_packed(&grid));
    }

    #[test]
    fn every_merging_pass_removes_tiles(mut grid in arb_grid()) {
        let mut resolver = MergeResolver::new(0);
        resolver.begin();
        let mut count = grid.nonzero_count();
        loop {
            let report = resolver.run_pass(&mut grid);
            if report.is_settled() {
                break;
            }
            let consumed: usize = report.merges.iter().map(|m| m.size as usize).sum();
            let now = grid.nonzero_count();
            prop_assert!(now < count);
            prop_assert_eq!(now, count - consumed + report.merges.len());
            count = now;
        }
    }

    #[test]
    fn merged_values_stay_powers_of_two(mut grid in arb_grid()) {
        let mut resolver = MergeResolver::new(0);
        resolver.resolve_all(&mut grid);
        for row in FIRST_PLAYABLE_ROW..GRID_HEIGHT {
            for column in 0..GRID_WIDTH {
                let value = grid.get(row, column).unwrap_or(0);
                prop_assert!(value == 0 || value.is_power_of_two());
            }
        }
    }
}
