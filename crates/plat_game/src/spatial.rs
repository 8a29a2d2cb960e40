//! Broad-phase filter: keep only entities within a few grid cells of the player.
//!
//! There is no persistent index. Cells are computed on demand as
//! `floor(position / grid_size)` from each entity's top-left corner and
//! compared by Chebyshev distance, so the result is exactly what a full scan
//! with the same predicate would return.

use crate::collision::Bounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub fn containing(x: f32, y: f32, grid_size: f32) -> Self {
        Self {
            x: (x / grid_size).floor() as i32,
            y: (y / grid_size).floor() as i32,
        }
    }

    pub fn chebyshev(&self, other: &GridCell) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Top-left world position of this cell.
    pub fn origin(&self, grid_size: f32) -> (f32, f32) {
        (self.x as f32 * grid_size, self.y as f32 * grid_size)
    }
}

/// Snap a world position to the top-left corner of its grid cell.
pub fn snap_to_grid(x: f32, y: f32, grid_size: f32) -> (f32, f32) {
    GridCell::containing(x, y, grid_size).origin(grid_size)
}

#[derive(Debug, Clone, Copy)]
pub struct NearbyFilter {
    center: GridCell,
    grid_size: f32,
    range: i32,
}

impl NearbyFilter {
    pub fn around(player: &Bounds, grid_size: f32, range: i32) -> Self {
        Self {
            center: GridCell::containing(player.left, player.top, grid_size),
            grid_size,
            range,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        GridCell::containing(x, y, self.grid_size).chebyshev(&self.center) <= self.range
    }

    /// Indices of `items` whose position passes the filter, in original order.
    pub fn indices<T>(&self, items: &[T], position: impl Fn(&T) -> (f32, f32)) -> Vec<usize> {
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                let (x, y) = position(item);
                self.contains(x, y)
            })
            .map(|(index, _)| index)
            .collect()
    }
}
