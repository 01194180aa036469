//! The fixed coarse grid overlaid on every frame during classification.

use std::fmt;
use std::ops::{Index, Range};

/// Cells per image side. Compile-time so grids can live in plain arrays.
pub const GRID_SIZE: usize = 40;

/// Maps grid cells onto pixel rectangles of a `width` x `height` image.
///
/// Cell size is the integer quotient of the image side by [`GRID_SIZE`]; the
/// last column and row of cells absorb the remainder pixels. Images narrower
/// than the grid get one-pixel cells and empty trailing cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    width: usize,
    height: usize,
    cell_width: usize,
    cell_height: usize,
}

impl GridLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cell_width: (width / GRID_SIZE).max(1),
            cell_height: (height / GRID_SIZE).max(1),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Nominal cell width (`grid_x`).
    #[inline]
    pub fn cell_width(&self) -> usize {
        self.cell_width
    }

    /// Nominal cell height (`grid_y`).
    #[inline]
    pub fn cell_height(&self) -> usize {
        self.cell_height
    }

    pub fn cell_x_range(&self, col: usize) -> Range<usize> {
        Self::span(col, self.cell_width, self.width)
    }

    pub fn cell_y_range(&self, row: usize) -> Range<usize> {
        Self::span(row, self.cell_height, self.height)
    }

    /// Cell `(col, row)` owning pixel `(x, y)`.
    #[inline]
    pub fn cell_of(&self, x: usize, y: usize) -> (usize, usize) {
        (
            (x / self.cell_width).min(GRID_SIZE - 1),
            (y / self.cell_height).min(GRID_SIZE - 1),
        )
    }

    /// Whether the cell touches the image edge (or holds no pixels at all).
    pub fn is_border_cell(&self, col: usize, row: usize) -> bool {
        let xs = self.cell_x_range(col);
        let ys = self.cell_y_range(row);
        xs.is_empty() || ys.is_empty() || xs.start == 0 || ys.start == 0 || xs.end == self.width
            || ys.end == self.height
    }

    fn span(index: usize, cell: usize, extent: usize) -> Range<usize> {
        debug_assert!(index < GRID_SIZE);
        let start = (index * cell).min(extent);
        let end = if index == GRID_SIZE - 1 {
            extent
        } else {
            ((index + 1) * cell).min(extent)
        };
        start..end
    }
}

/// Per-cell ghost flags, indexed by `(row, col)`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClassificationGrid {
    cells: [[bool; GRID_SIZE]; GRID_SIZE],
}

impl Default for ClassificationGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationGrid {
    /// A grid with no ghosted cells.
    pub fn new() -> Self {
        Self {
            cells: [[false; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// Build from row-major flags, `GRID_SIZE * GRID_SIZE` of them.
    pub fn from_flags(flags: &[bool]) -> Self {
        assert_eq!(
            flags.len(),
            GRID_SIZE * GRID_SIZE,
            "flags length must equal GRID_SIZE * GRID_SIZE"
        );
        let mut grid = Self::new();
        for (idx, &flag) in flags.iter().enumerate() {
            grid.cells[idx / GRID_SIZE][idx % GRID_SIZE] = flag;
        }
        grid
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, ghosted: bool) {
        self.cells[row][col] = ghosted;
    }

    pub fn ghosted_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&c| c).count()
    }

    pub fn has_ghosts(&self) -> bool {
        self.cells.iter().flatten().any(|&c| c)
    }

    /// `(row, col)` of every ghosted cell, row-major.
    pub fn ghosted_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..GRID_SIZE)
            .flat_map(|row| (0..GRID_SIZE).map(move |col| (row, col)))
            .filter(|&(row, col)| self.cells[row][col])
    }
}

impl Index<(usize, usize)> for ClassificationGrid {
    type Output = bool;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.cells[row][col]
    }
}

impl fmt::Debug for ClassificationGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ClassificationGrid ({} ghosted)", self.ghosted_count())?;
        for row in &self.cells {
            let line: String = row.iter().map(|&c| if c { '#' } else { '.' }).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
