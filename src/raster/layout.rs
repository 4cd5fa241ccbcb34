use std::fmt::Display;

/// How pixel data is partitioned on disk.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Layout {
    Strips { rows_per_strip: usize },
    Tiles { width: usize, height: usize },
}

/// Placement of one strip or tile in the (top-down) image.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Chunk {
    pub row: usize,
    pub col: usize,
    /// Stored dimensions; tiles keep their full size even at the edges.
    pub rows: usize,
    pub cols: usize,
    /// The part of the chunk that falls inside the image.
    pub valid_rows: usize,
    pub valid_cols: usize,
}

impl Layout {
    pub fn col_count(&self, width: usize) -> usize {
        match self {
            Layout::Strips { .. } => 1,
            Layout::Tiles { width: tile_width, .. } => width.div_ceil(*tile_width),
        }
    }

    pub fn row_count(&self, height: usize) -> usize {
        match self {
            Layout::Strips { rows_per_strip } => height.div_ceil(*rows_per_strip),
            Layout::Tiles {
                height: tile_height,
                ..
            } => height.div_ceil(*tile_height),
        }
    }

    pub fn chunk_count(&self, width: usize, height: usize) -> usize {
        self.col_count(width) * self.row_count(height)
    }

    pub fn chunk(&self, index: usize, width: usize, height: usize) -> Chunk {
        match self {
            Layout::Strips { rows_per_strip } => {
                let row = index * rows_per_strip;
                let rows = (*rows_per_strip).min(height.saturating_sub(row));
                Chunk {
                    row,
                    col: 0,
                    rows,
                    cols: width,
                    valid_rows: rows,
                    valid_cols: width,
                }
            }
            Layout::Tiles {
                width: tile_width,
                height: tile_height,
            } => {
                let col_count = self.col_count(width);
                let row = (index / col_count) * tile_height;
                let col = (index % col_count) * tile_width;
                Chunk {
                    row,
                    col,
                    rows: *tile_height,
                    cols: *tile_width,
                    valid_rows: (*tile_height).min(height.saturating_sub(row)),
                    valid_cols: (*tile_width).min(width.saturating_sub(col)),
                }
            }
        }
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Strips { rows_per_strip } => write!(f, "Strips({rows_per_strip} rows)"),
            Layout::Tiles { width, height } => write!(f, "Tiles({width}x{height})"),
        }
    }
}
