//! ASCII presenter for the core frame surface
use crossterm::{
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use polyview_core::render::{Color, DepthBuffer, FrameSurface};
use std::io::Write;

/// Glyph ramp from farthest to nearest stroke
const DEPTH_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Each terminal cell covers this many surface rows, which keeps pixels
/// roughly square on a typical 1:2 character cell.
pub const PIXELS_PER_CELL: usize = 2;

/// One character cell of the composed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub glyph: char,
    /// Stroke color, `None` for empty cells
    pub color: Option<Color>,
}

impl Cell {
    const EMPTY: Cell = Cell {
        glyph: ' ',
        color: None,
    };
}

/// Converts a rendered surface into terminal characters
pub struct AsciiRenderer {
    columns: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![Cell::EMPTY; columns * rows],
        }
    }

    /// Surface size in pixels that maps onto this grid.
    pub fn surface_size(&self) -> (usize, usize) {
        (self.columns, self.rows * PIXELS_PER_CELL)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<Cell> {
        (column < self.columns && row < self.rows).then(|| self.cells[row * self.columns + column])
    }

    /// Rebuild the cell grid from a surface and its depth buffer.
    ///
    /// Each cell takes the nearest painted pixel under it; the glyph encodes that
    /// pixel's depth relative to the nearest and farthest strokes in the frame.
    pub fn compose(&mut self, surface: &FrameSurface, depth: &DepthBuffer) {
        let background = surface.background();
        let painted = |x: usize, y: usize| -> Option<(Color, f64)> {
            let color = surface.pixel(x, y)?;
            let z = depth.get(x, y)?;
            (color != background && z.is_finite()).then_some((color, z))
        };

        let (mut nearest, mut farthest) = (f64::NEG_INFINITY, f64::INFINITY);
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                if let Some((_, z)) = painted(x, y) {
                    nearest = nearest.max(z);
                    farthest = farthest.min(z);
                }
            }
        }
        let span = nearest - farthest;

        for row in 0..self.rows {
            for column in 0..self.columns {
                let sample = (0..PIXELS_PER_CELL)
                    .filter_map(|dy| painted(column, row * PIXELS_PER_CELL + dy))
                    .max_by(|a, b| a.1.total_cmp(&b.1));

                self.cells[row * self.columns + column] = match sample {
                    Some((color, z)) => {
                        let t = if span > 0.0 { (z - farthest) / span } else { 1.0 };
                        let index = (t * (DEPTH_RAMP.len() - 1) as f64).round() as usize;
                        Cell {
                            glyph: DEPTH_RAMP[index.min(DEPTH_RAMP.len() - 1)],
                            color: Some(color),
                        }
                    }
                    None => Cell::EMPTY,
                };
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in self.cells.chunks(self.columns.max(1)) {
            for cell in row {
                match cell.color {
                    // Black strokes use the terminal's own foreground.
                    Some(Color { r: 0, g: 0, b: 0 }) | None => writer.queue(ResetColor)?,
                    Some(Color { r, g, b }) => writer.queue(SetForegroundColor(TermColor::Rgb { r, g, b }))?,
                };
                writer.queue(Print(cell.glyph))?;
            }
            writer.queue(Print("\r\n"))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}
