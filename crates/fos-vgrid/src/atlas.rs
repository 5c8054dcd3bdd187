//! Atlas groups: glyph-data buffer + grid atlas
//!
//! Each group pairs a 1-D glyph-data buffer (a texture buffer of RGBA8
//! pixels, two little-endian `u16` per pixel) with a 2-D grid atlas (RGBA8,
//! row-major). The byte layout is read verbatim by the glyph shader.

use std::collections::BTreeSet;

use crate::geometry::{Bezier2, Vec2};
use crate::vgrid::VGrid;

/// Side of the square atlas slot reserved for one glyph's grid
pub const GRID_MAX_SIZE: u16 = 20;
/// Side of the grid atlas texture
pub const GRID_ATLAS_SIZE: u16 = 256;
/// Side of the (square) glyph-data buffer, in pixels
pub const BEZIER_ATLAS_SIZE: u16 = 256;
/// Bytes per pixel in both buffers
pub const ATLAS_CHANNELS: usize = 4;

/// Capacity of the glyph-data buffer, in pixels
pub const GLYPH_DATA_PIXELS: u32 = BEZIER_ATLAS_SIZE as u32 * BEZIER_ATLAS_SIZE as u32;

/// Curves stored per grid cell
pub const CELL_CAPACITY: usize = 4;

/// Bias applied to curve indices stored in cells (0 and 1 are reserved)
const INDEX_BIAS: usize = 2;
/// Cell byte marking an empty cell whose midpoint is inside
const SORT_META: u8 = 1;
/// Largest curve index a cell byte can address
pub const MAX_CELL_INDEX: usize = u8::MAX as usize - INDEX_BIAS;

/// Pixels used by a glyph record with `curve_count` curves
pub fn record_pixels(curve_count: usize) -> u64 {
    2 + 3 * curve_count as u64
}

/// Scale a coordinate from `[0, dim]` to `[0, 65535]`
fn normalize(value: f32, dim: f32) -> u16 {
    if dim <= 0.0 {
        return 0;
    }
    (value * u16::MAX as f32 / dim).round().clamp(0.0, u16::MAX as f32) as u16
}

/// Encode one grid cell.
///
/// Stores up to four curve indices (ascending, `+2` bias) and carries the
/// mid-inside flag in their order:
///
/// | curves | mid inside        | mid outside       |
/// |--------|-------------------|-------------------|
/// | 0      | `[1, 0, 0, 0]`    | `[0, 0, 0, 0]`    |
/// | 1      | `[i, 0, 0, 0]`    | `[0, i, 0, 0]`    |
/// | ≥ 2    | `b0, b1` swapped  | ascending         |
///
/// so that `b0 > b1` iff the midpoint is inside whenever `b0`/`b1` are set.
pub fn encode_cell(curves: &BTreeSet<usize>, mid_inside: bool) -> [u8; 4] {
    let mut bytes = [0u8; CELL_CAPACITY];

    let addressable = curves.iter().filter(|&&i| i <= MAX_CELL_INDEX);
    let mut count = 0;
    for (slot, &index) in bytes.iter_mut().zip(addressable) {
        *slot = (index + INDEX_BIAS) as u8;
        count += 1;
    }

    match (mid_inside, count) {
        (true, 0) => bytes[0] = SORT_META,
        (true, 1) => {}
        (true, _) => bytes.swap(0, 1),
        (false, 1) => {
            bytes[1] = bytes[0];
            bytes[0] = 0;
        }
        (false, _) => {}
    }
    bytes
}

/// Curve indices stored in an encoded cell, ascending
pub fn decode_cell(bytes: [u8; 4]) -> Vec<usize> {
    let mut indices: Vec<usize> = bytes
        .iter()
        .filter(|&&b| b as usize >= INDEX_BIAS)
        .map(|&b| b as usize - INDEX_BIAS)
        .collect();
    indices.sort_unstable();
    indices
}

/// Mid-inside flag of an encoded cell, as the shader reads it
pub fn cell_mid_inside(bytes: [u8; 4]) -> bool {
    bytes[0] > bytes[1]
}

/// Where a glyph landed inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Offset of the glyph record in the glyph-data buffer, in pixels
    pub data_offset: u32,
    pub grid_x: u16,
    pub grid_y: u16,
}

/// One grid-atlas texture paired with one glyph-data buffer
#[derive(Clone)]
pub struct AtlasGroup {
    /// Glyph records, `BEZIER_ATLAS_SIZE² × 4` bytes
    pub glyph_data: Vec<u8>,
    /// Cell bytes, `GRID_ATLAS_SIZE² × 4` bytes, origin top-left
    pub grid_atlas: Vec<u8>,
    /// Next free pixel in `glyph_data`
    pub next_data_offset: u32,
    /// Next free slot origin in `grid_atlas`
    pub next_grid_pos: (u16, u16),
    /// No further glyphs are placed here once set
    pub full: bool,
    /// Contents have been copied to the GPU since the last write
    pub uploaded: bool,
    /// Glyphs stored in this group
    pub glyph_count: usize,
}

impl std::fmt::Debug for AtlasGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasGroup")
            .field("next_data_offset", &self.next_data_offset)
            .field("next_grid_pos", &self.next_grid_pos)
            .field("full", &self.full)
            .field("uploaded", &self.uploaded)
            .field("glyph_count", &self.glyph_count)
            .finish()
    }
}

impl Default for AtlasGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasGroup {
    /// Create an empty group with zeroed buffers
    pub fn new() -> Self {
        let grid_side = GRID_ATLAS_SIZE as usize;
        Self {
            glyph_data: vec![0; GLYPH_DATA_PIXELS as usize * ATLAS_CHANNELS],
            grid_atlas: vec![0; grid_side * grid_side * ATLAS_CHANNELS],
            next_data_offset: 0,
            next_grid_pos: (0, 0),
            full: false,
            uploaded: false,
            glyph_count: 0,
        }
    }

    /// Reserve room for a glyph with `curve_count` curves.
    ///
    /// Returns `None` and latches `full` when either the data buffer or the
    /// grid atlas has no room left.
    pub fn reserve(&mut self, curve_count: usize) -> Option<Slot> {
        if self.full {
            return None;
        }
        let pixels = record_pixels(curve_count);
        if self.next_data_offset as u64 + pixels > GLYPH_DATA_PIXELS as u64 {
            self.full = true;
            return None;
        }
        let (gx, gy) = self.next_grid_pos;
        if gy + GRID_MAX_SIZE > GRID_ATLAS_SIZE {
            self.full = true;
            return None;
        }

        let slot = Slot {
            data_offset: self.next_data_offset,
            grid_x: gx,
            grid_y: gy,
        };

        self.next_data_offset += pixels as u32;
        self.advance_grid_cursor();
        Some(slot)
    }

    fn advance_grid_cursor(&mut self) {
        let (mut gx, mut gy) = self.next_grid_pos;
        gx += GRID_MAX_SIZE;
        if gx + GRID_MAX_SIZE > GRID_ATLAS_SIZE {
            gx = 0;
            gy += GRID_MAX_SIZE;
        }
        if gy + GRID_MAX_SIZE > GRID_ATLAS_SIZE {
            self.full = true;
        }
        self.next_grid_pos = (gx, gy);
    }

    /// Write a glyph's record and grid cells into `slot`
    pub fn write_glyph(&mut self, slot: Slot, curves: &[Bezier2], glyph_size: Vec2, grid: &VGrid) {
        self.write_glyph_data(slot, curves, glyph_size, grid.width as u16, grid.height as u16);
        self.write_vgrid(grid, slot.grid_x, slot.grid_y);
        self.glyph_count += 1;
        self.uploaded = false;
    }

    fn write_pixel(&mut self, pixel: usize, lo: u16, hi: u16) {
        let at = pixel * ATLAS_CHANNELS;
        self.glyph_data[at..at + 2].copy_from_slice(&lo.to_le_bytes());
        self.glyph_data[at + 2..at + 4].copy_from_slice(&hi.to_le_bytes());
    }

    fn read_pixel(&self, pixel: usize) -> (u16, u16) {
        let at = pixel * ATLAS_CHANNELS;
        let d = &self.glyph_data[at..at + 4];
        (
            u16::from_le_bytes([d[0], d[1]]),
            u16::from_le_bytes([d[2], d[3]]),
        )
    }

    /// Header `[grid_x, grid_y, grid_w, grid_h]`, then `(e0, c, e1)` per curve
    fn write_glyph_data(
        &mut self,
        slot: Slot,
        curves: &[Bezier2],
        glyph_size: Vec2,
        grid_w: u16,
        grid_h: u16,
    ) {
        let base = slot.data_offset as usize;
        self.write_pixel(base, slot.grid_x, slot.grid_y);
        self.write_pixel(base + 1, grid_w, grid_h);

        let (w, h) = (glyph_size.w(), glyph_size.h());
        for (i, curve) in curves.iter().enumerate() {
            let pixel = base + 2 + i * 3;
            for (j, p) in [curve.e0, curve.c, curve.e1].into_iter().enumerate() {
                self.write_pixel(pixel + j, normalize(p.x, w), normalize(p.y, h));
            }
        }
    }

    fn write_vgrid(&mut self, grid: &VGrid, at_x: u16, at_y: u16) {
        let mut overflowing = 0usize;
        let mut unaddressable = 0usize;

        for y in 0..grid.height {
            for x in 0..grid.width {
                let curves = grid.curves_at(x, y);
                if curves.len() > CELL_CAPACITY {
                    overflowing += 1;
                }
                if curves.iter().any(|&i| i > MAX_CELL_INDEX) {
                    unaddressable += 1;
                }

                let bytes = encode_cell(curves, grid.mid_inside(x, y));
                let dst = self.cell_offset(at_x as usize + x, at_y as usize + y);
                self.grid_atlas[dst..dst + ATLAS_CHANNELS].copy_from_slice(&bytes);
            }
        }

        if overflowing > 0 {
            tracing::warn!(
                "{} grid cells hold more than {} curves; extra curves dropped",
                overflowing,
                CELL_CAPACITY
            );
        }
        if unaddressable > 0 {
            tracing::warn!(
                "{} grid cells reference curves past index {}; those curves are skipped",
                unaddressable,
                MAX_CELL_INDEX
            );
        }
    }

    #[inline]
    fn cell_offset(&self, x: usize, y: usize) -> usize {
        (y * GRID_ATLAS_SIZE as usize + x) * ATLAS_CHANNELS
    }

    /// Header of the record at `data_offset`: `(grid_x, grid_y, grid_w, grid_h)`
    pub fn glyph_header(&self, data_offset: u32) -> (u16, u16, u16, u16) {
        let (gx, gy) = self.read_pixel(data_offset as usize);
        let (gw, gh) = self.read_pixel(data_offset as usize + 1);
        (gx, gy, gw, gh)
    }

    /// Normalized curve `index` of the record at `data_offset`:
    /// `[e0.x, e0.y, c.x, c.y, e1.x, e1.y]`
    pub fn glyph_curve(&self, data_offset: u32, index: usize) -> [u16; 6] {
        let base = data_offset as usize + 2 + index * 3;
        let (a, b) = self.read_pixel(base);
        let (c, d) = self.read_pixel(base + 1);
        let (e, f) = self.read_pixel(base + 2);
        [a, b, c, d, e, f]
    }

    /// Bytes of the grid-atlas cell at absolute texel `(x, y)`
    pub fn cell(&self, x: u16, y: u16) -> [u8; 4] {
        let at = self.cell_offset(x as usize, y as usize);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.grid_atlas[at..at + ATLAS_CHANNELS]);
        bytes
    }

    /// Pixels of the glyph-data buffer in use
    pub fn used_data_pixels(&self) -> u32 {
        self.next_data_offset
    }
}
