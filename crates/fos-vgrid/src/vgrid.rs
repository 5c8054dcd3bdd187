//! VGrid: per-cell curve incidence and midpoint inside/outside flags
//!
//! A `width × height` grid is laid over `[0, glyph_w] × [0, glyph_h]`.
//! Cells are stored row-major with the origin at the bottom-left.

use std::collections::BTreeSet;

use crate::geometry::{Bezier2, Vec2};

/// Grid laid over one glyph
#[derive(Debug, Clone, PartialEq)]
pub struct VGrid {
    /// Indices of the curves passing through each cell (ascending)
    pub cell_beziers: Vec<BTreeSet<usize>>,
    /// Whether each cell's midpoint is inside the glyph
    pub cell_mids: Vec<bool>,
    pub width: usize,
    pub height: usize,
}

impl VGrid {
    /// Build the grid for clockwise `curves` of a glyph of size `glyph_size`
    pub fn new(curves: &[Bezier2], glyph_size: Vec2, width: usize, height: usize) -> Self {
        Self {
            cell_beziers: find_cell_intersections(curves, glyph_size, width, height),
            cell_mids: find_cell_mids_inside(curves, glyph_size, width, height),
            width,
            height,
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Curves through cell `(x, y)`
    pub fn curves_at(&self, x: usize, y: usize) -> &BTreeSet<usize> {
        &self.cell_beziers[self.index(x, y)]
    }

    /// Whether the midpoint of cell `(x, y)` is inside the glyph
    pub fn mid_inside(&self, x: usize, y: usize) -> bool {
        self.cell_mids[self.index(x, y)]
    }

    /// Largest number of curves in any one cell
    pub fn max_curves_per_cell(&self) -> usize {
        self.cell_beziers.iter().map(BTreeSet::len).max().unwrap_or(0)
    }
}

/// Grid index of a coordinate, clamped into `0..cells`
#[inline]
fn cell_of(value: f32, cells: usize, extent: f32) -> usize {
    let i = (value * cells as f32 / extent).floor();
    clamp_cell(i as i64, cells)
}

#[inline]
fn clamp_cell(i: i64, cells: usize) -> usize {
    i.clamp(0, cells as i64 - 1) as usize
}

/// For every cell, the curves crossing its borders (or contained in it)
fn find_cell_intersections(
    curves: &[Bezier2],
    glyph_size: Vec2,
    width: usize,
    height: usize,
) -> Vec<BTreeSet<usize>> {
    let mut cells = vec![BTreeSet::new(); width * height];
    if width == 0 || height == 0 {
        return cells;
    }

    for (i, curve) in curves.iter().enumerate() {
        let mut any_intersection = false;

        // Vertical grid lines, edges included: mark the cells left and right
        for k in 0..=width {
            let x_line = k as f32 * glyph_size.w() / width as f32;
            for &y in &curve.intersect_vert(x_line) {
                let col = clamp_cell(k as i64, width);
                let row = cell_of(y, height, glyph_size.h());
                cells[row * width + col].insert(i);
                cells[row * width + col.saturating_sub(1)].insert(i);
                any_intersection = true;
            }
        }

        // Horizontal grid lines, edges included: mark the cells above and below
        for k in 0..=height {
            let y_line = k as f32 * glyph_size.h() / height as f32;
            for &x in &curve.intersect_horz(y_line) {
                let row = clamp_cell(k as i64, height);
                let col = cell_of(x, width, glyph_size.w());
                cells[row * width + col].insert(i);
                cells[row.saturating_sub(1) * width + col].insert(i);
                any_intersection = true;
            }
        }

        // Fully contained in a single cell
        if !any_intersection {
            let col = cell_of(curve.e0.x, width, glyph_size.w());
            let row = cell_of(curve.e0.y, height, glyph_size.h());
            cells[row * width + col].insert(i);
        }
    }

    cells
}

/// For every cell, whether its midpoint is inside the glyph.
///
/// Each row casts a ray along its horizontal midline; crossings are merged
/// (exact duplicates collapse) and walked with the even-odd rule. Rows of
/// malformed outlines with an odd crossing count get a defined but
/// possibly wrong answer.
fn find_cell_mids_inside(
    curves: &[Bezier2],
    glyph_size: Vec2,
    width: usize,
    height: usize,
) -> Vec<bool> {
    let mut mids = vec![false; width * height];
    if width == 0 || height == 0 {
        return mids;
    }

    let mut crossings: Vec<f32> = Vec::new();
    for y in 0..height {
        let y_mid = (y as f32 + 0.5) * glyph_size.h() / height as f32;

        crossings.clear();
        for curve in curves {
            crossings.extend(
                curve
                    .intersect_horz(y_mid)
                    .iter()
                    .map(|&x| x * width as f32 / glyph_size.w()),
            );
        }
        crossings.sort_by(f32::total_cmp);
        crossings.dedup();

        let mut inside = false;
        let mut start = 0.0f32;
        for &end in &crossings {
            if inside {
                let first = (start.round() as i64).clamp(0, width as i64) as usize;
                let last = (end.round() as i64).clamp(0, width as i64) as usize;
                for x in first..last {
                    mids[y * width + x] = true;
                }
            }
            inside = !inside;
            start = end;
        }
    }

    mids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Bezier2> {
        // Clockwise: up the left side, across the top, down the right side
        vec![
            Bezier2::line(v(x0, y0), v(x0, y1)),
            Bezier2::line(v(x0, y1), v(x1, y1)),
            Bezier2::line(v(x1, y1), v(x1, y0)),
            Bezier2::line(v(x1, y0), v(x0, y0)),
        ]
    }

    #[test]
    fn test_single_vertical_line() {
        let curves = vec![Bezier2::line(v(0.0, 0.0), v(0.0, 100.0))];
        let grid = VGrid::new(&curves, v(100.0, 100.0), 4, 4);
        for y in 0..4 {
            assert_eq!(grid.curves_at(0, y).iter().copied().collect::<Vec<_>>(), vec![0]);
            for x in 1..4 {
                assert!(grid.curves_at(x, y).is_empty(), "cell ({x}, {y})");
            }
        }
        assert!(grid.cell_mids.iter().all(|&m| !m));
    }

    #[test]
    fn test_triangle() {
        let curves = vec![
            Bezier2::line(v(0.0, 0.0), v(100.0, 0.0)),
            Bezier2::line(v(100.0, 0.0), v(0.0, 100.0)),
            Bezier2::line(v(0.0, 100.0), v(0.0, 0.0)),
        ];
        let grid = VGrid::new(&curves, v(100.0, 100.0), 2, 2);
        assert_eq!(
            grid.curves_at(0, 0).iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(grid.mid_inside(0, 0));
        // The hypotenuse passes through the centre corner of the grid
        assert!(grid.curves_at(1, 1).iter().all(|&i| i == 1));
        assert!(!grid.mid_inside(1, 1));
    }

    #[test]
    fn test_rectangle_row_parity() {
        let curves = rect(10.0, 10.0, 90.0, 90.0);
        let grid = VGrid::new(&curves, v(100.0, 100.0), 10, 10);
        for x in 0..10 {
            assert_eq!(grid.mid_inside(x, 5), (1..9).contains(&x), "cell ({x}, 5)");
        }
        // Rows outside the rectangle
        for x in 0..10 {
            assert!(!grid.mid_inside(x, 0));
            assert!(!grid.mid_inside(x, 9));
        }
    }

    #[test]
    fn test_rectangle_with_hole() {
        let mut curves = rect(0.0, 0.0, 100.0, 100.0);
        // Hole, counterclockwise
        curves.extend(rect(30.0, 30.0, 70.0, 70.0).into_iter().map(Bezier2::reversed));
        let grid = VGrid::new(&curves, v(100.0, 100.0), 10, 10);
        assert!(grid.mid_inside(1, 1));
        assert!(grid.mid_inside(2, 5));
        assert!(!grid.mid_inside(5, 5));
        assert!(!grid.mid_inside(3, 4));
        assert!(grid.mid_inside(7, 4));
    }

    #[test]
    fn test_contained_curve_falls_back_to_start_cell() {
        let curves = vec![Bezier2::new(v(0.0, 1.0), v(1.0, 2.0), v(2.0, 1.0))];
        let grid = VGrid::new(&curves, v(100.0, 100.0), 4, 4);
        assert!(grid.curves_at(0, 0).contains(&0));
        let total: usize = grid.cell_beziers.iter().map(BTreeSet::len).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_cells_iterate_ascending() {
        let curves = rect(0.0, 0.0, 100.0, 100.0);
        let grid = VGrid::new(&curves, v(100.0, 100.0), 3, 3);
        for cell in &grid.cell_beziers {
            let v: Vec<_> = cell.iter().copied().collect();
            let mut sorted = v.clone();
            sorted.sort_unstable();
            assert_eq!(v, sorted);
        }
        // Corner cells meet two sides
        assert_eq!(grid.curves_at(0, 0).len(), 2);
        assert_eq!(grid.max_curves_per_cell(), 2);
    }
}
