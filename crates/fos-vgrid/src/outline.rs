//! Glyph outlines and their decomposition into quadratic Béziers

use crate::cubic::{cubic_to_quads, Cubic};
use crate::geometry::{Bezier2, Vec2};
use crate::{Result, TextError};

/// Outline command, in font units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    /// Quadratic (conic) segment: control, end
    QuadTo(Vec2, Vec2),
    /// Cubic segment: first control, second control, end
    CurveTo(Vec2, Vec2, Vec2),
    Close,
}

/// Fill direction of an outline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Filled area on the right of the path (clockwise exterior, TrueType)
    FillRight,
    /// Filled area on the left of the path (counterclockwise exterior, PostScript)
    FillLeft,
    /// Zero area, direction undefined
    None,
}

/// Axis-aligned box in font units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    fn include(&mut self, p: Vec2) {
        self.x_min = self.x_min.min(p.x);
        self.y_min = self.y_min.min(p.y);
        self.x_max = self.x_max.max(p.x);
        self.y_max = self.y_max.max(p.y);
    }
}

/// A complete glyph outline, as delivered by the font engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub commands: Vec<OutlineCommand>,
}

impl Outline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: Vec<OutlineCommand>) -> Self {
        Self { commands }
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.commands.push(OutlineCommand::MoveTo(Vec2::new(x, y)));
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.commands.push(OutlineCommand::LineTo(Vec2::new(x, y)));
        self
    }

    pub fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) -> &mut Self {
        self.commands
            .push(OutlineCommand::QuadTo(Vec2::new(x1, y1), Vec2::new(x, y)));
        self
    }

    pub fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) -> &mut Self {
        self.commands.push(OutlineCommand::CurveTo(
            Vec2::new(x1, y1),
            Vec2::new(x2, y2),
            Vec2::new(x, y),
        ));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.commands.push(OutlineCommand::Close);
        self
    }

    /// Every point of the outline (on-curve and control), in order
    fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.commands.iter().flat_map(|cmd| {
            let pts: [Option<Vec2>; 3] = match *cmd {
                OutlineCommand::MoveTo(p) | OutlineCommand::LineTo(p) => [Some(p), None, None],
                OutlineCommand::QuadTo(c, p) => [Some(c), Some(p), None],
                OutlineCommand::CurveTo(c1, c2, p) => [Some(c1), Some(c2), Some(p)],
                OutlineCommand::Close => [None, None, None],
            };
            pts.into_iter().flatten()
        })
    }

    /// Number of points (on-curve and control)
    pub fn point_count(&self) -> usize {
        self.points().count()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    /// Control box: bounds of every point, control points included
    pub fn cbox(&self) -> Option<BBox> {
        let mut points = self.points();
        let first = points.next()?;
        let mut bbox = BBox {
            x_min: first.x,
            y_min: first.y,
            x_max: first.x,
            y_max: first.y,
        };
        for p in points {
            bbox.include(p);
        }
        Some(bbox)
    }

    /// Fill direction, from the signed area of the control polygons of all
    /// contours (positive area is counterclockwise, i.e. fill-left)
    pub fn orientation(&self) -> Orientation {
        let mut area = 0.0f64;
        let mut contour: Vec<Vec2> = Vec::new();

        for cmd in &self.commands {
            match *cmd {
                OutlineCommand::MoveTo(p) => {
                    add_contour_area(&mut contour, &mut area);
                    contour.push(p);
                }
                OutlineCommand::LineTo(p) => contour.push(p),
                OutlineCommand::QuadTo(c, p) => contour.extend([c, p]),
                OutlineCommand::CurveTo(c1, c2, p) => contour.extend([c1, c2, p]),
                OutlineCommand::Close => add_contour_area(&mut contour, &mut area),
            }
        }
        add_contour_area(&mut contour, &mut area);

        if area > 0.0 {
            Orientation::FillLeft
        } else if area < 0.0 {
            Orientation::FillRight
        } else {
            Orientation::None
        }
    }

    /// Walk the outline, delivering each segment with its start point
    pub fn walk(&self, visitor: &mut impl OutlineVisitor) -> Result<()> {
        let mut current: Option<Vec2> = None;
        for (i, cmd) in self.commands.iter().enumerate() {
            match *cmd {
                OutlineCommand::MoveTo(p) => current = Some(p),
                OutlineCommand::LineTo(p) => {
                    visitor.line(current_point(current, i)?, p);
                    current = Some(p);
                }
                OutlineCommand::QuadTo(c, p) => {
                    visitor.quad(current_point(current, i)?, c, p);
                    current = Some(p);
                }
                OutlineCommand::CurveTo(c1, c2, p) => {
                    visitor.cubic(current_point(current, i)?, c1, c2, p);
                    current = Some(p);
                }
                OutlineCommand::Close => current = None,
            }
        }
        Ok(())
    }
}

fn current_point(current: Option<Vec2>, index: usize) -> Result<Vec2> {
    current.ok_or_else(|| {
        TextError::InvalidOutline(format!("segment without a current point at command {index}"))
    })
}

fn add_contour_area(contour: &mut Vec<Vec2>, area: &mut f64) {
    if let Some(&last) = contour.last() {
        let mut prev = last;
        for &p in contour.iter() {
            *area += prev.x as f64 * p.y as f64 - p.x as f64 * prev.y as f64;
            prev = p;
        }
    }
    contour.clear();
}

/// Receives the segments of an outline walk
pub trait OutlineVisitor {
    fn line(&mut self, from: Vec2, to: Vec2);
    fn quad(&mut self, from: Vec2, control: Vec2, to: Vec2);
    fn cubic(&mut self, from: Vec2, c1: Vec2, c2: Vec2, to: Vec2);
}

/// Collects quadratics, converting cubics at a fixed error bound
struct Decomposer {
    curves: Vec<Bezier2>,
    cubic_error_bound: f32,
}

impl OutlineVisitor for Decomposer {
    fn line(&mut self, from: Vec2, to: Vec2) {
        self.curves.push(Bezier2::line(from, to));
    }

    fn quad(&mut self, from: Vec2, control: Vec2, to: Vec2) {
        self.curves.push(Bezier2::new(from, control, to));
    }

    fn cubic(&mut self, from: Vec2, c1: Vec2, c2: Vec2, to: Vec2) {
        let cubic = Cubic::new(from, c1, c2, to);
        self.curves
            .extend(cubic_to_quads(&cubic, self.cubic_error_bound));
    }
}

/// Error bound for cubic conversion: `tolerance` of the average bbox side,
/// rounded, at least one font unit
pub fn cubic_error_bound(bbox: &BBox, tolerance: f32) -> f32 {
    (tolerance * (bbox.width() + bbox.height()) / 2.0).round().max(1.0)
}

/// Convert an outline into clockwise quadratic Béziers whose bounding box
/// starts at `(0, 0)`.
///
/// Lines become quadratics with `c == e0`; cubics are approximated with an
/// error bound of `cubic_tolerance` times the average control-box side.
/// A malformed outline yields an empty list.
pub fn decompose(outline: &Outline, cubic_tolerance: f32) -> Vec<Bezier2> {
    let Some(cbox) = outline.cbox() else {
        return Vec::new();
    };

    let mut decomposer = Decomposer {
        curves: Vec::with_capacity(outline.commands.len()),
        cubic_error_bound: cubic_error_bound(&cbox, cubic_tolerance),
    };
    if let Err(err) = outline.walk(&mut decomposer) {
        tracing::debug!("outline walk failed: {}", err);
        return Vec::new();
    }

    let origin = Vec2::new(cbox.x_min, cbox.y_min);
    let flip = outline.orientation() == Orientation::FillLeft;
    let mut curves = decomposer.curves;
    for curve in &mut curves {
        if origin != Vec2::ZERO {
            *curve = curve.translated(origin);
        }
        if flip {
            *curve = curve.reversed();
        }
    }
    curves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn test_single_line_contour() {
        let mut outline = Outline::new();
        outline.move_to(0.0, 0.0).line_to(0.0, 100.0).close();
        let curves = decompose(&outline, 0.05);
        assert_eq!(curves, vec![Bezier2::line(v(0.0, 0.0), v(0.0, 100.0))]);
    }

    #[test]
    fn test_translation_to_origin() {
        let mut outline = Outline::new();
        outline
            .move_to(10.0, 20.0)
            .line_to(10.0, 70.0)
            .line_to(60.0, 70.0)
            .line_to(10.0, 20.0)
            .close();
        let curves = decompose(&outline, 0.05);
        assert_eq!(curves.len(), 3);
        let min_x = curves.iter().map(|c| c.e0.x.min(c.e1.x)).fold(f32::MAX, f32::min);
        let min_y = curves.iter().map(|c| c.e0.y.min(c.e1.y)).fold(f32::MAX, f32::min);
        assert_eq!((min_x, min_y), (0.0, 0.0));
    }

    #[test]
    fn test_orientation() {
        let mut ccw = Outline::new();
        ccw.move_to(0.0, 0.0)
            .line_to(100.0, 0.0)
            .line_to(100.0, 100.0)
            .line_to(0.0, 100.0)
            .close();
        assert_eq!(ccw.orientation(), Orientation::FillLeft);

        let mut cw = Outline::new();
        cw.move_to(0.0, 0.0)
            .line_to(0.0, 100.0)
            .line_to(100.0, 100.0)
            .line_to(100.0, 0.0)
            .close();
        assert_eq!(cw.orientation(), Orientation::FillRight);

        let mut flat = Outline::new();
        flat.move_to(0.0, 0.0).line_to(0.0, 100.0).close();
        assert_eq!(flat.orientation(), Orientation::None);
    }

    #[test]
    fn test_counterclockwise_is_flipped() {
        let mut ccw = Outline::new();
        ccw.move_to(0.0, 0.0)
            .line_to(100.0, 0.0)
            .line_to(100.0, 100.0)
            .line_to(0.0, 0.0)
            .close();
        let curves = decompose(&ccw, 0.05);
        assert_eq!(curves[0].e0, v(100.0, 0.0));
        assert_eq!(curves[0].e1, v(0.0, 0.0));
        // Control of a flipped line stays at its old start
        assert_eq!(curves[0].c, v(0.0, 0.0));
    }

    #[test]
    fn test_quadratics_pass_through() {
        let mut outline = Outline::new();
        outline
            .move_to(0.0, 0.0)
            .line_to(0.0, 50.0)
            .quad_to(50.0, 100.0, 100.0, 50.0)
            .line_to(100.0, 0.0)
            .line_to(0.0, 0.0)
            .close();
        let direct = vec![
            Bezier2::line(v(0.0, 0.0), v(0.0, 50.0)),
            Bezier2::new(v(0.0, 50.0), v(50.0, 100.0), v(100.0, 50.0)),
            Bezier2::line(v(100.0, 50.0), v(100.0, 0.0)),
            Bezier2::line(v(100.0, 0.0), v(0.0, 0.0)),
        ];
        assert_eq!(outline.orientation(), Orientation::FillRight);
        assert_eq!(decompose(&outline, 0.05), direct);
    }

    #[test]
    fn test_cubic_is_approximated() {
        let mut outline = Outline::new();
        outline
            .move_to(0.0, 0.0)
            .curve_to(0.0, 500.0, 800.0, 700.0, 900.0, 0.0)
            .line_to(0.0, 0.0)
            .close();
        let curves = decompose(&outline, 0.05);
        assert!(curves.len() >= 2);
        assert!(curves.len() <= 1 + crate::cubic::MAX_QUADS);
        let last = curves.last().unwrap();
        // Closing line keeps its control on the start point
        assert_eq!(last.c, last.e0);
        assert_eq!(last.e0, v(900.0, 0.0));
    }

    #[test]
    fn test_error_bound() {
        let bbox = BBox { x_min: 0.0, y_min: 0.0, x_max: 1000.0, y_max: 600.0 };
        assert_eq!(cubic_error_bound(&bbox, 0.05), 40.0);
        let tiny = BBox { x_min: 0.0, y_min: 0.0, x_max: 4.0, y_max: 4.0 };
        assert_eq!(cubic_error_bound(&tiny, 0.05), 1.0);
    }

    #[test]
    fn test_malformed_outline_is_empty() {
        let outline = Outline::from_commands(vec![OutlineCommand::LineTo(v(10.0, 10.0))]);
        assert!(decompose(&outline, 0.05).is_empty());
        assert!(outline.walk(&mut Decomposer { curves: Vec::new(), cubic_error_bound: 1.0 }).is_err());
    }

    #[test]
    fn test_empty_outline() {
        assert!(decompose(&Outline::new(), 0.05).is_empty());
        assert!(Outline::new().cbox().is_none());
    }
}
