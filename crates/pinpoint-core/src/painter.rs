//! Drawing interface used by tools and the canvas.
//!
//! The core never rasterizes. Everything it draws goes through [`Painter`],
//! which a backend implements on top of its own renderer.

use kurbo::{Affine, BezPath, PathEl, Point, Rect, Vec2};
use peniko::Color;

use crate::geom::Arc;

/// Which parts of the current path to paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathMode {
    StrokedOnly,
    StrokedAndFilled,
    FilledOnly,
}

/// A stateful path painter.
///
/// `push`/`pop` save and restore the graphics state (transform, colours,
/// pen, dash). Path construction uses coordinates in the current transform.
pub trait Painter {
    fn push(&mut self);
    fn pop(&mut self);
    /// Prepend `m` to the current transform.
    fn transform(&mut self, m: Affine);
    fn set_stroke(&mut self, color: Color);
    fn set_fill(&mut self, color: Color);
    fn set_pen(&mut self, width: f64);
    fn set_dash(&mut self, dashes: &[f64]);
    fn new_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn curve_to(&mut self, p1: Point, p2: Point, p3: Point);
    fn close_path(&mut self);
    fn draw_path(&mut self, mode: PathMode);

    fn translate(&mut self, v: Vec2) {
        self.transform(Affine::translate(v));
    }

    /// Add a closed rectangle to the current path.
    fn rect(&mut self, r: Rect) {
        self.move_to(Point::new(r.x0, r.y0));
        self.line_to(Point::new(r.x1, r.y0));
        self.line_to(Point::new(r.x1, r.y1));
        self.line_to(Point::new(r.x0, r.y1));
        self.close_path();
    }

    /// Add a closed circle to the current path.
    fn circle(&mut self, center: Point, radius: f64) {
        let m = Affine::translate(center.to_vec2()) * Affine::scale(radius);
        let pieces = Arc::ellipse(m).beziers();
        if let Some(first) = pieces.first() {
            self.move_to(first.p0);
        }
        for b in &pieces {
            self.curve_to(b.p1, b.p2, b.p3);
        }
        self.close_path();
    }

    /// Add every element of `path` to the current path.
    fn add_bez_path(&mut self, path: &BezPath) {
        let mut last = Point::ZERO;
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    self.move_to(p);
                    last = p;
                }
                PathEl::LineTo(p) => {
                    self.line_to(p);
                    last = p;
                }
                PathEl::QuadTo(q, p) => {
                    // Degree elevation.
                    let c1 = last + (q - last) * (2.0 / 3.0);
                    let c2 = p + (q - p) * (2.0 / 3.0);
                    self.curve_to(c1, c2, p);
                    last = p;
                }
                PathEl::CurveTo(p1, p2, p) => {
                    self.curve_to(p1, p2, p);
                    last = p;
                }
                PathEl::ClosePath => self.close_path(),
            }
        }
    }
}
