use std::fmt;

use kurbo::{Affine, Point, Rect};
use peniko::Color;

use super::{DrawContext, ToolContext, ToolDelegate, ToolFlow};
use crate::geom::Closest;
use crate::input::{Modifiers, MouseButton};
use crate::painter::{PathMode, Painter};
use crate::shape::Shape;

/// What a mark on a shape being drawn stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Vertex,
    SplineCp,
    Center,
    Radius,
    Minor,
    Current,
    Scissor,
}

/// A point highlighted while a shape is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    pub pos: Point,
    pub kind: MarkKind,
}

/// Which of the two shapes [`ShapeModel::set_shape`] replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeSlot {
    Primary,
    /// Construction lines, drawn thin and green.
    Auxiliary,
}

/// Everything a shape tool draws and snaps to.
#[derive(Debug, Clone)]
pub struct ShapeModel {
    shape: Shape,
    aux_shape: Shape,
    pen: f64,
    color: Color,
    marks: Vec<Mark>,
    snap: bool,
    skip_last: bool,
}

impl Default for ShapeModel {
    fn default() -> Self {
        Self {
            shape: Shape::new(),
            aux_shape: Shape::new(),
            pen: 1.0,
            color: Color::from_rgba8(0, 0, 0, 255),
            marks: Vec::new(),
            snap: false,
            skip_last: false,
        }
    }
}

impl ShapeModel {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn aux_shape(&self) -> &Shape {
        &self.aux_shape
    }

    pub fn pen(&self) -> f64 {
        self.pen
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Replace one of the shapes. `pen` only applies to the primary one.
    pub fn set_shape(&mut self, shape: Shape, slot: ShapeSlot, pen: f64) {
        match slot {
            ShapeSlot::Primary => {
                self.shape = shape;
                self.pen = pen;
            }
            ShapeSlot::Auxiliary => self.aux_shape = shape,
        }
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Let the canvas snap to the primary shape. With `skip_last` the end
    /// of an open curve, which usually follows the mouse, is left out.
    pub fn set_snapping(&mut self, snap: bool, skip_last: bool) {
        self.snap = snap;
        self.skip_last = skip_last;
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }

    pub fn add_mark(&mut self, pos: Point, kind: MarkKind) {
        self.marks.push(Mark { pos, kind });
    }

    pub fn snap_vtx(&self, mouse: Point, best: &mut Closest, ctl: bool) {
        if !self.snap {
            return;
        }
        if self.skip_last && self.shape.snap_vtx_skipping_last(mouse, best, ctl) {
            return;
        }
        self.shape.snap_vtx(mouse, Affine::IDENTITY, best, ctl);
    }

    fn draw(&self, painter: &mut dyn Painter, zoom: f64) {
        painter.set_pen(self.pen);
        painter.set_stroke(self.color);
        painter.new_path();
        painter.add_bez_path(&self.shape.to_bez_path(Affine::IDENTITY));
        painter.draw_path(PathMode::StrokedOnly);

        painter.set_stroke(Color::from_rgba8(0, 255, 0, 255));
        painter.set_pen(1.0);
        painter.new_path();
        painter.add_bez_path(&self.aux_shape.to_bez_path(Affine::IDENTITY));
        painter.draw_path(PathMode::StrokedOnly);

        let z = 1.0 / zoom;
        for mark in &self.marks {
            draw_mark(painter, mark, z);
        }
    }
}

/// Glyphs keep their pixel size whatever the zoom: `z` is one pixel.
fn draw_mark(painter: &mut dyn Painter, mark: &Mark, z: f64) {
    match mark.kind {
        MarkKind::Vertex => painter.set_fill(Color::from_rgba8(255, 0, 255, 255)),
        MarkKind::Center | MarkKind::Radius => painter.set_fill(Color::from_rgba8(0, 0, 255, 255)),
        MarkKind::SplineCp => painter.set_fill(Color::from_rgba8(0, 0, 204, 255)),
        MarkKind::Minor => painter.set_fill(Color::from_rgba8(0, 204, 0, 255)),
        MarkKind::Current => painter.set_stroke(Color::from_rgba8(255, 0, 0, 255)),
        MarkKind::Scissor => painter.set_fill(Color::from_rgba8(255, 0, 0, 255)),
    }
    let p = mark.pos;
    painter.new_path();
    match mark.kind {
        MarkKind::Vertex | MarkKind::Center => {
            painter.circle(p, 6.0 * z);
            painter.draw_path(PathMode::FilledOnly);
        }
        MarkKind::Current => {
            painter.circle(p, 9.0 * z);
            painter.draw_path(PathMode::StrokedOnly);
        }
        MarkKind::SplineCp | MarkKind::Radius | MarkKind::Minor => {
            let d = 4.0 * z;
            painter.rect(Rect::new(p.x - d, p.y - d, p.x + d, p.y + d));
            painter.draw_path(PathMode::FilledOnly);
        }
        MarkKind::Scissor => {
            let d = 5.0 * z;
            painter.move_to(Point::new(p.x + d, p.y));
            painter.line_to(Point::new(p.x, p.y + d));
            painter.line_to(Point::new(p.x - d, p.y));
            painter.line_to(Point::new(p.x, p.y - d));
            painter.close_path();
            painter.draw_path(PathMode::FilledOnly);
        }
    }
}

/// A tool that draws a new shape, driven by a host delegate.
pub struct ShapeTool {
    model: ShapeModel,
    delegate: Box<dyn ToolDelegate<ShapeModel>>,
}

impl fmt::Debug for ShapeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeTool").field("model", &self.model).finish_non_exhaustive()
    }
}

impl ShapeTool {
    pub fn new(delegate: impl ToolDelegate<ShapeModel> + 'static) -> Self {
        Self {
            model: ShapeModel::default(),
            delegate: Box::new(delegate),
        }
    }

    pub fn model(&self) -> &ShapeModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ShapeModel {
        &mut self.model
    }

    pub(super) fn draw(&self, painter: &mut dyn Painter, ctx: &DrawContext<'_>) {
        self.model.draw(painter, ctx.zoom);
    }

    pub(super) fn mouse_button(
        &mut self,
        ctx: &mut ToolContext<'_>,
        button: MouseButton,
        modifiers: Modifiers,
        press: bool,
    ) -> ToolFlow {
        self.delegate
            .mouse_button(&mut self.model, ctx, button, modifiers, press)
    }

    pub(super) fn mouse_move(&mut self, ctx: &mut ToolContext<'_>) -> ToolFlow {
        self.delegate.mouse_move(&mut self.model, ctx)
    }

    pub(super) fn key(&mut self, ctx: &mut ToolContext<'_>, text: &str, modifiers: Modifiers) -> Option<ToolFlow> {
        self.delegate.key(&mut self.model, ctx, text, modifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_polyline() -> Shape {
        Shape::polyline(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
            false,
        )
    }

    #[test]
    fn test_snapping_is_off_by_default() {
        let mut model = ShapeModel::default();
        model.set_shape(open_polyline(), ShapeSlot::Primary, 2.0);
        let mouse = Point::new(9.0, 1.0);
        let mut best = Closest::new(mouse, 5.0);
        model.snap_vtx(mouse, &mut best, false);
        assert_eq!(best.bound, 5.0);
    }

    #[test]
    fn test_skip_last_vertex() {
        let mut model = ShapeModel::default();
        model.set_shape(open_polyline(), ShapeSlot::Primary, 2.0);
        model.set_snapping(true, true);

        let near_last = Point::new(10.0, 9.0);
        let mut best = Closest::new(near_last, 3.0);
        model.snap_vtx(near_last, &mut best, false);
        assert_eq!(best.bound, 3.0);

        let near_first = Point::new(1.0, 0.0);
        let mut best = Closest::new(near_first, 3.0);
        model.snap_vtx(near_first, &mut best, false);
        assert_eq!(best.pos, Point::new(0.0, 0.0));

        model.set_snapping(true, false);
        let mut best = Closest::new(near_last, 3.0);
        model.snap_vtx(near_last, &mut best, false);
        assert_eq!(best.pos, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_set_shape_slots() {
        let mut model = ShapeModel::default();
        model.set_shape(open_polyline(), ShapeSlot::Auxiliary, 5.0);
        assert!(model.shape().is_empty());
        assert!(!model.aux_shape().is_empty());
        assert_eq!(model.pen(), 1.0);
        model.set_shape(open_polyline(), ShapeSlot::Primary, 5.0);
        assert_eq!(model.pen(), 5.0);
    }

    #[test]
    fn test_marks() {
        let mut model = ShapeModel::default();
        model.add_mark(Point::new(1.0, 2.0), MarkKind::Vertex);
        model.add_mark(Point::new(3.0, 4.0), MarkKind::Current);
        assert_eq!(model.marks().len(), 2);
        assert_eq!(model.marks()[1].kind, MarkKind::Current);
        model.clear_marks();
        assert!(model.marks().is_empty());
    }
}
