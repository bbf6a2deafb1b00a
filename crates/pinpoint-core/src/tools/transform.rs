use kurbo::{Affine, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DrawContext, ToolContext, ToolFlow, ToolReport};
use crate::canvas::Canvas;
use crate::geom;
use crate::page::{Page, Pinned};
use crate::painter::Painter;
use crate::snap::SnapConfig;

/// Stretch and shear matrices flatter than this are not applied.
const MIN_DETERMINANT: f64 = 0.0001;

/// Kinds of transformation a [`TransformTool`] drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    Translate,
    Rotate,
    Scale,
    Stretch,
    Shear,
}

/// Why a transform tool cannot be used on the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransformRejection {
    #[error("nothing is selected")]
    EmptySelection,
    #[error("the selection contains a fixed object")]
    FixedPin,
    #[error("pinned objects can only be translated")]
    Pinned,
    #[error("the mouse is too close to the shear axis")]
    DegenerateShearAxis,
    #[error("the mouse is on the transformation origin")]
    MouseAtOrigin,
}

/// Translates, rotates, scales, stretches or shears the selection.
///
/// The tool only previews: on release it reports the matrix and the host
/// applies it to the selected objects.
#[derive(Debug, Clone)]
pub struct TransformTool {
    kind: TransformKind,
    with_shift: bool,
    mouse_down: Point,
    origin: Point,
    /// Angle of the frame stretch and shear work in.
    dir: f64,
    only_horizontal: bool,
    only_vertical: bool,
    matrix: Affine,
    validity: Result<(), TransformRejection>,
}

impl TransformTool {
    /// Start transforming at the canvas' snapped mouse position.
    pub fn new(canvas: &Canvas, kind: TransformKind, with_shift: bool) -> Self {
        match canvas.page() {
            Some(page) => Self::with_page(page, canvas.snap(), canvas.pos(), kind, with_shift),
            None => {
                let mut tool = Self::blank(canvas.pos(), kind, with_shift);
                tool.validity = Err(TransformRejection::EmptySelection);
                tool
            }
        }
    }

    pub fn with_page(
        page: &Page,
        snap: &SnapConfig,
        mouse_down: Point,
        kind: TransformKind,
        with_shift: bool,
    ) -> Self {
        let mut tool = Self::blank(mouse_down, kind, with_shift);
        tool.validity = tool.setup(page, snap);
        if let Err(reason) = tool.validity {
            log::info!("{kind:?} rejected: {reason}");
        }
        tool
    }

    fn blank(mouse_down: Point, kind: TransformKind, with_shift: bool) -> Self {
        Self {
            kind,
            with_shift,
            mouse_down,
            origin: mouse_down,
            dir: 0.0,
            only_horizontal: false,
            only_vertical: false,
            matrix: Affine::IDENTITY,
            validity: Ok(()),
        }
    }

    fn setup(&mut self, page: &Page, snap: &SnapConfig) -> Result<(), TransformRejection> {
        let selected: Vec<usize> = page.selected().collect();
        if selected.is_empty() {
            return Err(TransformRejection::EmptySelection);
        }

        let pin = selected
            .iter()
            .fold(Pinned::None, |acc, &i| acc.union(page.object(i).pinned()));
        match pin {
            Pinned::None => {}
            Pinned::Fixed if self.kind != TransformKind::Translate => {
                return Err(TransformRejection::FixedPin);
            }
            _ if self.kind != TransformKind::Translate => return Err(TransformRejection::Pinned),
            pin => {
                // A vertical pin leaves only horizontal movement, and the
                // other way around. Fixed objects stay where they are.
                self.only_horizontal = pin != Pinned::Horizontal;
                self.only_vertical = pin != Pinned::Vertical;
                self.with_shift = false;
            }
        }

        if snap.with_axes {
            self.origin = snap.origin;
            self.dir = snap.dir;
        } else {
            let bbox = selected
                .iter()
                .map(|&i| page.bbox(i))
                .reduce(|a, b| a.union(b))
                .unwrap_or(Rect::ZERO);
            self.origin = bbox.center();
            self.dir = 0.0;
            if matches!(
                self.kind,
                TransformKind::Scale | TransformKind::Stretch | TransformKind::Shear
            ) {
                // Work from the side opposite the grabbed one.
                self.origin.x = if self.mouse_down.x > self.origin.x { bbox.x0 } else { bbox.x1 };
                self.origin.y = if self.mouse_down.y > self.origin.y { bbox.y0 } else { bbox.y1 };
            }
        }

        if self.kind == TransformKind::Shear {
            let d = geom::linear(Affine::rotate(-self.dir), self.mouse_down - self.origin);
            if d.y.abs() < 0.1 {
                return Err(TransformRejection::DegenerateShearAxis);
            }
        } else if self.kind != TransformKind::Translate && self.mouse_down == self.origin {
            return Err(TransformRejection::MouseAtOrigin);
        }
        Ok(())
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn validity(&self) -> Result<(), TransformRejection> {
        self.validity
    }

    /// Whether the tool can be used. Callers check this before
    /// activating it.
    pub fn is_valid(&self) -> bool {
        self.validity.is_ok()
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    /// Translation snaps angularly around the grab point.
    pub fn auto_origin(&self) -> Option<Point> {
        (self.kind == TransformKind::Translate && self.is_valid()).then_some(self.mouse_down)
    }

    /// Recompute the matrix for the mouse at `v`.
    pub fn compute(&mut self, v: Point) {
        let u0 = self.mouse_down - self.origin;
        let u1 = v - self.origin;
        match self.kind {
            TransformKind::Translate => {
                let mut d = v - self.mouse_down;
                if self.only_horizontal && self.only_vertical {
                    d = Vec2::ZERO;
                } else if self.only_horizontal || (self.with_shift && d.x.abs() > d.y.abs()) {
                    d.y = 0.0;
                } else if self.only_vertical || self.with_shift {
                    d.x = 0.0;
                }
                self.matrix = Affine::translate(d);
            }
            TransformKind::Rotate => {
                self.matrix = self.about_origin(Affine::rotate(u1.atan2() - u0.atan2()));
            }
            TransformKind::Scale => {
                let factor = (u1.hypot2() / u0.hypot2()).sqrt();
                self.matrix = self.about_origin(Affine::scale(factor));
            }
            TransformKind::Stretch => {
                let (v0, v1) = self.rotated(u0, u1);
                let xfactor = if u0.x.abs() < 1e-12 { 1.0 } else { v1.x / v0.x };
                let yfactor = if u0.y.abs() < 1e-12 { 1.0 } else { v1.y / v0.y };
                self.try_set(self.in_frame(Affine::scale_non_uniform(xfactor, yfactor)));
            }
            TransformKind::Shear => {
                let (v0, v1) = self.rotated(u0, u1);
                let s = (v1.x - v0.x) / v0.y;
                self.try_set(self.in_frame(Affine::new([1.0, 0.0, s, 1.0, 0.0, 0.0])));
            }
        }
    }

    fn rotated(&self, u0: Vec2, u1: Vec2) -> (Vec2, Vec2) {
        let rot = Affine::rotate(-self.dir);
        (geom::linear(rot, u0), geom::linear(rot, u1))
    }

    fn about_origin(&self, m: Affine) -> Affine {
        Affine::translate(self.origin.to_vec2()) * m * Affine::translate(-self.origin.to_vec2())
    }

    /// `m` acting in the frame rotated by `dir`, about the origin.
    fn in_frame(&self, m: Affine) -> Affine {
        self.about_origin(Affine::rotate(self.dir) * m * Affine::rotate(-self.dir))
    }

    /// Keep the previous matrix when `m` is degenerate.
    fn try_set(&mut self, m: Affine) {
        if m.is_finite() && m.determinant().abs() > MIN_DETERMINANT {
            self.matrix = m;
        }
    }

    pub(super) fn draw(&self, painter: &mut dyn Painter, ctx: &DrawContext<'_>) {
        painter.push();
        painter.set_stroke(Color::from_rgba8(0, 153, 0, 255));
        painter.transform(self.matrix);
        for i in ctx.page.selected() {
            ctx.page.object(i).draw_simple(painter);
        }
        painter.pop();
    }

    pub(super) fn mouse_button(&mut self, ctx: &mut ToolContext<'_>, press: bool) -> ToolFlow {
        if press {
            return ToolFlow::Finish;
        }
        self.compute(ctx.pos());
        ToolFlow::Commit(ToolReport::Transform {
            kind: self.kind,
            matrix: self.matrix,
        })
    }

    pub(super) fn mouse_move(&mut self, ctx: &mut ToolContext<'_>) -> ToolFlow {
        self.compute(ctx.pos());
        ctx.update_tool();
        ToolFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{PageObject, SelectState};
    use crate::shape::Shape;

    fn page_with(pinned: &[Pinned]) -> Page {
        let mut page = Page::new();
        for (k, &pin) in pinned.iter().enumerate() {
            let x = 20.0 * k as f64;
            let obj = PageObject::new(Shape::rectangle(Rect::new(x, 0.0, x + 10.0, 10.0))).with_pinned(pin);
            let i = page.insert(obj);
            page.set_select(i, SelectState::Secondary);
        }
        page.ensure_primary_selection();
        page
    }

    fn tool(page: &Page, down: Point, kind: TransformKind) -> TransformTool {
        TransformTool::with_page(page, &SnapConfig::default(), down, kind, false)
    }

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn test_fixed_objects_only_translate_in_place() {
        let page = page_with(&[Pinned::Fixed, Pinned::Fixed]);
        let rotate = tool(&page, Point::new(15.0, 15.0), TransformKind::Rotate);
        assert_eq!(rotate.validity(), Err(TransformRejection::FixedPin));
        let mut translate = tool(&page, Point::new(15.0, 15.0), TransformKind::Translate);
        assert!(translate.is_valid());
        translate.compute(Point::new(40.0, 3.0));
        assert_eq!(translate.matrix(), Affine::IDENTITY);
    }

    #[test]
    fn test_vertical_pin_moves_horizontally() {
        let page = page_with(&[Pinned::Vertical]);
        let mut t = tool(&page, Point::new(5.0, 5.0), TransformKind::Translate);
        t.compute(Point::new(9.0, 8.0));
        assert_eq!(t.matrix(), Affine::translate((4.0, 0.0)));
    }

    #[test]
    fn test_pinned_objects_only_translate() {
        let page = page_with(&[Pinned::Horizontal, Pinned::None]);
        assert_eq!(
            tool(&page, Point::new(5.0, 5.0), TransformKind::Scale).validity(),
            Err(TransformRejection::Pinned)
        );
        let mut t = tool(&page, Point::new(5.0, 5.0), TransformKind::Translate);
        assert!(t.is_valid());
        // Horizontally pinned objects move vertically only.
        t.compute(Point::new(9.0, 8.0));
        assert_eq!(t.matrix(), Affine::translate((0.0, 3.0)));
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let mut page = page_with(&[Pinned::None]);
        page.deselect_all();
        let t = tool(&page, Point::ZERO, TransformKind::Translate);
        assert_eq!(t.validity(), Err(TransformRejection::EmptySelection));
        assert_eq!(t.auto_origin(), None);
    }

    #[test]
    fn test_identity_at_mouse_down() {
        let page = page_with(&[Pinned::None, Pinned::None]);
        let down = Point::new(27.0, 4.0);
        for kind in [TransformKind::Translate, TransformKind::Rotate, TransformKind::Scale] {
            let mut t = tool(&page, down, kind);
            assert!(t.is_valid(), "{kind:?}");
            t.compute(down);
            let m = t.matrix();
            for p in [Point::ZERO, Point::new(13.0, -7.0)] {
                assert!(close(m * p, p), "{kind:?}");
            }
        }
    }

    #[test]
    fn test_scale_origin_is_opposite_corner() {
        let page = page_with(&[Pinned::None]);
        let mut t = tool(&page, Point::new(9.0, 9.0), TransformKind::Scale);
        assert_eq!(t.origin(), Point::new(0.0, 0.0));
        t.compute(Point::new(18.0, 18.0));
        assert!(close(t.matrix() * Point::new(10.0, 10.0), Point::new(20.0, 20.0)));
    }

    #[test]
    fn test_mouse_on_origin_is_rejected() {
        let page = page_with(&[Pinned::None]);
        let t = tool(&page, Point::new(5.0, 5.0), TransformKind::Rotate);
        assert_eq!(t.validity(), Err(TransformRejection::MouseAtOrigin));
    }

    #[test]
    fn test_rotate_about_center() {
        let page = page_with(&[Pinned::None]);
        let mut t = tool(&page, Point::new(10.0, 5.0), TransformKind::Rotate);
        t.compute(Point::new(5.0, 10.0));
        assert!(close(t.matrix() * Point::new(10.0, 5.0), Point::new(5.0, 10.0)));
        assert!(close(t.matrix() * Point::new(5.0, 5.0), Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_shift_locks_translation_axis() {
        let page = page_with(&[Pinned::None]);
        let mut t = TransformTool::with_page(
            &page,
            &SnapConfig::default(),
            Point::ZERO,
            TransformKind::Translate,
            true,
        );
        t.compute(Point::new(5.0, 2.0));
        assert_eq!(t.matrix(), Affine::translate((5.0, 0.0)));
        t.compute(Point::new(2.0, 5.0));
        assert_eq!(t.matrix(), Affine::translate((0.0, 5.0)));
    }

    #[test]
    fn test_stretch_and_degenerate_fallback() {
        let page = page_with(&[Pinned::None]);
        let mut t = tool(&page, Point::new(10.0, 10.0), TransformKind::Stretch);
        t.compute(Point::new(20.0, 5.0));
        let m = t.matrix();
        assert!(close(m * Point::new(10.0, 10.0), Point::new(20.0, 5.0)));
        // Flattening to zero height keeps the previous matrix.
        t.compute(Point::new(20.0, 0.0));
        assert_eq!(t.matrix(), m);
    }

    #[test]
    fn test_shear_axis() {
        let page = page_with(&[Pinned::None]);
        let axes = SnapConfig {
            with_axes: true,
            origin: Point::new(0.0, 0.0),
            dir: 0.0,
            ..SnapConfig::default()
        };
        let flat = TransformTool::with_page(&page, &axes, Point::new(9.0, 0.05), TransformKind::Shear, false);
        assert_eq!(flat.validity(), Err(TransformRejection::DegenerateShearAxis));
        let steep = TransformTool::with_page(&page, &axes, Point::new(9.0, 3.0), TransformKind::Shear, false);
        assert!(steep.is_valid());

        let mut t = tool(&page, Point::new(10.0, 10.0), TransformKind::Shear);
        assert!(t.is_valid());
        t.compute(Point::new(15.0, 10.0));
        assert!(close(t.matrix() * Point::new(10.0, 10.0), Point::new(15.0, 10.0)));
        assert!(close(t.matrix() * Point::new(10.0, 0.0), Point::new(10.0, 0.0)));
    }
}
