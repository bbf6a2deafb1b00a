use std::fmt;

use kurbo::Affine;
use peniko::Color;

use super::{DrawContext, ToolContext, ToolDelegate, ToolFlow};
use crate::input::{Modifiers, MouseButton};
use crate::page::PageObject;
use crate::painter::Painter;

/// An object being placed, and where it currently goes.
#[derive(Debug, Clone)]
pub struct PasteModel {
    object: PageObject,
    matrix: Affine,
    color: Color,
}

impl PasteModel {
    pub fn object(&self) -> &PageObject {
        &self.object
    }

    /// Placement of the object relative to where it was copied.
    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    pub fn set_matrix(&mut self, matrix: Affine) {
        self.matrix = matrix;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Give up the object, placed.
    pub fn into_placed(self) -> PageObject {
        let m = self.matrix * self.object.matrix();
        self.object.with_matrix(m)
    }
}

/// Moves a pasted object around before it lands on the page.
pub struct PasteTool {
    model: PasteModel,
    delegate: Box<dyn ToolDelegate<PasteModel>>,
}

impl fmt::Debug for PasteTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasteTool").field("model", &self.model).finish_non_exhaustive()
    }
}

impl PasteTool {
    pub fn new(object: PageObject, delegate: impl ToolDelegate<PasteModel> + 'static) -> Self {
        Self {
            model: PasteModel {
                object,
                matrix: Affine::IDENTITY,
                color: Color::from_rgba8(0, 0, 0, 255),
            },
            delegate: Box::new(delegate),
        }
    }

    pub fn model(&self) -> &PasteModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut PasteModel {
        &mut self.model
    }

    pub(super) fn draw(&self, painter: &mut dyn Painter, _ctx: &DrawContext<'_>) {
        painter.push();
        painter.transform(self.model.matrix);
        painter.set_stroke(self.model.color);
        self.model.object.draw_simple(painter);
        painter.pop();
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
