use kurbo::{Point, Vec2};
use peniko::Color;

use super::{DrawContext, ToolContext, ToolFlow};
use crate::canvas::Canvas;
use crate::painter::{PathMode, Painter};

/// Drags the whole page around.
///
/// While dragging only an outline preview moves. The canvas pan changes
/// once, on release.
#[derive(Debug, Clone)]
pub struct PanTool {
    mouse_down: Point,
    offset: Vec2,
}

impl PanTool {
    /// Start panning at the canvas' current unsnapped mouse position.
    pub fn new(canvas: &Canvas) -> Self {
        Self::at(canvas.unsnapped_pos())
    }

    pub fn at(mouse_down: Point) -> Self {
        Self {
            mouse_down,
            offset: Vec2::ZERO,
        }
    }

    /// Distance dragged so far, in user units.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub(super) fn draw(&self, painter: &mut dyn Painter, ctx: &DrawContext<'_>) {
        painter.push();
        painter.translate(self.offset);
        painter.set_stroke(Color::from_rgba8(0, 0, 255, 255));
        painter.new_path();
        painter.rect(ctx.cascade.find_layout().paper());
        painter.draw_path(PathMode::StrokedOnly);
        for (i, obj) in ctx.page.objects().enumerate() {
            if ctx.page.object_visible(ctx.view, i) {
                obj.draw_simple(painter);
            }
        }
        painter.pop();
    }

    pub(super) fn mouse_button(&mut self, ctx: &mut ToolContext<'_>, press: bool) -> ToolFlow {
        if !press {
            let delta = ctx.unsnapped_pos() - self.mouse_down;
            let pan = ctx.state.pan() - delta;
            ctx.state.set_pan(pan);
        }
        ToolFlow::Finish
    }

    pub(super) fn mouse_move(&mut self, ctx: &mut ToolContext<'_>) -> ToolFlow {
        self.offset = ctx.unsnapped_pos() - self.mouse_down;
        ctx.update_tool();
        ToolFlow::Continue
    }
}
