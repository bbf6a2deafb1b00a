//! Interactive tools.
//!
//! At most one tool is active on a canvas. While active it receives every
//! mouse and key event, and tells the canvas through a [`ToolFlow`] when
//! it is done.

mod pan;
mod paste;
mod select;
mod shape;
mod transform;

pub use pan::PanTool;
pub use paste::{PasteModel, PasteTool};
pub use select::{SelectCandidate, SelectTool};
pub use shape::{Mark, MarkKind, ShapeModel, ShapeSlot, ShapeTool};
pub use transform::{TransformKind, TransformRejection, TransformTool};

use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

use crate::canvas::{CanvasState, CursorKind};
use crate::geom::Closest;
use crate::input::{Modifiers, MouseButton};
use crate::page::Page;
use crate::painter::Painter;
use crate::snap::VertexSnap;
use crate::style::{Cascade, CanvasStyle};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    Pan,
    Select,
    Transform,
    Shape,
    Paste,
}

/// What the canvas should do after a tool handled an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolFlow {
    /// Keep the tool active.
    Continue,
    /// Drop the tool.
    Finish,
    /// Hand a result to the host, then drop the tool.
    Commit(ToolReport),
}

/// Result of a tool that completed its job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ToolReport {
    /// The selection should be transformed by `matrix`.
    Transform { kind: TransformKind, matrix: Affine },
}

/// Canvas state a tool may read and change while handling an event.
pub struct ToolContext<'a> {
    pub state: &'a mut CanvasState,
    pub page: &'a mut Page,
    pub view: usize,
    pub cascade: &'a Cascade,
}

impl ToolContext<'_> {
    /// Snapped mouse position.
    pub fn pos(&self) -> Point {
        self.state.pos()
    }

    pub fn unsnapped_pos(&self) -> Point {
        self.state.unsnapped_pos()
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom()
    }

    /// Request a redraw of the tool overlay.
    pub fn update_tool(&mut self) {
        self.state.update_tool();
    }
}

/// What a tool sees while drawing.
pub struct DrawContext<'a> {
    pub zoom: f64,
    pub page: &'a Page,
    pub view: usize,
    pub cascade: &'a Cascade,
    pub style: &'a CanvasStyle,
}

/// Host logic behind a [`ShapeTool`] or [`PasteTool`].
///
/// The tool owns the model it draws and snaps to; the delegate interprets
/// the events and edits the model.
pub trait ToolDelegate<M> {
    fn mouse_button(
        &mut self,
        model: &mut M,
        ctx: &mut ToolContext<'_>,
        button: MouseButton,
        modifiers: Modifiers,
        press: bool,
    ) -> ToolFlow;

    fn mouse_move(&mut self, model: &mut M, ctx: &mut ToolContext<'_>) -> ToolFlow {
        let _ = (model, ctx);
        ToolFlow::Continue
    }

    /// Returns `None` if the key was not handled.
    fn key(
        &mut self,
        model: &mut M,
        ctx: &mut ToolContext<'_>,
        text: &str,
        modifiers: Modifiers,
    ) -> Option<ToolFlow> {
        let _ = (model, ctx, text, modifiers);
        None
    }
}

/// The active tool of a canvas.
#[derive(Debug)]
pub enum Tool {
    Pan(PanTool),
    Select(SelectTool),
    Transform(TransformTool),
    Shape(ShapeTool),
    Paste(PasteTool),
}

impl Tool {
    pub fn kind(&self) -> ToolKind {
        match self {
            Tool::Pan(_) => ToolKind::Pan,
            Tool::Select(_) => ToolKind::Select,
            Tool::Transform(_) => ToolKind::Transform,
            Tool::Shape(_) => ToolKind::Shape,
            Tool::Paste(_) => ToolKind::Paste,
        }
    }

    /// Cursor to show while the tool is active, if it wants one.
    pub fn cursor(&self) -> Option<CursorKind> {
        match self {
            Tool::Pan(_) => Some(CursorKind::Hand),
            Tool::Select(_) => Some(CursorKind::Cross),
            Tool::Transform(t) if t.is_valid() => Some(CursorKind::Hand),
            _ => None,
        }
    }

    /// Origin for automatic angular snapping while the tool is active.
    pub fn auto_origin(&self) -> Option<Point> {
        match self {
            Tool::Transform(t) => t.auto_origin(),
            _ => None,
        }
    }

    pub fn draw(&self, painter: &mut dyn Painter, ctx: &DrawContext<'_>) {
        match self {
            Tool::Pan(t) => t.draw(painter, ctx),
            Tool::Select(t) => t.draw(painter, ctx),
            Tool::Transform(t) => t.draw(painter, ctx),
            Tool::Shape(t) => t.draw(painter, ctx),
            Tool::Paste(t) => t.draw(painter, ctx),
        }
    }

    pub fn mouse_button(
        &mut self,
        ctx: &mut ToolContext<'_>,
        button: MouseButton,
        modifiers: Modifiers,
        press: bool,
    ) -> ToolFlow {
        match self {
            Tool::Pan(t) => t.mouse_button(ctx, press),
            Tool::Select(t) => t.mouse_button(ctx, press),
            Tool::Transform(t) => t.mouse_button(ctx, press),
            Tool::Shape(t) => t.mouse_button(ctx, button, modifiers, press),
            Tool::Paste(t) => t.mouse_button(ctx, button, modifiers, press),
        }
    }

    pub fn mouse_move(&mut self, ctx: &mut ToolContext<'_>) -> ToolFlow {
        match self {
            Tool::Pan(t) => t.mouse_move(ctx),
            Tool::Select(t) => t.mouse_move(ctx),
            Tool::Transform(t) => t.mouse_move(ctx),
            Tool::Shape(t) => t.mouse_move(ctx),
            Tool::Paste(t) => t.mouse_move(ctx),
        }
    }

    /// Returns `None` if the tool did not handle the key.
    pub fn key(&mut self, ctx: &mut ToolContext<'_>, text: &str, modifiers: Modifiers) -> Option<ToolFlow> {
        match self {
            Tool::Select(t) => t.key(ctx, text),
            Tool::Shape(t) => t.key(ctx, text, modifiers),
            Tool::Paste(t) => t.key(ctx, text, modifiers),
            Tool::Pan(_) | Tool::Transform(_) => None,
        }
    }
}

impl VertexSnap for Tool {
    fn snap_vtx(&self, mouse: Point, best: &mut Closest, ctl: bool) {
        if let Tool::Shape(t) = self {
            t.model().snap_vtx(mouse, best, ctl);
        }
    }
}

impl From<PanTool> for Tool {
    fn from(tool: PanTool) -> Self {
        Tool::Pan(tool)
    }
}

impl From<SelectTool> for Tool {
    fn from(tool: SelectTool) -> Self {
        Tool::Select(tool)
    }
}

impl From<TransformTool> for Tool {
    fn from(tool: TransformTool) -> Self {
        Tool::Transform(tool)
    }
}

impl From<ShapeTool> for Tool {
    fn from(tool: ShapeTool) -> Self {
        Tool::Shape(tool)
    }
}

impl From<PasteTool> for Tool {
    fn from(tool: PasteTool) -> Self {
        Tool::Paste(tool)
    }
}
