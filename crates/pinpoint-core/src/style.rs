//! Page layout and canvas colours.

use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color (RGBA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn color(self) -> Color {
        self.into()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// How the canvas draws paper, grid and selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasStyle {
    pub paper_color: SerializableColor,
    pub primary_selection_color: SerializableColor,
    pub secondary_selection_color: SerializableColor,
    pub selection_surround_color: SerializableColor,
    pub primary_selection_width: f64,
    pub secondary_selection_width: f64,
    pub selection_surround_width: f64,
    pub grid_line_color: SerializableColor,
    /// Clip object drawing to the paper.
    pub paper_clip: bool,
    /// Hide the dashed frame outline.
    pub pretty: bool,
    /// Draw the grid as dots instead of lines.
    pub classic_grid: bool,
    pub thin_line: f64,
    pub thick_line: f64,
    /// Every `thin_step`-th grid line is drawn thin.
    pub thin_step: u32,
    /// Every `thick_step`-th grid line is drawn thick.
    pub thick_step: u32,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            paper_color: SerializableColor::rgb(255, 255, 255),
            primary_selection_color: SerializableColor::rgb(255, 0, 0),
            secondary_selection_color: SerializableColor::rgb(255, 0, 255),
            selection_surround_color: SerializableColor::rgb(255, 255, 0),
            primary_selection_width: 3.0,
            secondary_selection_width: 2.0,
            selection_surround_width: 6.0,
            grid_line_color: SerializableColor::rgb(77, 77, 77),
            paper_clip: false,
            pretty: false,
            classic_grid: false,
            thin_line: 0.2,
            thick_line: 0.9,
            thin_step: 1,
            thick_step: 4,
        }
    }
}

/// Paper and frame geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub paper_size: Size,
    /// Position of the user-space origin measured from the paper corner.
    pub origin: Vec2,
    pub frame_size: Size,
}

impl Layout {
    pub fn paper(&self) -> Rect {
        Rect::from_origin_size((-self.origin).to_point(), self.paper_size)
    }

    pub fn frame(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.frame_size)
    }
}

impl Default for Layout {
    /// A4 portrait in PostScript points, frame filling the paper.
    fn default() -> Self {
        Self {
            paper_size: Size::new(595.0, 842.0),
            origin: Vec2::ZERO,
            frame_size: Size::new(595.0, 842.0),
        }
    }
}

/// The resolved document style, as far as the canvas needs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cascade {
    layout: Layout,
}

impl Cascade {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn find_layout(&self) -> &Layout {
        &self.layout
    }
}
