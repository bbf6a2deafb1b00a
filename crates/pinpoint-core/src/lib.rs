//! Pinpoint Core Library
//!
//! Platform-agnostic canvas core: the mapping between user and device
//! coordinates, the snap engine, and the interactive tools that pan,
//! select and transform the objects of a page.

pub mod canvas;
pub mod config;
pub mod geom;
pub mod input;
pub mod page;
pub mod painter;
pub mod shape;
pub mod snap;
pub mod style;
pub mod tools;
pub mod transform;

pub use canvas::{Canvas, CanvasObserver, CanvasState, CanvasSurface, CursorKind, NullSurface, Redraw};
pub use config::{CanvasConfig, ConfigError, ConfigResult};
pub use geom::{Arc, AxisLine, Closest};
pub use input::{KeyEvent, Modifiers, MouseButton, PointerEvent, WheelKind};
pub use page::{Layer, LayerSnapping, Page, PageObject, Pinned, SelectState};
pub use painter::{PathMode, Painter};
pub use shape::{Curve, CurveSegment, Shape, SubPath};
pub use snap::{SnapConfig, SnapMode, SnapModes, SnapResult, VertexSnap, snap_to_grid};
pub use style::{Cascade, CanvasStyle, Layout, SerializableColor};
pub use tools::{
    PanTool, PasteTool, SelectTool, ShapeTool, Tool, ToolFlow, ToolKind, ToolReport, TransformKind,
    TransformRejection, TransformTool,
};
pub use transform::{CoordinateTransform, TransformError};
