//! Pinpoint Render Library
//!
//! Turns a [`pinpoint_core::Canvas`] into display lists: flat lists of
//! stroked and filled [`kurbo::BezPath`]s that any backend can replay.

mod display_list;
mod renderer;

pub use display_list::{DisplayList, DrawCommand};
pub use renderer::{Frame, FrameComposer, RenderError, RenderResult, compose_overlay};
