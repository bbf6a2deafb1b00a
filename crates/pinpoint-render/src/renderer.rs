//! Frame composition.
//!
//! A frame has two layers. The scene holds paper, frame, grid, objects and
//! axes in device coordinates and only changes when the canvas asks for an
//! object repaint. The overlay holds the tool (or selection) and the snap
//! indicator and is rebuilt on every frame.

use std::f64::consts::TAU;

use kurbo::{Point, Size, Vec2};
use peniko::Color;
use pinpoint_core::geom::rects_intersect;
use pinpoint_core::{Canvas, PathMode, Painter};
use thiserror::Error;

use crate::display_list::DisplayList;

/// Renderer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Canvas has no drawable area")]
    EmptyViewport,
    #[error("Canvas shows no page")]
    NoPage,
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Grids finer than this many pixels are not drawn.
const MIN_GRID_PIXELS: f64 = 3.0;

/// Upper bound on the rays drawn for the snap axes.
const MAX_AXIS_RAYS: usize = 360;

/// A composed frame, ready for a backend to replay.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub size: Size,
    pub background: Color,
    pub scene: &'a DisplayList,
    pub overlay: &'a DisplayList,
    /// Whether `scene` was rebuilt for this frame.
    pub scene_changed: bool,
}

/// Builds display lists for a canvas, caching the scene between frames.
#[derive(Debug, Clone)]
pub struct FrameComposer {
    background: Color,
    object_color: Color,
    object_pen: f64,
    scene: DisplayList,
    scene_size: Option<Size>,
    overlay: DisplayList,
}

impl Default for FrameComposer {
    fn default() -> Self {
        Self {
            background: Color::from_rgba8(102, 102, 102, 255),
            object_color: Color::from_rgba8(0, 0, 0, 255),
            object_pen: 1.0,
            scene: DisplayList::new(),
            scene_size: None,
            overlay: DisplayList::new(),
        }
    }
}

impl FrameComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the colour around the paper.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Set how page objects are stroked. The pen is in user units.
    pub fn with_object_style(mut self, color: Color, pen: f64) -> Self {
        self.object_color = color;
        self.object_pen = pen;
        self
    }

    /// Compose the next frame.
    ///
    /// Consumes the canvas' pending redraw flags. The scene is rebuilt when
    /// the canvas asked for an object repaint or the size changed.
    pub fn render(&mut self, canvas: &mut Canvas) -> RenderResult<Frame<'_>> {
        let size = check(canvas)?;
        let redraw = canvas.take_redraw();
        let scene_changed = redraw.objects || self.scene_size != Some(size);
        if scene_changed {
            log::trace!("rebuilding scene at {} x {}", size.width, size.height);
            self.scene = self.compose_scene(canvas)?;
            self.scene_size = Some(size);
        }
        self.overlay = compose_overlay(canvas)?;
        Ok(Frame {
            size,
            background: self.background,
            scene: &self.scene,
            overlay: &self.overlay,
            scene_changed,
        })
    }

    /// Draw background, paper, frame, grid, objects and axes.
    pub fn compose_scene(&self, canvas: &Canvas) -> RenderResult<DisplayList> {
        let size = check(canvas)?;
        let mut list = DisplayList::new();

        list.set_fill(self.background);
        list.new_path();
        list.rect(size.to_rect());
        list.draw_path(PathMode::FilledOnly);

        list.push();
        list.transform(canvas.transform().canvas_transform());
        draw_paper(&mut list, canvas);
        if !canvas.style().pretty {
            draw_frame(&mut list, canvas);
        }
        if canvas.snap().grid_visible {
            draw_grid(&mut list, canvas);
        }
        self.draw_objects(&mut list, canvas);
        if canvas.snap().with_axes {
            draw_axes(&mut list, canvas);
        }
        list.pop();
        Ok(list)
    }

    fn draw_objects(&self, list: &mut DisplayList, canvas: &Canvas) {
        let Some(page) = canvas.page() else {
            return;
        };
        let style = canvas.style();
        list.push();
        let color = if canvas.is_dimmed() {
            self.object_color.with_alpha(0.3)
        } else {
            self.object_color
        };
        list.set_stroke(color);
        list.set_pen(self.object_pen);
        let paper = canvas.cascade().find_layout().paper();
        for (i, obj) in page.objects().enumerate() {
            if !page.object_visible(canvas.view(), i) {
                continue;
            }
            // Display lists cannot clip, so clipping to the paper culls
            // whole objects.
            if style.paper_clip && !rects_intersect(&paper, &obj.bbox()) {
                continue;
            }
            obj.draw_simple(list);
        }
        list.pop();
    }
}

/// Draw the tool overlay and the snap indicator.
pub fn compose_overlay(canvas: &Canvas) -> RenderResult<DisplayList> {
    check(canvas)?;
    let mut list = DisplayList::new();
    list.push();
    list.transform(canvas.transform().canvas_transform());
    canvas.draw_tool(&mut list);
    list.pop();
    if canvas.is_fifi_visible() {
        canvas.draw_fifi(&mut list);
    }
    Ok(list)
}

fn check(canvas: &Canvas) -> RenderResult<Size> {
    let size = canvas.transform().size();
    if !(size.width > 0.0 && size.height > 0.0) {
        return Err(RenderError::EmptyViewport);
    }
    if canvas.page().is_none() {
        return Err(RenderError::NoPage);
    }
    Ok(size)
}

fn draw_paper(list: &mut DisplayList, canvas: &Canvas) {
    list.set_fill(canvas.style().paper_color.color());
    list.new_path();
    list.rect(canvas.cascade().find_layout().paper());
    list.draw_path(PathMode::FilledOnly);
}

fn draw_frame(list: &mut DisplayList, canvas: &Canvas) {
    let zoom = canvas.zoom();
    list.push();
    list.set_stroke(Color::from_rgba8(128, 128, 128, 255));
    list.set_dash(&[3.0 / zoom, 7.0 / zoom]);
    list.set_pen(2.5 / zoom);
    list.new_path();
    list.rect(canvas.cascade().find_layout().frame());
    list.draw_path(PathMode::StrokedOnly);
    list.pop();
}

/// Grid lines over the frame, every `thick_step`-th one thick. Lines
/// outside the visible area are skipped.
fn draw_grid(list: &mut DisplayList, canvas: &Canvas) {
    let zoom = canvas.zoom();
    let style = canvas.style();
    let step = canvas.snap().grid_size * f64::from(style.thin_step.max(1));
    if step * zoom < MIN_GRID_PIXELS {
        return;
    }
    let extent = canvas.cascade().find_layout().frame_size;
    let screen = canvas.transform().visible_rect();
    let thick_step = style.thick_step.max(1) as usize;
    let thin = style.thin_line / zoom;
    let thick = style.thick_line / zoom;

    let xs = grid_lines(step, extent.width);
    let ys = grid_lines(step, extent.height);

    list.push();
    list.set_stroke(style.grid_line_color.color());
    if style.classic_grid {
        list.set_pen(thin);
        list.new_path();
        for &(_, y) in ys.iter().filter(|(_, y)| screen.y0 <= *y && *y <= screen.y1) {
            for &(_, x) in xs.iter().filter(|(_, x)| screen.x0 <= *x && *x <= screen.x1) {
                list.move_to(Point::new(x, y - 0.5 * thin));
                list.line_to(Point::new(x, y + 0.5 * thin));
            }
        }
        list.draw_path(PathMode::StrokedOnly);
    } else {
        for &(k, y) in &ys {
            if screen.y0 <= y && y <= screen.y1 {
                list.set_pen(if k % thick_step == 0 { thick } else { thin });
                list.new_path();
                list.move_to(Point::new(0.0, y));
                list.line_to(Point::new(extent.width, y));
                list.draw_path(PathMode::StrokedOnly);
            }
        }
        for &(k, x) in &xs {
            if screen.x0 <= x && x <= screen.x1 {
                list.set_pen(if k % thick_step == 0 { thick } else { thin });
                list.new_path();
                list.move_to(Point::new(x, 0.0));
                list.line_to(Point::new(x, extent.height));
                list.draw_path(PathMode::StrokedOnly);
            }
        }
    }
    list.pop();
}

/// Grid coordinates in `[0, extent)` with their index.
fn grid_lines(step: f64, extent: f64) -> Vec<(usize, f64)> {
    (0..)
        .map(|k| (k, k as f64 * step))
        .take_while(|&(_, v)| v < extent)
        .collect()
}

/// Rays from the axis origin at every multiple of the angle step; the
/// first one, along the axis direction, is drawn thicker.
fn draw_axes(list: &mut DisplayList, canvas: &Canvas) {
    let zoom = canvas.zoom();
    let snap = canvas.snap();
    let size = canvas.transform().size();
    let reach = (size.width + size.height) / zoom;

    if !(snap.angle_size > 0.0) {
        log::debug!("not drawing axes for angle step {}", snap.angle_size);
        return;
    }
    let rays = (TAU / snap.angle_size).ceil().min(MAX_AXIS_RAYS as f64) as usize;
    list.push();
    list.set_stroke(Color::from_rgba8(0, 255, 0, 255));
    for k in 0..rays {
        let alpha = k as f64 * snap.angle_size;
        if alpha >= TAU {
            break;
        }
        list.set_pen(if k == 0 { 2.0 / zoom } else { 1.0 / zoom });
        list.new_path();
        list.move_to(snap.origin);
        list.line_to(snap.origin + reach * Vec2::from_angle(snap.dir + alpha));
        list.draw_path(PathMode::StrokedOnly);
    }
    list.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Affine, Rect};
    use pinpoint_core::{
        NullSurface, Page, PageObject, SelectState, Shape, SnapConfig, SnapModes,
    };

    fn canvas() -> Canvas {
        let mut canvas = Canvas::new(NullSurface);
        canvas.set_surface_size(200.0, 100.0);
        let mut page = Page::new();
        page.insert(PageObject::new(Shape::rectangle(Rect::new(10.0, 10.0, 20.0, 20.0))));
        canvas.set_page(page, 0, Default::default());
        canvas
    }

    #[test]
    fn test_errors() {
        let mut canvas = Canvas::new(NullSurface);
        let composer = FrameComposer::new();
        assert_eq!(composer.compose_scene(&canvas).unwrap_err(), RenderError::EmptyViewport);
        canvas.set_surface_size(10.0, 10.0);
        assert_eq!(composer.compose_scene(&canvas).unwrap_err(), RenderError::NoPage);
        assert_eq!(compose_overlay(&canvas).unwrap_err(), RenderError::NoPage);
    }

    #[test]
    fn test_scene_layers() {
        let canvas = canvas();
        let list = FrameComposer::new().compose_scene(&canvas).unwrap();
        // background, paper, frame, one object
        assert_eq!(list.len(), 4);
        let cmds = list.commands();
        assert_eq!(cmds[0].transform, Affine::IDENTITY);
        assert_eq!(cmds[0].bounding_box(), Rect::new(0.0, 0.0, 200.0, 100.0));
        assert!(cmds[1].fill.is_some());
        assert_eq!(cmds[2].dash.len(), 2);
        assert_eq!(cmds[3].transform, canvas.transform().canvas_transform());
        assert_eq!(cmds[3].stroke, Some(Color::from_rgba8(0, 0, 0, 255)));
    }

    #[test]
    fn test_pretty_hides_frame() {
        let mut canvas = canvas();
        let mut style = canvas.style().clone();
        style.pretty = true;
        canvas.set_canvas_style(style);
        let list = FrameComposer::new().compose_scene(&canvas).unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.commands().iter().all(|c| c.dash.is_empty()));
    }

    #[test]
    fn test_grid_needs_three_pixels() {
        let mut canvas = canvas();
        canvas.set_snap(SnapConfig {
            grid_visible: true,
            grid_size: 2.0,
            ..SnapConfig::default()
        });
        canvas.set_zoom(1.0);
        let base = FrameComposer::new().compose_scene(&canvas).unwrap().len();
        assert_eq!(base, 4);

        canvas.set_snap(SnapConfig {
            grid_visible: true,
            grid_size: 16.0,
            ..SnapConfig::default()
        });
        let list = FrameComposer::new().compose_scene(&canvas).unwrap();
        // visible user area is x in [-100, 100], y in [-50, 50]: lines at
        // 0..=96 across and 0..=48 up
        assert_eq!(list.len(), 4 + 7 + 4);
    }

    #[test]
    fn test_axes() {
        let mut canvas = canvas();
        canvas.set_snap(SnapConfig {
            with_axes: true,
            angle_size: 2.0,
            ..SnapConfig::default()
        });
        let list = FrameComposer::new().compose_scene(&canvas).unwrap();
        let rays: Vec<_> = list.commands()[4..].iter().collect();
        assert_eq!(rays.len(), 4);
        assert_eq!(rays[0].pen, 2.0);
        assert!(rays[1..].iter().all(|r| r.pen == 1.0));
    }

    #[test]
    fn test_axes_with_degenerate_step() {
        let mut canvas = canvas();
        for angle_size in [0.0, -1.0, f64::NAN] {
            canvas.set_snap(SnapConfig {
                with_axes: true,
                angle_size,
                ..SnapConfig::default()
            });
            let list = FrameComposer::new().compose_scene(&canvas).unwrap();
            assert_eq!(list.len(), 4);
        }

        canvas.set_snap(SnapConfig {
            with_axes: true,
            angle_size: 1e-9,
            ..SnapConfig::default()
        });
        let list = FrameComposer::new().compose_scene(&canvas).unwrap();
        assert_eq!(list.len() - 4, MAX_AXIS_RAYS);
    }

    #[test]
    fn test_paper_clip_culls_objects_off_the_paper() {
        let mut canvas = canvas();
        if let Some(page) = canvas.page_mut() {
            // touches the right edge of the paper
            page.insert(PageObject::new(Shape::rectangle(Rect::new(595.0, 10.0, 605.0, 20.0))));
            page.insert(PageObject::new(Shape::rectangle(Rect::new(700.0, 10.0, 710.0, 20.0))));
        }
        assert_eq!(FrameComposer::new().compose_scene(&canvas).unwrap().len(), 6);

        let mut style = canvas.style().clone();
        style.paper_clip = true;
        canvas.set_canvas_style(style);
        let list = FrameComposer::new().compose_scene(&canvas).unwrap();
        assert_eq!(list.len(), 5);
        assert!(list.commands()[3..].iter().all(|c| c.bounding_box().x0 < 650.0));
    }

    #[test]
    fn test_dimmed_objects() {
        let mut canvas = canvas();
        canvas.set_dimmed(true);
        let list = FrameComposer::new().compose_scene(&canvas).unwrap();
        let object = &list.commands()[3];
        assert_ne!(object.stroke, Some(Color::from_rgba8(0, 0, 0, 255)));
    }

    #[test]
    fn test_overlay_shows_selection_and_fifi() {
        let mut canvas = canvas();
        if let Some(page) = canvas.page_mut() {
            page.set_select(0, SelectState::Primary);
        }
        let overlay = compose_overlay(&canvas).unwrap();
        // surround and outline
        assert_eq!(overlay.len(), 2);

        canvas.set_snap(SnapConfig {
            modes: SnapModes::GRID,
            ..SnapConfig::default()
        });
        canvas.set_fifi_visible(true);
        canvas.mouse_move(Point::new(100.0, 50.0));
        let overlay = compose_overlay(&canvas).unwrap();
        assert_eq!(overlay.len(), 3);
        let fifi = &overlay.commands()[2];
        assert_eq!(fifi.transform, Affine::translate((100.0, 50.0)));
    }

    #[test]
    fn test_scene_is_cached() {
        let mut canvas = canvas();
        let mut composer = FrameComposer::new();
        assert!(composer.render(&mut canvas).unwrap().scene_changed);
        assert!(!composer.render(&mut canvas).unwrap().scene_changed);

        canvas.update_tool();
        assert!(!composer.render(&mut canvas).unwrap().scene_changed);

        canvas.set_pan(Point::new(5.0, 0.0));
        canvas.update();
        let frame = composer.render(&mut canvas).unwrap();
        assert!(frame.scene_changed);
        assert_eq!(frame.scene.len(), 4);

        canvas.set_surface_size(300.0, 100.0);
        let frame = composer.render(&mut canvas).unwrap();
        assert!(frame.scene_changed);
        assert_eq!(frame.size, Size::new(300.0, 100.0));
    }
}
