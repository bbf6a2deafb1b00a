//! The canvas: pan and zoom, the mouse position, snapping and the active
//! tool, on top of a page the host hands over.
//!
//! The canvas knows nothing about windows. The host forwards raw input
//! events, implements [`CanvasSurface`] so the canvas can ask for repaints
//! and cursors, and optionally listens through a [`CanvasObserver`].

use std::cell::Cell;
use std::fmt;
use std::mem;

use kurbo::{Affine, Point, Rect, Size};
use peniko::Color;

use crate::config::CanvasConfig;
use crate::input::{KeyEvent, Modifiers, MouseButton, PointerEvent, WheelKind};
use crate::page::{Page, SelectState};
use crate::painter::{PathMode, Painter};
use crate::snap::{SnapConfig, SnapMode, SnapModes, VertexSnap};
use crate::style::{Cascade, CanvasStyle};
use crate::tools::{DrawContext, Tool, ToolContext, ToolFlow, ToolReport};
use crate::transform::CoordinateTransform;

/// Half the side of the device box redrawn around the fifi.
const FIFI_EXTENT: f64 = 10.0;

/// Default pick radius of the select tool, in device pixels.
pub const DEFAULT_SELECT_DISTANCE: f64 = 36.0;

/// Mouse cursor shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CursorKind {
    #[default]
    Standard,
    Hand,
    Cross,
    Dot,
}

/// What the host provides so the canvas can get itself repainted.
pub trait CanvasSurface {
    /// Schedule a repaint of `rect` (device coordinates), or of
    /// everything.
    fn invalidate(&mut self, rect: Option<Rect>);

    fn set_cursor(&mut self, cursor: CursorKind);
}

/// A surface that ignores every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl CanvasSurface for NullSurface {
    fn invalidate(&mut self, _rect: Option<Rect>) {}

    fn set_cursor(&mut self, _cursor: CursorKind) {}
}

/// Notifications for the host. Every method defaults to doing nothing.
pub trait CanvasObserver {
    fn on_wheel(&mut self, _dx: f64, _dy: f64, _kind: WheelKind) {}

    /// A button was pressed while no tool is active.
    fn on_mouse_action(&mut self, _button: MouseButton, _modifiers: Modifiers) {}

    fn on_position_changed(&mut self) {}

    fn on_tool_changed(&mut self, _active: bool) {}

    fn on_size_changed(&mut self) {}

    /// A tool finished with a result.
    fn on_tool_report(&mut self, _report: &ToolReport) {}
}

/// Which layers need repainting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Redraw {
    /// The page objects, and everything on top of them.
    pub objects: bool,
    /// Only the tool overlay and the fifi.
    pub tool: bool,
}

/// Canvas state shared with the active tool.
#[derive(Debug, Clone)]
pub struct CanvasState {
    pub(crate) transform: CoordinateTransform,
    /// Snapped mouse position.
    pub(crate) mouse_pos: Point,
    pub(crate) unsnapped_pos: Point,
    pub(crate) global_pos: Point,
    pub(crate) snap: SnapConfig,
    pub(crate) auto_origin: Option<Point>,
    pub(crate) fifi_visible: bool,
    pub(crate) fifi_mode: SnapMode,
    /// Device position of the last drawn fifi.
    pub(crate) old_fifi: Cell<Point>,
    pub(crate) selection_visible: bool,
    pub(crate) dimmed: bool,
    pub(crate) additional_modifiers: Modifiers,
    pub(crate) style: CanvasStyle,
    pub(crate) select_distance: f64,
    repaint_objects: bool,
    repaint_tool: bool,
    invalidate_pending: bool,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            transform: CoordinateTransform::default(),
            mouse_pos: Point::ZERO,
            unsnapped_pos: Point::ZERO,
            global_pos: Point::ZERO,
            snap: SnapConfig::default(),
            auto_origin: None,
            fifi_visible: false,
            fifi_mode: SnapMode::None,
            old_fifi: Cell::new(Point::ZERO),
            selection_visible: true,
            dimmed: false,
            additional_modifiers: Modifiers::NONE,
            style: CanvasStyle::default(),
            select_distance: DEFAULT_SELECT_DISTANCE,
            repaint_objects: true,
            repaint_tool: true,
            invalidate_pending: false,
        }
    }
}

impl CanvasState {
    /// Snapped mouse position in user coordinates.
    pub fn pos(&self) -> Point {
        self.mouse_pos
    }

    pub fn unsnapped_pos(&self) -> Point {
        self.unsnapped_pos
    }

    pub fn global_pos(&self) -> Point {
        self.global_pos
    }

    pub fn zoom(&self) -> f64 {
        self.transform.zoom()
    }

    pub fn pan(&self) -> Point {
        self.transform.pan
    }

    pub fn set_pan(&mut self, pan: Point) {
        self.transform.pan = pan;
    }

    pub fn snap(&self) -> &SnapConfig {
        &self.snap
    }

    /// Request a full repaint.
    pub fn update(&mut self) {
        self.repaint_objects = true;
        self.update_tool();
    }

    /// Request a repaint of the tool overlay only.
    pub fn update_tool(&mut self) {
        self.repaint_tool = true;
        self.invalidate_pending = true;
    }
}

/// An interactive view of one page.
pub struct Canvas {
    state: CanvasState,
    page: Option<Page>,
    view: usize,
    cascade: Cascade,
    tool: Option<Tool>,
    report: Option<ToolReport>,
    surface: Box<dyn CanvasSurface>,
    observer: Option<Box<dyn CanvasObserver>>,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("state", &self.state)
            .field("page", &self.page.as_ref().map(Page::count))
            .field("view", &self.view)
            .field("tool", &self.tool)
            .finish_non_exhaustive()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(NullSurface)
    }
}

impl Canvas {
    /// Create a canvas without a page.
    pub fn new(surface: impl CanvasSurface + 'static) -> Self {
        Self {
            state: CanvasState::default(),
            page: None,
            view: 0,
            cascade: Cascade::default(),
            tool: None,
            report: None,
            surface: Box::new(surface),
            observer: None,
        }
    }

    /// Create a canvas using the settings of `config`.
    pub fn with_config(surface: impl CanvasSurface + 'static, config: &CanvasConfig) -> Self {
        let mut canvas = Self::new(surface);
        canvas.apply_config(config);
        canvas
    }

    /// Take over style, snapping, select distance and zoom limits.
    pub fn apply_config(&mut self, config: &CanvasConfig) {
        self.state.style = config.style.clone();
        self.state.snap = config.snap.clone();
        self.state.select_distance = config.select_distance;
        let [min_zoom, max_zoom] = config.zoom_limits;
        self.state.transform.set_zoom_limits(min_zoom, max_zoom);
        self.update();
    }

    // Page

    /// Show `page` in `view`. Any active tool is finished first. Returns
    /// the page shown before.
    pub fn set_page(&mut self, page: Page, view: usize, cascade: Cascade) -> Option<Page> {
        if self.tool.is_some() {
            self.finish_tool();
        }
        let old = self.page.replace(page);
        self.view = view;
        self.cascade = cascade;
        self.update();
        old
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Mutable access to the page. Call [`Canvas::update`] after changing
    /// anything visible.
    pub fn page_mut(&mut self) -> Option<&mut Page> {
        self.page.as_mut()
    }

    /// Remove the page from the canvas, finishing any active tool.
    pub fn take_page(&mut self) -> Option<Page> {
        if self.tool.is_some() {
            self.finish_tool();
        }
        let page = self.page.take();
        self.update();
        page
    }

    pub fn view(&self) -> usize {
        self.view
    }

    pub fn set_view(&mut self, view: usize) {
        self.view = view;
        self.update();
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    // Settings

    pub fn style(&self) -> &CanvasStyle {
        &self.state.style
    }

    pub fn set_canvas_style(&mut self, style: CanvasStyle) {
        self.state.style = style;
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.state.transform
    }

    pub fn pan(&self) -> Point {
        self.state.pan()
    }

    /// Set the user point shown at the centre. Call [`Canvas::update`]
    /// afterwards.
    pub fn set_pan(&mut self, pan: Point) {
        self.state.set_pan(pan);
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom()
    }

    /// Set the zoom, clamped into the configured limits. Call
    /// [`Canvas::update`] afterwards.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.state.transform.set_zoom(zoom);
    }

    /// Zoom by `factor` around a device point and repaint.
    pub fn zoom_at(&mut self, device: Point, factor: f64) {
        self.state.transform.zoom_at(device, factor);
        self.update();
    }

    /// Show the whole paper and repaint.
    pub fn fit_paper(&mut self, padding: f64) {
        let paper = self.cascade.find_layout().paper();
        self.state.transform.fit_to_rect(paper, padding);
        self.update();
    }

    pub fn snap(&self) -> &SnapConfig {
        &self.state.snap
    }

    pub fn set_snap(&mut self, snap: SnapConfig) {
        self.state.snap = snap;
    }

    /// Point the snap axes along the edge under the mouse. Returns `false`
    /// if there is no edge close enough.
    pub fn set_axes_from_edge(&mut self) -> bool {
        let Some(page) = &self.page else {
            return false;
        };
        let found = self.state.snap.set_edge(self.state.unsnapped_pos, page, self.view);
        if found {
            self.update();
        }
        found
    }

    pub fn select_distance(&self) -> f64 {
        self.state.select_distance
    }

    pub fn is_dimmed(&self) -> bool {
        self.state.dimmed
    }

    /// Draw the page objects dimmed, e.g. while a tool shows something
    /// more important.
    pub fn set_dimmed(&mut self, dimmed: bool) {
        self.state.dimmed = dimmed;
    }

    /// Modifiers the host wants added to every button and key event.
    pub fn set_additional_modifiers(&mut self, modifiers: Modifiers) {
        self.state.additional_modifiers = modifiers;
    }

    /// Enable automatic angular snapping around `origin` until the
    /// current tool finishes.
    pub fn set_auto_origin(&mut self, origin: Point) {
        self.state.auto_origin = Some(origin);
    }

    pub fn auto_origin(&self) -> Option<Point> {
        self.state.auto_origin
    }

    pub fn is_fifi_visible(&self) -> bool {
        self.state.fifi_visible
    }

    pub fn set_fifi_visible(&mut self, visible: bool) {
        self.state.fifi_visible = visible;
        // Becoming visible waits for the next position update.
        if !visible {
            self.update_tool();
        }
    }

    /// Mode the mouse position was last snapped with.
    pub fn fifi_mode(&self) -> SnapMode {
        self.state.fifi_mode
    }

    pub fn is_selection_visible(&self) -> bool {
        self.state.selection_visible
    }

    /// Whether the selection is outlined while no tool is active.
    pub fn set_selection_visible(&mut self, visible: bool) {
        self.state.selection_visible = visible;
        self.update_tool();
    }

    pub fn set_observer(&mut self, observer: Option<Box<dyn CanvasObserver>>) {
        self.observer = observer;
    }

    /// Tell the canvas the size of its device area.
    pub fn set_surface_size(&mut self, width: f64, height: f64) {
        if !self.state.transform.set_size(Size::new(width, height)) {
            return;
        }
        log::debug!("canvas size changed to {width} x {height}");
        self.update();
        if let Some(observer) = &mut self.observer {
            observer.on_size_changed();
        }
    }

    // Mouse position

    /// Snapped mouse position in user coordinates.
    pub fn pos(&self) -> Point {
        self.state.pos()
    }

    pub fn unsnapped_pos(&self) -> Point {
        self.state.unsnapped_pos()
    }

    /// Mouse position on the screen, as last reported with a button event.
    pub fn global_pos(&self) -> Point {
        self.state.global_pos()
    }

    /// The unsnapped mouse position snapped without angular snapping.
    pub fn simple_snap_pos(&self) -> Point {
        let pos = self.state.unsnapped_pos;
        let Some(page) = &self.page else {
            return pos;
        };
        let snap_dist = self.state.snap.snap_distance / self.zoom();
        self.state.snap.simple_snap(pos, page, self.view, snap_dist, None).point
    }

    /// Recompute the mouse position for device point `device`, snapping
    /// it, and repaint the fifi if it moved.
    pub fn compute_fifi(&mut self, device: Point) {
        let pos = self.state.transform.dev_to_user(device);
        self.state.unsnapped_pos = pos;
        self.state.mouse_pos = pos;

        let Some(page) = &self.page else {
            return;
        };

        let mut modes = self.state.snap.modes;
        if self.state.auto_origin.is_none() {
            modes.remove(SnapModes::AUTO);
        }
        if modes.is_empty() {
            self.state.fifi_mode = SnapMode::None;
            if self.state.fifi_visible {
                let old = self.state.old_fifi.get();
                self.surface.invalidate(Some(fifi_box(old)));
                self.state.fifi_visible = false;
            }
            return;
        }

        let snap_dist = self.state.snap.snap_distance / self.zoom();
        let tool = self.tool.as_ref().map(|t| t as &dyn VertexSnap);
        let mut result = self
            .state
            .snap
            .snap(pos, page, self.view, snap_dist, tool, self.state.auto_origin);
        if result.mode == SnapMode::None {
            if let Some(r) =
                self.state
                    .snap
                    .snap_to_paper_and_frame(pos, self.cascade.find_layout(), snap_dist)
            {
                result = r;
            }
        }
        self.state.mouse_pos = result.point;
        self.state.fifi_mode = result.mode;

        let fifi = self.state.transform.user_to_dev(result.point);
        let old = self.state.old_fifi.get();
        if self.state.fifi_visible && fifi != old {
            self.surface.invalidate(Some(fifi_box(old)));
            self.surface.invalidate(Some(fifi_box(fifi)));
        }
    }

    // Input

    /// A mouse button went down (`press`) or up at device point `device`.
    pub fn mouse_button(
        &mut self,
        device: Point,
        global: Point,
        button: MouseButton,
        modifiers: Modifiers,
        press: bool,
    ) {
        self.state.global_pos = global;
        self.compute_fifi(device);
        let modifiers = modifiers.union(self.state.additional_modifiers);
        if self.tool.is_none() {
            if press {
                if let Some(observer) = &mut self.observer {
                    observer.on_mouse_action(button, modifiers);
                }
            }
            return;
        }
        if let Some(flow) = self.dispatch(|tool, ctx| tool.mouse_button(ctx, button, modifiers, press)) {
            self.apply_flow(flow);
        }
    }

    pub fn mouse_move(&mut self, device: Point) {
        self.compute_fifi(device);
        if let Some(flow) = self.dispatch(|tool, ctx| tool.mouse_move(ctx)) {
            self.apply_flow(flow);
        }
        if let Some(observer) = &mut self.observer {
            observer.on_position_changed();
        }
    }

    /// Offer a key to the active tool. Returns `true` if it was handled.
    pub fn key(&mut self, text: &str, modifiers: Modifiers) -> bool {
        let modifiers = modifiers.union(self.state.additional_modifiers);
        match self.dispatch(|tool, ctx| tool.key(ctx, text, modifiers)) {
            Some(Some(flow)) => {
                self.apply_flow(flow);
                true
            }
            _ => false,
        }
    }

    /// Forward a wheel event to the observer. Ctrl turns scrolling into
    /// zooming and shift swaps the axes.
    pub fn wheel(&mut self, dx: f64, dy: f64, modifiers: Modifiers) {
        let modifiers = modifiers.union(self.state.additional_modifiers);
        let kind = if modifiers.ctrl {
            WheelKind::Zoom
        } else {
            WheelKind::Scroll
        };
        let (dx, dy) = if modifiers.shift { (dy, dx) } else { (dx, dy) };
        if let Some(observer) = &mut self.observer {
            observer.on_wheel(dx, dy, kind);
        }
    }

    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                global,
                button,
                modifiers,
            } => self.mouse_button(position, global, button, modifiers, true),
            PointerEvent::Up {
                position,
                global,
                button,
                modifiers,
            } => self.mouse_button(position, global, button, modifiers, false),
            PointerEvent::Move { position } => self.mouse_move(position),
            PointerEvent::Scroll { delta, modifiers } => self.wheel(delta.x, delta.y, modifiers),
        }
    }

    /// Returns `true` if the active tool handled the event.
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> bool {
        match event {
            KeyEvent::Pressed { text, modifiers } => self.key(text, *modifiers),
            KeyEvent::Released { .. } => false,
        }
    }

    // Tools

    pub fn tool(&self) -> Option<&Tool> {
        self.tool.as_ref()
    }

    pub fn tool_mut(&mut self) -> Option<&mut Tool> {
        self.tool.as_mut()
    }

    /// Make `tool` the active tool. A tool that was active is dropped
    /// without reporting anything. Without a page there is nothing to work
    /// on and the tool is dropped too.
    pub fn set_tool(&mut self, tool: impl Into<Tool>) {
        let tool = tool.into();
        if self.page.is_none() {
            log::debug!("no page, dropping {:?} tool", tool.kind());
            return;
        }
        if let Some(old) = self.tool.take() {
            log::debug!("{:?} tool replaced", old.kind());
        }
        if let Some(cursor) = tool.cursor() {
            self.surface.set_cursor(cursor);
        }
        if let Some(origin) = tool.auto_origin() {
            self.state.auto_origin = Some(origin);
        }
        log::debug!("{:?} tool active", tool.kind());
        self.tool = Some(tool);
        self.update_tool();
        if let Some(observer) = &mut self.observer {
            observer.on_tool_changed(true);
        }
    }

    /// Drop the active tool and repaint everything.
    pub fn finish_tool(&mut self) {
        if let Some(tool) = self.tool.take() {
            log::debug!("{:?} tool finished", tool.kind());
        }
        self.state.dimmed = false;
        self.state.auto_origin = None;
        self.update();
        if self.state.selection_visible {
            self.surface.set_cursor(CursorKind::Standard);
        }
        if let Some(observer) = &mut self.observer {
            observer.on_tool_changed(false);
        }
    }

    /// The result of the last tool that committed, if not taken yet.
    pub fn take_report(&mut self) -> Option<ToolReport> {
        self.report.take()
    }

    fn dispatch<R>(&mut self, f: impl FnOnce(&mut Tool, &mut ToolContext<'_>) -> R) -> Option<R> {
        let tool = self.tool.as_mut()?;
        let page = self.page.as_mut()?;
        let mut ctx = ToolContext {
            state: &mut self.state,
            page,
            view: self.view,
            cascade: &self.cascade,
        };
        let result = f(tool, &mut ctx);
        self.flush();
        Some(result)
    }

    fn apply_flow(&mut self, flow: ToolFlow) {
        match flow {
            ToolFlow::Continue => {}
            ToolFlow::Finish => self.finish_tool(),
            ToolFlow::Commit(report) => {
                if let Some(observer) = &mut self.observer {
                    observer.on_tool_report(&report);
                }
                self.report = Some(report);
                self.finish_tool();
            }
        }
    }

    // Repainting

    /// Mark everything for repainting.
    pub fn update(&mut self) {
        self.state.update();
        self.flush();
    }

    /// Mark the tool overlay for repainting.
    pub fn update_tool(&mut self) {
        self.state.update_tool();
        self.flush();
    }

    /// What needs repainting since the last call.
    pub fn take_redraw(&mut self) -> Redraw {
        Redraw {
            objects: mem::take(&mut self.state.repaint_objects),
            tool: mem::take(&mut self.state.repaint_tool),
        }
    }

    fn flush(&mut self) {
        if mem::take(&mut self.state.invalidate_pending) {
            self.surface.invalidate(None);
        }
    }

    /// Draw the active tool, or the selection when no tool is active.
    /// The painter works in user coordinates.
    pub fn draw_tool(&self, painter: &mut dyn Painter) {
        let Some(page) = &self.page else {
            return;
        };
        if let Some(tool) = &self.tool {
            let ctx = DrawContext {
                zoom: self.zoom(),
                page,
                view: self.view,
                cascade: &self.cascade,
                style: &self.state.style,
            };
            tool.draw(painter, &ctx);
            return;
        }
        if !self.state.selection_visible {
            return;
        }
        let style = &self.state.style;
        for (i, obj) in page.objects().enumerate() {
            if !page.object_visible(self.view, i) {
                continue;
            }
            let (color, width) = match obj.select() {
                SelectState::Primary => {
                    (style.primary_selection_color, style.primary_selection_width)
                }
                SelectState::Secondary => {
                    (style.secondary_selection_color, style.secondary_selection_width)
                }
                SelectState::NotSelected => continue,
            };
            painter.set_stroke(style.selection_surround_color.color());
            painter.set_pen(style.selection_surround_width / self.zoom());
            obj.draw_simple(painter);
            painter.set_stroke(color.color());
            painter.set_pen(width / self.zoom());
            obj.draw_simple(painter);
        }
    }

    /// Draw the snap indicator. The painter works in device coordinates.
    pub fn draw_fifi(&self, painter: &mut dyn Painter) {
        let p = self.state.transform.user_to_dev(self.state.mouse_pos);
        let red = Color::from_rgba8(255, 0, 0, 255);
        painter.push();
        painter.transform(Affine::translate(p.to_vec2()));
        painter.set_pen(1.0);
        painter.new_path();
        match self.state.fifi_mode {
            SnapMode::None => {}
            SnapMode::Vertex => {
                painter.set_stroke(red);
                glyph(painter, &[(-8.0, 0.0), (0.0, 8.0), (8.0, 0.0), (0.0, -8.0)], true);
            }
            SnapMode::Control => {
                painter.set_stroke(red);
                painter.rect(Rect::new(-7.0, -7.0, 7.0, 7.0));
            }
            SnapMode::Boundary => {
                painter.set_stroke(red);
                plus(painter);
            }
            SnapMode::Intersection => {
                painter.set_stroke(red);
                glyph(painter, &[(-5.6, -5.6), (5.6, 5.6)], false);
                glyph(painter, &[(-5.6, 5.6), (5.6, -5.6)], false);
            }
            SnapMode::Grid => {
                painter.set_stroke(Color::from_rgba8(0, 128, 0, 255));
                plus(painter);
            }
            SnapMode::Angle | SnapMode::Custom => {
                painter.set_stroke(red);
                glyph(painter, &[(-8.0, 0.0), (8.0, 0.0)], false);
                glyph(painter, &[(-4.0, 7.0), (4.0, -7.0)], false);
                glyph(painter, &[(-4.0, -7.0), (4.0, 7.0)], false);
            }
        }
        if self.state.fifi_mode != SnapMode::None {
            painter.draw_path(PathMode::StrokedOnly);
        }
        painter.pop();
        self.state.old_fifi.set(p);
    }
}

/// Device box repainted around a fifi at `p`.
fn fifi_box(p: Point) -> Rect {
    let x = (p.x - FIFI_EXTENT).trunc();
    let y = (p.y - FIFI_EXTENT).trunc();
    Rect::new(x, y, x + 2.0 * FIFI_EXTENT + 1.0, y + 2.0 * FIFI_EXTENT + 1.0)
}

fn glyph(painter: &mut dyn Painter, points: &[(f64, f64)], closed: bool) {
    let mut iter = points.iter().map(|&(x, y)| Point::new(x, y));
    if let Some(first) = iter.next() {
        painter.move_to(first);
    }
    for p in iter {
        painter.line_to(p);
    }
    if closed {
        painter.close_path();
    }
}

fn plus(painter: &mut dyn Painter) {
    glyph(painter, &[(-8.0, 0.0), (8.0, 0.0)], false);
    glyph(painter, &[(0.0, -8.0), (0.0, 8.0)], false);
}
