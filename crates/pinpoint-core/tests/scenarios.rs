//! End-to-end behaviour of the canvas, driven the way a host drives it.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::{Affine, Point, Rect};
use pinpoint_core::{
    Canvas, CanvasObserver, Cascade, Modifiers, MouseButton, NullSurface, Page, PageObject,
    PanTool, Pinned, PointerEvent, SelectState, SelectTool, Shape, SnapConfig, SnapMode, SnapModes,
    ToolReport, TransformKind, TransformTool,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A 200 x 200 device showing `page` at zoom 1, user origin in the middle.
fn canvas_with(page: Page) -> Canvas {
    init_logging();
    let mut canvas = Canvas::new(NullSurface);
    canvas.set_surface_size(200.0, 200.0);
    canvas.set_page(page, 0, Cascade::default());
    canvas
}

fn device(canvas: &Canvas, user: Point) -> Point {
    canvas.transform().user_to_dev(user)
}

fn press(canvas: &mut Canvas, at: Point) {
    canvas.mouse_button(at, at, MouseButton::Left, Modifiers::NONE, true);
}

fn release(canvas: &mut Canvas, at: Point) {
    canvas.mouse_button(at, at, MouseButton::Left, Modifiers::NONE, false);
}

fn rect_object(x0: f64, y0: f64, x1: f64, y1: f64) -> PageObject {
    PageObject::new(Shape::rectangle(Rect::new(x0, y0, x1, y1)))
}

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-9
}

#[derive(Clone, Default)]
struct Reports(Rc<RefCell<Vec<ToolReport>>>);

impl CanvasObserver for Reports {
    fn on_tool_report(&mut self, report: &ToolReport) {
        self.0.borrow_mut().push(*report);
    }
}

#[test]
fn pan_moves_view_by_drag_distance() {
    let mut canvas = canvas_with(Page::new());
    canvas.set_zoom(2.0);

    canvas.mouse_move(Point::new(100.0, 100.0));
    assert!(close(canvas.unsnapped_pos(), Point::ZERO));
    canvas.set_tool(PanTool::new(&canvas));

    canvas.mouse_move(Point::new(120.0, 90.0));
    assert!(close(canvas.unsnapped_pos(), Point::new(10.0, 5.0)));
    release(&mut canvas, Point::new(120.0, 90.0));

    assert!(canvas.tool().is_none());
    assert!(close(canvas.pan(), Point::new(-10.0, -5.0)));
}

#[test]
fn pan_press_cancels() {
    let mut canvas = canvas_with(Page::new());
    canvas.mouse_move(Point::new(100.0, 100.0));
    canvas.set_tool(PanTool::new(&canvas));
    canvas.mouse_move(Point::new(150.0, 100.0));
    press(&mut canvas, Point::new(150.0, 100.0));
    assert!(canvas.tool().is_none());
    assert_eq!(canvas.pan(), Point::ZERO);
}

#[test]
fn device_user_round_trip() {
    let mut canvas = canvas_with(Page::new());
    canvas.set_zoom(3.7);
    canvas.set_pan(Point::new(-12.0, 40.5));
    let t = canvas.transform();
    for v in [Point::ZERO, Point::new(1e3, -2e3), Point::new(0.125, 7.0)] {
        let back = t.dev_to_user(t.user_to_dev(v));
        assert!((back - v).hypot() < 1e-9);
    }
}

fn two_boxes() -> Page {
    let mut page = Page::new();
    page.insert(rect_object(10.0, 10.0, 20.0, 20.0));
    page.insert(rect_object(25.0, 10.0, 40.0, 20.0));
    page
}

fn drag_select(canvas: &mut Canvas, from: Point, to: Point) {
    let from = device(canvas, from);
    let to = device(canvas, to);
    canvas.mouse_move(from);
    canvas.set_tool(SelectTool::new(canvas, 10.0, false));
    canvas.mouse_move(to);
    release(canvas, to);
    assert!(canvas.tool().is_none());
}

#[test]
fn rectangle_select_right_to_left_takes_touched_objects() {
    let mut canvas = canvas_with(two_boxes());
    drag_select(&mut canvas, Point::new(30.0, 25.0), Point::new(5.0, 5.0));
    let page = canvas.page().unwrap();
    assert!(page.select(0).is_selected());
    assert!(page.select(1).is_selected());
    assert_eq!(page.primary_selection(), Some(1));
}

#[test]
fn rectangle_select_left_to_right_takes_enclosed_objects() {
    let mut canvas = canvas_with(two_boxes());
    drag_select(&mut canvas, Point::new(5.0, 5.0), Point::new(30.0, 25.0));
    let page = canvas.page().unwrap();
    assert_eq!(page.select(0), SelectState::Primary);
    assert_eq!(page.select(1), SelectState::NotSelected);
}

#[test]
fn non_destructive_select_then_deselect_restores_selection() {
    let mut page = two_boxes();
    page.set_select(1, SelectState::Primary);
    let mut canvas = canvas_with(page);
    let at = device(&canvas, Point::new(10.0, 15.0));

    for _ in 0..2 {
        canvas.mouse_move(at);
        canvas.set_tool(SelectTool::new(&canvas, 10.0, true));
        release(&mut canvas, at);
    }

    let page = canvas.page().unwrap();
    assert_eq!(page.select(0), SelectState::NotSelected);
    assert_eq!(page.select(1), SelectState::Primary);
}

#[test]
fn grid_snap_through_canvas() {
    let mut canvas = canvas_with(Page::new());
    canvas.set_snap(SnapConfig {
        modes: SnapModes::GRID,
        grid_size: 8.0,
        ..SnapConfig::default()
    });
    let at = device(&canvas, Point::new(33.0, 2.0));
    canvas.mouse_move(at);
    assert_eq!(canvas.pos(), Point::new(32.0, 0.0));
    assert_eq!(canvas.fifi_mode(), SnapMode::Grid);
    assert!(close(canvas.unsnapped_pos(), Point::new(33.0, 2.0)));
}

#[test]
fn paper_corner_is_the_fallback() {
    let mut canvas = canvas_with(Page::new());
    canvas.set_snap(SnapConfig {
        modes: SnapModes::VERTEX,
        ..SnapConfig::default()
    });
    let at = device(&canvas, Point::new(3.0, -2.0));
    canvas.mouse_move(at);
    assert_eq!(canvas.pos(), Point::ZERO);
    assert_eq!(canvas.fifi_mode(), SnapMode::Vertex);
}

fn selected_page(pinned: Pinned) -> Page {
    let mut page = two_boxes();
    for i in 0..page.count() {
        page.set_select(i, SelectState::Secondary);
    }
    page.ensure_primary_selection();
    let mut pinned_page = Page::new();
    for (i, obj) in page.objects().enumerate() {
        let j = pinned_page.insert(obj.clone().with_pinned(pinned));
        pinned_page.set_select(j, page.select(i));
    }
    pinned_page
}

#[test]
fn fixed_selection_only_translates() {
    let mut canvas = canvas_with(selected_page(Pinned::Fixed));
    canvas.mouse_move(device(&canvas, Point::new(50.0, 50.0)));
    assert!(!TransformTool::new(&canvas, TransformKind::Rotate, false).is_valid());
    assert!(TransformTool::new(&canvas, TransformKind::Translate, false).is_valid());
}

#[test]
fn transform_at_mouse_down_is_identity() {
    for kind in [TransformKind::Translate, TransformKind::Rotate, TransformKind::Scale] {
        let mut canvas = canvas_with(selected_page(Pinned::None));
        let reports = Reports::default();
        canvas.set_observer(Some(Box::new(reports.clone())));
        let at = device(&canvas, Point::new(38.0, 19.0));
        canvas.mouse_move(at);

        let tool = TransformTool::new(&canvas, kind, false);
        assert!(tool.is_valid(), "{kind:?}");
        canvas.set_tool(tool);
        release(&mut canvas, at);

        let Some(ToolReport::Transform { kind: reported, matrix }) = canvas.take_report() else {
            panic!("{kind:?} did not report");
        };
        assert_eq!(reported, kind);
        for p in [Point::ZERO, Point::new(17.0, -3.0)] {
            assert!(close(matrix * p, p), "{kind:?}");
        }
        assert_eq!(reports.0.borrow().len(), 1);
        assert!(canvas.auto_origin().is_none());
    }
}

#[test]
fn translate_reports_drag() {
    let mut canvas = canvas_with(selected_page(Pinned::None));
    canvas.mouse_move(device(&canvas, Point::new(15.0, 15.0)));
    canvas.set_tool(TransformTool::new(&canvas, TransformKind::Translate, false));
    assert_eq!(canvas.auto_origin(), Some(Point::new(15.0, 15.0)));

    let to = device(&canvas, Point::new(25.0, 10.0));
    canvas.mouse_move(to);
    release(&mut canvas, to);
    assert_eq!(
        canvas.take_report(),
        Some(ToolReport::Transform {
            kind: TransformKind::Translate,
            matrix: Affine::translate((10.0, -5.0)),
        })
    );
    assert_eq!(canvas.take_report(), None);
}

#[test]
fn replacing_a_tool_never_commits_it() {
    let mut canvas = canvas_with(selected_page(Pinned::None));
    let reports = Reports::default();
    canvas.set_observer(Some(Box::new(reports.clone())));
    canvas.mouse_move(device(&canvas, Point::new(15.0, 15.0)));
    canvas.set_tool(TransformTool::new(&canvas, TransformKind::Translate, false));
    canvas.mouse_move(device(&canvas, Point::new(30.0, 15.0)));

    canvas.set_tool(PanTool::new(&canvas));
    assert!(matches!(canvas.tool(), Some(pinpoint_core::Tool::Pan(_))));
    assert!(canvas.take_report().is_none());
    assert!(reports.0.borrow().is_empty());

    let page = canvas.page().unwrap();
    assert_eq!(page.bbox(0), Rect::new(10.0, 10.0, 20.0, 20.0));
}

#[test]
fn pointer_events_drive_the_canvas() {
    let mut canvas = canvas_with(Page::new());
    canvas.handle_pointer_event(PointerEvent::Move {
        position: Point::new(110.0, 90.0),
    });
    assert!(close(canvas.unsnapped_pos(), Point::new(10.0, 10.0)));
    canvas.set_tool(PanTool::new(&canvas));
    canvas.handle_pointer_event(PointerEvent::Up {
        position: Point::new(100.0, 100.0),
        global: Point::new(500.0, 400.0),
        button: MouseButton::Left,
        modifiers: Modifiers::NONE,
    });
    assert!(canvas.tool().is_none());
    assert_eq!(canvas.global_pos(), Point::new(500.0, 400.0));
    assert!(close(canvas.pan(), Point::new(10.0, 10.0)));
}
