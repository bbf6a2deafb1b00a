use kurbo::{Point, Rect};
use peniko::Color;

use super::{DrawContext, ToolContext, ToolFlow};
use crate::canvas::Canvas;
use crate::geom;
use crate::input::{KEY_ESCAPE, KEY_SPACE};
use crate::page::{Page, SelectState};
use crate::painter::{PathMode, Painter};

/// Squared device distance the mouse must travel before a click turns
/// into a rectangle drag.
const DRAG_THRESHOLD_SQUARED: f64 = 9.0;

/// An object close enough to the mouse-down point to be picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectCandidate {
    pub index: usize,
    pub distance: f64,
}

/// Picks objects by clicking near them or by dragging a rectangle.
///
/// In non-destructive mode (shift held by the host) the existing selection
/// is extended instead of replaced.
#[derive(Debug, Clone)]
pub struct SelectTool {
    candidates: Vec<SelectCandidate>,
    current: usize,
    mouse_down: Point,
    corner: Point,
    dragging: bool,
    select_distance: f64,
    non_destructive: bool,
}

impl SelectTool {
    /// Start selecting at the canvas' unsnapped mouse position.
    /// `select_distance` is in device pixels.
    pub fn new(canvas: &Canvas, select_distance: f64, non_destructive: bool) -> Self {
        match canvas.page() {
            Some(page) => Self::with_page(
                page,
                canvas.view(),
                canvas.unsnapped_pos(),
                canvas.zoom(),
                select_distance,
                non_destructive,
            ),
            None => Self::empty(canvas.unsnapped_pos(), select_distance, non_destructive),
        }
    }

    pub fn with_page(
        page: &Page,
        view: usize,
        mouse_down: Point,
        zoom: f64,
        select_distance: f64,
        non_destructive: bool,
    ) -> Self {
        let mut tool = Self::empty(mouse_down, select_distance, non_destructive);
        let bound = select_distance / zoom;
        for i in (0..page.count()).rev() {
            if !selectable(page, view, i) {
                continue;
            }
            let distance = page.distance(i, mouse_down, bound);
            if distance < bound {
                tool.candidates.push(SelectCandidate { index: i, distance });
            }
        }
        // Stable, so equally close objects stay topmost first.
        tool.candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        log::debug!("{} select candidates", tool.candidates.len());
        tool
    }

    fn empty(mouse_down: Point, select_distance: f64, non_destructive: bool) -> Self {
        Self {
            candidates: Vec::new(),
            current: 0,
            mouse_down,
            corner: mouse_down,
            dragging: false,
            select_distance,
            non_destructive,
        }
    }

    pub fn candidates(&self) -> &[SelectCandidate] {
        &self.candidates
    }

    /// The candidate a click would pick.
    pub fn current(&self) -> Option<SelectCandidate> {
        self.candidates.get(self.current).copied()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub(super) fn draw(&self, painter: &mut dyn Painter, ctx: &DrawContext<'_>) {
        painter.set_stroke(Color::from_rgba8(255, 0, 255, 255));
        painter.new_path();
        if self.dragging {
            painter.rect(Rect::from_points(self.mouse_down, self.corner));
            painter.draw_path(PathMode::StrokedOnly);
            return;
        }
        painter.circle(self.mouse_down, self.select_distance / ctx.zoom);
        painter.draw_path(PathMode::StrokedOnly);
        if let Some(candidate) = self.current() {
            painter.set_stroke(Color::from_rgba8(255, 0, 0, 255));
            ctx.page.object(candidate.index).draw_simple(painter);
        }
    }

    pub(super) fn mouse_button(&mut self, ctx: &mut ToolContext<'_>, press: bool) -> ToolFlow {
        if press {
            return ToolFlow::Finish;
        }
        let page = &mut *ctx.page;
        if self.dragging {
            self.select_rect(page, ctx.view);
        } else if let Some(candidate) = self.current() {
            self.select_point(page, candidate.index);
        } else if !self.non_destructive {
            page.deselect_all();
        }
        ToolFlow::Finish
    }

    pub(super) fn mouse_move(&mut self, ctx: &mut ToolContext<'_>) -> ToolFlow {
        self.corner = ctx.unsnapped_pos();
        if (self.corner - self.mouse_down).hypot2() > DRAG_THRESHOLD_SQUARED {
            self.dragging = true;
        }
        ctx.update_tool();
        ToolFlow::Continue
    }

    pub(super) fn key(&mut self, ctx: &mut ToolContext<'_>, text: &str) -> Option<ToolFlow> {
        if text == KEY_ESCAPE {
            return Some(ToolFlow::Finish);
        }
        if text == KEY_SPACE && !self.dragging && !self.candidates.is_empty() {
            self.current = (self.current + 1) % self.candidates.len();
            ctx.update_tool();
            return Some(ToolFlow::Continue);
        }
        None
    }

    fn select_rect(&self, page: &mut Page, view: usize) {
        let r = Rect::from_points(self.mouse_down, self.corner);
        // Dragging right to left also picks objects the rectangle touches.
        let touching = self.corner.x < self.mouse_down.x;
        let in_range = |page: &Page, i: usize| {
            selectable(page, view, i)
                && page.object(i).tight_bbox().is_some_and(|s| {
                    if touching {
                        geom::rects_intersect(&r, &s)
                    } else {
                        geom::rect_contains(&r, &s)
                    }
                })
        };

        if self.non_destructive {
            let mut new_primary = None;
            for i in 0..page.count() {
                if !in_range(page, i) {
                    continue;
                }
                if page.select(i).is_selected() {
                    page.set_select(i, SelectState::NotSelected);
                } else {
                    page.set_select(i, SelectState::Secondary);
                    new_primary = Some(i);
                }
            }
            match new_primary {
                Some(i) => make_primary(page, i),
                None => page.ensure_primary_selection(),
            }
        } else {
            for i in 0..page.count() {
                let state = if in_range(page, i) {
                    SelectState::Secondary
                } else {
                    SelectState::NotSelected
                };
                page.set_select(i, state);
            }
            page.ensure_primary_selection();
        }
    }

    fn select_point(&self, page: &mut Page, index: usize) {
        if self.non_destructive {
            if page.select(index).is_selected() {
                page.set_select(index, SelectState::NotSelected);
            } else {
                make_primary(page, index);
            }
            page.ensure_primary_selection();
        } else {
            page.deselect_all();
            page.set_select(index, SelectState::Primary);
        }
    }
}

fn selectable(page: &Page, view: usize, i: usize) -> bool {
    page.object_visible(view, i) && !page.is_locked(page.layer_of(i))
}

/// Select `i` as primary, demoting the old primary.
fn make_primary(page: &mut Page, i: usize) {
    if let Some(old) = page.primary_selection() {
        page.set_select(old, SelectState::Secondary);
    }
    page.set_select(i, SelectState::Primary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasState;
    use crate::page::PageObject;
    use crate::shape::Shape;
    use crate::style::Cascade;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> PageObject {
        PageObject::new(Shape::rectangle(Rect::new(x0, y0, x1, y1)))
    }

    fn release(tool: &mut SelectTool, page: &mut Page) -> ToolFlow {
        let mut state = CanvasState::default();
        let cascade = Cascade::default();
        let mut ctx = ToolContext {
            state: &mut state,
            page,
            view: 0,
            cascade: &cascade,
        };
        tool.mouse_button(&mut ctx, false)
    }

    fn drag(tool: &mut SelectTool, page: &mut Page, to: Point) {
        let mut state = CanvasState::default();
        state.unsnapped_pos = to;
        let cascade = Cascade::default();
        let mut ctx = ToolContext {
            state: &mut state,
            page,
            view: 0,
            cascade: &cascade,
        };
        tool.mouse_move(&mut ctx);
    }

    #[test]
    fn test_candidates_sorted_topmost_first_on_ties() {
        let mut page = Page::new();
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        page.insert(square(20.0, 0.0, 30.0, 10.0));
        let tool = SelectTool::with_page(&page, 0, Point::new(11.0, 5.0), 1.0, 10.0, false);
        let order: Vec<usize> = tool.candidates().iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn test_locked_and_hidden_objects_are_skipped() {
        let mut page = Page::new();
        let locked = page.add_layer("locked");
        page.set_locked(locked, true);
        page.insert(square(0.0, 0.0, 10.0, 10.0).with_layer(locked));
        let hidden = page.add_layer("hidden");
        page.set_visible(0, hidden, false);
        page.insert(square(0.0, 0.0, 10.0, 10.0).with_layer(hidden));
        let tool = SelectTool::with_page(&page, 0, Point::new(10.0, 5.0), 1.0, 10.0, false);
        assert!(tool.candidates().is_empty());
    }

    #[test]
    fn test_space_cycles_candidates() {
        let mut page = Page::new();
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        page.insert(square(12.0, 0.0, 20.0, 10.0));
        let mut tool = SelectTool::with_page(&page, 0, Point::new(11.0, 5.0), 1.0, 10.0, false);
        assert_eq!(tool.current().map(|c| c.index), Some(1));

        let mut state = CanvasState::default();
        let cascade = Cascade::default();
        let mut ctx = ToolContext {
            state: &mut state,
            page: &mut page,
            view: 0,
            cascade: &cascade,
        };
        assert_eq!(tool.key(&mut ctx, KEY_SPACE), Some(ToolFlow::Continue));
        assert_eq!(tool.current().map(|c| c.index), Some(0));
        assert_eq!(tool.key(&mut ctx, KEY_SPACE), Some(ToolFlow::Continue));
        assert_eq!(tool.current().map(|c| c.index), Some(1));
        assert_eq!(tool.key(&mut ctx, "x"), None);
        assert_eq!(tool.key(&mut ctx, KEY_ESCAPE), Some(ToolFlow::Finish));
    }

    #[test]
    fn test_small_moves_do_not_start_a_drag() {
        let mut page = Page::new();
        let mut tool = SelectTool::with_page(&page, 0, Point::ZERO, 1.0, 10.0, false);
        drag(&mut tool, &mut page, Point::new(3.0, 0.0));
        assert!(!tool.is_dragging());
        drag(&mut tool, &mut page, Point::new(3.0, 0.1));
        assert!(tool.is_dragging());
    }

    #[test]
    fn test_destructive_click_replaces_selection() {
        let mut page = Page::new();
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        page.insert(square(50.0, 0.0, 60.0, 10.0));
        page.set_select(1, SelectState::Primary);
        let mut tool = SelectTool::with_page(&page, 0, Point::new(10.0, 5.0), 1.0, 10.0, false);
        assert_eq!(release(&mut tool, &mut page), ToolFlow::Finish);
        assert_eq!(page.select(0), SelectState::Primary);
        assert_eq!(page.select(1), SelectState::NotSelected);
    }

    #[test]
    fn test_non_destructive_click_toggles() {
        let mut page = Page::new();
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        page.insert(square(50.0, 0.0, 60.0, 10.0));
        page.set_select(1, SelectState::Primary);

        let mut tool = SelectTool::with_page(&page, 0, Point::new(10.0, 5.0), 1.0, 10.0, true);
        release(&mut tool, &mut page);
        assert_eq!(page.select(0), SelectState::Primary);
        assert_eq!(page.select(1), SelectState::Secondary);

        let mut tool = SelectTool::with_page(&page, 0, Point::new(10.0, 5.0), 1.0, 10.0, true);
        release(&mut tool, &mut page);
        assert_eq!(page.select(0), SelectState::NotSelected);
        assert_eq!(page.select(1), SelectState::Primary);
    }

    #[test]
    fn test_click_on_nothing() {
        let mut page = Page::new();
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        page.set_select(0, SelectState::Primary);

        let mut tool = SelectTool::with_page(&page, 0, Point::new(100.0, 100.0), 1.0, 10.0, true);
        release(&mut tool, &mut page);
        assert_eq!(page.select(0), SelectState::Primary);

        let mut tool = SelectTool::with_page(&page, 0, Point::new(100.0, 100.0), 1.0, 10.0, false);
        release(&mut tool, &mut page);
        assert!(!page.has_selection());
    }

    #[test]
    fn test_non_destructive_drag_makes_last_new_object_primary() {
        let mut page = Page::new();
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        page.insert(square(20.0, 0.0, 30.0, 10.0));
        page.insert(square(100.0, 0.0, 110.0, 10.0));
        page.set_select(2, SelectState::Primary);

        let mut tool = SelectTool::with_page(&page, 0, Point::new(-5.0, -5.0), 1.0, 1.0, true);
        drag(&mut tool, &mut page, Point::new(40.0, 20.0));
        release(&mut tool, &mut page);
        assert_eq!(page.select(0), SelectState::Secondary);
        assert_eq!(page.select(1), SelectState::Primary);
        assert_eq!(page.select(2), SelectState::Secondary);
    }

    #[test]
    fn test_press_finishes_without_changes() {
        let mut page = Page::new();
        page.insert(square(0.0, 0.0, 10.0, 10.0));
        let mut tool = SelectTool::with_page(&page, 0, Point::new(10.0, 5.0), 1.0, 10.0, false);
        let mut state = CanvasState::default();
        let cascade = Cascade::default();
        let mut ctx = ToolContext {
            state: &mut state,
            page: &mut page,
            view: 0,
            cascade: &cascade,
        };
        assert_eq!(tool.mouse_button(&mut ctx, true), ToolFlow::Finish);
        assert!(!page.has_selection());
    }
}
