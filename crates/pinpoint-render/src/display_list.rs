//! A [`Painter`] that records what it is asked to draw.

use kurbo::{Affine, BezPath, Point, Rect, Shape as _};
use peniko::Color;
use pinpoint_core::{PathMode, Painter};

/// One painted path, with the graphics state it was painted in.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// The path in the coordinates it was built in.
    pub path: BezPath,
    /// Maps `path` to device coordinates (or to whatever space the list
    /// started in).
    pub transform: Affine,
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub pen: f64,
    pub dash: Vec<f64>,
}

impl DrawCommand {
    /// The path with its transform applied.
    pub fn transformed_path(&self) -> BezPath {
        self.transform * self.path.clone()
    }

    /// Bounds of the transformed path, ignoring the pen width.
    pub fn bounding_box(&self) -> Rect {
        self.transformed_path().bounding_box()
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    transform: Affine,
    stroke: Color,
    fill: Color,
    pen: f64,
    dash: Vec<f64>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            stroke: Color::from_rgba8(0, 0, 0, 255),
            fill: Color::from_rgba8(255, 255, 255, 255),
            pen: 1.0,
            dash: Vec::new(),
        }
    }
}

/// Flat list of draw commands, replayable by any backend.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    path: BezPath,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forget all commands and reset the graphics state.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.state = GraphicsState::default();
        self.stack.clear();
        self.path = BezPath::new();
    }

    /// Union of the bounds of all commands.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.commands
            .iter()
            .map(DrawCommand::bounding_box)
            .reduce(|a, b| a.union(b))
    }
}

impl Painter for DisplayList {
    fn push(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn pop(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => log::warn!("unbalanced pop on display list"),
        }
    }

    fn transform(&mut self, m: Affine) {
        self.state.transform *= m;
    }

    fn set_stroke(&mut self, color: Color) {
        self.state.stroke = color;
    }

    fn set_fill(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn set_pen(&mut self, width: f64) {
        self.state.pen = width;
    }

    fn set_dash(&mut self, dashes: &[f64]) {
        self.state.dash = dashes.to_vec();
    }

    fn new_path(&mut self) {
        self.path = BezPath::new();
    }

    fn move_to(&mut self, p: Point) {
        self.path.move_to(p);
    }

    fn line_to(&mut self, p: Point) {
        self.path.line_to(p);
    }

    fn curve_to(&mut self, p1: Point, p2: Point, p3: Point) {
        self.path.curve_to(p1, p2, p3);
    }

    fn close_path(&mut self) {
        self.path.close_path();
    }

    fn draw_path(&mut self, mode: PathMode) {
        if self.path.elements().is_empty() {
            log::trace!("skipping empty path");
            return;
        }
        let (stroke, fill) = match mode {
            PathMode::StrokedOnly => (Some(self.state.stroke), None),
            PathMode::StrokedAndFilled => (Some(self.state.stroke), Some(self.state.fill)),
            PathMode::FilledOnly => (None, Some(self.state.fill)),
        };
        self.commands.push(DrawCommand {
            path: std::mem::take(&mut self.path),
            transform: self.state.transform,
            stroke,
            fill,
            pen: self.state.pen,
            dash: self.state.dash.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    #[test]
    fn test_records_state_with_each_path() {
        let mut list = DisplayList::new();
        let red = Color::from_rgba8(255, 0, 0, 255);
        list.push();
        list.translate(Vec2::new(10.0, 0.0));
        list.set_stroke(red);
        list.set_pen(2.0);
        list.set_dash(&[3.0, 7.0]);
        list.new_path();
        list.rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        list.draw_path(PathMode::StrokedOnly);
        list.pop();

        list.new_path();
        list.rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        list.draw_path(PathMode::FilledOnly);

        let [first, second] = list.commands() else {
            panic!("expected two commands, got {}", list.len());
        };
        assert_eq!(first.stroke, Some(red));
        assert_eq!(first.fill, None);
        assert_eq!(first.pen, 2.0);
        assert_eq!(first.dash, vec![3.0, 7.0]);
        assert_eq!(first.bounding_box(), Rect::new(10.0, 0.0, 14.0, 4.0));

        assert_eq!(second.stroke, None);
        assert!(second.fill.is_some());
        assert_eq!(second.pen, 1.0);
        assert!(second.dash.is_empty());
        assert_eq!(second.transform, Affine::IDENTITY);
    }

    #[test]
    fn test_empty_paths_are_dropped() {
        let mut list = DisplayList::new();
        list.new_path();
        list.draw_path(PathMode::StrokedOnly);
        assert!(list.is_empty());
        assert_eq!(list.bounding_box(), None);
    }

    #[test]
    fn test_unbalanced_pop_keeps_state() {
        let mut list = DisplayList::new();
        list.set_pen(4.0);
        list.pop();
        list.new_path();
        list.move_to(Point::ZERO);
        list.line_to(Point::new(1.0, 1.0));
        list.draw_path(PathMode::StrokedOnly);
        assert_eq!(list.commands()[0].pen, 4.0);
    }

    #[test]
    fn test_clear() {
        let mut list = DisplayList::new();
        list.translate(Vec2::new(1.0, 1.0));
        list.new_path();
        list.circle(Point::ZERO, 1.0);
        list.draw_path(PathMode::StrokedAndFilled);
        assert_eq!(list.len(), 1);
        list.clear();
        assert!(list.is_empty());
        list.new_path();
        list.move_to(Point::ZERO);
        list.line_to(Point::new(1.0, 0.0));
        list.draw_path(PathMode::StrokedOnly);
        assert_eq!(list.commands()[0].transform, Affine::IDENTITY);
    }
}
