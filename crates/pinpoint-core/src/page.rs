//! The page: the ordered object list the canvas hit-tests, snaps to and
//! selects from.
//!
//! Object index is z-order. Higher indices are drawn later and so sit on
//! top; every "topmost first" iteration walks the list backwards.

use std::cell::Cell;

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::geom::{self, Closest};
use crate::painter::{PathMode, Painter};
use crate::shape::Shape;

/// Objects on a layer of this name take part in custom grid snapping.
pub const GRID_LAYER: &str = "GRID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectState {
    #[default]
    NotSelected,
    Primary,
    Secondary,
}

impl SelectState {
    pub fn is_selected(self) -> bool {
        self != SelectState::NotSelected
    }
}

/// Movement restrictions on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pinned {
    #[default]
    None,
    /// May only move vertically.
    Horizontal,
    /// May only move horizontally.
    Vertical,
    Fixed,
}

impl Pinned {
    /// Combine two pin states. Horizontal and vertical pins together fix the
    /// object completely.
    pub fn union(self, other: Pinned) -> Pinned {
        match (self, other) {
            (Pinned::None, p) | (p, Pinned::None) => p,
            (a, b) if a == b => a,
            _ => Pinned::Fixed,
        }
    }
}

/// When objects on a layer can be snapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayerSnapping {
    Never,
    #[default]
    Visible,
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub locked: bool,
    pub snapping: LayerSnapping,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locked: false,
            snapping: LayerSnapping::default(),
        }
    }
}

/// A view lists the layers it shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    pub layers: Vec<usize>,
}

/// A path object placed on the page.
#[derive(Debug, Clone)]
pub struct PageObject {
    shape: Shape,
    matrix: Affine,
    layer: usize,
    select: SelectState,
    pinned: Pinned,
    /// Bounding box including control points, dropped on transform.
    bbox: Cell<Option<Rect>>,
}

impl PageObject {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            matrix: Affine::IDENTITY,
            layer: 0,
            select: SelectState::NotSelected,
            pinned: Pinned::None,
            bbox: Cell::new(None),
        }
    }

    pub fn with_matrix(mut self, matrix: Affine) -> Self {
        self.matrix = matrix;
        self.bbox.set(None);
        self
    }

    pub fn with_layer(mut self, layer: usize) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_pinned(mut self, pinned: Pinned) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn select(&self) -> SelectState {
        self.select
    }

    pub fn pinned(&self) -> Pinned {
        self.pinned
    }

    /// Bounding box including control points. Empty shapes collapse to
    /// their origin.
    pub fn bbox(&self) -> Rect {
        if let Some(r) = self.bbox.get() {
            return r;
        }
        let origin = self.matrix * Point::ZERO;
        let r = self
            .shape
            .bbox(self.matrix, true)
            .unwrap_or_else(|| Rect::from_points(origin, origin));
        self.bbox.set(Some(r));
        r
    }

    /// Bounding box of the drawn geometry only.
    pub fn tight_bbox(&self) -> Option<Rect> {
        self.shape.bbox(self.matrix, false)
    }

    /// Distance from `v`, capped at `bound`.
    pub fn distance(&self, v: Point, bound: f64) -> f64 {
        if geom::certain_clearance(&self.bbox(), v, bound) {
            return bound;
        }
        self.shape.distance(v, self.matrix, bound)
    }

    pub fn snap_vtx(&self, mouse: Point, best: &mut Closest, ctl: bool) {
        if geom::certain_clearance(&self.bbox(), mouse, best.bound) {
            return;
        }
        self.shape.snap_vtx(mouse, self.matrix, best, ctl);
    }

    pub fn snap_bnd(&self, mouse: Point, best: &mut Closest) {
        if geom::certain_clearance(&self.bbox(), mouse, best.bound) {
            return;
        }
        self.shape.snap_bnd(mouse, self.matrix, best);
    }

    /// Outline the object with the painter's current stroke.
    pub fn draw_simple(&self, painter: &mut dyn Painter) {
        painter.new_path();
        painter.add_bez_path(&self.shape.to_bez_path(self.matrix));
        painter.draw_path(PathMode::StrokedOnly);
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    objects: Vec<PageObject>,
    layers: Vec<Layer>,
    views: Vec<View>,
}

impl Default for Page {
    /// A page with one layer shown by one view.
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            layers: vec![Layer::new("alpha")],
            views: vec![View { layers: vec![0] }],
        }
    }
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer, visible in every existing view.
    pub fn add_layer(&mut self, name: impl Into<String>) -> usize {
        let index = self.layers.len();
        self.layers.push(Layer::new(name));
        for view in &mut self.views {
            view.layers.push(index);
        }
        index
    }

    pub fn count_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, layer: usize) -> Option<&Layer> {
        self.layers.get(layer)
    }

    pub fn find_layer(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    pub fn set_locked(&mut self, layer: usize, locked: bool) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.locked = locked;
        }
    }

    pub fn is_locked(&self, layer: usize) -> bool {
        self.layers.get(layer).is_some_and(|l| l.locked)
    }

    pub fn set_snapping(&mut self, layer: usize, snapping: LayerSnapping) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.snapping = snapping;
        }
    }

    pub fn add_view(&mut self, layers: Vec<usize>) -> usize {
        self.views.push(View { layers });
        self.views.len() - 1
    }

    pub fn count_views(&self) -> usize {
        self.views.len()
    }

    pub fn set_visible(&mut self, view: usize, layer: usize, visible: bool) {
        let Some(v) = self.views.get_mut(view) else {
            return;
        };
        let shown = v.layers.contains(&layer);
        if visible && !shown {
            v.layers.push(layer);
        } else if !visible {
            v.layers.retain(|&l| l != layer);
        }
    }

    pub fn layer_visible(&self, view: usize, layer: usize) -> bool {
        self.views.get(view).is_some_and(|v| v.layers.contains(&layer))
    }

    /// Append an object on top. Returns its index.
    pub fn insert(&mut self, object: PageObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, i: usize) -> &PageObject {
        &self.objects[i]
    }

    pub fn objects(&self) -> impl Iterator<Item = &PageObject> {
        self.objects.iter()
    }

    pub fn layer_of(&self, i: usize) -> usize {
        self.objects[i].layer
    }

    pub fn object_visible(&self, view: usize, i: usize) -> bool {
        self.layer_visible(view, self.layer_of(i))
    }

    /// Whether snapping may use object `i` while `view` is shown.
    pub fn obj_snaps_in_view(&self, i: usize, view: usize) -> bool {
        let layer = self.layer_of(i);
        match self.layers.get(layer).map(|l| l.snapping) {
            Some(LayerSnapping::Always) => true,
            Some(LayerSnapping::Visible) => self.layer_visible(view, layer),
            Some(LayerSnapping::Never) | None => false,
        }
    }

    pub fn select(&self, i: usize) -> SelectState {
        self.objects[i].select
    }

    /// Making `i` primary demotes the previous primary to secondary.
    pub fn set_select(&mut self, i: usize, state: SelectState) {
        if state == SelectState::Primary {
            for obj in &mut self.objects {
                if obj.select == SelectState::Primary {
                    obj.select = SelectState::Secondary;
                }
            }
        }
        self.objects[i].select = state;
    }

    pub fn deselect_all(&mut self) {
        for obj in &mut self.objects {
            obj.select = SelectState::NotSelected;
        }
    }

    pub fn has_selection(&self) -> bool {
        self.objects.iter().any(|o| o.select.is_selected())
    }

    pub fn primary_selection(&self) -> Option<usize> {
        self.objects
            .iter()
            .position(|o| o.select == SelectState::Primary)
    }

    /// Make sure a selection has a primary object: if none is primary, the
    /// topmost secondary is promoted.
    pub fn ensure_primary_selection(&mut self) {
        if self.primary_selection().is_some() {
            return;
        }
        if let Some(obj) = self
            .objects
            .iter_mut()
            .rev()
            .find(|o| o.select == SelectState::Secondary)
        {
            obj.select = SelectState::Primary;
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.objects.len()).filter(|&i| self.objects[i].select.is_selected())
    }

    /// Bounding box of object `i`, control points included.
    pub fn bbox(&self, i: usize) -> Rect {
        self.objects[i].bbox()
    }

    pub fn distance(&self, i: usize, v: Point, bound: f64) -> f64 {
        self.objects[i].distance(v, bound)
    }

    pub fn snap_vtx(&self, i: usize, mouse: Point, best: &mut Closest) {
        self.objects[i].snap_vtx(mouse, best, false);
    }

    pub fn snap_ctl(&self, i: usize, mouse: Point, best: &mut Closest) {
        self.objects[i].snap_vtx(mouse, best, true);
    }

    pub fn snap_bnd(&self, i: usize, mouse: Point, best: &mut Closest) {
        self.objects[i].snap_bnd(mouse, best);
    }

    /// Apply `m` on top of object `i`'s matrix.
    pub fn transform(&mut self, i: usize, m: Affine) {
        let obj = &mut self.objects[i];
        obj.matrix = m * obj.matrix;
        obj.bbox.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64) -> PageObject {
        PageObject::new(Shape::rectangle(Rect::new(x, y, x + 10.0, y + 10.0)))
    }

    #[test]
    fn test_default_page_shows_its_layer() {
        let mut page = Page::new();
        let i = page.insert(square(0.0, 0.0));
        assert_eq!(page.count_layers(), 1);
        assert!(page.object_visible(0, i));
        assert!(!page.object_visible(1, i));
        assert!(page.obj_snaps_in_view(i, 0));
    }

    #[test]
    fn test_pinned_union() {
        assert_eq!(Pinned::None.union(Pinned::Vertical), Pinned::Vertical);
        assert_eq!(Pinned::Vertical.union(Pinned::Vertical), Pinned::Vertical);
        assert_eq!(Pinned::Horizontal.union(Pinned::Vertical), Pinned::Fixed);
        assert_eq!(Pinned::Fixed.union(Pinned::None), Pinned::Fixed);
    }

    #[test]
    fn test_ensure_primary_promotes_topmost_secondary() {
        let mut page = Page::new();
        for i in 0..3 {
            page.insert(square(i as f64 * 20.0, 0.0));
        }
        page.set_select(0, SelectState::Secondary);
        page.set_select(1, SelectState::Secondary);
        page.ensure_primary_selection();
        assert_eq!(page.primary_selection(), Some(1));
        assert_eq!(page.select(0), SelectState::Secondary);

        page.ensure_primary_selection();
        assert_eq!(page.primary_selection(), Some(1));
        assert_eq!(page.selected().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_new_primary_demotes_old_one() {
        let mut page = Page::new();
        for i in 0..3 {
            page.insert(square(i as f64 * 20.0, 0.0));
        }
        page.set_select(0, SelectState::Primary);
        page.set_select(1, SelectState::Primary);
        assert_eq!(page.select(0), SelectState::Secondary);
        assert_eq!(page.select(1), SelectState::Primary);
        assert_eq!(
            page.objects().filter(|o| o.select() == SelectState::Primary).count(),
            1
        );

        page.set_select(1, SelectState::Primary);
        assert_eq!(page.primary_selection(), Some(1));
        page.set_select(2, SelectState::Secondary);
        assert_eq!(page.primary_selection(), Some(1));
    }

    #[test]
    fn test_layer_snapping_modes() {
        let mut page = Page::new();
        let hidden = page.add_layer("hidden");
        page.set_visible(0, hidden, false);
        let i = page.insert(square(0.0, 0.0).with_layer(hidden));
        assert!(!page.obj_snaps_in_view(i, 0));
        page.set_snapping(hidden, LayerSnapping::Always);
        assert!(page.obj_snaps_in_view(i, 0));
        page.set_visible(0, hidden, true);
        page.set_snapping(hidden, LayerSnapping::Never);
        assert!(!page.obj_snaps_in_view(i, 0));
        assert_eq!(page.find_layer("hidden"), Some(hidden));
    }

    #[test]
    fn test_transform_refreshes_bbox() {
        let mut page = Page::new();
        let i = page.insert(square(0.0, 0.0));
        assert_eq!(page.bbox(i), Rect::new(0.0, 0.0, 10.0, 10.0));
        page.transform(i, Affine::translate((5.0, 5.0)));
        assert_eq!(page.bbox(i), Rect::new(5.0, 5.0, 15.0, 15.0));
    }

    #[test]
    fn test_distance_uses_clearance() {
        let mut page = Page::new();
        let i = page.insert(square(0.0, 0.0));
        assert_eq!(page.distance(i, Point::new(100.0, 100.0), 4.0), 4.0);
        assert!((page.distance(i, Point::new(12.0, 5.0), 4.0) - 2.0).abs() < 1e-9);
    }
}
