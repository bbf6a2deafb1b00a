//! Snapping: finding attraction points near the mouse.
//!
//! Every search uses the same protocol. A [`Closest`] starts at the mouse
//! with the snap radius as its bound, and each candidate (vertex, boundary
//! point, intersection, ...) is offered to it. A candidate is only taken
//! if it is strictly closer than everything before, so the radius shrinks
//! monotonically during one search.

use std::f64::consts::FRAC_PI_6;

use bitflags::bitflags;
use kurbo::{CubicBez, Line, Point};
use serde::{Deserialize, Serialize};

use crate::geom::{self, Arc, AxisLine, Closest};
use crate::page::{GRID_LAYER, Page};
use crate::style::Layout;

/// Default grid spacing in user units.
pub const DEFAULT_GRID_SIZE: f64 = 8.0;
/// Default snap radius in device pixels.
pub const DEFAULT_SNAP_DISTANCE: f64 = 10.0;

/// Radius used when picking the edge that defines the axes.
const EDGE_PICK_DISTANCE: f64 = 2.0;

bitflags! {
    /// The set of enabled snap modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SnapModes: u16 {
        const VERTEX = 1 << 0;
        const CONTROL = 1 << 1;
        const BOUNDARY = 1 << 2;
        const INTERSECTION = 1 << 3;
        const GRID = 1 << 4;
        const ANGLE = 1 << 5;
        /// Angular snapping around the auto-origin set by a translate tool.
        const AUTO = 1 << 6;
        /// Intersections among objects on the GRID layer.
        const CUSTOM = 1 << 7;
    }
}

/// The mode that produced a snap position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SnapMode {
    #[default]
    None,
    Vertex,
    Control,
    Boundary,
    Intersection,
    Grid,
    Angle,
    Custom,
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point, or the input point when nothing snapped.
    pub point: Point,
    pub mode: SnapMode,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            mode: SnapMode::None,
        }
    }

    fn new(point: Point, mode: SnapMode) -> Self {
        Self { point, mode }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.mode != SnapMode::None
    }
}

/// A source of snap vertices other than the page, such as a shape that is
/// still being drawn.
pub trait VertexSnap {
    fn snap_vtx(&self, mouse: Point, best: &mut Closest, ctl: bool);
}

/// Snap to the nearest grid point. Halves round away from zero.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// Edges of snapping objects that pass close to the mouse.
#[derive(Debug, Clone, Default)]
pub struct Edges {
    pub segments: Vec<Line>,
    pub arcs: Vec<Arc>,
    pub beziers: Vec<CubicBez>,
    /// True where a cubic continues the previous one of the same curve.
    pub beziers_cont: Vec<bool>,
}

impl Edges {
    /// Collect edges within `bound` of `mouse`: from every object that snaps
    /// in `view`, or with `view == None` from the objects on the GRID layer.
    pub fn collect(mouse: Point, bound: f64, page: &Page, view: Option<usize>) -> Self {
        let mut edges = Edges::default();
        let include: Box<dyn Fn(usize) -> bool + '_> = match view {
            Some(view) => Box::new(move |i| page.obj_snaps_in_view(i, view)),
            None => match page.find_layer(GRID_LAYER) {
                Some(grid) => Box::new(move |i| page.layer_of(i) == grid),
                None => return edges,
            },
        };
        for i in (0..page.count()).filter(|&i| include(i)) {
            let obj = page.object(i);
            obj.shape().collect_edges(mouse, obj.matrix(), bound, &mut edges);
        }
        edges
    }

    pub fn push_segment(&mut self, seg: Line) {
        self.segments.push(seg);
    }

    pub fn push_arc(&mut self, arc: Arc) {
        self.arcs.push(arc);
    }

    pub fn push_bezier(&mut self, bez: CubicBez, cont: bool) {
        self.beziers.push(bez);
        self.beziers_cont.push(cont);
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.arcs.is_empty() && self.beziers.is_empty()
    }

    /// All pairwise intersections between the collected edges.
    pub fn intersections(&self) -> Vec<Point> {
        let mut pts = Vec::new();
        for (i, a) in self.segments.iter().enumerate() {
            for b in &self.segments[i + 1..] {
                pts.extend(geom::segment_intersection(*a, *b));
            }
        }
        for (i, a) in self.beziers.iter().enumerate() {
            for j in i + 1..self.beziers.len() {
                // Neighbouring pieces of one curve only touch at their joint.
                if j > i + 1 || !self.beziers_cont[j] {
                    geom::bezier_intersections(a, &self.beziers[j], &mut pts);
                }
            }
            for seg in &self.segments {
                geom::bezier_segment_intersections(a, *seg, &mut pts);
            }
        }
        for (i, a) in self.arcs.iter().enumerate() {
            for b in &self.arcs[i + 1..] {
                a.intersect_arc(b, &mut pts);
            }
            for bez in &self.beziers {
                a.intersect_bezier(bez, &mut pts);
            }
            for seg in &self.segments {
                a.intersect_segment(*seg, &mut pts);
            }
        }
        pts
    }

    /// Intersections of the collected edges with an infinite line.
    pub fn line_intersections(&self, line: &AxisLine) -> Vec<Point> {
        let mut pts: Vec<Point> = self
            .segments
            .iter()
            .filter_map(|s| geom::segment_line_intersection(*s, line))
            .collect();
        for arc in &self.arcs {
            arc.intersect_line(line, &mut pts);
        }
        for bez in &self.beziers {
            geom::bezier_line_intersections(bez, line, &mut pts);
        }
        pts
    }
}

/// Snap settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    pub modes: SnapModes,
    pub grid_visible: bool,
    pub grid_size: f64,
    /// Angular step for angle snapping, in radians.
    pub angle_size: f64,
    /// Snap radius in device pixels.
    pub snap_distance: f64,
    /// Use `origin` and `dir` as the axis system.
    pub with_axes: bool,
    pub origin: Point,
    /// Direction of the x axis, in radians.
    pub dir: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            modes: SnapModes::empty(),
            grid_visible: false,
            grid_size: DEFAULT_GRID_SIZE,
            angle_size: FRAC_PI_6,
            snap_distance: DEFAULT_SNAP_DISTANCE,
            with_axes: false,
            origin: Point::ZERO,
            dir: 0.0,
        }
    }
}

impl SnapConfig {
    /// The line through `base` whose direction is the multiple of
    /// `angle_size` (measured from `dir`) closest to the mouse direction.
    /// Too close to `base` the direction is `dir` itself.
    pub fn get_line(&self, mouse: Point, base: Point) -> AxisLine {
        let d = mouse - base;
        let mut alpha = self.dir;
        if d.hypot() > 2.0 && self.angle_size > 0.0 {
            let a = geom::normalize_angle(d.atan2() - self.dir, 0.0);
            alpha = self.angle_size * (a / self.angle_size + 0.5).floor() + self.dir;
        }
        AxisLine::from_angle(base, alpha)
    }

    /// Offer every intersection of nearby edges to `best`.
    pub fn intersection_snap(&self, pos: Point, page: &Page, view: Option<usize>, best: &mut Closest) {
        let edges = Edges::collect(pos, best.bound, page, view);
        for p in edges.intersections() {
            best.offer_vertex(pos, p);
        }
    }

    /// The intersection of `line` with a nearby edge closest to `pos`.
    pub fn snap_angular_intersection(
        &self,
        pos: Point,
        line: &AxisLine,
        page: &Page,
        view: usize,
        snap_dist: f64,
    ) -> Option<Point> {
        let edges = Edges::collect(pos, snap_dist, page, Some(view));
        let mut best = Closest::new(pos, snap_dist);
        let mut found = false;
        for p in edges.line_intersections(line) {
            found |= best.offer_vertex(pos, p);
        }
        found.then_some(best.pos)
    }

    /// Vertex, control point, intersection, boundary, custom and grid
    /// snapping, without angular modes.
    pub fn simple_snap(
        &self,
        pos: Point,
        page: &Page,
        view: usize,
        snap_dist: f64,
        tool: Option<&dyn VertexSnap>,
    ) -> SnapResult {
        let snapping: Vec<usize> = (0..page.count())
            .filter(|&i| page.obj_snaps_in_view(i, view))
            .collect();

        // Vertices, control points and intersections share one radius.
        let mut vtx = Closest::new(pos, snap_dist);
        if self.modes.contains(SnapModes::VERTEX) {
            for &i in &snapping {
                page.snap_vtx(i, pos, &mut vtx);
            }
            if let Some(tool) = tool {
                tool.snap_vtx(pos, &mut vtx, false);
            }
        }
        let dvtx = vtx.bound;

        let mut ctl = Closest::new(pos, dvtx);
        if self.modes.contains(SnapModes::CONTROL) {
            for &i in &snapping {
                page.snap_ctl(i, pos, &mut ctl);
            }
            if let Some(tool) = tool {
                tool.snap_vtx(pos, &mut ctl, true);
            }
        }
        let dctl = ctl.bound;

        let mut int = Closest::new(pos, dctl);
        if self.modes.contains(SnapModes::INTERSECTION) {
            self.intersection_snap(pos, page, Some(view), &mut int);
        }

        if int.bound < dctl {
            return SnapResult::new(int.pos, SnapMode::Intersection);
        } else if dctl < dvtx {
            return SnapResult::new(ctl.pos, SnapMode::Control);
        } else if dvtx < snap_dist {
            return SnapResult::new(vtx.pos, SnapMode::Vertex);
        }

        if self.modes.contains(SnapModes::BOUNDARY) {
            let mut bnd = Closest::new(pos, snap_dist);
            for &i in &snapping {
                page.snap_bnd(i, pos, &mut bnd);
            }
            if bnd.bound < snap_dist {
                return SnapResult::new(bnd.pos, SnapMode::Boundary);
            }
        }

        if self.modes.contains(SnapModes::CUSTOM) {
            let mut custom = Closest::new(pos, snap_dist);
            self.intersection_snap(pos, page, None, &mut custom);
            if custom.bound < snap_dist {
                return SnapResult::new(custom.pos, SnapMode::Custom);
            }
        }

        if self.modes.contains(SnapModes::GRID) && self.grid_size > 0.0 {
            return SnapResult::new(snap_to_grid(pos, self.grid_size), SnapMode::Grid);
        }

        SnapResult::none(pos)
    }

    /// Snap `pos`, angular modes first. `auto_origin` enables automatic
    /// angular snapping around that point.
    pub fn snap(
        &self,
        pos: Point,
        page: &Page,
        view: usize,
        snap_dist: f64,
        tool: Option<&dyn VertexSnap>,
        auto_origin: Option<Point>,
    ) -> SnapResult {
        let angle = self.modes.contains(SnapModes::ANGLE);
        let auto = auto_origin.filter(|_| self.modes.contains(SnapModes::AUTO));

        if let (true, Some(auto_org)) = (angle, auto) {
            // Only one point lies on both lines.
            let angular = self.get_line(pos, self.origin);
            let automatic = self.get_line(pos, auto_org);
            if let Some(v) = angular.intersects(&automatic) {
                if v.to_vec2().hypot2() < 1e10 {
                    return SnapResult::new(v, SnapMode::Angle);
                }
            }
        }

        if angle || auto.is_some() {
            let base = match auto {
                Some(auto_org) if !angle => auto_org,
                _ => self.origin,
            };
            let line = self.get_line(pos, base);
            let mut snapped = line.project(pos);
            if self.modes.contains(SnapModes::BOUNDARY) {
                if let Some(p) = self.snap_angular_intersection(snapped, &line, page, view, snap_dist) {
                    snapped = p;
                }
            }
            return SnapResult::new(snapped, SnapMode::Angle);
        }

        self.simple_snap(pos, page, view, snap_dist, tool)
    }

    /// Snap to the corners, then the sides, of the paper and the frame.
    pub fn snap_to_paper_and_frame(&self, pos: Point, layout: &Layout, snap_dist: f64) -> Option<SnapResult> {
        let rects = [layout.paper(), layout.frame()];
        let mut best = Closest::new(pos, snap_dist);

        if self.modes.contains(SnapModes::VERTEX) {
            for r in &rects {
                for corner in corners(r) {
                    best.offer_vertex(pos, corner);
                }
            }
            if best.bound < snap_dist {
                return Some(SnapResult::new(best.pos, SnapMode::Vertex));
            }
        }

        if self.modes.contains(SnapModes::BOUNDARY) {
            for r in &rects {
                let c = corners(r);
                for k in 0..4 {
                    best.offer_segment(pos, Line::new(c[k], c[(k + 1) % 4]));
                }
            }
            if best.bound < snap_dist {
                return Some(SnapResult::new(best.pos, SnapMode::Boundary));
            }
        }
        None
    }

    /// Take the axis origin and direction from the edge under the mouse.
    /// Returns `false` if no edge is close enough.
    pub fn set_edge(&mut self, pos: Point, page: &Page, view: usize) -> bool {
        let edges = Edges::collect(pos, EDGE_PICK_DISTANCE, page, Some(view));

        if let Some(seg) = edges.segments.last() {
            let line = AxisLine::new(seg.p0, seg.p1 - seg.p0);
            let origin = line.project(pos);
            let mut dir = line.dir();
            // Point away from the nearer endpoint.
            if (origin - seg.p0).hypot() > (origin - seg.p1).hypot() {
                dir = -dir;
            }
            self.origin = origin;
            self.dir = dir.atan2();
            return true;
        }

        if let Some(hit) = edges.arcs.last().and_then(|arc| arc.nearest(pos)) {
            self.origin = hit.pos;
            self.dir = hit.tangent.atan2();
            return true;
        }

        if let Some(bez) = edges.beziers.last() {
            let hit = geom::bezier_nearest(bez, pos);
            if hit.distance >= EDGE_PICK_DISTANCE {
                return false;
            }
            self.origin = hit.pos;
            self.dir = hit.tangent.atan2();
            return true;
        }

        false
    }
}

/// Corners counter-clockwise from the minimum corner.
fn corners(r: &kurbo::Rect) -> [Point; 4] {
    [
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ]
}
