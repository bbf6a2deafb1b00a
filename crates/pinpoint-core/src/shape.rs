//! Path shapes: the geometry carried by page objects.
//!
//! A [`Shape`] is a list of sub-paths. A sub-path is either an open or
//! closed [`Curve`] made of straight, elliptic and cubic segments, or a full
//! ellipse. Queries take the object's matrix so callers never have to build
//! transformed copies of the shape.

use kurbo::{Affine, BezPath, CubicBez, Line, ParamCurveExtrema, Point, Rect};

use crate::geom::{self, Arc, Closest};
use crate::snap::Edges;

/// One piece of a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveSegment {
    Line(Line),
    Arc(Arc),
    Bezier(CubicBez),
}

impl CurveSegment {
    pub fn start(&self) -> Point {
        match self {
            Self::Line(l) => l.p0,
            Self::Arc(a) => a.begin(),
            Self::Bezier(b) => b.p0,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Self::Line(l) => l.p1,
            Self::Arc(a) => a.end(),
            Self::Bezier(b) => b.p3,
        }
    }

    pub fn transformed(&self, m: Affine) -> Self {
        match self {
            Self::Line(l) => Self::Line(Line::new(m * l.p0, m * l.p1)),
            Self::Arc(a) => Self::Arc(a.transformed(m)),
            Self::Bezier(b) => Self::Bezier(m * *b),
        }
    }

    pub fn distance(&self, p: Point) -> f64 {
        match self {
            Self::Line(l) => geom::segment_distance(*l, p),
            Self::Arc(a) => a.distance(p),
            Self::Bezier(b) => geom::bezier_nearest(b, p).distance,
        }
    }

    /// Offer the end vertex, or with `ctl` the segment's control points:
    /// the midpoint of a line, the centre of an arc, the inner points of a
    /// cubic.
    pub fn snap_vtx(&self, mouse: Point, best: &mut Closest, ctl: bool) {
        if !ctl {
            best.offer_vertex(mouse, self.end());
            return;
        }
        match self {
            Self::Line(l) => {
                best.offer_vertex(mouse, l.p0.midpoint(l.p1));
            }
            Self::Arc(a) => {
                best.offer_vertex(mouse, a.center());
            }
            Self::Bezier(b) => {
                best.offer_vertex(mouse, b.p1);
                best.offer_vertex(mouse, b.p2);
            }
        }
    }

    pub fn snap_bnd(&self, mouse: Point, best: &mut Closest) {
        match self {
            Self::Line(l) => best.offer_segment(mouse, *l),
            Self::Arc(a) => best.offer_arc(mouse, a),
            Self::Bezier(b) => best.offer_bezier(mouse, b),
        };
    }

    pub fn bbox(&self, include_cp: bool) -> Rect {
        match self {
            Self::Line(l) => Rect::from_points(l.p0, l.p1),
            Self::Arc(a) if include_cp => a.bbox().union_pt(a.center()),
            Self::Arc(a) => a.bbox(),
            Self::Bezier(b) if include_cp => geom::control_box(b),
            Self::Bezier(b) => b.bounding_box(),
        }
    }

    fn append_to(&self, path: &mut BezPath) {
        match self {
            Self::Line(l) => path.line_to(l.p1),
            Self::Arc(a) => {
                for b in a.beziers() {
                    path.curve_to(b.p1, b.p2, b.p3);
                }
            }
            Self::Bezier(b) => path.curve_to(b.p1, b.p2, b.p3),
        }
    }
}

/// A connected sequence of segments, optionally closed by a straight edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    segments: Vec<CurveSegment>,
    closed: bool,
}

impl Curve {
    pub fn new(segments: Vec<CurveSegment>, closed: bool) -> Self {
        Self { segments, closed }
    }

    /// Straight segments through `points`.
    pub fn polyline(points: &[Point], closed: bool) -> Self {
        let segments = points
            .windows(2)
            .map(|w| CurveSegment::Line(Line::new(w[0], w[1])))
            .collect();
        Self { segments, closed }
    }

    pub fn segments(&self) -> &[CurveSegment] {
        &self.segments
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn start(&self) -> Option<Point> {
        self.segments.first().map(CurveSegment::start)
    }

    /// The straight edge from the last vertex back to the first, if the curve
    /// is closed and the ends do not already meet.
    pub fn closing_segment(&self) -> Option<Line> {
        if !self.closed {
            return None;
        }
        let first = self.segments.first()?.start();
        let last = self.segments.last()?.end();
        (first != last).then(|| Line::new(last, first))
    }

    /// All edges under `m`, the closing edge last.
    pub fn edges(&self, m: Affine) -> Vec<CurveSegment> {
        let mut edges: Vec<_> = self.segments.iter().map(|s| s.transformed(m)).collect();
        if let Some(close) = self.closing_segment() {
            edges.push(CurveSegment::Line(close).transformed(m));
        }
        edges
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubPath {
    Curve(Curve),
    /// The image of the unit circle under the matrix.
    Ellipse(Affine),
}

impl SubPath {
    pub fn edges(&self, m: Affine) -> Vec<CurveSegment> {
        match self {
            Self::Curve(c) => c.edges(m),
            Self::Ellipse(e) => vec![CurveSegment::Arc(Arc::ellipse(m * *e))],
        }
    }

    fn snap_vtx(&self, mouse: Point, m: Affine, best: &mut Closest, ctl: bool) {
        match self {
            Self::Curve(c) => {
                if !ctl {
                    if let Some(start) = c.start() {
                        best.offer_vertex(mouse, m * start);
                    }
                }
                for edge in c.edges(m) {
                    edge.snap_vtx(mouse, best, ctl);
                }
            }
            Self::Ellipse(e) => {
                if ctl {
                    best.offer_vertex(mouse, m * e.translation().to_point());
                }
            }
        }
    }

    fn append_to(&self, m: Affine, path: &mut BezPath) {
        let edges = self.edges(m);
        let Some(first) = edges.first() else {
            return;
        };
        path.move_to(first.start());
        for edge in &edges {
            edge.append_to(path);
        }
        if matches!(self, Self::Ellipse(_)) || matches!(self, Self::Curve(c) if c.is_closed()) {
            path.close_path();
        }
    }
}

/// The geometry of a path object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    subpaths: Vec<SubPath>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subpath(subpath: SubPath) -> Self {
        Self {
            subpaths: vec![subpath],
        }
    }

    /// A closed axis-aligned rectangle.
    pub fn rectangle(rect: Rect) -> Self {
        let points = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        Self::polyline(&points, true)
    }

    pub fn polyline(points: &[Point], closed: bool) -> Self {
        Self::from_subpath(SubPath::Curve(Curve::polyline(points, closed)))
    }

    pub fn segment(a: Point, b: Point) -> Self {
        Self::polyline(&[a, b], false)
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Self::from_subpath(SubPath::Ellipse(
            Affine::translate(center.to_vec2()) * Affine::scale(radius),
        ))
    }

    pub fn push(&mut self, subpath: SubPath) {
        self.subpaths.push(subpath);
    }

    pub fn subpaths(&self) -> &[SubPath] {
        &self.subpaths
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }

    /// Every edge of every sub-path under `m`.
    pub fn edges(&self, m: Affine) -> Vec<CurveSegment> {
        self.subpaths.iter().flat_map(|sp| sp.edges(m)).collect()
    }

    /// Bounding box under `m`, optionally including control points.
    pub fn bbox(&self, m: Affine, include_cp: bool) -> Option<Rect> {
        self.edges(m)
            .iter()
            .map(|e| e.bbox(include_cp))
            .reduce(|a, b| a.union(b))
    }

    /// Distance from `v` to the shape under `m`, capped at `bound`.
    pub fn distance(&self, v: Point, m: Affine, bound: f64) -> f64 {
        self.edges(m)
            .iter()
            .map(|e| e.distance(v))
            .fold(bound, f64::min)
    }

    pub fn snap_vtx(&self, mouse: Point, m: Affine, best: &mut Closest, ctl: bool) {
        for sp in &self.subpaths {
            sp.snap_vtx(mouse, m, best, ctl);
        }
    }

    /// Like [`Shape::snap_vtx`] in the untransformed frame, but leaves out
    /// the final vertex when the shape is a single open curve. Returns
    /// `false` when the shape has another form and nothing was tried.
    pub fn snap_vtx_skipping_last(&self, mouse: Point, best: &mut Closest, ctl: bool) -> bool {
        let [SubPath::Curve(curve)] = self.subpaths.as_slice() else {
            return false;
        };
        if curve.is_closed() {
            return false;
        }
        if !ctl {
            if let Some(start) = curve.start() {
                best.offer_vertex(mouse, start);
            }
        }
        let keep = curve.segments().len().saturating_sub(1);
        for seg in &curve.segments()[..keep] {
            seg.snap_vtx(mouse, best, ctl);
        }
        true
    }

    pub fn snap_bnd(&self, mouse: Point, m: Affine, best: &mut Closest) {
        for edge in self.edges(m) {
            edge.snap_bnd(mouse, best);
        }
    }

    /// Add the edges under `m` that come within `bound` of `mouse`.
    pub fn collect_edges(&self, mouse: Point, m: Affine, bound: f64, edges: &mut Edges) {
        for sp in &self.subpaths {
            // Adjacent cubics of one curve touch at their joints; flag them so
            // the joint is not reported as an intersection.
            let mut prev_bezier = false;
            for edge in sp.edges(m) {
                let near = edge.distance(mouse) < bound;
                match edge {
                    CurveSegment::Line(l) if near => edges.push_segment(l),
                    CurveSegment::Arc(a) if near => edges.push_arc(a),
                    CurveSegment::Bezier(b) if near => edges.push_bezier(b, prev_bezier),
                    _ => {}
                }
                prev_bezier = near && matches!(edge, CurveSegment::Bezier(_));
            }
        }
    }

    pub fn to_bez_path(&self, m: Affine) -> BezPath {
        let mut path = BezPath::new();
        for sp in &self.subpaths {
            sp.append_to(m, &mut path);
        }
        path
    }
}
