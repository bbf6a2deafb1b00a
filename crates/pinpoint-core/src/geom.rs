//! Geometric primitives for snapping and hit testing.
//!
//! Everything here works in user space. Straight pieces and cubic curves
//! are plain `kurbo` types; the elliptic [`Arc`] is the affine image of a
//! piece of the unit circle, which lets most arc queries be answered
//! exactly in the unit-circle frame.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use kurbo::{
    Affine, CubicBez, Line, ParamCurve, ParamCurveDeriv, ParamCurveExtrema, ParamCurveNearest,
    PathSeg, Point, Rect, Vec2,
};

/// Accuracy passed to kurbo's nearest-point queries.
const NEAREST_ACCURACY: f64 = 1e-9;

/// Control polygons closer than this to their chord count as straight.
const FLATNESS: f64 = 1e-3;

const MAX_SUBDIVISION: u32 = 32;

/// Upper limit on points reported for one pair of curves.
const MAX_HITS: usize = 64;

/// Squared length below which a direction is treated as zero.
const DEGENERATE: f64 = 1e-20;

/// Accept `v` as the new snap position if it is strictly closer to `mouse`
/// than `bound`, and tighten `bound` to that distance.
pub fn snap_vertex(mouse: Point, v: Point, pos: &mut Point, bound: &mut f64) -> bool {
    let d = (mouse - v).hypot();
    if d < *bound {
        *pos = v;
        *bound = d;
        true
    } else {
        false
    }
}

/// Best candidate found so far while searching around the mouse.
///
/// The bound only ever shrinks: a candidate replaces the current one only if
/// it is strictly closer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closest {
    pub pos: Point,
    pub bound: f64,
}

impl Closest {
    pub fn new(pos: Point, bound: f64) -> Self {
        Self { pos, bound }
    }

    /// Offer a candidate whose distance to the mouse is already known.
    pub fn offer(&mut self, candidate: Point, distance: f64) -> bool {
        if distance < self.bound {
            self.pos = candidate;
            self.bound = distance;
            true
        } else {
            false
        }
    }

    /// Offer a single point.
    pub fn offer_vertex(&mut self, mouse: Point, v: Point) -> bool {
        snap_vertex(mouse, v, &mut self.pos, &mut self.bound)
    }

    /// Offer the point of a segment closest to the mouse.
    pub fn offer_segment(&mut self, mouse: Point, seg: Line) -> bool {
        let q = segment_project(seg, mouse);
        self.offer(q, (mouse - q).hypot())
    }

    /// Offer the point of a cubic closest to the mouse.
    pub fn offer_bezier(&mut self, mouse: Point, bez: &CubicBez) -> bool {
        let hit = bezier_nearest(bez, mouse);
        self.offer(hit.pos, hit.distance)
    }

    /// Offer the point of an arc closest to the mouse.
    pub fn offer_arc(&mut self, mouse: Point, arc: &Arc) -> bool {
        match arc.nearest(mouse) {
            Some(hit) => self.offer(hit.pos, hit.distance),
            None => false,
        }
    }
}

/// Normalize `a` into the half-open interval `[low, low + 2π)`.
pub fn normalize_angle(a: f64, low: f64) -> f64 {
    let r = (a - low).rem_euclid(TAU);
    if r >= TAU { low } else { low + r }
}

/// Nearest point on a curve, with the curve's direction there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub pos: Point,
    pub distance: f64,
    pub tangent: Vec2,
}

/// Closest point to `p` on the finite segment `seg`.
pub fn segment_project(seg: Line, p: Point) -> Point {
    let d = seg.p1 - seg.p0;
    let len_sq = d.hypot2();
    if len_sq < DEGENERATE {
        return seg.p0;
    }
    let t = ((p - seg.p0).dot(d) / len_sq).clamp(0.0, 1.0);
    seg.p0 + d * t
}

/// Distance from `p` to the finite segment `seg`.
pub fn segment_distance(seg: Line, p: Point) -> f64 {
    (p - segment_project(seg, p)).hypot()
}

pub fn bezier_nearest(bez: &CubicBez, p: Point) -> CurvePoint {
    let near = bez.nearest(p, NEAREST_ACCURACY);
    CurvePoint {
        pos: bez.eval(near.t),
        distance: near.distance_sq.sqrt(),
        tangent: bezier_tangent(bez, near.t),
    }
}

/// Direction of the curve at parameter `t`, falling back to the chord where
/// the derivative vanishes.
pub fn bezier_tangent(bez: &CubicBez, t: f64) -> Vec2 {
    let d = bez.deriv().eval(t).to_vec2();
    if d.hypot2() < DEGENERATE {
        bez.p3 - bez.p0
    } else {
        d
    }
}

/// Bounding box of the control polygon.
pub fn control_box(bez: &CubicBez) -> Rect {
    Rect::from_points(bez.p0, bez.p1)
        .union_pt(bez.p2)
        .union_pt(bez.p3)
}

/// Closed-interval rectangle containment.
pub fn rect_contains(outer: &Rect, inner: &Rect) -> bool {
    inner.x0 >= outer.x0 && inner.x1 <= outer.x1 && inner.y0 >= outer.y0 && inner.y1 <= outer.y1
}

/// Closed-interval rectangle overlap, so touching rectangles intersect.
pub fn rects_intersect(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// True if `p` is certainly further than `bound` from everything inside `rect`.
pub fn certain_clearance(rect: &Rect, p: Point, bound: f64) -> bool {
    p.x < rect.x0 - bound || p.x > rect.x1 + bound || p.y < rect.y0 - bound || p.y > rect.y1 + bound
}

/// Apply only the linear part of `m` to `v`.
pub fn linear(m: Affine, v: Vec2) -> Vec2 {
    let [a, b, c, d, _, _] = m.as_coeffs();
    Vec2::new(a * v.x + c * v.y, b * v.x + d * v.y)
}

/// An infinite line through `base` with unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLine {
    base: Point,
    dir: Vec2,
}

impl AxisLine {
    /// Create a line through `base` along `dir`. A zero direction falls back
    /// to the positive x axis.
    pub fn new(base: Point, dir: Vec2) -> Self {
        let len = dir.hypot();
        let dir = if len * len < DEGENERATE {
            Vec2::new(1.0, 0.0)
        } else {
            dir / len
        };
        Self { base, dir }
    }

    pub fn from_angle(base: Point, angle: f64) -> Self {
        Self {
            base,
            dir: Vec2::from_angle(angle),
        }
    }

    pub fn base(&self) -> Point {
        self.base
    }

    pub fn dir(&self) -> Vec2 {
        self.dir
    }

    pub fn angle(&self) -> f64 {
        self.dir.atan2()
    }

    /// Orthogonal projection of `p` onto the line.
    pub fn project(&self, p: Point) -> Point {
        self.base + self.dir * (p - self.base).dot(self.dir)
    }

    pub fn distance(&self, p: Point) -> f64 {
        (p - self.base).cross(self.dir).abs()
    }

    /// Intersection point, or `None` for parallel lines.
    pub fn intersects(&self, other: &AxisLine) -> Option<Point> {
        let denom = self.dir.cross(other.dir);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = (other.base - self.base).cross(other.dir) / denom;
        Some(self.base + self.dir * t)
    }

    /// The finite piece of the line of half length `half` centred on the
    /// projection of `center`.
    pub fn segment_around(&self, center: Point, half: f64) -> Line {
        let c = self.project(center);
        Line::new(c - self.dir * half, c + self.dir * half)
    }
}

/// Intersection of two finite segments, endpoints included.
pub fn segment_intersection(a: Line, b: Line) -> Option<Point> {
    let d1 = a.p1 - a.p0;
    let d2 = b.p1 - b.p0;
    let denom = d1.cross(d2);
    if denom.abs() < 1e-12 {
        return None;
    }
    let w = b.p0 - a.p0;
    let t = w.cross(d2) / denom;
    let s = w.cross(d1) / denom;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&s)).then(|| a.p0 + d1 * t)
}

/// Intersection of a finite segment with an infinite line.
pub fn segment_line_intersection(seg: Line, line: &AxisLine) -> Option<Point> {
    let d = seg.p1 - seg.p0;
    let denom = d.cross(line.dir);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = (line.base - seg.p0).cross(line.dir) / denom;
    (0.0..=1.0).contains(&t).then(|| seg.p0 + d * t)
}

pub fn bezier_segment_intersections(bez: &CubicBez, seg: Line, out: &mut Vec<Point>) {
    if (seg.p1 - seg.p0).hypot2() < DEGENERATE {
        return;
    }
    for hit in PathSeg::Cubic(*bez).intersect_line(seg) {
        out.push(bez.eval(hit.segment_t));
    }
}

pub fn bezier_line_intersections(bez: &CubicBez, line: &AxisLine, out: &mut Vec<Point>) {
    let bbox = control_box(bez);
    let half = 0.5 * bbox.width().hypot(bbox.height()) + 1.0;
    bezier_segment_intersections(bez, line.segment_around(bbox.center(), half), out);
}

/// Intersections of two cubics by recursive subdivision until both pieces
/// are flat.
pub fn bezier_intersections(a: &CubicBez, b: &CubicBez, out: &mut Vec<Point>) {
    let start = out.len();
    intersect_rec(a, b, 0, start, out);
}

fn is_flat(bez: &CubicBez) -> bool {
    let chord = Line::new(bez.p0, bez.p3);
    segment_distance(chord, bez.p1) < FLATNESS && segment_distance(chord, bez.p2) < FLATNESS
}

fn intersect_rec(a: &CubicBez, b: &CubicBez, depth: u32, start: usize, out: &mut Vec<Point>) {
    if out.len() - start >= MAX_HITS || !rects_intersect(&control_box(a), &control_box(b)) {
        return;
    }
    if depth >= MAX_SUBDIVISION || (is_flat(a) && is_flat(b)) {
        let hit = segment_intersection(Line::new(a.p0, a.p3), Line::new(b.p0, b.p3));
        if let Some(p) = hit {
            // Pieces sharing a split point can report the same crossing twice.
            if !out[start..].iter().any(|q| (*q - p).hypot2() < 1e-12) {
                out.push(p);
            }
        }
        return;
    }
    let (a0, a1) = a.subdivide();
    let (b0, b1) = b.subdivide();
    for pa in [&a0, &a1] {
        for pb in [&b0, &b1] {
            intersect_rec(pa, pb, depth + 1, start, out);
        }
    }
}

/// A piece of an ellipse: the unit-circle arc from `alpha` counter-clockwise
/// to `beta`, mapped by `m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub m: Affine,
    pub alpha: f64,
    pub beta: f64,
}

impl Arc {
    /// Create an arc. `alpha` is normalized into `[-π, π)` and `beta` into
    /// `[alpha, alpha + 2π)`.
    pub fn new(m: Affine, alpha: f64, beta: f64) -> Self {
        let alpha = normalize_angle(alpha, -PI);
        let beta = normalize_angle(beta, alpha);
        Self { m, alpha, beta }
    }

    /// The full ellipse.
    pub fn ellipse(m: Affine) -> Self {
        Self {
            m,
            alpha: 0.0,
            beta: TAU,
        }
    }

    pub fn is_ellipse(&self) -> bool {
        self.beta - self.alpha >= TAU
    }

    pub fn transformed(&self, t: Affine) -> Arc {
        Arc {
            m: t * self.m,
            ..*self
        }
    }

    fn point_at(&self, angle: f64) -> Point {
        let (s, c) = angle.sin_cos();
        self.m * Point::new(c, s)
    }

    fn tangent_at(&self, angle: f64) -> Vec2 {
        let (s, c) = angle.sin_cos();
        linear(self.m, Vec2::new(-s, c))
    }

    pub fn begin(&self) -> Point {
        self.point_at(self.alpha)
    }

    pub fn end(&self) -> Point {
        self.point_at(self.beta)
    }

    pub fn center(&self) -> Point {
        self.m * Point::ZERO
    }

    /// Whether the unit-circle angle lies on the arc.
    pub fn contains_angle(&self, angle: f64) -> bool {
        self.is_ellipse() || normalize_angle(angle, self.alpha) <= self.beta
    }

    /// Radius if `m` maps the unit circle to a circle.
    pub fn circle_radius(&self) -> Option<f64> {
        let [a, b, c, d, _, _] = self.m.as_coeffs();
        let scale = a.hypot(b).max(c.hypot(d));
        if scale <= 0.0 {
            return None;
        }
        let tol = 1e-9 * scale;
        let rotation = (a - d).abs() <= tol && (b + c).abs() <= tol;
        let reflection = (a + d).abs() <= tol && (b - c).abs() <= tol;
        (rotation || reflection).then(|| a.hypot(b))
    }

    fn inverse(&self) -> Option<Affine> {
        (self.m.determinant().abs() > 1e-12).then(|| self.m.inverse())
    }

    /// Cubic approximation, one piece per at most 90 degrees of sweep.
    pub fn beziers(&self) -> Vec<CubicBez> {
        let sweep = self.beta - self.alpha;
        if sweep <= 0.0 {
            return Vec::new();
        }
        let n = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / n as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        (0..n)
            .map(|i| {
                let a0 = self.alpha + step * i as f64;
                let (s0, c0) = a0.sin_cos();
                let (s1, c1) = (a0 + step).sin_cos();
                let unit = CubicBez::new(
                    Point::new(c0, s0),
                    Point::new(c0 - k * s0, s0 + k * c0),
                    Point::new(c1 + k * s1, s1 - k * c1),
                    Point::new(c1, s1),
                );
                self.m * unit
            })
            .collect()
    }

    pub fn bbox(&self) -> Rect {
        self.beziers()
            .iter()
            .map(|b| b.bounding_box())
            .reduce(|a, b| a.union(b))
            .unwrap_or_else(|| Rect::from_points(self.begin(), self.begin()))
    }

    /// Nearest point on the arc. Exact for circular arcs; otherwise taken
    /// from the cubic approximation.
    pub fn nearest(&self, p: Point) -> Option<CurvePoint> {
        if self.circle_radius().is_some() {
            let inv = self.inverse()?;
            let q = inv * p;
            let radial = q.to_vec2();
            let angle = if radial.hypot2() > DEGENERATE && self.contains_angle(radial.atan2()) {
                radial.atan2()
            } else if self.is_ellipse() {
                self.alpha
            } else if (p - self.begin()).hypot() <= (p - self.end()).hypot() {
                self.alpha
            } else {
                self.beta
            };
            let pos = self.point_at(angle);
            return Some(CurvePoint {
                pos,
                distance: (p - pos).hypot(),
                tangent: self.tangent_at(angle),
            });
        }
        self.beziers()
            .iter()
            .map(|b| bezier_nearest(b, p))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    pub fn distance(&self, p: Point) -> f64 {
        self.nearest(p).map_or(f64::INFINITY, |hit| hit.distance)
    }

    /// Solve `|q0 + t d| = 1` in the unit frame and keep the hits on the arc.
    fn unit_circle_hits(&self, q0: Point, d: Vec2, bounded: bool, out: &mut Vec<Point>) {
        let a = d.hypot2();
        if a < DEGENERATE {
            return;
        }
        let b = 2.0 * q0.to_vec2().dot(d);
        let c = q0.to_vec2().hypot2() - 1.0;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return;
        }
        let sq = disc.sqrt();
        let roots = [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)];
        let count = if sq == 0.0 { 1 } else { 2 };
        for &t in &roots[..count] {
            if bounded && !(0.0..=1.0).contains(&t) {
                continue;
            }
            let q = q0 + d * t;
            if self.contains_angle(q.y.atan2(q.x)) {
                out.push(self.m * q);
            }
        }
    }

    pub fn intersect_segment(&self, seg: Line, out: &mut Vec<Point>) {
        let Some(inv) = self.inverse() else {
            return;
        };
        let q0 = inv * seg.p0;
        let q1 = inv * seg.p1;
        self.unit_circle_hits(q0, q1 - q0, true, out);
    }

    pub fn intersect_line(&self, line: &AxisLine, out: &mut Vec<Point>) {
        let Some(inv) = self.inverse() else {
            return;
        };
        self.unit_circle_hits(inv * line.base(), linear(inv, line.dir()), false, out);
    }

    fn contains_circle_point(&self, p: Point) -> bool {
        self.inverse().is_some_and(|inv| {
            let q = inv * p;
            self.contains_angle(q.y.atan2(q.x))
        })
    }

    pub fn intersect_arc(&self, other: &Arc, out: &mut Vec<Point>) {
        if let (Some(r1), Some(r2)) = (self.circle_radius(), other.circle_radius()) {
            let c1 = self.center();
            let c2 = other.center();
            let d = (c2 - c1).hypot();
            if d < 1e-12 || d > r1 + r2 || d < (r1 - r2).abs() {
                return;
            }
            let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
            let h = (r1 * r1 - a * a).max(0.0).sqrt();
            let u = (c2 - c1) / d;
            let mid = c1 + u * a;
            let perp = Vec2::new(-u.y, u.x);
            let candidates = [mid + perp * h, mid - perp * h];
            let count = if h == 0.0 { 1 } else { 2 };
            for &p in &candidates[..count] {
                if self.contains_circle_point(p) && other.contains_circle_point(p) {
                    out.push(p);
                }
            }
            return;
        }
        let others = other.beziers();
        for a in self.beziers() {
            for b in &others {
                bezier_intersections(&a, b, out);
            }
        }
    }

    pub fn intersect_bezier(&self, bez: &CubicBez, out: &mut Vec<Point>) {
        for piece in self.beziers() {
            bezier_intersections(&piece, bez, out);
        }
    }
}
