// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke outline tessellation.
//!
//! Every visible ("on") sub-segment becomes a quad whose long axis follows
//! the segment and whose cross axis is the line width; the quad is built
//! from a local affine frame at each endpoint, so it tapers correctly when
//! the direction changes slightly between samples of a flattened curve.
//! Joins appear only where the direction changes while the dash cursor is
//! inside an "on" entry; dash transitions and subpath boundaries get caps
//! instead.

use std::f64::consts::{PI, TAU};

use peniko::kurbo::{Affine, BezPath, Cap, CubicBez, Join, PathEl, Point, QuadBez, Stroke, Vec2};

use crate::batch::Vertex;
use crate::dash::DashWalker;
use crate::flatten;

/// Tessellates `path` stroked with `style` into stencil-pass triangles.
///
/// `transform` maps object space to canvas space and `view_transform`
/// canvas space to clip space; `scale_factor` is device pixels per canvas
/// unit and controls curve flattening density and the dash visibility
/// threshold. An empty result means there is nothing to draw.
pub fn tessellate_stroke(
    path: &BezPath,
    style: &Stroke,
    transform: Affine,
    view_transform: Affine,
    scale_factor: f64,
) -> Vec<Vertex> {
    if path.elements().is_empty() || style.width < f64::EPSILON {
        return Vec::new();
    }
    let min_visible = 1.0 / scale_factor;
    let to_device = Affine::scale(scale_factor) * transform;

    let mut b = StrokeBuilder {
        width: style.width,
        join: style.join,
        miter_limit: style.miter_limit,
        start_cap: style.start_cap,
        end_cap: style.end_cap,
        to_clip: view_transform * transform,
        dash: DashWalker::new(&style.dash_pattern, style.dash_offset, min_visible),
        vertices: Vec::new(),
    };

    let mut initial_point: Option<Point> = None;
    let mut current_point: Option<Point> = None;
    let mut initial_dir: Option<Vec2> = None;
    let mut current_dir: Option<Vec2> = None;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(to) => {
                if let (Some(p0), Some(d0), Some(p1), Some(d1)) =
                    (initial_point, initial_dir, current_point, current_dir)
                {
                    // Cap the dangling end of the previous subpath, then
                    // re-derive the phase for its start cap.
                    if b.dash_on() {
                        b.emit_cap(b.end_cap, p1, d1);
                    }
                    b.reset_dash();
                    if b.dash_on() {
                        b.emit_cap(b.start_cap, p0, -d0);
                    }
                }
                initial_point = Some(to);
                current_point = Some(to);
                initial_dir = None;
                current_dir = None;
                b.reset_dash();
            }
            PathEl::LineTo(p1) => {
                if let Some(p0) = current_point {
                    let d = p1 - p0;
                    let length = d.hypot();
                    if length > f64::EPSILON {
                        let d1 = d / length;
                        if let Some(d0) = current_dir {
                            if b.dash_on() {
                                b.emit_join(p0, d0, d1);
                            }
                        }
                        b.add_line(p0, p1, d1, d1);
                        current_dir = Some(d1);
                        initial_dir = initial_dir.or(current_dir);
                    }
                }
                current_point = Some(p1);
            }
            PathEl::QuadTo(c1, p2) => {
                if let Some(p0) = current_point {
                    let q = QuadBez::new(p0, c1, p2);
                    let length = flatten::quad_arc_length(&q, to_device);
                    if length > f64::EPSILON {
                        let mut pt0 = p0;
                        let mut d0 = current_dir.unwrap_or_else(|| flatten::quad_start_dir(&q));
                        flatten::flatten_quad(&q, length, &mut |pt1, d1| {
                            b.add_line(pt0, pt1, d0, d1);
                            pt0 = pt1;
                            d0 = d1;
                        });
                        current_dir = Some(d0);
                        initial_dir = initial_dir.or(current_dir);
                    }
                }
                current_point = Some(p2);
            }
            PathEl::CurveTo(c1, c2, p3) => {
                if let Some(p0) = current_point {
                    let c = CubicBez::new(p0, c1, c2, p3);
                    let length = flatten::cubic_arc_length(&c, to_device);
                    if length > f64::EPSILON {
                        let mut pt0 = p0;
                        let mut d0 = current_dir.unwrap_or_else(|| flatten::cubic_start_dir(&c));
                        flatten::flatten_cubic(&c, length, &mut |pt1, d1| {
                            b.add_line(pt0, pt1, d0, d1);
                            pt0 = pt1;
                            d0 = d1;
                        });
                        current_dir = Some(d0);
                        initial_dir = initial_dir.or(current_dir);
                    }
                }
                current_point = Some(p3);
            }
            PathEl::ClosePath => {
                if let (Some(p0), Some(p1)) = (current_point, initial_point) {
                    let v = p1 - p0;
                    let length = v.hypot();
                    // An already-coincident closing segment contributes no
                    // geometry; the last segment direction stands in for it
                    // when placing the closing join or cap.
                    let d = if length > f64::EPSILON {
                        Some(v / length)
                    } else {
                        current_dir
                    };
                    if let Some(d) = d {
                        if length > f64::EPSILON {
                            if let Some(d0) = current_dir {
                                if b.dash_on() {
                                    b.emit_join(p0, d0, d);
                                }
                            }
                            b.add_line(p0, p1, d, d);
                        }
                        if let Some(d1) = initial_dir {
                            if b.dash_on() {
                                b.reset_dash();
                                if b.dash_on() {
                                    // Closing while the cycle starts "on"
                                    // joins back onto the first segment.
                                    b.emit_join(p1, d, d1);
                                } else {
                                    b.emit_cap(b.end_cap, p1, d);
                                }
                            } else {
                                b.reset_dash();
                                if b.dash_on() {
                                    b.emit_cap(b.start_cap, p1, -d1);
                                }
                            }
                        }
                    }
                }
                current_point = initial_point;
                initial_dir = None;
                current_dir = None;
                b.reset_dash();
            }
        }
    }
    if let (Some(p0), Some(d0), Some(p1), Some(d1)) =
        (initial_point, initial_dir, current_point, current_dir)
    {
        if b.dash_on() {
            b.emit_cap(b.end_cap, p1, d1);
        }
        b.reset_dash();
        if b.dash_on() {
            b.emit_cap(b.start_cap, p0, -d0);
        }
    }

    b.vertices
}

struct StrokeBuilder {
    width: f64,
    join: Join,
    miter_limit: f64,
    start_cap: Cap,
    end_cap: Cap,
    to_clip: Affine,
    dash: Option<DashWalker>,
    vertices: Vec<Vertex>,
}

impl StrokeBuilder {
    fn dash_on(&self) -> bool {
        self.dash.as_ref().map_or(true, DashWalker::is_on)
    }

    fn reset_dash(&mut self) {
        if let Some(walker) = self.dash.as_mut() {
            walker.reset();
        }
    }

    fn push_tri(&mut self, a: Point, b: Point, c: Point) {
        self.vertices.push(Vertex::stencil(self.to_clip, a));
        self.vertices.push(Vertex::stencil(self.to_clip, b));
        self.vertices.push(Vertex::stencil(self.to_clip, c));
    }

    /// Emits the tapered quad of one visible sub-segment.
    fn emit_segment(&mut self, p0: Point, p1: Point, d0: Vec2, d1: Vec2) {
        let n0 = Vec2::new(-d0.y, d0.x) * (0.5 * self.width);
        let n1 = Vec2::new(-d1.y, d1.x) * (0.5 * self.width);
        let b0 = p0 - n0;
        let b1 = p1 - n1;
        let b2 = p0 + n0;
        let b3 = p1 + n1;
        self.push_tri(b2, b0, b3);
        self.push_tri(b3, b0, b1);
    }

    /// Splits `p0..p1` across dash entries, emitting quads for "on" spans
    /// and caps at every on/off transition. Without a dash pattern the
    /// whole segment is one quad.
    fn add_line(&mut self, p0: Point, p1: Point, d0: Vec2, d1: Vec2) {
        let length = (p1 - p0).hypot();
        if length < f64::EPSILON {
            return;
        }
        let Some(mut walker) = self.dash.take() else {
            self.emit_segment(p0, p1, d0, d1);
            return;
        };
        let mut drawn = 0.0;
        let mut start = p0;
        let mut dir0 = d0;
        let mut pending_cap = false;
        while drawn < length {
            while walker.remain() < f64::EPSILON {
                walker.advance_entry();
                pending_cap = true;
            }
            let remain = walker.remain();
            let len = (length - drawn).min(remain);
            if len > f64::EPSILON {
                let t = (drawn + len) / length;
                let end = p0.lerp(p1, t);
                let dir1 = d0.lerp(d1, t);
                if walker.is_on() {
                    if pending_cap {
                        self.emit_cap(self.start_cap, start, -dir1);
                        pending_cap = false;
                    }
                    self.emit_segment(start, end, dir0, dir1);
                    if len == remain {
                        self.emit_cap(self.end_cap, end, dir1);
                    }
                }
                start = end;
                dir0 = dir1;
            }
            drawn += len;
            walker.consume(len);
        }
        self.dash = Some(walker);
    }

    fn emit_cap(&mut self, cap: Cap, p: Point, d: Vec2) {
        let half = 0.5 * self.width;
        let perp = Vec2::new(-d.y, d.x);
        match cap {
            Cap::Butt => {}
            Cap::Round => {
                // Half-circle fan from one quad edge to the other; step
                // shrinks with width so chordal error stays bounded.
                let step = PI / self.width;
                let mut progress = step;
                let mut pt0 = p - perp * half;
                while progress < PI {
                    let (sin, cos) = progress.sin_cos();
                    let pt1 = p + d * (half * sin) - perp * (half * cos);
                    self.push_tri(p, pt0, pt1);
                    pt0 = pt1;
                    progress += step;
                }
                self.push_tri(p, pt0, p + perp * half);
            }
            Cap::Square => {
                let ext = d * self.width;
                let side = perp * (0.5 * self.width);
                let pts = [p + side, p - side, p + ext * 0.5 + side, p + ext * 0.5 - side];
                self.push_tri(pts[0], pts[1], pts[2]);
                self.push_tri(pts[2], pts[1], pts[3]);
            }
        }
    }

    fn emit_join(&mut self, p: Point, dir0: Vec2, dir1: Vec2) {
        if 1.0 - dir0.dot(dir1) < f64::EPSILON {
            return;
        }
        let half = 0.5 * self.width;

        let mut join = self.join;
        if join == Join::Miter {
            // Fall back to bevel past the miter limit.
            let dot = (-dir0).dot(dir1).clamp(-1.0, 1.0);
            let sin_half = (dot.acos() * 0.5).sin();
            if sin_half > f64::EPSILON {
                let miter_length = self.width / sin_half;
                if miter_length > self.miter_limit * self.width {
                    join = Join::Bevel;
                }
            } else {
                join = Join::Bevel;
            }
        }

        let angle_of = |d: Vec2| {
            let a = d.x.clamp(-1.0, 1.0).acos();
            if d.y < 0.0 { TAU - a } else { a }
        };
        let mut r1 = angle_of(dir0);
        let mut r2 = angle_of(dir1);
        if (r1 - r2).abs() > PI {
            if r1 > r2 {
                r2 += TAU;
            } else {
                r1 += TAU;
            }
        }
        // The outer side of the corner is the one the sweep turns away
        // from; `r1 > r2` means a clockwise turn.
        let clockwise = r1 > r2;
        let side = if clockwise { half } else { -half };

        match join {
            Join::Bevel => {
                let q0 = p + Vec2::new(-dir0.y, dir0.x) * side;
                let q1 = p + Vec2::new(-dir1.y, dir1.x) * side;
                if clockwise {
                    self.push_tri(p, q1, q0);
                } else {
                    self.push_tri(p, q0, q1);
                }
            }
            Join::Round => {
                let step = 1.0 / self.width;
                let spoke = |r: f64| Vec2::new(-side * r.sin(), side * r.cos());
                let mut progress = step;
                let mut v1 = spoke(r1);
                while progress < 1.0 {
                    let r = r1 + (r2 - r1) * progress;
                    let v2 = spoke(r);
                    if clockwise {
                        self.push_tri(p, p + v2, p + v1);
                    } else {
                        self.push_tri(p, p + v1, p + v2);
                    }
                    v1 = v2;
                    progress += step;
                }
                let v2 = spoke(r2);
                if clockwise {
                    self.push_tri(p, p + v2, p + v1);
                } else {
                    self.push_tri(p, p + v1, p + v2);
                }
            }
            Join::Miter => {
                let q0 = p + Vec2::new(-dir0.y, dir0.x) * side;
                let q1 = p + Vec2::new(-dir1.y, dir1.x) * side;
                // Parametric intersection of the two offset edges via the
                // 2D cross product.
                let denom = dir0.cross(dir1);
                let t = (q1 - q0).cross(dir1) / denom;
                let m = q0 + dir0 * t;
                if clockwise {
                    self.push_tri(p, m, q0);
                    self.push_tri(p, q1, m);
                } else {
                    self.push_tri(p, q0, m);
                    self.push_tri(p, m, q1);
                }
            }
        }
    }
}
