// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path flattening: curves into straight segments with per-sample tangents.
//!
//! The subdivision step count derives from the curve's approximate arc
//! length measured on control points mapped into device space, so the
//! visual error stays bounded regardless of how the caller scales the
//! path. The final sample of every traversal is exactly the curve
//! endpoint; joins never see accumulated rounding drift.

use peniko::kurbo::{Affine, CubicBez, Point, QuadBez, Vec2};

/// Threshold below which a derivative is considered too small to normalize.
const DERIV_THRESH: f64 = 1e-6;
/// Threshold below which a control-point difference is considered degenerate.
const ROBUST_EPSILON: f64 = 1e-12;

/// Evaluate both the point and derivative of a quadratic bezier.
fn eval_quad_and_deriv(q: &QuadBez, t: f64) -> (Point, Vec2) {
    let m = 1.0 - t;
    let p = (q.p0.to_vec2() * (m * m) + q.p1.to_vec2() * (2.0 * m * t) + q.p2.to_vec2() * (t * t))
        .to_point();
    let d = (q.p1 - q.p0) * m + (q.p2 - q.p1) * t;
    (p, d)
}

/// Evaluate both the point and derivative of a cubic bezier.
fn eval_cubic_and_deriv(c: &CubicBez, t: f64) -> (Point, Vec2) {
    let m = 1.0 - t;
    let mm = m * m;
    let mt = m * t;
    let tt = t * t;
    let p = (c.p0.to_vec2() * (mm * m)
        + (c.p1.to_vec2() * (3.0 * mm) + c.p2.to_vec2() * (3.0 * mt) + c.p3.to_vec2() * tt) * t)
        .to_point();
    let d = (c.p1 - c.p0) * mm + (c.p2 - c.p1) * (2.0 * mt) + (c.p3 - c.p2) * tt;
    (p, d)
}

fn quad_start_tangent(q: &QuadBez) -> Vec2 {
    let d01 = q.p1 - q.p0;
    if d01.hypot2() > ROBUST_EPSILON {
        d01
    } else {
        q.p2 - q.p0
    }
}

fn quad_end_tangent(q: &QuadBez) -> Vec2 {
    let d12 = q.p2 - q.p1;
    if d12.hypot2() > ROBUST_EPSILON {
        d12
    } else {
        q.p2 - q.p0
    }
}

fn cubic_start_tangent(c: &CubicBez) -> Vec2 {
    let d01 = c.p1 - c.p0;
    let d02 = c.p2 - c.p0;
    let d03 = c.p3 - c.p0;
    if d01.hypot2() > ROBUST_EPSILON {
        d01
    } else if d02.hypot2() > ROBUST_EPSILON {
        d02
    } else {
        d03
    }
}

fn cubic_end_tangent(c: &CubicBez) -> Vec2 {
    let d23 = c.p3 - c.p2;
    let d13 = c.p3 - c.p1;
    let d03 = c.p3 - c.p0;
    if d23.hypot2() > ROBUST_EPSILON {
        d23
    } else if d13.hypot2() > ROBUST_EPSILON {
        d13
    } else {
        d03
    }
}

/// Normalizes `v`, falling back to `fallback` when the derivative is
/// too small to produce a stable direction.
fn unit(v: Vec2, fallback: Vec2) -> Vec2 {
    if v.hypot2() < DERIV_THRESH * DERIV_THRESH {
        fallback / fallback.hypot()
    } else {
        v / v.hypot()
    }
}

/// Unit tangent at the start of `q`.
pub(crate) fn quad_start_dir(q: &QuadBez) -> Vec2 {
    let t = quad_start_tangent(q);
    t / t.hypot()
}

/// Unit tangent at the start of `c`.
pub(crate) fn cubic_start_dir(c: &CubicBez) -> Vec2 {
    let t = cubic_start_tangent(c);
    t / t.hypot()
}

/// Approximate arc length of `q`: half the sum of its chord and
/// control-polygon lengths, measured on transformed control points.
pub fn quad_arc_length(q: &QuadBez, transform: Affine) -> f64 {
    let p0 = transform * q.p0;
    let p1 = transform * q.p1;
    let p2 = transform * q.p2;
    0.5 * ((p1 - p0).hypot() + (p2 - p1).hypot() + (p0 - p2).hypot())
}

/// Approximate arc length of `c`, as [`quad_arc_length`].
pub fn cubic_arc_length(c: &CubicBez, transform: Affine) -> f64 {
    let p0 = transform * c.p0;
    let p1 = transform * c.p1;
    let p2 = transform * c.p2;
    let p3 = transform * c.p3;
    0.5 * ((p1 - p0).hypot() + (p2 - p1).hypot() + (p3 - p2).hypot() + (p0 - p3).hypot())
}

/// Walks `q` as straight segments, invoking `emit` with each sample point
/// and its unit tangent. One sample per device unit of `arc_length`; the
/// final sample is exactly `q.p2`. Emits nothing for degenerate curves.
pub fn flatten_quad(q: &QuadBez, arc_length: f64, emit: &mut impl FnMut(Point, Vec2)) {
    if arc_length < f64::EPSILON {
        return;
    }
    let step = arc_length.recip();
    let mut t = step;
    while t < 1.0 {
        let (p, d) = eval_quad_and_deriv(q, t);
        emit(p, unit(d, quad_end_tangent(q)));
        t += step;
    }
    emit(q.p2, unit(quad_end_tangent(q), Vec2::new(1.0, 0.0)));
}

/// Walks `c` as straight segments, as [`flatten_quad`].
pub fn flatten_cubic(c: &CubicBez, arc_length: f64, emit: &mut impl FnMut(Point, Vec2)) {
    if arc_length < f64::EPSILON {
        return;
    }
    let step = arc_length.recip();
    let mut t = step;
    while t < 1.0 {
        let (p, d) = eval_cubic_and_deriv(c, t);
        emit(p, unit(d, cubic_end_tangent(c)));
        t += step;
    }
    emit(c.p3, unit(cubic_end_tangent(c), Vec2::new(1.0, 0.0)));
}
