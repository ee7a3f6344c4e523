// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fill tessellation: stencil-winding fan geometry and point containment.

use peniko::kurbo::{Affine, BezPath, CubicBez, PathEl, Point, QuadBez, Vec2};
use peniko::Fill;

use crate::batch::Vertex;
use crate::flatten;

/// Flattened vertex sequence of each subpath, in object space.
fn subpath_polygons(path: &BezPath, to_device: Affine) -> Vec<Vec<Point>> {
    let mut polygons: Vec<Vec<Point>> = Vec::new();
    let mut polygon: Vec<Point> = Vec::new();
    let mut initial: Option<Point> = None;
    let mut current: Option<Point> = None;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(to) => {
                polygons.push(std::mem::take(&mut polygon));
                initial = Some(to);
                current = Some(to);
            }
            PathEl::LineTo(p1) => {
                if let Some(p0) = current {
                    if polygon.is_empty() {
                        polygon.push(p0);
                    }
                    polygon.push(p1);
                }
                current = Some(p1);
            }
            PathEl::QuadTo(c1, p2) => {
                if let Some(p0) = current {
                    let q = QuadBez::new(p0, c1, p2);
                    let length = flatten::quad_arc_length(&q, to_device);
                    if length > f64::EPSILON {
                        if polygon.is_empty() {
                            polygon.push(p0);
                        }
                        flatten::flatten_quad(&q, length, &mut |p, _| polygon.push(p));
                    }
                }
                current = Some(p2);
            }
            PathEl::CurveTo(c1, c2, p3) => {
                if let Some(p0) = current {
                    let c = CubicBez::new(p0, c1, c2, p3);
                    let length = flatten::cubic_arc_length(&c, to_device);
                    if length > f64::EPSILON {
                        if polygon.is_empty() {
                            polygon.push(p0);
                        }
                        flatten::flatten_cubic(&c, length, &mut |p, _| polygon.push(p));
                    }
                }
                current = Some(p3);
            }
            PathEl::ClosePath => {
                polygons.push(std::mem::take(&mut polygon));
                current = initial;
            }
        }
    }
    polygons.push(polygon);
    polygons
}

/// Tessellates the fill of `path` into stencil-pass triangles: one fan per
/// subpath around its mean vertex. The fan only carries winding numbers
/// for the stencil pass, so non-convex and self-intersecting subpaths need
/// no further treatment; the mean vertex is not a true centroid and does
/// not have to be.
///
/// Subpaths with fewer than two vertices are skipped. An empty result
/// means there is nothing to draw.
pub fn tessellate_fill(
    path: &BezPath,
    transform: Affine,
    view_transform: Affine,
    scale_factor: f64,
) -> Vec<Vertex> {
    if path.elements().is_empty() {
        return Vec::new();
    }
    let to_device = Affine::scale(scale_factor) * transform;
    let to_clip = view_transform * transform;
    let mut vertices = Vec::new();
    for polygon in subpath_polygons(path, to_device) {
        if polygon.len() < 2 {
            continue;
        }
        let mapped: Vec<Point> = polygon.iter().map(|p| to_clip * *p).collect();
        let center = (mapped.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2())
            / mapped.len() as f64)
            .to_point();
        let push = |vertices: &mut Vec<Vertex>, p: Point| {
            vertices.push(Vertex {
                position: [p.x as f32, p.y as f32],
                ..Default::default()
            });
        };
        for i in 1..mapped.len() {
            push(&mut vertices, mapped[i - 1]);
            push(&mut vertices, mapped[i]);
            push(&mut vertices, center);
        }
        push(&mut vertices, mapped[mapped.len() - 1]);
        push(&mut vertices, mapped[0]);
        push(&mut vertices, center);
    }
    vertices
}

/// Winding-number point containment, matching the coverage the stencil
/// passes produce. Open subpaths are treated as implicitly closed only at
/// an explicit `ClosePath`, like the fill pass itself.
pub fn path_contains(path: &BezPath, p: Point, rule: Fill) -> bool {
    let mut winding: i32 = 0;
    let mut check = |p0: Point, p1: Point| {
        if p0.y.min(p1.y) <= p.y && p0.y.max(p1.y) > p.y && p0.x.min(p1.x) < p.x {
            let dy = p1.y - p0.y;
            let dx = p1.x - p0.x;
            if p0.x.max(p1.x) <= p.x || dx.abs() < f64::EPSILON {
                if p0.x <= p.x {
                    if dy > 0.0 {
                        winding -= 1;
                    } else {
                        winding += 1;
                    }
                }
            } else {
                let a = dx / dy;
                let x = (p.y - p1.y) * a + p1.x;
                if x <= p.x {
                    if a < 0.0 {
                        winding -= 1;
                    } else {
                        winding += 1;
                    }
                }
            }
        }
    };

    let mut start: Option<Point> = None;
    let mut current: Option<Point> = None;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(to) => {
                start = Some(to);
                current = Some(to);
            }
            PathEl::LineTo(p1) => {
                if let Some(p0) = current {
                    check(p0, p1);
                    current = Some(p1);
                }
            }
            PathEl::QuadTo(c1, p2) => {
                if let Some(p0) = current {
                    let q = QuadBez::new(p0, c1, p2);
                    let length = flatten::quad_arc_length(&q, Affine::IDENTITY);
                    let mut prev = p0;
                    flatten::flatten_quad(&q, length, &mut |pt, _| {
                        check(prev, pt);
                        prev = pt;
                    });
                    current = Some(p2);
                }
            }
            PathEl::CurveTo(c1, c2, p3) => {
                if let Some(p0) = current {
                    let c = CubicBez::new(p0, c1, c2, p3);
                    let length = flatten::cubic_arc_length(&c, Affine::IDENTITY);
                    let mut prev = p0;
                    flatten::flatten_cubic(&c, length, &mut |pt, _| {
                        check(prev, pt);
                        prev = pt;
                    });
                    current = Some(p3);
                }
            }
            PathEl::ClosePath => {
                if let (Some(p0), Some(p1)) = (current, start) {
                    check(p0, p1);
                }
                current = start;
            }
        }
    }
    match rule {
        Fill::EvenOdd => winding % 2 != 0,
        Fill::NonZero => winding != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::kurbo::{Rect, Shape};

    fn rect_path() -> BezPath {
        Rect::new(10.0, 10.0, 30.0, 20.0).to_path(0.1)
    }

    #[test]
    fn rect_fans_into_four_triangles() {
        let vertices = tessellate_fill(&rect_path(), Affine::IDENTITY, Affine::IDENTITY, 1.0);
        assert_eq!(vertices.len(), 12);
    }

    #[test]
    fn single_point_subpath_is_skipped() {
        let mut path = BezPath::new();
        path.move_to((5.0, 5.0));
        path.line_to((5.0, 5.0));
        path.close_path();
        // A single repeated point still yields a two-vertex "polygon" whose
        // fan triangles are degenerate but harmless; an empty move yields
        // nothing at all.
        let mut empty = BezPath::new();
        empty.move_to((5.0, 5.0));
        assert!(tessellate_fill(&empty, Affine::IDENTITY, Affine::IDENTITY, 1.0).is_empty());
    }

    #[test]
    fn contains_agrees_with_both_rules_on_convex_shapes() {
        let path = rect_path();
        for (x, y, inside) in [
            (15.0, 15.0, true),
            (29.9, 19.9, true),
            (5.0, 15.0, false),
            (35.0, 15.0, false),
            (15.0, 25.0, false),
        ] {
            let p = Point::new(x, y);
            assert_eq!(path_contains(&path, p, Fill::NonZero), inside, "{p:?}");
            assert_eq!(path_contains(&path, p, Fill::EvenOdd), inside, "{p:?}");
        }
    }

    #[test]
    fn even_odd_excludes_doubly_wound_region() {
        // Two overlapping rects wound the same way: the overlap has
        // winding 2, which the even-odd rule excludes.
        let mut path = Rect::new(0.0, 0.0, 20.0, 20.0).to_path(0.1);
        for el in Rect::new(10.0, 0.0, 30.0, 20.0).to_path(0.1).elements() {
            path.push(*el);
        }
        let overlap = Point::new(15.0, 10.0);
        assert!(path_contains(&path, overlap, Fill::NonZero));
        assert!(!path_contains(&path, overlap, Fill::EvenOdd));
    }
}
