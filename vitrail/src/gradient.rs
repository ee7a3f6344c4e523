// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shading geometry for the second (shading) pass.
//!
//! Each [`Shading`] variant rasterizes to colored triangles covering the
//! visible extent of the viewport; the stencil test from pass 1 masks them
//! down to the filled or stroked shape. Colors are interpolated only
//! within a stop interval, never extrapolated: clipped intervals get their
//! endpoint colors re-interpolated at the clip boundary.

use std::f64::consts::{PI, TAU};

use peniko::kurbo::{Affine, Point};
use peniko::{Color, ColorStop, Extend};

use crate::batch::{AtlasTexture, Vertex};
use crate::shading::{self, Shading};

/// Angular step of radial ring strips.
const RADIAL_STEP: f64 = PI / 45.0;
/// Angular step of the conic fan.
const CONIC_STEP: f64 = PI / 180.0;
/// Tile budget above which an image tiling is considered degenerate.
const MAX_IMAGE_TILES: usize = 16384;

/// Corners of the clip-space viewport.
const VIEWPORT_CORNERS: [Point; 4] = [
    Point::new(-1.0, -1.0),
    Point::new(-1.0, 1.0),
    Point::new(1.0, 1.0),
    Point::new(1.0, -1.0),
];

/// Geometry covering the viewport for one shading descriptor.
#[derive(Clone, Debug, Default)]
pub struct ShadingGeometry {
    pub vertices: Vec<Vertex>,
    /// Texture bound for the batch; only tiled-image shading sets this.
    pub texture: Option<AtlasTexture>,
}

/// Rasterizes `shading` into viewport-covering geometry.
///
/// `view_transform` maps canvas space to clip space; gradient descriptors
/// are given in canvas space. Degenerate descriptors (empty stop lists,
/// zero-length axes) produce empty or solid geometry, never an error.
pub fn rasterize_shading(shading: &Shading, view_transform: Affine) -> ShadingGeometry {
    let mut geometry = ShadingGeometry::default();
    match shading {
        Shading::Solid(color) => solid(*color, &mut geometry),
        Shading::Linear {
            stops,
            start,
            end,
            extend,
        } => linear(stops, *start, *end, *extend, view_transform, &mut geometry),
        Shading::Radial {
            stops,
            center,
            start_radius,
            end_radius,
            extend,
        } => radial(
            stops,
            *center,
            *start_radius,
            *end_radius,
            *extend,
            view_transform,
            &mut geometry,
        ),
        Shading::Conic {
            stops,
            center,
            angle,
        } => conic(stops, *center, *angle, view_transform, &mut geometry),
        Shading::TiledImage {
            texture,
            origin,
            scale,
        } => tiled_image(*texture, *origin, *scale, view_transform, &mut geometry),
    }
    geometry
}

fn solid(color: Color, out: &mut ShadingGeometry) {
    let c = shading::color_components(color);
    let v = |x: f32, y: f32| Vertex {
        position: [x, y],
        texcoord: [0.0; 2],
        color: c,
    };
    out.vertices.extend_from_slice(&[
        v(-1.0, -1.0),
        v(-1.0, 1.0),
        v(1.0, -1.0),
        v(1.0, -1.0),
        v(-1.0, 1.0),
        v(1.0, 1.0),
    ]);
}

/// Canvas-space bounding box of the viewport corners under `transform`.
fn corner_extent(transform: Affine) -> (f64, f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for corner in VIEWPORT_CORNERS {
        let p = transform * corner;
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    (min_x, max_x, min_y, max_y)
}

/// Farthest viewport corner from `center`, in canvas units.
fn corner_reach(view_transform: Affine, center: Point) -> f64 {
    let inv = view_transform.inverse();
    VIEWPORT_CORNERS
        .iter()
        .map(|corner| ((inv * *corner) - center).hypot2())
        .fold(0.0, f64::max)
        .sqrt()
}

fn linear(
    stops: &[ColorStop],
    start: Point,
    end: Point,
    extend: Extend,
    view_transform: Affine,
    out: &mut ShadingGeometry,
) {
    let stops = shading::normalize_stops(stops);
    if stops.is_empty() {
        return;
    }
    let axis = end - start;
    let length = axis.hypot();
    if length < f64::EPSILON {
        return solid(stops[0].color, out);
    }
    let dir = axis / length;
    // Gradient space to canvas space: (0, 0) maps to start, (1, 0) to end.
    let gradient_transform = Affine::new([
        dir.x * length,
        dir.y * length,
        -dir.y,
        dir.x,
        start.x,
        start.y,
    ]);
    let to_gradient = gradient_transform.inverse() * view_transform.inverse();
    let (min_x, max_x, min_y, max_y) = corner_extent(to_gradient);
    let to_clip = view_transform * gradient_transform;

    let mut quad = |x1: f64, x2: f64, c1: [f32; 4], c2: [f32; 4]| {
        let v = |x: f64, y: f64, c: [f32; 4]| Vertex::colored(to_clip, Point::new(x, y), c);
        let verts = [
            v(x1, max_y, c1),
            v(x1, min_y, c1),
            v(x2, max_y, c2),
            v(x2, min_y, c2),
        ];
        out.vertices
            .extend_from_slice(&[verts[0], verts[1], verts[2], verts[2], verts[1], verts[3]]);
    };

    match extend {
        Extend::Pad => {
            for pair in stops.windows(2) {
                let (s1, s2) = (pair[0], pair[1]);
                quad(
                    s1.offset as f64,
                    s2.offset as f64,
                    shading::color_components(s1.color),
                    shading::color_components(s2.color),
                );
            }
            let first = stops[0];
            if (first.offset as f64) > min_x {
                let c = shading::color_components(first.color);
                quad(min_x, first.offset as f64, c, c);
            }
            let last = stops[stops.len() - 1];
            if (last.offset as f64) < max_x {
                let c = shading::color_components(last.color);
                quad(last.offset as f64, max_x, c, c);
            }
        }
        Extend::Repeat => {
            let mut pos = min_x.floor();
            while pos < max_x.ceil() {
                for pair in stops.windows(2) {
                    let (s1, s2) = (pair[0], pair[1]);
                    let lo = s1.offset as f64 + pos;
                    let hi = s2.offset as f64 + pos;
                    if lo > max_x {
                        break;
                    }
                    if hi < min_x {
                        continue;
                    }
                    quad(
                        lo,
                        hi,
                        shading::color_components(s1.color),
                        shading::color_components(s2.color),
                    );
                }
                pos += 1.0;
            }
        }
        Extend::Reflect => {
            let mut pos = min_x.floor();
            while pos < max_x.ceil() {
                let reversed = (pos.abs() % 2.0).round() == 1.0;
                for i in 0..stops.len() - 1 {
                    // Reversed cycles run the stop list backward so that
                    // intervals still ascend within the cycle.
                    let (s1, s2, lo, hi) = if reversed {
                        let a = stops[stops.len() - 1 - i];
                        let b = stops[stops.len() - 2 - i];
                        (a, b, 1.0 - a.offset as f64, 1.0 - b.offset as f64)
                    } else {
                        let a = stops[i];
                        let b = stops[i + 1];
                        (a, b, a.offset as f64, b.offset as f64)
                    };
                    if lo + pos > max_x {
                        break;
                    }
                    if hi + pos < min_x {
                        continue;
                    }
                    quad(
                        lo + pos,
                        hi + pos,
                        shading::color_components(s1.color),
                        shading::color_components(s2.color),
                    );
                }
                pos += 1.0;
            }
        }
    }
}

fn radial(
    stops: &[ColorStop],
    center: Point,
    start_radius: f64,
    end_radius: f64,
    extend: Extend,
    view_transform: Affine,
    out: &mut ShadingGeometry,
) {
    let stops = shading::normalize_stops(stops);
    if stops.is_empty() {
        return;
    }
    let length = (end_radius - start_radius).abs();
    if length < f64::EPSILON {
        // A zero-width radius span degenerates to a solid fill of the
        // dominant stop.
        let dominant = match extend {
            Extend::Repeat => stops[stops.len() - 1],
            _ => stops[0],
        };
        return solid(dominant.color, out);
    }
    let reach = corner_reach(view_transform, center);
    let to_clip = view_transform * Affine::translate(center.to_vec2());

    let mut arc = |x1: f64, x2: f64, c1: Color, c2: Color| {
        if (x1 >= reach && x2 >= reach) || (x1 <= 0.0 && x2 <= 0.0) {
            return;
        }
        if (x2 - x1).abs() < f64::EPSILON {
            return;
        }
        let (mut x1, mut x2, mut c1, mut c2) = if x1 > x2 {
            (x2, x1, c2, c1)
        } else {
            (x1, x2, c1, c2)
        };
        // Re-interpolate colors at the clamp so nothing extrapolates.
        if x1 < 0.0 {
            c1 = shading::lerp_color(c1, c2, -x1 / (x2 - x1));
            x1 = 0.0;
        }
        if x2 > reach {
            c2 = shading::lerp_color(c1, c2, (reach - x1) / (x2 - x1));
            x2 = reach;
        }
        if x2 - x1 < f64::EPSILON {
            return;
        }
        let ca = shading::color_components(c1);
        let cb = shading::color_components(c2);
        let (sin, cos) = RADIAL_STEP.sin_cos();
        let p0 = Point::new(x1, 0.0);
        let p1 = Point::new(x1 * cos, x1 * sin);
        let p2 = Point::new(x2, 0.0);
        let p3 = Point::new(x2 * cos, x2 * sin);
        // A zero inner radius collapses the strip quad to a triangle.
        let quad_pts = [p1, p0, p3, p3, p0, p2];
        let quad_cols = [ca, ca, cb, cb, ca, cb];
        let tri_pts = [p0, p2, p3];
        let tri_cols = [ca, cb, cb];
        let (pts, cols): (&[Point], &[[f32; 4]]) = if (p1 - p0).hypot2() < f64::EPSILON {
            (&tri_pts, &tri_cols)
        } else {
            (&quad_pts, &quad_cols)
        };
        let mut progress = 0.0;
        while progress < TAU {
            let (ps, pc) = progress.sin_cos();
            for (p, color) in pts.iter().zip(cols) {
                let rotated = Point::new(p.x * pc - p.y * ps, p.x * ps + p.y * pc);
                out.vertices.push(Vertex::colored(to_clip, rotated, *color));
            }
            progress += RADIAL_STEP;
        }
    };

    match extend {
        Extend::Pad => {
            let first = stops[0];
            let last = stops[stops.len() - 1];
            if end_radius > start_radius {
                arc(0.0, start_radius, first.color, first.color);
                for pair in stops.windows(2) {
                    let (s1, s2) = (pair[0], pair[1]);
                    let lo = s1.offset as f64 * length + start_radius;
                    let hi = s2.offset as f64 * length + start_radius;
                    if lo >= reach && hi >= reach {
                        break;
                    }
                    arc(lo, hi, s1.color, s2.color);
                }
                arc(end_radius, reach, last.color, last.color);
            } else {
                arc(0.0, end_radius, last.color, last.color);
                for pair in stops.windows(2) {
                    let (s1, s2) = (pair[0], pair[1]);
                    let lo = start_radius - s1.offset as f64 * length;
                    let hi = start_radius - s2.offset as f64 * length;
                    if lo <= 0.0 && hi <= 0.0 {
                        break;
                    }
                    arc(lo, hi, s1.color, s2.color);
                }
                arc(start_radius, reach, first.color, first.color);
            }
        }
        Extend::Repeat => {
            let reverse = end_radius < start_radius;
            let mut cursor = start_radius;
            while cursor > 0.0 {
                cursor -= length;
            }
            while cursor < reach {
                for pair in stops.windows(2) {
                    let (s1, s2) = (pair[0], pair[1]);
                    if reverse {
                        let lo = cursor + length - s1.offset as f64 * length;
                        let hi = cursor + length - s2.offset as f64 * length;
                        if lo <= 0.0 && hi <= 0.0 {
                            break;
                        }
                        arc(lo, hi, s1.color, s2.color);
                    } else {
                        let lo = s1.offset as f64 * length + cursor;
                        let hi = s2.offset as f64 * length + cursor;
                        if lo >= reach && hi >= reach {
                            break;
                        }
                        arc(lo, hi, s1.color, s2.color);
                    }
                }
                cursor += length;
            }
        }
        Extend::Reflect => {
            // Reversal parity is anchored at the start radius: every whole
            // cycle walked down (or up) flips the direction once.
            let mut cursor = start_radius;
            let mut reverse = false;
            while cursor > 0.0 {
                cursor -= length;
                reverse = !reverse;
            }
            while cursor < reach {
                for pair in stops.windows(2) {
                    let (s1, s2) = (pair[0], pair[1]);
                    if reverse {
                        let lo = cursor + length - s1.offset as f64 * length;
                        let hi = cursor + length - s2.offset as f64 * length;
                        if lo <= 0.0 && hi <= 0.0 {
                            break;
                        }
                        arc(lo, hi, s1.color, s2.color);
                    } else {
                        let lo = s1.offset as f64 * length + cursor;
                        let hi = s2.offset as f64 * length + cursor;
                        if lo >= reach && hi >= reach {
                            break;
                        }
                        arc(lo, hi, s1.color, s2.color);
                    }
                }
                cursor += length;
                reverse = !reverse;
            }
        }
    }
}

fn conic(
    stops: &[ColorStop],
    center: Point,
    angle: f64,
    view_transform: Affine,
    out: &mut ShadingGeometry,
) {
    let stops = shading::normalize_stops(stops);
    if stops.is_empty() {
        return;
    }
    let reach = corner_reach(view_transform, center);
    let to_clip = view_transform
        * Affine::translate(center.to_vec2())
        * Affine::scale(reach)
        * Affine::rotate(angle);
    let apex = to_clip * Point::ZERO;
    let mut progress = 0.0;
    while progress < TAU {
        let next = progress + CONIC_STEP;
        let p0 = to_clip * Point::new(progress.cos(), progress.sin());
        let p1 = to_clip * Point::new(next.cos(), next.sin());
        let c1 = shading::color_components(shading::color_at(&stops, (progress / TAU) as f32));
        let c2 = shading::color_components(shading::color_at(&stops, (next / TAU) as f32));
        out.vertices.extend_from_slice(&[
            Vertex {
                position: [apex.x as f32, apex.y as f32],
                texcoord: [0.0; 2],
                color: c1,
            },
            Vertex {
                position: [p0.x as f32, p0.y as f32],
                texcoord: [0.0; 2],
                color: c1,
            },
            Vertex {
                position: [p1.x as f32, p1.y as f32],
                texcoord: [0.0; 2],
                color: c2,
            },
        ]);
        progress = next;
    }
}

fn tiled_image(
    texture: AtlasTexture,
    origin: Point,
    scale: f64,
    view_transform: Affine,
    out: &mut ShadingGeometry,
) {
    if texture.width == 0 || texture.height == 0 || !(scale > 0.0) {
        return;
    }
    let tile_w = texture.width as f64 * scale;
    let tile_h = texture.height as f64 * scale;
    let (min_x, max_x, min_y, max_y) = corner_extent(view_transform.inverse());
    let columns = ((max_x - min_x) / tile_w).ceil() as usize + 1;
    let rows = ((max_y - min_y) / tile_h).ceil() as usize + 1;
    if columns.saturating_mul(rows) > MAX_IMAGE_TILES {
        log::warn!("tiled image shading: {columns}x{rows} tiles exceeds budget, skipping");
        return;
    }
    let x0 = origin.x + ((min_x - origin.x) / tile_w).floor() * tile_w;
    let y0 = origin.y + ((min_y - origin.y) / tile_h).floor() * tile_h;
    let white = [1.0; 4];
    let mut y = y0;
    while y < max_y {
        let mut x = x0;
        while x < max_x {
            let v = |px: f64, py: f64, u: f32, w: f32| {
                Vertex::textured(view_transform, Point::new(px, py), [u, w], white)
            };
            let lt = v(x, y, 0.0, 0.0);
            let rt = v(x + tile_w, y, 1.0, 0.0);
            let lb = v(x, y + tile_h, 0.0, 1.0);
            let rb = v(x + tile_w, y + tile_h, 1.0, 1.0);
            out.vertices.extend_from_slice(&[lb, lt, rb, rb, lt, rt]);
            x += tile_w;
        }
        y += tile_h;
    }
    out.texture = Some(texture);
}
