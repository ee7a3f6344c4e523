// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shading descriptors and gradient-stop arithmetic.

use peniko::kurbo::Point;
use peniko::{Color, ColorStop, ColorStops, ColorStopsSource, Extend};

use crate::batch::AtlasTexture;

/// What the shading pass paints through the stencil mask.
///
/// The host toolkit's style indirection is resolved to one of these
/// concrete variants before drawing; the rasterizer never sees styles.
#[derive(Clone, Debug, PartialEq)]
pub enum Shading {
    /// Uniform color.
    Solid(Color),
    /// Axis gradient between two points.
    Linear {
        stops: ColorStops,
        start: Point,
        end: Point,
        extend: Extend,
    },
    /// Radius gradient between two circles sharing a center.
    Radial {
        stops: ColorStops,
        center: Point,
        start_radius: f64,
        end_radius: f64,
        extend: Extend,
    },
    /// Angular gradient around a center, rotated by `angle` radians.
    /// Implicitly periodic; tiling options do not apply.
    Conic {
        stops: ColorStops,
        center: Point,
        angle: f64,
    },
    /// Repeating image anchored at `origin`, each tile `scale` times the
    /// texture's pixel size.
    TiledImage {
        texture: AtlasTexture,
        origin: Point,
        scale: f64,
    },
}

static_assertions::assert_impl_all!(Shading: Send, Sync);

impl Shading {
    pub fn color(color: Color) -> Self {
        Self::Solid(color)
    }

    pub fn linear_gradient(
        start: Point,
        end: Point,
        extend: Extend,
        stops: impl ColorStopsSource,
    ) -> Self {
        Self::Linear {
            stops: collect(stops),
            start,
            end,
            extend,
        }
    }

    pub fn radial_gradient(
        center: Point,
        start_radius: f64,
        end_radius: f64,
        extend: Extend,
        stops: impl ColorStopsSource,
    ) -> Self {
        Self::Radial {
            stops: collect(stops),
            center,
            start_radius,
            end_radius,
            extend,
        }
    }

    pub fn conic_gradient(center: Point, angle: f64, stops: impl ColorStopsSource) -> Self {
        Self::Conic {
            stops: collect(stops),
            center,
            angle,
        }
    }
}

fn collect(stops: impl ColorStopsSource) -> ColorStops {
    let mut out = ColorStops::new();
    stops.collect_stops(&mut out);
    out
}

/// Sorts stops and synthesizes the 0 and 1 endpoints, interpolating colors
/// for stops lying outside `[0, 1]`. Exact duplicates are dropped. The
/// rasterizer only ever sees the result, so locations are always ordered
/// and span the full unit range.
pub(crate) fn normalize_stops(stops: &[ColorStop]) -> ColorStops {
    let mut out = ColorStops::new();
    if stops.is_empty() {
        return out;
    }
    let mut sorted: ColorStops = stops.iter().copied().collect();
    sorted.sort_by(|a, b| {
        a.offset
            .partial_cmp(&b.offset)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out.push(ColorStop {
        offset: 0.0,
        color: color_at(&sorted, 0.0),
    });
    for s in sorted.iter() {
        if s.offset > 0.0 && s.offset < 1.0 {
            let duplicate = out
                .last()
                .is_some_and(|prev| prev.offset == s.offset && prev.color == s.color);
            if !duplicate {
                out.push(*s);
            }
        }
    }
    out.push(ColorStop {
        offset: 1.0,
        color: color_at(&sorted, 1.0),
    });
    out
}

/// Piecewise-linear color of sorted `stops` at `location`, clamped to the
/// end colors outside the stop range. `stops` must be non-empty.
pub(crate) fn color_at(stops: &[ColorStop], location: f32) -> Color {
    let mut current = stops[0];
    if location > current.offset {
        for next in &stops[1..] {
            if next.offset > location {
                let t = (location - current.offset) / (next.offset - current.offset);
                return lerp_color(current.color, next.color, t as f64);
            }
            current = *next;
        }
    }
    current.color
}

pub(crate) fn lerp_color(a: Color, b: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0) as f32;
    let lerp8 = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color::rgba8(
        lerp8(a.r, b.r),
        lerp8(a.g, b.g),
        lerp8(a.b, b.b),
        lerp8(a.a, b.a),
    )
}

/// RGBA components scaled to `[0, 1]` for vertex colors.
pub(crate) fn color_components(c: Color) -> [f32; 4] {
    [
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        c.a as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_synthesizes_endpoints() {
        let stops = [
            ColorStop::from((0.25, Color::rgb8(255, 0, 0))),
            ColorStop::from((0.75, Color::rgb8(0, 0, 255))),
        ];
        let out = normalize_stops(&stops);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].offset, 0.0);
        assert_eq!(out[0].color, stops[0].color);
        assert_eq!(out[3].offset, 1.0);
        assert_eq!(out[3].color, stops[1].color);
    }

    #[test]
    fn normalize_keeps_unit_range_stops() {
        let stops = [
            ColorStop::from((0.0, Color::rgb8(255, 0, 0))),
            ColorStop::from((1.0, Color::rgb8(0, 0, 255))),
        ];
        let out = normalize_stops(&stops);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].color, stops[0].color);
        assert_eq!(out[1].color, stops[1].color);
    }

    #[test]
    fn normalize_interpolates_out_of_range_stops() {
        let stops = [
            ColorStop::from((-1.0, Color::rgb8(0, 0, 0))),
            ColorStop::from((1.0, Color::rgb8(200, 200, 200))),
        ];
        let out = normalize_stops(&stops);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].color, Color::rgb8(100, 100, 100));
        assert_eq!(out[1].color, Color::rgb8(200, 200, 200));
    }

    #[test]
    fn normalize_sorts_and_dedupes() {
        let red = Color::rgb8(255, 0, 0);
        let stops = [
            ColorStop::from((0.5, red)),
            ColorStop::from((0.2, red)),
            ColorStop::from((0.5, red)),
        ];
        let out = normalize_stops(&stops);
        let offsets: Vec<f32> = out.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0.0, 0.2, 0.5, 1.0]);
    }

    #[test]
    fn color_at_interpolates_between_adjacent_stops() {
        let stops = [
            ColorStop::from((0.0, Color::rgb8(0, 0, 0))),
            ColorStop::from((1.0, Color::rgb8(255, 255, 255))),
        ];
        assert_eq!(color_at(&stops, 0.5), Color::rgb8(128, 128, 128));
        assert_eq!(color_at(&stops, -1.0), stops[0].color);
        assert_eq!(color_at(&stops, 2.0), stops[1].color);
    }
}
