// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gradient rasterization properties, chiefly interpolation boundedness:
//! no emitted vertex color may extrapolate beyond its stop interval.

use vitrail::kurbo::{Affine, Point};
use vitrail::peniko::{Color, ColorStop, Extend};
use vitrail::{rasterize_shading, Shading, Vertex};

const RED: Color = Color::rgb8(255, 0, 0);
const GREEN: Color = Color::rgb8(0, 255, 0);
const BLUE: Color = Color::rgb8(0, 0, 255);

fn stops() -> Vec<ColorStop> {
    vec![
        ColorStop::from((0.0, RED)),
        ColorStop::from((0.5, GREEN)),
        ColorStop::from((1.0, BLUE)),
    ]
}

fn components(c: Color) -> [f32; 4] {
    [
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        c.a as f32 / 255.0,
    ]
}

/// Every vertex color must lie componentwise inside the range spanned by
/// at least one adjacent stop pair.
fn assert_bounded(vertices: &[Vertex], stops: &[ColorStop]) {
    let pairs: Vec<([f32; 4], [f32; 4])> = stops
        .windows(2)
        .map(|pair| (components(pair[0].color), components(pair[1].color)))
        .collect();
    for vertex in vertices {
        let inside_some_pair = pairs.iter().any(|(a, b)| {
            vertex.color.iter().enumerate().all(|(i, c)| {
                let lo = a[i].min(b[i]) - 1e-3;
                let hi = a[i].max(b[i]) + 1e-3;
                (lo..=hi).contains(c)
            })
        });
        assert!(
            inside_some_pair,
            "color {:?} extrapolates beyond every stop pair",
            vertex.color
        );
    }
}

#[test]
fn linear_pad_never_extrapolates() {
    let shading = Shading::Linear {
        stops: stops().into_iter().collect(),
        start: Point::new(-0.4, 0.0),
        end: Point::new(0.4, 0.0),
        extend: Extend::Pad,
    };
    let geometry = rasterize_shading(&shading, Affine::IDENTITY);
    assert!(!geometry.vertices.is_empty());
    assert_bounded(&geometry.vertices, &stops());
}

#[test]
fn linear_repeat_and_reflect_stay_bounded() {
    for extend in [Extend::Repeat, Extend::Reflect] {
        let shading = Shading::Linear {
            stops: stops().into_iter().collect(),
            start: Point::new(-0.1, 0.0),
            end: Point::new(0.1, 0.0),
            extend,
        };
        let geometry = rasterize_shading(&shading, Affine::IDENTITY);
        // Several cycles must cover the viewport.
        assert!(geometry.vertices.len() > 3 * 6, "{extend:?}");
        assert_bounded(&geometry.vertices, &stops());
    }
}

#[test]
fn linear_pad_extends_edge_colors() {
    let shading = Shading::Linear {
        stops: stops().into_iter().collect(),
        start: Point::new(-0.2, 0.0),
        end: Point::new(0.2, 0.0),
        extend: Extend::Pad,
    };
    let geometry = rasterize_shading(&shading, Affine::IDENTITY);
    // Pad emits two extension quads; their colors are exactly the edge
    // stop colors.
    let first = components(RED);
    let last = components(BLUE);
    assert!(geometry.vertices.iter().any(|v| v.color == first));
    assert!(geometry.vertices.iter().any(|v| v.color == last));
}

#[test]
fn degenerate_linear_collapses_to_first_stop() {
    let shading = Shading::Linear {
        stops: stops().into_iter().collect(),
        start: Point::new(0.3, 0.3),
        end: Point::new(0.3, 0.3),
        extend: Extend::Pad,
    };
    let geometry = rasterize_shading(&shading, Affine::IDENTITY);
    assert_eq!(geometry.vertices.len(), 6);
    assert!(geometry.vertices.iter().all(|v| v.color == components(RED)));
}

#[test]
fn radial_stays_bounded_under_all_tilings() {
    for extend in [Extend::Pad, Extend::Repeat, Extend::Reflect] {
        let shading = Shading::Radial {
            stops: stops().into_iter().collect(),
            center: Point::new(0.1, -0.2),
            start_radius: 0.3,
            end_radius: 0.9,
            extend,
        };
        let geometry = rasterize_shading(&shading, Affine::IDENTITY);
        assert!(!geometry.vertices.is_empty(), "{extend:?}");
        assert_bounded(&geometry.vertices, &stops());
    }
}

#[test]
fn inverted_radial_stays_bounded() {
    let shading = Shading::Radial {
        stops: stops().into_iter().collect(),
        center: Point::ZERO,
        start_radius: 0.8,
        end_radius: 0.2,
        extend: Extend::Pad,
    };
    let geometry = rasterize_shading(&shading, Affine::IDENTITY);
    assert!(!geometry.vertices.is_empty());
    assert_bounded(&geometry.vertices, &stops());
}

#[test]
fn degenerate_radial_uses_dominant_stop() {
    let base = |extend| Shading::Radial {
        stops: stops().into_iter().collect(),
        center: Point::ZERO,
        start_radius: 0.5,
        end_radius: 0.5,
        extend,
    };
    let pad = rasterize_shading(&base(Extend::Pad), Affine::IDENTITY);
    assert_eq!(pad.vertices.len(), 6);
    assert!(pad.vertices.iter().all(|v| v.color == components(RED)));

    let repeat = rasterize_shading(&base(Extend::Repeat), Affine::IDENTITY);
    assert!(repeat.vertices.iter().all(|v| v.color == components(BLUE)));
}

#[test]
fn conic_fan_interpolates_the_full_wheel() {
    let shading = Shading::Conic {
        stops: stops().into_iter().collect(),
        center: Point::ZERO,
        angle: 0.3,
    };
    let geometry = rasterize_shading(&shading, Affine::IDENTITY);
    assert_eq!(geometry.vertices.len() % 3, 0);
    // Roughly one triangle per degree.
    assert!(geometry.vertices.len() >= 358 * 3);
    assert_bounded(&geometry.vertices, &stops());
    // The wheel starts at the first stop color.
    assert_eq!(geometry.vertices[0].color, components(RED));
}

#[test]
fn tiled_image_quads_span_unit_uv() {
    let texture = vitrail::AtlasTexture {
        id: 3,
        width: 32,
        height: 32,
    };
    let shading = Shading::TiledImage {
        texture,
        origin: Point::new(0.05, 0.05),
        scale: 0.01,
    };
    let geometry = rasterize_shading(&shading, Affine::IDENTITY);
    assert_eq!(geometry.texture, Some(texture));
    assert!(!geometry.vertices.is_empty());
    assert_eq!(geometry.vertices.len() % 6, 0);
    for vertex in &geometry.vertices {
        assert!((0.0..=1.0).contains(&vertex.texcoord[0]));
        assert!((0.0..=1.0).contains(&vertex.texcoord[1]));
    }
}
