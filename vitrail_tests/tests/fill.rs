// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fill properties: rule-independent coverage of convex shapes and the
//! fan's role as a pure stencil-winding carrier.

use vitrail::kurbo::{Affine, BezPath, Point, Rect, Shape};
use vitrail::peniko::{Color, Fill};
use vitrail::{path_contains, tessellate_fill, Shading, StencilMode};
use vitrail_tests::record_fill;

fn convex_pentagon() -> BezPath {
    let mut path = BezPath::new();
    path.move_to((50.0, 10.0));
    path.line_to((90.0, 40.0));
    path.line_to((75.0, 85.0));
    path.line_to((25.0, 85.0));
    path.line_to((10.0, 40.0));
    path.close_path();
    path
}

#[test]
fn convex_coverage_is_identical_under_both_rules() {
    // A convex path has winding 0 or ±1 everywhere, so the non-zero and
    // even-odd rules select the same pixels.
    let path = convex_pentagon();
    for x in (0..100).step_by(3) {
        for y in (0..100).step_by(3) {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            assert_eq!(
                path_contains(&path, p, Fill::NonZero),
                path_contains(&path, p, Fill::EvenOdd),
                "disagreement at {p:?}"
            );
        }
    }
}

#[test]
fn both_rules_share_the_same_stencil_geometry() {
    let path = convex_pentagon();
    let shading = Shading::color(Color::rgb8(255, 0, 0));
    let nz = record_fill(&path, Fill::NonZero, &shading).unwrap();
    let eo = record_fill(&path, Fill::EvenOdd, &shading).unwrap();

    let nz_pass = &nz.passes[0];
    let eo_pass = &eo.passes[0];
    assert_eq!(nz_pass.draws[0].vertices, eo_pass.draws[0].vertices);
    assert_eq!(nz_pass.draws[0].stencil, StencilMode::MakeFill);
    assert_eq!(eo_pass.draws[0].stencil, StencilMode::MakeFill);
    // Only the pass-2 stencil test differs.
    assert_eq!(nz_pass.draws[1].stencil, StencilMode::TestNonZero);
    assert_eq!(eo_pass.draws[1].stencil, StencilMode::TestEven);
}

#[test]
fn fan_pivots_on_the_mean_vertex() {
    let path = Rect::new(10.0, 10.0, 30.0, 20.0).to_path(0.1);
    let vertices = tessellate_fill(&path, Affine::IDENTITY, Affine::IDENTITY, 1.0);
    assert_eq!(vertices.len(), 12);
    // Every triangle's third vertex is the arithmetic mean of the corners.
    let pivot = vertices[2].position;
    assert!((pivot[0] - 20.0).abs() < 1e-5);
    assert!((pivot[1] - 15.0).abs() < 1e-5);
    for triangle in vertices.chunks(3) {
        assert_eq!(triangle[2].position, pivot);
    }
}

#[test]
fn self_intersecting_path_still_tessellates() {
    // A bowtie; the fan itself need not be a valid triangulation, only a
    // winding carrier.
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.line_to((100.0, 100.0));
    path.line_to((100.0, 0.0));
    path.line_to((0.0, 100.0));
    path.close_path();
    let vertices = tessellate_fill(&path, Affine::IDENTITY, Affine::IDENTITY, 1.0);
    assert_eq!(vertices.len(), 12);
}

#[test]
fn multiple_subpaths_fan_independently() {
    let mut path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
    for el in Rect::new(20.0, 0.0, 30.0, 10.0).to_path(0.1).elements() {
        path.push(*el);
    }
    let vertices = tessellate_fill(&path, Affine::IDENTITY, Affine::IDENTITY, 1.0);
    assert_eq!(vertices.len(), 24);
}

#[test]
fn curved_subpaths_flatten_before_fanning() {
    let circle = vitrail::kurbo::Circle::new((50.0, 50.0), 40.0).to_path(0.1);
    let vertices = tessellate_fill(&circle, Affine::IDENTITY, Affine::IDENTITY, 1.0);
    // Plenty of flattened samples, all in fan triangles.
    assert!(vertices.len() > 3 * 8);
    assert_eq!(vertices.len() % 3, 0);
}
