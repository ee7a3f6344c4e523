// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-pass protocol structure: stencil accumulation before shading,
//! batch tagging, and boundary failure behavior.

use vitrail::kurbo::{Rect, Shape, Size, Stroke};
use vitrail::peniko::{Color, Extend, Fill};
use vitrail::{BlendMode, Compositor, Error, Shading, StencilMode};
use vitrail_tests::{atlas, record_fill, record_stroke, record_text, simple_run, RecordingBackend};

fn rect_path() -> vitrail::kurbo::BezPath {
    Rect::new(20.0, 20.0, 120.0, 80.0).to_path(0.1)
}

fn solid() -> Shading {
    Shading::color(Color::rgb8(200, 40, 40))
}

#[test]
fn fill_runs_stencil_then_shading() {
    let backend = record_fill(&rect_path(), Fill::NonZero, &solid()).unwrap();
    assert_eq!(backend.passes.len(), 1);
    let pass = &backend.passes[0];
    assert!(pass.stencil_enabled);
    assert_eq!(pass.draws.len(), 2);

    let mask = &pass.draws[0];
    assert_eq!(mask.stencil, StencilMode::MakeFill);
    assert_eq!(mask.blend, BlendMode::Opaque);
    assert!(mask.texture.is_none());
    assert_eq!(mask.vertices.len(), 12);

    let shade = &pass.draws[1];
    assert_eq!(shade.stencil, StencilMode::TestNonZero);
    assert_eq!(shade.vertices.len(), 6);
    // The shading quad covers the whole viewport in clip space.
    for vertex in &shade.vertices {
        assert!(vertex.position[0].abs() <= 1.0 + 1e-6);
        assert!(vertex.position[1].abs() <= 1.0 + 1e-6);
    }
}

#[test]
fn even_odd_fill_tags_the_parity_test() {
    let backend = record_fill(&rect_path(), Fill::EvenOdd, &solid()).unwrap();
    assert_eq!(backend.passes[0].draws[1].stencil, StencilMode::TestEven);
}

#[test]
fn stroke_replaces_stencil_and_tests_non_zero() {
    let style = Stroke::new(6.0);
    let backend = record_stroke(&rect_path(), &style, &solid()).unwrap();
    let pass = &backend.passes[0];
    assert!(pass.stencil_enabled);
    assert_eq!(pass.draws[0].stencil, StencilMode::MakeStroke);
    assert_eq!(pass.draws[1].stencil, StencilMode::TestNonZero);
}

#[test]
fn degenerate_path_draws_nothing() {
    let empty = vitrail::kurbo::BezPath::new();
    let backend = record_fill(&empty, Fill::NonZero, &solid()).unwrap();
    assert!(backend.passes.is_empty());

    let backend = record_stroke(&empty, &Stroke::new(4.0), &solid()).unwrap();
    assert!(backend.passes.is_empty());
}

#[test]
fn empty_shading_skips_the_shading_draw() {
    let shading = Shading::Linear {
        stops: Default::default(),
        start: (0.0, 0.0).into(),
        end: (1.0, 0.0).into(),
        extend: Extend::Pad,
    };
    let backend = record_fill(&rect_path(), Fill::NonZero, &shading).unwrap();
    assert_eq!(backend.passes.len(), 1);
    assert_eq!(backend.passes[0].draws.len(), 1);
}

#[test]
fn tiled_image_shading_binds_its_texture() {
    let shading = Shading::TiledImage {
        texture: atlas(5),
        origin: (0.0, 0.0).into(),
        scale: 0.05,
    };
    let backend = record_fill(&rect_path(), Fill::NonZero, &shading).unwrap();
    let shade = &backend.passes[0].draws[1];
    assert_eq!(shade.texture, Some(atlas(5)));
}

#[test]
fn buffer_failure_aborts_call_but_ends_pass() {
    let mut backend = RecordingBackend {
        fail_buffers: true,
        ..Default::default()
    };
    let mut compositor =
        Compositor::new(&mut backend, Size::new(200.0, 100.0), 1.0).unwrap();
    let err = compositor
        .fill(&rect_path(), Fill::NonZero, &solid())
        .unwrap_err();
    assert!(matches!(err, Error::BufferAllocation));
    drop(compositor);
    // The pass was still ended so the frame can continue.
    assert_eq!(backend.passes.len(), 1);
    assert!(backend.passes[0].draws.is_empty());
}

#[test]
fn pass_failure_aborts_before_any_draw() {
    let mut backend = RecordingBackend {
        fail_passes: true,
        ..Default::default()
    };
    let mut compositor =
        Compositor::new(&mut backend, Size::new(200.0, 100.0), 1.0).unwrap();
    let err = compositor
        .fill(&rect_path(), Fill::NonZero, &solid())
        .unwrap_err();
    assert!(matches!(err, Error::RenderPass));
    drop(compositor);
    assert!(backend.passes.is_empty());
}

#[test]
fn invalid_viewport_is_rejected() {
    let mut backend = RecordingBackend::default();
    let err = Compositor::new(&mut backend, Size::new(0.0, 100.0), 1.0).unwrap_err();
    assert!(matches!(err, Error::InvalidViewport { .. }));
}

#[test]
fn text_runs_mask_shading_then_attachments() {
    let run = simple_run("Hi");
    let backend = record_text(&run, Rect::new(0.0, 0.0, 100.0, 20.0), &solid()).unwrap();
    assert_eq!(backend.passes.len(), 1);
    let pass = &backend.passes[0];
    assert!(!pass.stencil_enabled);
    assert_eq!(pass.draws.len(), 2);

    let glyphs = &pass.draws[0];
    assert_eq!(glyphs.blend, BlendMode::AlphaBlend);
    assert_eq!(glyphs.stencil, StencilMode::Ignore);
    assert!(glyphs.texture.is_some());
    // Two glyphs, one quad each.
    assert_eq!(glyphs.vertices.len(), 12);

    let shade = &pass.draws[1];
    assert_eq!(shade.blend, BlendMode::Multiply);
    assert_eq!(shade.stencil, StencilMode::Ignore);
}

#[test]
fn glyph_batches_group_by_atlas_texture() {
    // Two faces with different atlas textures interleaved in one run
    // produce exactly two glyph batches.
    use vitrail_tests::FixtureFace;
    let restricted = FixtureFace::with_glyphs(['a', 'c']);
    let fallback = FixtureFace::face();
    let run = vitrail_tests::run_with(vec![restricted, fallback], "abca");
    let backend = record_text(&run, Rect::new(0.0, 0.0, 200.0, 20.0), &solid()).unwrap();
    let pass = &backend.passes[0];
    // Glyph batches precede the shading draw.
    let glyph_draws = &pass.draws[..pass.draws.len() - 1];
    assert_eq!(glyph_draws.len(), 2);
    let textures: Vec<_> = glyph_draws.iter().map(|d| d.texture.unwrap().id).collect();
    assert_eq!(textures, vec![1, 2]);
    // 'b' lands alone on the fallback atlas, the other three group.
    assert_eq!(glyph_draws[1].vertices.len(), 18);
    assert_eq!(glyph_draws[0].vertices.len(), 6);
}

#[test]
fn oversized_text_box_is_laid_out_then_clipped_by_wrap() {
    let run = simple_run("Hello, World! 1234567890");
    let backend = record_text(&run, Rect::new(0.0, 0.0, 100.0, 10.0), &solid()).unwrap();
    let glyphs = &backend.passes[0].draws[0];
    // Seven surviving glyphs plus the three-dot ellipsis.
    assert_eq!(glyphs.vertices.len(), 10 * 6);
}
