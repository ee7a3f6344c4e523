// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for Vitrail integration tests: a recording render
//! backend and a deterministic fixture typeface.

use std::collections::HashSet;
use std::sync::Arc;

use vitrail::kurbo::{BezPath, Rect, Size, Stroke, Vec2};
use vitrail::peniko::Fill;
use vitrail::{
    AtlasTexture, BlendMode, Compositor, Draw, FaceRef, GlyphData, RenderBackend, ResolvedText,
    Shading, StencilMode, TypeFace, Vertex,
};

/// A draw call captured by [`RecordingBackend`].
#[derive(Clone, Debug)]
pub struct RecordedDraw {
    pub vertices: Vec<Vertex>,
    pub texture: Option<AtlasTexture>,
    pub blend: BlendMode,
    pub stencil: StencilMode,
}

/// A render pass captured by [`RecordingBackend`].
#[derive(Clone, Debug, Default)]
pub struct RecordedPass {
    pub stencil_enabled: bool,
    pub draws: Vec<RecordedDraw>,
}

/// Render backend that records every pass and draw for assertions, and can
/// simulate allocation failures at the renderer boundary.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub buffers: Vec<Vec<Vertex>>,
    pub passes: Vec<RecordedPass>,
    pub fail_buffers: bool,
    pub fail_passes: bool,
}

impl RenderBackend for RecordingBackend {
    type Buffer = usize;
    type RenderPass = RecordedPass;

    fn make_buffer(&mut self, vertices: &[Vertex]) -> Option<usize> {
        if self.fail_buffers {
            return None;
        }
        self.buffers.push(vertices.to_vec());
        Some(self.buffers.len() - 1)
    }

    fn begin_render_pass(&mut self, enable_stencil: bool) -> Option<RecordedPass> {
        if self.fail_passes {
            return None;
        }
        Some(RecordedPass {
            stencil_enabled: enable_stencil,
            draws: Vec::new(),
        })
    }

    fn encode_draw(&mut self, pass: &mut RecordedPass, draw: Draw<'_, usize>) {
        pass.draws.push(RecordedDraw {
            vertices: self.buffers[*draw.buffer][..draw.vertex_count].to_vec(),
            texture: draw.texture,
            blend: draw.blend,
            stencil: draw.stencil,
        });
    }

    fn end_render_pass(&mut self, pass: RecordedPass) {
        self.passes.push(pass);
    }
}

pub fn atlas(id: u64) -> AtlasTexture {
    AtlasTexture {
        id,
        width: 256,
        height: 256,
    }
}

/// Deterministic typeface: every glyph advances `advance` pixels with
/// fixed vertical metrics; kerning applies `kerning` to the pairs listed
/// in `kern_pairs`. `glyphs: None` resolves every codepoint.
pub struct FixtureFace {
    pub advance: f64,
    pub ascender: f64,
    pub descender: f64,
    pub kerning: f64,
    pub kern_pairs: Vec<(char, char)>,
    pub glyphs: Option<HashSet<char>>,
    pub texture: AtlasTexture,
}

impl Default for FixtureFace {
    fn default() -> Self {
        Self {
            advance: 10.0,
            ascender: 8.0,
            descender: -2.0,
            kerning: 0.0,
            kern_pairs: Vec::new(),
            glyphs: None,
            texture: atlas(1),
        }
    }
}

impl FixtureFace {
    pub fn face() -> FaceRef {
        Arc::new(Self::default())
    }

    pub fn with_glyphs(glyphs: impl IntoIterator<Item = char>) -> FaceRef {
        Arc::new(Self {
            glyphs: Some(glyphs.into_iter().collect()),
            texture: atlas(2),
            ..Self::default()
        })
    }

    pub fn with_kerning(kerning: f64, pairs: impl IntoIterator<Item = (char, char)>) -> FaceRef {
        Arc::new(Self {
            kerning,
            kern_pairs: pairs.into_iter().collect(),
            ..Self::default()
        })
    }
}

impl TypeFace for FixtureFace {
    fn has_glyph(&self, c: char) -> bool {
        match &self.glyphs {
            Some(set) => set.contains(&c),
            None => true,
        }
    }

    fn glyph_data(&self, c: char) -> Option<GlyphData> {
        if !self.has_glyph(c) {
            return None;
        }
        Some(GlyphData {
            texture: Some(self.texture),
            frame: Rect::new(0.0, 0.0, self.advance, self.ascender - self.descender),
            advance: Vec2::new(self.advance, 0.0),
            offset: Vec2::new(0.0, self.ascender),
            ascender: self.ascender,
            descender: self.descender,
        })
    }

    fn kern_advance(&self, left: char, right: char) -> Vec2 {
        if self.kern_pairs.contains(&(left, right)) {
            Vec2::new(self.kerning, 0.0)
        } else {
            Vec2::ZERO
        }
    }

    fn ascender(&self) -> f64 {
        self.ascender
    }

    fn descender(&self) -> f64 {
        self.descender
    }
}

/// A single-segment run over the default fixture face at scale 1.
pub fn simple_run(text: &str) -> ResolvedText {
    run_with(vec![FixtureFace::face()], text)
}

pub fn run_with(faces: Vec<FaceRef>, text: &str) -> ResolvedText {
    let mut run = ResolvedText::new(1.0);
    run.push_text(faces, text);
    run
}

/// Renders one filled path and returns the recorded backend.
pub fn record_fill(path: &BezPath, rule: Fill, shading: &Shading) -> anyhow::Result<RecordingBackend> {
    let mut backend = RecordingBackend::default();
    let mut compositor = Compositor::new(&mut backend, Size::new(200.0, 100.0), 1.0)?;
    compositor.fill(path, rule, shading)?;
    drop(compositor);
    Ok(backend)
}

/// Renders one stroked path and returns the recorded backend.
pub fn record_stroke(
    path: &BezPath,
    style: &Stroke,
    shading: &Shading,
) -> anyhow::Result<RecordingBackend> {
    let mut backend = RecordingBackend::default();
    let mut compositor = Compositor::new(&mut backend, Size::new(200.0, 100.0), 1.0)?;
    compositor.stroke(path, style, shading)?;
    drop(compositor);
    Ok(backend)
}

/// Lays `text` out inside `bounds` (canvas units) and returns the
/// recorded backend.
pub fn record_text(
    text: &ResolvedText,
    bounds: Rect,
    shading: &Shading,
) -> anyhow::Result<RecordingBackend> {
    let mut backend = RecordingBackend::default();
    let mut compositor = Compositor::new(&mut backend, Size::new(200.0, 100.0), 1.0)?;
    compositor.draw_text(text, bounds, shading)?;
    drop(compositor);
    Ok(backend)
}
