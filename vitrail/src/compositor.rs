// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-pass stencil compositing over an abstract render backend.
//!
//! Every fill and stroke runs the same protocol: pass 1 renders
//! tessellated geometry into the stencil attachment (winding for fills, a
//! coverage bit for strokes) with color writes off, pass 2 draws
//! viewport-covering shading geometry masked by the stencil test. Text
//! uses a stencil-free variant: glyph atlas quads build a coverage mask in
//! the render target, shading multiplies over it, attachments draw last.
//!
//! The protocol is an explicit state machine; encoding shading before the
//! mask, or anything after the pass ended, is a programming error and
//! panics rather than corrupting the frame.

use peniko::kurbo::{Affine, BezPath, Point, Rect, Size, Stroke, Vec2};
use peniko::Fill;

use crate::batch::{AtlasTexture, BlendMode, Draw, StencilMode, Vertex};
use crate::gradient;
use crate::shading::Shading;
use crate::text::{self, ResolvedText};
use crate::{fill, stroke, Error, Result};

/// Renderer collaborator interface.
///
/// Implementations own devices, pipelines and attachments; the core hands
/// them transient vertex data and fixed-function state per batch. `None`
/// from either allocation method aborts the current draw call only; the
/// frame and previously composited layers stay valid.
pub trait RenderBackend {
    type Buffer;
    type RenderPass;

    /// Uploads `vertices` into a transient vertex buffer.
    fn make_buffer(&mut self, vertices: &[Vertex]) -> Option<Self::Buffer>;
    /// Begins a render pass, with a stencil attachment when requested.
    fn begin_render_pass(&mut self, enable_stencil: bool) -> Option<Self::RenderPass>;
    /// Encodes one draw into the open pass.
    fn encode_draw(&mut self, pass: &mut Self::RenderPass, draw: Draw<'_, Self::Buffer>);
    /// Ends the pass and composites its output onto the target.
    fn end_render_pass(&mut self, pass: Self::RenderPass);
}

/// Progress of the two-pass protocol within one draw call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    AccumulatingStencil,
    Shading,
    Done,
}

/// One open render pass advancing through the two-pass protocol.
struct DrawPass<'a, B: RenderBackend> {
    backend: &'a mut B,
    pass: Option<B::RenderPass>,
    phase: Phase,
}

impl<'a, B: RenderBackend> DrawPass<'a, B> {
    fn begin(backend: &'a mut B, enable_stencil: bool) -> Result<Self> {
        let Some(pass) = backend.begin_render_pass(enable_stencil) else {
            log::error!("compositor: couldn't begin render pass");
            return Err(Error::RenderPass);
        };
        Ok(Self {
            backend,
            pass: Some(pass),
            phase: Phase::AccumulatingStencil,
        })
    }

    /// Pass 1: writes winding or coverage into the mask.
    fn accumulate(
        &mut self,
        vertices: &[Vertex],
        texture: Option<AtlasTexture>,
        stencil: StencilMode,
        blend: BlendMode,
    ) -> Result<()> {
        assert_eq!(
            self.phase,
            Phase::AccumulatingStencil,
            "mask accumulation after shading began"
        );
        self.encode(vertices, texture, stencil, blend)
    }

    /// Pass 2: draws geometry masked by (or layered over) the mask.
    fn shade(
        &mut self,
        vertices: &[Vertex],
        texture: Option<AtlasTexture>,
        stencil: StencilMode,
        blend: BlendMode,
    ) -> Result<()> {
        assert_ne!(self.phase, Phase::Done, "shading after pass end");
        self.phase = Phase::Shading;
        self.encode(vertices, texture, stencil, blend)
    }

    fn encode(
        &mut self,
        vertices: &[Vertex],
        texture: Option<AtlasTexture>,
        stencil: StencilMode,
        blend: BlendMode,
    ) -> Result<()> {
        if vertices.is_empty() {
            return Ok(());
        }
        let Some(buffer) = self.backend.make_buffer(vertices) else {
            log::error!("compositor: vertex buffer allocation failed");
            return Err(Error::BufferAllocation);
        };
        let pass = self.pass.as_mut().expect("draw into ended pass");
        self.backend.encode_draw(
            pass,
            Draw {
                buffer: &buffer,
                vertex_count: vertices.len(),
                texture,
                blend,
                stencil,
            },
        );
        Ok(())
    }

    fn finish(mut self) {
        if let Some(pass) = self.pass.take() {
            self.backend.end_render_pass(pass);
        }
        self.phase = Phase::Done;
    }
}

/// Per-frame drawing orchestration.
///
/// Holds the caller's object-to-canvas transform and the derived
/// canvas-to-clip view transform, and runs the two-pass protocol for each
/// draw call. All tessellation is synchronous CPU work on the calling
/// thread; the only state crossing draw calls is `transform`.
#[derive(Debug)]
pub struct Compositor<'a, B: RenderBackend> {
    backend: &'a mut B,
    /// Object space to canvas space; callers may adjust between draw calls.
    pub transform: Affine,
    view_transform: Affine,
    scale_factor: f64,
}

impl<'a, B: RenderBackend> Compositor<'a, B> {
    /// Creates a compositor for a viewport of `size` device pixels at
    /// `scale_factor` pixels per canvas unit.
    pub fn new(backend: &'a mut B, size: Size, scale_factor: f64) -> Result<Self> {
        Self::with_content_offset(backend, size, Point::ZERO, scale_factor)
    }

    /// As [`Compositor::new`], with the canvas origin shifted by
    /// `content_offset` canvas units (scrolled content).
    pub fn with_content_offset(
        backend: &'a mut B,
        size: Size,
        content_offset: Point,
        scale_factor: f64,
    ) -> Result<Self> {
        if !(size.width >= 1.0 && size.height >= 1.0 && scale_factor > 0.0) {
            log::error!(
                "compositor: invalid viewport {}x{} at scale {scale_factor}",
                size.width,
                size.height
            );
            return Err(Error::InvalidViewport {
                width: size.width,
                height: size.height,
            });
        }
        let canvas = Size::new(size.width / scale_factor, size.height / scale_factor);
        // Canvas units to [0, 1], then to clip space with y flipped.
        let view_transform = Affine::translate((-1.0, 1.0))
            * Affine::scale_non_uniform(2.0, -2.0)
            * Affine::scale_non_uniform(canvas.width.recip(), canvas.height.recip())
            * Affine::translate(content_offset.to_vec2());
        Ok(Self {
            backend,
            transform: Affine::IDENTITY,
            view_transform,
            scale_factor,
        })
    }

    /// Canvas-to-clip transform for this viewport.
    pub fn view_transform(&self) -> Affine {
        self.view_transform
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Fills `path` with `shading` under `rule`.
    ///
    /// Degenerate paths draw nothing and succeed; backend allocation
    /// failures abort this call only.
    pub fn fill(&mut self, path: &BezPath, rule: Fill, shading: &Shading) -> Result<()> {
        let vertices =
            fill::tessellate_fill(path, self.transform, self.view_transform, self.scale_factor);
        if vertices.len() < 3 {
            return Ok(());
        }
        let geometry = gradient::rasterize_shading(shading, self.view_transform);
        let stencil = match rule {
            Fill::NonZero => StencilMode::TestNonZero,
            Fill::EvenOdd => StencilMode::TestEven,
        };
        let mut pass = DrawPass::begin(&mut *self.backend, true)?;
        let result = pass
            .accumulate(&vertices, None, StencilMode::MakeFill, BlendMode::Opaque)
            .and_then(|()| {
                pass.shade(&geometry.vertices, geometry.texture, stencil, BlendMode::Opaque)
            });
        pass.finish();
        result
    }

    /// Strokes `path` with `style` and `shading`.
    pub fn stroke(&mut self, path: &BezPath, style: &Stroke, shading: &Shading) -> Result<()> {
        let vertices = stroke::tessellate_stroke(
            path,
            style,
            self.transform,
            self.view_transform,
            self.scale_factor,
        );
        if vertices.len() < 3 {
            return Ok(());
        }
        let geometry = gradient::rasterize_shading(shading, self.view_transform);
        let mut pass = DrawPass::begin(&mut *self.backend, true)?;
        let result = pass
            .accumulate(&vertices, None, StencilMode::MakeStroke, BlendMode::Opaque)
            .and_then(|()| {
                pass.shade(
                    &geometry.vertices,
                    geometry.texture,
                    StencilMode::TestNonZero,
                    BlendMode::Opaque,
                )
            });
        pass.finish();
        result
    }

    /// Lays `text` out inside `rect` (canvas units) and draws it with
    /// `shading`: glyph coverage first, shading multiplied over it, inline
    /// attachments on top.
    pub fn draw_text(&mut self, text: &ResolvedText, rect: Rect, shading: &Shading) -> Result<()> {
        let rect = rect.abs();
        if rect.width() < f64::EPSILON || rect.height() < f64::EPSILON {
            return Ok(());
        }
        let max_width = rect.width() * self.scale_factor;
        let max_height = rect.height() * self.scale_factor;
        let lines = text.layout(max_width, max_height);
        if lines.is_empty() {
            return Ok(());
        }

        // Glyphs are laid out in device pixels; align the box origin to
        // the pixel grid before scaling back to canvas units.
        let text_scale = text.scale_factor;
        let inv = text_scale.recip();
        let aligned = Vec2::new(
            (rect.x0 * text_scale).ceil() * inv,
            (rect.y0 * text_scale).ceil() * inv,
        );
        let glyph_transform =
            self.view_transform * self.transform * Affine::translate(aligned) * Affine::scale(inv);

        let geometry = gradient::rasterize_shading(shading, self.view_transform);

        let mut pass = DrawPass::begin(&mut *self.backend, false)?;
        let result = (|| {
            for (texture, vertices) in text::glyph_quads(&lines, glyph_transform, [1.0; 4]) {
                pass.accumulate(
                    &vertices,
                    Some(texture),
                    StencilMode::Ignore,
                    BlendMode::AlphaBlend,
                )?;
            }
            pass.shade(
                &geometry.vertices,
                geometry.texture,
                StencilMode::Ignore,
                BlendMode::Multiply,
            )?;
            for (texture, vertices) in text::attachment_quads(&lines, glyph_transform) {
                pass.shade(
                    &vertices,
                    Some(texture),
                    StencilMode::Ignore,
                    BlendMode::Opaque,
                )?;
            }
            Ok(())
        })();
        pass.finish();
        result
    }

    /// Draws `text` at `point`, anchored by `anchor` in unit coordinates
    /// (`(0.5, 0.5)` centers it), sized by an unbounded measurement.
    pub fn draw_text_at(
        &mut self,
        text: &ResolvedText,
        point: Point,
        anchor: Vec2,
        shading: &Shading,
    ) -> Result<()> {
        let size = text.measure(None, None);
        if size.width <= 0.0 || size.height <= 0.0 {
            return Ok(());
        }
        let origin = Point::new(
            point.x - size.width * anchor.x,
            point.y - size.height * anchor.y,
        );
        let rect = Rect::new(origin.x, origin.y, origin.x + size.width, origin.y + size.height);
        self.draw_text(text, rect, shading)
    }
}
