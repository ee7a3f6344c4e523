// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vitrail is a stencil-based vector graphics tessellation core.
//!
//! It converts resolution-independent path and text descriptions into
//! GPU-submittable triangle geometry and stencil operations. Shapes render
//! in two passes: pass 1 accumulates winding numbers (or a glyph coverage
//! mask) into a stencil attachment, pass 2 draws viewport-covering shading
//! geometry masked by a stencil test. Coverage comes from stencil winding
//! rather than a native rasterizer, so the output is plain triangle lists
//! any GPU abstraction can submit.
//!
//! The crate deliberately stops at the renderer boundary: devices, command
//! buffers and pipeline state objects belong to a collaborator
//! implementing [`RenderBackend`], and font files belong to a collaborator
//! implementing [`TypeFace`]. Everything in between — curve flattening,
//! dash walking, stroke and fill tessellation, gradient rasterization,
//! text shaping and line breaking — happens here, synchronously, on the
//! CPU, once per draw call.
//!
//! ```
//! use vitrail::kurbo::{Cap, Circle, Shape, Size, Stroke};
//! use vitrail::peniko::{Color, Extend, Fill};
//! use vitrail::{Compositor, Shading};
//! # use vitrail::{Draw, RenderBackend, Vertex};
//! # struct NullBackend;
//! # impl RenderBackend for NullBackend {
//! #     type Buffer = ();
//! #     type RenderPass = ();
//! #     fn make_buffer(&mut self, _: &[Vertex]) -> Option<()> { Some(()) }
//! #     fn begin_render_pass(&mut self, _: bool) -> Option<()> { Some(()) }
//! #     fn encode_draw(&mut self, _: &mut (), _: Draw<'_, ()>) {}
//! #     fn end_render_pass(&mut self, _: ()) {}
//! # }
//! # let mut backend = NullBackend;
//!
//! let mut compositor = Compositor::new(&mut backend, Size::new(800.0, 600.0), 2.0)?;
//! let circle = Circle::new((200.0, 150.0), 80.0).to_path(0.1);
//! compositor.fill(
//!     &circle,
//!     Fill::NonZero,
//!     &Shading::linear_gradient(
//!         (120.0, 150.0).into(),
//!         (280.0, 150.0).into(),
//!         Extend::Pad,
//!         &[(0.0, Color::rgb8(255, 0, 0)), (1.0, Color::rgb8(0, 0, 255))][..],
//!     ),
//! )?;
//! compositor.stroke(
//!     &circle,
//!     &Stroke::new(4.0).with_caps(Cap::Round),
//!     &Shading::color(Color::rgb8(20, 20, 20)),
//! )?;
//! # Ok::<(), vitrail::Error>(())
//! ```

#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]

mod batch;
mod compositor;
mod dash;
mod fill;
mod flatten;
mod gradient;
mod shading;
mod stroke;
mod text;

/// Styling and composition primitives.
pub use peniko;
/// 2D geometry, with a focus on curves.
pub use peniko::kurbo;

pub use batch::{AtlasTexture, BlendMode, Draw, StencilMode, Vertex};
pub use compositor::{Compositor, RenderBackend};
pub use dash::DashWalker;
pub use fill::{path_contains, tessellate_fill};
pub use flatten::{cubic_arc_length, flatten_cubic, flatten_quad, quad_arc_length};
pub use gradient::{rasterize_shading, ShadingGeometry};
pub use shading::Shading;
pub use stroke::tessellate_stroke;
pub use text::{
    for_each_glyph, FaceRef, Glyph, GlyphData, InlineImage, LineGlyphs, ResolvedText, RunSegment,
    TypeFace,
};

use thiserror::Error;

/// Errors that can occur in Vitrail.
///
/// Degenerate inputs are not errors: an empty path, a zero-area gradient
/// axis or an empty glyph run draws nothing and succeeds. Only failures at
/// the renderer boundary surface here, and they abort the current draw
/// call only.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The renderer collaborator failed to allocate a vertex buffer.
    #[error("vertex buffer allocation failed")]
    BufferAllocation,
    /// The renderer collaborator could not begin a render pass.
    #[error("couldn't begin render pass")]
    RenderPass,
    /// The viewport has no usable area.
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
