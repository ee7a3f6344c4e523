// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex and draw-call types shared with the renderer collaborator.

use bytemuck::{Pod, Zeroable};
use peniko::kurbo::{Affine, Point};

/// A single GPU-submittable vertex.
///
/// Positions are in clip space (`[-1, 1]²`), already transformed; the
/// renderer applies no further geometry transforms.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 2],
    /// Normalized texture coordinates; zero for untextured geometry.
    pub texcoord: [f32; 2],
    /// Straight-alpha RGBA.
    pub color: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<Vertex>(), 32);
static_assertions::assert_impl_all!(Vertex: Send, Sync);

impl Vertex {
    /// Position-only vertex for stencil-pass geometry.
    pub(crate) fn stencil(transform: Affine, p: Point) -> Self {
        let p = transform * p;
        Self {
            position: [p.x as f32, p.y as f32],
            ..Self::zeroed()
        }
    }

    pub(crate) fn colored(transform: Affine, p: Point, color: [f32; 4]) -> Self {
        let p = transform * p;
        Self {
            position: [p.x as f32, p.y as f32],
            texcoord: [0.0; 2],
            color,
        }
    }

    pub(crate) fn textured(transform: Affine, p: Point, texcoord: [f32; 2], color: [f32; 4]) -> Self {
        let p = transform * p;
        Self {
            position: [p.x as f32, p.y as f32],
            texcoord,
            color,
        }
    }
}

/// Opaque handle to a texture owned by the renderer collaborator.
///
/// The core never reads texel data; dimensions are carried only so atlas
/// rectangles can be normalized into texture coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AtlasTexture {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

/// Stencil interaction required by a draw batch.
///
/// The two make modes run with color writes disabled, a clockwise
/// front-face convention and a zero reference value. `MakeFill` requires
/// face culling disabled so both windings reach the stencil attachment;
/// `MakeStroke` culls back faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StencilMode {
    /// Accumulate signed winding: increment on front faces, decrement on
    /// back faces, both wrapping.
    MakeFill,
    /// Write the reference value wherever geometry covers.
    MakeStroke,
    /// Pass where the accumulated winding is non-zero.
    TestNonZero,
    /// Parity test used by the even-odd fill rule.
    TestEven,
    /// Pass where the accumulated winding is zero (inverse of
    /// [`StencilMode::TestNonZero`]).
    TestZero,
    /// Odd-parity test (inverse of [`StencilMode::TestEven`]).
    TestOdd,
    /// No stencil interaction.
    Ignore,
}

/// Fixed-function blend state of a draw batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    Multiply,
    AlphaBlend,
}

/// One draw call handed to the renderer backend.
pub struct Draw<'a, B> {
    /// Vertex buffer previously returned by
    /// [`RenderBackend::make_buffer`](crate::RenderBackend::make_buffer).
    pub buffer: &'a B,
    /// Number of vertices to draw from the start of the buffer.
    pub vertex_count: usize,
    pub texture: Option<AtlasTexture>,
    pub blend: BlendMode,
    pub stencil: StencilMode,
}
