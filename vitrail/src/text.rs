// Copyright 2025 the Vitrail Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text shaping and line breaking.
//!
//! A [`ResolvedText`] is a sequence of styled runs (text with an ordered
//! fallback face list, or inline image attachments). Shaping walks
//! codepoints, picks the first face that has a glyph, applies kerning only
//! between glyphs of the same face, and aggregates per-line metrics.
//! Wrapping is greedy: lines overflowing the width break at the last
//! breakable codepoint, and the last line that fits vertically is
//! truncated with an ellipsis.
//!
//! Lines are produced fresh per draw call and never retained; glyph
//! caching, if any, belongs to the `TypeFace` collaborator.

use std::sync::Arc;

use peniko::kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::batch::{AtlasTexture, Vertex};

/// Metrics and atlas placement for a single glyph, as reported by a
/// [`TypeFace`]. All lengths are in device pixels, baseline-relative.
#[derive(Clone, Debug, Default)]
pub struct GlyphData {
    pub texture: Option<AtlasTexture>,
    /// Texel rectangle inside `texture`.
    pub frame: Rect,
    /// Advance to the next glyph.
    pub advance: Vec2,
    /// Offset of the texel frame's origin from the baseline.
    pub offset: Vec2,
    pub ascender: f64,
    pub descender: f64,
}

/// Read-only glyph source owned by the host toolkit.
///
/// Metric lookups must be safe for concurrent reads; the core never
/// mutates a face. Face identity (for kerning across glyph pairs) is the
/// `Arc` pointer identity of [`FaceRef`].
pub trait TypeFace: Send + Sync {
    fn has_glyph(&self, c: char) -> bool;
    fn glyph_data(&self, c: char) -> Option<GlyphData>;
    /// Kern advance for the pair `left`/`right` of this face.
    fn kern_advance(&self, left: char, right: char) -> Vec2;
    fn ascender(&self) -> f64;
    fn descender(&self) -> f64;
}

pub type FaceRef = Arc<dyn TypeFace>;

/// An inline image participating in line layout like a glyph.
#[derive(Clone, Debug)]
pub struct InlineImage {
    pub texture: Option<AtlasTexture>,
    /// Display size in canvas units.
    pub size: Size,
    /// Distance from the image's bottom edge up to the baseline, in canvas
    /// units.
    pub baseline: f64,
}

/// One shaped glyph, positioned relative to its line's baseline.
#[derive(Clone)]
pub struct Glyph {
    /// Source codepoint; `'\0'` marks an image attachment.
    pub scalar: char,
    pub face: FaceRef,
    pub texture: Option<AtlasTexture>,
    /// Texel rectangle in the atlas.
    pub frame: Rect,
    /// Advance to the next glyph (width) and visual height.
    pub advance: Vec2,
    /// Atlas frame origin relative to the baseline.
    pub offset: Vec2,
    pub ascender: f64,
    pub descender: f64,
    /// Kern advance from the previous glyph; zeroed at line starts.
    pub kerning: Vec2,
}

/// An ordered run of glyphs sharing a baseline.
#[derive(Clone)]
pub struct LineGlyphs {
    pub glyphs: Vec<Glyph>,
    /// Max ascender over the line's glyphs.
    pub ascender: f64,
    /// Min descender over the line's glyphs.
    pub descender: f64,
    /// Sum of advances and kerning, ignoring the first glyph's kerning.
    pub width: f64,
}

impl LineGlyphs {
    pub fn height(&self) -> f64 {
        self.ascender - self.descender
    }
}

/// One styled segment of a resolved text run.
#[derive(Clone)]
pub enum RunSegment {
    Text { faces: Vec<FaceRef>, text: String },
    Attachment { faces: Vec<FaceRef>, image: InlineImage },
}

/// A styled text run ready for layout.
#[derive(Clone)]
pub struct ResolvedText {
    pub segments: Vec<RunSegment>,
    /// Device pixels per canvas unit; glyph metrics are in pixels.
    pub scale_factor: f64,
    /// When false, codepoints no face can resolve become zero-width
    /// placeholders that still reserve the face's vertical metrics.
    pub draw_missing_glyphs: bool,
}

impl ResolvedText {
    pub fn new(scale_factor: f64) -> Self {
        Self {
            segments: Vec::new(),
            scale_factor,
            draw_missing_glyphs: false,
        }
    }

    pub fn push_text(&mut self, faces: Vec<FaceRef>, text: impl Into<String>) {
        self.segments.push(RunSegment::Text {
            faces,
            text: text.into(),
        });
    }

    pub fn push_attachment(&mut self, faces: Vec<FaceRef>, image: InlineImage) {
        self.segments.push(RunSegment::Attachment { faces, image });
    }

    /// Shapes and wraps the run into lines fitting `max_width` by
    /// `max_height` device pixels (`f64::INFINITY` for unbounded).
    pub fn layout(&self, max_width: f64, max_height: f64) -> Vec<LineGlyphs> {
        wrap_lines(self.raw_lines(), max_width, max_height)
    }

    /// Size of the wrapped text in canvas units; `None` bounds are
    /// unbounded.
    pub fn measure(&self, max_width: Option<f64>, max_height: Option<f64>) -> Size {
        let to_px = |limit: Option<f64>| {
            limit.map_or(f64::INFINITY, |v| v.max(0.0) * self.scale_factor)
        };
        let size = self.size_in_pixels(to_px(max_width), to_px(max_height));
        Size::new(size.width / self.scale_factor, size.height / self.scale_factor)
    }

    /// Baseline of the first laid-out line, from the top, in canvas units.
    pub fn first_baseline(&self, size: Size) -> f64 {
        let lines = self.layout(
            size.width.max(0.0) * self.scale_factor,
            size.height.max(0.0) * self.scale_factor,
        );
        lines.first().map_or(0.0, |line| line.ascender) / self.scale_factor
    }

    /// Baseline of the last laid-out line, from the top, in canvas units.
    pub fn last_baseline(&self, size: Size) -> f64 {
        let lines = self.layout(
            size.width.max(0.0) * self.scale_factor,
            size.height.max(0.0) * self.scale_factor,
        );
        let total: f64 = lines.iter().map(LineGlyphs::height).sum();
        let last_descender = lines.last().map_or(0.0, |line| line.descender);
        (total + last_descender) / self.scale_factor
    }

    fn size_in_pixels(&self, max_width: f64, max_height: f64) -> Size {
        self.layout(max_width, max_height)
            .iter()
            .fold(Size::ZERO, |acc, line| {
                Size::new(acc.width.max(line.width), acc.height + line.height())
            })
    }

    /// Shapes every segment into hard-newline-delimited lines, without
    /// wrapping. The trailing line stays open so consecutive text segments
    /// combine onto one line.
    fn raw_lines(&self) -> Vec<LineGlyphs> {
        let mut lines: Vec<LineGlyphs> = Vec::new();
        let mut glyphs: Vec<Glyph> = Vec::new();
        let mut ascender = 0.0f64;
        let mut descender = 0.0f64;
        let mut width = 0.0f64;
        let mut prev_char = '\0';
        let mut prev_face: Option<FaceRef> = None;

        for segment in &self.segments {
            match segment {
                RunSegment::Text { faces, text } => {
                    if faces.is_empty() || text.is_empty() {
                        continue;
                    }
                    let components = split_hard_lines(text);
                    let count = components.len();
                    for (i, component) in components.into_iter().enumerate() {
                        let shaped = shape_run(
                            component,
                            faces,
                            self.draw_missing_glyphs,
                            prev_face.as_ref(),
                            prev_char,
                        );
                        prev_face = shaped.last_face;
                        prev_char = shaped.last_char;
                        glyphs.extend(shaped.glyphs);
                        ascender = ascender.max(shaped.ascender);
                        descender = descender.min(shaped.descender);
                        width += shaped.width;
                        if i + 1 < count {
                            debug_assert!(ascender - descender > 0.0);
                            lines.push(LineGlyphs {
                                glyphs: std::mem::take(&mut glyphs),
                                ascender,
                                descender,
                                width,
                            });
                            ascender = 0.0;
                            descender = 0.0;
                            width = 0.0;
                        }
                    }
                }
                RunSegment::Attachment { faces, image } => {
                    let Some(face) = faces
                        .iter()
                        .find(|face| face.has_glyph('.'))
                        .or_else(|| faces.first())
                    else {
                        continue;
                    };
                    let scale = self.scale_factor;
                    let baseline = image.baseline * scale;
                    let w = image.size.width * scale;
                    let h = image.size.height * scale;
                    let frame = image.texture.map_or(Rect::ZERO, |texture| {
                        Rect::new(0.0, 0.0, texture.width as f64, texture.height as f64)
                    });
                    let glyph = Glyph {
                        scalar: '\0',
                        face: face.clone(),
                        texture: image.texture,
                        frame,
                        advance: Vec2::new(w, h),
                        offset: Vec2::new(0.0, baseline),
                        ascender: baseline,
                        descender: (baseline - h).min(0.0),
                        kerning: Vec2::ZERO,
                    };
                    ascender = ascender.max(glyph.ascender);
                    descender = descender.min(glyph.descender);
                    width += glyph.advance.x;
                    glyphs.push(glyph);
                    // Kerning is not defined across an attachment.
                    prev_face = None;
                    prev_char = '\0';
                }
            }
        }
        if !glyphs.is_empty() {
            debug_assert!(ascender - descender > 0.0);
            debug_assert!(width > 0.0 || glyphs.iter().all(|g| g.advance.x == 0.0));
            lines.push(LineGlyphs {
                glyphs,
                ascender,
                descender,
                width,
            });
        }
        lines
    }
}

struct ShapedRun {
    glyphs: Vec<Glyph>,
    width: f64,
    ascender: f64,
    descender: f64,
    last_face: Option<FaceRef>,
    last_char: char,
}

/// Shapes one newline-free run of codepoints against an ordered fallback
/// face list. `prev_face`/`prev_char` seed kerning for the first glyph.
fn shape_run(
    text: &str,
    faces: &[FaceRef],
    draw_missing_glyphs: bool,
    prev_face: Option<&FaceRef>,
    prev_char: char,
) -> ShapedRun {
    debug_assert!(!faces.is_empty());
    let mut glyphs: Vec<Glyph> = Vec::new();
    let mut ascender = 0.0f64;
    let mut descender = 0.0f64;
    let mut width = 0.0f64;
    let mut face1 = prev_face.cloned();
    let mut char1 = prev_char;
    for char2 in text.chars() {
        let face2 = faces
            .iter()
            .find(|face| face.has_glyph(char2))
            .unwrap_or(&faces[0])
            .clone();
        let make_glyph = draw_missing_glyphs || face2.has_glyph(char2);

        let mut glyph = Glyph {
            scalar: char2,
            face: face2.clone(),
            texture: None,
            frame: Rect::ZERO,
            advance: Vec2::ZERO,
            offset: Vec2::ZERO,
            ascender: 0.0,
            descender: 0.0,
            kerning: Vec2::ZERO,
        };
        match face2.glyph_data(char2) {
            Some(data) if make_glyph => {
                glyph.texture = data.texture;
                glyph.frame = data.frame;
                glyph.offset = data.offset;
                glyph.advance = data.advance;
                glyph.ascender = data.ascender;
                glyph.descender = data.descender;
                // Kerning only applies between glyphs of the same face.
                glyph.kerning = match &face1 {
                    Some(f1) if Arc::ptr_eq(f1, &face2) => f1.kern_advance(char1, char2),
                    _ => Vec2::ZERO,
                };
            }
            _ => {
                // Placeholder: no visual, but the vertical metrics still
                // participate in line height.
                glyph.ascender = face2.ascender();
                glyph.descender = face2.descender();
            }
        }
        ascender = ascender.max(glyph.ascender);
        descender = descender.min(glyph.descender);
        width += glyph.advance.x + glyph.kerning.x;
        glyphs.push(glyph);
        char1 = char2;
        face1 = Some(face2);
    }
    if glyphs.is_empty() {
        ascender = faces[0].ascender();
        descender = faces[0].descender();
    }
    debug_assert!(ascender - descender > 0.0);
    ShapedRun {
        glyphs,
        width,
        ascender,
        descender,
        last_face: face1,
        last_char: char1,
    }
}

/// Splits at hard line breaks (LF, CR, CRLF, NEL, LS, PS).
fn split_hard_lines(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '\n' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}') {
            out.push(&text[start..i]);
            let mut next = i + c.len_utf8();
            if c == '\r' {
                if let Some(&(j, '\n')) = chars.peek() {
                    chars.next();
                    next = j + 1;
                }
            }
            start = next;
        }
    }
    out.push(&text[start..]);
    out
}

fn is_breakable(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '/' | '?' | '!' | '}' | '|')
}

/// Sum of advances and kerning, ignoring the first glyph's kerning (its
/// predecessor is on another line or removed).
fn width_of(glyphs: &[Glyph]) -> f64 {
    let total: f64 = glyphs.iter().map(|g| g.advance.x + g.kerning.x).sum();
    total - glyphs.first().map_or(0.0, |g| g.kerning.x)
}

/// Index of the last codepoint a wrap may break after, honoring the
/// no-break exceptions: a hyphen directly before a digit keeps negative
/// numbers intact, and a slash between digits keeps fractions intact.
fn breakable_index(glyphs: &[Glyph]) -> Option<usize> {
    let mut index = glyphs.len();
    while index > 0 {
        let i = index - 1;
        let c = glyphs[i].scalar;
        if is_breakable(c) {
            let before_digit = index < glyphs.len() && glyphs[index].scalar.is_ascii_digit();
            let after_digit = i > 0 && glyphs[i - 1].scalar.is_ascii_digit();
            if c == '-' && before_digit {
                index = i;
                continue;
            }
            if c == '/' && before_digit && after_digit {
                index = i;
                continue;
            }
            return Some(i);
        }
        index = i;
    }
    None
}

/// Splits an overlong line, keeping the breakable codepoint at the end of
/// the first part. With no breakable codepoint the longest fitting prefix
/// is force-broken.
fn split_line(glyphs: Vec<Glyph>, max_width: f64) -> (Vec<Glyph>, Vec<Glyph>) {
    let mut first = glyphs;
    let mut second: Vec<Glyph> = Vec::new();
    while first.len() > 1 && width_of(&first).ceil() > max_width {
        match breakable_index(&first) {
            Some(i) if i + 1 != first.len() => {
                let tail = first.split_off(i + 1);
                second.splice(0..0, tail);
            }
            _ => {
                if let Some(glyph) = first.pop() {
                    second.insert(0, glyph);
                }
            }
        }
    }
    (first, second)
}

fn recompute_metrics(line: &mut LineGlyphs) {
    line.ascender = line.glyphs.iter().fold(0.0, |acc, g| acc.max(g.ascender));
    line.descender = line.glyphs.iter().fold(0.0, |acc, g| acc.min(g.descender));
    line.width = width_of(&line.glyphs);
}

/// Truncates `line` so that three trailing '.' glyphs fit inside
/// `max_width`, dropping glyphs from the end as needed. The ellipsis is
/// shaped with the face of the last surviving (or last removed) glyph. If
/// nothing fits alongside the ellipsis the line is left as it is.
fn truncate_with_ellipsis(line: &mut LineGlyphs, max_width: f64) {
    let mut glyphs = line.glyphs.clone();
    let Some(mut face) = glyphs.last().map(|g| g.face.clone()) else {
        return;
    };
    loop {
        let prev_face = glyphs.last().map(|g| g.face.clone());
        let prev_char = glyphs.last().map_or('\0', |g| g.scalar);
        let ellipsis = shape_run(
            "...",
            std::slice::from_ref(&face),
            false,
            prev_face.as_ref(),
            prev_char,
        );
        if (width_of(&glyphs) + ellipsis.width).ceil() <= max_width {
            glyphs.extend(ellipsis.glyphs);
            if let Some(first) = glyphs.first_mut() {
                first.kerning = Vec2::ZERO;
            }
            line.glyphs = glyphs;
            recompute_metrics(line);
            return;
        }
        match glyphs.last() {
            Some(last) => face = last.face.clone(),
            None => return,
        }
        glyphs.pop();
    }
}

/// Greedy line wrap with ellipsis truncation once vertical space runs out.
fn wrap_lines(mut lines: Vec<LineGlyphs>, max_width: f64, max_height: f64) -> Vec<LineGlyphs> {
    let mut result: Vec<LineGlyphs> = Vec::new();
    let mut offset_y = 0.0f64;
    while !lines.is_empty() {
        let mut line = lines.remove(0);
        if !result.is_empty() && (offset_y + line.height()).ceil() > max_height {
            break;
        }

        if line.width.ceil() > max_width {
            // Wrap only when the following line still has vertical room;
            // otherwise this line is truncated below instead.
            let next_height = lines.first().map_or(line.height(), LineGlyphs::height);
            if (offset_y + line.height() + next_height).ceil() <= max_height {
                let (first, second) = split_line(std::mem::take(&mut line.glyphs), max_width);
                if !second.is_empty() {
                    let mut remainder = LineGlyphs {
                        glyphs: second,
                        ascender: 0.0,
                        descender: 0.0,
                        width: 0.0,
                    };
                    remainder.glyphs[0].kerning = Vec2::ZERO;
                    recompute_metrics(&mut remainder);
                    lines.insert(0, remainder);
                }
                line.glyphs = first;
                if let Some(first_glyph) = line.glyphs.first_mut() {
                    first_glyph.kerning = Vec2::ZERO;
                }
                recompute_metrics(&mut line);
            }
        }

        // Last visible line: either no room for the next line, or a wrap
        // was impossible and the overflow must be cut.
        let next_height = lines.first().map_or(0.0, LineGlyphs::height);
        if (offset_y + line.height() + next_height).ceil() > max_height
            || line.width.ceil() > max_width
        {
            truncate_with_ellipsis(&mut line, max_width);
        }

        if let Some(first_glyph) = line.glyphs.first_mut() {
            if first_glyph.kerning != Vec2::ZERO {
                first_glyph.kerning = Vec2::ZERO;
                line.width = width_of(&line.glyphs);
            }
        }
        offset_y += line.height();
        result.push(line);
    }
    result
}

/// Calls `callback` for every glyph with its baseline origin in pixel
/// space, advancing through lines top to bottom.
pub fn for_each_glyph(lines: &[LineGlyphs], mut callback: impl FnMut(&Glyph, Point)) {
    let mut offset = Vec2::ZERO;
    for line in lines {
        offset.x = 0.0;
        for glyph in &line.glyphs {
            let baseline = Point::new(glyph.offset.x + offset.x, line.ascender + offset.y);
            callback(glyph, baseline);
            // No kerning for line leads.
            let kerning = if offset.x > 0.0 { glyph.kerning } else { Vec2::ZERO };
            offset.x += glyph.advance.x;
            offset += kerning;
        }
        offset.y += line.height();
    }
}

/// Glyph atlas quads batched by texture, transformed into clip space.
pub(crate) fn glyph_quads(
    lines: &[LineGlyphs],
    transform: Affine,
    color: [f32; 4],
) -> Vec<(AtlasTexture, Vec<Vertex>)> {
    let mut quads: Vec<(AtlasTexture, [Vertex; 4])> = Vec::new();
    for_each_glyph(lines, |glyph, baseline| {
        if glyph.scalar == '\0' {
            return;
        }
        let Some(texture) = glyph.texture else {
            return;
        };
        if texture.width == 0 || texture.height == 0 {
            return;
        }
        let inv_w = 1.0 / texture.width as f32;
        let inv_h = 1.0 / texture.height as f32;
        let u0 = glyph.frame.x0 as f32 * inv_w;
        let v0 = glyph.frame.y0 as f32 * inv_h;
        let u1 = glyph.frame.x1 as f32 * inv_w;
        let v1 = glyph.frame.y1 as f32 * inv_h;
        let x0 = baseline.x;
        let y0 = baseline.y - glyph.offset.y;
        let x1 = x0 + glyph.frame.width();
        let y1 = y0 + glyph.frame.height();
        let vertex = |x: f64, y: f64, u: f32, v: f32| {
            Vertex::textured(transform, Point::new(x, y), [u, v], color)
        };
        quads.push((
            texture,
            [
                vertex(x0, y0, u0, v0),
                vertex(x1, y0, u1, v0),
                vertex(x0, y1, u0, v1),
                vertex(x1, y1, u1, v1),
            ],
        ));
    });
    batch_quads(quads)
}

/// Inline attachment quads, drawn after shading at their layout size.
pub(crate) fn attachment_quads(
    lines: &[LineGlyphs],
    transform: Affine,
) -> Vec<(AtlasTexture, Vec<Vertex>)> {
    let mut quads: Vec<(AtlasTexture, [Vertex; 4])> = Vec::new();
    for_each_glyph(lines, |glyph, baseline| {
        if glyph.scalar != '\0' {
            return;
        }
        let Some(texture) = glyph.texture else {
            return;
        };
        let x0 = baseline.x;
        let y0 = baseline.y - glyph.offset.y;
        let x1 = x0 + glyph.advance.x;
        let y1 = y0 + glyph.advance.y;
        let white = [1.0; 4];
        let vertex = |x: f64, y: f64, u: f32, v: f32| {
            Vertex::textured(transform, Point::new(x, y), [u, v], white)
        };
        quads.push((
            texture,
            [
                vertex(x0, y0, 0.0, 0.0),
                vertex(x1, y0, 1.0, 0.0),
                vertex(x0, y1, 0.0, 1.0),
                vertex(x1, y1, 1.0, 1.0),
            ],
        ));
    });
    batch_quads(quads)
}

/// Sorts quads by texture so equal textures land in one batch.
fn batch_quads(mut quads: Vec<(AtlasTexture, [Vertex; 4])>) -> Vec<(AtlasTexture, Vec<Vertex>)> {
    quads.sort_by_key(|(texture, _)| texture.id);
    let mut batches: Vec<(AtlasTexture, Vec<Vertex>)> = Vec::new();
    for (texture, [lt, rt, lb, rb]) in quads {
        match batches.last_mut() {
            Some((current, vertices)) if *current == texture => {
                vertices.extend_from_slice(&[lb, lt, rb, rb, lt, rt]);
            }
            _ => batches.push((texture, vec![lb, lt, rb, rb, lt, rt])),
        }
    }
    batches
}
