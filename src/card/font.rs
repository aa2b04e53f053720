use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{FillRule, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder, name_id};
use usvg::fontdb;

use super::{Rgba, TextBox, builtin};

#[derive(Clone)]
pub struct OutlineFont {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    space_advance: u16,
    family: Option<String>,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("family", &self.family)
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl OutlineFont {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }

    fn scale(&self, size: u32) -> f32 {
        size as f32 / self.units_per_em.max(1) as f32
    }

    fn advance(&self, face: &Face<'_>, glyph: GlyphId) -> u16 {
        face.glyph_hor_advance(glyph).unwrap_or(self.space_advance)
    }

    fn measure(&self, text: &str, size: u32) -> TextBox {
        let Some(face) = self.face() else {
            return TextBox::default();
        };
        let scale = self.scale(size);
        let ascent = self.ascender as f32 * scale;
        let mut pen = 0.0f32;
        let mut ink: Option<(f32, f32, f32, f32)> = None;
        for ch in text.chars().filter(|ch| *ch != '\n') {
            let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
            if let Some(rect) = face.glyph_bounding_box(glyph) {
                let left = pen + rect.x_min as f32 * scale;
                let right = pen + rect.x_max as f32 * scale;
                let top = ascent - rect.y_max as f32 * scale;
                let bottom = ascent - rect.y_min as f32 * scale;
                ink = Some(match ink {
                    Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
                    None => (left, top, right, bottom),
                });
            }
            pen += self.advance(&face, glyph) as f32 * scale;
        }
        match ink {
            Some((left, top, right, bottom)) => TextBox {
                left: left.floor() as i32,
                top: top.floor() as i32,
                right: right.ceil() as i32,
                bottom: bottom.ceil() as i32,
            },
            None => TextBox {
                left: 0,
                top: 0,
                right: pen.ceil() as i32,
                bottom: 0,
            },
        }
    }

    fn draw(&self, pixmap: &mut Pixmap, text: &str, x: i32, y: i32, size: u32, color: Rgba) {
        let Some(face) = self.face() else {
            return;
        };
        let scale = self.scale(size);
        let mut outline = GlyphOutline {
            builder: PathBuilder::new(),
            origin_x: x as f32,
            baseline: y as f32 + self.ascender as f32 * scale,
            scale,
        };
        let mut pen = 0.0f32;
        for ch in text.chars().filter(|ch| *ch != '\n') {
            let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
            outline.origin_x = x as f32 + pen;
            face.outline_glyph(glyph, &mut outline);
            pen += self.advance(&face, glyph) as f32 * scale;
        }
        if let Some(path) = outline.builder.finish() {
            pixmap.fill_path(
                &path,
                &color.to_paint(),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }
}

struct GlyphOutline {
    builder: PathBuilder,
    origin_x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphOutline {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// A face ready for captioning. Immutable once resolved; clones share the
/// font data.
#[derive(Debug, Clone)]
pub enum CaptionFont {
    Outline(OutlineFont),
    Builtin,
}

impl CaptionFont {
    pub fn builtin() -> Self {
        Self::Builtin
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Outline(font) => font.family().unwrap_or("unnamed outline font"),
            Self::Builtin => "built-in block face",
        }
    }

    pub fn measure(&self, text: &str, size: u32) -> TextBox {
        match self {
            Self::Outline(font) => font.measure(text, size),
            Self::Builtin => builtin::measure(text, size),
        }
    }

    pub fn draw(&self, pixmap: &mut Pixmap, text: &str, x: i32, y: i32, size: u32, color: Rgba) {
        match self {
            Self::Outline(font) => font.draw(pixmap, text, x, y, size, color),
            Self::Builtin => builtin::draw(pixmap, text, x, y, size, color),
        }
    }
}

/// A preferred font resource that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFallback {
    pub requested: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedCaptionFont {
    pub font: CaptionFont,
    pub fallbacks: Vec<FontFallback>,
}

pub fn load_outline_font(path: &Path) -> Result<OutlineFont> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_outline_font_from_data(data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Tries the font file, then each system family, then the built-in face.
pub fn resolve_caption_font(font_path: Option<&Path>, families: &[String]) -> ResolvedCaptionFont {
    let mut fallbacks = Vec::new();

    if let Some(path) = font_path {
        match load_outline_font(path) {
            Ok(font) => {
                return ResolvedCaptionFont {
                    font: CaptionFont::Outline(font),
                    fallbacks,
                };
            }
            Err(err) => fallbacks.push(FontFallback {
                requested: path.display().to_string(),
                reason: format!("{:#}", err),
            }),
        }
    }

    if !families.is_empty() {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for family in families {
            match load_outline_font_from_family(&db, family) {
                Ok(font) => {
                    return ResolvedCaptionFont {
                        font: CaptionFont::Outline(font),
                        fallbacks,
                    };
                }
                Err(err) => fallbacks.push(FontFallback {
                    requested: family.clone(),
                    reason: err.to_string(),
                }),
            }
        }
    }

    ResolvedCaptionFont {
        font: CaptionFont::Builtin,
        fallbacks,
    }
}

fn load_outline_font_from_data(data: Vec<u8>) -> Result<OutlineFont> {
    let data = Arc::new(data);
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    (0..count)
        .find_map(|index| outline_font_at(&data, index).ok())
        .ok_or_else(|| anyhow!("failed to parse font data"))
}

fn outline_font_at(data: &Arc<Vec<u8>>, index: u32) -> Result<OutlineFont> {
    let face = Face::parse(data, index).map_err(|err| anyhow!("{}", err))?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    Ok(OutlineFont {
        data: Arc::clone(data),
        face_index: index,
        units_per_em,
        ascender: face.ascender(),
        space_advance,
        family: extract_family_name(&face),
    })
}

fn load_outline_font_from_family(db: &fontdb::Database, family: &str) -> Result<OutlineFont> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    outline_font_at(&Arc::new(data), face_index)
        .with_context(|| format!("failed to parse font face: {}", family))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
