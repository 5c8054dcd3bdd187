//! Font loading
//!
//! The preprocessor only sees fonts through [`FontSource`]: a codepoint
//! lookup and an unscaled outline load. [`TtfFont`] implements it on
//! ttf-parser, with fontdb for resolving system families.

use std::path::Path;

use ttf_parser::{Face, GlyphId};

use crate::geometry::Vec2;
use crate::outline::Outline;
use crate::{Result, TextError};

/// Handle of a font opened in a [`GlyphPreprocessor`](crate::GlyphPreprocessor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

/// Unscaled glyph metrics, in font units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphMetrics {
    pub width: f32,
    pub height: f32,
    /// Left side bearing
    pub hori_bearing_x: f32,
    /// Distance from the baseline to the top of the glyph
    pub hori_bearing_y: f32,
    pub hori_advance: f32,
}

/// Outline and metrics of one glyph
#[derive(Debug, Clone, Default)]
pub struct LoadedGlyph {
    pub outline: Outline,
    pub metrics: GlyphMetrics,
}

/// Source of glyph outlines
pub trait FontSource {
    /// Glyph index for a codepoint, 0 (`.notdef`) when unmapped
    fn glyph_index(&self, codepoint: u32) -> u16;

    /// Load a glyph without scaling or hinting
    fn load_glyph(&self, glyph_index: u16) -> Result<LoadedGlyph>;
}

/// TrueType / OpenType font backed by ttf-parser
pub struct TtfFont {
    data: Vec<u8>,
    index: u32,
}

impl std::fmt::Debug for TtfFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtfFont")
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl TtfFont {
    /// Wrap font bytes, checking that face `index` parses
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self> {
        Face::parse(&data, index).map_err(|e| TextError::FontParsing(e.to_string()))?;
        Ok(Self { data, index })
    }

    /// Read the first face of a font file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TextError::FontNotFound(path.display().to_string()),
            _ => TextError::Io(e),
        })?;
        Self::from_bytes(data, 0)
    }

    /// Resolve a family name against the system fonts
    pub fn from_system(family: &str) -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let families = [fontdb::Family::Name(family)];
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };
        let id = db
            .query(&query)
            .ok_or_else(|| TextError::FontNotFound(family.to_string()))?;

        db.with_face_data(id, |data, index| Self::from_bytes(data.to_vec(), index))
            .ok_or_else(|| TextError::FontNotFound(family.to_string()))?
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, self.index).map_err(|e| TextError::FontParsing(e.to_string()))
    }

    /// Number of glyphs in the face
    pub fn number_of_glyphs(&self) -> u16 {
        self.face().map(|f| f.number_of_glyphs()).unwrap_or(0)
    }
}

impl FontSource for TtfFont {
    fn glyph_index(&self, codepoint: u32) -> u16 {
        let Ok(face) = self.face() else {
            return 0;
        };
        char::from_u32(codepoint)
            .and_then(|c| face.glyph_index(c))
            .map(|id| id.0)
            .unwrap_or(0)
    }

    fn load_glyph(&self, glyph_index: u16) -> Result<LoadedGlyph> {
        let face = self.face()?;
        if glyph_index >= face.number_of_glyphs() {
            return Err(TextError::MissingGlyph(glyph_index));
        }
        let glyph = GlyphId(glyph_index);

        let mut recorder = OutlineRecorder::default();
        // Glyphs without an outline (space) leave the recorder empty
        face.outline_glyph(glyph, &mut recorder);
        let outline = recorder.finish();

        let hori_advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f32;
        let metrics = match outline.cbox() {
            Some(cbox) => GlyphMetrics {
                width: cbox.width(),
                height: cbox.height(),
                hori_bearing_x: cbox.x_min,
                hori_bearing_y: cbox.y_max,
                hori_advance,
            },
            None => GlyphMetrics {
                hori_advance,
                ..Default::default()
            },
        };

        Ok(LoadedGlyph { outline, metrics })
    }
}

/// Records ttf-parser outline events, closing every contour with an
/// explicit edge back to its start point
#[derive(Default)]
struct OutlineRecorder {
    outline: Outline,
    start: Option<Vec2>,
    current: Vec2,
}

impl OutlineRecorder {
    fn close_contour(&mut self) {
        if let Some(start) = self.start.take() {
            if self.current != start {
                self.outline.line_to(start.x, start.y);
            }
            self.outline.close();
        }
    }

    fn finish(mut self) -> Outline {
        self.close_contour();
        self.outline
    }
}

impl ttf_parser::OutlineBuilder for OutlineRecorder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close_contour();
        self.outline.move_to(x, y);
        self.start = Some(Vec2::new(x, y));
        self.current = Vec2::new(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.outline.line_to(x, y);
        self.current = Vec2::new(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.outline.quad_to(x1, y1, x, y);
        self.current = Vec2::new(x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.outline.curve_to(x1, y1, x2, y2, x, y);
        self.current = Vec2::new(x, y);
    }

    fn close(&mut self) {
        self.close_contour();
    }
}
