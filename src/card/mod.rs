mod builtin;
mod color;
mod font;
mod layout;
mod render;

pub use color::{Rgba, parse_color};
pub use font::{
    CaptionFont, FontFallback, OutlineFont, ResolvedCaptionFont, load_outline_font,
    resolve_caption_font,
};
pub use layout::{
    CaptionLayout, OverlayBand, TextPlacement, caption_layout, center_x, font_size_px,
    overlay_band,
};
pub use render::{compose_card, flatten_rgb};

pub const DEFAULT_FONT_PATH: &str = "arialbd.ttf";

/// Ink bounding box of a rendered line, in pixels, relative to the drawing
/// origin (left edge, ascender line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TextBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Distance from the drawing origin down to the lowest inked pixel.
    pub fn height(&self) -> i32 {
        self.bottom
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub overlay_height_ratio: f64,
    pub font_size_ratio: f64,
    pub text_color: Rgba,
    pub overlay_color: Rgba,
    pub vertical_spacing: u32,
    pub font_path: Option<String>,
    pub font_families: Vec<String>,
    pub clamp_text_to_overlay: bool,
    pub max_image_dimension: Option<u32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            overlay_height_ratio: 0.15,
            font_size_ratio: 0.045,
            text_color: Rgba::WHITE,
            overlay_color: Rgba::new(0, 0, 128, 180),
            vertical_spacing: 10,
            font_path: Some(DEFAULT_FONT_PATH.to_string()),
            font_families: vec!["Arial".to_string(), "sans-serif".to_string()],
            clamp_text_to_overlay: false,
            max_image_dimension: None,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), crate::AnnotationError> {
        let in_unit = |value: f64| value > 0.0 && value < 1.0;
        if !in_unit(self.overlay_height_ratio) {
            return Err(crate::AnnotationError::InvalidConfig(format!(
                "overlay height ratio must be in (0, 1), got {}",
                self.overlay_height_ratio
            )));
        }
        if !in_unit(self.font_size_ratio) {
            return Err(crate::AnnotationError::InvalidConfig(format!(
                "font size ratio must be in (0, 1), got {}",
                self.font_size_ratio
            )));
        }
        if self.max_image_dimension == Some(0) {
            return Err(crate::AnnotationError::InvalidConfig(
                "max image dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
