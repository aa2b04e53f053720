use super::{RenderConfig, TextBox};

/// Bottom band of the image that hosts the caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayBand {
    pub y_start: u32,
    pub height: u32,
}

impl OverlayBand {
    /// Exclusive end row, always the image height.
    pub fn y_end(&self) -> u32 {
        self.y_start + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPlacement {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionLayout {
    pub band: OverlayBand,
    pub name: TextPlacement,
    pub position: TextPlacement,
}

pub fn overlay_band(image_height: u32, ratio: f64) -> OverlayBand {
    let height = ((image_height as f64 * ratio).floor() as u32).min(image_height);
    OverlayBand {
        y_start: image_height - height,
        height,
    }
}

pub fn font_size_px(image_height: u32, ratio: f64) -> u32 {
    ((image_height as f64 * ratio).floor() as u32).max(1)
}

/// `floor((image_width - text_width) / 2)`, negative when the text is wider
/// than the image.
pub fn center_x(image_width: u32, text_width: i32) -> i32 {
    (image_width as i64 - text_width as i64).div_euclid(2) as i32
}

pub fn caption_layout(
    image_width: u32,
    image_height: u32,
    name_box: TextBox,
    position_box: TextBox,
    config: &RenderConfig,
) -> CaptionLayout {
    let band = overlay_band(image_height, config.overlay_height_ratio);
    let name_height = name_box.height() as i64;

    let mut name_y =
        band.y_start as i64 + (band.height as i64).div_euclid(4) - name_height.div_euclid(2);
    let mut position_y = name_y + name_height + config.vertical_spacing as i64;

    if config.clamp_text_to_overlay {
        let overflow = position_y + position_box.height() as i64 - image_height as i64;
        if overflow > 0 {
            name_y -= overflow;
            position_y -= overflow;
        }
        let underflow = band.y_start as i64 - (name_y + name_box.top as i64);
        if underflow > 0 {
            name_y += underflow;
            position_y += underflow;
        }
    }

    CaptionLayout {
        band,
        name: TextPlacement {
            x: center_x(image_width, name_box.width()),
            y: name_y as i32,
        },
        position: TextPlacement {
            x: center_x(image_width, position_box.width()),
            y: position_y as i32,
        },
    }
}
