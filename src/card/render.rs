use image::{Rgb, RgbImage, RgbaImage};
use tiny_skia::{BlendMode, Pixmap, PremultipliedColorU8, Rect, Transform};

use super::{CaptionFont, CaptionLayout, OverlayBand, RenderConfig, caption_layout, font_size_px};
use crate::AnnotationError;

/// Composites the caption band and both text lines onto a copy of `photo`.
///
/// The band and text are drawn into a transparent layer which is then laid
/// over the straight-alpha photo, so pixels the caption does not touch keep
/// their stored values.
pub fn compose_card(
    photo: &RgbaImage,
    name: &str,
    position: &str,
    font: &CaptionFont,
    config: &RenderConfig,
) -> Result<(RgbaImage, CaptionLayout), AnnotationError> {
    let (width, height) = photo.dimensions();
    let mut layer = Pixmap::new(width, height).ok_or_else(|| {
        AnnotationError::Render(format!("cannot allocate a {}x{} caption layer", width, height))
    })?;

    let font_size = font_size_px(height, config.font_size_ratio);
    let name_box = font.measure(name, font_size);
    let position_box = font.measure(position, font_size);
    let layout = caption_layout(width, height, name_box, position_box, config);

    fill_band(&mut layer, layout.band, config);
    font.draw(
        &mut layer,
        name,
        layout.name.x,
        layout.name.y,
        font_size,
        config.text_color,
    );
    font.draw(
        &mut layer,
        position,
        layout.position.x,
        layout.position.y,
        font_size,
        config.text_color,
    );

    let mut card = photo.clone();
    for (dst, src) in card.pixels_mut().zip(layer.pixels()) {
        dst.0 = source_over(dst.0, *src);
    }
    Ok((card, layout))
}

fn fill_band(layer: &mut Pixmap, band: OverlayBand, config: &RenderConfig) {
    let Some(rect) = Rect::from_xywh(
        0.0,
        band.y_start as f32,
        layer.width() as f32,
        band.height as f32,
    ) else {
        return;
    };
    let mut paint = config.overlay_color.to_paint();
    paint.anti_alias = false;
    paint.blend_mode = BlendMode::Source;
    layer.fill_rect(rect, &paint, Transform::identity(), None);
}

/// Lays a premultiplied layer pixel over a straight-alpha photo pixel. A
/// fully transparent layer pixel leaves the photo pixel untouched.
fn source_over(dst: [u8; 4], src: PremultipliedColorU8) -> [u8; 4] {
    let sa = u32::from(src.alpha());
    if sa == 0 {
        return dst;
    }
    let da = u32::from(dst[3]);
    // Both weights are scaled by 255 * 255.
    let keep = da * (255 - sa);
    let out_a = sa * 255 + keep;
    let blend = |sc: u8, dc: u8| -> u8 {
        let value = u32::from(sc) * 255 * 255 + u32::from(dc) * keep;
        ((value + out_a / 2) / out_a).min(255) as u8
    };
    [
        blend(src.red(), dst[0]),
        blend(src.green(), dst[1]),
        blend(src.blue(), dst[2]),
        ((out_a + 127) / 255).min(255) as u8,
    ]
}

/// Drops the alpha channel, keeping the stored color values.
pub fn flatten_rgb(card: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(card.width(), card.height(), |x, y| {
        let [r, g, b, _] = card.get_pixel(x, y).0;
        Rgb([r, g, b])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rgba, resolve_caption_font};

    fn white_photo(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
    }

    fn close_to(actual: u8, expected: u8) -> bool {
        actual.abs_diff(expected) <= 1
    }

    fn text_only(color: Rgba) -> RenderConfig {
        RenderConfig {
            overlay_color: Rgba::new(0, 0, 0, 0),
            text_color: color,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn overlay_blends_instead_of_overwriting() {
        let photo = white_photo(40, 100);
        let config = RenderConfig::default();
        let (card, layout) =
            compose_card(&photo, "", "", &CaptionFont::builtin(), &config).expect("compose");
        assert_eq!(layout.band.y_start, 85);

        let rgb = flatten_rgb(&card);
        // white under navy at alpha 180: 255 * 75 / 255 and 128 * 180 / 255 + 75
        let inside = rgb.get_pixel(3, 90).0;
        assert!(close_to(inside[0], 75), "{:?}", inside);
        assert!(close_to(inside[1], 75), "{:?}", inside);
        assert!(close_to(inside[2], 165), "{:?}", inside);

        assert_eq!(rgb.get_pixel(3, 84).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(39, 99).0, inside);
    }

    #[test]
    fn translucent_photo_pixels_keep_their_color() {
        let mut photo = RgbaImage::from_pixel(20, 100, image::Rgba([200, 100, 50, 255]));
        photo.put_pixel(0, 0, image::Rgba([200, 100, 50, 0]));
        photo.put_pixel(1, 0, image::Rgba([200, 100, 50, 10]));

        let (card, layout) = compose_card(
            &photo,
            "Ann",
            "Wing",
            &CaptionFont::builtin(),
            &RenderConfig::default(),
        )
        .expect("compose");
        assert!(layout.band.y_start > 0);

        assert_eq!(card.get_pixel(0, 0).0, [200, 100, 50, 0]);
        assert_eq!(card.get_pixel(1, 0).0, [200, 100, 50, 10]);
        let rgb = flatten_rgb(&card);
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 100, 50]);
        assert_eq!(rgb.get_pixel(1, 0).0, [200, 100, 50]);
    }

    #[test]
    fn band_over_transparent_pixels_shows_the_band() {
        let photo = RgbaImage::from_pixel(10, 100, image::Rgba([9, 9, 9, 0]));
        let config = RenderConfig {
            overlay_color: Rgba::new(0, 0, 128, 180),
            ..RenderConfig::default()
        };
        let (card, _) =
            compose_card(&photo, "", "", &CaptionFont::builtin(), &config).expect("compose");
        let px = card.get_pixel(5, 95).0;
        assert_eq!(px[3], 180);
        assert!(close_to(px[2], 128), "{:?}", px);
        assert_eq!(card.get_pixel(5, 10).0, [9, 9, 9, 0]);
    }

    #[test]
    fn text_pixels_land_inside_the_band() {
        let photo = RgbaImage::from_pixel(400, 400, image::Rgba([0, 0, 0, 255]));
        let config = text_only(Rgba::new(255, 0, 0, 255));
        let (card, layout) =
            compose_card(&photo, "Ann Lee", "Wing", &CaptionFont::builtin(), &config)
                .expect("compose");
        let rgb = flatten_rgb(&card);
        let red_rows: Vec<u32> = rgb
            .enumerate_pixels()
            .filter(|(_, _, px)| px.0[0] > 0)
            .map(|(_, y, _)| y)
            .collect();
        assert!(!red_rows.is_empty());
        assert!(red_rows.iter().all(|y| *y >= layout.band.y_start));
        assert_eq!(layout.name.x, (400 - (7 * 6 - 1) * 2) / 2);
    }

    #[test]
    fn system_outline_font_inks_inside_its_measured_box() {
        let resolved = resolve_caption_font(None, &["sans-serif".to_string()]);
        let font = resolved.font;
        if !matches!(font, CaptionFont::Outline(_)) {
            // no scalable system font installed
            return;
        }

        let photo = RgbaImage::from_pixel(1000, 800, image::Rgba([0, 0, 0, 255]));
        let config = text_only(Rgba::new(255, 0, 0, 255));
        let (card, layout) = compose_card(&photo, "John Smith", "", &font, &config)
            .expect("compose");

        let name_box = font.measure("John Smith", 36);
        assert!(name_box.width() > 0, "{:?}", name_box);
        assert!(name_box.height() > 0, "{:?}", name_box);
        assert_eq!(layout.band.y_start, 680);

        let inked: Vec<(u32, u32)> = card
            .enumerate_pixels()
            .filter(|(_, _, px)| px.0[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!inked.is_empty());

        let min_x = layout.name.x + name_box.left - 1;
        let max_x = layout.name.x + name_box.right;
        let min_y = layout.name.y + name_box.top - 1;
        let max_y = layout.name.y + name_box.bottom;
        for (x, y) in inked {
            let (x, y) = (x as i32, y as i32);
            assert!(x >= min_x && x <= max_x, "x {} outside [{}, {}]", x, min_x, max_x);
            assert!(y >= min_y && y <= max_y, "y {} outside [{}, {}]", y, min_y, max_y);
            assert!(y >= layout.band.y_start as i32 && y < layout.band.y_end() as i32);
        }
    }
}
