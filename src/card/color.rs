use anyhow::{Result, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub(crate) fn to_paint(self) -> tiny_skia::Paint<'static> {
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(self.r, self.g, self.b, self.a);
        paint.anti_alias = true;
        paint
    }
}

/// Parses `#rrggbb`, `#rrggbbaa`, `#rgb` or a handful of color names.
pub fn parse_color(value: &str) -> Result<Rgba> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| anyhow!("invalid hex color: {}", value));
    }
    let named = match value.to_ascii_lowercase().as_str() {
        "white" => Rgba::WHITE,
        "black" => Rgba::new(0, 0, 0, 255),
        "navy" => Rgba::new(0, 0, 128, 255),
        "red" => Rgba::new(255, 0, 0, 255),
        "yellow" => Rgba::new(255, 255, 0, 255),
        "gray" | "grey" => Rgba::new(128, 128, 128, 255),
        "transparent" => Rgba::new(0, 0, 0, 0),
        _ => return Err(anyhow!("unknown color name: {}", value)),
    };
    Ok(named)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).ok();
    match hex.len() {
        3 => {
            let nibble = |idx: usize| u8::from_str_radix(&hex[idx..idx + 1], 16).ok();
            Some(Rgba::new(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
                255,
            ))
        }
        6 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_color("#000080b4").unwrap(), Rgba::new(0, 0, 128, 180));
        assert_eq!(parse_color("#FFFFFF").unwrap(), Rgba::WHITE);
        assert_eq!(parse_color(" #f00 ").unwrap(), Rgba::new(255, 0, 0, 255));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(parse_color("White").unwrap(), Rgba::WHITE);
        assert_eq!(parse_color("navy").unwrap(), Rgba::new(0, 0, 128, 255));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#zzzzzz").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }
}
