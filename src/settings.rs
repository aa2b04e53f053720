use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::card::{RenderConfig, parse_color};
use crate::records::DEFAULT_QUERY;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub overlay_height_ratio: f64,
    pub overlay_color: String,
    pub font_size_ratio: f64,
    pub text_color: String,
    pub text_spacing: u32,
    pub font_path: Option<String>,
    pub font_families: Vec<String>,
    pub clamp_to_overlay: bool,
    pub max_image_dimension: Option<u32>,
    pub source_query: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overlay_height_ratio: 0.15,
            overlay_color: "#000080b4".to_string(),
            font_size_ratio: 0.045,
            text_color: "white".to_string(),
            text_spacing: 10,
            font_path: Some(crate::card::DEFAULT_FONT_PATH.to_string()),
            font_families: vec!["Arial".to_string(), "sans-serif".to_string()],
            clamp_to_overlay: false,
            max_image_dimension: None,
            source_query: DEFAULT_QUERY.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    overlay: Option<OverlaySettings>,
    text: Option<TextSettings>,
    limits: Option<LimitSettings>,
    source: Option<SourceSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    height_ratio: Option<f64>,
    color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TextSettings {
    font_size_ratio: Option<f64>,
    color: Option<String>,
    spacing: Option<u32>,
    font_path: Option<String>,
    font_families: Option<Vec<String>>,
    clamp_to_overlay: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitSettings {
    max_image_dimension: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceSettings {
    query: Option<String>,
}

/// Loads the embedded defaults, then `settings.toml` / `settings.local.toml`
/// from the working directory and from `~/.player-cards`, then `extra_path`.
/// Later files win.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded default settings")?;
    settings.merge(defaults);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        let in_unit = |value: f64| value > 0.0 && value < 1.0;
        if let Some(overlay) = incoming.overlay {
            if let Some(ratio) = overlay.height_ratio.filter(|value| in_unit(*value)) {
                self.overlay_height_ratio = ratio;
            }
            if let Some(color) = overlay.color {
                if !color.trim().is_empty() {
                    self.overlay_color = color;
                }
            }
        }
        if let Some(text) = incoming.text {
            if let Some(ratio) = text.font_size_ratio.filter(|value| in_unit(*value)) {
                self.font_size_ratio = ratio;
            }
            if let Some(color) = text.color {
                if !color.trim().is_empty() {
                    self.text_color = color;
                }
            }
            if let Some(spacing) = text.spacing {
                self.text_spacing = spacing;
            }
            if let Some(path) = text.font_path {
                if !path.trim().is_empty() {
                    self.font_path = Some(path);
                }
            }
            if let Some(families) = text.font_families {
                self.font_families = families
                    .into_iter()
                    .filter(|family| !family.trim().is_empty())
                    .collect();
            }
            if let Some(clamp) = text.clamp_to_overlay {
                self.clamp_to_overlay = clamp;
            }
        }
        if let Some(limits) = incoming.limits {
            if let Some(max) = limits.max_image_dimension {
                self.max_image_dimension = if max > 0 { Some(max) } else { None };
            }
        }
        if let Some(source) = incoming.source {
            if let Some(query) = source.query {
                if !query.trim().is_empty() {
                    self.source_query = query;
                }
            }
        }
    }

    pub fn render_config(&self) -> Result<RenderConfig> {
        let overlay_color = parse_color(&self.overlay_color)
            .with_context(|| "invalid [overlay] color")?;
        let text_color =
            parse_color(&self.text_color).with_context(|| "invalid [text] color")?;
        Ok(RenderConfig {
            overlay_height_ratio: self.overlay_height_ratio,
            font_size_ratio: self.font_size_ratio,
            text_color,
            overlay_color,
            vertical_spacing: self.text_spacing,
            font_path: self.font_path.clone(),
            font_families: self.font_families.clone(),
            clamp_text_to_overlay: self.clamp_to_overlay,
            max_image_dimension: self.max_image_dimension,
        })
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".player-cards"))
        }
    })
}
