use anyhow::Context;
use image::{ImageFormat, ImageReader, Limits, RgbImage, RgbaImage};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::AnnotationError;
use crate::card::{CaptionFont, RenderConfig, compose_card, flatten_rgb, resolve_caption_font};
use crate::records::{PlayerRecord, RecordSource};
use crate::summary::RunSummary;

/// Turns player photos into captioned cards. The font is resolved once and
/// shared read-only by every record.
#[derive(Debug, Clone)]
pub struct PhotoAnnotator {
    config: RenderConfig,
    font: CaptionFont,
}

impl PhotoAnnotator {
    /// Validates `config` and resolves its font, falling back to system
    /// families and then the built-in face when the preferred file is unusable.
    pub fn new(config: RenderConfig) -> Result<Self, AnnotationError> {
        config.validate()?;
        let font_path = config.font_path.as_deref().map(Path::new);
        let resolved = resolve_caption_font(font_path, &config.font_families);
        for fallback in &resolved.fallbacks {
            warn!(
                font = %fallback.requested,
                reason = %fallback.reason,
                "font unavailable, falling back"
            );
        }
        info!(font = resolved.font.name(), "caption font ready");
        Ok(Self {
            config,
            font: resolved.font,
        })
    }

    pub fn with_font(config: RenderConfig, font: CaptionFont) -> Result<Self, AnnotationError> {
        config.validate()?;
        Ok(Self { config, font })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn font(&self) -> &CaptionFont {
        &self.font
    }

    pub fn annotate(
        &self,
        record: &PlayerRecord,
        output_dir: &Path,
    ) -> Result<PathBuf, AnnotationError> {
        self.annotate_with_config(record, output_dir, &self.config)
    }

    /// Same as [`annotate`](Self::annotate) with geometry and colors taken
    /// from `config`. The font stays the one resolved at construction.
    pub fn annotate_with_config(
        &self,
        record: &PlayerRecord,
        output_dir: &Path,
        config: &RenderConfig,
    ) -> Result<PathBuf, AnnotationError> {
        config.validate()?;
        let photo = load_photo(&record.photo_path, config)?;
        let (card, layout) =
            compose_card(&photo, &record.name, &record.position, &self.font, config)?;
        debug!(
            player = %record.id,
            width = photo.width(),
            height = photo.height(),
            band_start = layout.band.y_start,
            name_x = layout.name.x,
            name_y = layout.name.y,
            position_x = layout.position.x,
            position_y = layout.position.y,
            "caption laid out"
        );

        let output = output_dir.join(record.output_file_name());
        persist_png(&flatten_rgb(&card), output_dir, &output)?;
        Ok(output)
    }
}

/// Annotates every record from `source`, isolating failures per record.
/// Only a failure to fetch the records aborts the run.
pub fn annotate_all(
    source: &dyn RecordSource,
    annotator: &PhotoAnnotator,
    output_dir: &Path,
) -> anyhow::Result<RunSummary> {
    let records = source
        .fetch_all()
        .with_context(|| "failed to fetch player records")?;
    info!(count = records.len(), "fetched player records");

    let mut summary = RunSummary::default();
    for record in &records {
        match annotator.annotate(record, output_dir) {
            Ok(path) => {
                info!(player = %record.id, path = %path.display(), "saved card");
                summary.record_success(&record.id, path);
            }
            Err(err) => {
                warn!(player = %record.id, category = err.category(), "skipped: {}", err);
                summary.record_failure(&record.id, &err);
            }
        }
    }
    Ok(summary)
}

fn load_photo(path: &Path, config: &RenderConfig) -> Result<RgbaImage, AnnotationError> {
    let not_found = |source: Option<std::io::Error>| AnnotationError::PhotoNotFound {
        path: path.to_path_buf(),
        source,
    };
    if !path.is_file() {
        return Err(not_found(None));
    }
    let mut reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| not_found(Some(err)))?;

    let mut limits = Limits::default();
    if let Some(max) = config.max_image_dimension {
        limits.max_image_width = Some(max);
        limits.max_image_height = Some(max);
    }
    reader.limits(limits);

    let image = reader.decode().map_err(|source| AnnotationError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

/// Encodes into a temp file next to `output` and renames it into place, so a
/// failed write never leaves a partial card behind.
fn persist_png(image: &RgbImage, output_dir: &Path, output: &Path) -> Result<(), AnnotationError> {
    let write_err = |source: std::io::Error| AnnotationError::Write {
        path: output.to_path_buf(),
        source,
    };
    let tmp = tempfile::Builder::new()
        .prefix(".card-")
        .suffix(".png.tmp")
        .tempfile_in(output_dir)
        .map_err(write_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|source| AnnotationError::Encode {
                path: output.to_path_buf(),
                source,
            })?;
        writer.flush().map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(output).map_err(|err| write_err(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Rgba;
    use tempfile::tempdir;

    fn builtin_annotator(config: RenderConfig) -> PhotoAnnotator {
        PhotoAnnotator::with_font(config, CaptionFont::builtin()).expect("annotator")
    }

    fn write_photo(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let photo = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        });
        photo.save(&path).expect("save photo");
        path
    }

    #[test]
    fn writes_rgb_card_with_source_dimensions() {
        let dir = tempdir().expect("tempdir");
        let out = dir.path().join("out");
        std::fs::create_dir(&out).expect("out dir");
        let photo = write_photo(dir.path(), "john.jpg", 1000, 800);

        let annotator = builtin_annotator(RenderConfig::default());
        let record = PlayerRecord::new("7", "John Smith", "Forward", &photo);
        let written = annotator.annotate(&record, &out).expect("annotate");

        assert_eq!(written, out.join("7.png"));
        let card = image::open(&written).expect("open card");
        assert_eq!(card.color(), image::ColorType::Rgb8);
        assert_eq!((card.width(), card.height()), (1000, 800));
        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .expect("read out dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name() != "7.png")
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let dir = tempdir().expect("tempdir");
        let out = dir.path().join("out");
        std::fs::create_dir(&out).expect("out dir");
        let photo = write_photo(dir.path(), "a.png", 320, 240);
        let photo_bytes = std::fs::read(&photo).expect("read photo");
        let annotator = builtin_annotator(RenderConfig::default());
        let record = PlayerRecord::new("a", "Ann Lee", "Goalkeeper", &photo);

        let first = annotator.annotate(&record, &out).expect("first run");
        let first_bytes = std::fs::read(&first).expect("read first");
        let second = annotator.annotate(&record, &out).expect("second run");
        let second_bytes = std::fs::read(&second).expect("read second");
        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(std::fs::read(&photo).expect("reread photo"), photo_bytes);
    }

    #[test]
    fn missing_photo_leaves_no_output() {
        let dir = tempdir().expect("tempdir");
        let annotator = builtin_annotator(RenderConfig::default());
        let record = PlayerRecord::new("x", "Nobody", "Bench", "/nonexistent/x.jpg");

        let err = annotator.annotate(&record, dir.path()).expect_err("missing");
        assert!(matches!(err, AnnotationError::PhotoNotFound { .. }));
        assert!(!dir.path().join("x.png").exists());
    }

    #[test]
    fn undecodable_photo_is_a_decode_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").expect("write");
        let annotator = builtin_annotator(RenderConfig::default());
        let record = PlayerRecord::new("b", "Broken", "Wing", &path);

        let err = annotator.annotate(&record, dir.path()).expect_err("decode");
        assert_eq!(err.category(), "DecodeFailure");
        assert!(!dir.path().join("b.png").exists());
    }

    #[test]
    fn missing_output_dir_is_a_persist_failure() {
        let dir = tempdir().expect("tempdir");
        let photo = write_photo(dir.path(), "p.png", 50, 50);
        let annotator = builtin_annotator(RenderConfig::default());
        let record = PlayerRecord::new("p", "Pat", "Back", &photo);

        let err = annotator
            .annotate(&record, &dir.path().join("missing"))
            .expect_err("no output dir");
        assert_eq!(err.category(), "PersistFailure");
    }

    #[test]
    fn oversized_photo_is_rejected_by_limits() {
        let dir = tempdir().expect("tempdir");
        let photo = write_photo(dir.path(), "big.png", 300, 200);
        let config = RenderConfig {
            max_image_dimension: Some(100),
            ..RenderConfig::default()
        };
        let annotator = builtin_annotator(config);
        let record = PlayerRecord::new("big", "Big", "Center", &photo);

        let err = annotator.annotate(&record, dir.path()).expect_err("limits");
        assert!(matches!(err, AnnotationError::Decode { .. }));
    }

    #[test]
    fn invalid_font_path_still_produces_a_card() {
        let dir = tempdir().expect("tempdir");
        let photo = write_photo(dir.path(), "f.png", 200, 200);
        let config = RenderConfig {
            font_path: Some("/nonexistent/arialbd.ttf".to_string()),
            font_families: Vec::new(),
            ..RenderConfig::default()
        };
        let annotator = PhotoAnnotator::new(config).expect("annotator");
        assert!(matches!(annotator.font(), CaptionFont::Builtin));

        let record = PlayerRecord::new("f", "Fallback", "Keeper", &photo);
        let written = annotator.annotate(&record, dir.path()).expect("annotate");
        assert!(written.exists());
    }

    #[test]
    fn per_call_config_overrides_colors() {
        let dir = tempdir().expect("tempdir");
        let photo = write_photo(dir.path(), "c.png", 100, 100);
        let annotator = builtin_annotator(RenderConfig::default());
        let opaque_red = RenderConfig {
            overlay_color: Rgba::new(255, 0, 0, 255),
            ..RenderConfig::default()
        };
        let record = PlayerRecord::new("c", "", "", &photo);

        let written = annotator
            .annotate_with_config(&record, dir.path(), &opaque_red)
            .expect("annotate");
        let card = image::open(&written).expect("open").to_rgb8();
        assert_eq!(card.get_pixel(50, 95).0, [255, 0, 0]);
        assert_ne!(card.get_pixel(50, 10).0, [255, 0, 0]);
    }

    #[test]
    fn annotate_all_isolates_failures() {
        let dir = tempdir().expect("tempdir");
        let photo = write_photo(dir.path(), "ok.png", 120, 90);
        let records = vec![
            PlayerRecord::new("1", "Missing", "GK", "/nonexistent/x.jpg"),
            PlayerRecord::new("2", "Present", "FW", &photo),
        ];
        let annotator = builtin_annotator(RenderConfig::default());

        let summary = annotate_all(&records, &annotator, dir.path()).expect("run");
        assert_eq!(summary.processed().len(), 1);
        assert_eq!(summary.processed()[0].id, "2");
        assert_eq!(summary.skipped()[0].id, "1");
        assert!(dir.path().join("2.png").exists());
        assert!(!dir.path().join("1.png").exists());
    }
}
