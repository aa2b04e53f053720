use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub mod annotate;
pub mod card;
mod error;
pub mod logging;
pub mod records;
pub mod settings;
pub mod summary;
mod test_util;

pub use annotate::{PhotoAnnotator, annotate_all};
pub use card::{CaptionFont, RenderConfig, Rgba};
pub use error::AnnotationError;
pub use records::{JsonSource, PlayerRecord, RecordSource, SqliteSource};
pub use summary::RunSummary;

#[derive(Debug, Clone)]
pub enum SourceSpec {
    Sqlite { path: PathBuf, query: Option<String> },
    Json { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceSpec,
    pub output_dir: PathBuf,
    pub font_path: Option<String>,
    pub settings_path: Option<String>,
}

pub fn run(config: Config) -> Result<RunSummary> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let mut render = settings.render_config()?;
    if let Some(font_path) = config.font_path.filter(|path| !path.trim().is_empty()) {
        render.font_path = Some(font_path);
    }

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let source: Box<dyn RecordSource> = match &config.source {
        SourceSpec::Sqlite { path, query } => {
            let query = query.as_deref().unwrap_or(&settings.source_query);
            Box::new(SqliteSource::open(path, Some(query))?)
        }
        SourceSpec::Json { path } => Box::new(JsonSource::new(path)),
    };

    let annotator = PhotoAnnotator::new(render)?;
    annotate_all(source.as_ref(), &annotator, &config.output_dir)
}
