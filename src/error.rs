use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("photo not found or unreadable: {}", path.display())]
    PhotoNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("failed to decode photo {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to render caption: {0}")]
    Render(String),

    #[error("failed to encode output {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write output {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid render config: {0}")]
    InvalidConfig(String),
}

impl AnnotationError {
    /// Taxonomy name used in per-record diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::PhotoNotFound { .. } => "MissingInput",
            Self::Decode { .. } => "DecodeFailure",
            Self::Encode { .. } | Self::Write { .. } => "PersistFailure",
            Self::Render(_) => "RenderFailure",
            Self::InvalidConfig(_) => "InvalidConfig",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        let missing = AnnotationError::PhotoNotFound {
            path: PathBuf::from("/nonexistent/x.jpg"),
            source: None,
        };
        assert_eq!(missing.category(), "MissingInput");
        assert!(missing.to_string().contains("/nonexistent/x.jpg"));

        let write = AnnotationError::Write {
            path: PathBuf::from("out/1.png"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(write.category(), "PersistFailure");
        assert!(write.to_string().ends_with("disk full"));
    }
}
