use std::fmt;
use std::path::PathBuf;

use crate::AnnotationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRecord {
    pub id: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: String,
    pub category: &'static str,
    pub message: String,
}

/// Per-record outcomes of one run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    processed: Vec<ProcessedRecord>,
    skipped: Vec<SkippedRecord>,
}

impl RunSummary {
    pub fn record_success(&mut self, id: &str, output: PathBuf) {
        self.processed.push(ProcessedRecord {
            id: id.to_string(),
            output,
        });
    }

    pub fn record_failure(&mut self, id: &str, err: &AnnotationError) {
        self.skipped.push(SkippedRecord {
            id: id.to_string(),
            category: err.category(),
            message: err.to_string(),
        });
    }

    pub fn processed(&self) -> &[ProcessedRecord] {
        &self.processed
    }

    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}, skipped {}",
            self.processed.len(),
            self.skipped.len()
        )
    }
}
