// src/download.rs

use bytes::Bytes;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use crate::error::{io_context, PayrollError};
use crate::models::PayrollPeriod;
use crate::reports::ReportKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Csv,
    Pdf,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Csv => "csv",
            ArtifactFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "application/json",
            ArtifactFormat::Csv => "text/csv",
            ArtifactFormat::Pdf => "application/pdf",
        }
    }
}

/// `{reportType}_{month}_{year}.{ext}`
pub fn report_filename(kind: ReportKind, period: PayrollPeriod, format: ArtifactFormat) -> String {
    format!(
        "{}_{}_{}.{}",
        kind.as_str(),
        period.month(),
        period.year(),
        format.extension()
    )
}

pub fn payslip_filename(record_id: i64) -> String {
    format!("payslip_{}.{}", record_id, ArtifactFormat::Pdf.extension())
}

/// A file ready to be handed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadArtifact {
    pub filename: String,
    pub format: ArtifactFormat,
    pub bytes: Bytes,
}

impl DownloadArtifact {
    /// JSON reports arrive as data and are wrapped into a pretty printed file here.
    pub fn json_report(
        kind: ReportKind,
        period: PayrollPeriod,
        payload: &Value,
    ) -> Result<Self, PayrollError> {
        let pretty = serde_json::to_vec_pretty(payload)?;
        Ok(Self {
            filename: report_filename(kind, period, ArtifactFormat::Json),
            format: ArtifactFormat::Json,
            bytes: Bytes::from(pretty),
        })
    }

    pub fn csv_report(kind: ReportKind, period: PayrollPeriod, bytes: Bytes) -> Self {
        Self {
            filename: report_filename(kind, period, ArtifactFormat::Csv),
            format: ArtifactFormat::Csv,
            bytes,
        }
    }

    pub fn payslip(record_id: i64, bytes: Bytes) -> Self {
        Self {
            filename: payslip_filename(record_id),
            format: ArtifactFormat::Pdf,
            bytes,
        }
    }
}

/// Where downloaded artifacts end up.
pub trait DownloadSink: Send + Sync {
    /// Saves the artifact and returns where it landed.
    fn save(&self, artifact: &DownloadArtifact) -> Result<PathBuf, PayrollError>;
}

/// Saves artifacts into a directory.
///
/// Bytes go to a transient staging file first, which is then committed under
/// the artifact's filename. If anything fails before the commit the staging
/// file is removed when its handle drops, so a partial download never shows
/// up under the final name.
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    dir: PathBuf,
}

impl FileSystemSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for FileSystemSink {
    fn save(&self, artifact: &DownloadArtifact) -> Result<PathBuf, PayrollError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            io_context(
                e,
                format!("Failed to create download directory: {:?}", self.dir),
            )
        })?;

        let mut staged = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(|e| io_context(e, "Failed to create staging file"))?;
        staged
            .write_all(&artifact.bytes)
            .and_then(|_| staged.flush())
            .map_err(|e| {
                io_context(
                    e,
                    format!("Failed to write staging file for {}", artifact.filename),
                )
            })?;
        debug!(
            "Staged {} bytes for {} at {:?}",
            artifact.bytes.len(),
            artifact.filename,
            staged.path()
        );

        let target = self.dir.join(&artifact.filename);
        staged.persist(&target).map_err(|e| {
            io_context(e.error, format!("Failed to save download: {:?}", target))
        })?;

        info!(
            "Saved {} ({}, {} bytes)",
            target.display(),
            artifact.format.content_type(),
            artifact.bytes.len()
        );
        Ok(target)
    }
}

/// Keeps artifacts in memory instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<DownloadArtifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<DownloadArtifact> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, artifact: &DownloadArtifact) -> Result<PathBuf, PayrollError> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(artifact.clone());
        Ok(PathBuf::from(&artifact.filename))
    }
}
