//! Report rendering: document model, builders, serializers and the
//! renderer that puts finished artifacts on disk.
//!
//! Artifacts are written to a temp file inside the reports directory and
//! renamed into place only once complete, so a failed render never leaves
//! a partial file behind.

pub mod build;
pub mod format;
pub mod model;
pub mod xlsx;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};
use tracing::{error, info};

use crate::analytics::AnalyticsSnapshot;
use crate::config::{self, Config};
use crate::error::{ReportError, ReportResult};
use crate::record::StepRecord;

pub use build::{ANALYSIS_SHEET, RESULTS_COLUMNS, RESULTS_SHEET, SUGGESTIONS_SHEET, build_workbook};
pub use format::{JsonFormat, ReportFormat, XlsxFormat, read_report};
pub use model::{Row, RowStyle, Sheet, Workbook};
pub use xlsx::read_workbook;

/// Timestamp embedded in artifact file names
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Sidecar written next to each artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportManifest {
    pub run_name: String,
    pub created_at: DateTime<Utc>,
    pub host: String,
    /// File name of the artifact this manifest describes
    pub artifact: String,
    pub format: String,
    pub analytics: AnalyticsSnapshot,
}

/// Writes reports into a directory
#[derive(Debug)]
pub struct ReportRenderer {
    reports_dir: PathBuf,
    write_manifest: bool,
    format: Box<dyn ReportFormat>,
}

impl ReportRenderer {
    /// Renderer writing xlsx reports (with manifest) into `reports_dir`
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            write_manifest: config::DEFAULT_WRITE_MANIFEST,
            format: Box::new(XlsxFormat),
        }
    }

    /// Renderer configured from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.report.reports_dir).manifest(config.report.write_manifest)
    }

    /// Enable or disable the JSON manifest
    pub fn manifest(mut self, enabled: bool) -> Self {
        self.write_manifest = enabled;
        self
    }

    /// Use a different output format
    pub fn format(mut self, format: impl ReportFormat + 'static) -> Self {
        self.format = Box::new(format);
        self
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Build and write the report; returns the artifact path.
    ///
    /// On failure the error is logged and returned and no artifact (or
    /// manifest) exists under the reports directory.
    pub fn render(
        &self,
        records: &[StepRecord],
        analytics: &AnalyticsSnapshot,
        suggestions: &[String],
        run_name: &str,
    ) -> ReportResult<PathBuf> {
        let workbook = build_workbook(records, analytics, suggestions);
        let created_at = Utc::now();

        match self.write(&workbook, analytics, run_name, created_at) {
            Ok(path) => {
                info!(path = %path.display(), records = records.len(), "report written");
                Ok(path)
            }
            Err(e) => {
                error!(dir = %self.reports_dir.display(), error = %e, "report generation failed");
                Err(e)
            }
        }
    }

    fn write(
        &self,
        workbook: &Workbook,
        analytics: &AnalyticsSnapshot,
        run_name: &str,
        created_at: DateTime<Utc>,
    ) -> ReportResult<PathBuf> {
        fs::create_dir_all(&self.reports_dir)?;
        let path = self.artifact_path(run_name, created_at);

        let mut artifact = self.temp_file()?;
        self.format.write(workbook, artifact.as_file_mut())?;
        artifact.as_file().sync_all()?;

        let manifest = if self.write_manifest {
            let manifest = ReportManifest {
                run_name: run_name.to_string(),
                created_at,
                host: host_name(),
                artifact: file_name(&path),
                format: self.format.extension().to_string(),
                analytics: analytics.clone(),
            };
            let mut tmp = self.temp_file()?;
            {
                let mut writer = BufWriter::new(tmp.as_file_mut());
                serde_json::to_writer_pretty(&mut writer, &manifest)?;
                writer.flush()?;
            }
            Some(tmp)
        } else {
            None
        };

        artifact
            .persist_noclobber(&path)
            .map_err(|e| ReportError::Persist {
                path: path.display().to_string(),
                source: e.error,
            })?;

        if let Some(tmp) = manifest {
            persist_manifest(tmp, &path)?;
        }

        Ok(path)
    }

    fn temp_file(&self) -> ReportResult<NamedTempFile> {
        Ok(Builder::new()
            .prefix(".report-")
            .suffix(".part")
            .tempfile_in(&self.reports_dir)?)
    }

    /// `{run}_{timestamp}.{ext}`, with a numeric suffix when taken
    fn artifact_path(&self, run_name: &str, created_at: DateTime<Utc>) -> PathBuf {
        let stem = format!(
            "{}_{}",
            sanitize_name(run_name),
            created_at.format(FILE_TIMESTAMP_FORMAT)
        );
        let ext = self.format.extension();

        let mut candidate = self.reports_dir.join(format!("{}.{}", stem, ext));
        let mut n = 1;
        while candidate.exists() || manifest_path(&candidate).exists() {
            candidate = self.reports_dir.join(format!("{}_{}.{}", stem, n, ext));
            n += 1;
        }
        candidate
    }
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::from_config(config::get())
    }
}

/// Manifest path for an artifact
pub fn manifest_path(artifact: &Path) -> PathBuf {
    match artifact.extension().and_then(|e| e.to_str()) {
        Some("json") => artifact.with_extension("manifest.json"),
        _ => artifact.with_extension("json"),
    }
}

/// Move the manifest next to its artifact, removing the artifact on failure
fn persist_manifest(tmp: NamedTempFile, artifact: &Path) -> ReportResult<()> {
    let target = manifest_path(artifact);
    if let Err(e) = tmp.persist(&target) {
        if let Err(cleanup) = fs::remove_file(artifact) {
            error!(
                path = %artifact.display(),
                error = %cleanup,
                "could not remove report after manifest failure"
            );
        }
        return Err(ReportError::Persist {
            path: target.display().to_string(),
            source: e.error,
        });
    }
    Ok(())
}

/// Sanitize a run name for use in file names
fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if sanitized.is_empty() {
        config::DEFAULT_RUN_NAME.to_string()
    } else {
        sanitized
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
