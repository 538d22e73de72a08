use crate::error::PersistenceError;
use crate::models::{ExperimentReport, ExperimentResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Paths of the artifacts written for one run
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRun {
    pub results_path: PathBuf,
    pub report_path: PathBuf,
}

/// Writes timestamp-named result and report files into one directory
pub struct ResultStore {
    output_dir: PathBuf,
}

impl ResultStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Persist `results_<stamp>.json` and `report_<stamp>.json`
    pub fn save(
        &self,
        results: &[ExperimentResult],
        report: &ExperimentReport,
        stamp: DateTime<Local>,
    ) -> Result<SavedRun, PersistenceError> {
        self.ensure_directory_exists()?;

        let suffix = stamp.format("%Y%m%d_%H%M%S");
        let results_path = self.output_dir.join(format!("results_{}.json", suffix));
        let report_path = self.output_dir.join(format!("report_{}.json", suffix));

        write_json_atomically(&results_path, "results", results)?;
        info!("Results saved to {}", results_path.display());

        write_json_atomically(&report_path, "report", report)?;
        info!("Report saved to {}", report_path.display());

        Ok(SavedRun {
            results_path,
            report_path,
        })
    }

    fn ensure_directory_exists(&self) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| PersistenceError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })
    }
}

/// Serialize to indented JSON, write to a sibling temp file, then rename into place
fn write_json_atomically<T: Serialize + ?Sized>(
    path: &Path,
    what: &'static str,
    value: &T,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| PersistenceError::Serialize { what, source })?;

    let write_error = |source: std::io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(json.as_bytes()).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;

    Ok(())
}
