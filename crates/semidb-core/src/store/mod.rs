//! Loading of tabular sources into typed rows.
//!
//! A location is either a single table or a directory of same-shaped
//! tables. Directory members that fail to read, parse or decode are skipped
//! with a warning; the load only fails when nothing usable remains.

mod table;

pub use table::{Column, Table, TableError, TableRow};

use crate::domain::{Dataset, DbError, DbResult};
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TABLE_GLOB: &str = "*.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<PathBuf>,
    pub skipped: Vec<SkippedSource>,
}

impl LoadReport {
    pub fn for_file(path: &Path) -> Self {
        Self {
            loaded: vec![path.to_path_buf()],
            skipped: Vec::new(),
        }
    }

    pub fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.skipped.extend(other.skipped);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub report: LoadReport,
}

/// Loads every table at `location` and concatenates the decoded rows in
/// file-name order.
pub fn load_location<T, F>(location: &Path, dataset: Dataset, decode: F) -> DbResult<Loaded<T>>
where
    F: Fn(&Table) -> Result<Vec<T>, TableError>,
{
    if location.is_dir() {
        return load_directory(location, dataset, decode);
    }

    if !location.is_file() {
        return Err(DbError::SourceLoad {
            dataset,
            path: location.to_path_buf(),
            reason: "location not found".to_string(),
        });
    }

    let rows = load_file(location, &decode).map_err(|reason| DbError::SourceLoad {
        dataset,
        path: location.to_path_buf(),
        reason,
    })?;
    info!(
        dataset = dataset.as_str(),
        path = %location.display(),
        rows = rows.len(),
        "loaded table"
    );

    Ok(Loaded {
        rows,
        report: LoadReport::for_file(location),
    })
}

fn load_directory<T, F>(directory: &Path, dataset: Dataset, decode: F) -> DbResult<Loaded<T>>
where
    F: Fn(&Table) -> Result<Vec<T>, TableError>,
{
    let candidates =
        table_files(directory).map_err(|reason| DbError::SourceLoad {
            dataset,
            path: directory.to_path_buf(),
            reason,
        })?;

    let mut rows = Vec::new();
    let mut report = LoadReport::default();
    for path in candidates {
        match load_file(&path, &decode) {
            Ok(mut decoded) => {
                debug!(path = %path.display(), rows = decoded.len(), "loaded table");
                rows.append(&mut decoded);
                report.loaded.push(path);
            }
            Err(reason) => {
                warn!(
                    dataset = dataset.as_str(),
                    path = %path.display(),
                    %reason,
                    "skipping malformed source"
                );
                report.skipped.push(SkippedSource { path, reason });
            }
        }
    }

    if report.loaded.is_empty() {
        return Err(DbError::NoSources {
            dataset,
            path: directory.to_path_buf(),
        });
    }

    info!(
        dataset = dataset.as_str(),
        path = %directory.display(),
        sources = report.loaded.len(),
        skipped = report.skipped.len(),
        rows = rows.len(),
        "loaded table directory"
    );
    Ok(Loaded { rows, report })
}

fn table_files(directory: &Path) -> Result<Vec<PathBuf>, String> {
    let matcher = table_matcher().map_err(|error| error.to_string())?;
    let entries = fs::read_dir(directory).map_err(|error| error.to_string())?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|error| error.to_string())?.path();
        let matches = path
            .file_name()
            .is_some_and(|name| matcher.is_match(Path::new(name)));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn table_matcher() -> Result<GlobMatcher, globset::Error> {
    Ok(Glob::new(TABLE_GLOB)?.compile_matcher())
}

fn load_file<T, F>(path: &Path, decode: &F) -> Result<Vec<T>, String>
where
    F: Fn(&Table) -> Result<Vec<T>, TableError>,
{
    let source = fs::read_to_string(path).map_err(|error| error.to_string())?;
    let table = Table::parse(&source).map_err(|error| error.to_string())?;
    decode(&table).map_err(|error| error.to_string())
}
