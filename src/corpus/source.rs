/*!
 * Source corpus loading.
 *
 * The corpus is the first `.txt` or `.csv` file (by name) in the raw data
 * directory. Text files hold one sentence per line; CSV files must carry a
 * header with the configured text column.
 */

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::file_utils::FileManager;

/// Accepted source extensions
pub const SOURCE_EXTENSIONS: [&str; 2] = ["txt", "csv"];

/// Loaded source corpus
#[derive(Debug, Clone)]
pub struct SourceCorpus {
    /// Path of the file the rows came from
    pub path: PathBuf,
    /// File name without directories
    pub file_name: String,
    /// Trimmed, non-blank sentences in file order
    pub rows: Vec<String>,
}

impl SourceCorpus {
    /// Find the corpus file in `raw_data_dir`
    pub fn locate(raw_data_dir: &Path) -> Result<PathBuf, AppError> {
        if !FileManager::dir_exists(raw_data_dir) {
            return Err(AppError::SourceData(format!(
                "Source directory does not exist: {:?}",
                raw_data_dir
            )));
        }

        let files = FileManager::list_files(raw_data_dir, &SOURCE_EXTENSIONS)
            .map_err(|e| AppError::SourceData(format!("{:#}", e)))?;

        debug!("Source candidates in {:?}: {:?}", raw_data_dir, files);

        files.into_iter().next().ok_or_else(|| {
            AppError::SourceData(format!(
                "No source file (.txt or .csv) found in {:?}",
                raw_data_dir
            ))
        })
    }

    /// Locate and load the corpus
    pub fn load(raw_data_dir: &Path, text_column: &str) -> Result<Self, AppError> {
        let path = Self::locate(raw_data_dir)?;
        Self::from_file(&path, text_column)
    }

    /// Load a specific corpus file
    pub fn from_file(path: &Path, text_column: &str) -> Result<Self, AppError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let rows = match extension.as_str() {
            "txt" => read_text_rows(path)?,
            "csv" => read_csv_rows(path, text_column)?,
            other => {
                return Err(AppError::SourceData(format!(
                    "Unsupported source format '{}': {:?}",
                    other, path
                )));
            }
        };

        if rows.is_empty() {
            return Err(AppError::SourceData(format!("Source corpus is empty: {:?}", path)));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        info!("Loaded {} sentences from {}", rows.len(), file_name);

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            rows,
        })
    }
}

fn read_text_rows(path: &Path) -> Result<Vec<String>, AppError> {
    let content = FileManager::read_to_string(path)
        .map_err(|e| AppError::SourceData(format!("{:#}", e)))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_csv_rows(path: &Path, text_column: &str) -> Result<Vec<String>, AppError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AppError::SourceData(format!("Failed to open CSV {:?}: {}", path, e)))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::SourceData(format!("Failed to read CSV header {:?}: {}", path, e)))?;

    let column = headers
        .iter()
        .position(|h| h.trim() == text_column)
        .ok_or_else(|| {
            AppError::SourceData(format!(
                "Source CSV {:?} must contain a '{}' column",
                path, text_column
            ))
        })?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            AppError::SourceData(format!("Malformed CSV record {} in {:?}: {}", index + 1, path, e))
        })?;

        if let Some(value) = record.get(column) {
            let value = value.trim();
            if !value.is_empty() {
                rows.push(value.to_string());
            }
        }
    }

    Ok(rows)
}
