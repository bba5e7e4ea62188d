use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Files directly inside `dir` whose extension is one of `extensions`,
    /// sorted by file name so callers see a stable order.
    pub fn list_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !Self::dir_exists(dir) {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let matches = path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy();
                    extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted))
                })
                .unwrap_or(false);

            if matches {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a file by persisting a sibling temp file over the target, so a
    /// crash never leaves a half-written artifact behind.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::ensure_dir(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
        temp.write_all(content)
            .with_context(|| format!("Failed to write temp file for {:?}", path))?;
        temp.flush()?;
        temp.persist(path)
            .with_context(|| format!("Failed to persist file: {:?}", path))?;

        Ok(())
    }

    /// Append one line to a file, creating it if needed
    pub fn append_line<P: AsRef<Path>>(path: P, line: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open file for append: {:?}", path.as_ref()))?;

        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to append to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Remove every listed file; returns how many were removed
    pub fn remove_files(paths: &[PathBuf]) -> Result<usize> {
        let mut removed = 0;
        for path in paths {
            fs::remove_file(path).with_context(|| format!("Failed to remove file: {:?}", path))?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Remove a file if it exists
    pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if Self::file_exists(path) {
            fs::remove_file(path).with_context(|| format!("Failed to remove file: {:?}", path))?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Hex SHA-256 of a file's bytes
    pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
