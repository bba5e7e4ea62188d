/*!
 * Common test utilities for the negbatch test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use negbatch::app_config::{Config, PathsConfig};
use negbatch::app_controller::Controller;
use negbatch::providers::Translator;
use negbatch::scheduler::{Device, ExecutionContext};

/// Sentences used by most workspace tests
pub const SAMPLE_SENTENCES: [&str; 5] = [
    "The patient does not have any signs of infection.",
    "Blood pressure is stable.",
    "She denies chest pain.",
    "No fever was recorded overnight.",
    "The wound is healing well.",
];

/// A self-contained workspace: temp directory, corpus and config
pub struct TestWorkspace {
    pub dir: TempDir,
    pub config: Config,
}

impl TestWorkspace {
    /// Workspace with `sentences` written to `raw/corpus.txt`
    pub fn with_corpus(sentences: &[&str], batch_size: usize) -> Result<Self> {
        init_logging();
        let dir = TempDir::new()?;
        let mut config = Config::default();
        config.paths = PathsConfig::rooted_at(dir.path());
        config.partition.batch_size = batch_size;
        config.translation.sub_batch_size = 2;

        fs::create_dir_all(&config.paths.raw_data_dir)?;
        write_corpus(&config.paths.raw_data_dir, "corpus.txt", sentences)?;

        Ok(Self { dir, config })
    }

    /// Controller on a CPU context with the given translator
    pub fn controller(&self, translator: Arc<dyn Translator>) -> Result<Controller> {
        Ok(Controller::with_parts(
            self.config.clone(),
            translator,
            ExecutionContext::new(Device::Cpu, 4),
        )?)
    }
}

/// Route library logs through the test harness; `RUST_LOG` picks the level
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write one sentence per line
pub fn write_corpus(dir: &Path, file_name: &str, sentences: &[&str]) -> Result<PathBuf> {
    let path = dir.join(file_name);
    fs::write(&path, sentences.join("\n"))?;
    Ok(path)
}
