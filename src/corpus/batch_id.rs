/*!
 * Batch identity.
 *
 * A batch id is `{stem}_{start:06}_{end:06}` where `stem` is the sanitized
 * source file stem and `[start, end]` the inclusive global sentence id range.
 * The artifact file is `{batch_id}.jsonl`, so the id (and therefore the
 * range) can be recovered from the file name alone.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::AppError;

/// Extension of batch artifact files
pub const ARTIFACT_EXTENSION: &str = "jsonl";

// The stem is greedy so that only the two trailing numeric groups are taken
// as the range; stems may contain underscores and digits of their own.
static BATCH_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<stem>[A-Za-z0-9_-]+)_(?P<start>\d+)_(?P<end>\d+)$")
        .expect("batch id pattern is valid")
});

/// Identity of one batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId {
    stem: String,
    start: u64,
    end: u64,
}

impl BatchId {
    /// Build an id for the inclusive range `[start, end]` of `source_file`
    pub fn new(source_file: &str, start: u64, end: u64) -> Result<Self, AppError> {
        if start == 0 || end < start {
            return Err(AppError::Precondition(format!(
                "invalid batch range [{}, {}]",
                start, end
            )));
        }

        let stem = sanitize_stem(source_file);
        if stem.is_empty() {
            return Err(AppError::Precondition(format!(
                "cannot derive a batch stem from '{}'",
                source_file
            )));
        }

        Ok(Self { stem, start, end })
    }

    /// Parse a batch id string
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let caps = BATCH_ID_REGEX
            .captures(value)
            .ok_or_else(|| AppError::artifact(value, "not a valid batch id"))?;

        let parse_num = |name: &str| {
            caps[name]
                .parse::<u64>()
                .map_err(|e| AppError::artifact(value, format!("bad {} in batch id: {}", name, e)))
        };
        let start = parse_num("start")?;
        let end = parse_num("end")?;

        if start == 0 || end < start {
            return Err(AppError::artifact(value, "batch id range is empty or zero-based"));
        }

        Ok(Self {
            stem: caps["stem"].to_string(),
            start,
            end,
        })
    }

    /// Recover the id from an artifact file name or path
    pub fn from_file_name<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();

        let is_artifact = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION));
        if !is_artifact {
            return Err(AppError::artifact(display, "not a batch artifact file"));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| AppError::artifact(display, "artifact has no file stem"))?;

        Self::parse(&stem)
    }

    /// Artifact file name
    pub fn file_name(&self) -> String {
        format!("{}.{}", self, ARTIFACT_EXTENSION)
    }

    /// Id of the translated counterpart
    pub fn derived(&self, target_language: &str) -> String {
        format!("{}_{}", target_language, self)
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// First global sentence id (inclusive)
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last global sentence id (inclusive)
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of sentences in the range
    pub fn sentence_count(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:06}_{:06}", self.stem, self.start, self.end)
    }
}

impl FromStr for BatchId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// File stem with every char outside `[A-Za-z0-9_-]` replaced by `_`
fn sanitize_stem(source_file: &str) -> String {
    let stem = Path::new(source_file)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
