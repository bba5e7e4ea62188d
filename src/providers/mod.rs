/*!
 * Translation collaborators.
 *
 * The pipeline only talks to the `Translator` trait:
 * - `http`: a client for a translation model served over HTTP
 * - `mock`: in-process translators for dry runs and tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::app_config::Precision;
use crate::errors::TranslationError;

/// A translation model
///
/// Implementations must return exactly one translation per input sentence,
/// in input order.
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate one sub-batch of sentences
    async fn translate(
        &self,
        sentences: &[String],
        precision: Precision,
    ) -> Result<Vec<String>, TranslationError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

pub mod http;
pub mod mock;

pub use http::HttpTranslator;
pub use mock::{MockBehavior, MockTranslator};
